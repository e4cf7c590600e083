use crate::calendar::{BUCKET_COUNT, BUCKETS, now_eastern};
use crate::config::{self, Settings};
use crate::data::{DailyClose, PriceSource};
use crate::engine::{CaptureEngine, CaptureReport, DisplayOptions, ExportOutcome, TickOutcome};
use crate::features::{Feature, FeatureFlags};
use crate::insights::{Breadth, Pulse};
use crate::notify::{HookMiss, Notifier};
use crate::replay::{self, Replay};
use crate::workbook;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

const MAX_NOTICES: usize = 6;
const SOUND_STEP: f64 = 0.25;

/// Messages handed to the main loop by background tasks and the IPC listener.
#[derive(Debug)]
pub enum AppEvent {
    /// A second launch asked this instance to come forward.
    Show,
    Notice { title: String, body: String },
    History { ticker: String, closes: Vec<DailyClose> },
    DnaExported { date: NaiveDate, path: PathBuf },
    MorningResume { date: NaiveDate, summary: String },
    NewsPing { date: NaiveDate, bucket: usize, title: String, body: String },
    /// A background hook gave up; it may run again on a later capture.
    HookMissed { date: NaiveDate, hook: HookMiss },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

/// Capture state plus everything around it that both front ends share.
pub struct Tracker {
    pub engine: CaptureEngine,
    pub notifier: Notifier,
    pub flags: FeatureFlags,
    pub settings: Settings,
    settings_path: PathBuf,
    pub status: String,
    pub warning: Option<String>,
    pub notices: VecDeque<Notice>,
    pub pulse: Pulse,
}

impl Tracker {
    pub fn new(
        source: Arc<dyn PriceSource>,
        settings: Settings,
        settings_path: PathBuf,
        flags: FeatureFlags,
        data_dir: PathBuf,
        tx: UnboundedSender<AppEvent>,
    ) -> Self {
        let display = DisplayOptions {
            show_pct: settings.show_pct,
            show_arrows: settings.show_arrows,
        };
        let today = now_eastern().date_naive();
        let engine = CaptureEngine::new(source.clone(), data_dir, display, today);
        let ticker_count = engine.tickers().len();
        Self {
            engine,
            notifier: Notifier::new(source, tx),
            flags,
            settings,
            settings_path,
            status: "Starting...".to_string(),
            warning: None,
            notices: VecDeque::new(),
            pulse: Pulse::calm(ticker_count),
        }
    }

    fn save_settings(&self) {
        if let Err(e) = self.settings.save(&self.settings_path) {
            warn!("Failed to save settings: {:#}", e);
        }
    }

    pub fn features_path(&self) -> PathBuf {
        self.engine.data_dir().join(config::FEATURES_FILE)
    }

    fn push_notice(&mut self, title: String, body: String) {
        info!("{}: {}", title, body.replace('\n', " | "));
        self.notices.push_front(Notice { title, body });
        self.notices.truncate(MAX_NOTICES);
    }

    fn fail(&mut self, context: &str, e: anyhow::Error) {
        error!("{}: {:#}", context, e);
        self.warning = Some(format!("{}: {}", context, e));
        self.status = format!("{} (see log)", context);
    }

    /// Updates the pulse and runs the hooks for one capture. Returns the
    /// number of chimes to sound.
    fn after_capture(&mut self, report: &CaptureReport) -> usize {
        self.pulse = Pulse::for_bucket(report.bucket, &report.pcts);
        self.status = report.summary();
        if let ExportOutcome::Failed(msg) = &report.export {
            self.status = format!("{} ({})", self.status, msg);
        }
        let data_dir = self.engine.data_dir().to_path_buf();
        let tickers = self.engine.tickers().to_vec();
        self.notifier.on_capture(
            self.engine.session().date(),
            report.bucket,
            &report.pcts,
            &self.flags,
            &self.settings,
            &data_dir,
            &tickers,
        )
    }

    fn after_backfill(&mut self, reports: &[CaptureReport]) -> usize {
        match reports.last() {
            Some(last) => self.after_capture(last),
            None => {
                self.pulse = Pulse::calm(self.engine.tickers().len());
                self.status = "Waiting for the first bucket".to_string();
                let tickers = self.engine.tickers().to_vec();
                self.notifier.on_idle_sync(
                    self.engine.session().date(),
                    &self.flags,
                    &self.settings,
                    &tickers,
                );
                0
            }
        }
    }

    /// Startup backfill.
    pub async fn startup(&mut self, now: DateTime<Tz>) -> usize {
        match self.engine.backfill_to(now).await {
            Ok(reports) => self.after_backfill(&reports),
            Err(e) => {
                self.fail("Startup backfill failed", e);
                0
            }
        }
    }

    pub async fn on_tick(&mut self, now: DateTime<Tz>) -> usize {
        match self.engine.tick(now).await {
            Ok(TickOutcome::Duplicate) => 0,
            Ok(TickOutcome::Idle { status }) => {
                self.status = status;
                0
            }
            Ok(TickOutcome::Captured(report)) => self.after_capture(&report),
            Ok(TickOutcome::Backfilled(reports)) => self.after_backfill(&reports),
            Err(e) => {
                self.fail("Capture cycle failed", e);
                0
            }
        }
    }

    pub async fn manual_refresh(&mut self, now: DateTime<Tz>) -> usize {
        match self.engine.refresh(now).await {
            Ok(Some(report)) => self.after_capture(&report),
            Ok(None) => {
                self.status = format!("Nothing to refresh before {}", BUCKETS[0].label);
                0
            }
            Err(e) => {
                self.fail("Refresh failed", e);
                0
            }
        }
    }

    /// Returns true for [`AppEvent::Show`].
    pub fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Show => {
                info!("Show requested by another launch");
                self.status = "Another launch asked for this window".to_string();
                return true;
            }
            AppEvent::Notice { title, body } => self.push_notice(title, body),
            AppEvent::History { ticker, closes } => self.notifier.store_history(ticker, closes),
            AppEvent::DnaExported { date, path } => {
                self.settings.dna_last_export = Some(date.to_string());
                self.save_settings();
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let body = format!("Dow DNA export updated: {}", name);
                self.push_notice(config::APP_NAME.to_string(), body);
            }
            AppEvent::MorningResume { date, summary } => {
                self.settings.morning_resume_seen = Some(date.to_string());
                self.save_settings();
                self.push_notice("Morning Resume".to_string(), summary);
            }
            AppEvent::NewsPing { date, bucket, title, body } => {
                self.notifier.news_delivered(date, bucket);
                self.push_notice(title, body);
            }
            AppEvent::HookMissed { date, hook } => self.notifier.hook_missed(date, hook),
        }
        false
    }

    pub fn set_data_dir(&mut self, dir: PathBuf) {
        self.settings.data_dir = Some(dir.to_string_lossy().into_owned());
        self.save_settings();
        self.engine.set_data_dir(dir);
    }

    pub fn toggle_pct(&mut self) {
        self.engine.display.show_pct = !self.engine.display.show_pct;
        self.settings.show_pct = self.engine.display.show_pct;
        self.save_settings();
    }

    pub fn toggle_arrows(&mut self) {
        self.engine.display.show_arrows = !self.engine.display.show_arrows;
        self.settings.show_arrows = self.engine.display.show_arrows;
        self.save_settings();
    }

    pub fn adjust_sound_threshold(&mut self, delta: f64) {
        let next = (self.settings.effective_sound_threshold() + delta)
            .clamp(config::MIN_SOUND_THRESHOLD, 10.0);
        self.settings.sound_threshold = next;
        self.save_settings();
        self.status = format!("Sound threshold set to {:.2}%", next);
    }

    pub fn toggle_feature(&mut self, feature: Feature) {
        let enabled = !self.flags.enabled(feature);
        self.flags.set(feature, enabled);
        if let Err(e) = self.flags.save(&self.features_path()) {
            warn!("Failed to save feature flags: {:#}", e);
        }
        self.status = format!("{} {}", feature.key(), if enabled { "on" } else { "off" });
    }

    /// Advancer share per captured bucket.
    pub fn confidence_trail(&self) -> Vec<(usize, f64)> {
        (0..BUCKET_COUNT)
            .filter(|b| {
                self.engine
                    .session()
                    .latest_bucket_with_data()
                    .is_some_and(|last| *b <= last)
            })
            .map(|b| (b, Breadth::from_pcts(&self.engine.pcts(b)).advance_ratio()))
            .collect()
    }

    /// Most recent workbook from an earlier session.
    pub fn load_previous_replay(&self) -> anyhow::Result<Replay> {
        let data_dir = self.engine.data_dir();
        let path = workbook::latest_workbook_before(data_dir, self.engine.session().date())
            .ok_or_else(|| anyhow::anyhow!("No earlier workbook in {}", data_dir.display()))?;
        replay::load(&path)
    }
}

fn ring_bell(chimes: usize) {
    if chimes == 0 {
        return;
    }
    let mut stdout = io::stdout();
    for _ in 0..chimes {
        let _ = stdout.write_all(b"\x07");
    }
    let _ = stdout.flush();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Panel {
    Grid,
    Features,
    Replay,
}

pub struct App {
    pub tracker: Tracker,
    pub should_quit: bool,
    pub selected: usize,
    pub panel: Panel,
    pub feature_cursor: usize,
    pub replay: Option<Replay>,
    pub replay_cursor: usize,
    events: UnboundedReceiver<AppEvent>,
}

impl App {
    pub fn new(tracker: Tracker, events: UnboundedReceiver<AppEvent>) -> Self {
        Self {
            tracker,
            should_quit: false,
            selected: 0,
            panel: Panel::Grid,
            feature_cursor: 0,
            replay: None,
            replay_cursor: 0,
            events,
        }
    }

    pub fn selected_ticker(&self) -> Option<&str> {
        self.tracker.engine.tickers().get(self.selected).map(String::as_str)
    }

    pub async fn run(&mut self, terminal: &mut crate::tui::Tui) -> io::Result<()> {
        let tick_every = Duration::from_secs(config::TICK_INTERVAL_SECS);
        let mut last_tick = Instant::now();

        while !self.should_quit {
            terminal.draw(|f| crate::ui::render(f, self))?;

            while let Ok(event) = self.events.try_recv() {
                self.tracker.handle_event(event);
            }

            if last_tick.elapsed() >= tick_every {
                last_tick = Instant::now();
                let chimes = self.tracker.on_tick(now_eastern()).await;
                ring_bell(chimes);
            }

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.on_key(key.code).await;
                    }
                }
            }
        }
        Ok(())
    }

    async fn on_key(&mut self, code: KeyCode) {
        match self.panel {
            Panel::Grid => match code {
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::Char('r') => {
                    self.tracker.status = "Refreshing...".to_string();
                    let chimes = self.tracker.manual_refresh(now_eastern()).await;
                    ring_bell(chimes);
                }
                KeyCode::Char('p') => self.tracker.toggle_pct(),
                KeyCode::Char('a') => self.tracker.toggle_arrows(),
                KeyCode::Char('x') => self.tracker.warning = None,
                KeyCode::Char('+') if self.tracker.flags.enabled(Feature::MarketSounds) => {
                    self.tracker.adjust_sound_threshold(SOUND_STEP)
                }
                KeyCode::Char('-') if self.tracker.flags.enabled(Feature::MarketSounds) => {
                    self.tracker.adjust_sound_threshold(-SOUND_STEP)
                }
                KeyCode::Char('f') => self.panel = Panel::Features,
                KeyCode::Char('v') => self.open_replay(),
                KeyCode::Up | KeyCode::Char('k') => {
                    self.selected = self.selected.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    let last = self.tracker.engine.tickers().len().saturating_sub(1);
                    self.selected = (self.selected + 1).min(last);
                }
                _ => {}
            },
            Panel::Features => match code {
                KeyCode::Esc | KeyCode::Char('f') | KeyCode::Char('q') => self.panel = Panel::Grid,
                KeyCode::Up | KeyCode::Char('k') => {
                    self.feature_cursor = self.feature_cursor.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.feature_cursor = (self.feature_cursor + 1).min(Feature::ALL.len() - 1);
                }
                KeyCode::Char(' ') | KeyCode::Enter => {
                    self.tracker.toggle_feature(Feature::ALL[self.feature_cursor]);
                }
                _ => {}
            },
            Panel::Replay => match code {
                KeyCode::Esc | KeyCode::Char('v') | KeyCode::Char('q') => self.panel = Panel::Grid,
                KeyCode::Left | KeyCode::Char('h') => {
                    self.replay_cursor = self.replay_cursor.saturating_sub(1);
                }
                KeyCode::Right | KeyCode::Char('l') => {
                    let count = self.replay.as_ref().map(|r| r.buckets.len()).unwrap_or(0);
                    self.replay_cursor = (self.replay_cursor + 1).min(count.saturating_sub(1));
                }
                _ => {}
            },
        }
    }

    fn open_replay(&mut self) {
        if !self.tracker.flags.enabled(Feature::Replay) {
            self.tracker.status = "Enable replay in the features panel first".to_string();
            return;
        }
        match self.tracker.load_previous_replay() {
            Ok(replay) if !replay.buckets.is_empty() => {
                self.replay = Some(replay);
                self.replay_cursor = 0;
                self.panel = Panel::Replay;
            }
            Ok(replay) => {
                self.tracker.status = format!("{} has no bucket sheets", replay.path.display());
            }
            Err(e) => self.tracker.status = format!("Replay unavailable: {}", e),
        }
    }
}

/// Ticks on a timer until Ctrl-C, logging what the dashboard would show.
pub async fn run_headless(
    mut tracker: Tracker,
    mut events: UnboundedReceiver<AppEvent>,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs(config::TICK_INTERVAL_SECS));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("Headless capture loop started; data folder {}", tracker.engine.data_dir().display());

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let before = tracker.status.clone();
                let chimes = tracker.on_tick(now_eastern()).await;
                if tracker.status != before {
                    info!("{}", tracker.status);
                }
                if chimes > 0 {
                    info!("{} ticker(s) crossed the sound threshold", chimes);
                }
            }
            Some(event) = events.recv() => {
                tracker.handle_event(event);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::MARKET_TZ;
    use crate::data::testing::ScriptedSource;
    use chrono::TimeZone;
    use tokio::sync::mpsc;

    fn tracker(
        dir: &std::path::Path,
        source: ScriptedSource,
    ) -> (Tracker, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = Tracker::new(
            Arc::new(source),
            Settings::default(),
            dir.join(config::SETTINGS_FILE),
            FeatureFlags::default(),
            dir.join("sheets"),
            tx,
        );
        (tracker, rx)
    }

    #[tokio::test]
    async fn test_events_update_settings() {
        let dir = tempfile::tempdir().unwrap();
        let (mut tracker, _rx) = tracker(dir.path(), ScriptedSource::default());
        let date = NaiveDate::from_ymd_opt(2024, 7, 5).unwrap();

        assert!(tracker.handle_event(AppEvent::Show));
        assert!(!tracker.handle_event(AppEvent::DnaExported {
            date,
            path: dir.path().join("Dow_DNA__2024_07_05.csv"),
        }));
        tracker.handle_event(AppEvent::MorningResume {
            date,
            summary: "Leaders: AAPL +1.0%".to_string(),
        });

        let saved = Settings::load(&dir.path().join(config::SETTINGS_FILE));
        assert_eq!(saved.dna_last_export.as_deref(), Some("2024-07-05"));
        assert_eq!(saved.morning_resume_seen.as_deref(), Some("2024-07-05"));
        assert_eq!(tracker.notices.len(), 2);
        assert_eq!(tracker.notices[0].title, "Morning Resume");
    }

    #[tokio::test]
    async fn test_display_toggles_persist() {
        let dir = tempfile::tempdir().unwrap();
        let (mut tracker, _rx) = tracker(dir.path(), ScriptedSource::default());
        tracker.toggle_pct();
        tracker.toggle_arrows();
        tracker.adjust_sound_threshold(-5.0);

        let saved = Settings::load(&dir.path().join(config::SETTINGS_FILE));
        assert!(!saved.show_pct);
        assert!(!saved.show_arrows);
        assert_eq!(saved.sound_threshold, config::MIN_SOUND_THRESHOLD);
        assert!(!tracker.engine.display.show_pct);
    }

    #[tokio::test]
    async fn test_tick_updates_pulse() {
        let dir = tempfile::tempdir().unwrap();
        let today = now_eastern().date_naive();
        let source = ScriptedSource::default()
            .with_points("AAPL", today, &[(9, 31, 100.0), (10, 0, 110.0)])
            .with_close("AAPL", 100.0);
        let (mut tracker, _rx) = tracker(dir.path(), source);
        let tickers = vec!["AAPL".to_string()];
        tracker.engine = CaptureEngine::new(
            tracker.engine.source(),
            dir.path().join("sheets"),
            DisplayOptions::default(),
            today,
        )
        .with_tickers(tickers);

        let now = MARKET_TZ
            .from_local_datetime(&today.and_hms_opt(10, 5, 0).unwrap())
            .earliest()
            .unwrap();
        tracker.startup(now).await;
        assert_eq!(tracker.pulse.bucket, Some(1));
        assert_eq!(tracker.pulse.breadth.advancers, 1);
        assert_eq!(tracker.confidence_trail(), vec![(0, 0.0), (1, 1.0)]);
        assert!(tracker.status.starts_with("Captured 10:00 AM"));
    }

    #[tokio::test]
    async fn test_pre_open_start_runs_morning_resume() {
        let dir = tempfile::tempdir().unwrap();
        let today = now_eastern().date_naive();
        let mut source = ScriptedSource::default();
        source.daily.insert(
            "AAPL".to_string(),
            vec![
                DailyClose { date: today - chrono::Duration::days(2), close: 100.0 },
                DailyClose { date: today - chrono::Duration::days(1), close: 102.0 },
            ],
        );
        let (mut tracker, mut rx) = tracker(dir.path(), source);
        tracker.flags.set(Feature::MorningResume, true);
        tracker.engine = CaptureEngine::new(
            tracker.engine.source(),
            dir.path().join("sheets"),
            DisplayOptions::default(),
            today,
        )
        .with_tickers(vec!["AAPL".to_string()]);

        let now = MARKET_TZ
            .from_local_datetime(&today.and_hms_opt(8, 0, 0).unwrap())
            .earliest()
            .unwrap();
        tracker.startup(now).await;
        assert_eq!(tracker.status, "Waiting for the first bucket");

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AppEvent::MorningResume { date, .. } if date == today));
        tracker.handle_event(event);
        assert_eq!(tracker.notices[0].title, "Morning Resume");
        assert!(tracker.notices[0].body.starts_with("Leaders: AAPL +2.0%"));
        let today_key = today.to_string();
        assert_eq!(tracker.settings.morning_resume_seen.as_deref(), Some(today_key.as_str()));

        // Already seen today: a second idle sync stays quiet.
        tracker.startup(now).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_news_ping_recorded_after_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let (mut tracker, _rx) = tracker(dir.path(), ScriptedSource::default());
        let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();

        tracker.handle_event(AppEvent::HookMissed {
            date,
            hook: HookMiss::NewsPing { bucket: 1 },
        });
        assert!(tracker.notices.is_empty());

        tracker.handle_event(AppEvent::NewsPing {
            date,
            bucket: 1,
            title: "Mover Alert".to_string(),
            body: "AAPL +1.60% - Apple rallies".to_string(),
        });
        assert_eq!(tracker.notices.len(), 1);
        assert_eq!(tracker.notices[0].title, "Mover Alert");
    }
}
