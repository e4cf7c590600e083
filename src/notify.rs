use crate::app::AppEvent;
use crate::config::{self, Settings};
use crate::data::{DailyClose, PriceSource};
use crate::features::{Feature, FeatureFlags};
use crate::insights::top_mover;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use futures_util::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

const DNA_WINDOW: usize = 15;
const MOVER_ALERT: &str = "Mover Alert";
const TRADING_DAYS: f64 = 252.0;

/// A background hook that finished without a result; its ledger entry is
/// released so a later capture tries again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookMiss {
    NewsPing { bucket: usize },
    DnaExport,
    MorningResume,
}

/// Per-session ledgers for the post-capture hooks. Background work only reads
/// from the price source and reports back over `tx`.
pub struct Notifier {
    source: Arc<dyn PriceSource>,
    tx: UnboundedSender<AppEvent>,
    date: Option<NaiveDate>,
    news_pinged: HashSet<usize>,
    news_in_flight: HashSet<usize>,
    echo_notified: HashMap<usize, HashSet<String>>,
    sound_notified: HashMap<usize, HashSet<String>>,
    history: HashMap<String, Vec<DailyClose>>,
    dna_in_flight: Option<NaiveDate>,
    morning_in_flight: Option<NaiveDate>,
}

impl Notifier {
    pub fn new(source: Arc<dyn PriceSource>, tx: UnboundedSender<AppEvent>) -> Self {
        Self {
            source,
            tx,
            date: None,
            news_pinged: HashSet::new(),
            news_in_flight: HashSet::new(),
            echo_notified: HashMap::new(),
            sound_notified: HashMap::new(),
            history: HashMap::new(),
            dna_in_flight: None,
            morning_in_flight: None,
        }
    }

    fn begin_session(&mut self, date: NaiveDate) {
        if self.date == Some(date) {
            return;
        }
        self.date = Some(date);
        self.news_pinged.clear();
        self.news_in_flight.clear();
        self.echo_notified.clear();
        self.sound_notified.clear();
        self.history.clear();
    }

    /// Daily history delivered by an echo worker.
    pub fn store_history(&mut self, ticker: String, closes: Vec<DailyClose>) {
        self.history.insert(ticker, closes);
    }

    /// A headline arrived for `bucket`; it is not pinged again this session.
    pub fn news_delivered(&mut self, date: NaiveDate, bucket: usize) {
        if self.date == Some(date) {
            self.news_in_flight.remove(&bucket);
            self.news_pinged.insert(bucket);
        }
    }

    pub fn hook_missed(&mut self, date: NaiveDate, hook: HookMiss) {
        match hook {
            HookMiss::NewsPing { bucket } => {
                if self.date == Some(date) {
                    self.news_in_flight.remove(&bucket);
                }
            }
            HookMiss::DnaExport => {
                if self.dna_in_flight == Some(date) {
                    self.dna_in_flight = None;
                }
            }
            HookMiss::MorningResume => {
                if self.morning_in_flight == Some(date) {
                    self.morning_in_flight = None;
                }
            }
        }
    }

    /// Hooks for a sync that captured nothing, such as a pre-open start.
    pub fn on_idle_sync(
        &mut self,
        date: NaiveDate,
        flags: &FeatureFlags,
        settings: &Settings,
        tickers: &[String],
    ) {
        self.begin_session(date);
        if flags.enabled(Feature::MorningResume) {
            self.maybe_morning_resume(date, settings, tickers);
        }
    }

    /// Runs every enabled hook for a finished capture. Returns how many
    /// chimes should sound.
    #[allow(clippy::too_many_arguments)]
    pub fn on_capture(
        &mut self,
        date: NaiveDate,
        bucket: usize,
        pcts: &[(String, Option<f64>)],
        flags: &FeatureFlags,
        settings: &Settings,
        data_dir: &Path,
        tickers: &[String],
    ) -> usize {
        self.begin_session(date);

        if flags.enabled(Feature::NewsPing) {
            self.maybe_news_ping(date, bucket, pcts);
        }
        if flags.enabled(Feature::HistoricalEcho) {
            self.maybe_historical_echo(bucket, pcts);
        }
        let chimes = if flags.enabled(Feature::MarketSounds) {
            self.chimes_for(bucket, pcts, settings.effective_sound_threshold())
        } else {
            0
        };
        if flags.enabled(Feature::DnaExport) {
            self.maybe_export_dna(date, settings, data_dir, tickers);
        }
        if flags.enabled(Feature::MorningResume) {
            self.maybe_morning_resume(date, settings, tickers);
        }
        chimes
    }

    fn maybe_news_ping(
        &mut self,
        date: NaiveDate,
        bucket: usize,
        pcts: &[(String, Option<f64>)],
    ) {
        if self.news_pinged.contains(&bucket) || self.news_in_flight.contains(&bucket) {
            return;
        }
        let Some(top) = top_mover(pcts) else {
            return;
        };
        if top.pct.abs() < config::NEWS_PING_MIN_PCT {
            return;
        }
        self.news_in_flight.insert(bucket);

        let source = self.source.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = match source.headline(&top.ticker).await {
                Ok(Some(headline)) => AppEvent::NewsPing {
                    date,
                    bucket,
                    title: MOVER_ALERT.to_string(),
                    body: format!("{} {:+.2}% - {}", top.ticker, top.pct, headline),
                },
                Ok(None) => {
                    debug!("No headline for {}", top.ticker);
                    AppEvent::HookMissed { date, hook: HookMiss::NewsPing { bucket } }
                }
                Err(e) => {
                    warn!("News ping for {} failed: {:#}", top.ticker, e);
                    AppEvent::HookMissed { date, hook: HookMiss::NewsPing { bucket } }
                }
            };
            let _ = tx.send(event);
        });
    }

    fn maybe_historical_echo(&mut self, bucket: usize, pcts: &[(String, Option<f64>)]) {
        let notified = self.echo_notified.entry(bucket).or_default();
        for (ticker, pct) in pcts {
            let Some(pct) = pct.filter(|p| p.abs() >= config::HISTORICAL_ECHO_MIN_PCT) else {
                continue;
            };
            if !notified.insert(ticker.clone()) {
                continue;
            }

            let cached = self.history.get(ticker).cloned();
            let source = self.source.clone();
            let tx = self.tx.clone();
            let ticker = ticker.clone();
            tokio::spawn(async move {
                let closes = match cached {
                    Some(closes) => closes,
                    None => match source.daily_closes(&ticker, "1y").await {
                        Ok(closes) if !closes.is_empty() => {
                            let _ = tx.send(AppEvent::History {
                                ticker: ticker.clone(),
                                closes: closes.clone(),
                            });
                            closes
                        }
                        Ok(_) => return,
                        Err(e) => {
                            warn!("Daily history for {} failed: {:#}", ticker, e);
                            return;
                        }
                    },
                };
                if let Some((date, hist_pct)) = closest_echo(&closes, pct) {
                    let _ = tx.send(AppEvent::Notice {
                        title: "Historical Echo".to_string(),
                        body: format!(
                            "{} {:+.2}% echoes {} ({:+.2}%).",
                            ticker,
                            pct,
                            date.format("%b %d, %Y"),
                            hist_pct
                        ),
                    });
                }
            });
        }
    }

    fn chimes_for(
        &mut self,
        bucket: usize,
        pcts: &[(String, Option<f64>)],
        threshold: f64,
    ) -> usize {
        let triggered = self.sound_notified.entry(bucket).or_default();
        pcts.iter()
            .filter(|(_, pct)| pct.is_some_and(|p| p.abs() >= threshold))
            .filter(|(ticker, _)| triggered.insert(ticker.clone()))
            .count()
    }

    fn maybe_export_dna(
        &mut self,
        date: NaiveDate,
        settings: &Settings,
        data_dir: &Path,
        tickers: &[String],
    ) {
        if date.weekday() != Weekday::Fri {
            return;
        }
        let key = date.to_string();
        if settings.dna_last_export.as_deref() == Some(key.as_str())
            || self.dna_in_flight == Some(date)
        {
            return;
        }
        self.dna_in_flight = Some(date);

        let source = self.source.clone();
        let tx = self.tx.clone();
        let tickers = tickers.to_vec();
        let path = dna_path(data_dir, date);
        tokio::spawn(async move {
            let series = fetch_daily(source, &tickers, "2mo").await;
            let missed = AppEvent::HookMissed { date, hook: HookMiss::DnaExport };
            let Some(report) = dna_stats(&series) else {
                debug!("Not enough daily data for the DNA export");
                let _ = tx.send(missed);
                return;
            };
            match write_dna_csv(&path, date, &report) {
                Ok(()) => {
                    let _ = tx.send(AppEvent::DnaExported { date, path });
                }
                Err(e) => {
                    warn!("DNA export failed: {:#}", e);
                    let _ = tx.send(missed);
                }
            }
        });
    }

    fn maybe_morning_resume(&mut self, date: NaiveDate, settings: &Settings, tickers: &[String]) {
        let key = date.to_string();
        if settings.morning_resume_seen.as_deref() == Some(key.as_str())
            || self.morning_in_flight == Some(date)
        {
            return;
        }
        self.morning_in_flight = Some(date);

        let source = self.source.clone();
        let tx = self.tx.clone();
        let tickers = tickers.to_vec();
        tokio::spawn(async move {
            let series = fetch_daily(source.clone(), &tickers, "5d").await;
            let index = match source.daily_closes(config::DOW_INDEX_SYMBOL, "5d").await {
                Ok(closes) => closes,
                Err(e) => {
                    debug!("Index closes unavailable: {:#}", e);
                    Vec::new()
                }
            };
            let event = match morning_summary(&series, &index) {
                Some(summary) => AppEvent::MorningResume { date, summary },
                None => AppEvent::HookMissed { date, hook: HookMiss::MorningResume },
            };
            let _ = tx.send(event);
        });
    }
}

async fn fetch_daily(
    source: Arc<dyn PriceSource>,
    tickers: &[String],
    range: &str,
) -> Vec<(String, Vec<DailyClose>)> {
    let range = range.to_string();
    let mut series: Vec<(String, Vec<DailyClose>)> = stream::iter(tickers.to_vec())
        .map(|ticker| {
            let source = source.clone();
            let range = range.clone();
            async move {
                let closes = match source.daily_closes(&ticker, &range).await {
                    Ok(closes) => closes,
                    Err(e) => {
                        debug!("daily_closes({}, {}) failed: {:#}", ticker, range, e);
                        Vec::new()
                    }
                };
                (ticker, closes)
            }
        })
        .buffer_unordered(config::fetch_concurrency())
        .collect()
        .await;
    let order: HashMap<&String, usize> = tickers.iter().enumerate().map(|(i, t)| (t, i)).collect();
    series.sort_by_key(|(ticker, _)| order.get(ticker).copied().unwrap_or(usize::MAX));
    series
}

/// Daily percentage returns, dated by the later close.
pub fn daily_returns(closes: &[DailyClose]) -> Vec<(NaiveDate, f64)> {
    closes
        .windows(2)
        .filter(|w| w[0].close != 0.0)
        .map(|w| (w[1].date, (w[1].close / w[0].close - 1.0) * 100.0))
        .filter(|(_, r)| r.is_finite())
        .collect()
}

/// The past daily move closest to `pct`; the earliest wins ties.
pub fn closest_echo(closes: &[DailyClose], pct: f64) -> Option<(NaiveDate, f64)> {
    let mut best: Option<(NaiveDate, f64)> = None;
    for (date, ret) in daily_returns(closes) {
        if best.is_none_or(|(_, b)| (ret - pct).abs() < (b - pct).abs()) {
            best = Some((date, ret));
        }
    }
    best
}

pub fn dna_file_name(date: NaiveDate) -> String {
    format!("Dow_DNA__{}.csv", date.format("%Y_%m_%d"))
}

#[derive(Clone, Debug, PartialEq)]
pub struct DnaReport {
    pub tickers: Vec<String>,
    pub correlation: Vec<Vec<Option<f64>>>,
    pub avg_return_pct: Vec<f64>,
    pub vol_pct: Vec<Option<f64>>,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation.
fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

fn correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let (ma, mb) = (mean(a), mean(b));
    let cov: f64 = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum();
    let va: f64 = a.iter().map(|x| (x - ma).powi(2)).sum();
    let vb: f64 = b.iter().map(|y| (y - mb).powi(2)).sum();
    let denom = (va * vb).sqrt();
    (denom > 0.0).then(|| cov / denom)
}

/// Correlation matrix and summary stats over the last 15 daily returns that
/// every ticker has. Tickers without any data are left out.
pub fn dna_stats(series: &[(String, Vec<DailyClose>)]) -> Option<DnaReport> {
    let usable: Vec<&(String, Vec<DailyClose>)> =
        series.iter().filter(|(_, closes)| !closes.is_empty()).collect();
    if usable.is_empty() {
        return None;
    }

    let mut common: BTreeSet<NaiveDate> = usable[0].1.iter().map(|c| c.date).collect();
    for (_, closes) in &usable[1..] {
        let dates: BTreeSet<NaiveDate> = closes.iter().map(|c| c.date).collect();
        common = common.intersection(&dates).copied().collect();
    }
    if common.len() < 2 {
        return None;
    }

    let returns: Vec<Vec<f64>> = usable
        .iter()
        .map(|(_, closes)| {
            let by_date: HashMap<NaiveDate, f64> =
                closes.iter().map(|c| (c.date, c.close)).collect();
            let aligned: Vec<f64> = common.iter().filter_map(|d| by_date.get(d).copied()).collect();
            let all: Vec<f64> = aligned.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
            let start = all.len().saturating_sub(DNA_WINDOW);
            all[start..].to_vec()
        })
        .collect();
    if returns.iter().any(|r| r.is_empty() || r.iter().any(|v| !v.is_finite())) {
        return None;
    }

    let correlation = returns
        .iter()
        .map(|a| returns.iter().map(|b| correlation(a, b)).collect())
        .collect();
    Some(DnaReport {
        tickers: usable.iter().map(|(t, _)| t.clone()).collect(),
        correlation,
        avg_return_pct: returns.iter().map(|r| mean(r) * 100.0).collect(),
        vol_pct: returns
            .iter()
            .map(|r| std_dev(r).map(|s| s * TRADING_DAYS.sqrt() * 100.0))
            .collect(),
    })
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

pub fn write_dna_csv(path: &Path, date: NaiveDate, report: &DnaReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;

    writer.write_record([format!("# Dow DNA Export generated on {}", date.format("%Y-%m-%d"))])?;
    writer.write_record(["# Correlation Matrix"])?;
    let mut header = vec![String::new()];
    header.extend(report.tickers.iter().cloned());
    writer.write_record(&header)?;
    for (ticker, row) in report.tickers.iter().zip(&report.correlation) {
        let mut record = vec![ticker.clone()];
        record.extend(row.iter().map(|v| fmt_opt(*v)));
        writer.write_record(&record)?;
    }

    writer.write_record(["# Summary Stats: % returns and annualized vol"])?;
    writer.write_record(["", "avg_return_%", "vol_%"])?;
    for (i, ticker) in report.tickers.iter().enumerate() {
        writer.write_record([
            ticker.clone(),
            format!("{:.6}", report.avg_return_pct[i]),
            fmt_opt(report.vol_pct[i]),
        ])?;
    }
    writer.flush()?;
    info!("DNA export written to {}", path.display());
    Ok(())
}

/// Yesterday's leaders and laggards plus the index finish.
pub fn morning_summary(
    series: &[(String, Vec<DailyClose>)],
    index: &[DailyClose],
) -> Option<String> {
    let mut changes: Vec<(String, f64)> = series
        .iter()
        .filter_map(|(ticker, closes)| {
            let ret = daily_returns(closes).last()?.1;
            Some((ticker.clone(), ret))
        })
        .collect();
    if changes.is_empty() {
        return None;
    }

    changes.sort_by(|a, b| b.1.total_cmp(&a.1));
    let fmt = |items: &[(String, f64)]| {
        items
            .iter()
            .map(|(t, v)| format!("{} {:+.1}%", t, v))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let leaders = fmt(&changes[..changes.len().min(3)]);
    let mut tail: Vec<(String, f64)> = changes.iter().rev().take(3).cloned().collect();
    tail.sort_by(|a, b| a.1.total_cmp(&b.1));
    let laggards = fmt(&tail);

    let index_txt = daily_returns(index)
        .last()
        .map(|(_, r)| format!("Dow closed {:+.2}%", r))
        .unwrap_or_default();
    Some(
        format!("Leaders: {}\nLaggards: {}\n{}", leaders, laggards, index_txt)
            .trim()
            .to_string(),
    )
}

pub fn dna_path(data_dir: &Path, date: NaiveDate) -> PathBuf {
    data_dir.join(dna_file_name(date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testing::ScriptedSource;
    use tokio::sync::mpsc;

    fn closes(start: NaiveDate, values: &[f64]) -> Vec<DailyClose> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| DailyClose {
                date: start + chrono::Duration::days(i as i64),
                close: *v,
            })
            .collect()
    }

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn test_closest_echo() {
        let c = closes(d(1, 1), &[100.0, 102.0, 99.96, 103.0]);
        let (date, ret) = closest_echo(&c, 2.9).unwrap();
        assert_eq!(date, d(1, 4));
        assert!((ret - 3.0412).abs() < 1e-3);
        let (date, _) = closest_echo(&c, -1.0).unwrap();
        assert_eq!(date, d(1, 3));
        assert!(closest_echo(&c[..1], 1.0).is_none());
    }

    #[test]
    fn test_dna_stats() {
        let a = closes(d(1, 1), &[100.0, 101.0, 102.0, 101.0, 103.0]);
        let b: Vec<DailyClose> = a
            .iter()
            .map(|c| DailyClose { date: c.date, close: c.close * 2.0 })
            .collect();
        let series = vec![
            ("AAA".to_string(), a),
            ("BBB".to_string(), b),
            ("NONE".to_string(), Vec::new()),
        ];
        let report = dna_stats(&series).unwrap();
        assert_eq!(report.tickers, vec!["AAA", "BBB"]);
        assert!((report.correlation[0][1].unwrap() - 1.0).abs() < 1e-9);
        assert!((report.avg_return_pct[0] - report.avg_return_pct[1]).abs() < 1e-9);
        assert!(report.vol_pct[0].unwrap() > 0.0);
    }

    #[test]
    fn test_dna_csv_written() {
        let dir = tempfile::tempdir().unwrap();
        let report = DnaReport {
            tickers: vec!["AAA".to_string()],
            correlation: vec![vec![Some(1.0)]],
            avg_return_pct: vec![0.5],
            vol_pct: vec![None],
        };
        let path = dna_path(dir.path(), d(7, 5));
        write_dna_csv(&path, d(7, 5), &report).unwrap();
        assert_eq!(path.file_name().unwrap(), "Dow_DNA__2024_07_05.csv");
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Dow DNA Export generated on 2024-07-05"));
        assert!(text.contains("AAA,1.000000"));
        assert!(text.contains("AAA,0.500000,"));
    }

    #[test]
    fn test_morning_summary() {
        let series: Vec<(String, Vec<DailyClose>)> = [
            ("A", 1.0), ("B", 2.0), ("C", -1.0), ("D", 0.5), ("E", -3.0),
        ]
        .iter()
        .map(|(t, pct)| (t.to_string(), closes(d(7, 1), &[100.0, 100.0 + pct])))
        .collect();
        let index = closes(d(7, 1), &[40000.0, 40400.0]);
        let summary = morning_summary(&series, &index).unwrap();
        assert_eq!(
            summary,
            "Leaders: B +2.0%, A +1.0%, D +0.5%\n\
             Laggards: E -3.0%, C -1.0%, D +0.5%\n\
             Dow closed +1.00%"
        );
        assert!(morning_summary(&[], &index).is_none());
    }

    #[tokio::test]
    async fn test_hook_ledgers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut source = ScriptedSource::default();
        source.headlines.insert("AAPL".to_string(), "Apple rallies".to_string());
        let mut notifier = Notifier::new(Arc::new(source), tx);

        let mut flags = FeatureFlags::default();
        flags.set(Feature::NewsPing, true);
        flags.set(Feature::MarketSounds, true);
        let settings = Settings::default();
        let dir = tempfile::tempdir().unwrap();
        let pcts = vec![("AAPL".to_string(), Some(1.6)), ("KO".to_string(), Some(-0.2))];
        let tickers = vec!["AAPL".to_string(), "KO".to_string()];

        let chimes =
            notifier.on_capture(d(7, 1), 2, &pcts, &flags, &settings, dir.path(), &tickers);
        assert_eq!(chimes, 1);
        let again = notifier.on_capture(d(7, 1), 2, &pcts, &flags, &settings, dir.path(), &tickers);
        assert_eq!(again, 0);

        match rx.recv().await.unwrap() {
            AppEvent::NewsPing { date, bucket, title, body } => {
                assert_eq!((date, bucket), (d(7, 1), 2));
                assert_eq!(title, "Mover Alert");
                assert_eq!(body, "AAPL +1.60% - Apple rallies");
                notifier.news_delivered(date, bucket);
            }
            other => panic!("unexpected event {:?}", other),
        }
        notifier.on_capture(d(7, 1), 2, &pcts, &flags, &settings, dir.path(), &tickers);
        assert!(rx.try_recv().is_err());

        // New session resets the ledgers.
        assert_eq!(
            notifier.on_capture(d(7, 2), 2, &pcts, &flags, &settings, dir.path(), &tickers),
            1
        );
    }

    #[tokio::test]
    async fn test_missed_hooks_are_retried() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut notifier = Notifier::new(Arc::new(ScriptedSource::default()), tx);
        let mut flags = FeatureFlags::default();
        flags.set(Feature::NewsPing, true);
        flags.set(Feature::DnaExport, true);
        let settings = Settings::default();
        let dir = tempfile::tempdir().unwrap();
        let pcts = vec![("AAPL".to_string(), Some(2.5))];
        let tickers = vec!["AAPL".to_string()];
        let friday = d(7, 5);

        notifier.on_capture(friday, 1, &pcts, &flags, &settings, dir.path(), &tickers);
        let mut missed = Vec::new();
        for _ in 0..2 {
            match rx.recv().await.unwrap() {
                AppEvent::HookMissed { date, hook } => {
                    assert_eq!(date, friday);
                    missed.push(hook);
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert!(missed.contains(&HookMiss::NewsPing { bucket: 1 }));
        assert!(missed.contains(&HookMiss::DnaExport));

        // Still in flight: nothing new is started.
        notifier.on_capture(friday, 1, &pcts, &flags, &settings, dir.path(), &tickers);
        assert!(rx.try_recv().is_err());

        for hook in missed {
            notifier.hook_missed(friday, hook);
        }
        notifier.on_capture(friday, 1, &pcts, &flags, &settings, dir.path(), &tickers);
        for _ in 0..2 {
            assert!(matches!(rx.recv().await.unwrap(), AppEvent::HookMissed { .. }));
        }
    }

    #[tokio::test]
    async fn test_morning_resume_on_idle_sync() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut source = ScriptedSource::default();
        source
            .daily
            .insert("AAPL".to_string(), closes(d(7, 1), &[100.0, 101.0]));
        let mut notifier = Notifier::new(Arc::new(source), tx);
        let mut flags = FeatureFlags::default();
        flags.set(Feature::MorningResume, true);
        let tickers = vec!["AAPL".to_string()];

        notifier.on_idle_sync(d(7, 2), &flags, &Settings::default(), &tickers);
        match rx.recv().await.unwrap() {
            AppEvent::MorningResume { date, summary } => {
                assert_eq!(date, d(7, 2));
                assert!(summary.starts_with("Leaders: AAPL +1.0%"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
