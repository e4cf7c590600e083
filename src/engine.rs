use crate::baseline::{Baseline, BaselineInputs, BaselinePolicy, pct_change};
use crate::calendar::{
    BUCKET_COUNT, BUCKETS, CLOSING_BUCKET, bucket_index_at, format_et, is_market_hours,
};
use crate::config;
use crate::data::{PriceAdapter, PriceSource};
use crate::session::Session;
use crate::workbook::{self, bucket_sheet, grid_sheet, workbook_path};
use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Timelike};
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How grid cells are rendered, both on screen and in the Grid sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayOptions {
    pub show_pct: bool,
    pub show_arrows: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_pct: true,
            show_arrows: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub price: Option<f64>,
    pub baseline: Option<Baseline>,
    pub pct: Option<f64>,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct GridRow {
    pub ticker: String,
    pub label: String,
    pub cells: Vec<Cell>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExportOutcome {
    Written(PathBuf),
    Unchanged,
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct CaptureReport {
    pub bucket: usize,
    pub at: DateTime<Tz>,
    pub captured: usize,
    /// Percentage change per ticker, in ticker order.
    pub pcts: Vec<(String, Option<f64>)>,
    pub export: ExportOutcome,
}

impl CaptureReport {
    pub fn summary(&self) -> String {
        let export = match &self.export {
            ExportOutcome::Written(_) => "saved",
            ExportOutcome::Unchanged => "unchanged",
            ExportOutcome::Failed(_) => "save failed",
        };
        format!(
            "Captured {} ({}/{} prices) at {}, {}",
            BUCKETS[self.bucket].label,
            self.captured,
            self.pcts.len(),
            format_et(&self.at),
            export
        )
    }
}

#[derive(Clone, Debug)]
pub enum TickOutcome {
    /// Same (hour, minute) as the previous tick.
    Duplicate,
    Idle { status: String },
    Captured(CaptureReport),
    /// A new session started and was backfilled.
    Backfilled(Vec<CaptureReport>),
}

/// `▲ 187.30  (+1.25%)`, or `--` without a price. The arrow needs a pct.
pub fn render_cell_text(price: Option<f64>, pct: Option<f64>, display: DisplayOptions) -> String {
    let Some(price) = price else {
        return "--".to_string();
    };
    let mut text = format!("{:.2}", price);
    if display.show_pct {
        if let Some(pct) = pct {
            text = format!("{}  ({:+.2}%)", text, pct);
        }
    }
    if display.show_arrows {
        if let Some(pct) = pct {
            let arrow = if pct > 0.0 {
                "▲"
            } else if pct < 0.0 {
                "▼"
            } else {
                "•"
            };
            text = format!("{} {}", arrow, text);
        }
    }
    text
}

pub struct CaptureEngine {
    prices: PriceAdapter,
    session: Session,
    prior_loader: workbook::PriorSessionLoader,
    data_dir: PathBuf,
    policy: BaselinePolicy,
    tickers: Vec<String>,
    pub display: DisplayOptions,
}

impl CaptureEngine {
    pub fn new(
        source: Arc<dyn PriceSource>,
        data_dir: PathBuf,
        display: DisplayOptions,
        today: NaiveDate,
    ) -> Self {
        let mut prices = PriceAdapter::new(source);
        prices.begin_day(today);
        let mut engine = Self {
            prices,
            session: Session::new(today),
            prior_loader: workbook::PriorSessionLoader::new(),
            data_dir,
            policy: BaselinePolicy::default(),
            tickers: config::tickers(),
            display,
        };
        engine.reload_prior_session();
        engine
    }

    pub fn with_tickers(mut self, tickers: Vec<String>) -> Self {
        self.tickers = tickers;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn source(&self) -> Arc<dyn PriceSource> {
        self.prices.source()
    }

    pub fn prices(&self) -> &PriceAdapter {
        &self.prices
    }

    pub fn workbook_path(&self) -> PathBuf {
        workbook_path(&self.data_dir, self.session.date())
    }

    pub fn last_close(&self, ticker: &str) -> Option<f64> {
        self.prices.cached_close(ticker)
    }

    /// Starts a fresh session when `date` differs from the current one.
    /// Returns true on rollover.
    pub fn ensure_session(&mut self, date: NaiveDate) -> bool {
        if self.session.date() == date {
            return false;
        }
        info!("Session rollover: {} -> {}", self.session.date(), date);
        self.session = Session::new(date);
        self.prices.begin_day(date);
        self.prior_loader.clear();
        self.reload_prior_session();
        true
    }

    /// Switches the save folder; the previous-session baseline is re-read from it.
    pub fn set_data_dir(&mut self, dir: PathBuf) {
        if dir == self.data_dir {
            return;
        }
        info!("Data folder changed to {}", dir.display());
        self.data_dir = dir;
        self.prior_loader.clear();
        self.reload_prior_session();
    }

    fn reload_prior_session(&mut self) {
        let label = BUCKETS[CLOSING_BUCKET].label;
        let values = self
            .prior_loader
            .load(&self.data_dir, self.session.date(), label);
        self.session.set_prior_session(values);
        info!(
            "Prior session '{}' baseline: {} tickers",
            label,
            self.session.prior_session_len()
        );
    }

    pub fn baseline(&self, ticker: &str, bucket: usize) -> Option<Baseline> {
        let row = self.session.row(ticker);
        self.policy.resolve(
            bucket,
            BaselineInputs {
                row: &row,
                prior_session: self.session.prior_session(ticker),
                last_close: self.prices.cached_close(ticker),
            },
        )
    }

    pub fn cell(&self, ticker: &str, bucket: usize) -> Cell {
        let price = self.session.price(ticker, bucket);
        let baseline = self.baseline(ticker, bucket);
        let pct = pct_change(price, baseline.map(|b| b.price));
        Cell {
            price,
            baseline,
            pct,
            text: render_cell_text(price, pct, self.display),
        }
    }

    pub fn pcts(&self, bucket: usize) -> Vec<(String, Option<f64>)> {
        self.tickers
            .iter()
            .map(|ticker| (ticker.clone(), self.cell(ticker, bucket).pct))
            .collect()
    }

    pub fn grid(&self) -> Vec<GridRow> {
        self.tickers
            .iter()
            .enumerate()
            .map(|(index, ticker)| GridRow {
                ticker: ticker.clone(),
                label: config::row_label(index, ticker),
                cells: (0..BUCKET_COUNT)
                    .map(|b| {
                        let mut cell = self.cell(ticker, b);
                        if !self.session.is_captured(b) {
                            cell.text.clear();
                        }
                        cell
                    })
                    .collect(),
            })
            .collect()
    }

    /// Writes the Grid and bucket sheets unless the bucket's snapshot matches
    /// the last successful write.
    pub fn export(&mut self, bucket: usize) -> ExportOutcome {
        let snapshot = self.session.snapshot(&self.tickers, bucket);
        if !self.session.needs_export(bucket, &snapshot) {
            debug!("{} unchanged; skipping export", BUCKETS[bucket].label);
            return ExportOutcome::Unchanged;
        }

        let grid = self.grid();
        let grid_rows: Vec<(String, Vec<String>)> = grid
            .iter()
            .map(|row| {
                let texts = row.cells.iter().map(|c| c.text.clone()).collect();
                (row.label.clone(), texts)
            })
            .collect();
        let bucket_rows: Vec<(String, Option<f64>, Option<f64>)> = grid
            .iter()
            .map(|row| {
                let cell = &row.cells[bucket];
                (row.label.clone(), cell.price, cell.pct)
            })
            .collect();

        let path = self.workbook_path();
        match workbook::write_sheets(
            &path,
            vec![grid_sheet(&grid_rows), bucket_sheet(bucket, &bucket_rows)],
        ) {
            Ok(()) => {
                self.session.mark_exported(bucket, snapshot);
                info!("Saved {} to {}", BUCKETS[bucket].label, path.display());
                ExportOutcome::Written(path)
            }
            Err(e) => {
                warn!("Export of {} failed: {}", BUCKETS[bucket].label, e);
                ExportOutcome::Failed(e.to_string())
            }
        }
    }

    async fn capture_bucket(&mut self, bucket: usize, now: DateTime<Tz>) -> Result<CaptureReport> {
        let day = self.session.date();
        let threshold = BUCKETS[bucket];
        if threshold.at(day).is_none() {
            return Err(anyhow!("{} has no valid time on {}", threshold.label, day));
        }

        let tickers = self.tickers.clone();
        let mut captured = 0usize;
        for ticker in &tickers {
            let price = self
                .prices
                .price_at_or_before(ticker, day, threshold.hour, threshold.minute)
                .await;
            if price.is_some() {
                captured += 1;
            }
            self.session.capture(ticker, bucket, price);
        }
        self.session.record_capture(bucket, now);

        let export = self.export(bucket);
        Ok(CaptureReport {
            bucket,
            at: now,
            captured,
            pcts: self.pcts(bucket),
            export,
        })
    }

    /// Captures every bucket from the first through the current one, in order.
    pub async fn backfill_to(&mut self, now: DateTime<Tz>) -> Result<Vec<CaptureReport>> {
        self.ensure_session(now.date_naive());
        let Some(current) = bucket_index_at(now.hour(), now.minute()) else {
            debug!("Backfill at {}: before the first bucket", format_et(&now));
            return Ok(Vec::new());
        };

        let day = self.session.date();
        let tickers = self.tickers.clone();
        self.prices.refresh_intraday(&tickers, day).await;
        self.prices.ensure_closes(&tickers).await;

        let mut reports = Vec::with_capacity(current + 1);
        for bucket in 0..=current {
            reports.push(self.capture_bucket(bucket, now).await?);
        }
        info!(
            "Backfilled {} bucket(s) through {}",
            reports.len(),
            BUCKETS[current].label
        );
        Ok(reports)
    }

    /// Recomputes only the current bucket. `None` before the first bucket.
    pub async fn refresh(&mut self, now: DateTime<Tz>) -> Result<Option<CaptureReport>> {
        self.ensure_session(now.date_naive());
        let Some(current) = bucket_index_at(now.hour(), now.minute()) else {
            return Ok(None);
        };

        let day = self.session.date();
        let tickers = self.tickers.clone();
        self.prices.refresh_intraday(&tickers, day).await;
        self.prices.ensure_closes(&tickers).await;

        let report = self.capture_bucket(current, now).await?;
        info!("{}", report.summary());
        Ok(Some(report))
    }

    /// One timer tick: rollover check, duplicate-minute suppression, then a
    /// refresh inside market hours.
    pub async fn tick(&mut self, now: DateTime<Tz>) -> Result<TickOutcome> {
        let (hour, minute) = (now.hour(), now.minute());

        if self.ensure_session(now.date_naive()) {
            self.session.claim_minute(hour, minute);
            let reports = self.backfill_to(now).await?;
            return Ok(TickOutcome::Backfilled(reports));
        }

        if !self.session.claim_minute(hour, minute) {
            return Ok(TickOutcome::Duplicate);
        }

        if !is_market_hours(hour, minute) {
            let status = if bucket_index_at(hour, minute).is_none() {
                format!("Pre-market ({})", format_et(&now))
            } else {
                format!("Market closed ({})", format_et(&now))
            };
            return Ok(TickOutcome::Idle { status });
        }

        match self.refresh(now).await? {
            Some(report) => Ok(TickOutcome::Captured(report)),
            None => Ok(TickOutcome::Idle {
                status: format!("Waiting for {}", BUCKETS[0].label),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::BaselineSource;
    use crate::calendar::MARKET_TZ;
    use crate::data::testing::ScriptedSource;
    use crate::workbook::read_bucket_prices;
    use chrono::TimeZone;
    use std::sync::atomic::Ordering;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn at(m: u32, d: u32, hour: u32, minute: u32) -> DateTime<Tz> {
        MARKET_TZ.with_ymd_and_hms(2024, m, d, hour, minute, 0).unwrap()
    }

    fn tickers() -> Vec<String> {
        vec!["AAPL".to_string(), "MSFT".to_string()]
    }

    fn engine(source: ScriptedSource, dir: &Path, today: NaiveDate) -> CaptureEngine {
        CaptureEngine::new(Arc::new(source), dir.to_path_buf(), DisplayOptions::default(), today)
            .with_tickers(tickers())
    }

    fn write_prior_close(dir: &Path, date: NaiveDate, rows: &[(&str, f64)]) {
        let rows: Vec<(String, Option<f64>, Option<f64>)> = rows
            .iter()
            .enumerate()
            .map(|(i, (tk, p))| (config::row_label(i, tk), Some(*p), None))
            .collect();
        workbook::write_sheets(
            &workbook_path(dir, date),
            vec![bucket_sheet(CLOSING_BUCKET, &rows)],
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_backfill_at_1115_chains_baselines() {
        let dir = tempfile::tempdir().unwrap();
        write_prior_close(dir.path(), day(6, 28), &[("AAPL", 99.0)]);

        let source = ScriptedSource::default()
            .with_points(
                "AAPL",
                day(7, 1),
                &[
                    (9, 30, 98.0),
                    (9, 31, 100.0),
                    (9, 50, 103.0),
                    (10, 0, 102.0),
                    (11, 0, 101.0),
                    (11, 10, 120.0),
                ],
            )
            .with_close("AAPL", 97.0)
            .with_close("MSFT", 400.0);
        let mut engine = engine(source, dir.path(), day(7, 1));

        let reports = engine.backfill_to(at(7, 1, 11, 15)).await.unwrap();
        let buckets: Vec<usize> = reports.iter().map(|r| r.bucket).collect();
        assert_eq!(buckets, vec![0, 1, 2]);
        assert!(reports.iter().all(|r| matches!(r.export, ExportOutcome::Written(_))));

        assert_eq!(engine.session().price("AAPL", 0), Some(100.0));
        assert_eq!(engine.session().price("AAPL", 1), Some(102.0));
        assert_eq!(engine.session().price("AAPL", 2), Some(101.0));
        assert_eq!(engine.session().price("AAPL", 3), None);

        let b0 = engine.baseline("AAPL", 0).unwrap();
        assert_eq!((b0.price, b0.source), (99.0, BaselineSource::PriorSession));
        let b1 = engine.baseline("AAPL", 1).unwrap();
        assert_eq!((b1.price, b1.source), (100.0, BaselineSource::EarlierBucket(0)));
        let b2 = engine.baseline("AAPL", 2).unwrap();
        assert_eq!((b2.price, b2.source), (102.0, BaselineSource::EarlierBucket(1)));

        // No series and no prior capture: last close on both sides.
        assert_eq!(engine.session().price("MSFT", 0), Some(400.0));
        let m0 = engine.baseline("MSFT", 0).unwrap();
        assert_eq!(m0.source, BaselineSource::LastClose);
        assert_eq!(engine.cell("MSFT", 0).pct, Some(0.0));

        let path = engine.workbook_path();
        assert_eq!(path.file_name().unwrap(), "Sheet__07_01_2024.xlsx");
        assert_eq!(read_bucket_prices(&path, "10:00 AM").unwrap()["AAPL"], 102.0);
    }

    #[tokio::test]
    async fn test_refresh_rewrites_only_the_current_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::default()
            .with_points("AAPL", day(7, 1), &[(9, 31, 100.0), (10, 0, 102.0), (11, 0, 101.0)])
            .with_close("MSFT", 400.0);
        let mut engine = engine(source, dir.path(), day(7, 1));
        engine.backfill_to(at(7, 1, 10, 5)).await.unwrap();

        // Stand-in for a value only the earlier pass could have seen.
        engine.session.capture("AAPL", 0, Some(98.5));
        let report = engine.refresh(at(7, 1, 11, 15)).await.unwrap().unwrap();
        assert_eq!(report.bucket, 2);
        assert_eq!(engine.session().price("AAPL", 0), Some(98.5));
        assert_eq!(engine.session().price("AAPL", 1), Some(102.0));
        assert_eq!(engine.session().price("AAPL", 2), Some(101.0));

        let path = engine.workbook_path();
        assert_eq!(read_bucket_prices(&path, "11:00 AM").unwrap()["AAPL"], 101.0);
        assert_eq!(read_bucket_prices(&path, "9:31 AM").unwrap()["AAPL"], 100.0);
        assert!(read_bucket_prices(&path, "12 NOON").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_grid_leaves_future_buckets_blank() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::default()
            .with_points("AAPL", day(7, 1), &[(9, 31, 100.0), (10, 0, 102.0)]);
        let mut engine = engine(source, dir.path(), day(7, 1));
        engine.backfill_to(at(7, 1, 10, 5)).await.unwrap();

        let grid = engine.grid();
        assert_eq!(grid[0].cells[1].text, "▲ 102.00  (+2.00%)");
        // Captured but no price for MSFT; nothing captured yet at noon.
        assert_eq!(grid[1].cells[0].text, "--");
        assert_eq!(grid[0].cells[3].text, "");

        let sheets = workbook::read_sheets(&engine.workbook_path()).unwrap();
        let sheet = sheets.iter().find(|s| s.name == workbook::GRID_SHEET).unwrap();
        assert_eq!(sheet.rows[2][1], workbook::CellValue::Text("--".to_string()));
        assert_eq!(sheet.rows[1][4], workbook::CellValue::Empty);
    }

    #[tokio::test]
    async fn test_backfill_does_not_refetch_missing_tickers() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(
            ScriptedSource::default()
                .with_points("AAPL", day(7, 1), &[(9, 31, 100.0), (16, 0, 101.0)])
                .with_close("AAPL", 99.0)
                .failing("WBA"),
        );
        let mut engine = CaptureEngine::new(
            source.clone(),
            dir.path().to_path_buf(),
            DisplayOptions::default(),
            day(7, 1),
        )
        .with_tickers(vec!["AAPL".to_string(), "WBA".to_string()]);

        let reports = engine.backfill_to(at(7, 1, 16, 5)).await.unwrap();
        assert_eq!(reports.len(), BUCKET_COUNT);
        assert_eq!(engine.session().price("WBA", CLOSING_BUCKET), None);
        assert_eq!(source.series_calls.load(Ordering::SeqCst), 2);
        assert_eq!(source.close_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_export_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::default()
            .with_points("AAPL", day(7, 1), &[(9, 31, 100.0)])
            .with_close("MSFT", 400.0);
        let mut engine = engine(source, dir.path(), day(7, 1));

        engine.backfill_to(at(7, 1, 9, 40)).await.unwrap();
        let modified = std::fs::metadata(engine.workbook_path()).unwrap().modified().unwrap();

        assert_eq!(engine.export(0), ExportOutcome::Unchanged);
        let report = engine.refresh(at(7, 1, 9, 41)).await.unwrap().unwrap();
        assert_eq!(report.export, ExportOutcome::Unchanged);
        assert_eq!(
            std::fs::metadata(engine.workbook_path()).unwrap().modified().unwrap(),
            modified
        );
    }

    #[tokio::test]
    async fn test_failed_export_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a folder").unwrap();

        let source = ScriptedSource::default().with_close("AAPL", 10.0);
        let mut engine = engine(source, &blocker.join("sheets"), day(7, 1));
        let reports = engine.backfill_to(at(7, 1, 9, 35)).await.unwrap();
        assert!(matches!(reports[0].export, ExportOutcome::Failed(_)));
        assert_eq!(engine.session().price("AAPL", 0), Some(10.0));

        engine.set_data_dir(dir.path().join("sheets"));
        assert!(matches!(engine.export(0), ExportOutcome::Written(_)));
        assert_eq!(engine.export(0), ExportOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_rollover_resets_and_reloads_prior_close() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::default()
            .with_points("AAPL", day(7, 1), &[(9, 31, 100.0), (15, 59, 104.0), (16, 0, 105.0)])
            .with_points("AAPL", day(7, 2), &[(9, 31, 106.0)])
            .with_close("MSFT", 400.0);
        let mut engine = engine(source, dir.path(), day(7, 1));

        let reports = engine.backfill_to(at(7, 1, 16, 5)).await.unwrap();
        assert_eq!(reports.len(), BUCKET_COUNT);
        assert_eq!(engine.session().price("AAPL", CLOSING_BUCKET), Some(105.0));

        assert!(engine.ensure_session(day(7, 2)));
        assert!(!engine.ensure_session(day(7, 2)));
        assert!(!engine.session().has_captures());
        assert_eq!(engine.session().prior_session("AAPL"), Some(105.0));
        assert_eq!(engine.session().prior_session("MSFT"), Some(400.0));

        let outcome = engine.tick(at(7, 2, 9, 45)).await.unwrap();
        assert!(matches!(outcome, TickOutcome::Captured(_)));
        let cell = engine.cell("AAPL", 0);
        assert_eq!(cell.price, Some(106.0));
        assert_eq!(cell.baseline.unwrap().price, 105.0);
    }

    #[tokio::test]
    async fn test_tick_rollover_backfills() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::default()
            .with_points("AAPL", day(7, 2), &[(9, 31, 50.0), (10, 0, 55.0)])
            .with_close("AAPL", 45.0);
        let mut engine = engine(source, dir.path(), day(7, 1));
        engine.backfill_to(at(7, 1, 12, 0)).await.unwrap();

        match engine.tick(at(7, 2, 10, 30)).await.unwrap() {
            TickOutcome::Backfilled(reports) => assert_eq!(reports.len(), 2),
            other => panic!("expected backfill, got {:?}", other),
        }
        assert_eq!(engine.session().date(), day(7, 2));
        assert!(matches!(engine.tick(at(7, 2, 10, 30)).await.unwrap(), TickOutcome::Duplicate));
    }

    #[tokio::test]
    async fn test_tick_idle_outside_market_hours() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::default().with_close("AAPL", 10.0);
        let mut engine = engine(source, dir.path(), day(7, 1));

        match engine.tick(at(7, 1, 8, 0)).await.unwrap() {
            TickOutcome::Idle { status } => assert!(status.starts_with("Pre-market")),
            other => panic!("expected idle, got {:?}", other),
        }
        match engine.tick(at(7, 1, 17, 0)).await.unwrap() {
            TickOutcome::Idle { status } => assert!(status.starts_with("Market closed")),
            other => panic!("expected idle, got {:?}", other),
        }
        assert!(!engine.session().has_captures());
    }

    #[tokio::test]
    async fn test_pct_and_zero_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::default()
            .with_points("AAPL", day(7, 1), &[(9, 31, 100.0), (10, 0, 105.0)])
            .with_points("MSFT", day(7, 1), &[(9, 31, 0.0), (10, 0, 5.0)]);
        let mut engine = engine(source, dir.path(), day(7, 1));
        engine.backfill_to(at(7, 1, 10, 1)).await.unwrap();

        let aapl = engine.cell("AAPL", 1);
        assert!((aapl.pct.unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(aapl.text, "▲ 105.00  (+5.00%)");

        let msft = engine.cell("MSFT", 1);
        assert_eq!(msft.baseline.unwrap().price, 0.0);
        assert_eq!(msft.pct, None);
        assert_eq!(msft.text, "5.00");
    }

    #[test]
    fn test_render_cell_text_options() {
        let plain = DisplayOptions {
            show_pct: false,
            show_arrows: false,
        };
        assert_eq!(render_cell_text(None, Some(1.0), DisplayOptions::default()), "--");
        assert_eq!(render_cell_text(Some(42.1), Some(-0.5), plain), "42.10");
        assert_eq!(
            render_cell_text(Some(42.1), Some(-0.5), DisplayOptions::default()),
            "▼ 42.10  (-0.50%)"
        );
        assert_eq!(
            render_cell_text(Some(42.1), Some(0.0), DisplayOptions::default()),
            "• 42.10  (+0.00%)"
        );
        assert_eq!(render_cell_text(Some(42.1), None, DisplayOptions::default()), "42.10");
    }
}
