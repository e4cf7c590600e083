use crate::calendar::BUCKET_COUNT;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use std::collections::HashMap;

/// Captured price per bucket for one ticker.
pub type BucketRow = [Option<f64>; BUCKET_COUNT];

/// Ticker -> price of one bucket, in ticker order. Absent is its own value.
pub type Snapshot = Vec<(String, Option<f64>)>;

/// One trading day of captures. A new date means a new `Session`; nothing is
/// carried over except what the caller loads into `prior_session`.
#[derive(Clone, Debug)]
pub struct Session {
    date: NaiveDate,
    captures: HashMap<String, BucketRow>,
    prior_session: HashMap<String, f64>,
    exported: HashMap<usize, Snapshot>,
    last_minute_key: Option<(u32, u32)>,
    last_capture: Option<(usize, DateTime<Tz>)>,
    captured: [bool; BUCKET_COUNT],
}

impl Session {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            captures: HashMap::new(),
            prior_session: HashMap::new(),
            exported: HashMap::new(),
            last_minute_key: None,
            last_capture: None,
            captured: [false; BUCKET_COUNT],
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn capture(&mut self, ticker: &str, bucket: usize, price: Option<f64>) {
        if bucket >= BUCKET_COUNT {
            return;
        }
        let row = self
            .captures
            .entry(ticker.to_string())
            .or_insert([None; BUCKET_COUNT]);
        row[bucket] = price.filter(|p| p.is_finite());
    }

    pub fn price(&self, ticker: &str, bucket: usize) -> Option<f64> {
        self.captures
            .get(ticker)
            .and_then(|row| row.get(bucket).copied().flatten())
    }

    pub fn row(&self, ticker: &str) -> BucketRow {
        self.captures
            .get(ticker)
            .copied()
            .unwrap_or([None; BUCKET_COUNT])
    }

    pub fn has_captures(&self) -> bool {
        self.captures.values().any(|row| row.iter().any(Option::is_some))
    }

    pub fn prior_session(&self, ticker: &str) -> Option<f64> {
        self.prior_session.get(ticker).copied()
    }

    pub fn prior_session_len(&self) -> usize {
        self.prior_session.len()
    }

    pub fn set_prior_session(&mut self, values: HashMap<String, f64>) {
        self.prior_session = values
            .into_iter()
            .filter(|(_, price)| price.is_finite())
            .collect();
    }

    pub fn snapshot(&self, tickers: &[String], bucket: usize) -> Snapshot {
        tickers
            .iter()
            .map(|ticker| (ticker.clone(), self.price(ticker, bucket)))
            .collect()
    }

    /// True unless `snapshot` equals the last one written for `bucket`.
    pub fn needs_export(&self, bucket: usize, snapshot: &Snapshot) -> bool {
        self.exported.get(&bucket) != Some(snapshot)
    }

    pub fn mark_exported(&mut self, bucket: usize, snapshot: Snapshot) {
        self.exported.insert(bucket, snapshot);
    }

    /// Records `hour:minute` as processed; false when it already was.
    pub fn claim_minute(&mut self, hour: u32, minute: u32) -> bool {
        if self.last_minute_key == Some((hour, minute)) {
            return false;
        }
        self.last_minute_key = Some((hour, minute));
        true
    }

    pub fn record_capture(&mut self, bucket: usize, at: DateTime<Tz>) {
        if let Some(flag) = self.captured.get_mut(bucket) {
            *flag = true;
        }
        self.last_capture = Some((bucket, at));
    }

    /// True once a capture pass has run for `bucket`, even if it found no prices.
    pub fn is_captured(&self, bucket: usize) -> bool {
        self.captured.get(bucket).copied().unwrap_or(false)
    }

    pub fn last_capture(&self) -> Option<(usize, DateTime<Tz>)> {
        self.last_capture
    }

    /// Buckets holding at least one captured price.
    pub fn captured_bucket_count(&self) -> usize {
        (0..BUCKET_COUNT)
            .filter(|bucket| self.bucket_has_data(*bucket))
            .count()
    }

    pub fn latest_bucket_with_data(&self) -> Option<usize> {
        (0..BUCKET_COUNT).rev().find(|bucket| self.bucket_has_data(*bucket))
    }

    fn bucket_has_data(&self, bucket: usize) -> bool {
        self.captures.values().any(|row| row[bucket].is_some())
    }
}
