use crate::calendar::MARKET_TZ;
use crate::config;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One 1-minute close.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricePoint {
    pub at: DateTime<Utc>,
    pub price: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

/// Black-box market data provider.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// 1-minute closes for the regular session of `day`, ascending.
    async fn minute_series(&self, ticker: &str, day: NaiveDate) -> Result<Vec<PricePoint>>;

    /// Most recent daily close.
    async fn last_close(&self, ticker: &str) -> Result<Option<f64>>;

    /// Daily closes over a Yahoo style range such as `5d`, `2mo` or `1y`.
    async fn daily_closes(&self, ticker: &str, range: &str) -> Result<Vec<DailyClose>>;

    /// Newest news headline for the ticker, if any.
    async fn headline(&self, ticker: &str) -> Result<Option<String>>;
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Deserialize, Debug)]
struct YahooChart {
    #[serde(default)]
    result: Option<Vec<YahooResult>>,
}

#[derive(Deserialize, Debug)]
struct YahooResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: YahooIndicators,
}

#[derive(Deserialize, Debug, Default)]
struct YahooIndicators {
    #[serde(default)]
    quote: Vec<YahooQuote>,
}

#[derive(Deserialize, Debug)]
struct YahooQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Deserialize, Debug)]
struct YahooSearchResponse {
    #[serde(default)]
    news: Vec<YahooNewsItem>,
}

#[derive(Deserialize, Debug)]
struct YahooNewsItem {
    title: Option<String>,
}

const YAHOO_HOSTS: [&str; 2] = ["query1.finance.yahoo.com", "query2.finance.yahoo.com"];
const MAX_ATTEMPTS: usize = 3;

/// Yahoo Finance v8 chart API.
#[derive(Clone)]
pub struct YahooSource {
    client: reqwest::Client,
}

impl Default for YahooSource {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_chart(&self, symbol: &str, query: &str) -> Result<Vec<(i64, f64)>> {
        let encoded = symbol.replace('^', "%5E");
        let mut last_error: Option<anyhow::Error> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            for host in YAHOO_HOSTS {
                let url = format!("https://{}/v8/finance/chart/{}?{}", host, encoded, query);
                let response = match self
                    .client
                    .get(&url)
                    .header("User-Agent", "Mozilla/5.0")
                    .timeout(std::time::Duration::from_secs(10))
                    .send()
                    .await
                {
                    Ok(resp) => resp,
                    Err(error) => {
                        last_error = Some(error.into());
                        continue;
                    }
                };

                match response.json::<YahooChartResponse>().await {
                    Ok(parsed) => match first_result(parsed) {
                        Some(result) => return Ok(chart_closes(&result)),
                        None => last_error = Some(anyhow!("No chart result for {}", symbol)),
                    },
                    Err(error) => {
                        last_error = Some(error.into());
                    }
                }
            }

            if attempt < MAX_ATTEMPTS {
                debug!(
                    "Yahoo chart fetch failed for {} (attempt {}/{}), retrying...",
                    symbol, attempt, MAX_ATTEMPTS
                );
                tokio::time::sleep(std::time::Duration::from_millis(700)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Failed to fetch Yahoo chart for {}", symbol)))
    }
}

/// `None` for a null or empty `result`, which the caller retries.
fn first_result(response: YahooChartResponse) -> Option<YahooResult> {
    response.chart.result?.into_iter().next()
}

fn chart_closes(result: &YahooResult) -> Vec<(i64, f64)> {
    let Some(quote) = result.indicators.quote.first() else {
        return Vec::new();
    };
    result
        .timestamp
        .iter()
        .zip(quote.close.iter())
        .filter_map(|(ts, close)| close.filter(|c| c.is_finite()).map(|c| (*ts, c)))
        .collect()
}

fn day_bounds(day: NaiveDate) -> Option<(i64, i64)> {
    let start = MARKET_TZ
        .from_local_datetime(&day.and_hms_opt(0, 0, 0)?)
        .earliest()?;
    let end = MARKET_TZ
        .from_local_datetime(&day.succ_opt()?.and_hms_opt(0, 0, 0)?)
        .earliest()?;
    Some((start.timestamp(), end.timestamp()))
}

#[async_trait]
impl PriceSource for YahooSource {
    async fn minute_series(&self, ticker: &str, day: NaiveDate) -> Result<Vec<PricePoint>> {
        let (period1, period2) = day_bounds(day).ok_or(anyhow!("Invalid session day {}", day))?;
        let query = format!(
            "period1={}&period2={}&interval=1m&includePrePost=false",
            period1, period2
        );
        let closes = self.fetch_chart(ticker, &query).await?;
        let mut series: Vec<PricePoint> = closes
            .into_iter()
            .filter_map(|(ts, price)| {
                Utc.timestamp_opt(ts, 0).single().map(|at| PricePoint { at, price })
            })
            .collect();
        series.sort_by_key(|p| p.at);
        Ok(series)
    }

    async fn last_close(&self, ticker: &str) -> Result<Option<f64>> {
        let closes = self.fetch_chart(ticker, "range=5d&interval=1d").await?;
        Ok(closes.last().map(|(_, close)| *close))
    }

    async fn daily_closes(&self, ticker: &str, range: &str) -> Result<Vec<DailyClose>> {
        let query = format!("range={}&interval=1d", range);
        let closes = self.fetch_chart(ticker, &query).await?;
        Ok(closes
            .into_iter()
            .filter_map(|(ts, close)| {
                let date = Utc
                    .timestamp_opt(ts, 0)
                    .single()?
                    .with_timezone(&MARKET_TZ)
                    .date_naive();
                Some(DailyClose { date, close })
            })
            .collect())
    }

    async fn headline(&self, ticker: &str) -> Result<Option<String>> {
        let url = format!(
            "https://{}/v1/finance/search?q={}&quotesCount=0&newsCount=1",
            YAHOO_HOSTS[0],
            ticker.replace('^', "%5E")
        );
        let parsed = self
            .client
            .get(&url)
            .header("User-Agent", "Mozilla/5.0")
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?
            .json::<YahooSearchResponse>()
            .await?;
        Ok(parsed
            .news
            .into_iter()
            .find_map(|item| item.title.filter(|t| !t.trim().is_empty())))
    }
}

/// Last point with `at <= cutoff`.
pub fn price_at_or_before_in(series: &[PricePoint], cutoff: DateTime<Utc>) -> Option<f64> {
    let idx = series.partition_point(|p| p.at <= cutoff);
    if idx == 0 { None } else { Some(series[idx - 1].price) }
}

/// Wraps a [`PriceSource`] with the caches of one trading day. Every lookup
/// degrades to `None` instead of failing.
///
/// Tickers whose series or close came back empty or failed are remembered as
/// misses and not asked for again until the next [`refresh_intraday`] or a
/// new day.
///
/// [`refresh_intraday`]: PriceAdapter::refresh_intraday
pub struct PriceAdapter {
    source: Arc<dyn PriceSource>,
    day: Option<NaiveDate>,
    intraday: HashMap<String, Vec<PricePoint>>,
    closes: HashMap<String, f64>,
    series_misses: HashSet<String>,
    close_misses: HashSet<String>,
}

impl PriceAdapter {
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self {
            source,
            day: None,
            intraday: HashMap::new(),
            closes: HashMap::new(),
            series_misses: HashSet::new(),
            close_misses: HashSet::new(),
        }
    }

    pub fn source(&self) -> Arc<dyn PriceSource> {
        self.source.clone()
    }

    /// Drops both caches when `day` is a new trading day.
    pub fn begin_day(&mut self, day: NaiveDate) {
        if self.day != Some(day) {
            self.day = Some(day);
            self.intraday.clear();
            self.closes.clear();
            self.series_misses.clear();
            self.close_misses.clear();
        }
    }

    /// One batched fetch of every ticker's minute series. Returns how many
    /// series arrived; the cache is left alone when none did.
    pub async fn refresh_intraday(&mut self, tickers: &[String], day: NaiveDate) -> usize {
        self.begin_day(day);
        let source = self.source.clone();
        let fetched: Vec<(String, Result<Vec<PricePoint>>)> = stream::iter(tickers.to_vec())
            .map(|ticker| {
                let source = source.clone();
                async move {
                    let series = source.minute_series(&ticker, day).await;
                    (ticker, series)
                }
            })
            .buffer_unordered(config::fetch_concurrency())
            .collect()
            .await;

        let mut fresh: HashMap<String, Vec<PricePoint>> = HashMap::new();
        let mut failures = 0usize;
        for (ticker, result) in fetched {
            match result {
                Ok(series) if !series.is_empty() => {
                    fresh.insert(ticker, series);
                }
                Ok(_) => {}
                Err(e) => {
                    failures += 1;
                    debug!("Minute series fetch failed for {}: {:#}", ticker, e);
                }
            }
        }

        let loaded = fresh.len();
        if loaded > 0 {
            self.intraday = fresh;
            info!("Intraday cache refreshed: {}/{} tickers", loaded, tickers.len());
        } else {
            warn!(
                "Intraday refresh returned no data ({} failures); keeping previous cache",
                failures
            );
        }
        self.series_misses = tickers
            .iter()
            .filter(|t| !self.intraday.contains_key(t.as_str()))
            .cloned()
            .collect();
        self.close_misses.clear();
        loaded
    }

    pub async fn minute_series(&mut self, ticker: &str, day: NaiveDate) -> Option<&[PricePoint]> {
        self.begin_day(day);
        if !self.intraday.contains_key(ticker) {
            if self.series_misses.contains(ticker) {
                return None;
            }
            match self.source.minute_series(ticker, day).await {
                Ok(series) if !series.is_empty() => {
                    self.intraday.insert(ticker.to_string(), series);
                }
                Ok(_) => {
                    self.series_misses.insert(ticker.to_string());
                    return None;
                }
                Err(e) => {
                    debug!("minute_series({}) failed: {:#}", ticker, e);
                    self.series_misses.insert(ticker.to_string());
                    return None;
                }
            }
        }
        self.intraday.get(ticker).map(Vec::as_slice)
    }

    pub fn cached_series(&self, ticker: &str) -> Option<&[PricePoint]> {
        self.intraday.get(ticker).map(Vec::as_slice)
    }

    pub async fn last_close(&mut self, ticker: &str) -> Option<f64> {
        if let Some(close) = self.closes.get(ticker) {
            return Some(*close);
        }
        if self.close_misses.contains(ticker) {
            return None;
        }
        match self.source.last_close(ticker).await {
            Ok(Some(close)) if close.is_finite() => {
                self.closes.insert(ticker.to_string(), close);
                Some(close)
            }
            Ok(_) => {
                self.close_misses.insert(ticker.to_string());
                None
            }
            Err(e) => {
                debug!("last_close({}) failed: {:#}", ticker, e);
                self.close_misses.insert(ticker.to_string());
                None
            }
        }
    }

    pub fn cached_close(&self, ticker: &str) -> Option<f64> {
        self.closes.get(ticker).copied()
    }

    /// Fetches the missing last closes concurrently.
    pub async fn ensure_closes(&mut self, tickers: &[String]) {
        let missing: Vec<String> = tickers
            .iter()
            .filter(|t| {
                !self.closes.contains_key(t.as_str()) && !self.close_misses.contains(t.as_str())
            })
            .cloned()
            .collect();
        if missing.is_empty() {
            return;
        }

        let source = self.source.clone();
        let fetched: Vec<(String, Option<f64>)> = stream::iter(missing)
            .map(|ticker| {
                let source = source.clone();
                async move {
                    let close = match source.last_close(&ticker).await {
                        Ok(close) => close,
                        Err(e) => {
                            debug!("last_close({}) failed: {:#}", ticker, e);
                            None
                        }
                    };
                    (ticker, close)
                }
            })
            .buffer_unordered(config::fetch_concurrency())
            .collect()
            .await;

        for (ticker, close) in fetched {
            match close.filter(|c| c.is_finite()) {
                Some(close) => {
                    self.closes.insert(ticker, close);
                }
                None => {
                    self.close_misses.insert(ticker);
                }
            }
        }
    }

    /// Minute-series price at or before `hour:minute` on `day`, no fallback.
    pub async fn series_price_at(
        &mut self,
        ticker: &str,
        day: NaiveDate,
        hour: u32,
        minute: u32,
    ) -> Option<f64> {
        let cutoff = MARKET_TZ
            .from_local_datetime(&day.and_hms_opt(hour, minute, 0)?)
            .earliest()?
            .with_timezone(&Utc);
        let series = self.minute_series(ticker, day).await?;
        price_at_or_before_in(series, cutoff)
    }

    /// Minute-series price at or before the threshold, else the last close.
    pub async fn price_at_or_before(
        &mut self,
        ticker: &str,
        day: NaiveDate,
        hour: u32,
        minute: u32,
    ) -> Option<f64> {
        match self.series_price_at(ticker, day, hour, minute).await {
            Some(price) => Some(price),
            None => self.last_close(ticker).await,
        }
    }
}
