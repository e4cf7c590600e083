use crate::calendar::{BUCKET_COUNT, BUCKETS};
use crate::data::PricePoint;
use crate::session::Session;

const SPARK_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPARK_WINDOW: usize = 64;
const MOOD_SPREAD: i64 = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Breadth {
    pub advancers: usize,
    pub decliners: usize,
    /// Unchanged or without a percentage.
    pub flat: usize,
}

impl Breadth {
    pub fn from_pcts(pcts: &[(String, Option<f64>)]) -> Self {
        let mut breadth = Breadth::default();
        for (_, pct) in pcts {
            match pct {
                Some(p) if *p > 0.0 => breadth.advancers += 1,
                Some(p) if *p < 0.0 => breadth.decliners += 1,
                _ => breadth.flat += 1,
            }
        }
        breadth
    }

    /// Advancers out of all tickers, 0..=1.
    pub fn advance_ratio(&self) -> f64 {
        let total = self.advancers + self.decliners + self.flat;
        if total == 0 { 0.0 } else { self.advancers as f64 / total as f64 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mood {
    Bullish,
    Bearish,
    Balanced,
    /// Nothing captured yet.
    Calm,
}

impl Mood {
    pub fn from_breadth(breadth: &Breadth) -> Self {
        let spread = breadth.advancers as i64 - breadth.decliners as i64;
        if spread >= MOOD_SPREAD {
            Mood::Bullish
        } else if -spread >= MOOD_SPREAD {
            Mood::Bearish
        } else {
            Mood::Balanced
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mood::Bullish => "Bullish",
            Mood::Bearish => "Bearish",
            Mood::Balanced => "Balanced",
            Mood::Calm => "Calm",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopMover {
    pub ticker: String,
    pub pct: f64,
}

/// Largest absolute move; the first ticker wins ties.
pub fn top_mover(pcts: &[(String, Option<f64>)]) -> Option<TopMover> {
    let mut best: Option<TopMover> = None;
    for (ticker, pct) in pcts {
        let Some(pct) = pct.filter(|p| p.is_finite()) else {
            continue;
        };
        if best.as_ref().is_none_or(|b| pct.abs() > b.pct.abs()) {
            best = Some(TopMover {
                ticker: ticker.clone(),
                pct,
            });
        }
    }
    best
}

/// Share of the total absolute move carried by the five largest movers.
pub fn concentration(pcts: &[(String, Option<f64>)]) -> Option<f64> {
    let mut moves: Vec<f64> = pcts
        .iter()
        .filter_map(|(_, pct)| pct.filter(|p| p.is_finite()).map(f64::abs))
        .collect();
    let total: f64 = moves.iter().sum();
    if moves.is_empty() || total == 0.0 {
        return None;
    }
    moves.sort_by(|a, b| b.total_cmp(a));
    let top: f64 = moves.iter().take(5).sum();
    Some(top / total * 100.0)
}

/// Everything the dashboard banner shows for one bucket.
#[derive(Clone, Debug, PartialEq)]
pub struct Pulse {
    pub bucket: Option<usize>,
    pub breadth: Breadth,
    pub mood: Mood,
    pub top: Option<TopMover>,
    pub concentration: Option<f64>,
}

impl Pulse {
    pub fn calm(ticker_count: usize) -> Self {
        Self {
            bucket: None,
            breadth: Breadth {
                flat: ticker_count,
                ..Breadth::default()
            },
            mood: Mood::Calm,
            top: None,
            concentration: None,
        }
    }

    pub fn for_bucket(bucket: usize, pcts: &[(String, Option<f64>)]) -> Self {
        let breadth = Breadth::from_pcts(pcts);
        Self {
            bucket: Some(bucket),
            breadth,
            mood: Mood::from_breadth(&breadth),
            top: top_mover(pcts),
            concentration: concentration(pcts),
        }
    }

    pub fn headline(&self) -> String {
        let label = self.bucket.map(|b| BUCKETS[b].label).unwrap_or("--");
        let top = match &self.top {
            Some(t) => format!("{} {:+.2}%", t.ticker, t.pct),
            None => "--".to_string(),
        };
        format!(
            "{}  Adv {} / Dec {} / Flat {}  Top {}  Mood {}",
            label,
            self.breadth.advancers,
            self.breadth.decliners,
            self.breadth.flat,
            top,
            self.mood.label()
        )
    }
}

/// Buckets with any data out of all buckets.
pub fn progress(session: &Session) -> (usize, usize) {
    (session.captured_bucket_count(), BUCKET_COUNT)
}

/// Unicode sparkline over the most recent minute closes.
pub fn sparkline(values: &[f64]) -> String {
    let start = values.len().saturating_sub(SPARK_WINDOW);
    let window: Vec<f64> = values[start..].iter().copied().filter(|v| v.is_finite()).collect();
    if window.is_empty() {
        return String::new();
    }

    let lo = window.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = hi - lo;
    if range < 1e-9 {
        return SPARK_CHARS[0].to_string().repeat(window.len());
    }

    let top = (SPARK_CHARS.len() - 1) as f64;
    window
        .iter()
        .map(|v| SPARK_CHARS[((v - lo) / range * top) as usize])
        .collect()
}

pub fn sparkline_for_series(series: &[PricePoint]) -> String {
    let values: Vec<f64> = series.iter().map(|p| p.price).collect();
    sparkline(&values)
}
