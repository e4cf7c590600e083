use anyhow::{Context, Result};
use directories::{BaseDirs, UserDirs};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const APP_NAME: &str = "DOW 30 Tracker";
/// Loopback port the running instance listens on for `SHOW`.
pub const APP_PORT: u16 = 53121;

pub const TICKERS: &[&str] = &[
    "AAPL", "AMGN", "AXP", "BA", "CAT", "CRM", "CSCO", "CVX", "DIS", "DOW", "GS", "HD",
    "HON", "IBM", "JNJ", "JPM", "KO", "MCD", "MMM", "MRK", "MSFT", "NKE", "PG", "TRV",
    "UNH", "V", "VZ", "WMT", "NVDA", "AMZN", "INTC", "WBA",
];

/// Rendered in blue; purely cosmetic.
pub const HIGHLIGHT_TICKERS: &[&str] = &["INTC", "WBA"];

pub const DOW_INDEX_SYMBOL: &str = "^DJI";

/// How often the loop wakes up to check the minute key.
pub const TICK_INTERVAL_SECS: u64 = 15;

pub const DEFAULT_SOUND_THRESHOLD: f64 = 1.5;
pub const MIN_SOUND_THRESHOLD: f64 = 0.1;
pub const NEWS_PING_MIN_PCT: f64 = 0.5;
pub const HISTORICAL_ECHO_MIN_PCT: f64 = 2.0;

pub const SETTINGS_FILE: &str = "settings.json";
pub const FEATURES_FILE: &str = "features.json";
pub const LOG_FILE: &str = "tracker.log";
pub const LOCK_FILE: &str = "tracker.lock";

pub fn tickers() -> Vec<String> {
    TICKERS.iter().map(|t| t.to_string()).collect()
}

pub fn is_highlighted(ticker: &str) -> bool {
    HIGHLIGHT_TICKERS.contains(&ticker)
}

/// `1. AAPL` row label used by the grid and every bucket sheet.
pub fn row_label(index: usize, ticker: &str) -> String {
    format!("{}. {}", index + 1, ticker)
}

/// Concurrent requests used for the batched intraday fetch.
pub fn fetch_concurrency() -> usize {
    std::env::var("DOW_TRACKER_FETCH_CONCURRENCY")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .map(|v| v.clamp(1, 32))
        .unwrap_or(8)
}

/// Per-user folder holding settings and the instance lock.
pub fn state_dir() -> PathBuf {
    if let Ok(path) = std::env::var("DOW_TRACKER_STATE_DIR") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    let Some(base) = BaseDirs::new() else {
        return PathBuf::from(".dow30tracker");
    };

    if cfg!(windows) {
        base.data_local_dir().join("DOW30Tracker")
    } else {
        base.home_dir().join(".dow30tracker")
    }
}

pub fn settings_path() -> PathBuf {
    state_dir().join(SETTINGS_FILE)
}

pub fn lock_path() -> PathBuf {
    state_dir().join(LOCK_FILE)
}

/// First writable of `Documents/Saved DOW Sheets` and `<state>/Saved`.
pub fn default_data_dir() -> PathBuf {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(user) = UserDirs::new() {
        if let Some(docs) = user.document_dir() {
            candidates.push(docs.join("Saved DOW Sheets"));
        }
        candidates.push(user.home_dir().join("Documents").join("Saved DOW Sheets"));
    }
    candidates.push(state_dir().join("Saved"));

    for candidate in &candidates {
        if std::fs::create_dir_all(candidate).is_ok() {
            return candidate.clone();
        }
    }
    state_dir().join("Saved")
}

/// Contents of `settings.json`. Keys this build does not know are kept in
/// `extra` so the file round-trips whole.
#[derive(Clone, Debug, Serialize)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    pub sound_threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dna_last_export: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub morning_resume_seen: Option<String>,
    pub show_pct: bool,
    pub show_arrows: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Removes `key` and decodes it. A value of the wrong type is dropped so the
/// caller's default applies to that field alone.
fn take_field<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = map.remove(key)?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Ignoring settings key '{}': {}", key, e);
            None
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            sound_threshold: DEFAULT_SOUND_THRESHOLD,
            dna_last_export: None,
            morning_resume_seen: None,
            show_pct: true,
            show_arrows: true,
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Missing or unreadable files yield defaults. Known keys are read one at
    /// a time; everything else is kept in `extra`.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read(path)
            .context("read settings")
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).context("parse settings"))
        {
            Ok(Value::Object(map)) => Self::from_map(map),
            Ok(other) => {
                warn!("Settings file {} is not a JSON object ({})", path.display(), other);
                Self::default()
            }
            Err(e) => {
                warn!("Ignoring unreadable settings file {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    fn from_map(mut map: Map<String, Value>) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: take_field::<Option<String>>(&mut map, "data_dir").flatten(),
            sound_threshold: take_field(&mut map, "sound_threshold")
                .unwrap_or(defaults.sound_threshold),
            dna_last_export: take_field::<Option<String>>(&mut map, "dna_last_export").flatten(),
            morning_resume_seen: take_field::<Option<String>>(&mut map, "morning_resume_seen")
                .flatten(),
            show_pct: take_field(&mut map, "show_pct").unwrap_or(defaults.show_pct),
            show_arrows: take_field(&mut map, "show_arrows").unwrap_or(defaults.show_arrows),
            extra: map,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create settings folder {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Configured data folder, or the platform default. Created on demand.
    pub fn resolve_data_dir(&self) -> PathBuf {
        let configured = self
            .data_dir
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        match configured {
            Some(dir) => match std::fs::create_dir_all(&dir) {
                Ok(()) => dir,
                Err(e) => {
                    warn!("Data folder {} unusable ({}); using default", dir.display(), e);
                    default_data_dir()
                }
            },
            None => default_data_dir(),
        }
    }

    pub fn effective_sound_threshold(&self) -> f64 {
        if self.sound_threshold.is_finite() {
            self.sound_threshold.max(MIN_SOUND_THRESHOLD)
        } else {
            DEFAULT_SOUND_THRESHOLD
        }
    }
}
