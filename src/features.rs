use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    MiniDashboard,
    NewsPing,
    Sparkline,
    InsightRail,
    Replay,
    MorningResume,
    HistoricalEcho,
    Concentration,
    MarketSounds,
    CandleGhosts,
    Confidence,
    DnaExport,
}

impl Feature {
    pub const ALL: [Feature; 12] = [
        Feature::MiniDashboard,
        Feature::NewsPing,
        Feature::Sparkline,
        Feature::InsightRail,
        Feature::Replay,
        Feature::MorningResume,
        Feature::HistoricalEcho,
        Feature::Concentration,
        Feature::MarketSounds,
        Feature::CandleGhosts,
        Feature::Confidence,
        Feature::DnaExport,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Feature::MiniDashboard => "mini_dashboard",
            Feature::NewsPing => "news_ping",
            Feature::Sparkline => "sparkline",
            Feature::InsightRail => "insight_rail",
            Feature::Replay => "replay",
            Feature::MorningResume => "morning_resume",
            Feature::HistoricalEcho => "historical_echo",
            Feature::Concentration => "concentration",
            Feature::MarketSounds => "market_sounds",
            Feature::CandleGhosts => "candle_ghosts",
            Feature::Confidence => "confidence",
            Feature::DnaExport => "dna_export",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key.trim())
    }

    pub fn description(self) -> &'static str {
        match self {
            Feature::MiniDashboard => {
                "Advancers vs decliners, top mover and market mood above the grid."
            }
            Feature::NewsPing => "Freshest headline for the biggest mover of each capture.",
            Feature::Sparkline => "Unicode sparkline of the selected ticker's 1-minute closes.",
            Feature::InsightRail => {
                "Capture progress, countdown and save-folder status in the side rail."
            }
            Feature::Replay => "Replay saved captures from a previous workbook.",
            Feature::MorningResume => {
                "Morning recap of yesterday's leaders, laggards and index finish."
            }
            Feature::HistoricalEcho => "On 2% swings, the closest daily move of the past year.",
            Feature::Concentration => "Share of the move driven by the top five components.",
            Feature::MarketSounds => "Terminal bell when a component crosses the sound threshold.",
            Feature::CandleGhosts => "Shade cells against the previous close.",
            Feature::Confidence => "Breadth bar tracking advancers throughout the day.",
            Feature::DnaExport => "Friday CSV with correlations and realized volatility.",
        }
    }

    fn default_enabled(self) -> bool {
        matches!(self, Feature::InsightRail)
    }
}

/// Contents of `features.json`: every known feature, nothing else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureFlags {
    flags: BTreeMap<Feature, bool>,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            flags: Feature::ALL.into_iter().map(|f| (f, f.default_enabled())).collect(),
        }
    }
}

impl FeatureFlags {
    /// Unknown keys are pruned and missing ones defaulted.
    pub fn from_json(raw: &serde_json::Value) -> Self {
        let mut flags = Self::default();
        if let Some(object) = raw.as_object() {
            for (key, value) in object {
                match (Feature::from_key(key), value.as_bool()) {
                    (Some(feature), Some(enabled)) => {
                        flags.flags.insert(feature, enabled);
                    }
                    (None, _) => warn!("Dropping unknown feature flag '{}'", key),
                    (Some(_), None) => {
                        warn!("Feature flag '{}' is not a boolean; using default", key)
                    }
                }
            }
        }
        flags
    }

    pub fn to_json(&self) -> serde_json::Value {
        let object: serde_json::Map<String, serde_json::Value> = self
            .flags
            .iter()
            .map(|(feature, enabled)| {
                (feature.key().to_string(), serde_json::Value::Bool(*enabled))
            })
            .collect();
        serde_json::Value::Object(object)
    }

    /// Reads `path`, rewriting it when it held anything besides the known
    /// boolean flags.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let parsed = std::fs::read(path)
            .context("read feature flags")
            .and_then(|bytes| {
                serde_json::from_slice::<serde_json::Value>(&bytes).context("parse feature flags")
            });
        match parsed {
            Ok(value) => {
                let flags = Self::from_json(&value);
                if flags.to_json() != value {
                    if let Err(e) = flags.save(path) {
                        warn!("Could not rewrite {}: {:#}", path.display(), e);
                    }
                }
                flags
            }
            Err(e) => {
                warn!("Ignoring feature file {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_json())?;
        std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn enabled(&self, feature: Feature) -> bool {
        self.flags.get(&feature).copied().unwrap_or(false)
    }

    pub fn set(&mut self, feature: Feature, enabled: bool) {
        self.flags.insert(feature, enabled);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, bool)> + '_ {
        self.flags.iter().map(|(f, e)| (*f, *e))
    }

    /// Applies `key=on|off` style overrides from the command line.
    pub fn apply_overrides(&mut self, overrides: &str) -> Result<()> {
        for item in overrides.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = item.split_once('=').unwrap_or((item, "on"));
            let feature = Feature::from_key(key)
                .with_context(|| format!("unknown feature '{}'", key.trim()))?;
            let enabled = match value.trim().to_ascii_lowercase().as_str() {
                "on" | "true" | "1" | "yes" => true,
                "off" | "false" | "0" | "no" => false,
                other => anyhow::bail!("invalid value '{}' for feature '{}'", other, key.trim()),
            };
            self.set(feature, enabled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_keys_pruned_and_missing_defaulted() {
        let raw = serde_json::json!({
            "news_ping": true,
            "legacy_toggle": true,
            "sparkline": "yes",
        });
        let flags = FeatureFlags::from_json(&raw);
        assert!(flags.enabled(Feature::NewsPing));
        assert!(flags.enabled(Feature::InsightRail));
        assert!(!flags.enabled(Feature::Sparkline));

        let out = flags.to_json();
        let object = out.as_object().unwrap();
        assert_eq!(object.len(), Feature::ALL.len());
        assert!(!object.contains_key("legacy_toggle"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.json");
        let mut flags = FeatureFlags::default();
        flags.set(Feature::DnaExport, true);
        flags.save(&path).unwrap();

        let loaded = FeatureFlags::load(&path);
        assert_eq!(loaded, flags);
    }

    #[test]
    fn test_overrides() {
        let mut flags = FeatureFlags::default();
        flags
            .apply_overrides("market_sounds, insight_rail=off,historical_echo=on")
            .unwrap();
        assert!(flags.enabled(Feature::MarketSounds));
        assert!(!flags.enabled(Feature::InsightRail));
        assert!(flags.enabled(Feature::HistoricalEcho));
        assert!(flags.apply_overrides("warp_drive").is_err());
        assert!(flags.apply_overrides("news_ping=maybe").is_err());
    }

    #[test]
    fn test_load_rewrites_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.json");
        std::fs::write(&path, r#"{"news_ping": true, "legacy_toggle": true}"#).unwrap();

        let flags = FeatureFlags::load(&path);
        assert!(flags.enabled(Feature::NewsPing));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, flags.to_json());
        assert!(raw.get("legacy_toggle").is_none());
        assert_eq!(raw["insight_rail"], serde_json::Value::Bool(true));
    }
}
