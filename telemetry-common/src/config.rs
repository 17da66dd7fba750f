use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Thresholds and table names controlling the ingestion core, loaded once at
/// process start from environment variables layered over built-in defaults.
///
/// Defaults are seeded from [`Config::default`] and layered with bare
/// environment variables via `Figment::from(Serialized::defaults(..)).merge(Env::raw())`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    pub events_table: String,
    pub player_state_table: String,
    pub detections_table: String,
    pub event_ttl_days: i64,
    pub zscore_threshold: f64,
    pub min_samples_for_detection: u64,
    pub accuracy_interesting_threshold: f64,
    pub headshot_interesting_threshold: f64,
    pub min_shots_for_interesting: i64,
    pub high_damage_threshold: f64,
    pub accuracy_risk_threshold: f64,
    pub headshot_risk_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            events_table: "behavior-analyzer-events-dev".to_string(),
            player_state_table: "behavior-analyzer-players-dev".to_string(),
            detections_table: "behavior-analyzer-detections-dev".to_string(),
            event_ttl_days: 90,
            zscore_threshold: 3.0,
            min_samples_for_detection: 100,
            accuracy_interesting_threshold: 0.7,
            headshot_interesting_threshold: 0.5,
            min_shots_for_interesting: 5,
            high_damage_threshold: 100.0,
            accuracy_risk_threshold: 0.5,
            headshot_risk_threshold: 0.3,
        }
    }
}

impl Config {
    /// Builds the layered figment: code defaults, overridden by bare (not
    /// prefixed) environment variables, matching the documented variable
    /// names exactly (`EVENTS_TABLE`, `ZSCORE_THRESHOLD`, ...).
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default())).merge(Env::raw())
    }

    pub fn load() -> figment::Result<Self> {
        Self::figment().extract()
    }
}
