use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Telemetry action types. Unknown strings deserialize into
/// [`ActionType::Other`] and are treated as routine, never as an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    SessionStart,
    SessionEnd,
    PlayerKilled,
    PlayerReported,
    PlayerViolation,
    WeaponFired,
    PlayerAttack,
    PlayerTick,
    PlayerInput,
    ItemLooted,
    #[serde(other)]
    Other,
}

impl ActionType {
    /// Action types persisted unconditionally, regardless of interestingness.
    pub fn always_store(&self) -> bool {
        matches!(
            self,
            ActionType::SessionStart
            | ActionType::SessionEnd
            | ActionType::PlayerKilled
            | ActionType::PlayerReported
            | ActionType::PlayerViolation
        )
    }
}

/// Event metadata as it arrives over the wire: either already a JSON object,
/// or a JSON-encoded string that must be decoded before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawMetadata {
    Object(HashMap<String, Value>),
    EncodedString(String),
    /// Any other JSON shape (null, number, array, bool), coerced to an
    /// empty map by [`RawMetadata::decode`].
    Other(Value),
}

impl Default for RawMetadata {
    fn default() -> Self {
        RawMetadata::Object(HashMap::new())
    }
}

impl RawMetadata {
    /// Eagerly decodes into a plain `HashMap<String, Value>`. String values that
    /// fail to parse as JSON, and non-mapping scalars, become an empty map —
    /// this never fails and never aborts the batch.
    pub fn decode(self) -> HashMap<String, Value> {
        match self {
            RawMetadata::Object(map) => map,
            RawMetadata::EncodedString(s) => match serde_json::from_str::<Value>(&s) {
                Ok(Value::Object(map)) => map.into_iter().collect(),
                _ => HashMap::new(),
            },
            RawMetadata::Other(_) => HashMap::new(),
        }
    }
}

/// A single telemetry event as received in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub event_id: Option<String>,
    pub owner: String,
    pub player_id: String,
    pub action_type: ActionType,
    pub timestamp: i64,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub metadata: RawMetadata,
}

/// The inbound gateway-shaped request body.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchRequestBody {
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

/// Parses the gateway `body` field, which may already be a JSON object or a
/// JSON-encoded string. JSON parse failure is the only fatal
/// input error in the whole pipeline.
pub fn parse_body(body: &Value) -> Result<BatchRequestBody, serde_json::Error> {
    match body {
        Value::String(s) => serde_json::from_str(s),
        other => serde_json::from_value(other.clone()),
    }
}

/// Metadata accessors used throughout the feature extractor. Missing or
/// wrong-typed fields fall back to the documented defaults rather than
/// erroring.
pub fn meta_f64(meta: &HashMap<String, Value>, key: &str, default: f64) -> f64 {
    meta.get(key).and_then(Value::as_f64).unwrap_or(default)
}
