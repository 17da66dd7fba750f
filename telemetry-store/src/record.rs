use crate::decimal::{decode_f64, decode_i64, decode_u64, encode_f64};
use serde_json::{json, Map, Value};
use telemetry_common::{
    ActionType, DetectionDraft, DetectorType, EventRecord, PlayerFeatures, PlayerProfile,
    PlayerStatus, RawMetadata,
};

/// The three logical collections a tenant's data is partitioned across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Events,
    Players,
    Detections,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Events => "events",
            Table::Players => "players",
            Table::Detections => "detections",
        }
    }
}

pub fn player_pk(owner: &str, player_id: &str) -> String {
    format!("{owner}#{player_id}")
}

pub fn event_sk(timestamp: i64, event_id: &str) -> String {
    format!("{timestamp}#{event_id}")
}

pub fn detection_sk(created_at: i64, detection_id: &str) -> String {
    format!("{created_at}#{detection_id}")
}

/// A composite-keyed attribute map as it is handed to [`crate::store::StoreAdapter`].
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub pk: String,
    pub sk: String,
    pub attributes: Map<String, Value>,
}

fn action_type_str(action: &ActionType) -> String {
    serde_json::to_value(action)
    .ok()
    .and_then(|v| v.as_str().map(str::to_string))
    .unwrap_or_else(|| "OTHER".to_string())
}

/// Serializes an event record into a store item:
/// `metadata` is JSON-encoded as a string, `ttl` is computed from
/// `event_ttl_days`.
pub fn event_to_item(owner: &str, event: &EventRecord, event_id: &str, ttl: i64) -> Item {
    let metadata_map = event.metadata.clone().decode();
    let mut attributes = Map::new();
    attributes.insert("eventId".to_string(), json!(event_id));
    attributes.insert("owner".to_string(), json!(owner));
    attributes.insert("playerId".to_string(), json!(event.player_id));
    attributes.insert("actionType".to_string(), json!(action_type_str(&event.action_type)));
    attributes.insert("timestamp".to_string(), json!(event.timestamp));
    attributes.insert("sessionId".to_string(), json!(event.session_id));
    attributes.insert(
        "metadata".to_string(),
        json!(serde_json::to_string(&metadata_map).unwrap_or_default()),
    );
    attributes.insert("ttl".to_string(), json!(ttl));

    Item {
        pk: player_pk(owner, &event.player_id),
        sk: event_sk(event.timestamp, event_id),
        attributes,
    }
}

pub fn profile_to_item(owner: &str, player_id: &str, profile: &PlayerProfile) -> Item {
    let mut attributes = Map::new();
    attributes.insert("owner".to_string(), json!(owner));
    attributes.insert("playerId".to_string(), json!(player_id));
    attributes.insert("firstSeen".to_string(), json!(profile.first_seen));
    attributes.insert("lastSeen".to_string(), json!(profile.last_seen));
    attributes.insert("eventCount".to_string(), json!(profile.event_count));
    attributes.insert("riskScore".to_string(), encode_f64(profile.risk_score));
    attributes.insert(
        "status".to_string(),
        json!(match profile.status {
                PlayerStatus::Monitor => "MONITOR",
                PlayerStatus::Flagged => "FLAGGED",
                PlayerStatus::Banned => "BANNED",
        }),
    );

    Item {
        pk: player_pk(owner, player_id),
        sk: "PROFILE".to_string(),
        attributes,
    }
}

pub fn profile_from_item(item: &Map<String, Value>) -> PlayerProfile {
    let status = match item.get("status").and_then(Value::as_str) {
        Some("FLAGGED") => PlayerStatus::Flagged,
        Some("BANNED") => PlayerStatus::Banned,
        _ => PlayerStatus::Monitor,
    };
    PlayerProfile {
        first_seen: decode_i64(item.get("firstSeen")),
        last_seen: decode_i64(item.get("lastSeen")),
        event_count: decode_u64(item.get("eventCount")),
        risk_score: decode_f64(item.get("riskScore")),
        status,
    }
}

pub fn features_to_item(owner: &str, player_id: &str, features: &PlayerFeatures) -> Item {
    let mut attributes = Map::new();
    attributes.insert("owner".to_string(), json!(owner));
    attributes.insert("playerId".to_string(), json!(player_id));
    attributes.insert("totalShots".to_string(), json!(features.total_shots));
    attributes.insert("totalHits".to_string(), json!(features.total_hits));
    attributes.insert("totalHeadshots".to_string(), json!(features.total_headshots));
    attributes.insert("totalKills".to_string(), json!(features.total_kills));
    attributes.insert("accuracy".to_string(), encode_f64(features.accuracy));
    attributes.insert("headshotRatio".to_string(), encode_f64(features.headshot_ratio));
    attributes.insert(
        "accuracySampleCount".to_string(),
        json!(features.accuracy_sample_count),
    );
    attributes.insert("accuracyMean".to_string(), encode_f64(features.accuracy_mean));
    attributes.insert("accuracyM2".to_string(), encode_f64(features.accuracy_m2));
    attributes.insert("accuracyStdDev".to_string(), encode_f64(features.accuracy_std_dev));
    attributes.insert("updatedAt".to_string(), json!(features.updated_at));

    Item {
        pk: player_pk(owner, player_id),
        sk: "FEATURES".to_string(),
        attributes,
    }
}

pub fn features_from_item(item: &Map<String, Value>) -> PlayerFeatures {
    PlayerFeatures {
        total_shots: decode_u64(item.get("totalShots")),
        total_hits: decode_u64(item.get("totalHits")),
        total_headshots: decode_u64(item.get("totalHeadshots")),
        total_kills: decode_u64(item.get("totalKills")),
        accuracy: decode_f64(item.get("accuracy")),
        headshot_ratio: decode_f64(item.get("headshotRatio")),
        accuracy_sample_count: decode_u64(item.get("accuracySampleCount")),
        accuracy_mean: decode_f64(item.get("accuracyMean")),
        accuracy_m2: decode_f64(item.get("accuracyM2")),
        accuracy_std_dev: decode_f64(item.get("accuracyStdDev")),
        updated_at: decode_i64(item.get("updatedAt")),
    }
}

fn detector_type_str(t: DetectorType) -> &'static str {
    match t {
        DetectorType::ZscoreAccuracy => "ZSCORE_ACCURACY",
        DetectorType::ThresholdHeadshot => "THRESHOLD_HEADSHOT",
    }
}

/// Serializes a detection draft into a store item:
/// `features` is JSON-encoded as a string, `status` defaults to `OPEN`.
pub fn detection_to_item(
    owner: &str,
    player_id: &str,
    draft: &DetectionDraft,
    detection_id: &str,
    created_at: i64,
    ttl: i64,
) -> Item {
    let mut attributes = Map::new();
    attributes.insert("detectionId".to_string(), json!(detection_id));
    attributes.insert("owner".to_string(), json!(owner));
    attributes.insert("playerId".to_string(), json!(player_id));
    attributes.insert(
        "detectorType".to_string(),
        json!(detector_type_str(draft.detector_type)),
    );
    attributes.insert("score".to_string(), encode_f64(draft.score));
    attributes.insert("threshold".to_string(), encode_f64(draft.threshold));
    attributes.insert(
        "features".to_string(),
        json!(serde_json::to_string(&draft.features).unwrap_or_default()),
    );
    attributes.insert("explanation".to_string(), json!(draft.explanation));
    attributes.insert("status".to_string(), json!("OPEN"));
    attributes.insert("createdAt".to_string(), json!(created_at));
    attributes.insert("ttl".to_string(), json!(ttl));

    Item {
        pk: player_pk(owner, player_id),
        sk: detection_sk(created_at, detection_id),
        attributes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_common::ActionType;

    #[test]
    fn event_round_trips_metadata_as_json_string() {
        let event = EventRecord {
            event_id: Some("e1".to_string()),
            owner: "tenant".to_string(),
            player_id: "p1".to_string(),
            action_type: ActionType::WeaponFired,
            timestamp: 1234,
            session_id: Some("s1".to_string()),
            metadata: RawMetadata::default(),
        };
        let item = event_to_item("tenant", &event, "e1", 99999);
        assert_eq!(item.pk, "tenant#p1");
        assert_eq!(item.sk, "1234#e1");
        assert!(item.attributes.get("metadata").unwrap().is_string());
    }

    #[test]
    fn features_round_trip_preserves_values() {
        let features = PlayerFeatures {
            total_shots: 10,
            total_hits: 8,
            total_headshots: 2,
            total_kills: 1,
            accuracy: 0.8,
            headshot_ratio: 0.25,
            accuracy_sample_count: 1,
            accuracy_mean: 0.8,
            accuracy_m2: 0.0,
            accuracy_std_dev: 0.0,
            updated_at: 5000,
        };
        let item = features_to_item("tenant", "p1", &features);
        let restored = features_from_item(&item.attributes);
        assert_eq!(restored, features);
    }

    #[test]
    fn profile_round_trip_preserves_status() {
        let profile = PlayerProfile {
            first_seen: 1,
            last_seen: 2,
            event_count: 3,
            risk_score: 42.5,
            status: PlayerStatus::Flagged,
        };
        let item = profile_to_item("tenant", "p1", &profile);
        let restored = profile_from_item(&item.attributes);
        assert_eq!(restored, profile);
    }
}
