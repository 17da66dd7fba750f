use crate::config::Config;
use crate::event::{meta_f64, ActionType, EventRecord};
use serde::{Deserialize, Serialize};

/// Welford's online mean/variance state for a player's per-batch accuracy
/// samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct WelfordState {
    pub count: u64,
    pub mean: f64,
    pub m2: f64,
}

impl WelfordState {
    /// Folds one new `session_accuracy` sample into the running state.
    /// Only invoked when `shots_fired > 0` for the batch.
    pub fn update(self, sample: f64) -> WelfordState {
        let count = self.count + 1;
        let delta = sample - self.mean;
        let mean = self.mean + delta / count as f64;
        let delta2 = sample - mean;
        let m2 = self.m2 + delta * delta2;
        WelfordState { count, mean, m2 }
    }

    pub fn std_dev(&self) -> f64 {
        if self.count > 1 {
            (self.m2 / self.count as f64).sqrt()
        } else {
            0.0
        }
    }
}

/// Persisted per-player feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerFeatures {
    pub total_shots: u64,
    pub total_hits: u64,
    pub total_headshots: u64,
    pub total_kills: u64,
    pub accuracy: f64,
    pub headshot_ratio: f64,
    pub accuracy_sample_count: u64,
    pub accuracy_mean: f64,
    pub accuracy_m2: f64,
    pub accuracy_std_dev: f64,
    pub updated_at: i64,
}

impl PlayerFeatures {
    fn welford(&self) -> WelfordState {
        WelfordState {
            count: self.accuracy_sample_count,
            mean: self.accuracy_mean,
            m2: self.accuracy_m2,
        }
    }
}

/// An input event retained for persistence, together with why it was kept.
#[derive(Debug, Clone)]
pub struct InterestingEvent {
    pub event: EventRecord,
    pub reason: String,
}

/// Result of folding one player's batch of events into their prior feature
/// state.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub features: PlayerFeatures,
    pub interesting: Vec<InterestingEvent>,
}

fn meta_i64(meta: &std::collections::HashMap<String, serde_json::Value>, key: &str, default: i64) -> i64 {
    meta.get(key)
    .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
    .unwrap_or(default)
}

/// Extracts updated features and the interesting-event list for one
/// player's batch. `events` must already be in arrival
/// order; `prior` is the player's existing `FEATURES` record, or `None` for
/// a first-seen player.
pub fn extract_features(
    events: &[EventRecord],
    prior: Option<&PlayerFeatures>,
    now_ms: i64,
    cfg: &Config,
) -> ExtractionResult {
    let mut shots_fired: i64 = 0;
    let mut shots_hit: i64 = 0;
    let mut headshots: i64 = 0;
    let mut kills: u64 = 0;
    let mut interesting = Vec::new();

    for event in events {
        if event.action_type.always_store() {
            if event.action_type == ActionType::PlayerKilled {
                kills += 1;
            }
            interesting.push(InterestingEvent {
                    event: event.clone(),
                    reason: "always_store".to_string(),
            });
            continue;
        }

        match event.action_type {
            ActionType::WeaponFired => {
                let meta = event.metadata.clone().decode();
                let evt_shots = meta_i64(&meta, "shots", 1);
                let evt_hits = meta_i64(&meta, "hits", 0);
                let evt_headshots = meta_i64(&meta, "headshots", 0);

                shots_fired += evt_shots;
                shots_hit += evt_hits;
                headshots += evt_headshots;

                if evt_shots >= cfg.min_shots_for_interesting && evt_shots > 0 {
                    let evt_accuracy = evt_hits as f64 / evt_shots as f64;
                    let evt_hs_ratio = evt_headshots as f64 / evt_hits.max(1) as f64;

                    if evt_accuracy >= cfg.accuracy_interesting_threshold {
                        interesting.push(InterestingEvent {
                                event: event.clone(),
                                reason: format!("high_accuracy:{evt_accuracy:.2}"),
                        });
                    } else if evt_hs_ratio >= cfg.headshot_interesting_threshold {
                        interesting.push(InterestingEvent {
                                event: event.clone(),
                                reason: format!("high_headshot:{evt_hs_ratio:.2}"),
                        });
                    }
                }
            }
            ActionType::PlayerAttack => {
                let meta = event.metadata.clone().decode();
                let damage = meta_f64(&meta, "damage", 0.0);
                if damage > cfg.high_damage_threshold {
                    interesting.push(InterestingEvent {
                            event: event.clone(),
                            reason: format!("high_damage:{damage}"),
                    });
                }
            }
            _ => {}
        }
    }

    let prior_totals = prior.cloned().unwrap_or_default();
    let total_shots = prior_totals.total_shots + shots_fired.max(0) as u64;
    let total_hits = prior_totals.total_hits + shots_hit.max(0) as u64;
    let total_headshots = prior_totals.total_headshots + headshots.max(0) as u64;
    let total_kills = prior_totals.total_kills + kills;

    let (accuracy, headshot_ratio) = if total_shots > 0 {
        (
            total_hits as f64 / total_shots as f64,
            total_headshots as f64 / total_hits.max(1) as f64,
        )
    } else {
        (0.0, 0.0)
    };

    let welford = if shots_fired > 0 {
        let session_accuracy = shots_hit as f64 / shots_fired as f64;
        prior_totals.welford().update(session_accuracy)
    } else {
        prior_totals.welford()
    };

    let features = PlayerFeatures {
        total_shots,
        total_hits,
        total_headshots,
        total_kills,
        accuracy,
        headshot_ratio,
        accuracy_sample_count: welford.count,
        accuracy_mean: welford.mean,
        accuracy_m2: welford.m2,
        accuracy_std_dev: welford.std_dev(),
        updated_at: now_ms,
    };

    ExtractionResult {
        features,
        interesting,
    }
}

/// Risk-score contribution rule, clamped to `[0, 100]`.
pub fn risk_score(features: &PlayerFeatures, cfg: &Config) -> f64 {
    let mut risk = 0.0;
    if features.accuracy > cfg.accuracy_risk_threshold {
        risk += (features.accuracy - cfg.accuracy_risk_threshold) * 100.0;
    }
    if features.headshot_ratio > cfg.headshot_risk_threshold {
        risk += (features.headshot_ratio - cfg.headshot_risk_threshold) * 100.0;
    }
    risk.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RawMetadata;
    use serde_json::json;
    use std::collections::HashMap;

    fn weapon_fired(player: &str, shots: i64, hits: i64, headshots: i64) -> EventRecord {
        let mut meta = HashMap::new();
        meta.insert("shots".to_string(), json!(shots));
        meta.insert("hits".to_string(), json!(hits));
        meta.insert("headshots".to_string(), json!(headshots));
        EventRecord {
            event_id: Some("e1".to_string()),
            owner: "tenant".to_string(),
            player_id: player.to_string(),
            action_type: ActionType::WeaponFired,
            timestamp: 1,
            session_id: None,
            metadata: RawMetadata::Object(meta),
        }
    }

    fn always_store(action: ActionType, player: &str) -> EventRecord {
        EventRecord {
            event_id: Some("e2".to_string()),
            owner: "tenant".to_string(),
            player_id: player.to_string(),
            action_type: action,
            timestamp: 1,
            session_id: None,
            metadata: RawMetadata::default(),
        }
    }

    #[test]
    fn s1_empty_batch_is_noop() {
        let cfg = Config::default();
        let r = extract_features(&[], None, 1000, &cfg);
        assert_eq!(r.features.total_shots, 0);
        assert!(r.interesting.is_empty());
    }

    #[test]
    fn s2_always_store_events() {
        let cfg = Config::default();
        let events = vec![
            always_store(ActionType::SessionStart, "p1"),
            always_store(ActionType::SessionEnd, "p1"),
            always_store(ActionType::PlayerKilled, "p1"),
        ];
        let r = extract_features(&events, None, 1000, &cfg);
        assert_eq!(r.interesting.len(), 3);
        assert_eq!(r.features.total_kills, 1);
        assert_eq!(r.features.total_shots, 0);
    }

    #[test]
    fn s3_high_accuracy_tagging() {
        let cfg = Config::default();
        let events = vec![weapon_fired("p1", 10, 8, 2)];
        let r = extract_features(&events, None, 1000, &cfg);
        assert_eq!(r.interesting.len(), 1);
        assert!(r.interesting[0].reason.starts_with("high_accuracy:0.80"));
        assert_eq!(r.features.total_shots, 10);
        assert_eq!(r.features.total_hits, 8);
        assert_eq!(r.features.accuracy, 0.8);
        assert_eq!(r.features.accuracy_sample_count, 1);
        assert_eq!(r.features.accuracy_mean, 0.8);
        assert_eq!(r.features.accuracy_std_dev, 0.0);
    }

    #[test]
    fn s4_welford_over_two_batches() {
        let cfg = Config::default();
        let r1 = extract_features(&[weapon_fired("p1", 10, 8, 0)], None, 1000, &cfg);
        let r2 = extract_features(&[weapon_fired("p1", 10, 6, 0)], Some(&r1.features), 2000, &cfg);
        assert_eq!(r2.features.accuracy_sample_count, 2);
        assert!((r2.features.accuracy_mean - 0.7).abs() < 1e-9);
        assert!((r2.features.accuracy_m2 - 0.02).abs() < 1e-9);
        assert!((r2.features.accuracy_std_dev - 0.1).abs() < 1e-9);
    }

    #[test]
    fn hits_greater_than_shots_does_not_panic() {
        let cfg = Config::default();
        let r = extract_features(&[weapon_fired("p1", 5, 9, 0)], None, 1000, &cfg);
        assert!(r.features.accuracy > 1.0);
    }

    #[test]
    fn zero_shots_never_divides_by_zero() {
        let cfg = Config::default();
        let r = extract_features(&[weapon_fired("p1", 0, 0, 0)], None, 1000, &cfg);
        assert_eq!(r.features.accuracy, 0.0);
        assert_eq!(r.features.headshot_ratio, 0.0);
    }

    #[test]
    fn batch_merge_associativity() {
        let cfg = Config::default();
        let a = weapon_fired("p1", 10, 8, 1);
        let b = weapon_fired("p1", 5, 1, 0);

        let combined = extract_features(&[a.clone(), b.clone()], None, 1000, &cfg).features;

        let step1 = extract_features(&[a], None, 1000, &cfg).features;
        let step2 = extract_features(&[b], Some(&step1), 2000, &cfg).features;

        assert_eq!(combined.total_shots, step2.total_shots);
        assert_eq!(combined.total_hits, step2.total_hits);
        assert_eq!(combined.total_headshots, step2.total_headshots);
        assert_eq!(combined.total_kills, step2.total_kills);
    }

    #[test]
    fn risk_score_clamped() {
        let cfg = Config::default();
        let mut f = PlayerFeatures {
            accuracy: 1.0,
            headshot_ratio: 1.0,
            total_shots: 10,
            total_hits: 10,
            ..Default::default()
        };
        assert_eq!(risk_score(&f, &cfg), 100.0);
        f.accuracy = 0.5;
        f.headshot_ratio = 0.3;
        assert_eq!(risk_score(&f, &cfg), 0.0);
    }
}
