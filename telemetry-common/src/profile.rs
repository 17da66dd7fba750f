use serde::{Deserialize, Serialize};

/// Player status; defaults to `Monitor` and, once set, is never
/// overwritten by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerStatus {
    #[default]
    Monitor,
    Flagged,
    Banned,
}

/// Persisted per-player profile record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub first_seen: i64,
    pub last_seen: i64,
    pub event_count: u64,
    pub risk_score: f64,
    pub status: PlayerStatus,
}

impl PlayerProfile {
    /// Merges a prior profile (or `None` for a first-seen player) with the
    /// outcome of one batch.
    pub fn merge(
        prior: Option<&PlayerProfile>,
        now_ms: i64,
        batch_event_count: u64,
        risk_score: f64,
    ) -> PlayerProfile {
        match prior {
            Some(p) => PlayerProfile {
                first_seen: p.first_seen,
                last_seen: now_ms,
                event_count: p.event_count + batch_event_count,
                risk_score,
                status: p.status,
            },
            None => PlayerProfile {
                first_seen: now_ms,
                last_seen: now_ms,
                event_count: batch_event_count,
                risk_score,
                status: PlayerStatus::default(),
            },
        }
    }
}
