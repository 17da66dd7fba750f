use crate::record::{detection_to_item, event_to_item, features_from_item, features_to_item, profile_from_item, profile_to_item, Table};
use crate::store::StoreAdapter;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use telemetry_common::{detect, extract_features, risk_score, CoreError, EventRecord, InterestingEvent, PlayerFeatures, PlayerProfile};
use tracing::{info, warn};
use uuid::Uuid;

/// Counters the response builder needs.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub events_received: usize,
    pub events_stored: usize,
    pub events_skipped: usize,
    pub players_updated: usize,
    pub detections_created: usize,
}

/// Sequences the four-stage pipeline of over one request's
/// events, driving an injected [`StoreAdapter`].
pub struct BatchOrchestrator {
    store: Arc<dyn StoreAdapter>,
    config: Arc<telemetry_common::Config>,
    max_concurrent_players: usize,
    deadline: Option<std::time::Duration>,
}

struct PlayerOutcome {
    player_id: String,
    features: PlayerFeatures,
    interesting: Vec<InterestingEvent>,
    ok: bool,
}

impl BatchOrchestrator {
    pub fn new(store: Arc<dyn StoreAdapter>, config: telemetry_common::Config) -> Self {
        Self::with_concurrency(store, config, 8)
    }

    /// `max_concurrent_players == 1` yields the purely sequential code path
    /// required by alongside the optional bounded-parallel one:
    /// each distinct `playerId` partitions the composite key space
    /// cleanly, so step 3 of is safe to run concurrently.
    pub fn with_concurrency(
        store: Arc<dyn StoreAdapter>,
        config: telemetry_common::Config,
        max_concurrent_players: usize,
    ) -> Self {
        Self {
            store,
            config: Arc::new(config),
            max_concurrent_players: max_concurrent_players.max(1),
            deadline: None,
        }
    }

    /// Bounds the whole batch (store I/O included) by the invoking
    /// request's soft deadline: exceeding it surfaces as
    /// [`CoreError::Deadline`], mapped to a 500 by the response builder,
    /// with no partial-result guarantee.
    pub fn with_deadline(mut self, deadline: std::time::Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Runs one request's batch end to end. `now_ms` is
    /// injected so callers (and tests) control the clock rather than
    /// reaching for a wall clock mid-pipeline.
    pub async fn process_batch(
        &self,
        events: Vec<EventRecord>,
        request_id: &str,
        now_ms: i64,
    ) -> Result<BatchResult, CoreError> {
        match self.deadline {
            Some(d) => tokio::time::timeout(d, self.run_pipeline(events, request_id, now_ms))
            .await
            .map_err(|_| CoreError::Deadline)?,
            None => self.run_pipeline(events, request_id, now_ms).await,
        }
    }

    async fn run_pipeline(
        &self,
        events: Vec<EventRecord>,
        request_id: &str,
        now_ms: i64,
    ) -> Result<BatchResult, CoreError> {
        if events.is_empty() {
            return Ok(BatchResult::default());
        }

        let tenant = events[0].owner.clone();
        let events_received = events.len();

        // Normalize: assign a stable id to every event, used both as the
        // event sort key and for identity comparisons in the
        // feedback loop.
        let mut events = events;
        for event in &mut events {
            if event.event_id.is_none() {
                event.event_id = Some(Uuid::new_v4().to_string());
            }
        }

        // Tenancy partitioning: every key is derived from the
        // batch's tenant, never from a per-event `owner` field, so an event
        // claiming a different owner can never cross-write another
        // tenant's keys. Such events are dropped, not reattributed.
        let mut by_player: HashMap<String, Vec<EventRecord>> = HashMap::new();
        for event in events {
            if event.owner != tenant {
                warn!(
                    request_id,
                    player_id = %event.player_id,
                    "dropping event with owner mismatched to batch tenant"
                );
                continue;
            }
            by_player.entry(event.player_id.clone()).or_default().push(event);
        }
        let all_events_by_player = by_player.clone();

        info!(request_id, owner = %tenant, events_received, players = by_player.len(), "processing batch");

        let ttl = now_ms / 1000 + self.config.event_ttl_days * 86_400;
        let store = self.store.clone();
        let config = self.config.clone();
        let tenant_for_players = tenant.clone();

        let outcomes: Vec<PlayerOutcome> = stream::iter(by_player.into_iter())
        .map(|(player_id, player_events)| {
                let store = store.clone();
                let config = config.clone();
                let tenant = tenant_for_players.clone();
                let request_id = request_id.to_string();
                async move {
                    Self::process_player(&store, &config, &tenant, player_id, player_events, now_ms, &request_id).await
                }
        })
        .buffer_unordered(self.max_concurrent_players)
        .collect()
        .await;

        let mut interesting: Vec<InterestingEvent> = Vec::new();
        let mut detection_players: Vec<(String, PlayerFeatures)> = Vec::new();
        let mut players_updated = 0usize;

        for outcome in outcomes {
            if !outcome.ok {
                continue;
            }
            players_updated += 1;
            detection_players.push((outcome.player_id.clone(), outcome.features));
            interesting.extend(outcome.interesting);
        }

        // Detector stage over every updated player.
        let mut detection_items = Vec::new();
        let mut detections_created = 0usize;
        let mut detection_player_ids: HashSet<String> = HashSet::new();
        for (player_id, features) in &detection_players {
            for draft in detect(features, &self.config) {
                detection_player_ids.insert(player_id.clone());
                let detection_id = Uuid::new_v4().to_string();
                let item = detection_to_item(&tenant, player_id, &draft, &detection_id, now_ms, ttl);
                detection_items.push(item);
                detections_created += 1;
            }
        }

        // Feedback loop: every input event belonging to
        // a player who triggered a detection this batch must end up in the
        // interesting list, even if the extractor never tagged it.
        if !detection_player_ids.is_empty() {
            let already_interesting: HashSet<String> = interesting
            .iter()
            .filter_map(|tagged| tagged.event.event_id.clone())
            .collect();
            for player_id in &detection_player_ids {
                let Some(player_events) = all_events_by_player.get(player_id) else {
                    continue;
                };
                for event in player_events {
                    let event_id = event.event_id.clone().unwrap_or_default();
                    if already_interesting.contains(&event_id) {
                        continue;
                    }
                    interesting.push(InterestingEvent {
                            event: event.clone(),
                            reason: "detection_feedback".to_string(),
                    });
                }
            }
        }

        let mut items = Vec::with_capacity(interesting.len());
        let mut seen = HashSet::new();
        for tagged in &interesting {
            let event_id = tagged.event.event_id.clone().unwrap_or_default();
            if !seen.insert(event_id.clone()) {
                continue;
            }
            items.push(event_to_item(&tenant, &tagged.event, &event_id, ttl));
        }
        //: skipped events are routine ones that never made the
        // deduplicated interesting list, regardless of whether the store
        // write for the rest happened to succeed.
        let events_skipped = events_received - items.len();
        let outcome = self.store.put_batch(Table::Events, items).await;
        let events_stored = outcome.succeeded;

        self.store.put_batch(Table::Detections, detection_items).await;

        Ok(BatchResult {
                events_received,
                events_stored,
                events_skipped,
                players_updated,
                detections_created,
        })
    }

    async fn process_player(
        store: &Arc<dyn StoreAdapter>,
        config: &telemetry_common::Config,
        tenant: &str,
        player_id: String,
        player_events: Vec<EventRecord>,
        now_ms: i64,
        request_id: &str,
    ) -> PlayerOutcome {
        let pk = crate::record::player_pk(tenant, &player_id);

        let prior_profile = match store.get(Table::Players, &pk, "PROFILE").await {
            Ok(item) => item.as_ref().map(profile_from_item),
            Err(e) => {
                warn!(request_id, %player_id, error = %e, "failed to read profile; skipping player");
                return PlayerOutcome {
                    player_id,
                    features: PlayerFeatures::default(),
                    interesting: Vec::new(),
                    ok: false,
                };
            }
        };
        let prior_features = match store.get(Table::Players, &pk, "FEATURES").await {
            Ok(item) => item.as_ref().map(features_from_item),
            Err(e) => {
                warn!(request_id, %player_id, error = %e, "failed to read features; skipping player");
                return PlayerOutcome {
                    player_id,
                    features: PlayerFeatures::default(),
                    interesting: Vec::new(),
                    ok: false,
                };
            }
        };

        let result = extract_features(&player_events, prior_features.as_ref(), now_ms, config);
        let risk = risk_score(&result.features, config);
        let profile = PlayerProfile::merge(prior_profile.as_ref(), now_ms, player_events.len() as u64, risk);

        let profile_item = profile_to_item(tenant, &player_id, &profile);
        let features_item = features_to_item(tenant, &player_id, &result.features);
        let outcome = store.put_batch(Table::Players, vec![profile_item, features_item]).await;
        if outcome.failed > 0 {
            warn!(request_id, %player_id, "one or more player state writes failed; skipping player");
            return PlayerOutcome {
                player_id,
                features: result.features,
                interesting: result.interesting,
                ok: false,
            };
        }

        PlayerOutcome {
            player_id,
            features: result.features,
            interesting: result.interesting,
            ok: true,
        }
    }
}
