use crate::record::{Item, Table};
use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of a best-effort batched write: per-record failures
/// are counted, never surfaced as a request-level error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutBatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

/// Thin abstraction over the three logical collections. The
/// underlying KV engine's wire protocol is out of scope; this
/// trait is the entire surface the core depends on, so any concrete store
/// (DynamoDB, a local cache, a test double) can be dropped in behind it.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    async fn get(&self, table: Table, pk: &str, sk: &str) -> anyhow::Result<Option<Map<String, Value>>>;

    async fn put_batch(&self, table: Table, items: Vec<Item>) -> PutBatchOutcome;
}

/// In-memory reference implementation used for local/dev runs and the test
/// suite. One `RwLock<HashMap<..>>` per logical table, wrapped behind one
/// struct the way a multi-table database manager wraps several independent
/// per-table clients.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<HashMap<(&'static str, String, String), Map<String, Value>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot helper for assertions in tests: all items ever written to a
    /// table, regardless of key.
    pub async fn scan(&self, table: Table) -> Vec<Map<String, Value>> {
        self.tables
        .read()
        .await
        .iter()
        .filter(|((t, _, _), _)| *t == table.name())
        .map(|(_, v)| v.clone())
        .collect()
    }
}

#[async_trait]
impl StoreAdapter for InMemoryStore {
    async fn get(&self, table: Table, pk: &str, sk: &str) -> anyhow::Result<Option<Map<String, Value>>> {
        let key = (table.name(), pk.to_string(), sk.to_string());
        Ok(self.tables.read().await.get(&key).cloned())
    }

    async fn put_batch(&self, table: Table, items: Vec<Item>) -> PutBatchOutcome {
        let mut guard = self.tables.write().await;
        let mut outcome = PutBatchOutcome::default();
        for item in items {
            let key = (table.name(), item.pk, item.sk);
            guard.insert(key, item.attributes);
            outcome.succeeded += 1;
        }
        outcome
    }
}
