//! Thin front-end for the telemetry ingestion core: a CLI that reads a
//! gateway-shaped JSON request from a file or stdin, runs it through the
//! orchestrator, and prints the response — standing in for the real
//! out-of-scope HTTP front-end.

use std::sync::Arc;
use telemetry_common::Config;
use telemetry_store::{handle_request, BatchOrchestrator, GatewayRequest, GatewayResponse, InMemoryStore};

/// Builds an in-process orchestrator over a fresh [`InMemoryStore`] and
/// runs one request through it. The CLI's entire job in one call so it can
/// be exercised directly from tests without going through argv/stdio.
pub async fn run_request(config: Config, request: GatewayRequest, now_ms: i64) -> GatewayResponse {
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = BatchOrchestrator::new(store, config);
    handle_request(&orchestrator, request, now_ms).await
}
