use crate::orchestrator::{BatchOrchestrator, BatchResult};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Instant;
use telemetry_common::parse_body;
use tracing::{error, info};

/// Inbound gateway-shaped request: `body` may arrive as an object
/// or as a JSON-encoded string; `headers` are accepted but never inspected
/// by the core (authentication is an external concern).
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub body: Value,
    pub request_id: String,
}

/// Outbound gateway-shaped response.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: Value,
}

fn headers() -> Value {
    json!({
            "Content-Type": "application/json",
            "Access-Control-Allow-Origin": "*",
    })
}

fn success_body(result: &BatchResult, processing_time_ms: f64, request_id: &str) -> Value {
    json!({
            "success": true,
            "eventsReceived": result.events_received,
            "eventsStored": result.events_stored,
            "eventsSkipped": result.events_skipped,
            "playersUpdated": result.players_updated,
            "detectionsCreated": result.detections_created,
            "processingTimeMs": (processing_time_ms * 100.0).round() / 100.0,
            "requestId": request_id,
    })
}

fn error_body(message: &str, request_id: &str) -> Value {
    json!({
            "success": false,
            "error": message,
            "requestId": request_id,
    })
}

/// Entry point for the gateway front-end: parses the request
/// body, drives the orchestrator, and maps the outcome to a status-coded
/// response. Parse failures never reach the orchestrator (no state
/// mutation); any other failure surfaces as a 500 with the error message.
pub async fn handle_request(
    orchestrator: &BatchOrchestrator,
    request: GatewayRequest,
    now_ms: i64,
) -> GatewayResponse {
    let started = Instant::now();
    info!(request_id = %request.request_id, "processing request");

    let parsed = match parse_body(&request.body) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(request_id = %request.request_id, error = %e, "invalid JSON in request body");
            return GatewayResponse {
                status_code: 400,
                headers: headers(),
                body: error_body("Invalid JSON in request body", &request.request_id),
            };
        }
    };

    match orchestrator
    .process_batch(parsed.events, &request.request_id, now_ms)
    .await
    {
        Ok(result) => {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            GatewayResponse {
                status_code: 200,
                headers: headers(),
                body: success_body(&result, elapsed_ms, &request.request_id),
            }
        }
        Err(e) => {
            error!(request_id = %request.request_id, error = %e, "error processing events");
            GatewayResponse {
                status_code: 500,
                headers: headers(),
                body: error_body(&e.to_string(), &request.request_id),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use serde_json::json;
    use std::sync::Arc;
    use telemetry_common::Config;

    #[tokio::test]
    async fn empty_events_yields_success_envelope() {
        let store = Arc::new(InMemoryStore::new());
        let orch = BatchOrchestrator::new(store, Config::default());
        let request = GatewayRequest {
            body: json!({ "events": [] }),
            request_id: "req-1".to_string(),
        };
        let response = handle_request(&orch, request, 1_000_000).await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body["success"], json!(true));
        assert_eq!(response.body["eventsReceived"], json!(0));
        assert_eq!(response.body["requestId"], json!("req-1"));
    }

    #[tokio::test]
    async fn string_encoded_body_is_accepted() {
        let store = Arc::new(InMemoryStore::new());
        let orch = BatchOrchestrator::new(store, Config::default());
        let request = GatewayRequest {
            body: Value::String(r#"{"events":[]}"#.to_string()),
            request_id: "req-2".to_string(),
        };
        let response = handle_request(&orch, request, 1_000_000).await;
        assert_eq!(response.status_code, 200);
    }

    #[tokio::test]
    async fn malformed_body_yields_400_without_mutating_state() {
        let store = Arc::new(InMemoryStore::new());
        let orch = BatchOrchestrator::new(store.clone(), Config::default());
        let request = GatewayRequest {
            body: Value::String("{not json".to_string()),
            request_id: "req-3".to_string(),
        };
        let response = handle_request(&orch, request, 1_000_000).await;
        assert_eq!(response.status_code, 400);
        assert_eq!(response.body["error"], json!("Invalid JSON in request body"));
        assert!(store.scan(crate::record::Table::Events).await.is_empty());
    }

    #[tokio::test]
    async fn routine_batch_reports_full_envelope() {
        let store = Arc::new(InMemoryStore::new());
        let orch = BatchOrchestrator::new(store, Config::default());
        let request = GatewayRequest {
            body: json!({
                    "events": [
                        { "owner": "tenant", "playerId": "p1", "actionType": "SESSION_START", "timestamp": 1000 }
                    ]
            }),
            request_id: "req-4".to_string(),
        };
        let response = handle_request(&orch, request, 1_000_000).await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body["eventsReceived"], json!(1));
        assert_eq!(response.body["eventsStored"], json!(1));
        assert_eq!(response.body["eventsSkipped"], json!(0));
        assert_eq!(response.body["playersUpdated"], json!(1));
    }
}
