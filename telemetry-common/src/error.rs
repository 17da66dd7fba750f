use thiserror::Error;

/// Errors that terminate a batch at the request level.
///
/// Per-event and per-player failures are *not* represented here: they are
/// recovered locally by the feature extractor and orchestrator and folded
/// into the response's skip/failure counters instead (see
/// [`crate::response`] in `telemetry-store`).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid JSON in request body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("request deadline exceeded during store I/O")]
    Deadline,

    #[error("{0}")]
    Other(String),
}
