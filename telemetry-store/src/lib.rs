//! Store adapter, batch orchestrator, and response builder for the
//! multi-tenant telemetry ingestion core. See `telemetry-common` for the
//! event model, feature extraction, and detection logic these modules
//! drive.

pub mod decimal;
pub mod orchestrator;
pub mod record;
pub mod response;
pub mod store;

pub use orchestrator::{BatchOrchestrator, BatchResult};
pub use record::{Item, Table};
pub use response::{handle_request, GatewayRequest, GatewayResponse};
pub use store::{InMemoryStore, PutBatchOutcome, StoreAdapter};
