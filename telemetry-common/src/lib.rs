//! Event model, feature extraction, and anomaly detection for the
//! multi-tenant telemetry ingestion core. See `telemetry-store` for the
//! store adapter and batch orchestrator that drive these types.

pub mod config;
pub mod detector;
pub mod error;
pub mod event;
pub mod features;
pub mod profile;

pub use config::Config;
pub use detector::{detect, DetectionDraft, DetectorType};
pub use error::CoreError;
pub use event::{parse_body, ActionType, BatchRequestBody, EventRecord, RawMetadata};
pub use features::{extract_features, risk_score, ExtractionResult, InterestingEvent, PlayerFeatures, WelfordState};
pub use profile::{PlayerProfile, PlayerStatus};
