//! Sample ingestion for the emotion engine.
//!
//! Live integrations push [`Sample`]s straight into the engine from their
//! sensor callback. The replay collector covers recorded streams.

pub mod replay;
pub mod types;

// Re-export commonly used types
pub use replay::{CollectorConfig, CollectorError, ReplayCollector};
pub use types::{Sample, MAX_VALID_HR, MIN_VALID_HR};
