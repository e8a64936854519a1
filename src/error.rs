//! Error taxonomy for the emotion inference pipeline.
//!
//! Per-sample ingestion problems never surface here: invalid samples are
//! dropped by the engine and reported through the log sink instead. These
//! variants cover construction-time and classification-time failures.

use thiserror::Error;

/// Errors raised by the inference pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmotionError {
    /// Not enough RR intervals to compute HRV features.
    #[error("Too few RR intervals: expected at least {expected}, got {actual}")]
    TooFewRr { expected: usize, actual: usize },

    /// A feature vector failed validation at classification time.
    #[error("Bad input: {0}")]
    BadInput(String),

    /// Model parameters do not match the features the engine produces.
    #[error("Model incompatible: expected {expected} features, got {actual} ({detail})")]
    ModelIncompatible {
        expected: usize,
        actual: usize,
        detail: String,
    },

    /// Feature extraction could not produce a usable vector.
    #[error("Feature extraction failed: {0}")]
    FeatureExtractionFailed(String),

    /// Model parameters are structurally malformed or could not be parsed.
    #[error("Invalid model: {0}")]
    InvalidModel(String),
}

/// Result type alias using [`EmotionError`].
pub type Result<T> = std::result::Result<T, EmotionError>;
