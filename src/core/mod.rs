//! Core inference pipeline.
//!
//! This module contains:
//! - Sliding-window sample storage
//! - HRV feature extraction
//! - The linear classifier and model parameters
//! - The windowed inference engine tying them together
//! - HSI snapshot building for export

pub mod classifier;
pub mod engine;
pub mod features;
pub mod hsi;
pub mod windowing;

// Re-export commonly used types
pub use classifier::{softmax, LinearClassifier, ModelInfo, ModelParams};
pub use engine::{EmotionEngine, InferenceResult, MIN_SAMPLES};
pub use features::{
    clean_rr_intervals, extract_features, extract_hr_mean, extract_rmssd, extract_sdnn,
    normalize_features, validate_features, FeatureVector, CORE_FEATURES,
};
pub use hsi::{HsiBuilder, HsiSnapshot, HSI_VERSION, PRODUCER_NAME};
pub use windowing::{BufferStats, SampleStore, WindowAggregate, WindowBuffer};
