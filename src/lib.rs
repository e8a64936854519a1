//! Synheart Emotion - on-device emotion inference from wearable heart data.
//!
//! This library turns a live stream of heart-rate and RR-interval samples
//! into periodic emotion-state classifications, computed entirely on-device
//! from a rolling window of recent samples.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Synheart Emotion                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Window    │──▶│  Features   │──▶│ Classifier  │       │
//! │  │ (push/trim) │   │ (HR, HRV)   │   │  (softmax)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                    │              │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐                     ┌─────────────┐       │
//! │  │  Log sink   │                     │  Inference  │       │
//! │  │ (injected)  │                     │   Result    │       │
//! │  └─────────────┘                     └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use synheart_emotion::{EmotionEngine, EngineConfig, Sample};
//!
//! let engine = EmotionEngine::with_default_model(EngineConfig::default())
//!     .expect("default model is compatible");
//!
//! // From the sensor callback
//! engine.push(Sample::new(72.0, vec![820.0, 810.0, 835.0]));
//!
//! // From the polling loop
//! if let Ok(Some(result)) = engine.try_emit() {
//!     println!("{} ({:.2})", result.emotion, result.confidence);
//! }
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod error;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use collector::{CollectorConfig, CollectorError, ReplayCollector, Sample};
pub use config::{Config, ConfigError, EngineConfig};
pub use crate::core::{
    BufferStats, EmotionEngine, FeatureVector, HsiBuilder, HsiSnapshot, InferenceResult,
    LinearClassifier, ModelInfo, ModelParams,
};
pub use error::{EmotionError, Result};
pub use transparency::{
    FanoutSink, LogSink, NoopSink, Severity, SharedTransparencyLog, TracingSink, TransparencyLog,
    TransparencyStats,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║             SYNHEART EMOTION - PRIVACY DECLARATION               ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  ✓ WHAT WE PROCESS:                                              ║
║    • Heart rate samples from your wearable                       ║
║    • Beat-to-beat (RR) interval timing                           ║
║    • Optional motion readings                                    ║
║                                                                  ║
║  ✗ WHAT WE NEVER DO:                                             ║
║    • Send any data over the network                              ║
║    • Store raw samples beyond the rolling window                 ║
║    • Persist anything across sessions                            ║
║                                                                  ║
║  All inference runs locally. Results are estimates from a        ║
║  placeholder model and are not clinical measurements.            ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
