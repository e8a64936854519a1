//! Transparency module for the emotion engine.
//!
//! This module provides the injected logging side channel and a counting
//! log that exposes what the engine did with the incoming stream.

pub mod log;
pub mod sink;

// Re-export commonly used types
pub use log::{create_shared_log, SharedTransparencyLog, TransparencyLog, TransparencyStats};
pub use sink::{FanoutSink, LogSink, NoopSink, Severity, SharedSink, TracingSink};
