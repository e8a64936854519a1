//! Injected logging side channel.
//!
//! The engine reports dropped samples, accepted samples, emissions and
//! caught errors to a [`LogSink`]. Sinks are pure notification targets:
//! engine behavior never depends on what a sink does with a call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Severity of a log notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

/// Receiver for engine log notifications.
pub trait LogSink: Send + Sync {
    /// Record a notification with optional structured context.
    fn log(&self, severity: Severity, message: &str, context: Option<&Value>);
}

/// Thread-safe shared sink handle.
pub type SharedSink = Arc<dyn LogSink>;

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _severity: Severity, _message: &str, _context: Option<&Value>) {}
}

/// Sink that forwards notifications to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, severity: Severity, message: &str, context: Option<&Value>) {
        let context = context.map(Value::to_string).unwrap_or_default();
        match severity {
            Severity::Debug => tracing::debug!(context = %context, "{}", message),
            Severity::Info => tracing::info!(context = %context, "{}", message),
            Severity::Warn => tracing::warn!(context = %context, "{}", message),
            Severity::Error => tracing::error!(context = %context, "{}", message),
        }
    }
}

/// Sink that forwards every notification to several sinks in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<SharedSink>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink to the fan-out.
    pub fn with(mut self, sink: SharedSink) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl LogSink for FanoutSink {
    fn log(&self, severity: Severity, message: &str, context: Option<&Value>) {
        for sink in &self.sinks {
            sink.log(severity, message, context);
        }
    }
}
