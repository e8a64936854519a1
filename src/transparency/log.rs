//! Transparency log counting what the engine did with the stream.
//!
//! The log is itself a [`LogSink`]: each engine notification maps to one
//! severity, so counting by severity gives accepted samples, dropped
//! samples, emissions and errors without inspecting any sample content.

use crate::transparency::sink::{LogSink, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current session.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Samples accepted into the window
    samples_accepted: AtomicU64,
    /// Samples dropped at the ingestion gate
    samples_dropped: AtomicU64,
    /// Inference results emitted
    emissions: AtomicU64,
    /// Errors caught by the engine
    errors: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl TransparencyLog {
    /// Create a new transparency log.
    pub fn new() -> Self {
        Self {
            samples_accepted: AtomicU64::new(0),
            samples_dropped: AtomicU64::new(0),
            emissions: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            samples_accepted: self.samples_accepted.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            emissions: self.emissions.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Samples accepted: {}\n\
             - Samples dropped: {}\n\
             - Results emitted: {}\n\
             - Errors: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Privacy Guarantee:\n\
             - All inference runs on-device\n\
             - Raw samples are discarded once they leave the window",
            stats.samples_accepted,
            stats.samples_dropped,
            stats.emissions,
            stats.errors,
            stats.session_duration_secs
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.samples_accepted.store(0, Ordering::Relaxed);
        self.samples_dropped.store(0, Ordering::Relaxed);
        self.emissions.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for TransparencyLog {
    fn log(&self, severity: Severity, _message: &str, _context: Option<&Value>) {
        let counter = match severity {
            Severity::Debug => &self.samples_accepted,
            Severity::Info => &self.emissions,
            Severity::Warn => &self.samples_dropped,
            Severity::Error => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub samples_accepted: u64,
    pub samples_dropped: u64,
    pub emissions: u64,
    pub errors: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log.
pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}
