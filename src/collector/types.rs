//! Sample types delivered by a wearable sensor stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowest heart rate accepted into the window (BPM).
pub const MIN_VALID_HR: f64 = 30.0;

/// Highest heart rate accepted into the window (BPM).
pub const MAX_VALID_HR: f64 = 300.0;

/// One ingestion event from the wearable.
///
/// A sample carries the instantaneous heart rate plus every RR interval the
/// sensor reported since the previous sample. Motion readings are optional
/// and keyed by channel name (e.g. `"accel_x"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the sample was taken
    pub timestamp: DateTime<Utc>,
    /// Heart rate in beats per minute
    pub hr: f64,
    /// Beat-to-beat intervals in milliseconds, in arrival order
    pub rr_intervals: Vec<f64>,
    /// Optional motion readings per channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<BTreeMap<String, f64>>,
}

impl Sample {
    /// Create a sample stamped with the current time.
    pub fn new(hr: f64, rr_intervals: Vec<f64>) -> Self {
        Self::at(Utc::now(), hr, rr_intervals)
    }

    /// Create a sample with an explicit timestamp.
    pub fn at(timestamp: DateTime<Utc>, hr: f64, rr_intervals: Vec<f64>) -> Self {
        Self {
            timestamp,
            hr,
            rr_intervals,
            motion: None,
        }
    }

    /// Attach motion readings to the sample.
    pub fn with_motion(mut self, motion: BTreeMap<String, f64>) -> Self {
        self.motion = Some(motion);
        self
    }

    /// Check the sample against the ingestion gate.
    ///
    /// Returns the reason the sample would be dropped, if any.
    pub fn rejection_reason(&self) -> Option<&'static str> {
        if !(MIN_VALID_HR..=MAX_VALID_HR).contains(&self.hr) {
            Some("heart rate outside physiological range")
        } else if self.rr_intervals.is_empty() {
            Some("empty RR interval list")
        } else {
            None
        }
    }

    /// Whether the sample passes the ingestion gate.
    pub fn is_valid(&self) -> bool {
        self.rejection_reason().is_none()
    }
}
