//! HSI (Human State Interface) 1.0 compliant snapshot builder.
//!
//! Each emitted [`InferenceResult`] becomes one snapshot with a single
//! window and an `affect` axis domain holding one reading per label.

use crate::core::engine::InferenceResult;
use crate::core::windowing::BufferStats;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The current HSI format version.
pub const HSI_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "synheart-emotion";

/// HSI 1.0 axis reading direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HsiDirection {
    HigherIsMore,
    HigherIsLess,
    Bidirectional,
}

/// HSI 1.0 source type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HsiSourceType {
    Sensor,
    App,
    SelfReport,
    Observer,
    Derived,
    Other,
}

/// HSI 1.0 producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HsiProducer {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

/// HSI 1.0 window definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HsiWindow {
    /// Window start time (RFC3339)
    pub start: String,
    /// Window end time (RFC3339)
    pub end: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// HSI 1.0 axis reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HsiAxisReading {
    /// Axis name (lower_snake_case)
    pub axis: String,
    /// Score value (0-1) or null if unavailable
    pub score: Option<f64>,
    /// Confidence in the score (0-1)
    pub confidence: f64,
    pub window_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<HsiDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_source_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// HSI 1.0 axes domain (contains readings array)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HsiAxesDomain {
    pub readings: Vec<HsiAxisReading>,
}

/// HSI 1.0 axes container
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HsiAxes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affect: Option<HsiAxesDomain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement: Option<HsiAxesDomain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior: Option<HsiAxesDomain>,
}

/// HSI 1.0 source definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HsiSource {
    #[serde(rename = "type")]
    pub source_type: HsiSourceType,
    /// Quality of the source (0-1)
    pub quality: f64,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// HSI 1.0 privacy declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HsiPrivacy {
    /// Must be false - HSI payloads must not contain PII
    pub contains_pii: bool,
    pub raw_biosignals_allowed: bool,
    pub derived_metrics_allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Default for HsiPrivacy {
    fn default() -> Self {
        Self {
            contains_pii: false,
            raw_biosignals_allowed: false,
            derived_metrics_allowed: true,
            notes: Some("Only window-level HRV features and label probabilities".to_string()),
        }
    }
}

/// HSI 1.0 compliant snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HsiSnapshot {
    pub hsi_version: String,
    /// When the human state was observed (RFC3339)
    pub observed_at_utc: String,
    /// When this payload was computed (RFC3339)
    pub computed_at_utc: String,
    pub producer: HsiProducer,
    pub window_ids: Vec<String>,
    pub windows: HashMap<String, HsiWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<HashMap<String, HsiSource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axes: Option<HsiAxes>,
    pub privacy: HsiPrivacy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, serde_json::Value>>,
}

/// Builder for HSI snapshots of inference results.
pub struct HsiBuilder {
    instance_id: Uuid,
    session_id: Option<String>,
    window_duration: Duration,
}

impl HsiBuilder {
    /// Create a new HSI builder with a unique instance ID.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            session_id: None,
            window_duration: Duration::seconds(10),
        }
    }

    /// Set the session ID for generated snapshots.
    pub fn with_session_id(mut self, session_id: String) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Set the window length reported for each snapshot.
    pub fn with_window_duration(mut self, window_duration: std::time::Duration) -> Self {
        self.window_duration =
            Duration::from_std(window_duration).unwrap_or(self.window_duration);
        self
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Build a snapshot from a result and the buffer state it was computed on.
    pub fn build(&self, result: &InferenceResult, stats: &BufferStats) -> HsiSnapshot {
        let computed_at = Utc::now();
        let window_id = format!("w_{}", result.timestamp.timestamp_millis());

        let mut windows = HashMap::new();
        windows.insert(
            window_id.clone(),
            HsiWindow {
                start: (result.timestamp - self.window_duration).to_rfc3339(),
                end: result.timestamp.to_rfc3339(),
                label: None,
            },
        );

        let source_id = format!("s_wearable_hr_{}", self.instance_id);
        // More beats in the window means steadier HRV estimates.
        let quality = match stats.rr_count {
            0 => 0.0,
            1..=9 => 0.5,
            10..=29 => 0.75,
            _ => 0.95,
        };
        let degraded = stats.rr_count < 10;

        let mut sources = HashMap::new();
        sources.insert(
            source_id.clone(),
            HsiSource {
                source_type: HsiSourceType::Sensor,
                quality,
                degraded,
                notes: degraded.then(|| "Low RR interval count in window".to_string()),
            },
        );

        let readings = result
            .probabilities
            .iter()
            .map(|(label, &p)| HsiAxisReading {
                axis: label.to_lowercase(),
                score: Some(p),
                confidence: result.confidence,
                window_id: window_id.clone(),
                direction: Some(HsiDirection::HigherIsMore),
                unit: Some("probability".to_string()),
                evidence_source_ids: Some(vec![source_id.clone()]),
                notes: (*label == result.emotion).then(|| "Top label".to_string()),
            })
            .collect();

        let axes = HsiAxes {
            affect: Some(HsiAxesDomain { readings }),
            engagement: None,
            behavior: None,
        };

        let mut meta = HashMap::new();
        meta.insert("model_id".to_string(), serde_json::json!(result.model.id));
        meta.insert(
            "model_version".to_string(),
            serde_json::json!(result.model.version),
        );
        meta.insert("sample_count".to_string(), serde_json::json!(stats.count));
        meta.insert("rr_count".to_string(), serde_json::json!(stats.rr_count));
        for (name, value) in &result.features {
            meta.insert(format!("feature_{name}"), serde_json::json!(value));
        }
        if let Some(ref session_id) = self.session_id {
            meta.insert("session_id".to_string(), serde_json::json!(session_id));
        }

        HsiSnapshot {
            hsi_version: HSI_VERSION.to_string(),
            observed_at_utc: result.timestamp.to_rfc3339(),
            computed_at_utc: computed_at.to_rfc3339(),
            producer: HsiProducer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                instance_id: Some(self.instance_id.to_string()),
            },
            window_ids: vec![window_id],
            windows,
            source_ids: Some(vec![source_id]),
            sources: Some(sources),
            axes: Some(axes),
            privacy: HsiPrivacy::default(),
            meta: Some(meta),
        }
    }
}

impl Default for HsiBuilder {
    fn default() -> Self {
        Self::new()
    }
}
