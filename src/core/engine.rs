//! Windowed inference engine.
//!
//! The engine is passive: a producer pushes samples, a consumer polls
//! [`EmotionEngine::try_emit`]. Neither call blocks on anything but the
//! buffer lock, and emission cadence is a pure time gate.

use crate::collector::types::Sample;
use crate::config::EngineConfig;
use crate::core::classifier::{LinearClassifier, ModelInfo, ModelParams};
use crate::core::features::{
    clean_rr_intervals, extract_features, FeatureVector, CORE_FEATURES, HR_MEAN,
};
use crate::core::windowing::{BufferStats, SampleStore, WindowBuffer};
use crate::error::{EmotionError, Result};
use crate::transparency::sink::{NoopSink, Severity, SharedSink};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

/// Fewest buffered samples an emission is computed from.
pub const MIN_SAMPLES: usize = 2;

/// One emitted classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// When the result was emitted
    pub timestamp: DateTime<Utc>,
    /// Most probable label
    pub emotion: String,
    /// Probability of the most probable label
    pub confidence: f64,
    /// Probability of every label
    pub probabilities: BTreeMap<String, f64>,
    /// Features the classification was computed from
    pub features: FeatureVector,
    /// Metadata of the model that produced the result
    pub model: ModelInfo,
}

/// Why a poll produced no result.
#[derive(Debug, Clone, PartialEq)]
enum NotReady {
    Throttled,
    TooFewSamples(usize),
    TooFewRr { expected: usize, actual: usize },
}

impl NotReady {
    fn describe(&self) -> String {
        match self {
            NotReady::Throttled => "emission period has not elapsed".to_string(),
            NotReady::TooFewSamples(n) => {
                format!("{n} buffered samples, need at least {MIN_SAMPLES}")
            }
            NotReady::TooFewRr { expected, actual } => EmotionError::TooFewRr {
                expected: *expected,
                actual: *actual,
            }
            .to_string(),
        }
    }
}

/// Sliding-window emotion inference over a live HR/RR stream.
///
/// All operations take `&self`; the engine can be shared behind an `Arc`
/// between a sensor thread and a polling thread.
pub struct EmotionEngine {
    config: EngineConfig,
    classifier: LinearClassifier,
    store: Box<dyn SampleStore>,
    last_emission: Mutex<Option<DateTime<Utc>>>,
    sink: SharedSink,
    window: Duration,
    emission_period: Duration,
}

impl EmotionEngine {
    /// Create an engine for the given model.
    ///
    /// Fails with [`EmotionError::ModelIncompatible`] unless the model uses
    /// exactly the HR mean, SDNN and RMSSD features, and with
    /// [`EmotionError::InvalidModel`] if its weights or biases are not finite.
    pub fn new(config: EngineConfig, params: Arc<ModelParams>) -> Result<Self> {
        check_compatible(&params)?;

        let classifier = LinearClassifier::new(params);
        if !classifier.validate() {
            return Err(EmotionError::InvalidModel(
                "weights and biases must be finite".to_string(),
            ));
        }

        Ok(Self {
            window: to_chrono(config.window_duration),
            emission_period: to_chrono(config.emission_period),
            config,
            classifier,
            store: Box::new(WindowBuffer::new()),
            last_emission: Mutex::new(None),
            sink: Arc::new(NoopSink),
        })
    }

    /// Create an engine using the built-in default model.
    pub fn with_default_model(config: EngineConfig) -> Result<Self> {
        Self::new(config, Arc::new(ModelParams::default_model()))
    }

    /// Route log notifications to `sink`.
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the sample store implementation.
    pub fn with_store(mut self, store: Box<dyn SampleStore>) -> Self {
        self.store = store;
        self
    }

    /// Push a sample stamped against the current wall clock.
    pub fn push(&self, sample: Sample) {
        self.push_at(sample, Utc::now());
    }

    /// Push a sample, evicting everything older than `now - window_duration`.
    ///
    /// Invalid samples are dropped and reported at warn severity.
    pub fn push_at(&self, sample: Sample, now: DateTime<Utc>) {
        if let Some(reason) = sample.rejection_reason() {
            self.sink.log(
                Severity::Warn,
                &format!("Dropping sample: {reason}"),
                Some(&json!({
                    "hr": sample.hr,
                    "rr_count": sample.rr_intervals.len(),
                })),
            );
            return;
        }

        let hr = sample.hr;
        let rr_count = sample.rr_intervals.len();
        let evicted = self.store.push(sample, self.cutoff(now));

        self.sink.log(
            Severity::Debug,
            "Sample accepted",
            Some(&json!({
                "hr": hr,
                "rr_count": rr_count,
                "evicted": evicted,
            })),
        );
    }

    /// Poll for a result against the current wall clock.
    pub fn try_emit(&self) -> Result<Option<InferenceResult>> {
        self.try_emit_at(Utc::now())
    }

    /// Poll for a result at `now`.
    ///
    /// Returns `Ok(None)` while throttled or short of data. Errors are
    /// contract violations from the classifier and are also logged.
    pub fn try_emit_at(&self, now: DateTime<Utc>) -> Result<Option<InferenceResult>> {
        // Held for the whole poll so concurrent polls cannot both emit.
        let mut last_emission = self
            .last_emission
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match self.compute(*last_emission, now) {
            Ok(Ok(result)) => {
                *last_emission = Some(now);
                self.sink.log(
                    Severity::Info,
                    &format!("Emitted {} ({:.2})", result.emotion, result.confidence),
                    Some(&json!({
                        "emotion": result.emotion,
                        "confidence": result.confidence,
                        "model": result.model.id,
                    })),
                );
                Ok(Some(result))
            }
            Ok(Err(reason)) => {
                tracing::trace!("Not ready: {}", reason.describe());
                Ok(None)
            }
            Err(e) => {
                self.sink
                    .log(Severity::Error, &format!("Inference failed: {e}"), None);
                Err(e)
            }
        }
    }

    fn compute(
        &self,
        last_emission: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<std::result::Result<InferenceResult, NotReady>> {
        if let Some(last) = last_emission {
            if now - last < self.emission_period {
                return Ok(Err(NotReady::Throttled));
            }
        }

        let aggregate = self.store.aggregate();
        if aggregate.sample_count < MIN_SAMPLES {
            return Ok(Err(NotReady::TooFewSamples(aggregate.sample_count)));
        }

        let clean_count = clean_rr_intervals(&aggregate.rr_intervals).len();
        if clean_count < self.config.min_rr_count {
            return Ok(Err(NotReady::TooFewRr {
                expected: self.config.min_rr_count,
                actual: clean_count,
            }));
        }

        let mut features = extract_features(
            &aggregate.hr_values,
            &aggregate.rr_intervals,
            aggregate.motion.as_ref(),
        );
        if let (Some(baseline), Some(hr_mean)) =
            (self.config.hr_baseline, features.get_mut(HR_MEAN))
        {
            *hr_mean -= baseline;
        }

        let probabilities = self.classifier.predict(&features)?;
        let (emotion, confidence) = self
            .classifier
            .top_label(&probabilities)
            .map(|(label, p)| (label.to_string(), p))
            .ok_or_else(|| EmotionError::InvalidModel("model has no labels".to_string()))?;

        Ok(Ok(InferenceResult {
            timestamp: now,
            emotion,
            confidence,
            probabilities,
            features,
            model: self.classifier.params().info().clone(),
        }))
    }

    /// Summarize the buffered samples.
    pub fn stats(&self) -> BufferStats {
        self.store.stats()
    }

    /// Drop all buffered samples and forget the last emission time.
    pub fn clear(&self) {
        let mut last_emission = self
            .last_emission
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.store.clear();
        *last_emission = None;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &LinearClassifier {
        &self.classifier
    }

    pub fn model_info(&self) -> &ModelInfo {
        self.classifier.params().info()
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Reject models whose features the extractor cannot produce.
fn check_compatible(params: &ModelParams) -> Result<()> {
    let expected: BTreeSet<&str> = CORE_FEATURES.into_iter().collect();
    let actual: BTreeSet<&str> = params.feature_names().iter().map(String::as_str).collect();

    if params.feature_names().len() == CORE_FEATURES.len() && actual == expected {
        return Ok(());
    }

    let missing: Vec<&str> = expected.difference(&actual).copied().collect();
    let unexpected: Vec<&str> = actual.difference(&expected).copied().collect();
    let detail = format!("missing {missing:?}, unexpected {unexpected:?}");

    Err(EmotionError::ModelIncompatible {
        expected: CORE_FEATURES.len(),
        actual: params.feature_names().len(),
        detail,
    })
}

fn to_chrono(duration: std::time::Duration) -> Duration {
    Duration::milliseconds(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transparency::TransparencyLog;
    use std::time::Duration as StdDuration;

    fn config() -> EngineConfig {
        EngineConfig::default()
            .with_window_duration(StdDuration::from_secs(10))
            .with_emission_period(StdDuration::from_secs(5))
            .with_min_rr_count(4)
    }

    fn engine() -> EmotionEngine {
        EmotionEngine::with_default_model(config()).unwrap()
    }

    fn fill(engine: &EmotionEngine, start: DateTime<Utc>, count: i64) -> DateTime<Utc> {
        let mut now = start;
        for i in 0..count {
            now = start + Duration::seconds(i);
            engine.push_at(Sample::at(now, 70.0 + i as f64, vec![820.0, 830.0]), now);
        }
        now
    }

    #[test]
    fn test_invalid_samples_are_dropped() {
        let log = Arc::new(TransparencyLog::new());
        let engine = engine().with_sink(log.clone());
        let now = Utc::now();

        engine.push_at(Sample::at(now, 25.0, vec![800.0]), now);
        engine.push_at(Sample::at(now, 72.0, vec![]), now);
        assert_eq!(engine.stats().count, 0);

        engine.push_at(Sample::at(now, 72.0, vec![800.0]), now);
        assert_eq!(engine.stats().count, 1);

        let stats = log.stats();
        assert_eq!(stats.samples_dropped, 2);
        assert_eq!(stats.samples_accepted, 1);
    }

    #[test]
    fn test_emits_then_throttles() {
        let engine = engine();
        let now = fill(&engine, Utc::now(), 4);

        let result = engine.try_emit_at(now).unwrap().expect("should emit");
        assert_eq!(result.timestamp, now);
        assert_eq!(result.probabilities.len(), 3);
        assert_eq!(result.model.id, "emotion-linear-default");
        assert_eq!(result.probabilities[&result.emotion], result.confidence);

        assert!(engine.try_emit_at(now + Duration::seconds(4)).unwrap().is_none());
        assert!(engine.try_emit_at(now + Duration::seconds(5)).unwrap().is_some());
    }

    #[test]
    fn test_not_ready_with_one_sample() {
        let engine = engine().with_store(Box::new(WindowBuffer::new()));
        let now = Utc::now();
        engine.push_at(Sample::at(now, 72.0, vec![800.0; 20]), now);
        assert!(engine.try_emit_at(now).unwrap().is_none());
    }

    #[test]
    fn test_not_ready_when_rr_is_mostly_artifact() {
        let engine = engine();
        let now = Utc::now();
        engine.push_at(Sample::at(now, 72.0, vec![100.0, 800.0, 2500.0]), now);
        engine.push_at(Sample::at(now, 73.0, vec![150.0, 810.0]), now);

        // 5 raw intervals, only 2 survive cleaning
        assert_eq!(engine.stats().rr_count, 5);
        assert!(engine.try_emit_at(now).unwrap().is_none());
    }

    #[test]
    fn test_hr_baseline_is_subtracted() {
        let engine = EmotionEngine::with_default_model(config().with_hr_baseline(60.0)).unwrap();
        let now = Utc::now();
        engine.push_at(Sample::at(now, 70.0, vec![800.0, 810.0]), now);
        engine.push_at(Sample::at(now, 74.0, vec![805.0, 815.0]), now);

        let result = engine.try_emit_at(now).unwrap().unwrap();
        assert_eq!(result.features[HR_MEAN], 12.0);
    }

    #[test]
    fn test_clear_resets_throttle() {
        let engine = engine();
        let start = Utc::now();
        let now = fill(&engine, start, 4);
        assert!(engine.try_emit_at(now).unwrap().is_some());

        engine.clear();
        assert_eq!(engine.stats().count, 0);

        let now = fill(&engine, now, 4);
        // Well inside the emission period of the pre-clear result.
        assert!(engine.try_emit_at(now).unwrap().is_some());
    }

    #[test]
    fn test_min_rr_boundary() {
        let now = Utc::now();

        let short = engine();
        short.push_at(Sample::at(now, 72.0, vec![800.0, 810.0]), now);
        short.push_at(Sample::at(now, 73.0, vec![805.0]), now);
        assert!(short.try_emit_at(now).unwrap().is_none());

        let enough = engine();
        enough.push_at(Sample::at(now, 72.0, vec![800.0, 810.0]), now);
        enough.push_at(Sample::at(now, 73.0, vec![805.0, 815.0]), now);
        assert!(enough.try_emit_at(now).unwrap().is_some());
    }

    #[test]
    fn test_tied_probabilities_pick_first_label() {
        let params = ModelParams::new(
            ModelInfo::default(),
            vec!["B".to_string(), "A".to_string()],
            CORE_FEATURES.iter().map(|s| s.to_string()).collect(),
            vec![vec![0.0; 3]; 2],
            vec![0.0, 0.0],
            BTreeMap::new(),
            BTreeMap::new(),
        )
        .unwrap();
        let engine = EmotionEngine::new(config(), Arc::new(params)).unwrap();
        let now = fill(&engine, Utc::now(), 4);

        let result = engine.try_emit_at(now).unwrap().unwrap();
        assert_eq!(result.emotion, "B");
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_non_finite_model_is_refused() {
        let params = ModelParams::new(
            ModelInfo::default(),
            vec!["A".to_string(), "B".to_string()],
            CORE_FEATURES.iter().map(|s| s.to_string()).collect(),
            vec![vec![f64::INFINITY, 0.0, 0.0], vec![0.0; 3]],
            vec![0.0, 0.0],
            BTreeMap::new(),
            BTreeMap::new(),
        )
        .unwrap();

        assert!(matches!(
            EmotionEngine::new(config(), Arc::new(params)),
            Err(EmotionError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_incompatible_feature_names() {
        let params = ModelParams::new(
            ModelInfo::default(),
            vec!["A".to_string()],
            vec!["hr_mean".to_string(), "sdnn".to_string(), "pnn50".to_string()],
            vec![vec![1.0, 1.0, 1.0]],
            vec![0.0],
            BTreeMap::new(),
            BTreeMap::new(),
        )
        .unwrap();

        match EmotionEngine::new(config(), Arc::new(params)) {
            Err(EmotionError::ModelIncompatible {
                expected,
                actual,
                detail,
            }) => {
                assert_eq!((expected, actual), (3, 3));
                assert!(detail.contains("pnn50"));
            }
            _ => panic!("expected ModelIncompatible"),
        }
    }
}
