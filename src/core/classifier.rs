//! Linear discriminant classifier with softmax calibration.
//!
//! Model parameters are an externally supplied, validated bundle. The
//! built-in default model is a placeholder: its weights illustrate the
//! expected shape, they are not trained.

use crate::core::features::{
    find_invalid_feature, normalize_features, FeatureVector, HR_MEAN, RMSSD, SDNN,
};
use crate::error::{EmotionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

/// Descriptive metadata carried by a model bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier
    pub id: String,
    /// Model version
    pub version: String,
    /// Model family (e.g. "linear_svm")
    pub kind: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// When the model was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            id: "unnamed".to_string(),
            version: "0.0.0".to_string(),
            kind: "linear".to_string(),
            description: String::new(),
            created: None,
        }
    }
}

/// Serialized form of [`ModelParams`], validated on conversion.
#[derive(Debug, Deserialize)]
struct RawModelParams {
    #[serde(default)]
    info: ModelInfo,
    labels: Vec<String>,
    feature_names: Vec<String>,
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
    #[serde(default)]
    mu: BTreeMap<String, f64>,
    #[serde(default)]
    sigma: BTreeMap<String, f64>,
}

impl TryFrom<RawModelParams> for ModelParams {
    type Error = EmotionError;

    fn try_from(raw: RawModelParams) -> Result<Self> {
        ModelParams::new(
            raw.info,
            raw.labels,
            raw.feature_names,
            raw.weights,
            raw.biases,
            raw.mu,
            raw.sigma,
        )
    }
}

/// Immutable parameter set for a linear classifier.
///
/// Holds `C` labels, `F` ordered feature names, a `C x F` weight matrix,
/// `C` biases, and per-feature normalization statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawModelParams")]
pub struct ModelParams {
    info: ModelInfo,
    labels: Vec<String>,
    feature_names: Vec<String>,
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
    mu: BTreeMap<String, f64>,
    sigma: BTreeMap<String, f64>,
}

impl ModelParams {
    /// Build a parameter set, checking matrix dimensions.
    pub fn new(
        info: ModelInfo,
        labels: Vec<String>,
        feature_names: Vec<String>,
        weights: Vec<Vec<f64>>,
        biases: Vec<f64>,
        mu: BTreeMap<String, f64>,
        sigma: BTreeMap<String, f64>,
    ) -> Result<Self> {
        if labels.is_empty() {
            return Err(EmotionError::InvalidModel("no labels".to_string()));
        }
        if let Some(label) = first_duplicate(&labels) {
            return Err(EmotionError::InvalidModel(format!(
                "duplicate label '{label}'"
            )));
        }
        if let Some(name) = first_duplicate(&feature_names) {
            return Err(EmotionError::InvalidModel(format!(
                "duplicate feature name '{name}'"
            )));
        }
        if weights.len() != labels.len() {
            return Err(EmotionError::InvalidModel(format!(
                "{} weight rows for {} labels",
                weights.len(),
                labels.len()
            )));
        }
        if biases.len() != labels.len() {
            return Err(EmotionError::InvalidModel(format!(
                "{} biases for {} labels",
                biases.len(),
                labels.len()
            )));
        }
        if let Some((i, row)) = weights
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != feature_names.len())
        {
            return Err(EmotionError::InvalidModel(format!(
                "weight row {i} has {} columns, expected {}",
                row.len(),
                feature_names.len()
            )));
        }

        Ok(Self {
            info,
            labels,
            feature_names,
            weights,
            biases,
            mu,
            sigma,
        })
    }

    /// Parse and validate a JSON model bundle.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EmotionError::InvalidModel(e.to_string()))
    }

    /// Load a JSON model bundle from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EmotionError::InvalidModel(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// The built-in three-class placeholder model.
    pub fn default_model() -> Self {
        let stats = |hr: f64, sdnn: f64, rmssd: f64| -> BTreeMap<String, f64> {
            [(HR_MEAN, hr), (SDNN, sdnn), (RMSSD, rmssd)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect()
        };

        Self {
            info: ModelInfo {
                id: "emotion-linear-default".to_string(),
                version: "1.0".to_string(),
                kind: "linear".to_string(),
                description: "Placeholder weights over HR mean, SDNN and RMSSD; not trained"
                    .to_string(),
                created: None,
            },
            labels: vec![
                "Amused".to_string(),
                "Calm".to_string(),
                "Stressed".to_string(),
            ],
            feature_names: vec![HR_MEAN.to_string(), SDNN.to_string(), RMSSD.to_string()],
            weights: vec![
                vec![0.5, 0.4, 0.1],
                vec![-1.0, 0.8, 1.0],
                vec![1.2, -0.9, -1.1],
            ],
            biases: vec![0.0, 0.1, -0.2],
            mu: stats(72.0, 50.0, 35.0),
            sigma: stats(12.0, 20.0, 15.0),
        }
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    pub fn mu(&self) -> &BTreeMap<String, f64> {
        &self.mu
    }

    pub fn sigma(&self) -> &BTreeMap<String, f64> {
        &self.sigma
    }

    /// Serialize the bundle as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| EmotionError::InvalidModel(e.to_string()))
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self::default_model()
    }
}

/// Numerically stable softmax: margins are shifted by their maximum first.
pub fn softmax(margins: &[f64]) -> Vec<f64> {
    if margins.is_empty() {
        return Vec::new();
    }

    let max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = margins.iter().map(|m| (m - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn first_duplicate(names: &[String]) -> Option<&str> {
    let mut seen = BTreeSet::new();
    names
        .iter()
        .map(String::as_str)
        .find(|name| !seen.insert(*name))
}

/// Linear classifier over a shared, read-only parameter set.
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    params: Arc<ModelParams>,
}

impl LinearClassifier {
    pub fn new(params: Arc<ModelParams>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn labels(&self) -> &[String] {
        self.params.labels()
    }

    /// Map a feature vector to a probability per label.
    pub fn predict(&self, features: &FeatureVector) -> Result<BTreeMap<String, f64>> {
        let params = &self.params;

        if let Some(problem) = find_invalid_feature(features, &params.feature_names) {
            return Err(EmotionError::BadInput(problem));
        }

        let normalized = normalize_features(features, &params.mu, &params.sigma);

        let x = params
            .feature_names
            .iter()
            .map(|name| {
                normalized.get(name).copied().ok_or_else(|| {
                    EmotionError::BadInput(format!("missing normalized feature '{name}'"))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        let margins: Vec<f64> = params
            .weights
            .iter()
            .zip(&params.biases)
            .map(|(row, bias)| bias + row.iter().zip(&x).map(|(w, v)| w * v).sum::<f64>())
            .collect();

        // Finite features can still overflow a margin with large weights.
        if let Some(i) = margins.iter().position(|m| !m.is_finite()) {
            return Err(EmotionError::BadInput(format!(
                "margin for label '{}' is not finite",
                params.labels[i]
            )));
        }

        Ok(params
            .labels
            .iter()
            .cloned()
            .zip(softmax(&margins))
            .collect())
    }

    /// Most probable label, ties going to the earliest in model order.
    pub fn top_label<'a>(
        &'a self,
        probabilities: &BTreeMap<String, f64>,
    ) -> Option<(&'a str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for label in &self.params.labels {
            let Some(&p) = probabilities.get(label) else {
                continue;
            };
            if best.map_or(true, |(_, top)| p > top) {
                best = Some((label.as_str(), p));
            }
        }
        best
    }

    /// Re-check dimensions and numeric well-formedness of the parameters.
    pub fn validate(&self) -> bool {
        let p = &self.params;
        let classes = p.labels.len();
        let feature_count = p.feature_names.len();

        p.weights.len() == classes
            && p.biases.len() == classes
            && p.weights.iter().all(|row| row.len() == feature_count)
            && p.weights.iter().flatten().all(|w| w.is_finite())
            && p.biases.iter().all(|b| b.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(hr: f64, sdnn: f64, rmssd: f64) -> FeatureVector {
        [(HR_MEAN, hr), (SDNN, sdnn), (RMSSD, rmssd)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn default_classifier() -> LinearClassifier {
        LinearClassifier::new(Arc::new(ModelParams::default_model()))
    }

    #[test]
    fn test_default_model_predicts_all_labels() {
        let probs = default_classifier()
            .predict(&features(72.0, 45.0, 32.0))
            .unwrap();

        let keys: Vec<&str> = probs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Amused", "Calm", "Stressed"]);
        for p in probs.values() {
            assert!(p.is_finite() && (0.0..=1.0).contains(p));
        }
        assert!((probs.values().sum::<f64>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_high_hr_low_hrv_reads_as_stressed() {
        let probs = default_classifier()
            .predict(&features(110.0, 15.0, 10.0))
            .unwrap();
        assert!(probs["Stressed"] > probs["Calm"]);
        assert!(probs["Stressed"] > probs["Amused"]);
    }

    #[test]
    fn test_softmax_is_stable_for_large_margins() {
        let probs = softmax(&[1000.0, 1001.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(probs[1] > probs[0] && probs[0] > probs[2]);

        let shifted = softmax(&[0.0, 1.0, -1.0]);
        for (a, b) in probs.iter().zip(&shifted) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_predict_rejects_missing_and_nan() {
        let classifier = default_classifier();

        let mut missing = features(72.0, 45.0, 32.0);
        missing.remove(RMSSD);
        match classifier.predict(&missing) {
            Err(EmotionError::BadInput(msg)) => assert!(msg.contains("rmssd")),
            other => panic!("expected BadInput, got {other:?}"),
        }

        let nan = features(72.0, f64::NAN, 32.0);
        assert!(matches!(
            classifier.predict(&nan),
            Err(EmotionError::BadInput(_))
        ));
    }

    #[test]
    fn test_construction_checks_dimensions() {
        let info = ModelInfo::default();
        let labels = vec!["A".to_string(), "B".to_string()];
        let names = vec!["x".to_string()];

        let bad_rows = ModelParams::new(
            info.clone(),
            labels.clone(),
            names.clone(),
            vec![vec![1.0]],
            vec![0.0, 0.0],
            BTreeMap::new(),
            BTreeMap::new(),
        );
        assert!(matches!(bad_rows, Err(EmotionError::InvalidModel(_))));

        let bad_cols = ModelParams::new(
            info,
            labels,
            names,
            vec![vec![1.0], vec![1.0, 2.0]],
            vec![0.0, 0.0],
            BTreeMap::new(),
            BTreeMap::new(),
        );
        assert!(matches!(bad_cols, Err(EmotionError::InvalidModel(_))));
    }

    fn params_for(
        labels: &[&str],
        names: &[&str],
        weights: Vec<Vec<f64>>,
    ) -> Result<ModelParams> {
        ModelParams::new(
            ModelInfo::default(),
            labels.iter().map(|s| s.to_string()).collect(),
            names.iter().map(|s| s.to_string()).collect(),
            weights,
            vec![0.0; labels.len()],
            BTreeMap::new(),
            BTreeMap::new(),
        )
    }

    #[test]
    fn test_construction_rejects_duplicate_labels() {
        let result = params_for(&["A", "A", "B"], &["x", "y"], vec![vec![0.0; 2]; 3]);
        match result {
            Err(EmotionError::InvalidModel(msg)) => assert!(msg.contains("'A'")),
            other => panic!("expected InvalidModel, got {other:?}"),
        }
    }

    #[test]
    fn test_construction_rejects_duplicate_feature_names() {
        let result = params_for(&["A", "B"], &["x", "x"], vec![vec![0.0; 2]; 2]);
        match result {
            Err(EmotionError::InvalidModel(msg)) => assert!(msg.contains("'x'")),
            other => panic!("expected InvalidModel, got {other:?}"),
        }
    }

    #[test]
    fn test_json_with_duplicate_labels_is_rejected() {
        let mut value = serde_json::to_value(ModelParams::default_model()).unwrap();
        value["labels"] = serde_json::json!(["Calm", "Calm", "Stressed"]);

        assert!(matches!(
            ModelParams::from_json(&value.to_string()),
            Err(EmotionError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_predict_rejects_overflowing_margin() {
        let params =
            params_for(&["A", "B"], &["x", "y"], vec![vec![10.0, 10.0], vec![0.0, 0.0]])
                .unwrap();
        let classifier = LinearClassifier::new(Arc::new(params));
        let features: FeatureVector =
            BTreeMap::from([("x".to_string(), 1e308), ("y".to_string(), 1e308)]);

        assert!(matches!(
            classifier.predict(&features),
            Err(EmotionError::BadInput(_))
        ));
    }

    #[test]
    fn test_top_label_prefers_model_order_on_ties() {
        let params = params_for(&["B", "A"], &["x", "y"], vec![vec![0.0; 2]; 2]).unwrap();
        let classifier = LinearClassifier::new(Arc::new(params));
        let features: FeatureVector =
            BTreeMap::from([("x".to_string(), 1.0), ("y".to_string(), 2.0)]);

        let probs = classifier.predict(&features).unwrap();
        assert_eq!(classifier.top_label(&probs), Some(("B", 0.5)));
    }

    #[test]
    fn test_validate_flags_non_finite_weights() {
        let params = ModelParams::new(
            ModelInfo::default(),
            vec!["A".to_string()],
            vec!["x".to_string()],
            vec![vec![f64::INFINITY]],
            vec![0.0],
            BTreeMap::new(),
            BTreeMap::new(),
        )
        .unwrap();

        assert!(!LinearClassifier::new(Arc::new(params)).validate());
        assert!(default_classifier().validate());
    }

    #[test]
    fn test_json_roundtrip_revalidates() {
        let json = ModelParams::default_model().to_json().unwrap();
        let parsed = ModelParams::from_json(&json).unwrap();
        let original = ModelParams::default_model();
        assert_eq!(parsed.info(), original.info());
        assert_eq!(parsed.labels(), original.labels());
        assert_eq!(parsed.feature_names(), original.feature_names());

        let broken = r#"{"labels":["A"],"feature_names":["x"],"weights":[[1.0,2.0]],"biases":[0.0]}"#;
        assert!(matches!(
            ModelParams::from_json(broken),
            Err(EmotionError::InvalidModel(_))
        ));
    }
}
