//! HRV feature extraction from windowed heart-rate data.
//!
//! Mean heart rate is taken over the raw HR samples, while SDNN and RMSSD
//! are computed on artifact-cleaned RR intervals: HRV statistics are
//! sensitive to single bad beats, an HR average is not.

use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// A named set of feature values.
pub type FeatureVector = BTreeMap<String, f64>;

/// Mean heart rate over the window (BPM).
pub const HR_MEAN: &str = "hr_mean";
/// Standard deviation of cleaned RR intervals (ms).
pub const SDNN: &str = "sdnn";
/// Root mean square of successive cleaned RR differences (ms).
pub const RMSSD: &str = "rmssd";

/// Features the extractor computes itself, in canonical order.
pub const CORE_FEATURES: [&str; 3] = [HR_MEAN, SDNN, RMSSD];

/// Shortest plausible RR interval (~200 BPM).
pub const RR_MIN_MS: f64 = 300.0;
/// Longest plausible RR interval (~30 BPM).
pub const RR_MAX_MS: f64 = 2000.0;
/// Largest jump from the previous retained beat before a beat is treated as ectopic.
pub const MAX_SUCCESSIVE_DIFF_MS: f64 = 250.0;

/// Remove implausible and ectopic RR intervals.
///
/// Values outside `[RR_MIN_MS, RR_MAX_MS]` are dropped first; the survivors
/// are then scanned in order and any value jumping more than
/// `MAX_SUCCESSIVE_DIFF_MS` from the last retained value is dropped.
pub fn clean_rr_intervals(rr_intervals: &[f64]) -> Vec<f64> {
    let mut cleaned: Vec<f64> = Vec::with_capacity(rr_intervals.len());

    for &rr in rr_intervals
        .iter()
        .filter(|&&rr| (RR_MIN_MS..=RR_MAX_MS).contains(&rr))
    {
        if let Some(&prev) = cleaned.last() {
            if (rr - prev).abs() > MAX_SUCCESSIVE_DIFF_MS {
                continue;
            }
        }
        cleaned.push(rr);
    }

    cleaned
}

/// Arithmetic mean of raw heart-rate samples, 0 when empty.
pub fn extract_hr_mean(hr_values: &[f64]) -> f64 {
    if hr_values.is_empty() {
        return 0.0;
    }
    hr_values.iter().mean()
}

/// Sample standard deviation (N-1) of cleaned RR intervals.
pub fn extract_sdnn(cleaned_rr: &[f64]) -> f64 {
    if cleaned_rr.len() < 2 {
        return 0.0;
    }
    cleaned_rr.iter().std_dev()
}

/// Root mean square of successive differences of cleaned RR intervals.
pub fn extract_rmssd(cleaned_rr: &[f64]) -> f64 {
    if cleaned_rr.len() < 2 {
        return 0.0;
    }

    let sum_sq: f64 = cleaned_rr
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).powi(2))
        .sum();
    (sum_sq / (cleaned_rr.len() - 1) as f64).sqrt()
}

/// Assemble the feature vector for one window.
///
/// Motion aggregates are merged in as-is; they are not computed here.
pub fn extract_features(
    hr_values: &[f64],
    rr_intervals: &[f64],
    motion: Option<&BTreeMap<String, f64>>,
) -> FeatureVector {
    let cleaned = clean_rr_intervals(rr_intervals);

    let mut features = FeatureVector::new();
    features.insert(HR_MEAN.to_string(), extract_hr_mean(hr_values));
    features.insert(SDNN.to_string(), extract_sdnn(&cleaned));
    features.insert(RMSSD.to_string(), extract_rmssd(&cleaned));

    if let Some(motion) = motion {
        features.extend(motion.iter().map(|(k, v)| (k.clone(), *v)));
    }

    features
}

/// Z-score features that have both a `mu` and a `sigma` entry.
///
/// A zero `sigma` normalizes to exactly 0. Features without statistics
/// pass through unchanged.
pub fn normalize_features(
    features: &FeatureVector,
    mu: &BTreeMap<String, f64>,
    sigma: &BTreeMap<String, f64>,
) -> FeatureVector {
    features
        .iter()
        .map(|(name, &value)| {
            let normalized = match (mu.get(name), sigma.get(name)) {
                (Some(_), Some(&s)) if s == 0.0 => 0.0,
                (Some(&m), Some(&s)) => (value - m) / s,
                _ => value,
            };
            (name.clone(), normalized)
        })
        .collect()
}

/// Describe the first problem that makes `features` unusable, if any.
pub fn find_invalid_feature(features: &FeatureVector, required: &[String]) -> Option<String> {
    required.iter().find_map(|name| match features.get(name) {
        None => Some(format!("missing required feature '{name}'")),
        Some(v) if !v.is_finite() => Some(format!("feature '{name}' is not finite ({v})")),
        Some(_) => None,
    })
}

/// Whether every required feature is present and finite.
pub fn validate_features(features: &FeatureVector, required: &[String]) -> bool {
    find_invalid_feature(features, required).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_clean_removes_out_of_range() {
        let cleaned = clean_rr_intervals(&[200.0, 800.0, 850.0, 2500.0, 820.0]);
        assert_eq!(cleaned, vec![800.0, 850.0, 820.0]);
    }

    #[test]
    fn test_clean_removes_ectopic_jump() {
        let cleaned = clean_rr_intervals(&[800.0, 850.0, 1200.0, 820.0]);
        assert_eq!(cleaned, vec![800.0, 850.0, 820.0]);
    }

    #[test]
    fn test_clean_compares_against_retained_value() {
        // 1100 is dropped, so 1120 is compared to 850 and dropped too.
        let cleaned = clean_rr_intervals(&[850.0, 1100.0, 1120.0, 900.0]);
        assert_eq!(cleaned, vec![850.0, 900.0]);
    }

    #[test]
    fn test_hr_mean() {
        assert_eq!(extract_hr_mean(&[70.0, 72.0, 75.0, 73.0]), 72.5);
        assert_eq!(extract_hr_mean(&[]), 0.0);
    }

    #[test]
    fn test_sdnn_uses_sample_std_dev() {
        // mean 800, squared deviations 400 + 0 + 400, / (3 - 1)
        let sdnn = extract_sdnn(&[780.0, 800.0, 820.0]);
        assert!((sdnn - 20.0).abs() < 1e-9);
        assert_eq!(extract_sdnn(&[800.0]), 0.0);
    }

    #[test]
    fn test_rmssd() {
        // diffs 20, -40 -> (400 + 1600) / 2 = 1000
        let rmssd = extract_rmssd(&[800.0, 820.0, 780.0]);
        assert!((rmssd - 1000f64.sqrt()).abs() < 1e-9);
        assert_eq!(extract_rmssd(&[]), 0.0);
    }

    #[test]
    fn test_extract_features_merges_motion() {
        let mut motion = BTreeMap::new();
        motion.insert("accel_x".to_string(), 0.4);

        let features = extract_features(&[70.0, 74.0], &[800.0, 820.0], Some(&motion));
        assert_eq!(features.len(), 4);
        assert_eq!(features[HR_MEAN], 72.0);
        assert_eq!(features["accel_x"], 0.4);
    }

    #[test]
    fn test_normalize_zero_sigma_and_passthrough() {
        let mut features = FeatureVector::new();
        features.insert("a".to_string(), 10.0);
        features.insert("b".to_string(), 5.0);
        features.insert("c".to_string(), 3.0);

        let mut mu = BTreeMap::new();
        mu.insert("a".to_string(), 6.0);
        mu.insert("b".to_string(), 5.0);
        let mut sigma = BTreeMap::new();
        sigma.insert("a".to_string(), 2.0);
        sigma.insert("b".to_string(), 0.0);

        let normalized = normalize_features(&features, &mu, &sigma);
        assert_eq!(normalized["a"], 2.0);
        assert_eq!(normalized["b"], 0.0);
        assert_eq!(normalized["c"], 3.0);
    }

    #[test]
    fn test_validate_features() {
        let required = names(&CORE_FEATURES);
        let mut features = extract_features(&[72.0], &[800.0, 810.0], None);
        assert!(validate_features(&features, &required));

        features.insert(SDNN.to_string(), f64::NAN);
        assert!(!validate_features(&features, &required));

        features.remove(SDNN);
        assert_eq!(
            find_invalid_feature(&features, &required),
            Some("missing required feature 'sdnn'".to_string())
        );
    }
}
