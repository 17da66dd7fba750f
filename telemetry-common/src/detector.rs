use crate::config::Config;
use crate::features::PlayerFeatures;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Which detector rule produced a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectorType {
    ZscoreAccuracy,
    ThresholdHeadshot,
}

/// A detector finding, prior to the store adapter assigning an id, owner,
/// and TTL. `score`/`threshold` stay as `f64` here; the
/// store adapter performs the exact-decimal conversion at its boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionDraft {
    pub detector_type: DetectorType,
    pub score: f64,
    pub threshold: f64,
    pub features: Value,
    pub explanation: String,
}

/// Runs both detector rules for one player's updated feature vector.
/// Returns no findings at all when the sample-count floor isn't met
/// — Rule 2 is deliberately gated by the same guard as Rule 1.
pub fn detect(features: &PlayerFeatures, cfg: &Config) -> Vec<DetectionDraft> {
    let mut out = Vec::new();
    if features.accuracy_sample_count < cfg.min_samples_for_detection {
        return out;
    }

    if features.accuracy_std_dev > 0.01 {
        let z = (features.accuracy - features.accuracy_mean) / features.accuracy_std_dev;
        if z.abs() > cfg.zscore_threshold {
            out.push(DetectionDraft {
                    detector_type: DetectorType::ZscoreAccuracy,
                    score: z.abs(),
                    threshold: cfg.zscore_threshold,
                    features: json!({
                            "accuracy": features.accuracy,
                            "mean": features.accuracy_mean,
                            "stdDev": features.accuracy_std_dev,
                            "zScore": z,
                    }),
                    explanation: format!(
                        "Accuracy z-score {z:.2} exceeds threshold {}",
                        cfg.zscore_threshold
                    ),
            });
        }
    }

    if features.headshot_ratio > 0.5 {
        out.push(DetectionDraft {
                detector_type: DetectorType::ThresholdHeadshot,
                score: features.headshot_ratio * 100.0,
                threshold: 50.0,
                features: json!({
                        "headshotRatio": features.headshot_ratio,
                        "totalHeadshots": features.total_headshots,
                        "totalHits": features.total_hits,
                }),
                explanation: format!(
                    "Headshot ratio {:.1}% exceeds 50% threshold",
                    features.headshot_ratio * 100.0
                ),
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn features_with(sample_count: u64, accuracy: f64, mean: f64, std_dev: f64, hs_ratio: f64) -> PlayerFeatures {
        PlayerFeatures {
            accuracy,
            accuracy_mean: mean,
            accuracy_std_dev: std_dev,
            accuracy_sample_count: sample_count,
            headshot_ratio: hs_ratio,
            total_hits: 100,
            total_headshots: (hs_ratio * 100.0) as u64,
            ..Default::default()
        }
    }

    #[test]
    fn no_detection_below_sample_floor() {
        let cfg = Config::default();
        let f = features_with(50, 0.9, 0.5, 0.1, 0.0);
        assert!(detect(&f, &cfg).is_empty());
    }

    #[test]
    fn s5_zscore_detection_fires() {
        let cfg = Config::default();
        let f = features_with(150, 0.9, 0.5, 0.1, 0.0);
        let out = detect(&f, &cfg);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].detector_type, DetectorType::ZscoreAccuracy);
        assert!((out[0].score - 4.0).abs() < 1e-9);
        assert!((out[0].features["zScore"].as_f64().unwrap() - 4.0).abs() < 1e-9);
    }

    #[rstest]
    #[case(0.0, false)]
    #[case(0.5, false)]
    #[case(0.5000001, true)]
    #[case(0.51, true)]
    #[case(0.9, true)]
    fn headshot_rule_fires_strictly_above_fifty_percent(#[case] hs_ratio: f64, #[case] should_fire: bool) {
        let cfg = Config::default();
        let f = features_with(150, 0.5, 0.5, 0.1, hs_ratio);
        let fired = detect(&f, &cfg)
        .iter()
        .any(|d| d.detector_type == DetectorType::ThresholdHeadshot);
        assert_eq!(fired, should_fire);
    }

    #[test]
    fn both_rules_can_fire_together() {
        let cfg = Config::default();
        let f = features_with(150, 0.9, 0.5, 0.1, 0.9);
        let out = detect(&f, &cfg);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn near_zero_stddev_suppresses_zscore_rule() {
        let cfg = Config::default();
        let f = features_with(150, 0.9, 0.5, 0.005, 0.0);
        assert!(detect(&f, &cfg).is_empty());
    }
}
