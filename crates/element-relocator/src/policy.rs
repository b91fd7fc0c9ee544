//! Relocation policy: feature weights, thresholds and scan limits

use serde::{Deserialize, Serialize};

use crate::errors::RelocationError;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Per-feature weights of the similarity score. Must sum to 1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureWeights {
    pub attributes: f64,
    pub text: f64,
    pub path: f64,
    pub sibling: f64,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            attributes: 0.35,
            text: 0.30,
            path: 0.20,
            sibling: 0.15,
        }
    }
}

impl FeatureWeights {
    pub fn sum(&self) -> f64 {
        self.attributes + self.text + self.path + self.sibling
    }

    fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("attributes", self.attributes),
            ("text", self.text),
            ("path", self.path),
            ("sibling", self.sibling),
        ]
    }
}

/// Validated relocation policy.
///
/// Only obtainable through [`RelocationPolicy::new`], [`PolicySpec::build`]
/// or deserialization, all of which validate, so scoring never sees an
/// invalid policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PolicySpec", into = "PolicySpec")]
pub struct RelocationPolicy {
    weights: FeatureWeights,
    high_confidence_threshold: f64,
    min_threshold: f64,
    ambiguity_epsilon: f64,
    candidate_scan_cap: usize,
}

impl RelocationPolicy {
    pub fn new(
        weights: FeatureWeights,
        high_confidence_threshold: f64,
        min_threshold: f64,
        ambiguity_epsilon: f64,
        candidate_scan_cap: usize,
    ) -> Result<Self, RelocationError> {
        PolicySpec {
            weights,
            high_confidence_threshold,
            min_threshold,
            ambiguity_epsilon,
            candidate_scan_cap,
        }
        .build()
    }

    /// Start from the defaults and override selectively.
    pub fn builder() -> PolicySpec {
        PolicySpec::default()
    }

    pub fn weights(&self) -> &FeatureWeights {
        &self.weights
    }

    pub fn high_confidence_threshold(&self) -> f64 {
        self.high_confidence_threshold
    }

    pub fn min_threshold(&self) -> f64 {
        self.min_threshold
    }

    pub fn ambiguity_epsilon(&self) -> f64 {
        self.ambiguity_epsilon
    }

    pub fn candidate_scan_cap(&self) -> usize {
        self.candidate_scan_cap
    }
}

impl Default for RelocationPolicy {
    fn default() -> Self {
        let spec = PolicySpec::default();
        Self {
            weights: spec.weights,
            high_confidence_threshold: spec.high_confidence_threshold,
            min_threshold: spec.min_threshold,
            ambiguity_epsilon: spec.ambiguity_epsilon,
            candidate_scan_cap: spec.candidate_scan_cap,
        }
    }
}

/// Unvalidated policy fields, used as builder and as the serde form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySpec {
    pub weights: FeatureWeights,
    pub high_confidence_threshold: f64,
    pub min_threshold: f64,
    pub ambiguity_epsilon: f64,
    pub candidate_scan_cap: usize,
}

impl Default for PolicySpec {
    fn default() -> Self {
        Self {
            weights: FeatureWeights::default(),
            high_confidence_threshold: 0.90,
            min_threshold: 0.45,
            ambiguity_epsilon: 0.02,
            candidate_scan_cap: 256,
        }
    }
}

impl PolicySpec {
    pub fn with_weights(mut self, weights: FeatureWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_high_confidence_threshold(mut self, threshold: f64) -> Self {
        self.high_confidence_threshold = threshold;
        self
    }

    pub fn with_min_threshold(mut self, threshold: f64) -> Self {
        self.min_threshold = threshold;
        self
    }

    pub fn with_ambiguity_epsilon(mut self, epsilon: f64) -> Self {
        self.ambiguity_epsilon = epsilon;
        self
    }

    pub fn with_candidate_scan_cap(mut self, cap: usize) -> Self {
        self.candidate_scan_cap = cap;
        self
    }

    pub fn validate(&self) -> Result<(), RelocationError> {
        for (name, weight) in self.weights.named() {
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(RelocationError::config(format!(
                    "weight '{name}' must be within [0, 1], got {weight}"
                )));
            }
        }
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RelocationError::config(format!(
                "feature weights must sum to 1, got {sum}"
            )));
        }

        for (name, threshold) in [
            ("high_confidence_threshold", self.high_confidence_threshold),
            ("min_threshold", self.min_threshold),
        ] {
            if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
                return Err(RelocationError::config(format!(
                    "{name} must be within (0, 1], got {threshold}"
                )));
            }
        }
        if self.min_threshold > self.high_confidence_threshold {
            return Err(RelocationError::config(format!(
                "min_threshold {} exceeds high_confidence_threshold {}",
                self.min_threshold, self.high_confidence_threshold
            )));
        }

        if !self.ambiguity_epsilon.is_finite() || !(0.0..1.0).contains(&self.ambiguity_epsilon) {
            return Err(RelocationError::config(format!(
                "ambiguity_epsilon must be within [0, 1), got {}",
                self.ambiguity_epsilon
            )));
        }

        if self.candidate_scan_cap == 0 {
            return Err(RelocationError::config("candidate_scan_cap must be > 0"));
        }
        Ok(())
    }

    pub fn build(self) -> Result<RelocationPolicy, RelocationError> {
        self.validate()?;
        Ok(RelocationPolicy {
            weights: self.weights,
            high_confidence_threshold: self.high_confidence_threshold,
            min_threshold: self.min_threshold,
            ambiguity_epsilon: self.ambiguity_epsilon,
            candidate_scan_cap: self.candidate_scan_cap,
        })
    }
}

impl TryFrom<PolicySpec> for RelocationPolicy {
    type Error = RelocationError;

    fn try_from(spec: PolicySpec) -> Result<Self, Self::Error> {
        spec.build()
    }
}

impl From<RelocationPolicy> for PolicySpec {
    fn from(policy: RelocationPolicy) -> Self {
        Self {
            weights: policy.weights,
            high_confidence_threshold: policy.high_confidence_threshold,
            min_threshold: policy.min_threshold,
            ambiguity_epsilon: policy.ambiguity_epsilon,
            candidate_scan_cap: policy.candidate_scan_cap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let spec = PolicySpec::default();
        assert!(spec.validate().is_ok());
        assert_eq!(spec.build().unwrap(), RelocationPolicy::default());
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let weights = FeatureWeights {
            attributes: 0.5,
            text: 0.5,
            path: 0.5,
            sibling: 0.0,
        };
        let err = RelocationPolicy::new(weights, 0.9, 0.4, 0.02, 10).unwrap_err();
        assert!(matches!(err, RelocationError::Configuration(_)));
    }

    #[test]
    fn rejects_negative_or_nan_weight() {
        let weights = FeatureWeights {
            attributes: 1.2,
            text: -0.2,
            path: 0.0,
            sibling: 0.0,
        };
        assert!(RelocationPolicy::builder().with_weights(weights).build().is_err());

        let weights = FeatureWeights {
            attributes: f64::NAN,
            ..FeatureWeights::default()
        };
        assert!(RelocationPolicy::builder().with_weights(weights).build().is_err());
    }

    #[test]
    fn rejects_non_positive_thresholds() {
        assert!(RelocationPolicy::builder()
            .with_min_threshold(0.0)
            .build()
            .is_err());
        assert!(RelocationPolicy::builder()
            .with_high_confidence_threshold(-0.5)
            .build()
            .is_err());
        assert!(RelocationPolicy::builder()
            .with_min_threshold(0.95)
            .with_high_confidence_threshold(0.9)
            .build()
            .is_err());
    }

    #[test]
    fn rejects_bad_epsilon_and_cap() {
        assert!(RelocationPolicy::builder()
            .with_ambiguity_epsilon(1.0)
            .build()
            .is_err());
        assert!(RelocationPolicy::builder()
            .with_candidate_scan_cap(0)
            .build()
            .is_err());
        // zero epsilon is allowed; exact ties then fall to the tie-break
        assert!(RelocationPolicy::builder()
            .with_ambiguity_epsilon(0.0)
            .build()
            .is_ok());
    }

    #[test]
    fn deserialization_validates() {
        let ok: RelocationPolicy = serde_yaml::from_str(
            "min_threshold: 0.5\n\
             weights:\n  attributes: 0.25\n  text: 0.25\n  path: 0.25\n  sibling: 0.25\n",
        )
        .unwrap();
        assert_eq!(ok.min_threshold(), 0.5);
        assert_eq!(ok.weights().path, 0.25);
        assert_eq!(ok.candidate_scan_cap(), 256);

        let bad = serde_yaml::from_str::<RelocationPolicy>("weights:\n  attributes: 0.9\n");
        assert!(bad.is_err());
    }
}
