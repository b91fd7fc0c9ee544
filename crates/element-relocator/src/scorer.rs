//! Similarity scoring between a fingerprint and a candidate node

use std::collections::BTreeSet;

use dom_snapshot::{Attribute, NodeRef, PathStep};
use serde::{Deserialize, Serialize};

use crate::distance::{char_distance, path_distance};
use crate::fingerprint::{Fingerprint, FingerprintExtractor, TextSignature};
use crate::policy::{FeatureWeights, RelocationPolicy};

/// Per-feature similarities in [0, 1] and their weighted total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub attributes: f64,
    pub text: f64,
    pub path: f64,
    pub sibling: f64,
    pub total: f64,
}

#[derive(Clone, Debug, Default)]
pub struct SimilarityScorer {
    extractor: FingerprintExtractor,
}

impl SimilarityScorer {
    pub fn new(extractor: FingerprintExtractor) -> Self {
        Self { extractor }
    }

    /// Score `candidate` against `fingerprint`.
    ///
    /// Returns `None` for a candidate of another tag: tag equality is a
    /// generation filter, not a scored feature.
    pub fn score(
        &self,
        fingerprint: &Fingerprint,
        candidate: NodeRef<'_>,
        policy: &RelocationPolicy,
    ) -> Option<ScoreBreakdown> {
        if candidate.tag() != fingerprint.tag() {
            return None;
        }
        let observed = self.extractor.extract(candidate);
        Some(compare(fingerprint, &observed, policy.weights()))
    }
}

/// Compare two fingerprints of the same tag.
pub fn compare(
    expected: &Fingerprint,
    observed: &Fingerprint,
    weights: &FeatureWeights,
) -> ScoreBreakdown {
    let attributes = attribute_overlap(expected.attributes(), observed.attributes());
    let text = text_similarity(expected.text(), observed.text());
    let path = path_similarity(expected.path(), observed.path());
    let sibling = sibling_proximity(
        (expected.sibling_index(), expected.sibling_count()),
        (observed.sibling_index(), observed.sibling_count()),
    );

    // accumulate the weighted shortfall so a perfect match is exactly 1.0
    let shortfall = weights.attributes * (1.0 - attributes)
        + weights.text * (1.0 - text)
        + weights.path * (1.0 - path)
        + weights.sibling * (1.0 - sibling);

    ScoreBreakdown {
        attributes,
        text,
        path,
        sibling,
        total: (1.0 - shortfall).clamp(0.0, 1.0),
    }
}

/// Shared name/value pairs over the union of attribute names.
pub fn attribute_overlap(a: &[Attribute], b: &[Attribute]) -> f64 {
    let names: BTreeSet<&str> = a
        .iter()
        .chain(b.iter())
        .map(|attr| attr.name.as_str())
        .collect();
    if names.is_empty() {
        return 1.0;
    }
    let shared = a.iter().filter(|attr| b.contains(attr)).count();
    shared as f64 / names.len() as f64
}

pub fn text_similarity(a: &TextSignature, b: &TextSignature) -> f64 {
    if a.hash == b.hash {
        return 1.0;
    }
    // prefixes are compared exactly; text beyond them only contributes its
    // length difference. Differing hashes always cost at least one edit, so
    // only equal texts reach 1.0.
    let longest = a.char_len.max(b.char_len).max(1);
    let tail = a.tail_len().abs_diff(b.tail_len());
    let distance = (char_distance(&a.prefix, &b.prefix) + tail).max(1);
    (1.0 - distance as f64 / longest as f64).clamp(0.0, 1.0)
}

pub fn path_similarity(a: &[PathStep], b: &[PathStep]) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    (1.0 - path_distance(a, b) / longest as f64).clamp(0.0, 1.0)
}

/// `(sibling_index, sibling_count)` pairs; the larger count is the
/// denominator.
pub fn sibling_proximity(a: (usize, usize), b: (usize, usize)) -> f64 {
    let span = a.1.max(b.1).max(1);
    (1.0 - a.0.abs_diff(b.0) as f64 / span as f64).clamp(0.0, 1.0)
}
