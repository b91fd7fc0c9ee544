//! Candidate generation
//!
//! Two phases:
//! 1. Fast path - re-run the fingerprint's own selector; a single hit is
//!    emitted alone
//! 2. Fallback scan - every node with the fingerprint's tag, ordered by
//!    structural path distance (document order breaks ties) and truncated to
//!    the policy's scan cap, so the least plausible candidates go first

use std::sync::Arc;

use dom_snapshot::{DocumentTree, SelectorEvaluator};
use tracing::{debug, warn};

use crate::distance::path_distance;
use crate::fingerprint::{Fingerprint, FingerprintExtractor};
use crate::policy::RelocationPolicy;
use crate::types::{Candidate, CandidateSet};

/// Source of relocation candidates
pub trait CandidateSource: Send + Sync {
    /// Phase 1. `Some` only when the stored selector yields exactly one node
    /// of the fingerprint's tag.
    fn fast_path(&self, tree: &DocumentTree, fingerprint: &Fingerprint) -> Option<Candidate>;

    /// Phase 2, ordered and capped.
    fn scan(
        &self,
        tree: &DocumentTree,
        fingerprint: &Fingerprint,
        policy: &RelocationPolicy,
    ) -> Vec<Candidate>;

    /// Both phases: the fast-path hit alone, or the scan.
    fn generate(
        &self,
        tree: &DocumentTree,
        fingerprint: &Fingerprint,
        policy: &RelocationPolicy,
    ) -> CandidateSet {
        match self.fast_path(tree, fingerprint) {
            Some(candidate) => CandidateSet {
                fast_path: true,
                candidates: vec![candidate],
            },
            None => CandidateSet {
                fast_path: false,
                candidates: self.scan(tree, fingerprint, policy),
            },
        }
    }
}

pub struct DefaultCandidateGenerator {
    evaluator: Arc<dyn SelectorEvaluator>,
    extractor: FingerprintExtractor,
}

impl DefaultCandidateGenerator {
    pub fn new(evaluator: Arc<dyn SelectorEvaluator>, extractor: FingerprintExtractor) -> Self {
        Self {
            evaluator,
            extractor,
        }
    }

    pub fn extractor(&self) -> &FingerprintExtractor {
        &self.extractor
    }
}

impl CandidateSource for DefaultCandidateGenerator {
    fn fast_path(&self, tree: &DocumentTree, fingerprint: &Fingerprint) -> Option<Candidate> {
        let selector = fingerprint.selector()?;

        let hits = match self.evaluator.evaluate(tree, selector) {
            Ok(hits) => hits,
            Err(err) => {
                warn!(selector = %selector, "fast path selector failed: {}", err);
                return None;
            }
        };
        if hits.len() != 1 {
            debug!(selector = %selector, hits = hits.len(), "fast path needs exactly one hit");
            return None;
        }

        let node = tree.get(hits[0])?;
        if node.tag() != fingerprint.tag() {
            debug!(
                selector = %selector,
                expected = fingerprint.tag(),
                found = node.tag(),
                "fast path hit has a different tag"
            );
            return None;
        }

        // a lone hit is never ordered against anything, so no distance
        Some(Candidate {
            node: node.id(),
            path_distance: 0.0,
            fast_path: true,
        })
    }

    fn scan(
        &self,
        tree: &DocumentTree,
        fingerprint: &Fingerprint,
        policy: &RelocationPolicy,
    ) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = tree
            .nodes_with_tag(fingerprint.tag())
            .map(|node| {
                let (path, _) = self.extractor.structural_path(node);
                Candidate {
                    node: node.id(),
                    path_distance: path_distance(fingerprint.path(), &path),
                    fast_path: false,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.path_distance
                .total_cmp(&b.path_distance)
                .then(a.node.cmp(&b.node))
        });

        let found = candidates.len();
        candidates.truncate(policy.candidate_scan_cap());
        debug!(
            tag = fingerprint.tag(),
            found,
            kept = candidates.len(),
            "fallback scan collected candidates"
        );
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_snapshot::{ElementSpec, NodeId, Selector, StructuralEvaluator};

    fn generator() -> DefaultCandidateGenerator {
        DefaultCandidateGenerator::new(
            Arc::new(StructuralEvaluator),
            FingerprintExtractor::default(),
        )
    }

    // body > [div*3, section > [div, div#target]]
    fn tree() -> DocumentTree {
        DocumentTree::from_root(
            ElementSpec::new("body")
                .child(ElementSpec::new("div").text("a"))
                .child(ElementSpec::new("div").text("b"))
                .child(ElementSpec::new("div").text("c"))
                .child(
                    ElementSpec::new("section")
                        .child(ElementSpec::new("div").text("d"))
                        .child(ElementSpec::new("div").attr("id", "target").text("e")),
                ),
        )
    }

    #[test]
    fn scan_orders_by_path_distance_then_document_order() {
        let tree = tree();
        let generator = generator();
        let target = tree.get(NodeId(6)).unwrap();
        let fp = generator.extractor().extract(target);

        let candidates = generator.scan(&tree, &fp, &RelocationPolicy::default());
        let order: Vec<_> = candidates.iter().map(|c| c.node).collect();
        // target first, its section sibling next, then the body-level divs
        // with the one sharing the target's sibling index ahead
        assert_eq!(
            order,
            vec![NodeId(6), NodeId(5), NodeId(2), NodeId(1), NodeId(3)]
        );
        assert_eq!(candidates[0].path_distance, 0.0);
        assert!(candidates.iter().all(|c| !c.fast_path));
    }

    #[test]
    fn scan_cap_drops_least_plausible() {
        let tree = tree();
        let generator = generator();
        let fp = generator.extractor().extract(tree.get(NodeId(6)).unwrap());
        let policy = RelocationPolicy::builder()
            .with_candidate_scan_cap(2)
            .build()
            .unwrap();
        let order: Vec<_> = generator
            .scan(&tree, &fp, &policy)
            .iter()
            .map(|c| c.node)
            .collect();
        assert_eq!(order, vec![NodeId(6), NodeId(5)]);
    }

    #[test]
    fn fast_path_requires_single_hit() {
        let tree = tree();
        let generator = generator();
        let node = tree.get(NodeId(6)).unwrap();

        let unique = generator
            .extractor()
            .extract_with_selector(node, Selector::attribute(Some("div"), "id", "target"));
        let hit = generator.fast_path(&tree, &unique).unwrap();
        assert_eq!(hit.node, NodeId(6));
        assert!(hit.fast_path);

        let broad = generator
            .extractor()
            .extract_with_selector(node, Selector::tag("div"));
        assert!(generator.fast_path(&tree, &broad).is_none());

        let generated = generator.generate(&tree, &broad, &RelocationPolicy::default());
        assert!(!generated.fast_path);
        assert_eq!(generated.candidates.len(), 5);
    }

    #[test]
    fn fast_path_hit_carries_no_path_distance() {
        let generator = generator();
        let original = tree();
        let fp = generator.extractor().extract_with_selector(
            original.get(NodeId(6)).unwrap(),
            Selector::attribute(Some("div"), "id", "target"),
        );

        // the target moves one slot down inside its section
        let moved = DocumentTree::from_root(
            ElementSpec::new("body")
                .child(ElementSpec::new("div").text("a"))
                .child(
                    ElementSpec::new("section")
                        .child(ElementSpec::new("div").text("d"))
                        .child(ElementSpec::new("div").text("new"))
                        .child(ElementSpec::new("div").attr("id", "target").text("e")),
                ),
        );
        let hit = generator.fast_path(&moved, &fp).unwrap();
        assert_eq!(hit.node, NodeId(5));
        assert_eq!(hit.path_distance, 0.0);
        assert!(hit.fast_path);
    }

    #[test]
    fn fast_path_skips_unsupported_and_mismatched_tags() {
        let tree = tree();
        let generator = generator();
        let node = tree.get(NodeId(6)).unwrap();

        let css = generator
            .extractor()
            .extract_with_selector(node, Selector::css("#target"));
        assert!(generator.fast_path(&tree, &css).is_none());

        let wrong_tag = generator
            .extractor()
            .extract_with_selector(node, Selector::tag("section"));
        assert!(generator.fast_path(&tree, &wrong_tag).is_none());

        let unanchored = generator.extractor().extract(node);
        assert!(generator.fast_path(&tree, &unanchored).is_none());
    }
}
