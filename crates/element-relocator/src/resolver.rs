//! Relocation resolver: fast path, fallback scan, thresholds and tie-breaks

use std::cmp::Ordering;

use dom_snapshot::DocumentTree;
use tracing::{debug, info, warn};

use crate::candidates::{CandidateSource, DefaultCandidateGenerator};
use crate::fingerprint::Fingerprint;
use crate::policy::RelocationPolicy;
use crate::scorer::SimilarityScorer;
use crate::types::{Candidate, MatchResult, ResolutionStage, ResolvedMatch, ScoredCandidate};

/// Drives candidate generation and scoring to a verdict.
///
/// Pure and synchronous: no I/O, no interior mutability, trees are only
/// read. One resolver can serve any number of threads.
pub struct RelocationResolver<S = DefaultCandidateGenerator> {
    source: S,
    scorer: SimilarityScorer,
}

impl<S: CandidateSource> RelocationResolver<S> {
    pub fn new(source: S, scorer: SimilarityScorer) -> Self {
        Self { source, scorer }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Locate the node in `tree` that best matches `fingerprint`.
    pub fn locate(
        &self,
        tree: &DocumentTree,
        fingerprint: &Fingerprint,
        policy: &RelocationPolicy,
    ) -> MatchResult {
        let mut stage = ResolutionStage::Initial;

        advance(&mut stage, ResolutionStage::FastPathCheck);
        if let Some(found) = self.check_fast_path(tree, fingerprint, policy) {
            advance(&mut stage, ResolutionStage::Resolved);
            info!(
                node = %found.node,
                confidence = found.confidence,
                "relocated via fast path"
            );
            return MatchResult::Resolved(found);
        }

        advance(&mut stage, ResolutionStage::CandidateScan);
        let candidates = self.source.scan(tree, fingerprint, policy);
        let scanned = candidates.len();
        let ranked = self.rank(tree, fingerprint, policy, &candidates);

        let verdict = decide(ranked, fingerprint, policy, scanned);
        advance(&mut stage, verdict.stage());
        match &verdict {
            MatchResult::Resolved(found) => info!(
                node = %found.node,
                confidence = found.confidence,
                scanned,
                "relocated via candidate scan"
            ),
            MatchResult::NotFound { best_score, .. } => warn!(
                tag = fingerprint.tag(),
                best_score,
                scanned,
                "no candidate cleared the acceptance threshold"
            ),
            MatchResult::Ambiguous {
                best_score,
                contenders,
                ..
            } => warn!(
                tag = fingerprint.tag(),
                best_score,
                contenders = contenders.len(),
                "ambiguous relocation, refusing to guess"
            ),
        }
        verdict
    }

    fn check_fast_path(
        &self,
        tree: &DocumentTree,
        fingerprint: &Fingerprint,
        policy: &RelocationPolicy,
    ) -> Option<ResolvedMatch> {
        let candidate = self.source.fast_path(tree, fingerprint)?;
        let node = tree.get(candidate.node)?;
        let breakdown = self.scorer.score(fingerprint, node, policy)?;
        if breakdown.total < policy.high_confidence_threshold() {
            debug!(
                node = %candidate.node,
                score = breakdown.total,
                threshold = policy.high_confidence_threshold(),
                "fast path hit below high-confidence threshold"
            );
            return None;
        }
        Some(ResolvedMatch {
            node: candidate.node,
            confidence: breakdown.total,
            breakdown,
            stage: ResolutionStage::FastPathCheck,
        })
    }

    /// Score every candidate and order them best first.
    fn rank(
        &self,
        tree: &DocumentTree,
        fingerprint: &Fingerprint,
        policy: &RelocationPolicy,
        candidates: &[Candidate],
    ) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .iter()
            .filter_map(|candidate| {
                let node = tree.get(candidate.node)?;
                let breakdown = self.scorer.score(fingerprint, node, policy)?;
                Some(ScoredCandidate {
                    node: candidate.node,
                    score: breakdown.total,
                    breakdown,
                    sibling_index: node.sibling_index(),
                    document_index: node.document_index(),
                })
            })
            .collect();
        scored.sort_by(|a, b| compare_ranked(a, b, fingerprint.sibling_index()));
        scored
    }
}

fn advance(stage: &mut ResolutionStage, next: ResolutionStage) {
    debug!(from = stage.name(), to = next.name(), "resolver transition");
    *stage = next;
}

/// Highest score first; exact ties go to the smallest distance from the
/// original sibling index, then to document order.
fn compare_ranked(a: &ScoredCandidate, b: &ScoredCandidate, origin: usize) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| {
            a.sibling_index
                .abs_diff(origin)
                .cmp(&b.sibling_index.abs_diff(origin))
        })
        .then_with(|| a.document_index.cmp(&b.document_index))
}

fn decide(
    ranked: Vec<ScoredCandidate>,
    fingerprint: &Fingerprint,
    policy: &RelocationPolicy,
    scanned: usize,
) -> MatchResult {
    let Some(best) = ranked.first().copied() else {
        return MatchResult::NotFound {
            best_score: 0.0,
            best: None,
            scanned,
        };
    };

    let min = policy.min_threshold();
    if best.score < min {
        return MatchResult::NotFound {
            best_score: best.score,
            best: Some(best),
            scanned,
        };
    }

    // an exact fingerprint match only competes with other exact matches
    let epsilon = policy.ambiguity_epsilon();
    let margin = if best.score >= 1.0 {
        epsilon.min(f64::MIN_POSITIVE)
    } else {
        epsilon
    };
    if let Some(runner_up) = ranked.get(1) {
        if runner_up.score >= min && best.score - runner_up.score < margin {
            let contenders: Vec<ScoredCandidate> = ranked
                .iter()
                .take_while(|c| c.score >= min && best.score - c.score < margin)
                .copied()
                .collect();
            debug!(
                tag = fingerprint.tag(),
                best = best.score,
                runner_up = runner_up.score,
                "top candidates within ambiguity epsilon"
            );
            return MatchResult::Ambiguous {
                best_score: best.score,
                contenders,
                scanned,
            };
        }
    }

    MatchResult::Resolved(ResolvedMatch {
        node: best.node,
        confidence: best.score,
        breakdown: best.breakdown,
        stage: ResolutionStage::CandidateScan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::FingerprintExtractor;
    use crate::scorer::ScoreBreakdown;
    use dom_snapshot::{ElementSpec, NodeId, StructuralEvaluator};
    use std::sync::Arc;

    fn resolver() -> RelocationResolver {
        let extractor = FingerprintExtractor::default();
        RelocationResolver::new(
            DefaultCandidateGenerator::new(Arc::new(StructuralEvaluator), extractor.clone()),
            SimilarityScorer::new(extractor),
        )
    }

    fn scored(node: usize, score: f64, sibling_index: usize) -> ScoredCandidate {
        ScoredCandidate {
            node: NodeId(node),
            score,
            breakdown: ScoreBreakdown {
                total: score,
                ..ScoreBreakdown::default()
            },
            sibling_index,
            document_index: node,
        }
    }

    fn any_fingerprint(sibling_index: usize) -> Fingerprint {
        let siblings = (0..=sibling_index).map(|_| ElementSpec::new("li"));
        let tree = DocumentTree::from_root(ElementSpec::new("ul").children(siblings));
        FingerprintExtractor::default().extract(tree.get(NodeId(sibling_index + 1)).unwrap())
    }

    #[test]
    fn ranking_breaks_exact_ties_by_sibling_then_document_order() {
        let mut ranked = vec![
            scored(9, 0.7, 6),
            scored(2, 0.7, 2),
            scored(5, 0.9, 0),
            scored(4, 0.7, 4),
        ];
        ranked.sort_by(|a, b| compare_ranked(a, b, 3));
        let order: Vec<_> = ranked.iter().map(|c| c.node.0).collect();
        // 0.9 first; then sibling distance 1 (nodes 2 and 4, document order), then 3
        assert_eq!(order, vec![5, 2, 4, 9]);
    }

    #[test]
    fn decide_thresholds() {
        let fp = any_fingerprint(0);
        let policy = RelocationPolicy::default();

        let none = decide(Vec::new(), &fp, &policy, 0);
        assert_eq!(none.confidence(), 0.0);
        assert_eq!(none.stage(), ResolutionStage::NotFound);

        let low = decide(vec![scored(1, 0.3, 0)], &fp, &policy, 1);
        assert!(matches!(low, MatchResult::NotFound { best_score, .. } if best_score == 0.3));

        let close = decide(
            vec![scored(1, 0.80, 0), scored(2, 0.79, 1), scored(3, 0.5, 2)],
            &fp,
            &policy,
            3,
        );
        match close {
            MatchResult::Ambiguous { contenders, .. } => assert_eq!(contenders.len(), 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }

        // runner-up below the acceptance threshold never causes ambiguity
        let lone = decide(vec![scored(1, 0.46, 0), scored(2, 0.44, 1)], &fp, &policy, 2);
        assert_eq!(lone.node(), Some(NodeId(1)));

        let clear = decide(vec![scored(1, 0.8, 0), scored(2, 0.6, 1)], &fp, &policy, 2);
        assert_eq!(clear.node(), Some(NodeId(1)));
    }

    #[test]
    fn exact_match_beats_near_misses_but_not_other_exact_matches() {
        let fp = any_fingerprint(0);
        let policy = RelocationPolicy::default();

        let exact = decide(
            vec![scored(3, 1.0, 2), scored(2, 0.99, 1), scored(4, 0.99, 3)],
            &fp,
            &policy,
            3,
        );
        assert_eq!(exact.node(), Some(NodeId(3)));
        assert_eq!(exact.confidence(), 1.0);

        let twins = decide(
            vec![scored(3, 1.0, 2), scored(5, 1.0, 4), scored(2, 0.99, 1)],
            &fp,
            &policy,
            3,
        );
        match twins {
            MatchResult::Ambiguous { contenders, .. } => {
                let nodes: Vec<_> = contenders.iter().map(|c| c.node).collect();
                assert_eq!(nodes, vec![NodeId(3), NodeId(5)]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn zero_epsilon_lets_tie_break_decide() {
        let fp = any_fingerprint(2);
        let policy = RelocationPolicy::builder()
            .with_ambiguity_epsilon(0.0)
            .build()
            .unwrap();
        let mut ranked = vec![scored(4, 0.7, 4), scored(2, 0.7, 1)];
        ranked.sort_by(|a, b| compare_ranked(a, b, fp.sibling_index()));
        let verdict = decide(ranked, &fp, &policy, 2);
        assert_eq!(verdict.node(), Some(NodeId(2)));
    }

    #[test]
    fn locates_unchanged_node_with_full_confidence() {
        let tree = DocumentTree::from_root(
            ElementSpec::new("ul")
                .child(ElementSpec::new("li").text("first"))
                .child(ElementSpec::new("li").text("second"))
                .child(ElementSpec::new("li").text("third")),
        );
        let resolver = resolver();
        let fp = FingerprintExtractor::default().extract(tree.get(NodeId(2)).unwrap());
        let verdict = resolver.locate(&tree, &fp, &RelocationPolicy::default());
        let found = verdict.resolved().unwrap();
        assert_eq!(found.node, NodeId(2));
        assert_eq!(found.confidence, 1.0);
        assert_eq!(found.stage, ResolutionStage::CandidateScan);
    }
}
