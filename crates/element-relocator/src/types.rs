//! Relocation verdict types

use dom_snapshot::NodeId;
use serde::{Deserialize, Serialize};

use crate::errors::RelocationError;
use crate::scorer::ScoreBreakdown;

/// Resolver state machine stages.
///
/// `Initial -> FastPathCheck -> (Resolved | CandidateScan)`,
/// `CandidateScan -> (Resolved | NotFound | AmbiguousMatch)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStage {
    Initial,
    FastPathCheck,
    CandidateScan,
    Resolved,
    NotFound,
    AmbiguousMatch,
}

impl ResolutionStage {
    pub fn name(&self) -> &'static str {
        match self {
            ResolutionStage::Initial => "initial",
            ResolutionStage::FastPathCheck => "fast-path-check",
            ResolutionStage::CandidateScan => "candidate-scan",
            ResolutionStage::Resolved => "resolved",
            ResolutionStage::NotFound => "not-found",
            ResolutionStage::AmbiguousMatch => "ambiguous-match",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResolutionStage::Resolved | ResolutionStage::NotFound | ResolutionStage::AmbiguousMatch
        )
    }
}

/// A node under evaluation during one relocation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub node: NodeId,
    /// Structural path edit distance to the fingerprint's path; 0.0 for a
    /// fast-path hit, which is rescored rather than ordered
    pub path_distance: f64,
    /// Emitted by the selector fast path
    pub fast_path: bool,
}

/// Output of the two-phase candidate generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    pub fast_path: bool,
    pub candidates: Vec<Candidate>,
}

/// A scored candidate, as exposed in verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub node: NodeId,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub sibling_index: usize,
    pub document_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMatch {
    pub node: NodeId,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub breakdown: ScoreBreakdown,
    /// `FastPathCheck` or `CandidateScan`
    pub stage: ResolutionStage,
}

/// Relocation verdict. Produced fresh per call; never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum MatchResult {
    Resolved(ResolvedMatch),

    /// Nothing cleared `min_threshold`
    NotFound {
        best_score: f64,
        best: Option<ScoredCandidate>,
        scanned: usize,
    },

    /// Two or more candidates above `min_threshold` within epsilon of the best
    Ambiguous {
        best_score: f64,
        contenders: Vec<ScoredCandidate>,
        scanned: usize,
    },
}

impl MatchResult {
    pub fn is_resolved(&self) -> bool {
        matches!(self, MatchResult::Resolved(_))
    }

    pub fn resolved(&self) -> Option<&ResolvedMatch> {
        match self {
            MatchResult::Resolved(found) => Some(found),
            _ => None,
        }
    }

    pub fn node(&self) -> Option<NodeId> {
        self.resolved().map(|found| found.node)
    }

    /// Confidence of the resolved node, or the best score observed.
    pub fn confidence(&self) -> f64 {
        match self {
            MatchResult::Resolved(found) => found.confidence,
            MatchResult::NotFound { best_score, .. }
            | MatchResult::Ambiguous { best_score, .. } => *best_score,
        }
    }

    pub fn stage(&self) -> ResolutionStage {
        match self {
            MatchResult::Resolved(_) => ResolutionStage::Resolved,
            MatchResult::NotFound { .. } => ResolutionStage::NotFound,
            MatchResult::Ambiguous { .. } => ResolutionStage::AmbiguousMatch,
        }
    }

    /// Map non-resolved verdicts onto errors for `?`-style callers.
    pub fn into_result(self) -> Result<ResolvedMatch, RelocationError> {
        match self {
            MatchResult::Resolved(found) => Ok(found),
            MatchResult::NotFound { best_score, .. } => {
                Err(RelocationError::NotFound { best_score })
            }
            MatchResult::Ambiguous {
                best_score,
                contenders,
                ..
            } => Err(RelocationError::AmbiguousMatch {
                best_score,
                runner_up: contenders.get(1).map_or(best_score, |c| c.score),
                candidates: contenders.iter().map(|c| c.node).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(node: usize, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            node: NodeId(node),
            score,
            breakdown: ScoreBreakdown::default(),
            sibling_index: 0,
            document_index: node,
        }
    }

    #[test]
    fn verdict_accessors() {
        let resolved = MatchResult::Resolved(ResolvedMatch {
            node: NodeId(4),
            confidence: 0.8,
            breakdown: ScoreBreakdown::default(),
            stage: ResolutionStage::CandidateScan,
        });
        assert!(resolved.is_resolved());
        assert_eq!(resolved.node(), Some(NodeId(4)));
        assert_eq!(resolved.stage(), ResolutionStage::Resolved);

        let missing = MatchResult::NotFound {
            best_score: 0.2,
            best: None,
            scanned: 3,
        };
        assert_eq!(missing.confidence(), 0.2);
        assert_eq!(
            missing.into_result().unwrap_err(),
            RelocationError::NotFound { best_score: 0.2 }
        );
    }

    #[test]
    fn ambiguous_into_error_lists_contenders() {
        let verdict = MatchResult::Ambiguous {
            best_score: 0.81,
            contenders: vec![scored(3, 0.81), scored(7, 0.80)],
            scanned: 5,
        };
        match verdict.into_result().unwrap_err() {
            RelocationError::AmbiguousMatch {
                best_score,
                runner_up,
                candidates,
            } => {
                assert_eq!(best_score, 0.81);
                assert_eq!(runner_up, 0.80);
                assert_eq!(candidates, vec![NodeId(3), NodeId(7)]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn serializes_with_verdict_tag() {
        let verdict = MatchResult::NotFound {
            best_score: 0.1,
            best: None,
            scanned: 0,
        };
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["verdict"], "not_found");
        assert!(ResolutionStage::AmbiguousMatch.is_terminal());
        assert!(!ResolutionStage::FastPathCheck.is_terminal());
    }
}
