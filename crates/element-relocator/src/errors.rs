//! Error types for relocation

use dom_snapshot::{NodeId, ParseError, SelectorError};
use thiserror::Error;

/// Relocation error enumeration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RelocationError {
    /// Policy rejected at construction time
    #[error("invalid relocation policy: {0}")]
    Configuration(String),

    /// Parser collaborator failure, passed through untouched
    #[error(transparent)]
    ParseInput(#[from] ParseError),

    /// Selector collaborator failure
    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// No candidate cleared the acceptance threshold
    #[error("element not found (best score {best_score:.3})")]
    NotFound { best_score: f64 },

    /// Two or more candidates scored within epsilon of each other
    #[error(
        "ambiguous match between {} candidates (best {best_score:.3}, runner-up {runner_up:.3})",
        candidates.len()
    )]
    AmbiguousMatch {
        best_score: f64,
        runner_up: f64,
        candidates: Vec<NodeId>,
    },

    /// No fingerprint stored under the requested key
    #[error("no fingerprint stored for key '{0}'")]
    UnknownKey(String),

    /// Node id does not address a node of the given tree
    #[error("{0} does not belong to this document")]
    DanglingNode(NodeId),
}

impl RelocationError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether the caller can act on the error (re-anchor, alert, fall back
    /// to a static selector) rather than treat it as a programming bug.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RelocationError::DanglingNode(_))
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            RelocationError::DanglingNode(_) => 3,
            RelocationError::Configuration(_) | RelocationError::ParseInput(_) => 2,
            RelocationError::NotFound { .. }
            | RelocationError::AmbiguousMatch { .. }
            | RelocationError::Selector(_) => 1,
            RelocationError::UnknownKey(_) => 0,
        }
    }
}
