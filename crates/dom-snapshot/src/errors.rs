//! Error types surfaced by tree collaborators

use thiserror::Error;

/// Failure reported by a [`MarkupParser`](crate::MarkupParser).
///
/// The message is carried verbatim; nothing in this workspace tries to
/// diagnose malformed markup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Selector evaluation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// The evaluator has no engine for this selector flavour
    #[error("selector engine does not support {engine} selectors")]
    Unsupported { engine: &'static str },

    /// The selector was rejected by its engine
    #[error("invalid selector '{selector}': {reason}")]
    Invalid { selector: String, reason: String },
}
