//! Collaborator ports: markup parsing and selector evaluation

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::errors::{ParseError, SelectorError};
use crate::model::NodeId;
use crate::tree::DocumentTree;

/// Turns raw markup into a tree. Implemented outside this workspace.
pub trait MarkupParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<DocumentTree, ParseError>;
}

/// A selector in one of the supported flavours.
///
/// `Css` and `XPath` are opaque expressions handed to whichever engine the
/// caller plugs in. `Tag` and `Attribute` are structured matchers that need no
/// grammar and are handled by [`StructuralEvaluator`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selector {
    Css { expr: String },
    XPath { expr: String },
    Tag { tag: String },
    Attribute {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
        name: String,
        value: String,
    },
}

impl Selector {
    pub fn css(expr: impl Into<String>) -> Self {
        Selector::Css { expr: expr.into() }
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Selector::XPath { expr: expr.into() }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Selector::Tag {
            tag: tag.into().to_ascii_lowercase(),
        }
    }

    pub fn attribute(
        tag: Option<&str>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Selector::Attribute {
            tag: tag.map(str::to_ascii_lowercase),
            name: name.into().to_ascii_lowercase(),
            value: value.into(),
        }
    }

    pub fn engine(&self) -> &'static str {
        match self {
            Selector::Css { .. } => "css",
            Selector::XPath { .. } => "xpath",
            Selector::Tag { .. } => "tag",
            Selector::Attribute { .. } => "attribute",
        }
    }

    pub fn cache_key(&self) -> String {
        match self {
            Selector::Css { expr } => format!("css:{expr}"),
            Selector::XPath { expr } => format!("xpath:{expr}"),
            Selector::Tag { tag } => format!("tag:{tag}"),
            Selector::Attribute { tag, name, value } => {
                format!("attr:{}:{name}:{value}", tag.as_deref().unwrap_or("*"))
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

/// Runs a selector against a tree. Results come back in document order.
pub trait SelectorEvaluator: Send + Sync {
    fn evaluate(&self, tree: &DocumentTree, selector: &Selector)
        -> Result<Vec<NodeId>, SelectorError>;
}

/// Evaluator for the grammar-free selector flavours.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructuralEvaluator;

impl SelectorEvaluator for StructuralEvaluator {
    fn evaluate(
        &self,
        tree: &DocumentTree,
        selector: &Selector,
    ) -> Result<Vec<NodeId>, SelectorError> {
        let hits: Vec<NodeId> = match selector {
            Selector::Tag { tag } => tree.nodes_with_tag(tag).map(|node| node.id()).collect(),
            Selector::Attribute { tag, name, value } => tree
                .iter()
                .filter(|node| tag.as_deref().map_or(true, |tag| node.tag() == tag))
                .filter(|node| node.attribute(name) == Some(value.as_str()))
                .map(|node| node.id())
                .collect(),
            other => {
                return Err(SelectorError::Unsupported {
                    engine: other.engine(),
                })
            }
        };
        trace!(selector = %selector, hits = hits.len(), "structural selector evaluated");
        Ok(hits)
    }
}
