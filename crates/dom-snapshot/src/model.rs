use serde::{Deserialize, Serialize};

/// Index of a node inside its [`DocumentTree`](crate::DocumentTree).
///
/// Ids are assigned in pre-order, so a node id doubles as its document-order
/// index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One hop of a structural path: the node's tag and its position among its
/// parent's children.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathStep {
    pub tag: String,
    pub sibling_index: usize,
}

impl PathStep {
    pub fn new(tag: impl Into<String>, sibling_index: usize) -> Self {
        Self {
            tag: tag.into(),
            sibling_index,
        }
    }
}

/// A single element in the arena. Read through [`NodeRef`](crate::NodeRef).
///
/// Attributes keep source order. `text` is the element's own text as handed
/// over by the parser.
#[derive(Clone, Debug)]
pub(crate) struct DocumentNode {
    pub(crate) tag: String,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) text: String,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) document_index: usize,
    pub(crate) sibling_index: usize,
}
