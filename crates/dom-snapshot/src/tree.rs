//! Arena tree, construction spec and borrowed node handles

use std::borrow::Cow;
use std::fmt;

use crate::model::{Attribute, DocumentNode, NodeId, PathStep};
use crate::text::{present, TextMode};

/// Owned description of an element subtree, consumed by
/// [`DocumentTree::from_root`].
///
/// Parser collaborators lower their output into this shape; tests use it to
/// write documents inline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementSpec {
    tag: String,
    attributes: Vec<Attribute>,
    text: String,
    children: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Add an attribute. A repeated name keeps the first value.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into().to_ascii_lowercase();
        if !self.attributes.iter().any(|attr| attr.name == name) {
            self.attributes.push(Attribute::new(name, value));
        }
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = ElementSpec>,
    {
        self.children.extend(children);
        self
    }
}

/// Immutable parsed document.
#[derive(Clone, Debug)]
pub struct DocumentTree {
    nodes: Vec<DocumentNode>,
}

impl DocumentTree {
    /// Lay out `root` in pre-order. Document and sibling indices follow source
    /// order exactly.
    pub fn from_root(root: ElementSpec) -> Self {
        let mut nodes: Vec<DocumentNode> = Vec::new();
        let mut stack: Vec<(ElementSpec, Option<NodeId>, usize)> = vec![(root, None, 0)];

        while let Some((spec, parent, sibling_index)) = stack.pop() {
            let id = NodeId(nodes.len());
            let ElementSpec {
                tag,
                attributes,
                text,
                children,
            } = spec;

            nodes.push(DocumentNode {
                tag,
                attributes,
                text,
                children: Vec::with_capacity(children.len()),
                parent,
                document_index: id.0,
                sibling_index,
            });
            if let Some(parent) = parent {
                nodes[parent.0].children.push(id);
            }

            // reversed so the first child is popped (and numbered) first
            for (index, child) in children.into_iter().enumerate().rev() {
                stack.push((child, Some(id), index));
            }
        }

        Self { nodes }
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            id: NodeId(0),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.0 < self.nodes.len()).then_some(NodeRef { tree: self, id })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in document order.
    pub fn iter(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        (0..self.nodes.len()).map(move |index| NodeRef {
            tree: self,
            id: NodeId(index),
        })
    }

    pub fn nodes_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        self.iter().filter(move |node| node.tag() == tag)
    }
}

/// Borrowed handle to one node of a [`DocumentTree`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a DocumentTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    fn raw(&self) -> &'a DocumentNode {
        &self.tree.nodes[self.id.0]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a DocumentTree {
        self.tree
    }

    pub fn tag(&self) -> &'a str {
        &self.raw().tag
    }

    pub fn attributes(&self) -> &'a [Attribute] {
        &self.raw().attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.raw()
            .attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn text(&self, mode: TextMode) -> Cow<'a, str> {
        present(&self.raw().text, mode)
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.raw()
            .children
            .iter()
            .map(move |id| NodeRef { tree, id: *id })
    }

    pub fn child_count(&self) -> usize {
        self.raw().children.len()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.raw().parent.map(|id| NodeRef {
            tree: self.tree,
            id,
        })
    }

    /// Proper ancestors, nearest first.
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors {
            next: self.parent(),
        }
    }

    pub fn document_index(&self) -> usize {
        self.raw().document_index
    }

    pub fn sibling_index(&self) -> usize {
        self.raw().sibling_index
    }

    /// Number of children of this node's parent, counting the node itself.
    /// The root counts as its own single sibling.
    pub fn sibling_count(&self) -> usize {
        self.parent().map_or(1, |parent| parent.child_count())
    }

    pub fn step(&self) -> PathStep {
        PathStep::new(self.tag(), self.sibling_index())
    }

    /// Steps from `ancestor` (inclusive) down to this node (inclusive).
    ///
    /// Returns `None` when `ancestor` is neither this node nor one of its
    /// ancestors.
    pub fn path_from(&self, ancestor: NodeId) -> Option<Vec<PathStep>> {
        let mut steps = vec![self.step()];
        if self.id == ancestor {
            return Some(steps);
        }
        for node in self.ancestors() {
            steps.push(node.step());
            if node.id == ancestor {
                steps.reverse();
                return Some(steps);
            }
        }
        None
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("tag", &self.tag())
            .field("sibling_index", &self.sibling_index())
            .finish()
    }
}

pub struct Ancestors<'a> {
    next: Option<NodeRef<'a>>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}
