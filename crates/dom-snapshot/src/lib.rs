//! Read-only document tree model
//!
//! Parsed pages are held as an arena of nodes addressed by [`NodeId`]. Parent
//! links are plain indices, so trees are `Send + Sync` and can be shared by
//! any number of concurrent readers once built. Nothing in this crate mutates
//! a tree after [`DocumentTree::from_root`] returns.
//!
//! The crate also defines the ports through which external collaborators
//! plug in: [`MarkupParser`] for turning raw markup into a tree and
//! [`SelectorEvaluator`] for running selectors against one.

pub mod errors;
pub mod model;
pub mod ports;
pub mod text;
pub mod tree;

pub use errors::*;
pub use model::*;
pub use ports::*;
pub use text::*;
pub use tree::*;
