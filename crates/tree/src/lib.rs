//! A mutable document tree whose nodes live in an arena and are addressed by
//! stable [`NodeId`]s, so subtrees can be detached and handed around without
//! invalidating the rest of the document.

pub mod document;
pub mod error;
pub mod node;

pub use document::{Attribute, Detached, Document, NodeId, NodeKind};
pub use error::TreeError;
pub use node::{DocNode, NodeRef};
