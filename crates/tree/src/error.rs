use crate::document::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("Node {0} cannot hold children or attributes")]
    NotAnElement(NodeId),

    #[error("The document root cannot be moved")]
    IsRoot,

    #[error("Node {0} already has a parent")]
    AlreadyAttached(NodeId),

    #[error("Inserting {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("Child index {index} is out of range for {parent} with {len} children")]
    IndexOutOfRange {
        parent: NodeId,
        index: usize,
        len: usize,
    },

    #[error("Node {0} was not attached when it was detached")]
    NoOrigin(NodeId),
}
