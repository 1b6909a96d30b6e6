//! Query results that outlive the evaluation that produced them.

use dictedit_tree::{DocNode, NodeId, NodeRef};

/// An ordered list of node references, detached from any evaluation.
///
/// It owns only the references. The nodes stay owned by their
/// [`Document`](dictedit_tree::Document), and dropping the set never touches
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedNodeSet(Vec<NodeRef>);

impl OwnedNodeSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<NodeRef> {
        self.0.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.0.iter().copied()
    }

    /// The tree nodes of the set, skipping attributes.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter().filter_map(NodeRef::node_id)
    }

    pub fn as_slice(&self) -> &[NodeRef] {
        &self.0
    }
}

impl FromIterator<NodeRef> for OwnedNodeSet {
    fn from_iter<I: IntoIterator<Item = NodeRef>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for OwnedNodeSet {
    type Item = NodeRef;
    type IntoIter = std::vec::IntoIter<NodeRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Copies the references out of an evaluator result, ending its borrow of the document.
pub fn materialize(nodes: &[DocNode<'_>]) -> OwnedNodeSet {
    nodes.iter().map(DocNode::target).collect()
}

/// The payload of a successful evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    NodeSet(OwnedNodeSet),
    Boolean(bool),
}

impl QueryResult {
    pub fn node_set(&self) -> Option<&OwnedNodeSet> {
        match self {
            QueryResult::NodeSet(nodes) => Some(nodes),
            QueryResult::Boolean(_) => None,
        }
    }

    /// The node set, or an empty set for a boolean result.
    pub fn into_node_set(self) -> OwnedNodeSet {
        match self {
            QueryResult::NodeSet(nodes) => nodes,
            QueryResult::Boolean(_) => OwnedNodeSet::default(),
        }
    }

    /// XPath truth value: a node set is true when non-empty.
    pub fn as_bool(&self) -> bool {
        match self {
            QueryResult::NodeSet(nodes) => !nodes.is_empty(),
            QueryResult::Boolean(b) => *b,
        }
    }
}
