// Query handles over a Document for the XPath evaluator
use crate::document::{Document, NodeId, NodeKind};
use dictedit_xpath1::{DataSourceNode, NodeType, QName};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Either a tree node or one attribute of an element.
/// Attributes are data on their element, not arena nodes, so they are
/// addressed by owner and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeRef {
    Node(NodeId),
    Attribute { owner: NodeId, index: usize },
}

impl NodeRef {
    /// The arena node, or `None` for an attribute.
    pub fn node_id(self) -> Option<NodeId> {
        match self {
            NodeRef::Node(id) => Some(id),
            NodeRef::Attribute { .. } => None,
        }
    }
}

/// A [`NodeRef`] bound to the document it points into.
#[derive(Clone, Copy)]
pub struct DocNode<'a> {
    doc: &'a Document,
    target: NodeRef,
}

impl<'a> DocNode<'a> {
    pub(crate) fn new(doc: &'a Document, target: NodeRef) -> Self {
        Self { doc, target }
    }

    pub fn target(&self) -> NodeRef {
        self.target
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    // An element sorts before its attributes, which sort before its children.
    fn order_key(&self) -> (usize, u8, usize) {
        match self.target {
            NodeRef::Node(id) => (self.doc.rank(id), 0, 0),
            NodeRef::Attribute { owner, index } => (self.doc.rank(owner), 1, index),
        }
    }
}

impl fmt::Debug for DocNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DocNode").field(&self.target).finish()
    }
}

impl PartialEq for DocNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.target == other.target
    }
}

impl Eq for DocNode<'_> {}

impl PartialOrd for DocNode<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DocNode<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key()
            .cmp(&other.order_key())
            .then_with(|| self.target.cmp(&other.target))
    }
}

impl Hash for DocNode<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.target.hash(state);
    }
}

fn qualified(name: &str) -> QName<'_> {
    match name.split_once(':') {
        Some((prefix, local_part)) => QName {
            prefix: Some(prefix),
            local_part,
        },
        None => QName {
            prefix: None,
            local_part: name,
        },
    }
}

impl<'a> DataSourceNode<'a> for DocNode<'a> {
    fn node_type(&self) -> NodeType {
        match self.target {
            NodeRef::Attribute { .. } => NodeType::Attribute,
            NodeRef::Node(id) => match self.doc.kind(id) {
                Some(NodeKind::Element { .. }) => NodeType::Element,
                Some(NodeKind::Text(_)) => NodeType::Text,
                Some(NodeKind::Root) | None => NodeType::Root,
            },
        }
    }

    fn name(&self) -> Option<QName<'a>> {
        let doc = self.doc;
        match self.target {
            NodeRef::Node(id) => doc.name(id).map(qualified),
            NodeRef::Attribute { owner, index } => {
                doc.attributes(owner).get(index).map(|a| qualified(&a.name))
            }
        }
    }

    fn string_value(&self) -> String {
        match self.target {
            NodeRef::Node(id) => self.doc.text_content(id),
            NodeRef::Attribute { owner, index } => self
                .doc
                .attributes(owner)
                .get(index)
                .map(|a| a.value.clone())
                .unwrap_or_default(),
        }
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let doc = self.doc;
        match self.target {
            NodeRef::Node(owner) => Box::new(
                (0..doc.attributes(owner).len())
                    .map(move |index| DocNode::new(doc, NodeRef::Attribute { owner, index })),
            ),
            NodeRef::Attribute { .. } => Box::new(std::iter::empty()),
        }
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let doc = self.doc;
        match self.target {
            NodeRef::Node(id) => Box::new(
                doc.children(id)
                    .iter()
                    .map(move |&child| DocNode::new(doc, NodeRef::Node(child))),
            ),
            NodeRef::Attribute { .. } => Box::new(std::iter::empty()),
        }
    }

    fn parent(&self) -> Option<Self> {
        let parent = match self.target {
            NodeRef::Node(id) => self.doc.parent(id)?,
            NodeRef::Attribute { owner, .. } => owner,
        };
        Some(DocNode::new(self.doc, NodeRef::Node(parent)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dictedit_xpath1::{EvaluationContext, FunctionRegistry, XPathValue, evaluate, parse_expression};

    const ENTRY: &str = r#"<entry><form><orth>cat</orth></form><form><orth>kitty</orth></form><gramGrp><pos type="n" xml:lang="en">n</pos></gramGrp></entry>"#;

    fn select<'a>(doc: &'a Document, xpath: &str) -> Vec<DocNode<'a>> {
        let funcs = FunctionRegistry::default();
        let root = doc.root_node();
        let e_ctx = EvaluationContext::new(root, root, &funcs);
        match evaluate(&parse_expression(xpath).unwrap(), &e_ctx).unwrap() {
            XPathValue::NodeSet(nodes) => nodes,
            other => panic!("expected a node-set, got {:?}", other),
        }
    }

    #[test]
    fn test_query_over_document() {
        let doc = Document::parse_xml(ENTRY).unwrap();
        let orths = select(&doc, "/entry/form/orth");
        assert_eq!(orths.len(), 2);
        assert_eq!(orths[0].string_value(), "cat");
        assert_eq!(orths[1].string_value(), "kitty");
    }

    #[test]
    fn test_attribute_nodes() {
        let doc = Document::parse_xml(ENTRY).unwrap();
        let attrs = select(&doc, "//pos/@*");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].node_type(), NodeType::Attribute);
        assert_eq!(attrs[1].name().and_then(|q| q.prefix), Some("xml"));
        assert_eq!(attrs[0].parent().and_then(|p| p.name()).map(|q| q.local_part), Some("pos"));
        assert!(attrs[0].target().node_id().is_none());
    }

    #[test]
    fn test_union_is_in_document_order() {
        let doc = Document::parse_xml(ENTRY).unwrap();
        let nodes = select(&doc, "//pos | //orth | //pos/@type");
        let names: Vec<_> = nodes
            .iter()
            .map(|n| n.name().map(|q| q.local_part).unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["orth", "orth", "pos", "type"]);
    }

    #[test]
    fn test_ordering_sees_mutations() {
        let mut doc = Document::parse_xml(ENTRY).unwrap();
        let entry = doc.document_element().unwrap();
        let first_form = doc.children(entry)[0];
        let detached = doc.detach(first_form).unwrap();
        doc.reattach(detached, entry, 2).unwrap();

        let orths: Vec<_> = select(&doc, "//orth").iter().map(|n| n.string_value()).collect();
        assert_eq!(orths, vec!["kitty", "cat"]);
    }
}
