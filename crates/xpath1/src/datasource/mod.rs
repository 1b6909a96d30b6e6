//! The read-only tree abstraction the evaluator navigates.
use std::hash::Hash;

/// A qualified name, consisting of an optional prefix and a local part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName<'a> {
    pub prefix: Option<&'a str>,
    pub local_part: &'a str,
}

/// The type of a node, aligned with the XPath 1.0 data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// A cheap, copyable handle to one node of a document.
///
/// The evaluator is written only against this trait, so any tree that can
/// hand out such handles can be queried. `'a` is the lifetime of the
/// borrowed document.
///
/// `Ord` must follow document order: results are sorted with it, and
/// positional predicates count in it.
pub trait DataSourceNode<'a>:
    std::fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + PartialOrd + Ord
{
    fn node_type(&self) -> NodeType;

    /// Element and attribute names; `None` for text, comment and root nodes.
    /// For a processing instruction this is its target.
    fn name(&self) -> Option<QName<'a>>;

    /// The XPath `string()` value.
    /// - text, comment, attribute: the node's own content
    /// - element, root: the concatenated text of all descendant text nodes
    fn string_value(&self) -> String;

    /// Attribute nodes. Empty for anything but elements.
    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// Child nodes in document order. Attributes are not children.
    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// `None` only for the root. An attribute's parent is its owner element.
    fn parent(&self) -> Option<Self>;
}

/// An in-memory tree for exercising the evaluator, shared with downstream test suites.
#[doc(hidden)]
pub mod tests {
    use super::*;
    use std::cmp::Ordering;
    use std::collections::HashMap;
    use std::hash::Hasher;

    #[derive(Debug, Clone)]
    struct MockNodeData<'a> {
        node_type: NodeType,
        name: Option<QName<'a>>,
        value: String,
        children: Vec<usize>,
        attributes: Vec<usize>,
    }

    /// Nodes keyed by id. Ids are handed out in document order.
    #[derive(Debug, Default)]
    pub struct MockTree<'a> {
        nodes: HashMap<usize, MockNodeData<'a>>,
        parent_map: HashMap<usize, usize>,
    }

    impl<'a> MockTree<'a> {
        fn add(
            &mut self,
            id: usize,
            parent: Option<usize>,
            node_type: NodeType,
            name: Option<&'a str>,
            value: &str,
        ) {
            self.nodes.insert(
                id,
                MockNodeData {
                    node_type,
                    name: name.map(|local_part| QName {
                        prefix: None,
                        local_part,
                    }),
                    value: value.to_string(),
                    children: vec![],
                    attributes: vec![],
                },
            );
            if let Some(pid) = parent {
                self.parent_map.insert(id, pid);
                if let Some(parent_data) = self.nodes.get_mut(&pid) {
                    match node_type {
                        NodeType::Attribute => parent_data.attributes.push(id),
                        _ => parent_data.children.push(id),
                    }
                }
            }
        }

        fn element(&mut self, id: usize, parent: usize, name: &'a str, value: &str) {
            self.add(id, Some(parent), NodeType::Element, Some(name), value);
        }

        fn text(&mut self, id: usize, parent: usize, value: &str) {
            self.add(id, Some(parent), NodeType::Text, None, value);
        }
    }

    /// A handle into a [`MockTree`]. Ordered by id.
    #[derive(Debug, Clone, Copy)]
    pub struct MockNode<'a> {
        pub id: usize,
        pub tree: &'a MockTree<'a>,
    }

    impl PartialEq for MockNode<'_> {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }
    impl Eq for MockNode<'_> {}

    impl PartialOrd for MockNode<'_> {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }
    impl Ord for MockNode<'_> {
        fn cmp(&self, other: &Self) -> Ordering {
            self.id.cmp(&other.id)
        }
    }

    impl Hash for MockNode<'_> {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    impl<'a> DataSourceNode<'a> for MockNode<'a> {
        fn node_type(&self) -> NodeType {
            self.tree.nodes[&self.id].node_type
        }

        fn name(&self) -> Option<QName<'a>> {
            self.tree.nodes[&self.id].name
        }

        fn string_value(&self) -> String {
            self.tree.nodes[&self.id].value.clone()
        }

        fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            let ids = tree.nodes[&self.id].attributes.clone();
            Box::new(ids.into_iter().map(move |id| MockNode { id, tree }))
        }

        fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            let ids = tree.nodes[&self.id].children.clone();
            Box::new(ids.into_iter().map(move |id| MockNode { id, tree }))
        }

        fn parent(&self) -> Option<Self> {
            self.tree.parent_map.get(&self.id).map(|&pid| MockNode {
                id: pid,
                tree: self.tree,
            })
        }
    }

    /// A single dictionary entry, ids in brackets:
    ///
    /// ```text
    /// (0) root
    ///   (1) <entry>
    ///     (2) <form> (3) <orth> (4) "cat"
    ///     (5) <form> (6) <orth> (7) "kitty"
    ///     (8) <gramGrp> (9) <pos type="n" (10)> (11) "n"
    ///     (12) <sense> (13) <tr> (14) "Katze"
    /// ```
    pub fn create_entry_tree<'a>() -> MockTree<'a> {
        let mut tree = MockTree::default();
        tree.add(0, None, NodeType::Root, None, "catkittynKatze");
        tree.element(1, 0, "entry", "catkittynKatze");

        tree.element(2, 1, "form", "cat");
        tree.element(3, 2, "orth", "cat");
        tree.text(4, 3, "cat");

        tree.element(5, 1, "form", "kitty");
        tree.element(6, 5, "orth", "kitty");
        tree.text(7, 6, "kitty");

        tree.element(8, 1, "gramGrp", "n");
        tree.element(9, 8, "pos", "n");
        tree.add(10, Some(9), NodeType::Attribute, Some("type"), "n");
        tree.text(11, 9, "n");

        tree.element(12, 1, "sense", "Katze");
        tree.element(13, 12, "tr", "Katze");
        tree.text(14, 13, "Katze");
        tree
    }
}
