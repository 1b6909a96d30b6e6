//! The arena-backed document.
//!
//! Every node is stored in one `Vec` and addressed by its index. Detaching a
//! node only unlinks it from its parent's child list; the node and its
//! subtree stay in the arena until they are reattached somewhere or
//! discarded, so a [`NodeId`] never dangles while its [`Detached`] handle is
//! alive.

use crate::error::TreeError;
use crate::node::{DocNode, NodeRef};
use std::fmt;
use std::sync::OnceLock;

const ROOT: NodeId = NodeId(0);
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Stable address of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    /// Attribute names are unique within one element.
    Element {
        name: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Ownership of a subtree that has been unlinked from its parent.
///
/// The subtree still lives in the document's arena. Hand the value back to
/// [`Document::reattach`], [`Document::restore`] or [`Document::discard`].
/// Dropping it keeps the nodes allocated until [`Document::sweep_orphans`].
#[must_use = "a detached subtree must be reattached, restored or discarded"]
#[derive(Debug, PartialEq, Eq)]
pub struct Detached {
    id: NodeId,
    origin: Option<(NodeId, usize)>,
}

impl Detached {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The parent and child index the node was detached from.
    pub fn origin(&self) -> Option<(NodeId, usize)> {
        self.origin
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<NodeData>>,
    /// Document-order rank per arena slot, rebuilt after any mutation.
    order: OnceLock<Vec<usize>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            })],
            order: OnceLock::new(),
        }
    }

    /// Builds a document from XML text. Comments and processing instructions
    /// are dropped; element and attribute names keep only their local part,
    /// except for `xml:` attributes.
    pub fn parse_xml(text: &str) -> Result<Self, TreeError> {
        let xml = roxmltree::Document::parse(text)?;
        let mut doc = Document::new();
        doc.import(xml.root(), ROOT)?;
        log::debug!("Loaded XML document with {} nodes", doc.node_count());
        Ok(doc)
    }

    fn import(&mut self, source: roxmltree::Node<'_, '_>, parent: NodeId) -> Result<(), TreeError> {
        for child in source.children() {
            let id = if child.is_element() {
                let attributes = child
                    .attributes()
                    .map(|attr| Attribute {
                        name: match attr.namespace() {
                            Some(XML_NAMESPACE) => format!("xml:{}", attr.name()),
                            _ => attr.name().to_string(),
                        },
                        value: attr.value().to_string(),
                    })
                    .collect();
                let id = self.push(NodeKind::Element {
                    name: child.tag_name().name().to_string(),
                    attributes,
                });
                self.import(child, id)?;
                id
            } else if child.is_text() {
                self.create_text(child.text().unwrap_or_default())
            } else {
                continue;
            };
            self.append_child(parent, id)?;
        }
        Ok(())
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.touch();
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        }));
        id
    }

    fn touch(&mut self) {
        self.order.take();
    }

    fn data(&self, id: NodeId) -> Result<&NodeData, TreeError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(TreeError::UnknownNode(id))
    }

    fn data_mut(&mut self, id: NodeId) -> Result<&mut NodeData, TreeError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownNode(id))
    }

    /// Creates an unattached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Element {
            name: name.to_string(),
            attributes: Vec::new(),
        })
    }

    /// Creates an unattached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    /// Sets an attribute, replacing the value if the name is already present.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => {
                match attributes.iter_mut().find(|a| a.name == name) {
                    Some(existing) => existing.value = value.to_string(),
                    None => attributes.push(Attribute {
                        name: name.to_string(),
                        value: value.to_string(),
                    }),
                }
            }
            _ => return Err(TreeError::NotAnElement(id)),
        }
        self.touch();
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let len = self.data(parent)?.children.len();
        self.insert_child(parent, len, child)
    }

    /// Links an unattached node under `parent` at child position `index`.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), TreeError> {
        let len = self.ensure_container(parent)?;
        if index > len {
            return Err(TreeError::IndexOutOfRange { parent, index, len });
        }
        let child_data = self.data(child)?;
        if matches!(child_data.kind, NodeKind::Root) {
            return Err(TreeError::IsRoot);
        }
        if child_data.parent.is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }
        if self.ancestors_or_self(parent).any(|a| a == child) {
            return Err(TreeError::Cycle { parent, child });
        }

        self.touch();
        self.data_mut(child)?.parent = Some(parent);
        self.data_mut(parent)?.children.insert(index, child);
        Ok(())
    }

    /// Fails unless `id` may hold children; returns its child count.
    fn ensure_container(&self, id: NodeId) -> Result<usize, TreeError> {
        let data = self.data(id)?;
        match data.kind {
            NodeKind::Text(_) => Err(TreeError::NotAnElement(id)),
            _ => Ok(data.children.len()),
        }
    }

    fn ancestors_or_self(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&n| self.parent(n))
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    /// The first element child of the root.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(ROOT)
            .iter()
            .copied()
            .find(|&c| matches!(self.kind(c), Some(NodeKind::Element { .. })))
    }

    /// True when `id` addresses a live node (attached or detached).
    pub fn contains(&self, id: NodeId) -> bool {
        self.data(id).is_ok()
    }

    /// Live nodes in the arena, including the root and detached subtrees.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.data(id).ok().map(|d| &d.kind)
    }

    /// Element name, `None` for text, the root or unknown ids.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Attributes in document order; empty for anything but elements.
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.kind(id) {
            Some(NodeKind::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.data(id).map(|d| d.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).ok().and_then(|d| d.parent)
    }

    /// Own content of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Concatenated text of `id` and all its descendants, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut content = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(text) = self.text(current) {
                content.push_str(text);
            }
            stack.extend(self.children(current).iter().rev());
        }
        content
    }

    /// Unlinks `id` from its parent, recording where it was.
    pub fn detach(&mut self, id: NodeId) -> Result<Detached, TreeError> {
        let data = self.data(id)?;
        if matches!(data.kind, NodeKind::Root) {
            return Err(TreeError::IsRoot);
        }
        let parent = data.parent;
        let origin = match parent {
            Some(parent) => {
                let siblings = &mut self.data_mut(parent)?.children;
                let index = siblings
                    .iter()
                    .position(|&c| c == id)
                    .ok_or(TreeError::UnknownNode(id))?;
                siblings.remove(index);
                Some((parent, index))
            }
            None => None,
        };
        self.data_mut(id)?.parent = None;
        self.touch();
        Ok(Detached { id, origin })
    }

    /// Inserts a detached subtree under `parent` at `index`.
    pub fn reattach(
        &mut self,
        detached: Detached,
        parent: NodeId,
        index: usize,
    ) -> Result<NodeId, TreeError> {
        self.insert_child(parent, index, detached.id)?;
        Ok(detached.id)
    }

    /// Puts a detached subtree back where it was detached from.
    pub fn restore(&mut self, detached: Detached) -> Result<NodeId, TreeError> {
        let (parent, index) = detached.origin.ok_or(TreeError::NoOrigin(detached.id))?;
        self.reattach(detached, parent, index)
    }

    /// Frees a detached subtree, returning how many nodes were released.
    pub fn discard(&mut self, detached: Detached) -> Result<usize, TreeError> {
        if self.data(detached.id)?.parent.is_some() {
            return Err(TreeError::AlreadyAttached(detached.id));
        }
        let mut freed = 0;
        let mut stack = vec![detached.id];
        while let Some(id) = stack.pop() {
            if let Some(data) = self.nodes.get_mut(id.0).and_then(Option::take) {
                stack.extend(data.children);
                freed += 1;
            }
        }
        self.touch();
        log::trace!("Discarded {} nodes under {}", freed, detached.id);
        Ok(freed)
    }

    /// Frees every node the root cannot reach: subtrees whose [`Detached`]
    /// handle was dropped, and nodes created but never attached. Returns how
    /// many nodes were released.
    pub fn sweep_orphans(&mut self) -> usize {
        let mut reachable = vec![false; self.nodes.len()];
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            if let Some(seen) = reachable.get_mut(id.0) {
                *seen = true;
            }
            stack.extend(self.children(id).iter().copied());
        }

        let mut freed = 0;
        for (slot, &seen) in self.nodes.iter_mut().zip(&reachable) {
            if !seen && slot.take().is_some() {
                freed += 1;
            }
        }
        if freed > 0 {
            self.touch();
            log::debug!("Swept {} orphaned nodes", freed);
        }
        freed
    }

    /// Deep-copies `id` into a fresh document. Copying the root copies all
    /// of its children.
    pub fn copy_subtree(&self, id: NodeId) -> Result<Document, TreeError> {
        let mut copy = Document::new();
        let source = self.data(id)?;
        if matches!(source.kind, NodeKind::Root) {
            for &child in &source.children {
                self.copy_into(child, &mut copy, ROOT)?;
            }
        } else {
            self.copy_into(id, &mut copy, ROOT)?;
        }
        Ok(copy)
    }

    fn copy_into(&self, id: NodeId, target: &mut Document, parent: NodeId) -> Result<(), TreeError> {
        let data = self.data(id)?;
        let copied = target.push(data.kind.clone());
        target.append_child(parent, copied)?;
        for &child in &data.children {
            self.copy_into(child, target, copied)?;
        }
        Ok(())
    }

    /// Appends `before`, then `<name>content</name>`, then `after` to
    /// `parent`. Empty or missing text pieces are skipped. Returns the new
    /// element.
    pub fn append_element_with_text(
        &mut self,
        parent: NodeId,
        before: Option<&str>,
        name: &str,
        content: Option<&str>,
        after: Option<&str>,
    ) -> Result<NodeId, TreeError> {
        self.ensure_container(parent)?;
        self.append_text(parent, before)?;
        let element = self.create_element(name);
        self.append_child(parent, element)?;
        self.append_text(element, content)?;
        self.append_text(parent, after)?;
        Ok(element)
    }

    fn append_text(&mut self, parent: NodeId, text: Option<&str>) -> Result<(), TreeError> {
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            let id = self.create_text(text);
            self.append_child(parent, id)?;
        }
        Ok(())
    }

    /// Structural equality of two subtrees, possibly in different documents.
    pub fn subtree_eq(&self, id: NodeId, other: &Document, other_id: NodeId) -> bool {
        match (self.data(id), other.data(other_id)) {
            (Ok(a), Ok(b)) => {
                a.kind == b.kind
                    && a.children.len() == b.children.len()
                    && a.children
                        .iter()
                        .zip(&b.children)
                        .all(|(&x, &y)| self.subtree_eq(x, other, y))
            }
            _ => false,
        }
    }

    pub fn root_node(&self) -> DocNode<'_> {
        DocNode::new(self, NodeRef::Node(ROOT))
    }

    /// A queryable handle for `target`, or `None` if it does not exist.
    pub fn node(&self, target: NodeRef) -> Option<DocNode<'_>> {
        let exists = match target {
            NodeRef::Node(id) => self.contains(id),
            NodeRef::Attribute { owner, index } => index < self.attributes(owner).len(),
        };
        exists.then(|| DocNode::new(self, target))
    }

    /// Position of `id` in document order. Detached subtrees rank after the
    /// attached tree, in arena order.
    pub(crate) fn rank(&self, id: NodeId) -> usize {
        let ranks = self.order.get_or_init(|| {
            let mut ranks = vec![usize::MAX; self.nodes.len()];
            let detached_tops = self.nodes.iter().enumerate().filter_map(|(i, slot)| {
                slot.as_ref()
                    .filter(|d| i != ROOT.0 && d.parent.is_none())
                    .map(|_| NodeId(i))
            });
            let mut next = 0;
            for top in std::iter::once(ROOT).chain(detached_tops) {
                let mut stack = vec![top];
                while let Some(current) = stack.pop() {
                    ranks[current.0] = next;
                    next += 1;
                    stack.extend(self.children(current).iter().rev());
                }
            }
            ranks
        });
        ranks.get(id.0).copied().unwrap_or(usize::MAX)
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.subtree_eq(ROOT, other, ROOT)
    }
}
