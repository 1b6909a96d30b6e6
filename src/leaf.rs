//! Leaf validation and extraction.
//!
//! A leaf is a node whose children are all text and whose attributes are
//! all allowed by a [`Whitelist`]. The editor lifts leaves out of the tree to
//! edit them as plain text, so nothing else may be detached this way.

use crate::engine::{QueryEngine, first_match};
use crate::error::EvalError;
use dictedit_tree::{Detached, Document, NodeId, NodeRef};
use serde::{Deserialize, Serialize};

/// Allowed attribute names, each optionally restricted to one value.
///
/// Stored as two sequences aligned by position; a `None` value accepts
/// any value for the name at the same index. A name may appear more than
/// once to allow several values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whitelist {
    names: Vec<String>,
    #[serde(default)]
    values: Vec<Option<String>>,
}

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a whitelist from parallel name and value sequences. Names
    /// without a value at their position accept any value.
    pub fn from_parallel<N, V>(
        names: impl IntoIterator<Item = N>,
        values: impl IntoIterator<Item = Option<V>>,
    ) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut values: Vec<Option<String>> = values
            .into_iter()
            .take(names.len())
            .map(|v| v.map(Into::into))
            .collect();
        values.resize(names.len(), None);
        Self { names, values }
    }

    /// Allows `name` with any value.
    pub fn allow(mut self, name: &str) -> Self {
        self.names.push(name.to_string());
        self.values.resize(self.names.len() - 1, None);
        self.values.push(None);
        self
    }

    /// Allows `name` only with exactly `value`.
    pub fn allow_value(mut self, name: &str, value: &str) -> Self {
        self.names.push(name.to_string());
        self.values.resize(self.names.len() - 1, None);
        self.values.push(Some(value.to_string()));
        self
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(name, required value)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&str>)> + '_ {
        self.names.iter().enumerate().map(|(i, name)| {
            let value = self.values.get(i).and_then(|v| v.as_deref());
            (name.as_str(), value)
        })
    }

    /// True when some entry names `name` and either has no required value or requires `value`.
    pub fn permits(&self, name: &str, value: &str) -> bool {
        self.entries()
            .any(|(allowed, required)| allowed == name && required.is_none_or(|r| r == value))
    }
}

/// Whether `id` has only text children and only whitelisted attributes.
///
/// A node with attributes is rejected outright when no whitelist is given.
pub fn is_valid_leaf(doc: &Document, id: NodeId, whitelist: Option<&Whitelist>) -> bool {
    let attributes = doc.attributes(id);
    if !attributes.is_empty() {
        let Some(whitelist) = whitelist else {
            log::debug!("{} has attributes but no whitelist was given", describe(doc, id));
            return false;
        };
        if let Some(attr) = attributes
            .iter()
            .find(|a| !whitelist.permits(&a.name, &a.value))
        {
            log::debug!(
                "{} has attribute {}=\"{}\" which is not allowed",
                describe(doc, id),
                attr.name,
                attr.value
            );
            return false;
        }
    }

    if let Some(&child) = doc.children(id).iter().find(|&&c| doc.text(c).is_none()) {
        log::debug!(
            "{} has non-text child {}",
            describe(doc, id),
            describe(doc, child)
        );
        return false;
    }
    true
}

fn describe(doc: &Document, id: NodeId) -> String {
    match doc.name(id) {
        Some(name) => format!("<{}> ({})", name, id),
        None => format!("node {}", id),
    }
}

/// The outcome of [`QueryEngine::extract_leaf`].
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub enum LeafExtraction {
    /// The first match was a valid leaf and has been detached.
    Extracted { leaf: Detached, matches: usize },
    /// The first match is not a leaf; the document is unchanged.
    Rejected(NodeRef),
    /// Nothing matched.
    NotFound,
}

impl QueryEngine {
    /// Finds the leaf selected by `expression` and detaches it from `doc`.
    ///
    /// With several matches only the first, in document order, is considered,
    /// and a warning is logged. The document is modified only when
    /// [`LeafExtraction::Extracted`] is returned; the leaf then stays in the
    /// arena until it is reattached, restored or discarded. Leaves dropped
    /// without that are reclaimed by [`Document::sweep_orphans`].
    pub fn extract_leaf(
        &self,
        expression: &str,
        doc: &mut Document,
        whitelist: Option<&Whitelist>,
    ) -> Result<LeafExtraction, EvalError> {
        let nodes = self.find_node_set(expression, doc)?;
        let Some(target) = first_match(expression, &nodes) else {
            return Ok(LeafExtraction::NotFound);
        };

        let id = match target.node_id() {
            Some(id) if id != doc.root() => id,
            _ => {
                log::debug!("'{}' matched {:?}, which cannot be extracted", expression, target);
                return Ok(LeafExtraction::Rejected(target));
            }
        };
        if !is_valid_leaf(doc, id, whitelist) {
            return Ok(LeafExtraction::Rejected(target));
        }

        let leaf = doc.detach(id)?;
        log::trace!("Extracted {} for '{}'", describe(doc, id), expression);
        Ok(LeafExtraction::Extracted {
            leaf,
            matches: nodes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos_with(attrs: &str, content: &str) -> (Document, NodeId) {
        let doc = Document::parse_xml(&format!("<pos{}>{}</pos>", attrs, content)).unwrap();
        let pos = doc.document_element().unwrap();
        (doc, pos)
    }

    #[test]
    fn test_whitelist_from_parallel() {
        let whitelist = Whitelist::from_parallel(["type", "xml:lang"], [Some("n"), None]);
        assert!(whitelist.permits("type", "n"));
        assert!(!whitelist.permits("type", "v"));
        assert!(whitelist.permits("xml:lang", "anything"));
        assert!(!whitelist.permits("norm", "n"));

        let short = Whitelist::from_parallel(["type", "norm"], [Some("n")]);
        assert_eq!(short.entries().nth(1), Some(("norm", None)));
    }

    #[test]
    fn test_whitelist_repeated_names() {
        let whitelist = Whitelist::new().allow_value("type", "n").allow_value("type", "v");
        assert!(whitelist.permits("type", "v"));
        assert!(!whitelist.permits("type", "adj"));
        assert_eq!(whitelist.len(), 2);
    }

    #[test]
    fn test_whitelist_from_json() {
        let whitelist: Whitelist =
            serde_json::from_str(r#"{ "names": ["type", "xml:lang"], "values": ["n", null] }"#).unwrap();
        assert_eq!(whitelist, Whitelist::new().allow_value("type", "n").allow("xml:lang"));
    }

    #[test]
    fn test_valid_leaf_with_required_value() {
        let whitelist = Whitelist::new().allow_value("type", "n");
        let (doc, pos) = pos_with(r#" type="n""#, "n");
        assert!(is_valid_leaf(&doc, pos, Some(&whitelist)));

        let (doc, pos) = pos_with(r#" type="v""#, "v");
        assert!(!is_valid_leaf(&doc, pos, Some(&whitelist)));

        let (doc, pos) = pos_with(r#" type="n" norm="x""#, "n");
        assert!(!is_valid_leaf(&doc, pos, Some(&whitelist)));

        let (doc, pos) = pos_with(r#" type="n""#, "<hi>n</hi>");
        assert!(!is_valid_leaf(&doc, pos, Some(&whitelist)));
    }

    #[test]
    fn test_attributes_need_a_whitelist() {
        let (doc, pos) = pos_with(r#" type="n""#, "n");
        assert!(!is_valid_leaf(&doc, pos, None));

        let (doc, pos) = pos_with("", "n");
        assert!(is_valid_leaf(&doc, pos, None));
    }

    #[test]
    fn test_empty_element_is_a_leaf() {
        let (doc, pos) = pos_with("", "");
        assert!(is_valid_leaf(&doc, pos, None));
    }

    #[test]
    fn test_value_match_is_exact() {
        let whitelist = Whitelist::new().allow_value("type", "n");
        let (doc, pos) = pos_with(r#" type="N""#, "n");
        assert!(!is_valid_leaf(&doc, pos, Some(&whitelist)));
        let (doc, pos) = pos_with(r#" type="n ""#, "n");
        assert!(!is_valid_leaf(&doc, pos, Some(&whitelist)));
    }

    #[test]
    fn test_extract_rejects_root_and_attributes() {
        let mut doc = Document::parse_xml(r#"<entry><pos type="n">n</pos></entry>"#).unwrap();
        let before = doc.clone();
        let engine = QueryEngine::default();

        let outcome = engine.extract_leaf("/", &mut doc, None).unwrap();
        assert_eq!(outcome, LeafExtraction::Rejected(NodeRef::Node(doc.root())));

        let outcome = engine.extract_leaf("//pos/@type", &mut doc, None).unwrap();
        assert!(matches!(outcome, LeafExtraction::Rejected(NodeRef::Attribute { .. })));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_extract_boolean_result_is_not_found() {
        let mut doc = Document::parse_xml("<entry><pos>n</pos></entry>").unwrap();
        let engine = QueryEngine::default();
        let outcome = engine.extract_leaf("count(//pos) = 1", &mut doc, None).unwrap();
        assert_eq!(outcome, LeafExtraction::NotFound);
    }

    #[test]
    fn test_extract_propagates_malformed() {
        let mut doc = Document::parse_xml("<entry/>").unwrap();
        let engine = QueryEngine::default();
        assert!(matches!(
            engine.extract_leaf("//pos[", &mut doc, None),
            Err(EvalError::Malformed { .. })
        ));
    }
}
