//! Flattening query results into short display strings.

use crate::engine::QueryEngine;
use crate::error::{EvalError, JoinError};
use crate::nodeset::OwnedNodeSet;
use dictedit_tree::{Document, NodeId, NodeRef};

const HEADWORD_PATH: &str = "/entry/form/orth";
const NO_HEADWORDS: &str = "No nodes (form/orth)!";

/// Cuts `text` to at most `max_bytes` bytes without splitting a character.
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn node_text(doc: &Document, node: NodeRef) -> String {
    match node {
        NodeRef::Node(id) => doc.text_content(id),
        NodeRef::Attribute { owner, index } => doc
            .attributes(owner)
            .get(index)
            .map(|a| a.value.clone())
            .unwrap_or_default(),
    }
}

impl QueryEngine {
    /// Joins the text of every node `expression` matches, in document order.
    ///
    /// Nodes without text show up as the configured null placeholder. An
    /// empty result fails with [`JoinError::NoMatch`] carrying the configured
    /// no-match message.
    pub fn join_text(&self, expression: &str, doc: &Document, max_bytes: usize) -> Result<String, JoinError> {
        let nodes = self.find_node_set(expression, doc)?;
        self.join_nodes(doc, &nodes, max_bytes, &self.config().no_match_message)
    }

    /// The headwords of `entry`, joined, for entry lists and window titles.
    ///
    /// The entry is copied into a document of its own first, so the query
    /// cannot reach beyond it.
    pub fn entry_headwords(&self, doc: &Document, entry: NodeId, max_bytes: usize) -> Result<String, JoinError> {
        let isolated = doc.copy_subtree(entry).map_err(EvalError::from)?;
        let nodes = self.find_node_set(HEADWORD_PATH, &isolated)?;
        self.join_nodes(&isolated, &nodes, max_bytes, NO_HEADWORDS)
    }

    fn join_nodes(
        &self,
        doc: &Document,
        nodes: &OwnedNodeSet,
        max_bytes: usize,
        no_match: &str,
    ) -> Result<String, JoinError> {
        if nodes.is_empty() {
            return Err(JoinError::NoMatch {
                placeholder: no_match.to_string(),
            });
        }
        let config = self.config();
        let joined = nodes
            .iter()
            .map(|node| {
                let text = node_text(doc, node);
                log::trace!("Joining {:?}: {:?}", node, text);
                if text.is_empty() {
                    config.null_placeholder.clone()
                } else {
                    text
                }
            })
            .collect::<Vec<_>>()
            .join(&config.separator);
        Ok(truncate_utf8(&joined, max_bytes).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate_utf8("Katze", 10), "Katze");
        assert_eq!(truncate_utf8("Katze", 3), "Kat");
        // 'ä' is two bytes; cutting inside it backs off to before it.
        assert_eq!(truncate_utf8("Kätzchen", 2), "K");
        assert_eq!(truncate_utf8("Kätzchen", 3), "Kä");
        assert_eq!(truncate_utf8("日本", 4), "日");
        assert_eq!(truncate_utf8("日本", 0), "");
    }

    #[test]
    fn test_join_with_placeholder() {
        let doc = Document::parse_xml("<entry><orth>a</orth><orth/><orth>c</orth></entry>").unwrap();
        let engine = QueryEngine::default();
        assert_eq!(engine.join_text("//orth", &doc, 100).unwrap(), "a, (null), c");
        assert_eq!(engine.join_text("//orth", &doc, 4).unwrap(), "a, (");
    }

    #[test]
    fn test_join_no_match() {
        let doc = Document::parse_xml("<entry><orth>a</orth></entry>").unwrap();
        let engine = QueryEngine::default();
        match engine.join_text("//tr", &doc, 100) {
            Err(JoinError::NoMatch { placeholder }) => assert_eq!(placeholder, "No matching nodes!"),
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_join_attribute_values() {
        let doc = Document::parse_xml(r#"<entry><pos type="n"/><pos type="v"/></entry>"#).unwrap();
        let engine = QueryEngine::default();
        assert_eq!(engine.join_text("//pos/@type", &doc, 100).unwrap(), "n, v");
    }

    #[test]
    fn test_entry_headwords_stay_inside_the_entry() {
        let doc = Document::parse_xml(
            "<body><entry><form><orth>cat</orth></form><form><orth>kitty</orth></form></entry>\
             <entry><form><orth>dog</orth></form></entry><entry><sense/></entry></body>",
        )
        .unwrap();
        let body = doc.document_element().unwrap();
        let entries = doc.children(body).to_vec();
        let engine = QueryEngine::default();

        assert_eq!(engine.entry_headwords(&doc, entries[0], 50).unwrap(), "cat, kitty");
        assert_eq!(engine.entry_headwords(&doc, entries[1], 50).unwrap(), "dog");
        match engine.entry_headwords(&doc, entries[2], 50) {
            Err(JoinError::NoMatch { placeholder }) => assert_eq!(placeholder, "No nodes (form/orth)!"),
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }
}
