#![allow(dead_code)]

use dictedit::{Document, NodeId};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A small TEI dictionary: three entries, the second with two part-of-speech
/// leaves and the third with an unbalanced translation.
pub const DICTIONARY: &str = r#"<TEI><text><body>
<entry><form><orth>cat</orth><pron>kæt</pron></form><gramGrp><pos type="n">n</pos></gramGrp><sense><tr>Katze</tr></sense></entry>
<entry><form><orth>run</orth></form><gramGrp><pos type="v">v</pos><pos type="n">n</pos></gramGrp><sense><tr>laufen</tr><note>(intransitive</note></sense></entry>
<entry><form><orth>bird</orth></form><gramGrp><pos type="n" norm="noun">n</pos></gramGrp><sense><tr>Vogel <hi>[zool.]</hi></tr></sense></entry>
</body></text></TEI>"#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn dictionary() -> Document {
    match Document::parse_xml(DICTIONARY) {
        Ok(doc) => doc,
        Err(e) => panic!("fixture does not parse: {}", e),
    }
}

/// The `n`-th (0-based) element called `name`, in document order.
pub fn nth_element(doc: &Document, name: &str, n: usize) -> NodeId {
    let mut found = 0;
    let mut stack = vec![doc.root()];
    while let Some(id) = stack.pop() {
        if doc.name(id) == Some(name) {
            if found == n {
                return id;
            }
            found += 1;
        }
        stack.extend(doc.children(id).iter().rev());
    }
    panic!("fewer than {} <{}> elements", n + 1, name);
}
