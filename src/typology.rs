//! Label/value tables for the editor's option menus (TEI typologies).
//!
//! Labels carry GTK-style `_` mnemonics; [`Label::text`] strips them.
//! Index 0 of every table is the "none" entry with an empty value.

use crate::leaf::Whitelist;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    pub label: &'static str,
    pub value: &'static str,
}

impl Label {
    const fn new(label: &'static str, value: &'static str) -> Self {
        Self { label, value }
    }

    /// The label without mnemonic markers.
    pub fn text(&self) -> String {
        self.label.replace('_', "")
    }
}

const CROSS_REFERENCE: &[Label] = &[
    Label::new("Undetermined", ""),
    Label::new("Antonym", "ant"),
    Label::new("Hypernym", "hyper"),
    Label::new("Hyponym", "hypo"),
    Label::new("Synonym", "syn"),
    Label::new("Derived from", "der"),
];

const PART_OF_SPEECH: &[Label] = &[
    Label::new("None", ""),
    Label::new("_Noun", "n"),
    Label::new("Verb", "v"),
    Label::new("Transitive Verb", "vt"),
    Label::new("Intransitive Verb", "vi"),
    Label::new("Transitive and intransitive Verb", "vti"),
    Label::new("Adverb", "adv"),
    Label::new("_Adjective", "adj"),
    Label::new("Conjunction", "conj"),
    Label::new("_Preposition", "prep"),
    Label::new("_Interjection", "interj"),
    Label::new("Pronoun", "pron"),
    Label::new("Article", "art"),
    Label::new("Numeral", "num"),
    Label::new("Imitative", "imit"),
    Label::new("Abbreviation", "abbr"),
    Label::new("Phrase", "phra"),
];

const GENDER: &[Label] = &[
    Label::new("None", ""),
    Label::new("Masculine", "m"),
    Label::new("_Feminine", "f"),
    Label::new("Neuter", "n"),
    Label::new("Common", "i"),
    Label::new("Masc. & Fem.", "mf"),
    Label::new("Masc., Fem. & Neut.", "mfn"),
];

const NUMBER: &[Label] = &[
    Label::new("None", ""),
    Label::new("_Singular", "sg"),
    Label::new("Dual", "du"),
    Label::new("Plural", "pl"),
];

// Encoded as <usg type="dom">agr</usg>
const DOMAIN: &[Label] = &[
    Label::new("_None", ""),
    Label::new("_Agriculture", "agr"),
    Label::new("Astronomy", "astr"),
    Label::new("Automobile", "aut"),
    Label::new("_Biology", "bio"),
    Label::new("B_otany", "bot"),
    Label::new("_Chemistry", "chem"),
    Label::new("_Electrotechnics", "el"),
    Label::new("_Finance", "fin"),
    Label::new("_Geography", "geo"),
    Label::new("Geolog_y", "geol"),
    Label::new("Grammar", "gram"),
    Label::new("_History", "hist"),
    Label::new("_Information Technology", "it"),
    Label::new("_Law", "law"),
    Label::new("_Mathematics", "math"),
    Label::new("Me_dicine", "med"),
    Label::new("Military", "mil"),
    Label::new("M_usic", "mus"),
    Label::new("Myth_ology", "myt"),
    Label::new("_Physics", "phy"),
    Label::new("Politics", "pol"),
    Label::new("_Religion", "rel"),
    Label::new("_Sexual", "sex"),
    Label::new("Sport", "sport"),
    Label::new("_Technology", "tech"),
];

// Encoded as <usg type="reg">official</usg>
const REGISTER: &[Label] = &[
    Label::new("_None", ""),
    Label::new("_Official", "official"),
    Label::new("_Formal", "formal"),
    Label::new("Ch_ildren Speech", "chil"),
    Label::new("_Colloquial", "col"),
    Label::new("_Slang", "slang"),
    Label::new("_Vulgar", "vulg"),
    Label::new("_Taboo", "taboo"),
    Label::new("_Ironic", "ironic"),
    Label::new("_Facetious", "facetious"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Typology {
    CrossReference,
    PartOfSpeech,
    Gender,
    Number,
    Domain,
    Register,
}

impl Typology {
    pub const ALL: [Typology; 6] = [
        Typology::CrossReference,
        Typology::PartOfSpeech,
        Typology::Gender,
        Typology::Number,
        Typology::Domain,
        Typology::Register,
    ];

    pub fn labels(self) -> &'static [Label] {
        match self {
            Typology::CrossReference => CROSS_REFERENCE,
            Typology::PartOfSpeech => PART_OF_SPEECH,
            Typology::Gender => GENDER,
            Typology::Number => NUMBER,
            Typology::Domain => DOMAIN,
            Typology::Register => REGISTER,
        }
    }

    /// The value at menu position `index`.
    pub fn index_to_value(self, index: usize) -> Option<&'static str> {
        self.labels().get(index).map(|l| l.value)
    }

    /// The menu position of `value`. A missing value selects the "none" entry.
    pub fn value_to_index(self, value: Option<&str>) -> Option<usize> {
        match value {
            None => Some(0),
            Some(value) => self.labels().iter().position(|l| l.value == value),
        }
    }

    /// Allows `attribute` with any non-empty value of this typology.
    pub fn whitelist(self, attribute: &str) -> Whitelist {
        self.labels()
            .iter()
            .filter(|l| !l.value.is_empty())
            .fold(Whitelist::new(), |list, l| list.allow_value(attribute, l.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_and_value_lookups() {
        assert_eq!(Typology::PartOfSpeech.index_to_value(1), Some("n"));
        assert_eq!(Typology::PartOfSpeech.index_to_value(99), None);
        assert_eq!(Typology::Gender.value_to_index(Some("mf")), Some(5));
        assert_eq!(Typology::Gender.value_to_index(Some("x")), None);
        assert_eq!(Typology::Number.value_to_index(None), Some(0));
    }

    #[test]
    fn test_every_table_starts_with_none() {
        for typology in Typology::ALL {
            assert_eq!(typology.index_to_value(0), Some(""), "{:?}", typology);
            for (i, label) in typology.labels().iter().enumerate() {
                assert_eq!(typology.value_to_index(Some(label.value)), Some(i));
            }
        }
    }

    #[test]
    fn test_label_text_strips_mnemonics() {
        assert_eq!(DOMAIN[5].text(), "Botany");
        assert_eq!(REGISTER[3].text(), "Children Speech");
    }

    #[test]
    fn test_whitelist_from_typology() {
        let whitelist = Typology::CrossReference.whitelist("type");
        assert_eq!(whitelist.len(), 5);
        assert!(whitelist.permits("type", "syn"));
        assert!(!whitelist.permits("type", ""));
        assert!(!whitelist.permits("type", "foo"));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Typology::PartOfSpeech).unwrap(), "\"part-of-speech\"");
        let parsed: Typology = serde_json::from_str("\"register\"").unwrap();
        assert_eq!(parsed, Typology::Register);
    }
}
