use serde::{Deserialize, Serialize};

/// Settings for a [`QueryEngine`](crate::QueryEngine).
///
/// Every field has a default, so a JSON document only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Prefix under which extension functions are called, as in `fd:unbalanced-braces(...)`.
    pub namespace_prefix: String,
    pub namespace_uri: String,
    /// Deepest bracket nesting the bracket scanner accepts.
    pub bracket_stack_capacity: usize,
    /// Placed between joined node texts.
    pub separator: String,
    /// Stands in for a matched node without text.
    pub null_placeholder: String,
    /// Carried by [`JoinError::NoMatch`](crate::JoinError::NoMatch) when nothing matched.
    pub no_match_message: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: "fd".to_string(),
            namespace_uri: "http://freedict.org/freedict-editor".to_string(),
            bracket_stack_capacity: crate::brackets::DEFAULT_STACK_CAPACITY,
            separator: ", ".to_string(),
            null_placeholder: "(null)".to_string(),
            no_match_message: "No matching nodes!".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
