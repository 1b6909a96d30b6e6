use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XPathError {
    /// The expression could not be parsed. `position` is the byte offset
    /// where the parser stopped.
    #[error("XPath parse error in '{expression}' at offset {position}: {reason}")]
    Parse {
        expression: String,
        position: usize,
        reason: String,
    },

    #[error("Function '{function}' error: {message}")]
    FunctionError { function: String, message: String },

    #[error("Namespace prefix '{0}' is not bound")]
    UnboundPrefix(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Variable '{0}' not found")]
    UnknownVariable(String),

    #[error("Evaluation interrupted")]
    Interrupted,
}

impl XPathError {
    pub(crate) fn function(function: &str, message: impl Into<String>) -> Self {
        XPathError::FunctionError {
            function: function.to_string(),
            message: message.into(),
        }
    }
}
