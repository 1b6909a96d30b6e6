use dictedit_tree::TreeError;
use dictedit_xpath1::XPathError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    /// Syntax error, or input left over after the longest valid expression.
    #[error("Malformed expression '{expression}' at offset {position}: {reason}")]
    Malformed {
        expression: String,
        position: usize,
        reason: String,
    },

    /// The expression evaluated to a string or number instead of a node-set or boolean.
    #[error("Expression '{expression}' produced no node-set or boolean result")]
    NoResult { expression: String },

    /// A monitor asked for the session to stop.
    #[error("Evaluation of '{expression}' was aborted")]
    Aborted { expression: String },

    #[error("Evaluation of '{expression}' failed: {source}")]
    Evaluation {
        expression: String,
        source: XPathError,
    },

    #[error("Document update failed: {0}")]
    Tree(#[from] TreeError),
}

impl EvalError {
    pub(crate) fn from_xpath(expression: &str, error: XPathError) -> Self {
        let expression = expression.to_string();
        match error {
            XPathError::Parse {
                position, reason, ..
            } => EvalError::Malformed {
                expression,
                position,
                reason,
            },
            XPathError::Interrupted => EvalError::Aborted { expression },
            source => EvalError::Evaluation { expression, source },
        }
    }
}

#[derive(Error, Debug)]
pub enum JoinError {
    /// Nothing matched; `placeholder` is meant to be shown instead of the joined text.
    #[error("{placeholder}")]
    NoMatch { placeholder: String },

    #[error(transparent)]
    Eval(#[from] EvalError),
}
