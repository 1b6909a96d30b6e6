//! An XPath 1.0 evaluator over any tree implementing [`DataSourceNode`],
//! extensible with boolean predicates bound to namespace URIs.

pub mod ast;
pub mod axes;
pub mod datasource;
pub mod engine;
pub mod error;
pub mod functions;
pub mod operators;
pub mod parser;

pub use ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, Step};
pub use datasource::{DataSourceNode, NodeType, QName};
pub use engine::{EvaluationContext, XPathValue, evaluate};

// Mock tree for downstream test suites
pub use datasource::tests;
pub use error::XPathError;
pub use functions::{FunctionRegistry, NamedPredicate};
pub use parser::{parse_expression, parse_prefix};
