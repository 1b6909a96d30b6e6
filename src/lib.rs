//! Query, validation and leaf-extraction engine for TEI dictionary documents.
//!
//! Expressions are evaluated with [`QueryEngine::evaluate`], which publishes
//! each evaluation in a [`SessionSlot`] so another thread can watch it and
//! abort it. On top of that the engine validates and lifts out text-only
//! leaf elements ([`QueryEngine::extract_leaf`]) and flattens results into
//! display strings ([`QueryEngine::join_text`]).

pub mod brackets;
pub mod config;
pub mod engine;
pub mod error;
pub mod join;
pub mod leaf;
pub mod nodeset;
pub mod session;
pub mod typology;

pub use brackets::{BracketScanner, UnbalancedBraces, has_unbalanced_brackets};
pub use config::EngineConfig;
pub use engine::QueryEngine;
pub use error::{EvalError, JoinError};
pub use join::truncate_utf8;
pub use leaf::{LeafExtraction, Whitelist, is_valid_leaf};
pub use nodeset::{OwnedNodeSet, QueryResult, materialize};
pub use session::{EvaluationSession, SessionPhase, SessionSlot};
pub use typology::{Label, Typology};

// Document model and evaluator, re-exported for callers
pub use dictedit_tree::{Detached, Document, NodeId, NodeKind, NodeRef, TreeError};
pub use dictedit_xpath1::NamedPredicate;
