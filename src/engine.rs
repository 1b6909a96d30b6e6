//! The query engine: expression evaluation inside a published, abortable session.

use crate::brackets::{BracketScanner, UNBALANCED_BRACES, UnbalancedBraces};
use crate::config::EngineConfig;
use crate::error::EvalError;
use crate::nodeset::{OwnedNodeSet, QueryResult, materialize};
use crate::session::{EvaluationSession, SessionPhase, SessionSlot};
use dictedit_tree::{Document, NodeRef};
use dictedit_xpath1::{
    EvaluationContext, FunctionRegistry, NamedPredicate, XPathValue, evaluate, parse_prefix,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct QueryEngine {
    config: EngineConfig,
    functions: FunctionRegistry,
    slot: SessionSlot,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl QueryEngine {
    /// Binds the configured namespace and registers `unbalanced-braces` in it.
    pub fn new(config: EngineConfig) -> Self {
        let mut functions = FunctionRegistry::new();
        functions.register_namespace(&config.namespace_prefix, &config.namespace_uri);
        let scanner = BracketScanner::with_capacity(config.bracket_stack_capacity);
        functions.register_predicate(
            &config.namespace_uri,
            UNBALANCED_BRACES,
            Arc::new(UnbalancedBraces::new(scanner)),
        );
        log::debug!(
            "Registered {}:{} for namespace {}",
            config.namespace_prefix,
            UNBALANCED_BRACES,
            config.namespace_uri
        );
        Self {
            config,
            functions,
            slot: SessionSlot::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Adds another predicate to the engine's namespace.
    pub fn register_predicate(&mut self, local_name: &str, predicate: Arc<dyn NamedPredicate>) {
        if self
            .functions
            .register_predicate(&self.config.namespace_uri, local_name, predicate)
            .is_some()
        {
            log::warn!("Replaced extension function {}:{}", self.config.namespace_prefix, local_name);
        }
    }

    /// The slot that the engine's own helpers (`find_node_set`, `extract_leaf`,
    /// `join_text` and so on) publish their sessions into. Give a clone to a monitor.
    pub fn session_slot(&self) -> SessionSlot {
        self.slot.clone()
    }

    /// Evaluates `expression` against `doc`, publishing the session in `slot`
    /// for the duration of the call.
    ///
    /// Node-set results are returned in document order and without any
    /// borrow of `doc`.
    pub fn evaluate(
        &self,
        expression: &str,
        doc: &Document,
        slot: &SessionSlot,
    ) -> Result<QueryResult, EvalError> {
        let published = slot.publish(Arc::new(EvaluationSession::new(expression)));
        let session = published.session();

        let (ast, consumed) =
            parse_prefix(expression).map_err(|e| EvalError::from_xpath(expression, e))?;
        session.advance(consumed, SessionPhase::Evaluating);
        if consumed < expression.len() {
            return Err(EvalError::Malformed {
                expression: expression.to_string(),
                position: consumed,
                reason: format!("unexpected '{}'", &expression[consumed..]),
            });
        }

        let root = doc.root_node();
        let e_ctx = EvaluationContext::new(root, root, &self.functions)
            .with_interrupt(session.interrupt_flag());
        let value = evaluate(&ast, &e_ctx).map_err(|e| EvalError::from_xpath(expression, e))?;

        match value {
            XPathValue::NodeSet(nodes) => Ok(QueryResult::NodeSet(materialize(&nodes))),
            XPathValue::Boolean(b) => Ok(QueryResult::Boolean(b)),
            other => {
                log::debug!("'{}' evaluated to a {}", expression, other.type_name());
                Err(EvalError::NoResult {
                    expression: expression.to_string(),
                })
            }
        }
    }

    /// [`evaluate`](Self::evaluate) through the engine's own slot, as a node set.
    pub fn find_node_set(&self, expression: &str, doc: &Document) -> Result<OwnedNodeSet, EvalError> {
        Ok(self.evaluate(expression, doc, &self.slot)?.into_node_set())
    }

    /// The first match of a query that should match at most once.
    pub fn find_single_node(&self, expression: &str, doc: &Document) -> Result<Option<NodeRef>, EvalError> {
        let nodes = self.find_node_set(expression, doc)?;
        Ok(first_match(expression, &nodes))
    }

    /// Entries containing headwords, translations, notes, definitions or
    /// quotations with unbalanced brackets.
    pub fn entries_with_unbalanced_braces(&self, doc: &Document) -> Result<OwnedNodeSet, EvalError> {
        let expression = format!(
            "//entry[{}:{}(.//orth | .//tr | .//note | .//def | .//q)]",
            self.config.namespace_prefix, UNBALANCED_BRACES
        );
        self.find_node_set(&expression, doc)
    }
}

/// Takes the first of `nodes`, warning when there was more than one.
pub(crate) fn first_match(expression: &str, nodes: &OwnedNodeSet) -> Option<NodeRef> {
    if nodes.len() > 1 {
        log::warn!(
            "{} matching nodes for '{}' (only 1 expected). Taking first.",
            nodes.len(),
            expression
        );
    }
    nodes.first()
}
