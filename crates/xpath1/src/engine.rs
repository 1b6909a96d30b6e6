//! The evaluation engine for executing a parsed XPath AST against a generic `DataSourceNode`.

use super::ast::{Axis, Expression, LocationPath, NodeTest, NodeTypeTest, Step, UnaryOperator};
use super::functions::{self, FunctionRegistry};
use super::{axes, operators};
use crate::datasource::{DataSourceNode, NodeType};
use crate::error::XPathError;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum XPathValue<N> {
    /// Nodes in document order, without duplicates.
    NodeSet(Vec<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<'a, N: DataSourceNode<'a>> XPathValue<N> {
    /// XPath 1.0 `boolean()` conversion.
    pub fn to_bool(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::Boolean(b) => *b,
        }
    }

    /// XPath 1.0 `number()` conversion.
    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::Number(n) => *n,
            XPathValue::Boolean(true) => 1.0,
            XPathValue::Boolean(false) => 0.0,
            other => string_to_number(&other.to_string()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::String(_) => "string",
            XPathValue::Number(_) => "number",
            XPathValue::Boolean(_) => "boolean",
        }
    }
}

pub(crate) fn string_to_number(s: &str) -> f64 {
    s.trim().parse().unwrap_or(f64::NAN)
}

impl<'a, N: DataSourceNode<'a>> fmt::Display for XPathValue<N> {
    /// XPath 1.0 `string()` conversion: a node-set yields its first node's string value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XPathValue::NodeSet(nodes) => match nodes.first() {
                Some(n) => f.write_str(&n.string_value()),
                None => Ok(()),
            },
            XPathValue::String(s) => f.write_str(s),
            XPathValue::Number(n) if n.is_nan() => f.write_str("NaN"),
            XPathValue::Number(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            XPathValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            XPathValue::Number(n) => write!(f, "{}", n),
            XPathValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// All state needed while evaluating an expression.
/// `'a` is the lifetime of the underlying tree, `'d` of the borrowed registry and interrupt flag.
pub struct EvaluationContext<'a, 'd, N: DataSourceNode<'a>> {
    pub context_node: N,
    pub root_node: N,
    pub functions: &'d FunctionRegistry,
    pub context_position: usize, // 1-based
    pub context_size: usize,
    interrupt: Option<&'d AtomicBool>,
    _marker: PhantomData<&'a ()>,
}

impl<'a, 'd, N: DataSourceNode<'a>> EvaluationContext<'a, 'd, N> {
    pub fn new(context_node: N, root_node: N, functions: &'d FunctionRegistry) -> Self {
        Self {
            context_node,
            root_node,
            functions,
            context_position: 1,
            context_size: 1,
            interrupt: None,
            _marker: PhantomData,
        }
    }

    /// Makes evaluation stop with [`XPathError::Interrupted`] once `flag` is set.
    ///
    /// The flag is checked before each location step, for each context node
    /// of a step and before each predicate test.
    pub fn with_interrupt(mut self, flag: &'d AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    fn for_node(&self, node: N, position: usize, size: usize) -> Self {
        Self {
            context_node: node,
            root_node: self.root_node,
            functions: self.functions,
            context_position: position,
            context_size: size,
            interrupt: self.interrupt,
            _marker: PhantomData,
        }
    }

    fn check_interrupt(&self) -> Result<(), XPathError> {
        match self.interrupt {
            Some(flag) if flag.load(Ordering::Acquire) => {
                log::debug!("Interrupt flag set, stopping evaluation");
                Err(XPathError::Interrupted)
            }
            _ => Ok(()),
        }
    }
}

/// Evaluates a compiled expression and returns a concrete `XPathValue`.
pub fn evaluate<'a, N>(
    expr: &Expression,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XPathValue<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    match expr {
        Expression::Literal(s) => Ok(XPathValue::String(s.clone())),
        Expression::Number(n) => Ok(XPathValue::Number(*n)),
        Expression::LocationPath(path) => Ok(XPathValue::NodeSet(evaluate_location_path(path, e_ctx)?)),
        Expression::Variable(name) => Err(XPathError::UnknownVariable(name.clone())),
        Expression::FunctionCall { name, args } => {
            let evaluated = args
                .iter()
                .map(|arg| evaluate(arg, e_ctx))
                .collect::<Result<Vec<_>, _>>()?;
            functions::evaluate_function(name, evaluated, e_ctx)
        }
        Expression::BinaryOp { left, op, right } => {
            let left_val = evaluate(left, e_ctx)?;
            let right_val = evaluate(right, e_ctx)?;
            operators::evaluate(*op, left_val, right_val)
        }
        Expression::UnaryOp { op, expr } => {
            let val = evaluate(expr, e_ctx)?;
            match op {
                UnaryOperator::Minus => Ok(XPathValue::Number(-val.to_number())),
            }
        }
        Expression::Filter { base, predicates } => match evaluate(base, e_ctx)? {
            XPathValue::NodeSet(nodes) => {
                Ok(XPathValue::NodeSet(apply_predicates(nodes, predicates, e_ctx)?))
            }
            other => Err(XPathError::TypeError(format!(
                "predicates can only filter a node-set, not a {}",
                other.type_name()
            ))),
        },
    }
}

fn evaluate_location_path<'a, N>(
    path: &LocationPath,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut current_nodes = if let Some(start_expr) = &path.start_point {
        match evaluate(start_expr, e_ctx)? {
            XPathValue::NodeSet(nodes) => nodes,
            other => {
                return Err(XPathError::TypeError(format!(
                    "cannot apply a location step to a {}",
                    other.type_name()
                )));
            }
        }
    } else if path.is_absolute {
        vec![e_ctx.root_node]
    } else {
        vec![e_ctx.context_node]
    };

    for step in &path.steps {
        e_ctx.check_interrupt()?;
        current_nodes = evaluate_step(step, &current_nodes, e_ctx)?;
    }
    Ok(current_nodes)
}

/// Evaluates one step for every context node and merges the results in document order.
fn evaluate_step<'a, N>(
    step: &Step,
    context_nodes: &[N],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut merged = Vec::new();
    for &node in context_nodes {
        e_ctx.check_interrupt()?;
        let candidates = collect_axis_nodes(step.axis, node);
        let tested = filter_by_node_test(&candidates, &step.node_test, step.axis);
        merged.extend(apply_predicates(tested, &step.predicates, e_ctx)?);
    }
    if context_nodes.len() > 1 || is_reverse_axis(step.axis) {
        merged.sort();
        merged.dedup();
    }
    Ok(merged)
}

fn is_reverse_axis(axis: Axis) -> bool {
    matches!(
        axis,
        Axis::Parent | Axis::Ancestor | Axis::PrecedingSibling | Axis::Preceding
    )
}

/// Stage 1: nodes along `axis`, in proximity order (nearest first for reverse axes).
fn collect_axis_nodes<'a, N>(axis: Axis, node: N) -> Vec<N>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut results = Vec::new();
    match axis {
        Axis::Child => axes::collect_child_nodes(node, &mut results),
        Axis::Attribute => axes::collect_attribute_nodes(node, &mut results),
        Axis::Descendant => axes::collect_descendant_nodes(node, &mut results),
        Axis::DescendantOrSelf => axes::collect_descendant_or_self_nodes(node, &mut results),
        Axis::Parent => axes::collect_parent_nodes(node, &mut results),
        Axis::Ancestor => axes::collect_ancestor_nodes(node, &mut results),
        Axis::SelfAxis => results.push(node),
        Axis::FollowingSibling => axes::collect_following_sibling_nodes(node, &mut results),
        Axis::PrecedingSibling => axes::collect_preceding_sibling_nodes(node, &mut results),
        Axis::Following => axes::collect_following_nodes(node, &mut results),
        Axis::Preceding => axes::collect_preceding_nodes(node, &mut results),
    }
    results
}

/// Stage 2: keeps the nodes that pass the step's node test.
fn filter_by_node_test<'a, N>(nodes: &[N], test: &NodeTest, axis: Axis) -> Vec<N>
where
    N: DataSourceNode<'a> + 'a,
{
    // The principal node type: attributes on the attribute axis, elements elsewhere.
    let principal = if axis == Axis::Attribute {
        NodeType::Attribute
    } else {
        NodeType::Element
    };
    nodes
        .iter()
        .filter(|node| match test {
            NodeTest::Wildcard => node.node_type() == principal,
            NodeTest::Name(wanted) => {
                let local = wanted.rsplit(':').next().unwrap_or(wanted);
                node.node_type() == principal
                    && node.name().is_some_and(|q| q.local_part == local)
            }
            NodeTest::NodeType(NodeTypeTest::Text) => node.node_type() == NodeType::Text,
            NodeTest::NodeType(NodeTypeTest::Comment) => node.node_type() == NodeType::Comment,
            NodeTest::NodeType(NodeTypeTest::ProcessingInstruction) => {
                node.node_type() == NodeType::ProcessingInstruction
            }
            NodeTest::NodeType(NodeTypeTest::Node) => true,
        })
        .copied()
        .collect()
}

/// Stage 3: filters by each predicate in turn, re-numbering positions after each one.
fn apply_predicates<'a, N>(
    nodes: Vec<N>,
    predicates: &[Expression],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut survivors = nodes;
    for predicate in predicates {
        let size = survivors.len();
        let mut kept = Vec::with_capacity(size);
        for (i, node) in survivors.into_iter().enumerate() {
            e_ctx.check_interrupt()?;
            let result = evaluate(predicate, &e_ctx.for_node(node, i + 1, size))?;
            let keep = match result {
                XPathValue::Number(n) => n == (i + 1) as f64,
                other => other.to_bool(),
            };
            if keep {
                kept.push(node);
            }
        }
        survivors = kept;
    }
    Ok(survivors)
}
