//! Pure functions for evaluating XPath binary operators.

use super::ast::BinaryOperator;
use super::engine::{XPathValue, string_to_number};
use crate::datasource::DataSourceNode;
use crate::error::XPathError;
use std::cmp::Ordering;

pub fn evaluate<'a, N: DataSourceNode<'a> + 'a>(
    op: BinaryOperator,
    left: XPathValue<N>,
    right: XPathValue<N>,
) -> Result<XPathValue<N>, XPathError> {
    use BinaryOperator::*;
    let value = match op {
        Or => XPathValue::Boolean(left.to_bool() || right.to_bool()),
        And => XPathValue::Boolean(left.to_bool() && right.to_bool()),
        Equals => XPathValue::Boolean(compare(&left, &right, |o| o == Ordering::Equal, true)),
        NotEquals => XPathValue::Boolean(compare(&left, &right, |o| o != Ordering::Equal, true)),
        LessThan => XPathValue::Boolean(compare(&left, &right, |o| o == Ordering::Less, false)),
        LessThanOrEqual => {
            XPathValue::Boolean(compare(&left, &right, |o| o != Ordering::Greater, false))
        }
        GreaterThan => {
            XPathValue::Boolean(compare(&left, &right, |o| o == Ordering::Greater, false))
        }
        GreaterThanOrEqual => {
            XPathValue::Boolean(compare(&left, &right, |o| o != Ordering::Less, false))
        }
        Plus => XPathValue::Number(left.to_number() + right.to_number()),
        Minus => XPathValue::Number(left.to_number() - right.to_number()),
        Multiply => XPathValue::Number(left.to_number() * right.to_number()),
        Divide => XPathValue::Number(left.to_number() / right.to_number()),
        Modulo => XPathValue::Number(left.to_number() % right.to_number()),
        Union => return evaluate_union(left, right),
    };
    Ok(value)
}

/// One side of a comparison after node-sets have been expanded into their string values.
enum Operand {
    Strings(Vec<String>),
    Number(f64),
    Boolean(bool),
    Str(String),
}

impl Operand {
    fn from_value<'a, N: DataSourceNode<'a>>(value: &XPathValue<N>) -> Self {
        match value {
            XPathValue::NodeSet(nodes) => {
                Operand::Strings(nodes.iter().map(|n| n.string_value()).collect())
            }
            XPathValue::Number(n) => Operand::Number(*n),
            XPathValue::Boolean(b) => Operand::Boolean(*b),
            XPathValue::String(s) => Operand::Str(s.clone()),
        }
    }
}

/// XPath 1.0 comparison. A node-set compares true if any of its members does;
/// `equality` selects the `=`/`!=` conversion rules, otherwise both sides are numbers.
fn compare<'a, N, F>(left: &XPathValue<N>, right: &XPathValue<N>, accept: F, equality: bool) -> bool
where
    N: DataSourceNode<'a>,
    F: Fn(Ordering) -> bool + Copy,
{
    let (l, r) = (Operand::from_value(left), Operand::from_value(right));
    match (l, r) {
        (Operand::Strings(ls), Operand::Strings(rs)) => ls
            .iter()
            .any(|a| rs.iter().any(|b| compare_scalar(a, b, accept, equality))),
        (Operand::Strings(ls), other) => ls.iter().any(|a| compare_against(a, &other, accept, equality, false)),
        (other, Operand::Strings(rs)) => rs.iter().any(|b| compare_against(b, &other, accept, equality, true)),
        (l, r) => compare_plain(&l, &r, accept, equality),
    }
}

fn compare_scalar<F: Fn(Ordering) -> bool>(a: &str, b: &str, accept: F, equality: bool) -> bool {
    if equality {
        accept(a.cmp(b))
    } else {
        numbers(string_to_number(a), string_to_number(b), accept)
    }
}

/// Compares one node's string value against a non-node-set operand.
/// `flipped` means the node value was on the right-hand side.
fn compare_against<F>(node_value: &str, other: &Operand, accept: F, equality: bool, flipped: bool) -> bool
where
    F: Fn(Ordering) -> bool + Copy,
{
    let node = Operand::Str(node_value.to_string());
    if flipped {
        compare_plain(other, &node, accept, equality)
    } else {
        compare_plain(&node, other, accept, equality)
    }
}

fn compare_plain<F: Fn(Ordering) -> bool>(l: &Operand, r: &Operand, accept: F, equality: bool) -> bool {
    if !equality {
        return numbers(as_number(l), as_number(r), accept);
    }
    match (l, r) {
        (Operand::Boolean(_), _) | (_, Operand::Boolean(_)) => accept(as_bool(l).cmp(&as_bool(r))),
        (Operand::Number(_), _) | (_, Operand::Number(_)) => numbers(as_number(l), as_number(r), accept),
        (Operand::Str(a), Operand::Str(b)) => accept(a.cmp(b)),
        _ => false,
    }
}

fn numbers<F: Fn(Ordering) -> bool>(a: f64, b: f64, accept: F) -> bool {
    // NaN compares false under every operator except `!=`.
    match a.partial_cmp(&b) {
        Some(o) => accept(o),
        None => accept(Ordering::Less) && accept(Ordering::Greater),
    }
}

fn as_number(op: &Operand) -> f64 {
    match op {
        Operand::Number(n) => *n,
        Operand::Boolean(b) => f64::from(u8::from(*b)),
        Operand::Str(s) => string_to_number(s),
        Operand::Strings(v) => v.first().map_or(f64::NAN, |s| string_to_number(s)),
    }
}

fn as_bool(op: &Operand) -> bool {
    match op {
        Operand::Number(n) => *n != 0.0 && !n.is_nan(),
        Operand::Boolean(b) => *b,
        Operand::Str(s) => !s.is_empty(),
        Operand::Strings(v) => !v.is_empty(),
    }
}

fn evaluate_union<'a, N: DataSourceNode<'a> + 'a>(
    left: XPathValue<N>,
    right: XPathValue<N>,
) -> Result<XPathValue<N>, XPathError> {
    match (left, right) {
        (XPathValue::NodeSet(mut merged), XPathValue::NodeSet(r_nodes)) => {
            merged.extend(r_nodes);
            merged.sort();
            merged.dedup();
            Ok(XPathValue::NodeSet(merged))
        }
        (l, r) => Err(XPathError::TypeError(format!(
            "both operands of '|' must be node-sets, got {} and {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::{MockNode, create_entry_tree};

    type Value<'a> = XPathValue<MockNode<'a>>;

    fn truthy(op: BinaryOperator, l: Value<'_>, r: Value<'_>) -> bool {
        evaluate(op, l, r).unwrap().to_bool()
    }

    #[test]
    fn test_logical_operators() {
        assert!(truthy(BinaryOperator::Or, Value::Boolean(true), Value::Boolean(false)));
        assert!(!truthy(BinaryOperator::And, Value::Boolean(true), Value::Boolean(false)));
    }

    #[test]
    fn test_arithmetic_operators() {
        let ten = || Value::Number(10.0);
        let three = || Value::Number(3.0);
        assert_eq!(evaluate(BinaryOperator::Minus, ten(), three()).unwrap().to_number(), 7.0);
        assert_eq!(evaluate(BinaryOperator::Modulo, ten(), three()).unwrap().to_number(), 1.0);
        let quotient = evaluate(BinaryOperator::Divide, ten(), three()).unwrap().to_number();
        assert!((quotient - 3.333).abs() < 0.001);
    }

    #[test]
    fn test_node_set_equality_is_existential() {
        let tree = create_entry_tree();
        let orths = || Value::NodeSet(vec![MockNode { id: 3, tree: &tree }, MockNode { id: 6, tree: &tree }]);
        assert!(truthy(BinaryOperator::Equals, orths(), Value::String("kitty".into())));
        assert!(truthy(BinaryOperator::Equals, Value::String("cat".into()), orths()));
        assert!(!truthy(BinaryOperator::Equals, orths(), Value::String("dog".into())));
        // Both members differ from "cat" in at least one case.
        assert!(truthy(BinaryOperator::NotEquals, orths(), Value::String("cat".into())));
        assert!(!truthy(BinaryOperator::Equals, Value::NodeSet(vec![]), Value::String("".into())));
    }

    #[test]
    fn test_nan_only_satisfies_not_equals() {
        let nan = || Value::Number(f64::NAN);
        assert!(!truthy(BinaryOperator::Equals, nan(), nan()));
        assert!(!truthy(BinaryOperator::LessThan, nan(), Value::Number(1.0)));
        assert!(truthy(BinaryOperator::NotEquals, nan(), nan()));
    }

    #[test]
    fn test_union_sorts_and_deduplicates() {
        let tree = create_entry_tree();
        let entry = MockNode { id: 1, tree: &tree };
        let orth = MockNode { id: 3, tree: &tree };
        let tr = MockNode { id: 13, tree: &tree };

        let result = evaluate(
            BinaryOperator::Union,
            Value::NodeSet(vec![tr, entry]),
            Value::NodeSet(vec![orth, tr]),
        )
        .unwrap();
        assert_eq!(result, Value::NodeSet(vec![entry, orth, tr]));
    }

    #[test]
    fn test_union_rejects_non_node_sets() {
        let err = evaluate(BinaryOperator::Union, Value::Number(1.0), Value::NodeSet(vec![])).unwrap_err();
        assert!(matches!(err, XPathError::TypeError(_)));
    }
}
