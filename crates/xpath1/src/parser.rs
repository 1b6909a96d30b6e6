//! A `nom`-based parser for the XPath 1.0 expression language.
//!
//! [`parse_prefix`] reports how far the parser got, so callers that expose
//! their parse cursor (see the engine's evaluation sessions) can publish it.

use super::ast::*;
use crate::error::XPathError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{map, map_res, not, opt, peek, recognize},
    error::ErrorKind,
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};
use std::cell::Cell;

/// How deeply parenthesized groups, predicates and function arguments may nest.
pub const MAX_NESTING_DEPTH: usize = 32;

/// How deep the parsed syntax tree may grow, counting every operator.
pub const MAX_EXPRESSION_DEPTH: usize = 128;

const TOO_DEEP: &str = "expression nested too deeply";

thread_local! {
    static NESTING: Cell<usize> = const { Cell::new(0) };
}

/// Parses a complete expression. Unconsumed input is an error.
pub fn parse_expression(input: &str) -> Result<Expression, XPathError> {
    let (expr, consumed) = parse_prefix(input)?;
    if consumed < input.len() {
        return Err(XPathError::Parse {
            expression: input.to_string(),
            position: consumed,
            reason: format!(
                "parser did not consume all input, remainder: '{}'",
                &input[consumed..]
            ),
        });
    }
    Ok(expr)
}

/// Parses the longest expression at the start of `input`.
///
/// Returns the expression and the byte offset the parser stopped at
/// (trailing whitespace counts as consumed). Expressions nested deeper than
/// [`MAX_NESTING_DEPTH`] or [`MAX_EXPRESSION_DEPTH`] are rejected.
pub fn parse_prefix(input: &str) -> Result<(Expression, usize), XPathError> {
    NESTING.with(|n| n.set(0));
    match ws(expression).parse(input) {
        Ok((_, expr)) if expr.depth() > MAX_EXPRESSION_DEPTH => Err(XPathError::Parse {
            expression: input.to_string(),
            position: 0,
            reason: TOO_DEEP.to_string(),
        }),
        Ok((rest, expr)) => Ok((expr, input.len() - rest.len())),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(XPathError::Parse {
            expression: input.to_string(),
            position: input.len() - e.input.len(),
            reason: describe_error(&e),
        }),
        Err(nom::Err::Incomplete(_)) => Err(XPathError::Parse {
            expression: input.to_string(),
            position: input.len(),
            reason: "unexpected end of expression".to_string(),
        }),
    }
}

fn describe_error(e: &nom::error::Error<&str>) -> String {
    if e.code == ErrorKind::TooLarge {
        return TOO_DEEP.to_string();
    }
    match e.input.trim_start().chars().next() {
        None => "unexpected end of expression".to_string(),
        Some(c) => format!("expected expression, found '{}'", c),
    }
}

fn too_deep(input: &str) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Failure(nom::error::Error::new(input, ErrorKind::TooLarge))
}

// --- Combinators ---

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

/// An operator name such as `and` that is not the start of a longer name.
fn keyword<'a>(
    word: &'static str,
) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(tag(word), not(satisfy(is_name_char)))
}

type ExprParser = fn(&str) -> IResult<&str, Expression>;
type OperatorParser = fn(&str) -> IResult<&str, BinaryOperator>;

/// Left-associative chain of `sub op sub op sub ...`.
fn binary_chain(
    input: &str,
    sub_expr: ExprParser,
    op: OperatorParser,
) -> IResult<&str, Expression> {
    let (rest, first) = sub_expr(input)?;
    let (rest, operands) = many0(pair(ws(op), sub_expr)).parse(rest)?;
    if operands.len() >= MAX_EXPRESSION_DEPTH {
        return Err(too_deep(input));
    }
    let expr = operands
        .into_iter()
        .fold(first, |left, (op, right)| Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        });
    Ok((rest, expr))
}

// --- Operators ---

fn or_operator(input: &str) -> IResult<&str, BinaryOperator> {
    map(keyword("or"), |_| BinaryOperator::Or).parse(input)
}

fn and_operator(input: &str) -> IResult<&str, BinaryOperator> {
    map(keyword("and"), |_| BinaryOperator::And).parse(input)
}

fn equality_operator(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(tag("!="), |_| BinaryOperator::NotEquals),
        map(tag("="), |_| BinaryOperator::Equals),
    ))
    .parse(input)
}

fn relational_operator(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(alt((tag("<="), tag("&lt;="))), |_| {
            BinaryOperator::LessThanOrEqual
        }),
        map(alt((tag(">="), tag("&gt;="))), |_| {
            BinaryOperator::GreaterThanOrEqual
        }),
        map(alt((tag("<"), tag("&lt;"))), |_| BinaryOperator::LessThan),
        map(alt((tag(">"), tag("&gt;"))), |_| BinaryOperator::GreaterThan),
    ))
    .parse(input)
}

fn additive_operator(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(char('+'), |_| BinaryOperator::Plus),
        map(char('-'), |_| BinaryOperator::Minus),
    ))
    .parse(input)
}

fn multiplicative_operator(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(char('*'), |_| BinaryOperator::Multiply),
        map(keyword("div"), |_| BinaryOperator::Divide),
        map(keyword("mod"), |_| BinaryOperator::Modulo),
    ))
    .parse(input)
}

fn union_operator(input: &str) -> IResult<&str, BinaryOperator> {
    map(char('|'), |_| BinaryOperator::Union).parse(input)
}

// --- Expressions, loosest binding first ---

fn expression(input: &str) -> IResult<&str, Expression> {
    let depth = NESTING.with(|n| {
        n.set(n.get() + 1);
        n.get()
    });
    let result = if depth > MAX_NESTING_DEPTH {
        Err(too_deep(input))
    } else {
        binary_chain(input, and_expr, or_operator)
    };
    NESTING.with(|n| n.set(n.get() - 1));
    result
}

fn and_expr(input: &str) -> IResult<&str, Expression> {
    binary_chain(input, equality_expr, and_operator)
}

fn equality_expr(input: &str) -> IResult<&str, Expression> {
    binary_chain(input, relational_expr, equality_operator)
}

fn relational_expr(input: &str) -> IResult<&str, Expression> {
    binary_chain(input, additive_expr, relational_operator)
}

fn additive_expr(input: &str) -> IResult<&str, Expression> {
    binary_chain(input, multiplicative_expr, additive_operator)
}

fn multiplicative_expr(input: &str) -> IResult<&str, Expression> {
    binary_chain(input, unary_expr, multiplicative_operator)
}

fn unary_expr(input: &str) -> IResult<&str, Expression> {
    let (i, minus) = opt(ws(char('-'))).parse(input)?;
    let (i, expr) = union_expr(i)?;
    let expr = match minus {
        Some(_) => Expression::UnaryOp {
            op: UnaryOperator::Minus,
            expr: Box::new(expr),
        },
        None => expr,
    };
    Ok((i, expr))
}

fn union_expr(input: &str) -> IResult<&str, Expression> {
    binary_chain(input, path_expr, union_operator)
}

/// A location path, or a primary expression optionally continued by steps.
fn path_expr(input: &str) -> IResult<&str, Expression> {
    // Primary first: `count(x)` would otherwise be read as a step named `count`.
    let (i, start) = alt((filter_expr, map(location_path, Expression::LocationPath))).parse(input)?;
    let (i, more) = continued_steps(i)?;
    if more.is_empty() {
        return Ok((i, start));
    }

    let (start_point, is_absolute, mut steps) = match start {
        Expression::LocationPath(lp) => (lp.start_point, lp.is_absolute, lp.steps),
        other => (Some(Box::new(other)), false, vec![]),
    };
    steps.extend(more);
    Ok((
        i,
        Expression::LocationPath(LocationPath {
            start_point,
            is_absolute,
            steps,
        }),
    ))
}

/// Zero or more `/step` or `//step` continuations, with `//` expanded.
fn continued_steps(input: &str) -> IResult<&str, Vec<Step>> {
    let (i, pairs) = many0(pair(alt((tag("//"), tag("/"))), step)).parse(input)?;
    let mut steps = Vec::with_capacity(pairs.len());
    for (sep, next) in pairs {
        if sep == "//" {
            steps.push(Step::descendant_or_self());
        }
        steps.push(next);
    }
    Ok((i, steps))
}

/// A primary expression followed by optional predicates.
fn filter_expr(input: &str) -> IResult<&str, Expression> {
    let (i, base) = primary_expr(input)?;
    let (i, predicates) = many0(predicate).parse(i)?;
    if predicates.is_empty() {
        return Ok((i, base));
    }
    Ok((
        i,
        Expression::Filter {
            base: Box::new(base),
            predicates,
        },
    ))
}

fn primary_expr(input: &str) -> IResult<&str, Expression> {
    ws(alt((
        variable_reference,
        map(number_literal, Expression::Number),
        map(string_literal, Expression::Literal),
        function_call,
        delimited(ws(char('(')), expression, ws(char(')'))),
    )))
    .parse(input)
}

// --- Literals ---

/// `Digits ('.' Digits?)? | '.' Digits`. Deliberately narrower than
/// `nom::number::double`, which would read element names like `info` as infinity.
fn number_literal(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(alt((
            recognize(pair(digit1, opt(pair(char('.'), opt(digit1))))),
            recognize(pair(char('.'), digit1)),
        ))),
        str::parse::<f64>,
    )
    .parse(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        str::to_string,
    )
    .parse(input)
}

fn variable_reference(input: &str) -> IResult<&str, Expression> {
    map(preceded(char('$'), q_name), Expression::Variable).parse(input)
}

// --- Names and node tests ---

fn nc_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_name_char),
    ))
    .parse(input)
}

fn q_name(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(nc_name, opt(pair(char(':'), nc_name)))),
        str::to_string,
    )
    .parse(input)
}

const NODE_TYPE_NAMES: [&str; 4] = ["text", "node", "comment", "processing-instruction"];

fn node_type_test(input: &str) -> IResult<&str, NodeTest> {
    map(
        terminated(
            alt((
                tag("text"),
                tag("node"),
                tag("comment"),
                tag("processing-instruction"),
            )),
            pair(ws(char('(')), char(')')),
        ),
        |kind: &str| {
            NodeTest::NodeType(match kind {
                "text" => NodeTypeTest::Text,
                "comment" => NodeTypeTest::Comment,
                "processing-instruction" => NodeTypeTest::ProcessingInstruction,
                _ => NodeTypeTest::Node,
            })
        },
    )
    .parse(input)
}

pub fn node_test(input: &str) -> IResult<&str, NodeTest> {
    alt((
        map(char('*'), |_| NodeTest::Wildcard),
        node_type_test,
        map(q_name, NodeTest::Name),
    ))
    .parse(input)
}

// --- Steps and paths ---

fn axis(input: &str) -> IResult<&str, Axis> {
    terminated(
        alt((
            map(tag("child"), |_| Axis::Child),
            map(tag("descendant-or-self"), |_| Axis::DescendantOrSelf),
            map(tag("descendant"), |_| Axis::Descendant),
            map(tag("attribute"), |_| Axis::Attribute),
            map(tag("parent"), |_| Axis::Parent),
            map(tag("ancestor"), |_| Axis::Ancestor),
            map(tag("self"), |_| Axis::SelfAxis),
            map(tag("following-sibling"), |_| Axis::FollowingSibling),
            map(tag("preceding-sibling"), |_| Axis::PrecedingSibling),
            map(tag("following"), |_| Axis::Following),
            map(tag("preceding"), |_| Axis::Preceding),
        )),
        tag("::"),
    )
    .parse(input)
}

fn predicate(input: &str) -> IResult<&str, Expression> {
    delimited(ws(char('[')), expression, ws(char(']'))).parse(input)
}

fn step(input: &str) -> IResult<&str, Step> {
    let any_node = || NodeTest::NodeType(NodeTypeTest::Node);
    let (i, (axis, node_test)) = alt((
        map(tag(".."), |_| (Axis::Parent, any_node())),
        map(char('.'), |_| (Axis::SelfAxis, any_node())),
        map(preceded(char('@'), node_test), |nt| (Axis::Attribute, nt)),
        map(pair(opt(axis), node_test), |(ax, nt)| {
            (ax.unwrap_or(Axis::Child), nt)
        }),
    ))
    .parse(input)?;
    let (i, predicates) = many0(predicate).parse(i)?;
    Ok((
        i,
        Step {
            axis,
            node_test,
            predicates,
        },
    ))
}

/// A path that does not start with a filter expression.
fn location_path(input: &str) -> IResult<&str, LocationPath> {
    let (i, is_absolute, mut steps) = if let Some(rest) = input.strip_prefix("//") {
        let (rest, first) = step(rest)?;
        (rest, true, vec![Step::descendant_or_self(), first])
    } else if let Some(rest) = input.strip_prefix('/') {
        match step(rest) {
            Ok((rest, first)) => (rest, true, vec![first]),
            // A bare `/` selects the root.
            Err(nom::Err::Error(_)) => (rest, true, vec![]),
            Err(e) => return Err(e),
        }
    } else {
        let (rest, first) = step(input)?;
        (rest, false, vec![first])
    };

    let (i, more) = continued_steps(i)?;
    steps.extend(more);
    Ok((
        i,
        LocationPath {
            start_point: None,
            is_absolute,
            steps,
        },
    ))
}

fn function_call(input: &str) -> IResult<&str, Expression> {
    // The lookahead keeps `foo` in `foo/bar` from being read as a call.
    let (i, name) = q_name(input)?;
    let (i, _) = peek(ws(char('('))).parse(i)?;

    // `text()` and friends are node tests, handled by the step parser.
    if NODE_TYPE_NAMES.contains(&name.as_str()) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }

    let (i, _) = multispace0(i)?;
    let (i, args) = delimited(
        char('('),
        separated_list0(ws(char(',')), expression),
        ws(char(')')),
    )
    .parse(i)?;

    Ok((i, Expression::FunctionCall { name, args }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str) -> Step {
        Step {
            axis: Axis::Child,
            node_test: NodeTest::Name(name.into()),
            predicates: vec![],
        }
    }

    fn relative(steps: Vec<Step>) -> Expression {
        Expression::LocationPath(LocationPath {
            start_point: None,
            is_absolute: false,
            steps,
        })
    }

    #[test]
    fn test_parse_absolute_entry_path() {
        let result = parse_expression("/entry/form/orth").unwrap();
        assert_eq!(
            result,
            Expression::LocationPath(LocationPath {
                start_point: None,
                is_absolute: true,
                steps: vec![child("entry"), child("form"), child("orth")],
            })
        );
    }

    #[test]
    fn test_parse_descendant_shorthand() {
        let result = parse_expression("//orth").unwrap();
        assert_eq!(
            result,
            Expression::LocationPath(LocationPath {
                start_point: None,
                is_absolute: true,
                steps: vec![Step::descendant_or_self(), child("orth")],
            })
        );
    }

    #[test]
    fn test_parse_dot_and_dot_dot() {
        let Expression::LocationPath(lp) = parse_expression(".//tr").unwrap() else {
            panic!("expected location path");
        };
        assert_eq!(lp.steps.len(), 3);
        assert_eq!(lp.steps[0].axis, Axis::SelfAxis);
        assert_eq!(lp.steps[1], Step::descendant_or_self());
        assert_eq!(lp.steps[2], child("tr"));

        let Expression::LocationPath(lp) = parse_expression("../pos").unwrap() else {
            panic!("expected location path");
        };
        assert_eq!(lp.steps[0].axis, Axis::Parent);
    }

    #[test]
    fn test_parse_attribute_predicate() {
        let result = parse_expression("usg[@type = 'dom']").unwrap();
        let attr_path = relative(vec![Step {
            axis: Axis::Attribute,
            node_test: NodeTest::Name("type".into()),
            predicates: vec![],
        }]);
        let mut expected = child("usg");
        expected.predicates.push(Expression::BinaryOp {
            left: Box::new(attr_path),
            op: BinaryOperator::Equals,
            right: Box::new(Expression::Literal("dom".into())),
        });
        assert_eq!(result, relative(vec![expected]));
    }

    #[test]
    fn test_parse_numeric_predicate() {
        let mut expected = child("sense");
        expected.predicates.push(Expression::Number(2.0));
        assert_eq!(parse_expression("sense[2]").unwrap(), relative(vec![expected]));
    }

    #[test]
    fn test_parse_prefixed_function_with_union_argument() {
        let expr =
            parse_expression("//entry[fd:unbalanced-braces(.//orth | .//tr | .//note)]").unwrap();
        assert_eq!(expr.called_functions(), vec!["fd:unbalanced-braces"]);

        let Expression::LocationPath(lp) = expr else {
            panic!("expected location path");
        };
        let Expression::FunctionCall { args, .. } = &lp.steps[1].predicates[0] else {
            panic!("expected function call predicate");
        };
        assert_eq!(args.len(), 1);
        assert!(matches!(
            args[0],
            Expression::BinaryOp {
                op: BinaryOperator::Union,
                ..
            }
        ));
    }

    #[test]
    fn test_names_that_look_like_numbers_are_steps() {
        assert_eq!(parse_expression("info").unwrap(), relative(vec![child("info")]));
        assert_eq!(parse_expression("nan").unwrap(), relative(vec![child("nan")]));
    }

    #[test]
    fn test_parse_filter_expression() {
        let Expression::Filter { base, predicates } = parse_expression("(//orth)[2]").unwrap() else {
            panic!("expected filter expression");
        };
        assert!(base.is_location_path());
        assert_eq!(predicates, vec![Expression::Number(2.0)]);
    }

    #[test]
    fn test_parse_operator_precedence() {
        assert_eq!(
            parse_expression("1 + 2 * 3").unwrap(),
            Expression::BinaryOp {
                left: Box::new(Expression::Number(1.0)),
                op: BinaryOperator::Plus,
                right: Box::new(Expression::BinaryOp {
                    left: Box::new(Expression::Number(2.0)),
                    op: BinaryOperator::Multiply,
                    right: Box::new(Expression::Number(3.0)),
                }),
            }
        );
    }

    #[test]
    fn test_parse_unary_minus() {
        assert_eq!(
            parse_expression("-5").unwrap(),
            Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(Expression::Number(5.0)),
            }
        );
    }

    #[test]
    fn test_parse_entity_operators() {
        let Expression::BinaryOp { op, .. } = parse_expression("count(sense) &gt;= 2").unwrap() else {
            panic!("expected binary op");
        };
        assert_eq!(op, BinaryOperator::GreaterThanOrEqual);
    }

    #[test]
    fn test_parse_path_from_variable() {
        let Expression::LocationPath(lp) = parse_expression("$entry/form/orth").unwrap() else {
            panic!("expected location path");
        };
        assert_eq!(
            lp.start_point.as_deref(),
            Some(&Expression::Variable("entry".into()))
        );
        assert_eq!(lp.steps, vec![child("form"), child("orth")]);
    }

    #[test]
    fn test_prefix_reports_unconsumed_input() {
        let (_, consumed) = parse_prefix("/entry/form ]]").unwrap();
        assert_eq!(consumed, "/entry/form ".len());

        let err = parse_expression("/entry/form ]]").unwrap_err();
        assert!(matches!(err, XPathError::Parse { position: 12, .. }));
    }

    #[test]
    fn test_unparseable_expression_is_an_error() {
        assert!(matches!(
            parse_expression("]["),
            Err(XPathError::Parse { position: 0, .. })
        ));
        assert!(parse_expression("").is_err());
    }

    fn reason(err: XPathError) -> String {
        match err {
            XPathError::Parse { reason, .. } => reason,
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_reasons_are_readable() {
        assert_eq!(reason(parse_expression("").unwrap_err()), "unexpected end of expression");
        assert_eq!(
            reason(parse_expression("  ][").unwrap_err()),
            "expected expression, found ']'"
        );
    }

    #[test]
    fn test_keywords_need_a_word_boundary() {
        for (input, stop) in [("//orth orth", 7), ("//orth andx", 7), ("1 = 2 orth", 6), ("3 divide", 2)] {
            let (_, consumed) = parse_prefix(input).unwrap();
            assert_eq!(consumed, stop, "{}", input);
            assert!(parse_expression(input).is_err(), "{}", input);
        }
        assert!(parse_expression("//orth or//tr").unwrap().is_binary_op());
        assert!(parse_expression("1 and(2)").unwrap().is_binary_op());
        assert!(parse_expression("6 mod 4 div 2").unwrap().is_binary_op());
    }

    #[test]
    fn test_names_starting_with_keywords_are_steps() {
        assert_eq!(parse_expression("order").unwrap(), relative(vec![child("order")]));
        assert_eq!(parse_expression("android").unwrap(), relative(vec![child("android")]));
    }

    #[test]
    fn test_deep_parentheses_are_rejected() {
        let shallow = format!("{}1 = 1{}", "(".repeat(20), ")".repeat(20));
        assert!(parse_expression(&shallow).is_ok());

        let deep = format!("{}1 = 1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(reason(parse_expression(&deep).unwrap_err()), "expression nested too deeply");
    }

    #[test]
    fn test_deep_predicates_are_rejected() {
        let deep = format!("{}x{}", "a[".repeat(100), "]".repeat(100));
        assert_eq!(reason(parse_expression(&deep).unwrap_err()), "expression nested too deeply");
    }

    #[test]
    fn test_long_operator_chains_are_rejected() {
        let long = format!("1{}", " + 1".repeat(500));
        assert_eq!(reason(parse_expression(&long).unwrap_err()), "expression nested too deeply");

        let union = format!("//orth{}", " | //tr".repeat(50));
        assert_eq!(parse_expression(&union).unwrap().depth(), 51);
    }

    #[test]
    fn test_tree_depth_limit_spans_groups() {
        let mut expr = "1".to_string();
        for _ in 0..10 {
            expr = format!("({}){}", expr, " + 1".repeat(15));
        }
        assert!(parse_expression(&expr).unwrap_err().to_string().contains("nested too deeply"));
    }

    #[test]
    fn test_expression_depth() {
        assert_eq!(parse_expression("1").unwrap().depth(), 1);
        assert_eq!(parse_expression("count(//entry[orth = 'a'])").unwrap().depth(), 4);
    }
}
