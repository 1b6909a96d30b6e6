//! Abstract syntax tree for XPath 1.0 expressions.

/// A parsed expression, ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(String),
    Number(f64),
    LocationPath(LocationPath),
    Variable(String),
    /// A call to a built-in (`count`) or prefixed extension (`fd:unbalanced-braces`) function.
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
    /// A primary expression filtered by predicates, like `(//orth)[1]`.
    Filter {
        base: Box<Expression>,
        predicates: Vec<Expression>,
    },
}

impl Expression {
    pub fn is_location_path(&self) -> bool {
        matches!(self, Expression::LocationPath(_))
    }

    pub fn is_binary_op(&self) -> bool {
        matches!(self, Expression::BinaryOp { .. })
    }

    /// Names of every function called anywhere in the expression, in source order.
    pub fn called_functions(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_functions(&mut names);
        names
    }

    /// Length of the longest chain of nested sub-expressions, counting this one.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((expr, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            expr.for_each_child(|child| pending.push((child, depth + 1)));
        }
        deepest
    }

    fn collect_functions<'e>(&'e self, out: &mut Vec<&'e str>) {
        if let Expression::FunctionCall { name, .. } = self {
            out.push(name);
        }
        self.for_each_child(|child| child.collect_functions(out));
    }

    /// Direct sub-expressions, in source order.
    fn for_each_child<'e>(&'e self, mut visit: impl FnMut(&'e Expression)) {
        match self {
            Expression::FunctionCall { args, .. } => args.iter().for_each(visit),
            Expression::BinaryOp { left, right, .. } => {
                visit(left.as_ref());
                visit(right.as_ref());
            }
            Expression::UnaryOp { expr, .. } => visit(expr.as_ref()),
            Expression::Filter { base, predicates } => {
                visit(base.as_ref());
                predicates.iter().for_each(visit);
            }
            Expression::LocationPath(path) => {
                if let Some(start) = &path.start_point {
                    visit(start.as_ref());
                }
                path.steps
                    .iter()
                    .flat_map(|step| &step.predicates)
                    .for_each(visit);
            }
            Expression::Literal(_) | Expression::Number(_) | Expression::Variable(_) => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Union,
}

/// A location path such as `/entry/form/orth`, `.//tr` or `$e/sense[1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    /// A filter expression the path continues from (`$var/foo`, `f()/foo`).
    pub start_point: Option<Box<Expression>>,
    /// Starts at the document root. Ignored when `start_point` is set.
    pub is_absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expression>,
}

impl Step {
    /// The `descendant-or-self::node()` step that `//` abbreviates.
    pub fn descendant_or_self() -> Self {
        Step {
            axis: Axis::DescendantOrSelf,
            node_test: NodeTest::NodeType(NodeTypeTest::Node),
            predicates: vec![],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Attribute,
    Parent,
    Ancestor,
    SelfAxis,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// A name test (`orth`, `xml:lang`). Only the local part is compared.
    Name(String),
    /// `*`
    Wildcard,
    /// `text()`, `node()`, ...
    NodeType(NodeTypeTest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTypeTest {
    Text,
    Node,
    Comment,
    ProcessingInstruction,
}
