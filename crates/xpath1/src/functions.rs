//! The function table: XPath 1.0 core functions plus namespace-bound extension predicates.

use super::engine::{EvaluationContext, XPathValue, string_to_number};
use crate::datasource::DataSourceNode;
use crate::error::XPathError;
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// A boolean extension function callable from expressions as `prefix:name(node-set)`.
///
/// The evaluator hands the predicate the string values of the argument's
/// nodes lazily and in document order, so an implementation that returns as
/// soon as it has an answer never materializes the remaining values.
pub trait NamedPredicate: Send + Sync {
    fn test(&self, contents: &mut dyn Iterator<Item = String>) -> bool;
}

/// Namespace bindings and the extension predicates registered under them.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    /// prefix -> namespace URI
    namespaces: HashMap<String, String>,
    /// (namespace URI, local name) -> predicate
    predicates: HashMap<(String, String), Arc<dyn NamedPredicate>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `prefix` to `uri`, returning the URI it was previously bound to.
    pub fn register_namespace(&mut self, prefix: &str, uri: &str) -> Option<String> {
        self.namespaces.insert(prefix.to_string(), uri.to_string())
    }

    /// Registers `predicate` as `{uri}local_name`, replacing any earlier registration.
    pub fn register_predicate(
        &mut self,
        uri: &str,
        local_name: &str,
        predicate: Arc<dyn NamedPredicate>,
    ) -> Option<Arc<dyn NamedPredicate>> {
        self.predicates
            .insert((uri.to_string(), local_name.to_string()), predicate)
    }

    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }

    /// Resolves a prefixed function name such as `fd:unbalanced-braces`.
    pub fn resolve(&self, qualified_name: &str) -> Result<&Arc<dyn NamedPredicate>, XPathError> {
        let Some((prefix, local)) = qualified_name.split_once(':') else {
            return Err(XPathError::function(qualified_name, "Unknown XPath function"));
        };
        let uri = self
            .namespace_uri(prefix)
            .ok_or_else(|| XPathError::UnboundPrefix(prefix.to_string()))?;
        self.predicates
            .get(&(uri.to_string(), local.to_string()))
            .ok_or_else(|| {
                XPathError::function(
                    qualified_name,
                    format!("No extension function '{}' in namespace '{}'", local, uri),
                )
            })
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self
            .predicates
            .keys()
            .map(|(uri, local)| format!("{{{}}}{}", uri, local))
            .collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("namespaces", &self.namespaces)
            .field("predicates", &names)
            .finish()
    }
}

/// Dispatches a function call to the matching implementation.
pub fn evaluate_function<'a, 'd, N: DataSourceNode<'a>>(
    name: &str,
    args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, 'd, N>,
) -> Result<XPathValue<N>, XPathError> {
    let value = match name {
        // Node-set
        "last" => {
            arity(name, &args, 0..=0)?;
            XPathValue::Number(e_ctx.context_size as f64)
        }
        "position" => {
            arity(name, &args, 0..=0)?;
            XPathValue::Number(e_ctx.context_position as f64)
        }
        "count" => {
            arity(name, &args, 1..=1)?;
            XPathValue::Number(node_set_arg(name, args)?.len() as f64)
        }
        "local-name" | "name" => {
            arity(name, &args, 0..=1)?;
            let node = match args.into_iter().next() {
                None => Some(e_ctx.context_node),
                Some(arg) => node_set_arg(name, vec![arg])?.first().copied(),
            };
            let q_name = node.and_then(|n| n.name());
            XPathValue::String(match (name, q_name) {
                (_, None) => String::new(),
                ("name", Some(q)) => match q.prefix {
                    Some(prefix) => format!("{}:{}", prefix, q.local_part),
                    None => q.local_part.to_string(),
                },
                (_, Some(q)) => q.local_part.to_string(),
            })
        }

        // String
        "string" => {
            arity(name, &args, 0..=1)?;
            XPathValue::String(string_or_context(args, e_ctx))
        }
        "concat" => {
            if args.len() < 2 {
                return Err(XPathError::function(name, "Expected at least 2 arguments"));
            }
            XPathValue::String(args.iter().map(ToString::to_string).collect())
        }
        "starts-with" | "contains" | "substring-before" | "substring-after" => {
            arity(name, &args, 2..=2)?;
            let (haystack, needle) = (args[0].to_string(), args[1].to_string());
            match name {
                "starts-with" => XPathValue::Boolean(haystack.starts_with(&needle)),
                "contains" => XPathValue::Boolean(haystack.contains(&needle)),
                "substring-before" => XPathValue::String(
                    haystack
                        .split_once(&needle)
                        .map(|(before, _)| before.to_string())
                        .unwrap_or_default(),
                ),
                _ => XPathValue::String(
                    haystack
                        .split_once(&needle)
                        .map(|(_, after)| after.to_string())
                        .unwrap_or_default(),
                ),
            }
        }
        "substring" => {
            arity(name, &args, 2..=3)?;
            XPathValue::String(substring(
                &args[0].to_string(),
                args[1].to_number(),
                args.get(2).map(XPathValue::to_number),
            ))
        }
        "string-length" => {
            arity(name, &args, 0..=1)?;
            XPathValue::Number(string_or_context(args, e_ctx).chars().count() as f64)
        }
        "normalize-space" => {
            arity(name, &args, 0..=1)?;
            let s = string_or_context(args, e_ctx);
            XPathValue::String(s.split_whitespace().collect::<Vec<_>>().join(" "))
        }
        "translate" => {
            arity(name, &args, 3..=3)?;
            let from: Vec<char> = args[1].to_string().chars().collect();
            let to: Vec<char> = args[2].to_string().chars().collect();
            let translated = args[0]
                .to_string()
                .chars()
                .filter_map(|c| match from.iter().position(|&f| f == c) {
                    Some(i) => to.get(i).copied(),
                    None => Some(c),
                })
                .collect();
            XPathValue::String(translated)
        }

        // Boolean
        "boolean" => {
            arity(name, &args, 1..=1)?;
            XPathValue::Boolean(args[0].to_bool())
        }
        "not" => {
            arity(name, &args, 1..=1)?;
            XPathValue::Boolean(!args[0].to_bool())
        }
        "true" | "false" => {
            arity(name, &args, 0..=0)?;
            XPathValue::Boolean(name == "true")
        }

        // Number
        "number" => {
            arity(name, &args, 0..=1)?;
            match args.first() {
                Some(arg) => XPathValue::Number(arg.to_number()),
                None => XPathValue::Number(string_to_number(&e_ctx.context_node.string_value())),
            }
        }
        "sum" => {
            arity(name, &args, 1..=1)?;
            let total = node_set_arg(name, args)?
                .iter()
                .map(|n| string_to_number(&n.string_value()))
                .sum();
            XPathValue::Number(total)
        }
        "floor" | "ceiling" | "round" => {
            arity(name, &args, 1..=1)?;
            let n = args[0].to_number();
            XPathValue::Number(match name {
                "floor" => n.floor(),
                "ceiling" => n.ceil(),
                // XPath rounds halves towards positive infinity.
                _ => (n + 0.5).floor(),
            })
        }

        qualified if qualified.contains(':') => {
            let predicate = e_ctx.functions.resolve(qualified)?;
            arity(qualified, &args, 1..=1)?;
            let nodes = node_set_arg(qualified, args)?;
            let mut contents = nodes.iter().map(|n| n.string_value());
            XPathValue::Boolean(predicate.test(&mut contents))
        }
        unknown => return Err(XPathError::function(unknown, "Unknown XPath function")),
    };
    Ok(value)
}

fn arity<N>(
    function: &str,
    args: &[XPathValue<N>],
    expected: RangeInclusive<usize>,
) -> Result<(), XPathError> {
    if expected.contains(&args.len()) {
        return Ok(());
    }
    let message = if expected.start() == expected.end() {
        format!("Expected {} argument(s), got {}", expected.start(), args.len())
    } else {
        format!(
            "Expected {} to {} arguments, got {}",
            expected.start(),
            expected.end(),
            args.len()
        )
    };
    Err(XPathError::function(function, message))
}

fn node_set_arg<N>(function: &str, args: Vec<XPathValue<N>>) -> Result<Vec<N>, XPathError> {
    match args.into_iter().next() {
        Some(XPathValue::NodeSet(nodes)) => Ok(nodes),
        Some(_) => Err(XPathError::TypeError(format!(
            "{}() expects a node-set argument",
            function
        ))),
        None => Err(XPathError::function(function, "Missing node-set argument")),
    }
}

fn string_or_context<'a, N: DataSourceNode<'a>>(
    args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> String {
    match args.first() {
        Some(arg) => arg.to_string(),
        None => e_ctx.context_node.string_value(),
    }
}

/// XPath `substring()`: 1-based, rounded positions, counted in characters.
fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let first = start.round();
    let end = match length {
        Some(len) => first + len.round(),
        None => f64::INFINITY,
    };
    if first.is_nan() || end.is_nan() {
        return String::new();
    }
    s.chars()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (*i + 1) as f64;
            pos >= first && pos < end
        })
        .map(|(_, c)| c)
        .collect()
}
