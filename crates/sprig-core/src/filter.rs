//! Node filters
//!
//! A [`Filter`] is an immutable predicate. Anything a filter is configured
//! with (patterns, indexes, function arguments) is captured when the selector
//! is compiled, and the only per-call input is the [`MatchContext`]. Compiled
//! patterns can therefore be shared between threads and queries.

use crate::error::{Error, Result};
use crate::finder::NodeQueryFinder;
use crate::node::{NodeGraph, NodeId};
use crate::pattern::CompiledPattern;
use crate::traversal::Strategy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Per-evaluation context handed to filters
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'g> {
    pub graph: &'g NodeGraph,
    /// Frontier node the candidate was reached from
    pub origin: NodeId,
    /// Traversal order for nested `{selector}` queries
    pub strategy: Strategy,
    /// Node cap for nested `{selector}` queries
    pub node_limit: Option<usize>,
}

impl<'g> MatchContext<'g> {
    pub fn new(graph: &'g NodeGraph, origin: NodeId) -> Self {
        Self {
            graph,
            origin,
            strategy: Strategy::default(),
            node_limit: None,
        }
    }

    /// Run nested queries with the enclosing finder's traversal settings
    pub fn with_traversal(mut self, strategy: Strategy, node_limit: Option<usize>) -> Self {
        self.strategy = strategy;
        self.node_limit = node_limit;
        self
    }
}

/// Predicate contributed through the filter registry
pub trait NodeFilter: Send + Sync + fmt::Debug {
    fn accepts(&self, ctx: &MatchContext<'_>, node: NodeId) -> bool;
}

/// Closure-backed [`NodeFilter`]
pub struct FnFilter<F> {
    name: String,
    predicate: F,
}

impl<F> FnFilter<F>
where
    F: Fn(&MatchContext<'_>, NodeId) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> NodeFilter for FnFilter<F>
where
    F: Fn(&MatchContext<'_>, NodeId) -> bool + Send + Sync,
{
    fn accepts(&self, ctx: &MatchContext<'_>, node: NodeId) -> bool {
        (self.predicate)(ctx, node)
    }
}

impl<F> fmt::Debug for FnFilter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFilter").field("name", &self.name).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────────────────────────────────────

/// One `key=value` argument of a function clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterArg {
    pub key: String,
    pub value: String,
    /// Quoted values are regular expressions, bare values are literals
    pub quoted: bool,
}

/// Arguments of a function clause, in source order
///
/// Positional arguments are stored under their position ("0", "1", ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterArgs {
    args: Vec<FilterArg>,
}

impl FilterArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_named(&mut self, key: impl Into<String>, value: impl Into<String>, quoted: bool) {
        self.args.push(FilterArg {
            key: key.into(),
            value: value.into(),
            quoted,
        });
    }

    /// Add an unnamed argument keyed by its position in the argument list
    pub fn push_positional(&mut self, value: impl Into<String>, quoted: bool) {
        let key = self.args.len().to_string();
        self.push_named(key, value, quoted);
    }

    /// Builder-style named argument (bare value)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_named(key, value, false);
        self
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterArg> {
        self.args.iter()
    }

    pub fn arg(&self, key: &str) -> Option<&FilterArg> {
        self.args.iter().find(|a| a.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.arg(key).map(|a| a.value.as_str())
    }

    /// First argument present under any of `keys`
    pub fn first_of(&self, keys: &[&str]) -> Option<&FilterArg> {
        keys.iter().find_map(|k| self.arg(k))
    }

    /// Argument under any of `keys`, or an invalid-argument error for `function`
    pub fn require(&self, function: &str, keys: &[&str]) -> Result<&FilterArg> {
        self.first_of(keys).ok_or_else(|| {
            Error::invalid_argument(function, format!("missing argument '{}'", keys.join("' or '")))
        })
    }

    /// Matching pattern for an argument under any of `keys`
    pub fn require_pattern(&self, function: &str, keys: &[&str]) -> Result<Regex> {
        let arg = self.require(function, keys)?;
        if arg.quoted {
            anchored_regex(&arg.value)
        } else {
            literal_regex(&arg.value)
        }
    }

    /// Integer argument under any of `keys`
    pub fn require_usize(&self, function: &str, keys: &[&str]) -> Result<usize> {
        let arg = self.require(function, keys)?;
        arg.value.trim().parse().map_err(|_| {
            Error::invalid_argument(function, format!("'{}' is not a non-negative integer", arg.value))
        })
    }

    /// Reject arguments for functions that take none
    pub fn expect_none(&self, function: &str) -> Result<()> {
        if self.args.is_empty() {
            Ok(())
        } else {
            Err(Error::invalid_argument(
                function,
                format!("takes no arguments, got {}", self.args.len()),
            ))
        }
    }
}

impl fmt::Display for FilterArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if arg.key != i.to_string() {
                write!(f, "{}=", arg.key)?;
            }
            if arg.quoted {
                write!(f, "'{}'", arg.value)?;
            } else {
                f.write_str(&arg.value)?;
            }
        }
        Ok(())
    }
}

/// Regex matching exactly `literal`
pub fn literal_regex(literal: &str) -> Result<Regex> {
    anchored(&regex::escape(literal), literal)
}

/// Regex matching whole strings against `pattern`
pub fn anchored_regex(pattern: &str) -> Result<Regex> {
    anchored(pattern, pattern)
}

fn anchored(body: &str, source: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})$", body)).map_err(|e| Error::InvalidRegex {
        pattern: source.to_string(),
        source: e,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Filter algebra
// ─────────────────────────────────────────────────────────────────────────────

/// A node predicate inside a compiled stage
#[derive(Debug, Clone)]
pub enum Filter {
    /// Accepts every node (`*`)
    Any,
    /// Declared name matches
    Name(Regex),
    /// Some attribute name matches and, when given, its value matches too
    Attribute { name: Regex, value: Option<Regex> },
    /// Sibling index equals; nodes without an index never match
    Index(usize),
    /// Direct neighbor of the origin
    Immediate,
    /// The origin itself
    Origin,
    /// Registry function resolved at compile time
    Function {
        name: String,
        args: FilterArgs,
        filter: Arc<dyn NodeFilter>,
    },
    /// Nested selector yields at least one match from the candidate
    Has(Box<CompiledPattern>),
}

impl Filter {
    /// Name filter from a regular expression
    pub fn name(pattern: &str) -> Result<Self> {
        Ok(Self::Name(anchored_regex(pattern)?))
    }

    /// Attribute filter from regular expressions
    pub fn attribute(name: &str, value: Option<&str>) -> Result<Self> {
        Ok(Self::Attribute {
            name: anchored_regex(name)?,
            value: value.map(anchored_regex).transpose()?,
        })
    }

    pub fn accepts(&self, ctx: &MatchContext<'_>, node: NodeId) -> bool {
        let graph = ctx.graph;
        match self {
            Self::Any => true,
            Self::Name(pattern) => graph.name(node).is_some_and(|n| pattern.is_match(n)),
            Self::Attribute { name, value } => graph.get(node).is_some_and(|n| {
                n.attributes().any(|(k, v)| {
                    name.is_match(k) && value.as_ref().map_or(true, |p| p.is_match(v))
                })
            }),
            Self::Index(index) => graph.index(node) == Some(*index),
            Self::Immediate => graph.neighbors(ctx.origin).contains(&node),
            Self::Origin => node == ctx.origin,
            Self::Function { filter, .. } => filter.accepts(ctx, node),
            Self::Has(pattern) => {
                let mut finder = NodeQueryFinder::new(graph, pattern).with_strategy(ctx.strategy);
                if let Some(limit) = ctx.node_limit {
                    finder = finder.with_node_limit(limit);
                }
                finder.find_first(node).is_some()
            }
        }
    }
}

impl NodeFilter for Filter {
    fn accepts(&self, ctx: &MatchContext<'_>, node: NodeId) -> bool {
        Filter::accepts(self, ctx, node)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Name(pattern) => write!(f, "name ~ {}", pattern.as_str()),
            Self::Attribute { name, value: None } => write!(f, "[{}]", name.as_str()),
            Self::Attribute {
                name,
                value: Some(value),
            } => write!(f, "[{} = {}]", name.as_str(), value.as_str()),
            Self::Index(index) => write!(f, "#{}", index),
            Self::Immediate => f.write_str("adjacent()"),
            Self::Origin => f.write_str("self()"),
            Self::Function { name, args, .. } => write!(f, "{}({})", name, args),
            Self::Has(pattern) => write!(f, "{{{}}}", pattern.source()),
        }
    }
}
