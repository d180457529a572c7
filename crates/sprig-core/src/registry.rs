//! Function filter registry
//!
//! Maps the name used in a `name(args)` clause to a factory producing the
//! filter. Factories run when a selector is compiled, so unknown names and
//! malformed arguments are compile errors rather than match-time surprises.

use crate::error::{Error, Result};
use crate::filter::{Filter, FilterArgs, FnFilter, MatchContext, NodeFilter};
use crate::node::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Factory building a configured filter from clause arguments
pub type FilterFactory = dyn Fn(&FilterArgs) -> Result<Arc<dyn NodeFilter>> + Send + Sync;

static GLOBAL: Lazy<RwLock<FilterRegistry>> =
    Lazy::new(|| RwLock::new(FilterRegistry::with_builtins()));

/// Name -> filter factory table
#[derive(Clone, Default)]
pub struct FilterRegistry {
    factories: HashMap<String, Arc<FilterFactory>>,
}

impl FilterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in functions
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry);
        registry
    }

    /// Process-wide registry used when no registry is given explicitly
    pub fn global() -> &'static RwLock<FilterRegistry> {
        &GLOBAL
    }

    /// Register a function in the process-wide registry
    pub fn register_global<F>(name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn(&FilterArgs) -> Result<Arc<dyn NodeFilter>> + Send + Sync + 'static,
    {
        let mut registry = GLOBAL
            .write()
            .map_err(|e| Error::Internal(format!("Lock error: {}", e)))?;
        registry.register(name, factory);
        Ok(())
    }

    /// Copy of the process-wide registry
    pub fn snapshot() -> Result<FilterRegistry> {
        let registry = GLOBAL
            .read()
            .map_err(|e| Error::Internal(format!("Lock error: {}", e)))?;
        Ok(registry.clone())
    }

    /// Register (or replace) a function
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&FilterArgs) -> Result<Arc<dyn NodeFilter>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            tracing::debug!("Replaced filter function: {}", name);
        }
    }

    /// Register an argument-less predicate
    pub fn register_fn<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&MatchContext<'_>, NodeId) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        let filter: Arc<dyn NodeFilter> = Arc::new(FnFilter::new(name.clone(), predicate));
        let function = name.clone();
        self.register(name, move |args: &FilterArgs| {
            args.expect_none(&function)?;
            Ok(filter.clone())
        });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the filter for `name(args)`
    pub fn resolve(&self, name: &str, args: &FilterArgs) -> Result<Arc<dyn NodeFilter>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;
        factory(args)
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Built-in functions
// ─────────────────────────────────────────────────────────────────────────────

/// Named attribute matches a pattern
#[derive(Debug)]
struct AttributeMatches {
    key: &'static str,
    pattern: Regex,
}

impl NodeFilter for AttributeMatches {
    fn accepts(&self, ctx: &MatchContext<'_>, node: NodeId) -> bool {
        ctx.graph
            .attribute(node, self.key)
            .is_some_and(|v| self.pattern.is_match(v))
    }
}

/// Prefix before `:` in the node name matches
#[derive(Debug)]
struct NamespaceMatches(Regex);

impl NodeFilter for NamespaceMatches {
    fn accepts(&self, ctx: &MatchContext<'_>, node: NodeId) -> bool {
        ctx.graph
            .name(node)
            .and_then(|n| n.split_once(':'))
            .is_some_and(|(prefix, _)| self.0.is_match(prefix))
    }
}

#[derive(Debug)]
struct DepthEquals(usize);

impl NodeFilter for DepthEquals {
    fn accepts(&self, ctx: &MatchContext<'_>, node: NodeId) -> bool {
        ctx.graph.depth(node) == Some(self.0)
    }
}

/// Some direct neighbor's name matches
#[derive(Debug)]
struct HasChildNamed(Regex);

impl NodeFilter for HasChildNamed {
    fn accepts(&self, ctx: &MatchContext<'_>, node: NodeId) -> bool {
        ctx.graph
            .neighbors(node)
            .iter()
            .any(|n| ctx.graph.name(*n).is_some_and(|name| self.0.is_match(name)))
    }
}

fn attribute_factory(
    function: &'static str,
    key: &'static str,
) -> impl Fn(&FilterArgs) -> Result<Arc<dyn NodeFilter>> + Send + Sync + 'static {
    move |args: &FilterArgs| {
        let pattern = args.require_pattern(function, &["0", key])?;
        Ok(Arc::new(AttributeMatches { key, pattern }) as Arc<dyn NodeFilter>)
    }
}

fn register_builtins(registry: &mut FilterRegistry) {
    registry.register("type", attribute_factory("type", "type"));
    registry.register("value", attribute_factory("value", "value"));

    for name in ["namespace", "ns"] {
        registry.register(name, move |args: &FilterArgs| {
            let pattern = args.require_pattern(name, &["0", "prefix"])?;
            Ok(Arc::new(NamespaceMatches(pattern)) as Arc<dyn NodeFilter>)
        });
    }

    registry.register("depth", |args: &FilterArgs| {
        let depth = args.require_usize("depth", &["0", "depth"])?;
        Ok(Arc::new(DepthEquals(depth)) as Arc<dyn NodeFilter>)
    });

    registry.register("child", |args: &FilterArgs| {
        let pattern = args.require_pattern("child", &["0", "name"])?;
        Ok(Arc::new(HasChildNamed(pattern)) as Arc<dyn NodeFilter>)
    });

    registry.register("adjacent", |args: &FilterArgs| {
        args.expect_none("adjacent")?;
        Ok(Arc::new(Filter::Immediate) as Arc<dyn NodeFilter>)
    });

    registry.register("self", |args: &FilterArgs| {
        args.expect_none("self")?;
        Ok(Arc::new(Filter::Origin) as Arc<dyn NodeFilter>)
    });

    registry.register_fn("leaf", |ctx, node| ctx.graph.is_leaf(node));
    registry.register_fn("root", |ctx, node| ctx.graph.is_root(node));
    registry.register_fn("first", |ctx, node| ctx.graph.index(node) == Some(0));
    registry.register_fn("last", |ctx, node| match ctx.graph.parent(node) {
        Some(parent) => ctx.graph.children(parent).last() == Some(&node),
        None => false,
    });
}
