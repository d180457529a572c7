//! Compiled selector patterns

use crate::compiler::PatternCompiler;
use crate::error::{Error, Result};
use crate::filter::{Filter, MatchContext};
use crate::node::NodeId;
use crate::registry::FilterRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

/// How a stage's candidates relate to the previous frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// Direct neighbors of each frontier node (`a/b`)
    Immediate,
    /// Anything reachable from a frontier node, excluding the node itself (`a b`)
    Descendant,
    /// The frontier node and everything reachable from it (`**`)
    Wildcard,
    /// The frontier node itself (`.`)
    Current,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Immediate => "immediate",
            Self::Descendant => "descendant",
            Self::Wildcard => "wildcard",
            Self::Current => "current",
        };
        f.write_str(s)
    }
}

/// One segment of a compiled selector
#[derive(Debug, Clone)]
pub struct Stage {
    relation: Relation,
    filters: Vec<Filter>,
}

impl Stage {
    pub(crate) fn new(relation: Relation, filters: Vec<Filter>) -> Self {
        debug_assert!(!filters.is_empty());
        Self { relation, filters }
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// All filters accept the node
    pub fn accepts(&self, ctx: &MatchContext<'_>, node: NodeId) -> bool {
        self.filters.iter().all(|f| f.accepts(ctx, node))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.relation)?;
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(" && ")?;
            }
            write!(f, "{}", filter)?;
        }
        Ok(())
    }
}

/// Executable form of a selector: a non-empty, immutable list of stages
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    stages: Vec<Stage>,
}

impl CompiledPattern {
    pub(crate) fn new(source: impl Into<String>, stages: Vec<Stage>) -> Self {
        debug_assert!(!stages.is_empty());
        Self {
            source: source.into(),
            stages,
        }
    }

    /// Compile against the process-wide filter registry
    pub fn compile(selector: &str) -> Result<Self> {
        let registry = FilterRegistry::global()
            .read()
            .map_err(|e| Error::Internal(format!("Lock error: {}", e)))?;
        PatternCompiler::new(&registry).compile(selector)
    }

    /// Selector text this pattern was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Relation used to leave the origin node
    pub fn first_relation(&self) -> Relation {
        self.stages[0].relation
    }
}

impl FromStr for CompiledPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::compile(s)
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}. {}", i + 1, stage)?;
        }
        Ok(())
    }
}

/// Thread-safe cache of compiled patterns keyed by selector text
#[derive(Debug, Default)]
pub struct PatternCache {
    registry: Option<FilterRegistry>,
    patterns: RwLock<HashMap<String, Arc<CompiledPattern>>>,
}

impl PatternCache {
    /// Cache compiling against the process-wide registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache compiling against a private registry
    pub fn with_registry(registry: FilterRegistry) -> Self {
        Self {
            registry: Some(registry),
            patterns: RwLock::new(HashMap::new()),
        }
    }

    /// Cached pattern for `selector`, compiling it on first use
    pub fn get_or_compile(&self, selector: &str) -> Result<Arc<CompiledPattern>> {
        {
            let patterns = self
                .patterns
                .read()
                .map_err(|e| Error::Internal(format!("Lock error: {}", e)))?;
            if let Some(pattern) = patterns.get(selector) {
                return Ok(pattern.clone());
            }
        }

        let compiled = match &self.registry {
            Some(registry) => PatternCompiler::new(registry).compile(selector)?,
            None => CompiledPattern::compile(selector)?,
        };

        let mut patterns = self
            .patterns
            .write()
            .map_err(|e| Error::Internal(format!("Lock error: {}", e)))?;
        let entry = patterns
            .entry(selector.to_string())
            .or_insert_with(|| Arc::new(compiled));
        Ok(entry.clone())
    }

    pub fn len(&self) -> usize {
        self.patterns.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> Result<()> {
        self.patterns
            .write()
            .map_err(|e| Error::Internal(format!("Lock error: {}", e)))?
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_reuses_compiled_pattern() {
        let cache = PatternCache::new();
        let first = cache.get_or_compile("config/server").unwrap();
        let second = cache.get_or_compile("config/server").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.clear().unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_does_not_store_failures() {
        let cache = PatternCache::new();
        assert!(cache.get_or_compile("a[").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_with_private_registry() {
        let mut registry = FilterRegistry::new();
        registry.register_fn("odd", |_, node| node.0 % 2 == 1);
        let cache = PatternCache::with_registry(registry);

        assert!(cache.get_or_compile("odd()").is_ok());
        // Built-ins are not part of a bare private registry
        assert!(matches!(
            cache.get_or_compile("leaf()"),
            Err(Error::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_display_lists_stages() {
        let pattern: CompiledPattern = "/config server[port]".parse().unwrap();
        let text = pattern.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1. immediate: name ~"));
        assert!(lines[1].starts_with("2. descendant: name ~"));
        assert!(lines[1].contains("&& [^(?:port)$]"));
        assert_eq!(pattern.first_relation(), Relation::Immediate);
    }
}
