//! Reflective binder
//!
//! A [`Bindable`] type lists its fields as [`FieldBinding`]s: a selector, what
//! to read from each matched node, and a setter. [`Binder::bind`] runs every
//! selector from a root node and writes the results into a default instance.

use crate::error::{BindError, BindResult};
use crate::value::{read_as, JsonValueReader, ValueReader};
use serde::de::DeserializeOwned;
use sprig_core::{FilterRegistry, NodeGraph, NodeId, NodeQueryFinder, PatternCache, Strategy};
use std::fmt;

/// Target type populated from query matches
pub trait Bindable: Default + 'static {
    fn bindings() -> Vec<FieldBinding<Self>>;
}

/// What a binding reads from each matched node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    /// Attribute value converted through the value reader
    Attribute(String),
    /// Position among the parent's children
    Index,
    /// Nested [`Bindable`] bound with the match as its root
    Element,
}

/// Whether a field takes one match or all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Scalar,
    Collection,
}

type Apply<T> =
    Box<dyn Fn(&Binder, &NodeGraph, &[NodeId], &mut T) -> BindResult<()> + Send + Sync>;

/// One field of a [`Bindable`] type
pub struct FieldBinding<T> {
    field: &'static str,
    selector: String,
    kind: BindingKind,
    cardinality: Cardinality,
    apply: Apply<T>,
}

impl<T: 'static> FieldBinding<T> {
    /// Single attribute value
    pub fn attribute<V, F>(
        field: &'static str,
        selector: impl Into<String>,
        attribute: impl Into<String>,
        setter: F,
    ) -> Self
    where
        V: DeserializeOwned + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let attribute = attribute.into();
        let key = attribute.clone();
        let extract = move |binder: &Binder, graph: &NodeGraph, node: NodeId| {
            read_attribute::<V>(binder, graph, node, &key)
        };
        Self::scalar(field, selector, BindingKind::Attribute(attribute), extract, setter)
    }

    /// Attribute value of every match
    pub fn attributes<V, F>(
        field: &'static str,
        selector: impl Into<String>,
        attribute: impl Into<String>,
        setter: F,
    ) -> Self
    where
        V: DeserializeOwned + 'static,
        F: Fn(&mut T, Vec<V>) + Send + Sync + 'static,
    {
        let attribute = attribute.into();
        let key = attribute.clone();
        let extract = move |binder: &Binder, graph: &NodeGraph, node: NodeId| {
            read_attribute::<V>(binder, graph, node, &key)
        };
        Self::collection(field, selector, BindingKind::Attribute(attribute), extract, setter)
    }

    /// Sibling index of the match
    pub fn index<F>(field: &'static str, selector: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&mut T, usize) + Send + Sync + 'static,
    {
        Self::scalar(field, selector, BindingKind::Index, sibling_index, setter)
    }

    /// Sibling index of every match
    pub fn indices<F>(field: &'static str, selector: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&mut T, Vec<usize>) + Send + Sync + 'static,
    {
        Self::collection(field, selector, BindingKind::Index, sibling_index, setter)
    }

    /// Nested value bound from the match
    pub fn element<C, F>(field: &'static str, selector: impl Into<String>, setter: F) -> Self
    where
        C: Bindable,
        F: Fn(&mut T, C) + Send + Sync + 'static,
    {
        Self::scalar(field, selector, BindingKind::Element, bind_element::<C>, setter)
    }

    /// Nested value bound from every match
    pub fn elements<C, F>(field: &'static str, selector: impl Into<String>, setter: F) -> Self
    where
        C: Bindable,
        F: Fn(&mut T, Vec<C>) + Send + Sync + 'static,
    {
        Self::collection(field, selector, BindingKind::Element, bind_element::<C>, setter)
    }

    fn scalar<V, E, F>(
        field: &'static str,
        selector: impl Into<String>,
        kind: BindingKind,
        extract: E,
        setter: F,
    ) -> Self
    where
        V: 'static,
        E: Fn(&Binder, &NodeGraph, NodeId) -> BindResult<Option<V>> + Send + Sync + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self {
            field,
            selector: selector.into(),
            kind,
            cardinality: Cardinality::Scalar,
            apply: Box::new(move |binder: &Binder, graph: &NodeGraph, matches: &[NodeId], target: &mut T| {
                if let Some(value) = extract(binder, graph, matches[0])? {
                    setter(target, value);
                }
                Ok(())
            }),
        }
    }

    fn collection<V, E, F>(
        field: &'static str,
        selector: impl Into<String>,
        kind: BindingKind,
        extract: E,
        setter: F,
    ) -> Self
    where
        V: 'static,
        E: Fn(&Binder, &NodeGraph, NodeId) -> BindResult<Option<V>> + Send + Sync + 'static,
        F: Fn(&mut T, Vec<V>) + Send + Sync + 'static,
    {
        Self {
            field,
            selector: selector.into(),
            kind,
            cardinality: Cardinality::Collection,
            apply: Box::new(move |binder: &Binder, graph: &NodeGraph, matches: &[NodeId], target: &mut T| {
                let mut values = Vec::with_capacity(matches.len());
                for node in matches {
                    if let Some(value) = extract(binder, graph, *node)? {
                        values.push(value);
                    }
                }
                setter(target, values);
                Ok(())
            }),
        }
    }
}

impl<T> FieldBinding<T> {
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn kind(&self) -> &BindingKind {
        &self.kind
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
}

impl<T> fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("field", &self.field)
            .field("selector", &self.selector)
            .field("kind", &self.kind)
            .field("cardinality", &self.cardinality)
            .finish()
    }
}

fn sibling_index(_binder: &Binder, graph: &NodeGraph, node: NodeId) -> BindResult<Option<usize>> {
    Ok(graph.index(node))
}

fn bind_element<C: Bindable>(
    binder: &Binder,
    graph: &NodeGraph,
    node: NodeId,
) -> BindResult<Option<C>> {
    binder.bind::<C>(graph, node).map(Some)
}

fn read_attribute<V: DeserializeOwned>(
    binder: &Binder,
    graph: &NodeGraph,
    node: NodeId,
    key: &str,
) -> BindResult<Option<V>> {
    match graph.attribute(node, key) {
        Some(raw) => Ok(Some(read_as::<V>(binder.reader.as_ref(), raw)?)),
        None => {
            tracing::trace!("Node {} has no attribute '{}', skipping", node, key);
            Ok(None)
        }
    }
}

/// Populates [`Bindable`] values from a graph
///
/// Selectors are compiled once and cached, so a binder can be reused across
/// many roots and graphs.
pub struct Binder {
    patterns: PatternCache,
    reader: Box<dyn ValueReader>,
    strategy: Strategy,
}

impl Binder {
    /// Binder using the process-wide filter registry and [`JsonValueReader`]
    pub fn new() -> Self {
        Self {
            patterns: PatternCache::new(),
            reader: Box::new(JsonValueReader),
            strategy: Strategy::default(),
        }
    }

    /// Binder compiling selectors against a private registry
    pub fn with_registry(registry: FilterRegistry) -> Self {
        Self {
            patterns: PatternCache::with_registry(registry),
            ..Self::new()
        }
    }

    pub fn with_reader(mut self, reader: impl ValueReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Build a `T` from the matches of its field selectors under `root`
    pub fn bind<T: Bindable>(&self, graph: &NodeGraph, root: NodeId) -> BindResult<T> {
        let mut target = T::default();

        for binding in T::bindings() {
            let pattern = self.patterns.get_or_compile(&binding.selector)?;
            let matches = NodeQueryFinder::new(graph, &pattern)
                .with_strategy(self.strategy)
                .find(root);

            tracing::debug!(
                "Field '{}' selector '{}' matched {} nodes",
                binding.field,
                binding.selector,
                matches.len()
            );

            if matches.is_empty() {
                continue;
            }
            if binding.cardinality == Cardinality::Scalar && matches.len() > 1 {
                return Err(BindError::Ambiguous {
                    field: binding.field,
                    selector: binding.selector,
                    matches: matches.len(),
                });
            }
            (binding.apply)(self, graph, &matches, &mut target)?;
        }

        Ok(target)
    }
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("patterns", &self.patterns.len())
            .field("strategy", &self.strategy)
            .finish()
    }
}
