//! Query finder
//!
//! Runs a [`CompiledPattern`] stage by stage. Each stage expands every
//! frontier node through its relation, keeps the candidates all of its
//! filters accept, and the de-duplicated survivors become the next frontier.

use crate::filter::MatchContext;
use crate::node::{NodeGraph, NodeId};
use crate::pattern::{CompiledPattern, Relation, Stage};
use crate::traversal::{BreadthFirstFinder, DepthFirstFinder, Strategy};
use std::collections::HashSet;

/// Executes a compiled pattern against a graph
#[derive(Debug, Clone)]
pub struct NodeQueryFinder<'a> {
    graph: &'a NodeGraph,
    pattern: &'a CompiledPattern,
    strategy: Strategy,
    node_limit: Option<usize>,
}

impl<'a> NodeQueryFinder<'a> {
    pub fn new(graph: &'a NodeGraph, pattern: &'a CompiledPattern) -> Self {
        Self {
            graph,
            pattern,
            strategy: Strategy::default(),
            node_limit: None,
        }
    }

    /// Traversal used for descendant and wildcard stages
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Cap the nodes visited by each descendant traversal
    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = Some(limit);
        self
    }

    /// All matches reachable from `origin`, in stage order without duplicates
    pub fn find(&self, origin: NodeId) -> Vec<NodeId> {
        if self.graph.get(origin).is_none() {
            tracing::warn!("Query origin {} is not in the graph", origin);
            return Vec::new();
        }

        let mut frontier = vec![origin];
        for (i, stage) in self.pattern.stages().iter().enumerate() {
            frontier = self.apply_stage(stage, &frontier);
            tracing::debug!(
                "Stage {} ({}) of '{}' left {} nodes",
                i + 1,
                stage.relation(),
                self.pattern.source(),
                frontier.len()
            );
            if frontier.is_empty() {
                break;
            }
        }
        frontier
    }

    /// First match, if any
    pub fn find_first(&self, origin: NodeId) -> Option<NodeId> {
        self.find(origin).into_iter().next()
    }

    fn apply_stage(&self, stage: &Stage, frontier: &[NodeId]) -> Vec<NodeId> {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut next = Vec::new();

        for &from in frontier {
            for candidate in self.candidates(stage, from) {
                if seen.insert(candidate) {
                    next.push(candidate);
                }
            }
        }
        next
    }

    /// Nodes related to `from` that pass every filter of the stage
    fn candidates(&self, stage: &Stage, from: NodeId) -> Vec<NodeId> {
        let graph = self.graph;
        let ctx = MatchContext::new(graph, from).with_traversal(self.strategy, self.node_limit);
        let accepts = |node: NodeId| {
            let ok = stage.accepts(&ctx, node);
            tracing::trace!("{} {} from {}", if ok { "kept" } else { "dropped" }, node, from);
            ok
        };

        match stage.relation() {
            Relation::Current => {
                if accepts(from) {
                    vec![from]
                } else {
                    Vec::new()
                }
            }
            Relation::Immediate => graph
                .neighbors(from)
                .iter()
                .copied()
                .filter(|n| accepts(*n))
                .collect(),
            Relation::Descendant => {
                self.traverse(from, &|_: &NodeGraph, n: NodeId| n != from && accepts(n))
            }
            Relation::Wildcard => self.traverse(from, &|_: &NodeGraph, n: NodeId| accepts(n)),
        }
    }

    fn traverse(&self, from: NodeId, predicate: &dyn Fn(&NodeGraph, NodeId) -> bool) -> Vec<NodeId> {
        match self.strategy {
            Strategy::BreadthFirst => {
                let mut finder = BreadthFirstFinder::new();
                if let Some(limit) = self.node_limit {
                    finder = finder.with_node_limit(limit);
                }
                finder.find(self.graph, from, &predicate)
            }
            Strategy::DepthFirst => {
                let mut finder = DepthFirstFinder::new();
                if let Some(limit) = self.node_limit {
                    finder = finder.with_node_limit(limit);
                }
                finder.find(self.graph, from, &predicate)
            }
        }
    }
}
