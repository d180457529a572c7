//! Graph traversal algorithms
//!
//! All traversals run over [`NodeGraph::neighbors`] and key their bookkeeping
//! on [`NodeId`], so cyclic graphs terminate without structural comparison.

use crate::error::{Error, Result};
use crate::node::{NodeGraph, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Node predicate used by the finders
pub trait Predicate {
    fn accepts(&self, graph: &NodeGraph, node: NodeId) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&NodeGraph, NodeId) -> bool,
{
    fn accepts(&self, graph: &NodeGraph, node: NodeId) -> bool {
        self(graph, node)
    }
}

/// Predicate accepting every node
pub struct AcceptAll;

impl Predicate for AcceptAll {
    fn accepts(&self, _graph: &NodeGraph, _node: NodeId) -> bool {
        true
    }
}

/// Order in which reachable nodes are explored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    #[serde(alias = "bfs")]
    BreadthFirst,
    #[serde(alias = "dfs")]
    DepthFirst,
}

/// Traversal statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalStats {
    pub nodes_visited: usize,
    pub edges_traversed: usize,
    /// Whether the node limit cut the walk short
    pub truncated: bool,
}

/// Breadth-first finder
///
/// Returns accepted nodes in discovery (level) order. The whole reachable
/// component is drained unless a node limit is set.
#[derive(Debug, Clone, Default)]
pub struct BreadthFirstFinder {
    node_limit: Option<usize>,
    stats: TraversalStats,
}

impl BreadthFirstFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after visiting this many nodes
    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = Some(limit);
        self
    }

    /// Statistics of the last `find` call
    pub fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    pub fn find<P: Predicate + ?Sized>(
        &mut self,
        graph: &NodeGraph,
        origin: NodeId,
        predicate: &P,
    ) -> Vec<NodeId> {
        let mut stats = TraversalStats::default();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        let mut found = Vec::new();

        visited.insert(origin);
        queue.push_back(origin);

        while let Some(current) = queue.pop_front() {
            if self.node_limit.is_some_and(|limit| stats.nodes_visited >= limit) {
                stats.truncated = true;
                tracing::warn!(
                    "Breadth-first walk from {} stopped at node limit {}",
                    origin,
                    stats.nodes_visited
                );
                break;
            }
            stats.nodes_visited += 1;

            if predicate.accepts(graph, current) {
                found.push(current);
            }

            for next in graph.neighbors(current) {
                stats.edges_traversed += 1;
                if visited.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }

        tracing::trace!(
            "BFS from {} visited {} nodes, matched {}",
            origin,
            stats.nodes_visited,
            found.len()
        );
        self.stats = stats;
        found
    }
}

/// Depth-first finder
///
/// Uses an explicit stack. Matches are reported in first-encounter order
/// along the deepest-first path, each node at most once.
#[derive(Debug, Clone, Default)]
pub struct DepthFirstFinder {
    node_limit: Option<usize>,
    stats: TraversalStats,
}

impl DepthFirstFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after visiting this many nodes
    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = Some(limit);
        self
    }

    /// Statistics of the last `find` call
    pub fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    pub fn find<P: Predicate + ?Sized>(
        &mut self,
        graph: &NodeGraph,
        origin: NodeId,
        predicate: &P,
    ) -> Vec<NodeId> {
        let mut stats = TraversalStats::default();
        let mut stack: Vec<NodeId> = vec![origin];
        let mut on_stack: HashSet<NodeId> = HashSet::from([origin]);
        let mut explored: HashSet<NodeId> = HashSet::new();
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut found = Vec::new();

        while let Some(&top) = stack.last() {
            if seen.insert(top) {
                if self.node_limit.is_some_and(|limit| stats.nodes_visited >= limit) {
                    stats.truncated = true;
                    tracing::warn!(
                        "Depth-first walk from {} stopped at node limit {}",
                        origin,
                        stats.nodes_visited
                    );
                    break;
                }
                stats.nodes_visited += 1;
                if predicate.accepts(graph, top) {
                    found.push(top);
                }
            }

            let next = graph.neighbors(top).iter().copied().find(|n| {
                stats.edges_traversed += 1;
                !explored.contains(n) && !on_stack.contains(n)
            });

            match next {
                Some(next) => {
                    on_stack.insert(next);
                    stack.push(next);
                }
                None => {
                    explored.insert(top);
                    on_stack.remove(&top);
                    stack.pop();
                }
            }
        }

        tracing::trace!(
            "DFS from {} visited {} nodes, matched {}",
            origin,
            stats.nodes_visited,
            found.len()
        );
        self.stats = stats;
        found
    }
}

/// Dependency ordering over the neighbor relation
///
/// An edge `u -> v` reads "u depends on v", so `v` is emitted before `u`.
pub struct TopologicalSorter;

impl TopologicalSorter {
    /// Sort `nodes` so every node follows all of its neighbors
    ///
    /// Among eligible nodes the first one in input order wins. A neighbor
    /// outside `nodes` is never satisfied, so any node depending on one ends
    /// up in the unsortable remainder.
    pub fn sort(graph: &NodeGraph, nodes: &[NodeId]) -> Result<Vec<NodeId>> {
        let mut remaining: Vec<NodeId> = Vec::with_capacity(nodes.len());
        let mut queued: HashSet<NodeId> = HashSet::new();
        for node in nodes {
            if queued.insert(*node) {
                remaining.push(*node);
            }
        }

        let mut sorted: Vec<NodeId> = Vec::with_capacity(remaining.len());
        let mut done: HashSet<NodeId> = HashSet::new();

        while !remaining.is_empty() {
            let candidate = remaining
                .iter()
                .position(|n| graph.neighbors(*n).iter().all(|dep| done.contains(dep)));

            match candidate {
                Some(position) => {
                    let node = remaining.remove(position);
                    done.insert(node);
                    sorted.push(node);
                }
                None => {
                    tracing::debug!(
                        "Topological sort stuck with {} unsortable nodes",
                        remaining.len()
                    );
                    return Err(Error::CycleDetected { remaining });
                }
            }
        }

        Ok(sorted)
    }

    /// Sort the component reachable from `origin`, collected breadth-first
    pub fn sort_from(graph: &NodeGraph, origin: NodeId) -> Result<Vec<NodeId>> {
        graph.node(origin)?;
        let reachable = BreadthFirstFinder::new().find(graph, origin, &AcceptAll);
        Self::sort(graph, &reachable)
    }

    /// [`sort_from`](Self::sort_from) over at most `limit` reachable nodes
    ///
    /// A larger component is a contract error, never a partial order.
    pub fn sort_from_limited(
        graph: &NodeGraph,
        origin: NodeId,
        limit: usize,
    ) -> Result<Vec<NodeId>> {
        graph.node(origin)?;
        let mut finder = BreadthFirstFinder::new().with_node_limit(limit);
        let reachable = finder.find(graph, origin, &AcceptAll);
        if finder.stats().truncated {
            return Err(Error::Contract(format!(
                "more than {} nodes reachable from {}",
                limit, origin
            )));
        }
        Self::sort(graph, &reachable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Diamond with a tail:
    ///
    /// ```text
    ///   A --> B --> D --> E
    ///   |           ^
    ///   +---> C ----+
    /// ```
    fn create_test_graph() -> (NodeGraph, Vec<NodeId>) {
        let mut graph = NodeGraph::new();
        let ids: Vec<NodeId> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|n| graph.add_node(*n).unwrap())
            .collect();
        let [a, b, c, d, e] = [ids[0], ids[1], ids[2], ids[3], ids[4]];
        graph.connect(a, b).unwrap();
        graph.connect(a, c).unwrap();
        graph.connect(b, d).unwrap();
        graph.connect(c, d).unwrap();
        graph.connect(d, e).unwrap();
        (graph, ids)
    }

    fn names(graph: &NodeGraph, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| graph.name(*id).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_bfs_level_order() {
        let (graph, ids) = create_test_graph();
        let mut finder = BreadthFirstFinder::new();
        let found = finder.find(&graph, ids[0], &AcceptAll);

        assert_eq!(names(&graph, &found), vec!["A", "B", "C", "D", "E"]);
        assert_eq!(finder.stats().nodes_visited, 5);
        assert!(!finder.stats().truncated);
    }

    #[test]
    fn test_bfs_with_predicate() {
        let (graph, ids) = create_test_graph();
        let found = BreadthFirstFinder::new().find(&graph, ids[0], &|g: &NodeGraph, n: NodeId| {
            g.name(n) != Some("B")
        });
        assert_eq!(names(&graph, &found), vec!["A", "C", "D", "E"]);
    }

    #[test]
    fn test_bfs_terminates_on_cycle() {
        let mut graph = NodeGraph::new();
        let a = graph.add_node("a").unwrap();
        let b = graph.add_node("b").unwrap();
        let c = graph.add_node("c").unwrap();
        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();
        graph.connect(c, a).unwrap();
        graph.connect(c, c).unwrap();

        let found = BreadthFirstFinder::new().find(&graph, b, &AcceptAll);
        assert_eq!(found, vec![b, c, a]);
    }

    #[test]
    fn test_bfs_node_limit() {
        let (graph, ids) = create_test_graph();
        let mut finder = BreadthFirstFinder::new().with_node_limit(2);
        let found = finder.find(&graph, ids[0], &AcceptAll);

        assert_eq!(found.len(), 2);
        assert!(finder.stats().truncated);
    }

    #[test]
    fn test_dfs_deepest_first_order() {
        let (graph, ids) = create_test_graph();
        let mut finder = DepthFirstFinder::new();
        let found = finder.find(&graph, ids[0], &AcceptAll);

        // A, then down B to D and E, then back up for C
        assert_eq!(names(&graph, &found), vec!["A", "B", "D", "E", "C"]);
        assert_eq!(finder.stats().nodes_visited, 5);
    }

    #[test]
    fn test_dfs_with_predicate() {
        let (graph, ids) = create_test_graph();
        let mut finder = DepthFirstFinder::new();
        let found = finder.find(&graph, ids[0], &|g: &NodeGraph, n: NodeId| {
            !matches!(g.name(n), Some("B" | "E"))
        });

        // Rejected nodes are still walked through, just not reported
        assert_eq!(names(&graph, &found), vec!["A", "D", "C"]);
        assert_eq!(finder.stats().nodes_visited, 5);
    }

    #[test]
    fn test_dfs_predicate_on_cycle_reports_each_match_once() {
        let mut graph = NodeGraph::new();
        let ids: Vec<NodeId> = (0..6)
            .map(|i| graph.add_node(format!("n{i}")).unwrap())
            .collect();
        for (from, to) in [(0, 1), (1, 2), (2, 0), (2, 3), (3, 1), (0, 4), (4, 5), (5, 3)] {
            graph.connect(ids[from], ids[to]).unwrap();
        }
        let even = |g: &NodeGraph, n: NodeId| {
            g.name(n)
                .and_then(|name| name[1..].parse::<usize>().ok())
                .is_some_and(|i| i % 2 == 0)
        };

        let found = DepthFirstFinder::new().find(&graph, ids[0], &even);
        let mut sorted = found.clone();
        sorted.sort();
        assert_eq!(found.len(), 3);
        assert_eq!(sorted, vec![ids[0], ids[2], ids[4]]);
    }

    #[test]
    fn test_dfs_no_duplicates_on_cycle() {
        let mut graph = NodeGraph::new();
        let a = graph.add_node("a").unwrap();
        let b = graph.add_node("b").unwrap();
        let c = graph.add_node("c").unwrap();
        graph.connect(a, b).unwrap();
        graph.connect(b, a).unwrap();
        graph.connect(b, c).unwrap();
        graph.connect(c, b).unwrap();
        graph.connect(a, c).unwrap();

        let found = DepthFirstFinder::new().find(&graph, a, &AcceptAll);
        assert_eq!(found.len(), 3);
        let unique: HashSet<NodeId> = found.iter().copied().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_topological_sort_orders_dependencies_first() {
        let (graph, ids) = create_test_graph();
        let sorted = TopologicalSorter::sort(&graph, &ids).unwrap();

        assert_eq!(sorted.len(), ids.len());
        let position = |id: NodeId| sorted.iter().position(|n| *n == id).unwrap();
        for u in &ids {
            for v in graph.neighbors(*u) {
                assert!(position(*v) < position(*u));
            }
        }
        assert_eq!(names(&graph, &sorted), vec!["E", "D", "B", "C", "A"]);
    }

    #[test]
    fn test_topological_sort_reports_cycle() {
        let mut graph = NodeGraph::new();
        let a = graph.add_node("a").unwrap();
        let b = graph.add_node("b").unwrap();
        let c = graph.add_node("c").unwrap();
        let leaf = graph.add_node("leaf").unwrap();
        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();
        graph.connect(c, b).unwrap();
        graph.connect(c, leaf).unwrap();

        let err = TopologicalSorter::sort(&graph, &[a, b, c, leaf]).unwrap_err();
        match err {
            Error::CycleDetected { remaining } => {
                assert_eq!(remaining, vec![a, b, c]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sort_from_origin() {
        let mut graph = NodeGraph::new();
        let root = graph.add_tree_node("root").unwrap();
        let a = graph.add_tree_node("a").unwrap();
        let b = graph.add_tree_node("b").unwrap();
        graph.add_child(root, a).unwrap();
        graph.add_child(a, b).unwrap();

        let sorted = TopologicalSorter::sort_from(&graph, root).unwrap();
        assert_eq!(sorted, vec![b, a, root]);
    }

    #[test]
    fn test_sort_from_limited() {
        let (graph, ids) = create_test_graph();

        let sorted = TopologicalSorter::sort_from_limited(&graph, ids[0], 5).unwrap();
        assert_eq!(names(&graph, &sorted), vec!["E", "D", "B", "C", "A"]);

        assert!(matches!(
            TopologicalSorter::sort_from_limited(&graph, ids[0], 4),
            Err(Error::Contract(_))
        ));
        let tail = TopologicalSorter::sort_from_limited(&graph, ids[3], 2).unwrap();
        assert_eq!(names(&graph, &tail), vec!["E", "D"]);
    }
}
