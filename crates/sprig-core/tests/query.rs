//! End-to-end queries across compiler, finder and traversal

use sprig_core::{
    AcceptAll, BreadthFirstFinder, CompiledPattern, DepthFirstFinder, Document, Error,
    FilterRegistry, NodeFilter, NodeGraph, NodeId, NodeQueryFinder, PatternCache, Strategy,
    TopologicalSorter,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::thread;

/// Plain graph with a cycle and a shared successor
fn plain_graph() -> (NodeGraph, Vec<NodeId>) {
    let mut graph = NodeGraph::new();
    let ids: Vec<NodeId> = (0..7).map(|i| graph.add_node(format!("n{i}")).unwrap()).collect();
    for (from, to) in [(0, 1), (0, 2), (1, 3), (2, 3), (3, 4), (4, 1), (2, 5)] {
        graph.connect(ids[from], ids[to]).unwrap();
    }
    // ids[6] is unreachable
    (graph, ids)
}

fn distances(graph: &NodeGraph, origin: NodeId) -> HashMap<NodeId, usize> {
    let mut dist = HashMap::from([(origin, 0)]);
    let mut queue = VecDeque::from([origin]);
    while let Some(node) = queue.pop_front() {
        for next in graph.neighbors(node) {
            if !dist.contains_key(next) {
                dist.insert(*next, dist[&node] + 1);
                queue.push_back(*next);
            }
        }
    }
    dist
}

#[test]
fn test_bfs_reaches_each_node_once_in_distance_order() {
    let (graph, ids) = plain_graph();
    let found = BreadthFirstFinder::new().find(&graph, ids[0], &AcceptAll);
    let dist = distances(&graph, ids[0]);

    assert_eq!(found.len(), dist.len());
    assert_eq!(found.iter().collect::<HashSet<_>>().len(), found.len());
    assert!(!found.contains(&ids[6]));
    assert!(found.windows(2).all(|w| dist[&w[0]] <= dist[&w[1]]));
}

#[test]
fn test_dfs_reaches_each_node_once() {
    let (graph, ids) = plain_graph();
    let found = DepthFirstFinder::new().find(&graph, ids[0], &AcceptAll);

    let unique: HashSet<NodeId> = found.iter().copied().collect();
    assert_eq!(unique.len(), found.len());
    assert_eq!(unique, distances(&graph, ids[0]).keys().copied().collect());
}

#[test]
fn test_topological_order_respects_edges() {
    let mut graph = NodeGraph::new();
    let ids: Vec<NodeId> = (0..5).map(|i| graph.add_node(format!("t{i}")).unwrap()).collect();
    for (from, to) in [(0, 1), (0, 2), (1, 3), (2, 3), (3, 4)] {
        graph.connect(ids[from], ids[to]).unwrap();
    }

    let sorted = TopologicalSorter::sort(&graph, &ids).unwrap();
    let position: HashMap<NodeId, usize> =
        sorted.iter().enumerate().map(|(i, n)| (*n, i)).collect();
    for node in &ids {
        for dep in graph.neighbors(*node) {
            assert!(position[dep] < position[node]);
        }
    }

    let (cyclic, cyclic_ids) = plain_graph();
    match TopologicalSorter::sort_from(&cyclic, cyclic_ids[0]) {
        Err(Error::CycleDetected { remaining }) => {
            assert!(!remaining.is_empty());
            assert!(remaining.contains(&cyclic_ids[1]));
            assert!(!remaining.contains(&cyclic_ids[5]));
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

/// Root with children `a` (id=42) and `b` (id=7)
fn two_children() -> (NodeGraph, NodeId, NodeId, NodeId) {
    let mut graph = NodeGraph::new();
    let root = graph.add_tree_node("root").unwrap();
    let a = graph.add_tree_node("a").unwrap();
    let b = graph.add_tree_node("b").unwrap();
    graph.add_child(root, a).unwrap();
    graph.add_child(root, b).unwrap();
    graph.set_attribute(a, "id", "42").unwrap();
    graph.set_attribute(b, "id", "7").unwrap();
    (graph, root, a, b)
}

fn query(graph: &NodeGraph, origin: NodeId, selector: &str) -> Vec<NodeId> {
    let pattern = CompiledPattern::compile(selector).unwrap();
    NodeQueryFinder::new(graph, &pattern).find(origin)
}

#[test]
fn test_basic_selectors() {
    let (graph, root, a, b) = two_children();

    assert_eq!(query(&graph, root, "a"), vec![a]);
    assert_eq!(query(&graph, root, "#1"), vec![b]);
    assert_eq!(query(&graph, root, "[id=42]"), vec![a]);
    assert_eq!(query(&graph, root, "[id]"), vec![a, b]);
    assert_eq!(query(&graph, root, "*[id='4.*']"), vec![a]);
}

#[test]
fn test_empty_first_stage_yields_empty_result() {
    let (graph, root, _, _) = two_children();
    assert!(query(&graph, root, "missing a").is_empty());
    assert!(query(&graph, root, "a/b").is_empty());
}

#[test]
fn test_compiled_pattern_is_shared_across_threads() {
    let (graph, root, a, _) = two_children();
    let graph = Arc::new(graph);
    let cache = Arc::new(PatternCache::new());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let graph = Arc::clone(&graph);
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let pattern = cache.get_or_compile("/a[id=42]").unwrap();
                NodeQueryFinder::new(&graph, &pattern).find(root)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec![a]);
    }
    assert_eq!(cache.len(), 1);
}

#[derive(Debug)]
struct NameLength(usize);

impl NodeFilter for NameLength {
    fn accepts(&self, ctx: &sprig_core::MatchContext<'_>, node: NodeId) -> bool {
        ctx.graph.name(node).is_some_and(|n| n.len() == self.0)
    }
}

#[test]
fn test_globally_registered_function() {
    FilterRegistry::register_global("namelen", |args: &sprig_core::FilterArgs| {
        let len = args
            .get("0")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| Error::InvalidArgument {
                function: "namelen".to_string(),
                message: "expected a length".to_string(),
            })?;
        Ok(Arc::new(NameLength(len)) as Arc<dyn NodeFilter>)
    })
    .unwrap();

    let doc = Document::from_json_str(
        r#"{ "name": "root", "children": [{ "name": "ab" }, { "name": "abc" }] }"#,
    )
    .unwrap();
    let found = query(&doc.graph, doc.origin, "namelen(3)");
    assert_eq!(doc.graph.name(found[0]), Some("abc"));
    assert!(FilterRegistry::snapshot().unwrap().contains("namelen"));
}

#[test]
fn test_query_loaded_graph_document() {
    let doc = Document::from_json_str(
        r#"{
            "origin": "app",
            "nodes": [
                { "id": "app", "links": ["db", "cache"] },
                { "id": "db", "name": "service", "attributes": { "kind": "postgres" }, "links": ["disk"] },
                { "id": "cache", "name": "service", "attributes": { "kind": "redis" }, "links": ["db"] },
                { "id": "disk" }
            ]
        }"#,
    )
    .unwrap();
    let graph = &doc.graph;

    let services = query(graph, doc.origin, "/service");
    assert_eq!(services.len(), 2);

    let pattern = CompiledPattern::compile("service[kind=redis]/service").unwrap();
    let found = NodeQueryFinder::new(graph, &pattern)
        .with_strategy(Strategy::DepthFirst)
        .find(doc.origin);
    assert_eq!(found.len(), 1);
    assert_eq!(graph.attribute(found[0], "kind"), Some("postgres"));

    let order = TopologicalSorter::sort_from(graph, doc.origin).unwrap();
    let ids: Vec<&str> = order
        .iter()
        .map(|n| graph.attribute(*n, "id").unwrap())
        .collect();
    assert_eq!(ids, vec!["disk", "db", "cache", "app"]);
}
