//! Document loading
//!
//! Builds a [`NodeGraph`] from a JSON or TOML document. Two shapes are
//! accepted:
//!
//! - a nested tree: `{ "name": ..., "attributes": {...}, "children": [...] }`
//! - a general graph: `{ "nodes": [{ "id", "name", "attributes", "links" }], "origin": ... }`

use crate::error::{Error, Result};
use crate::node::{NodeGraph, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

/// Attribute value as written in a document
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Str(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Graph(RawGraph),
    Tree(RawTree),
}

#[derive(Debug, Deserialize)]
struct RawGraph {
    nodes: Vec<RawGraphNode>,
    #[serde(default)]
    origin: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGraphNode {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, Scalar>,
    #[serde(default)]
    links: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawTree {
    name: String,
    #[serde(default)]
    attributes: BTreeMap<String, Scalar>,
    #[serde(default)]
    children: Vec<RawTree>,
    /// Build binary nodes (at most two children each)
    #[serde(default)]
    binary: bool,
}

/// Source format of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    /// Format implied by the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// A loaded graph and the node queries start from
#[derive(Debug, Clone)]
pub struct Document {
    pub graph: NodeGraph,
    pub origin: NodeId,
}

impl Document {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: RawDocument = serde_json::from_str(text)?;
        Self::build(raw)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let raw: RawDocument = toml::from_str(text)?;
        Self::build(raw)
    }

    pub fn parse(text: &str, format: DocumentFormat) -> Result<Self> {
        match format {
            DocumentFormat::Json => Self::from_json_str(text),
            DocumentFormat::Toml => Self::from_toml_str(text),
        }
    }

    fn build(raw: RawDocument) -> Result<Self> {
        let document = match raw {
            RawDocument::Graph(graph) => build_graph(graph)?,
            RawDocument::Tree(tree) => {
                let mut graph = NodeGraph::new();
                let origin = build_tree(&mut graph, tree)?;
                Self { graph, origin }
            }
        };
        tracing::debug!(
            "Loaded document with {} nodes, origin {}",
            document.graph.len(),
            document.origin
        );
        Ok(document)
    }
}

fn build_graph(raw: RawGraph) -> Result<Document> {
    if raw.nodes.is_empty() {
        return Err(Error::Document("graph has no nodes".to_string()));
    }

    let mut graph = NodeGraph::with_capacity(raw.nodes.len());
    let mut ids: HashMap<String, NodeId> = HashMap::new();

    for node in &raw.nodes {
        if ids.contains_key(&node.id) {
            return Err(Error::Document(format!("duplicate node id '{}'", node.id)));
        }
        let id = graph.add_node(node.name.clone().unwrap_or_else(|| node.id.clone()))?;
        for (key, value) in &node.attributes {
            graph.set_attribute(id, key.clone(), value.to_string())?;
        }
        if !node.attributes.contains_key("id") {
            graph.set_attribute(id, "id", node.id.clone())?;
        }
        ids.insert(node.id.clone(), id);
    }

    let lookup = |key: &str| {
        ids.get(key)
            .copied()
            .ok_or_else(|| Error::Document(format!("unknown node id '{}'", key)))
    };

    for node in &raw.nodes {
        let from = lookup(&node.id)?;
        for link in &node.links {
            graph.connect(from, lookup(link)?)?;
        }
    }

    let origin = match &raw.origin {
        Some(origin) => lookup(origin)?,
        None => NodeId(0),
    };

    Ok(Document { graph, origin })
}

fn build_tree(graph: &mut NodeGraph, raw: RawTree) -> Result<NodeId> {
    let kind = if raw.binary {
        NodeKind::Binary
    } else {
        NodeKind::Tree
    };
    let id = graph.add(raw.name, kind)?;
    for (key, value) in &raw.attributes {
        graph.set_attribute(id, key.clone(), value.to_string())?;
    }
    for child in raw.children {
        let binary = raw.binary;
        let child_id = build_tree(graph, RawTree { binary: binary || child.binary, ..child })?;
        graph.add_child(id, child_id)?;
    }
    Ok(id)
}

/// Serializable snapshot of one node, used for output
#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    pub attributes: BTreeMap<String, String>,
}

impl NodeView {
    pub fn of(graph: &NodeGraph, id: NodeId) -> Result<Self> {
        let node = graph.node(id)?;
        Ok(Self {
            id,
            name: node.name().to_string(),
            path: graph.path(id),
            index: node.index(),
            depth: node.depth(),
            attributes: node
                .attributes()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }
}
