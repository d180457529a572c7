//! Node (vertex) types and the arena that owns them
//!
//! Every relation between nodes (neighbors, parent, children) is stored as a
//! [`NodeId`] into a single [`NodeGraph`], so cyclic graphs and tree
//! back-references need no shared ownership.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Handle to a node inside a [`NodeGraph`]
///
/// Node identity is handle identity: two nodes with the same name and
/// attributes are still different nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Position of the node in its arena
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Structural kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Free-form node linked with [`NodeGraph::connect`]
    #[default]
    Plain,
    /// Ordered-children tree node; its children are its neighbors
    Tree,
    /// Tree node with at most two children (left, right)
    Binary,
}

impl NodeKind {
    pub fn is_tree(self) -> bool {
        matches!(self, Self::Tree | Self::Binary)
    }

    /// Hard cap on the number of children, if any
    pub fn max_children(self) -> Option<usize> {
        match self {
            Self::Binary => Some(2),
            _ => None,
        }
    }
}

/// A node in the graph
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    kind: NodeKind,
    attributes: HashMap<String, String>,
    /// Outgoing edges for plain nodes, ordered children for tree nodes
    neighbors: Vec<NodeId>,
    parent: Option<NodeId>,
    index: Option<usize>,
    depth: usize,
}

impl Node {
    fn new(name: String, kind: NodeKind) -> Self {
        Self {
            name,
            kind,
            attributes: HashMap::new(),
            neighbors: Vec::new(),
            parent: None,
            index: None,
            depth: 0,
        }
    }

    /// Declared name (element or vertex name)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Attribute value, `None` when the key is not set
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// All attributes in unspecified order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Position among the parent's children (tree nodes with a parent only)
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Distance from the tree root (tree nodes only)
    pub fn depth(&self) -> Option<usize> {
        self.kind.is_tree().then_some(self.depth)
    }
}

fn next_id(len: usize) -> Result<NodeId> {
    u32::try_from(len)
        .ok()
        .filter(|index| *index < u32::MAX)
        .map(NodeId)
        .ok_or_else(|| Error::Contract(format!("graph is full at {} nodes", len)))
}

/// Arena owning every node of a graph or forest
#[derive(Debug, Clone, Default)]
pub struct NodeGraph {
    nodes: Vec<Node>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a detached node of the given kind
    ///
    /// A graph holds at most `u32::MAX` nodes; adding past that is a
    /// contract error.
    pub fn add(&mut self, name: impl Into<String>, kind: NodeKind) -> Result<NodeId> {
        let id = next_id(self.nodes.len())?;
        self.nodes.push(Node::new(name.into(), kind));
        Ok(id)
    }

    /// Add a plain node
    pub fn add_node(&mut self, name: impl Into<String>) -> Result<NodeId> {
        self.add(name, NodeKind::Plain)
    }

    /// Add a detached tree node
    pub fn add_tree_node(&mut self, name: impl Into<String>) -> Result<NodeId> {
        self.add(name, NodeKind::Tree)
    }

    /// Add a detached binary tree node
    pub fn add_binary_node(&mut self, name: impl Into<String>) -> Result<NodeId> {
        self.add(name, NodeKind::Binary)
    }

    pub fn set_attribute(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        self.node_mut(id)?
            .attributes
            .insert(key.into(), value.into());
        Ok(())
    }

    /// Builder-style attribute setter for freshly added nodes
    pub fn with_attribute(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<NodeId> {
        self.set_attribute(id, key, value)?;
        Ok(id)
    }

    pub fn remove_attribute(&mut self, id: NodeId, key: &str) -> Result<Option<String>> {
        Ok(self.node_mut(id)?.attributes.remove(key))
    }

    /// Add a directed edge between plain nodes
    ///
    /// Tree nodes derive their neighbors from their children, so linking from
    /// a tree node is rejected. Duplicate edges are ignored.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.require(to)?;
        let node = self.node_mut(from)?;
        if node.kind.is_tree() {
            return Err(Error::Contract(format!(
                "cannot link from tree node {}; use add_child",
                from
            )));
        }
        if !node.neighbors.contains(&to) {
            node.neighbors.push(to);
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tree mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Append `child` to the children of `parent`
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let position = self.node(parent)?.neighbors.len();
        self.insert_child(parent, position, child)
    }

    /// Insert `child` at `position` among the children of `parent`
    pub fn insert_child(&mut self, parent: NodeId, position: usize, child: NodeId) -> Result<()> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;

        if !parent_node.kind.is_tree() || !child_node.kind.is_tree() {
            return Err(Error::Contract(format!(
                "{} and {} must both be tree nodes",
                parent, child
            )));
        }
        if parent == child {
            return Err(Error::Contract(format!("{} cannot be its own child", child)));
        }
        if let Some(existing) = child_node.parent {
            return Err(Error::Contract(format!(
                "{} already has parent {}",
                child, existing
            )));
        }
        if let Some(max) = parent_node.kind.max_children() {
            if parent_node.neighbors.len() >= max {
                return Err(Error::Contract(format!(
                    "{} already has {} children (max {})",
                    parent,
                    parent_node.neighbors.len(),
                    max
                )));
            }
        }
        if position > parent_node.neighbors.len() {
            return Err(Error::Contract(format!(
                "position {} out of range for {} ({} children)",
                position,
                parent,
                parent_node.neighbors.len()
            )));
        }
        if self.ancestors(parent).any(|a| a == child) {
            return Err(Error::Contract(format!(
                "{} is an ancestor of {}",
                child, parent
            )));
        }

        let depth = self.nodes[parent.index()].depth + 1;
        self.nodes[parent.index()].neighbors.insert(position, child);
        self.nodes[child.index()].parent = Some(parent);
        self.reindex_children(parent, position);
        self.set_subtree_depth(child, depth);
        Ok(())
    }

    /// Remove `child` from the children of `parent`, leaving it as a detached root
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.require(parent)?;
        let child_node = self.node(child)?;
        if child_node.parent != Some(parent) {
            return Err(Error::Contract(format!(
                "{} is not a child of {}",
                child, parent
            )));
        }
        let position = child_node
            .index
            .ok_or_else(|| Error::Internal(format!("{} has a parent but no index", child)))?;

        self.nodes[parent.index()].neighbors.remove(position);
        let detached = &mut self.nodes[child.index()];
        detached.parent = None;
        detached.index = None;
        self.reindex_children(parent, position);
        self.set_subtree_depth(child, 0);
        Ok(())
    }

    /// Detach a node from its parent, if it has one
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        match self.node(id)?.parent {
            Some(parent) => self.remove_child(parent, id),
            None => Ok(()),
        }
    }

    fn reindex_children(&mut self, parent: NodeId, from: usize) {
        let children = self.nodes[parent.index()].neighbors[from..].to_vec();
        for (offset, child) in children.into_iter().enumerate() {
            self.nodes[child.index()].index = Some(from + offset);
        }
    }

    fn set_subtree_depth(&mut self, root: NodeId, depth: usize) {
        let mut stack = vec![(root, depth)];
        while let Some((id, depth)) = stack.pop() {
            let node = &mut self.nodes[id.index()];
            node.depth = depth;
            stack.extend(node.neighbors.iter().map(|c| (*c, depth + 1)));
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────────

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Node by handle, failing for handles from another arena
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))
    }

    fn require(&self, id: NodeId) -> Result<()> {
        self.node(id).map(|_| ())
    }

    /// All node handles in insertion order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.get(id).map(Node::name)
    }

    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        self.get(id).and_then(|n| n.attribute(key))
    }

    /// Neighbors of a node; empty for unknown handles
    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::neighbors).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Children of a tree node; empty for plain nodes
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Some(node) if node.kind.is_tree() => &node.neighbors,
            _ => &[],
        }
    }

    pub fn index(&self, id: NodeId) -> Option<usize> {
        self.get(id).and_then(Node::index)
    }

    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.get(id).and_then(Node::depth)
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.get(id)
            .map(|n| n.kind.is_tree() && n.parent.is_none())
            .unwrap_or(false)
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.neighbors(id).is_empty()
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    /// Root of the tree containing `id` (the node itself when detached)
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Left child of a binary node
    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        self.binary_child(id, 0)
    }

    /// Right child of a binary node
    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        self.binary_child(id, 1)
    }

    fn binary_child(&self, id: NodeId, slot: usize) -> Option<NodeId> {
        match self.get(id) {
            Some(node) if node.kind == NodeKind::Binary => node.neighbors.get(slot).copied(),
            _ => None,
        }
    }

    /// Slash-separated location such as `/config[0]/server[1]`
    ///
    /// Plain nodes have no location beyond their own name.
    pub fn path(&self, id: NodeId) -> String {
        let mut segments: Vec<NodeId> = self.ancestors(id).collect();
        segments.reverse();
        segments.push(id);

        let mut path = String::new();
        for segment in segments {
            path.push('/');
            path.push_str(self.name(segment).unwrap_or("?"));
            if let Some(index) = self.index(segment) {
                path.push_str(&format!("[{}]", index));
            }
        }
        path
    }
}
