//! Sprig Core - Selector queries over node graphs
//!
//! This crate provides the node model, traversal algorithms, filter algebra,
//! selector compiler and query finder for the Sprig query engine.

pub mod compiler;
pub mod document;
pub mod error;
pub mod filter;
pub mod finder;
pub mod limits;
pub mod node;
pub mod pattern;
pub mod registry;
pub mod traversal;

pub use compiler::PatternCompiler;
pub use document::{Document, DocumentFormat, NodeView};
pub use error::{Error, Result};
pub use filter::{Filter, FilterArg, FilterArgs, FnFilter, MatchContext, NodeFilter};
pub use finder::NodeQueryFinder;
pub use node::{Node, NodeGraph, NodeId, NodeKind};
pub use pattern::{CompiledPattern, PatternCache, Relation, Stage};
pub use registry::{FilterFactory, FilterRegistry};
pub use traversal::{
    AcceptAll, BreadthFirstFinder, DepthFirstFinder, Predicate, Strategy, TopologicalSorter,
    TraversalStats,
};
