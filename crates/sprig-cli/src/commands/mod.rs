//! CLI command implementations

pub mod completions;
pub mod config;
pub mod explain;
pub mod functions;
pub mod io;
pub mod query;
pub mod sort;
