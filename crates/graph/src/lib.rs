//! Project node graph for noderun.
//!
//! This crate holds the directed acyclic graph of project nodes (models,
//! seeds, tests, snapshots) built on petgraph, together with the traversal
//! primitives the selector engine and scheduler rely on.
//!
//! # Key Types
//!
//! - [`NodeGraph`]: The immutable, validated graph of project nodes
//! - [`Node`]: One runnable unit with its tags, path, config and parents
//! - [`NodeSet`]: An ordered set of node indices produced by traversals
//! - [`GraphSource`]: Anything able to supply a compiled graph (e.g. [`ManifestFile`])
//!
//! # Example
//!
//! ```ignore
//! use noderun_graph::{Node, NodeGraph, NodeKind};
//!
//! let graph = NodeGraph::from_nodes(vec![
//!     Node::new("model.shop.base_users", "base_users", NodeKind::Model),
//!     Node::new("model.shop.users", "users", NodeKind::Model)
//!         .with_parent("model.shop.base_users"),
//! ])?;
//!
//! let users = graph.index_of("model.shop.users").unwrap();
//! let upstream = graph.ancestors(users, None);
//! ```

mod error;
mod graph;
mod manifest;
mod node;
mod traversal;
mod validation;

pub use error::{Error, Result};
pub use graph::NodeGraph;
pub use manifest::{GraphSource, Manifest, ManifestFile};
pub use node::{Node, NodeKind};
pub use petgraph::graph::NodeIndex;
pub use traversal::NodeSet;
pub use validation::ValidationResult;
