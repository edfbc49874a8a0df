//! Loading compiled graphs.
//!
//! Compilation of node bodies happens upstream; noderun consumes its output
//! through [`GraphSource`]. The default source is a JSON manifest:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "unique_id": "seed.shop.raw_users", "name": "raw_users", "kind": "seed" },
//!     { "unique_id": "model.shop.users", "name": "users", "kind": "model",
//!       "depends_on": ["seed.shop.raw_users"], "tags": ["bi"] }
//!   ]
//! }
//! ```

use crate::{Error, Node, NodeGraph, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supplies the fully resolved, cycle-free graph for a run.
pub trait GraphSource {
    /// Produce the compiled graph.
    fn compiled_graph(&self) -> Result<NodeGraph>;
}

/// Serialized list of compiled nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// All project nodes.
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Manifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            Error::manifest(format!("{e} (line {}, column {})", e.line(), e.column()))
        })
    }
}

impl GraphSource for Manifest {
    fn compiled_graph(&self) -> Result<NodeGraph> {
        NodeGraph::from_nodes(self.nodes.iter().cloned())
    }
}

/// A manifest stored on disk.
#[derive(Debug, Clone)]
pub struct ManifestFile {
    path: PathBuf,
}

impl ManifestFile {
    /// Point at a manifest file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The manifest location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GraphSource for ManifestFile {
    fn compiled_graph(&self) -> Result<NodeGraph> {
        let json = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::io(e, Some(self.path.clone()), "read manifest"))?;
        let manifest = Manifest::from_json(&json)?;
        debug!(
            path = %self.path.display(),
            nodes = manifest.nodes.len(),
            "Loaded manifest"
        );
        manifest.compiled_graph()
    }
}
