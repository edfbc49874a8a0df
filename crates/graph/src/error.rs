//! Error types for node graph operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for node graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or loading a node graph.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A dependency cycle was detected in the graph.
    #[error("Cycle detected in node graph: {message}")]
    #[diagnostic(code(noderun_graph::cycle))]
    CycleDetected {
        /// Human-readable description of the cycle.
        message: String,
    },

    /// Two nodes share the same unique id.
    #[error("Duplicate node id '{id}'")]
    #[diagnostic(code(noderun_graph::duplicate))]
    DuplicateNode {
        /// The repeated unique id.
        id: String,
    },

    /// One or more nodes reference parents that are not in the graph.
    #[error("Missing dependencies: {}", format_missing(.missing))]
    #[diagnostic(
        code(noderun_graph::missing_dependency),
        help("every entry in depends_on must name the unique_id of another node")
    )]
    MissingDependencies {
        /// List of (node, missing_parent) pairs.
        missing: Vec<(String, String)>,
    },

    /// The manifest could not be read.
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(noderun_graph::io))]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// The path being accessed
        path: Option<Box<std::path::Path>>,
        /// Description of the operation that failed
        operation: String,
    },

    /// The manifest was readable but not a valid node list.
    #[error("Invalid manifest: {message}")]
    #[diagnostic(code(noderun_graph::manifest))]
    Manifest {
        /// What was wrong with the manifest
        message: String,
    },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.map(|p| p.into_boxed_path()),
            operation: operation.into(),
        }
    }

    /// Create a manifest error
    pub fn manifest(message: impl Into<String>) -> Self {
        Self::Manifest {
            message: message.into(),
        }
    }
}

fn format_missing(missing: &[(String, String)]) -> String {
    missing
        .iter()
        .map(|(node, dep)| format!("Node '{node}' depends on missing node '{dep}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
