//! Validation utilities for node graphs.

use crate::{Error, NodeGraph};
use petgraph::algo::toposort;

/// Result of graph validation.
#[derive(Debug)]
pub struct ValidationResult {
    /// Whether the graph is valid (no cycles).
    pub is_valid: bool,
    /// List of validation errors, if any.
    pub errors: Vec<Error>,
}

impl ValidationResult {
    /// Create a valid result.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    /// Create an invalid result with errors.
    #[must_use]
    pub fn invalid(errors: Vec<Error>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

impl NodeGraph {
    /// Validate the graph structure.
    ///
    /// Missing parents are rejected while edges are wired, so this only
    /// checks that no node is its own ancestor.
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        match toposort(self.inner(), None) {
            Ok(_) => ValidationResult::valid(),
            Err(cycle) => {
                let id = self.unique_id(cycle.node_id());
                ValidationResult::invalid(vec![Error::CycleDetected {
                    message: format!("node '{id}' is its own ancestor"),
                }])
            }
        }
    }
}
