//! Everything a command needs before it can act on the selection.

use crate::cli::CliError;
use noderun_graph::{GraphSource, NodeGraph, NodeIndex};
use noderun_select::{Selection, SelectionSpec};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// A loaded graph together with the resolved selection.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// The compiled project graph.
    pub graph: Arc<NodeGraph>,
    /// The parsed selector arguments.
    pub spec: SelectionSpec,
    /// The resolved node sets.
    pub selection: Selection,
}

impl RunContext {
    /// Parse selectors, load the graph and resolve the selection.
    ///
    /// Selectors are parsed first so a syntax error aborts before the
    /// manifest is read.
    pub fn load<S: AsRef<str>, E: AsRef<str>>(
        source: &dyn GraphSource,
        select: &[S],
        exclude: &[E],
        strict: bool,
    ) -> Result<Self, CliError> {
        let spec = SelectionSpec::parse(select, exclude)?;

        let start = Instant::now();
        let graph = source.compiled_graph()?;
        let selection = spec.resolve(&graph);
        info!(
            nodes = graph.node_count(),
            selected = selection.len(),
            duration_ms = start.elapsed().as_millis(),
            "Resolved selection"
        );

        selection.ensure_not_empty(strict, &spec)?;
        Ok(Self {
            graph: Arc::new(graph),
            spec,
            selection,
        })
    }

    /// Selected nodes in dependency order, ties broken by unique id.
    #[must_use]
    pub fn ordered(&self) -> Vec<NodeIndex> {
        self.graph.topological_order(&self.selection.selected)
    }
}
