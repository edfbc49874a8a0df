//! Selector resolution for noderun.
//!
//! Turns `--select` / `--exclude` arguments into the exact set of graph
//! nodes a run should touch:
//!
//! 1. [`parser`] converts each argument into groups of [`Criterion`]s,
//!    failing with [`SelectorError::Syntax`] before the graph is consulted.
//! 2. [`Criterion::evaluate`] matches one criterion against the graph and
//!    expands it through its ancestor/descendant qualifiers.
//! 3. [`SelectionSpec::resolve`] intersects comma-joined criteria, unions
//!    groups and arguments, and subtracts the excludes once at the end.
//!
//! # Example
//!
//! ```ignore
//! use noderun_select::SelectionSpec;
//!
//! let spec = SelectionSpec::parse(&["tag:nightly,+orders"], &["tag:deprecated"])?;
//! let selection = spec.resolve(&graph);
//! for id in selection.unique_ids(&graph) {
//!     println!("{id}");
//! }
//! ```

mod algebra;
mod criterion;
mod error;
pub mod parser;

pub use algebra::{Selection, SelectionExpr, SelectionGroup, SelectionSpec};
pub use criterion::{Criterion, Hops, Method};
pub use error::{Result, SelectorError};
