//! Graph execution scheduler for noderun.
//!
//! Given a graph and a selected node set, [`Scheduler::run`] executes every
//! selected node exactly once, never before its selected parents have
//! succeeded, with at most `threads` nodes in flight. Work is handed to a
//! [`NodeExecutor`], the only place a run suspends.
//!
//! # Example
//!
//! ```ignore
//! use noderun_scheduler::{FailurePolicy, Scheduler, SchedulerConfig};
//!
//! let scheduler = Scheduler::new(graph, executor, SchedulerConfig {
//!     threads: 8,
//!     failure_policy: FailurePolicy::CascadeSkip,
//! });
//! let report = scheduler.run(&selection.selected).await?;
//! ```

mod error;
mod executor;
mod report;
mod scheduler;
mod state;

pub use error::{Error, ExecutionError, Result};
pub use executor::NodeExecutor;
pub use report::{NodeReport, RunReport};
pub use scheduler::{DEFAULT_THREADS, FailurePolicy, Scheduler, SchedulerConfig};
pub use state::NodeState;
