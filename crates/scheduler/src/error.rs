//! Error types for the scheduler and for individual node executions.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop a run from being scheduled or completed.
///
/// Node failures are not errors at this level; they are recorded in the
/// [`RunReport`](crate::RunReport).
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The scheduler configuration is unusable.
    #[error("Invalid scheduler configuration: {message}")]
    #[diagnostic(code(noderun_scheduler::config))]
    Configuration {
        /// What is wrong
        message: String,
    },

    /// The selected set references an index the graph does not hold.
    #[error("Selected node index {index} is not part of the graph")]
    #[diagnostic(code(noderun_scheduler::unknown_node))]
    UnknownNode {
        /// The foreign index
        index: usize,
    },

    /// A worker task died outside the executor call.
    #[error("Scheduler worker failed: {message}")]
    #[diagnostic(code(noderun_scheduler::worker))]
    Worker {
        /// Join error description
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Why a single node execution failed.
#[derive(Error, Debug, Diagnostic)]
pub enum ExecutionError {
    /// The node's command ran and reported failure.
    #[error("command exited with status {}", format_code(.code))]
    #[diagnostic(code(noderun_scheduler::exit_status))]
    ExitStatus {
        /// Process exit code, if the process exited normally
        code: Option<i32>,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// The node could not be started.
    #[error("failed to {operation}: {source}")]
    #[diagnostic(code(noderun_scheduler::io))]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Description of the operation that failed
        operation: String,
    },

    /// The executor panicked while running the node.
    #[error("executor panicked: {message}")]
    #[diagnostic(code(noderun_scheduler::panic))]
    Panicked {
        /// Panic payload, when it was a string
        message: String,
    },

    /// Any other failure reported by an executor.
    #[error("{message}")]
    #[diagnostic(code(noderun_scheduler::execution))]
    Failed {
        /// Failure description
        message: String,
    },
}

impl ExecutionError {
    /// Create a generic failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            operation: operation.into(),
        }
    }

    /// Build a panic failure from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked { message }
    }

    /// One-line description including captured stderr, for reports.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::ExitStatus { stderr, .. } if !stderr.is_empty() => format!("{self}: {stderr}"),
            _ => self.to_string(),
        }
    }
}

fn format_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}
