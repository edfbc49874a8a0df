use serde::Serialize;
use std::fmt;

/// Lifecycle state of one node within a run.
///
/// `Pending -> Running -> Succeeded | Failed`, or `Pending -> Skipped |
/// Cancelled` without ever running. `Excluded` describes graph nodes that
/// were never selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// Selected, waiting on parents or a free worker.
    Pending,
    /// Handed to the executor.
    Running,
    /// Executor returned success.
    Succeeded,
    /// Executor returned an error or panicked.
    Failed,
    /// Not run because of an upstream failure (or fail-fast).
    Skipped,
    /// Not run because the run was cancelled.
    Cancelled,
    /// Not part of the selection.
    Excluded,
}

impl NodeState {
    /// Whether the state can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Lowercase label used in output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
            Self::Excluded => "excluded",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!NodeState::Pending.is_terminal());
        assert!(!NodeState::Running.is_terminal());
        for state in [
            NodeState::Succeeded,
            NodeState::Failed,
            NodeState::Skipped,
            NodeState::Cancelled,
            NodeState::Excluded,
        ] {
            assert!(state.is_terminal(), "{state}");
        }
    }
}
