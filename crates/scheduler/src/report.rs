//! Per-run outcome returned by the scheduler.

use crate::NodeState;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Outcome of one selected node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    /// The node's unique id.
    pub unique_id: String,
    /// Final state (always terminal once the run returns).
    pub state: NodeState,
    /// Wall time spent in the executor; `None` if the node never ran.
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Option<Duration>,
    /// Failure detail for failed nodes, or the upstream cause for skips.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything the scheduler did in one run.
///
/// Nodes appear in dispatch order; nodes that never ran follow in the
/// order they were skipped or cancelled.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// One entry per selected node.
    pub nodes: Vec<NodeReport>,
    /// Whether the run was cancelled before everything finished.
    pub cancelled: bool,
    /// Total wall time of the run.
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_elapsed")]
    pub elapsed: Duration,
}

impl RunReport {
    /// State of `unique_id` in this run; [`NodeState::Excluded`] when it was
    /// not part of the selection.
    #[must_use]
    pub fn state_of(&self, unique_id: &str) -> NodeState {
        self.get(unique_id)
            .map_or(NodeState::Excluded, |report| report.state)
    }

    /// The entry for `unique_id`, if it was selected.
    #[must_use]
    pub fn get(&self, unique_id: &str) -> Option<&NodeReport> {
        self.nodes.iter().find(|report| report.unique_id == unique_id)
    }

    /// Number of nodes that ended in `state`.
    #[must_use]
    pub fn count(&self, state: NodeState) -> usize {
        self.nodes.iter().filter(|report| report.state == state).count()
    }

    /// Ids of nodes that were handed to the executor, in dispatch order.
    pub fn executed(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|report| matches!(report.state, NodeState::Succeeded | NodeState::Failed))
            .map(|report| report.unique_id.as_str())
    }

    /// Whether every selected node succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.nodes.iter().all(|report| report.state == NodeState::Succeeded)
    }
}

#[allow(clippy::ref_option)]
fn serialize_secs<S: Serializer>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match duration {
        Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
        None => serializer.serialize_none(),
    }
}

fn serialize_elapsed<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, state: NodeState) -> NodeReport {
        NodeReport {
            unique_id: id.to_string(),
            state,
            duration: None,
            error: None,
        }
    }

    #[test]
    fn test_state_lookup_and_counts() {
        let report = RunReport {
            nodes: vec![
                entry("a", NodeState::Succeeded),
                entry("b", NodeState::Failed),
                entry("d", NodeState::Skipped),
            ],
            cancelled: false,
            elapsed: Duration::ZERO,
        };
        assert_eq!(report.state_of("b"), NodeState::Failed);
        assert_eq!(report.state_of("zzz"), NodeState::Excluded);
        assert_eq!(report.count(NodeState::Skipped), 1);
        assert_eq!(report.executed().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(!report.is_success());
    }

    #[test]
    fn test_empty_report_is_success() {
        assert!(RunReport::default().is_success());
    }

    #[test]
    fn test_serializes_states_in_lowercase() {
        let report = RunReport {
            nodes: vec![NodeReport {
                unique_id: "model.shop.users".to_string(),
                state: NodeState::Succeeded,
                duration: Some(Duration::from_millis(1500)),
                error: None,
            }],
            cancelled: false,
            elapsed: Duration::from_secs(2),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["nodes"][0]["state"], "succeeded");
        assert_eq!(json["nodes"][0]["duration_secs"], 1.5);
        assert!(json["nodes"][0].get("error").is_none());
        assert_eq!(json["elapsed_secs"], 2.0);
    }
}
