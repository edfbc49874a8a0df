//! The seam between the scheduler and whatever actually runs a node.

use crate::ExecutionError;
use async_trait::async_trait;
use noderun_graph::Node;

/// Runs one node to completion.
///
/// Implementations must be safe to call concurrently for different nodes.
/// The scheduler never calls `execute` twice for the same node in one run,
/// and never before every selected parent has succeeded.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Execute `node`, returning `Ok(())` on success.
    async fn execute(&self, node: &Node) -> Result<(), ExecutionError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
