//! Executors that run node commands.

use async_trait::async_trait;
use noderun_graph::Node;
use noderun_scheduler::{ExecutionError, NodeExecutor};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Number of stderr lines kept when a command fails
pub const FAILURE_OUTPUT_LINES: usize = 20;

/// Runs each node's compiled command with `sh -c` in the project root.
///
/// Output is captured, not streamed. Nodes without a command succeed
/// immediately.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    project_root: PathBuf,
}

impl ShellExecutor {
    /// Create an executor that runs commands from `project_root`.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }
}

#[async_trait]
impl NodeExecutor for ShellExecutor {
    async fn execute(&self, node: &Node) -> Result<(), ExecutionError> {
        let Some(command) = node.command.as_deref() else {
            debug!(node = %node.unique_id, "Node has no command");
            return Ok(());
        };

        let start = Instant::now();
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.project_root)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExecutionError::io(e, format!("spawn command for {}", node.unique_id)))?;

        let duration_ms = start.elapsed().as_millis();
        if output.status.success() {
            debug!(node = %node.unique_id, duration_ms, "Command succeeded");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            node = %node.unique_id,
            exit = ?output.status.code(),
            duration_ms,
            "Command failed"
        );
        Err(ExecutionError::ExitStatus {
            code: output.status.code(),
            stderr: tail_lines(&stderr, FAILURE_OUTPUT_LINES),
        })
    }

    fn name(&self) -> &'static str {
        "shell"
    }
}

/// Walks the schedule without running anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl NodeExecutor for DryRunExecutor {
    async fn execute(&self, node: &Node) -> Result<(), ExecutionError> {
        info!(node = %node.unique_id, kind = %node.kind, "Dry run");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}

/// Last `max_lines` non-trailing lines of `content`.
fn tail_lines(content: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = content.trim_end().lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
