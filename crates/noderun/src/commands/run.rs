//! `noderun run`: execute the selection and summarize the outcome.

use crate::backend::{DryRunExecutor, ShellExecutor};
use crate::cli::{CliError, OkEnvelope, RunArgs};
use crate::config::Settings;
use crate::context::RunContext;
use noderun_graph::ManifestFile;
use noderun_scheduler::{NodeExecutor, NodeState, RunReport, Scheduler};
use std::fmt::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Resolve the selection and execute it.
pub async fn execute(
    args: &RunArgs,
    settings: &Settings,
    json: bool,
    cancel: CancellationToken,
) -> Result<String, CliError> {
    let options = settings.run_options(args);
    let source = ManifestFile::new(&options.selection.manifest);
    let ctx = RunContext::load(
        &source,
        &args.selection.select,
        &args.selection.exclude,
        options.selection.strict,
    )?;

    let executor: Arc<dyn NodeExecutor> = if options.dry_run {
        Arc::new(DryRunExecutor)
    } else {
        let project_root = std::env::current_dir()
            .map_err(|e| CliError::config(format!("Failed to resolve working directory: {e}")))?;
        Arc::new(ShellExecutor::new(project_root))
    };
    let executor_name = executor.name();

    let scheduler = Scheduler::new(Arc::clone(&ctx.graph), executor, options.scheduler)
        .with_cancellation_token(cancel);
    info!(
        manifest = %source.path().display(),
        executor = executor_name,
        threads = scheduler.config().threads,
        policy = ?scheduler.config().failure_policy,
        "Starting run"
    );
    let report = scheduler.run(&ctx.selection.selected).await?;
    outcome(report, json)
}

/// Turn a finished run into command output or the matching error.
fn outcome(report: RunReport, json: bool) -> Result<String, CliError> {
    if report.cancelled {
        return Err(CliError::Cancelled {
            cancelled: report.count(NodeState::Cancelled),
            report: Box::new(report),
        });
    }
    if !report.is_success() {
        return Err(CliError::NodesFailed {
            failed: report.count(NodeState::Failed),
            skipped: report.count(NodeState::Skipped),
            report: Box::new(report),
        });
    }

    if json {
        serde_json::to_string(&OkEnvelope::new(&report))
            .map_err(|e| CliError::other(format!("Failed to serialize run report: {e}")))
    } else {
        Ok(format_report(&report))
    }
}

/// Human-readable run summary: one line per node, then the totals.
#[must_use]
pub fn format_report(report: &RunReport) -> String {
    if report.nodes.is_empty() {
        return "Nothing selected, no nodes were run.\n".to_string();
    }

    let width = report
        .nodes
        .iter()
        .map(|node| node.unique_id.len())
        .max()
        .unwrap_or(0);

    let mut output = String::new();
    for node in &report.nodes {
        let _ = write!(
            output,
            "{:<9} {:<width$}",
            node.state.as_str().to_uppercase(),
            node.unique_id
        );
        if let Some(duration) = node.duration {
            let _ = write!(output, "  {:.2}s", duration.as_secs_f64());
        }
        if let Some(error) = &node.error {
            let first_line = error.lines().next().unwrap_or_default();
            let _ = write!(output, "  {first_line}");
        }
        output.push('\n');
    }

    let _ = writeln!(
        output,
        "\nDone. {} succeeded, {} failed, {} skipped, {} cancelled in {:.2}s",
        report.count(NodeState::Succeeded),
        report.count(NodeState::Failed),
        report.count(NodeState::Skipped),
        report.count(NodeState::Cancelled),
        report.elapsed.as_secs_f64()
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use noderun_scheduler::NodeReport;
    use std::time::Duration;

    fn entry(id: &str, state: NodeState, error: Option<&str>) -> NodeReport {
        NodeReport {
            unique_id: id.to_string(),
            state,
            duration: matches!(state, NodeState::Succeeded | NodeState::Failed)
                .then(|| Duration::from_millis(250)),
            error: error.map(ToString::to_string),
        }
    }

    fn report(nodes: Vec<NodeReport>, cancelled: bool) -> RunReport {
        RunReport {
            nodes,
            cancelled,
            elapsed: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_success_is_ok() {
        let output = outcome(
            report(vec![entry("model.shop.users", NodeState::Succeeded, None)], false),
            false,
        )
        .unwrap();
        assert!(output.starts_with("SUCCEEDED model.shop.users  0.25s\n"), "{output}");
        assert!(output.contains("Done. 1 succeeded, 0 failed, 0 skipped, 0 cancelled in 0.50s"));
    }

    #[test]
    fn test_failure_maps_to_nodes_failed() {
        let err = outcome(
            report(
                vec![
                    entry("a", NodeState::Failed, Some("command exited with status 1")),
                    entry("b", NodeState::Skipped, Some("upstream node 'a' failed")),
                ],
                false,
            ),
            false,
        )
        .unwrap_err();
        match err {
            CliError::NodesFailed {
                failed, skipped, ..
            } => assert_eq!((failed, skipped), (1, 1)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_wins_over_failure() {
        let err = outcome(
            report(
                vec![
                    entry("a", NodeState::Failed, Some("boom")),
                    entry("b", NodeState::Cancelled, None),
                ],
                true,
            ),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Cancelled { cancelled: 1, .. }));
    }

    #[test]
    fn test_json_envelope() {
        let output = outcome(report(vec![entry("a", NodeState::Succeeded, None)], false), true)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["data"]["nodes"][0]["state"], "succeeded");
        assert_eq!(value["data"]["cancelled"], false);
    }

    #[test]
    fn test_empty_run_summary() {
        let output = outcome(report(Vec::new(), false), false).unwrap();
        assert_eq!(output, "Nothing selected, no nodes were run.\n");
    }

    #[test]
    fn test_format_shows_first_error_line() {
        let text = format_report(&report(
            vec![entry("a", NodeState::Failed, Some("command exited with status 2: line one\nline two"))],
            false,
        ));
        assert!(text.contains("FAILED    a  0.25s  command exited with status 2: line one"), "{text}");
        assert!(!text.contains("line two"));
    }
}
