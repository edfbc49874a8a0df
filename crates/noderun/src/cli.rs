//! Command-line definitions, error types and exit-code mapping.

use crate::logging::LogLevel;
use clap::{Args, Parser, Subcommand};
use miette::{Diagnostic, Report};
use noderun_scheduler::RunReport;
use noderun_select::SelectorError;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// At least one node failed or was skipped
pub const EXIT_FAILURE: i32 = 1;
/// Selector syntax error, or an empty selection under `--strict`
pub const EXIT_SELECTOR: i32 = 2;
/// Configuration or manifest error
pub const EXIT_CONFIG: i32 = 3;
/// Internal failure unrelated to node outcomes (dead worker, runtime setup)
pub const EXIT_INTERNAL: i32 = 4;
/// Exit code for SIGINT (128 + signal number 2)
pub const EXIT_SIGINT: i32 = 130;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Selector syntax error or strict empty selection (exit code 2)
    #[error(transparent)]
    #[diagnostic(transparent)]
    Selector(#[from] SelectorError),

    /// Invalid configuration file or option (exit code 3)
    #[error("Configuration error: {message}")]
    #[diagnostic(code(noderun::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// Manifest missing, unreadable or not a valid graph (exit code 3)
    #[error("Manifest error: {message}")]
    #[diagnostic(code(noderun::cli::manifest))]
    Manifest {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// The run finished but not every node succeeded (exit code 1)
    #[error("Run failed: {failed} node(s) failed, {skipped} skipped")]
    #[diagnostic(
        code(noderun::cli::run_failed),
        help("per-node errors are listed in the run summary")
    )]
    NodesFailed {
        /// Number of failed nodes
        failed: usize,
        /// Number of skipped nodes
        skipped: usize,
        /// The full run report
        report: Box<RunReport>,
    },

    /// The run was interrupted (exit code 130)
    #[error("Run cancelled: {cancelled} node(s) never started")]
    #[diagnostic(code(noderun::cli::cancelled))]
    Cancelled {
        /// Number of nodes marked cancelled
        cancelled: usize,
        /// The full run report
        report: Box<RunReport>,
    },

    /// Other unexpected error (exit code 4)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(noderun::cli::other))]
    Other {
        /// The error message
        message: String,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new manifest error with help text
    #[must_use]
    pub fn manifest_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Manifest {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Short machine-readable code used in JSON envelopes.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Selector(SelectorError::Syntax { .. }) => "selector_syntax",
            Self::Selector(SelectorError::Empty { .. }) => "selection_empty",
            Self::Config { .. } => "config",
            Self::Manifest { .. } => "manifest",
            Self::NodesFailed { .. } => "nodes_failed",
            Self::Cancelled { .. } => "cancelled",
            Self::Other { .. } => "other",
        }
    }

    /// The run report carried by run outcomes, if any.
    #[must_use]
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            Self::NodesFailed { report, .. } | Self::Cancelled { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Convert `noderun_graph::Error` to a manifest error.
impl From<noderun_graph::Error> for CliError {
    fn from(err: noderun_graph::Error) -> Self {
        match err {
            noderun_graph::Error::Io {
                source,
                path,
                operation,
            } => {
                let path_str = path
                    .as_ref()
                    .map_or(String::new(), |p| format!(" on {}", p.display()));
                Self::manifest_with_help(
                    format!("I/O {operation} failed{path_str}: {source}"),
                    "compile the project first, or point --manifest / NODERUN_MANIFEST at the manifest file",
                )
            }
            noderun_graph::Error::CycleDetected { .. }
            | noderun_graph::Error::DuplicateNode { .. }
            | noderun_graph::Error::MissingDependencies { .. } => Self::manifest_with_help(
                err.to_string(),
                "the manifest does not describe a valid dependency graph; recompile the project",
            ),
            noderun_graph::Error::Manifest { message } => Self::Manifest {
                message,
                help: None,
            },
        }
    }
}

/// Scheduler errors are configuration problems or internal failures.
impl From<noderun_scheduler::Error> for CliError {
    fn from(err: noderun_scheduler::Error) -> Self {
        match err {
            noderun_scheduler::Error::Configuration { message } => Self::config(message),
            other => Self::other(other.to_string()),
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Selector(_) => EXIT_SELECTOR,
        CliError::Config { .. } | CliError::Manifest { .. } => EXIT_CONFIG,
        CliError::NodesFailed { .. } => EXIT_FAILURE,
        CliError::Other { .. } => EXIT_INTERNAL,
        CliError::Cancelled { .. } => EXIT_SIGINT,
    }
}

/// JSON error envelope for `err`.
#[must_use]
pub fn error_envelope(err: &CliError) -> ErrorEnvelope<serde_json::Value> {
    let mut error = serde_json::json!({
        "code": err.code(),
        "message": err.to_string(),
    });
    if let Some(report) = err.report() {
        error["report"] = serde_json::to_value(report).unwrap_or(serde_json::Value::Null);
    }
    ErrorEnvelope::new(error)
}

/// Render error appropriately based on JSON flag
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        match serde_json::to_string(&error_envelope(err)) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Text printed by the panic hook.
///
/// Executor panics are caught by the scheduler and reported as node
/// failures, so the notice must not claim the run was aborted.
#[must_use]
pub fn panic_notice(panic: &dyn std::fmt::Display) -> String {
    format!(
        "noderun panicked: {panic}\n\
         If this happened inside a node, that node is reported as failed and the run continues.\n\
         Otherwise this is a bug; run with RUST_LOG=debug for more information."
    )
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Select and run nodes of a compiled project graph.
#[derive(Parser, Debug)]
#[command(name = "noderun")]
#[command(about = "Select and run nodes of a compiled project graph in dependency order")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Emit JSON envelopes on stdout and JSON logs on stderr.
    #[arg(long, global = true, help = "Emit JSON output")]
    pub json: bool,

    /// Explicit configuration file.
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "NODERUN_CONFIG",
        help = "Path to a noderun.toml (default: ./noderun.toml if present)"
    )]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute the selected nodes.
    #[command(about = "Run the selected nodes in dependency order")]
    Run(RunArgs),

    /// Print the selected nodes without running them.
    #[command(about = "List the selected nodes in dependency order", visible_alias = "ls")]
    List(ListArgs),
}

/// Selector and manifest flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Include selectors; several values or repeated flags are unioned.
    #[arg(
        short = 's',
        long = "select",
        visible_alias = "models",
        visible_short_alias = 'm',
        value_name = "SELECTOR",
        num_args = 1..,
        action = clap::ArgAction::Append,
        help = "Nodes to include (e.g. users, tag:nightly, +orders, orders+2, @base, *)"
    )]
    pub select: Vec<String>,

    /// Exclude selectors, subtracted after all includes are unioned.
    #[arg(
        long,
        value_name = "SELECTOR",
        num_args = 1..,
        action = clap::ArgAction::Append,
        help = "Nodes to remove from the selection"
    )]
    pub exclude: Vec<String>,

    /// Treat an empty selection as an error.
    #[arg(long, help = "Fail when the selection matches no nodes")]
    pub strict: bool,

    /// Compiled manifest to read the graph from.
    #[arg(
        long,
        value_name = "PATH",
        env = "NODERUN_MANIFEST",
        help = "Path to the compiled manifest (default: target/manifest.json)"
    )]
    pub manifest: Option<PathBuf>,
}

/// Arguments for `noderun run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Selection flags.
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Worker count.
    #[arg(
        short = 't',
        long,
        value_name = "N",
        env = "NODERUN_THREADS",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..),
        help = "Maximum number of nodes to run at once"
    )]
    pub threads: Option<usize>,

    /// Stop dispatching after the first failure.
    #[arg(long, help = "Stop scheduling new nodes after the first failure")]
    pub fail_fast: bool,

    /// Resolve and order the selection without executing anything.
    #[arg(long, help = "Walk the schedule without executing node commands")]
    pub dry_run: bool,
}

/// Arguments for `noderun list`.
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Selection flags.
    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Parse command-line arguments into CLI structure
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use noderun_scheduler::{NodeReport, NodeState};
    use std::time::Duration;

    fn run_args(cli: Cli) -> RunArgs {
        match cli.command {
            Commands::Run(args) => args,
            Commands::List(_) => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["noderun", "run"]).unwrap();
        assert_eq!(cli.level, LogLevel::Warn);
        assert!(!cli.json);
        let args = run_args(cli);
        assert!(args.selection.select.is_empty());
        assert!(args.selection.exclude.is_empty());
        assert!(!args.fail_fast);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_select_aliases_and_multiple_values() {
        let cli = Cli::try_parse_from([
            "noderun", "run", "-m", "tag:bi,@users", "@base,tag:base", "--select", "+orders",
            "--exclude", "users+", "--exclude", "tag:deprecated",
        ])
        .unwrap();
        let args = run_args(cli);
        assert_eq!(
            args.selection.select,
            vec!["tag:bi,@users", "@base,tag:base", "+orders"]
        );
        assert_eq!(args.selection.exclude, vec!["users+", "tag:deprecated"]);

        let cli = Cli::try_parse_from(["noderun", "run", "--models", "users"]).unwrap();
        assert_eq!(run_args(cli).selection.select, vec!["users"]);
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from([
            "noderun", "-L", "debug", "--json", "run", "-t", "8", "--fail-fast", "--dry-run",
            "--strict",
        ])
        .unwrap();
        assert_eq!(cli.level, LogLevel::Debug);
        assert!(cli.json);
        let args = run_args(cli);
        assert_eq!(args.threads, Some(8));
        assert!(args.fail_fast);
        assert!(args.dry_run);
        assert!(args.selection.strict);
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(Cli::try_parse_from(["noderun", "run", "--threads", "0"]).is_err());
    }

    #[test]
    fn test_list_alias() {
        let cli = Cli::try_parse_from(["noderun", "ls", "-s", "tag:bi"]).unwrap();
        match cli.command {
            Commands::List(args) => assert_eq!(args.selection.select, vec!["tag:bi"]),
            Commands::Run(_) => panic!("expected list"),
        }
    }

    #[test]
    fn test_exit_codes() {
        let syntax = CliError::from(SelectorError::syntax("x:y", 0, "x", "unknown selector method"));
        assert_eq!(exit_code_for(&syntax), EXIT_SELECTOR);
        let empty = CliError::from(SelectorError::Empty {
            select: "a,b".into(),
            exclude: String::new(),
        });
        assert_eq!(exit_code_for(&empty), EXIT_SELECTOR);
        assert_eq!(exit_code_for(&CliError::config("bad")), EXIT_CONFIG);
        assert_eq!(
            exit_code_for(&CliError::from(noderun_graph::Error::manifest("bad"))),
            EXIT_CONFIG
        );
        assert_eq!(exit_code_for(&CliError::other("boom")), EXIT_INTERNAL);
        let failed = CliError::NodesFailed {
            failed: 1,
            skipped: 0,
            report: Box::default(),
        };
        assert_eq!(exit_code_for(&failed), EXIT_FAILURE);
        assert_ne!(exit_code_for(&failed), exit_code_for(&CliError::other("boom")));
        let cancelled = CliError::Cancelled {
            cancelled: 2,
            report: Box::default(),
        };
        assert_eq!(exit_code_for(&cancelled), EXIT_SIGINT);
    }

    #[test]
    fn test_panic_notice_does_not_claim_abort() {
        let notice = panic_notice(&"executor blew up");
        assert!(notice.starts_with("noderun panicked: executor blew up\n"), "{notice}");
        assert!(notice.contains("reported as failed and the run continues"));
        assert!(!notice.contains("Internal error occurred"));
    }

    #[test]
    fn test_error_envelope_includes_report() {
        let report = RunReport {
            nodes: vec![NodeReport {
                unique_id: "model.shop.users".into(),
                state: NodeState::Failed,
                duration: Some(Duration::from_millis(10)),
                error: Some("command exited with status 1".into()),
            }],
            cancelled: false,
            elapsed: Duration::from_millis(12),
        };
        let err = CliError::NodesFailed {
            failed: 1,
            skipped: 0,
            report: Box::new(report),
        };
        let json = serde_json::to_value(error_envelope(&err)).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["code"], "nodes_failed");
        assert_eq!(json["error"]["report"]["nodes"][0]["state"], "failed");

        let json = serde_json::to_value(error_envelope(&CliError::config("bad"))).unwrap();
        assert!(json["error"].get("report").is_none());
    }
}
