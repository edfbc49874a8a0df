//! Project configuration from `noderun.toml`.
//!
//! Values resolve as: command-line flag, then environment variable (both
//! handled by clap), then the config file, then built-in defaults.

use crate::cli::{CliError, RunArgs, SelectionArgs};
use noderun_scheduler::{DEFAULT_THREADS, FailurePolicy, SchedulerConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE: &str = "noderun.toml";

/// Manifest location used when nothing else names one.
pub const DEFAULT_MANIFEST: &str = "target/manifest.json";

/// Contents of a `noderun.toml` file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Worker count.
    pub threads: Option<usize>,
    /// Use [`FailurePolicy::FailFast`] instead of cascade-skip.
    pub fail_fast: Option<bool>,
    /// Treat an empty selection as an error.
    pub strict_selection: Option<bool>,
    /// Compiled manifest path.
    pub manifest: Option<PathBuf>,
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, CliError> {
        let settings: Self = toml::from_str(content).map_err(|e| {
            CliError::config_with_help(
                format!("Failed to parse config: {e}"),
                "supported keys are threads, fail_fast, strict_selection and manifest",
            )
        })?;
        if settings.threads == Some(0) {
            return Err(CliError::config("threads must be at least 1"));
        }
        Ok(settings)
    }

    /// Load settings from `explicit`, or from `./noderun.toml` if present.
    ///
    /// An explicit path must exist; the implicit file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => {
                let path = Path::new(CONFIG_FILE);
                if path.is_file() {
                    Self::load_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_file(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let settings = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), ?settings, "Loaded config file");
        Ok(settings)
    }

    /// Resolve the flags shared by every subcommand.
    #[must_use]
    pub fn selection_options(&self, args: &SelectionArgs) -> SelectionOptions {
        SelectionOptions {
            strict: args.strict || self.strict_selection.unwrap_or(false),
            manifest: args
                .manifest
                .clone()
                .or_else(|| self.manifest.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST)),
        }
    }

    /// Resolve everything `noderun run` needs.
    #[must_use]
    pub fn run_options(&self, args: &RunArgs) -> RunOptions {
        let fail_fast = args.fail_fast || self.fail_fast.unwrap_or(false);
        RunOptions {
            selection: self.selection_options(&args.selection),
            scheduler: SchedulerConfig {
                threads: args.threads.or(self.threads).unwrap_or(DEFAULT_THREADS),
                failure_policy: if fail_fast {
                    FailurePolicy::FailFast
                } else {
                    FailurePolicy::CascadeSkip
                },
            },
            dry_run: args.dry_run,
        }
    }
}

/// Resolved selection flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionOptions {
    /// Fail on an empty selection.
    pub strict: bool,
    /// Manifest to load.
    pub manifest: PathBuf,
}

/// Resolved options for a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Selection flags.
    pub selection: SelectionOptions,
    /// Scheduler settings.
    pub scheduler: SchedulerConfig,
    /// Skip executing node commands.
    pub dry_run: bool,
}
