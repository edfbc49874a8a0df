// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]
// Command output goes to stdout by design
#![allow(clippy::print_stdout, clippy::print_stderr)]

//! noderun - select and run nodes of a compiled project graph
//!
//! The library half of the `noderun` binary: argument definitions, config
//! resolution, logging setup and the `run` / `list` commands. The selector
//! engine and scheduler live in `noderun-select` and `noderun-scheduler`.

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod logging;

pub use backend::{DryRunExecutor, ShellExecutor};
pub use cli::{CliError, EXIT_OK, exit_code_for, render_error};
pub use context::RunContext;
