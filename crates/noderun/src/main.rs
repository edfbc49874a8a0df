//! noderun CLI entry point

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use noderun::cli::{self, EXIT_OK, EXIT_SIGINT, exit_code_for, render_error};
use noderun::commands;
use noderun::logging::{self, LogFormat, LoggingConfig};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

fn main() {
    // Tracing may be unusable mid-panic, so the hook writes directly.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("{}", cli::panic_notice(panic_info));
    }));

    let cli = cli::parse();

    let logging_config = LoggingConfig {
        format: if cli.json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        },
        level: cli.level.into(),
        filter: None,
    };
    if let Err(e) = logging::init_logging(&logging_config) {
        eprintln!("Warning: {e}");
    }

    let exit_code = run_with_tokio(&cli);
    std::process::exit(exit_code);
}

/// Build the runtime, wire Ctrl-C to cancellation and run the command.
fn run_with_tokio(cli: &cli::Cli) -> i32 {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            return cli::EXIT_INTERNAL;
        }
    };

    let cancel = CancellationToken::new();
    install_interrupt_handler(cancel.clone());

    match rt.block_on(commands::execute(cli, cancel)) {
        Ok(output) => {
            print!("{output}");
            let _ = std::io::stdout().flush();
            EXIT_OK
        }
        Err(err) => {
            if !cli.json
                && let Some(report) = err.report()
            {
                print!("{}", commands::run::format_report(report));
                let _ = std::io::stdout().flush();
            }
            render_error(&err, cli.json);
            exit_code_for(&err)
        }
    }
}

/// First interrupt cancels the run; a second one exits immediately.
fn install_interrupt_handler(cancel: CancellationToken) {
    static INTERRUPTED: AtomicBool = AtomicBool::new(false);

    let result = ctrlc::set_handler(move || {
        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            std::process::exit(EXIT_SIGINT);
        }
        eprintln!("Interrupted, waiting for running nodes to finish (press Ctrl-C again to abort)");
        cancel.cancel();
    });
    if let Err(e) = result {
        tracing::warn!(error = %e, "Failed to install interrupt handler");
    }
}
