//! Entry point: parses the CLI, initializes logging, and runs the
//! orchestration loop.

use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ivy::cli::{Cli, Command};
use ivy::{orchestrate, workdir};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_logging(&cli);

    match orchestrate::run(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            if cli.debug || cli.debug_events {
                tracing::error!(error = ?e, "fatal error");
            } else {
                tracing::error!(%e, "fatal error");
            }
            ExitCode::FAILURE
        }
    }
}

/// Console logging always runs; a per-invocation logfile is additionally
/// tee'd in for every command that has a work directory to write into
/// (`setup`'s directory doesn't exist yet when logging starts, and
/// `status` never touches one), matching spec.md §6's layout table.
/// Grounded on `raiko2/bin/raiko2/src/main.rs`'s `EnvFilter` + `fmt::layer`
/// setup and `host/src/main.rs`'s `tracing_appender::rolling::Builder`
/// rolling-file layer.
fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let console_layer = fmt::layer();

    let root = orchestrate::work_dir_path(&cli.config);
    let wants_file = !matches!(cli.command(), Command::Setup | Command::Status { .. });

    if wants_file && root.is_dir() {
        let path = workdir::next_logfile_path(&root);
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        if let Some(file_name) = file_name {
            if let Ok(appender) = Builder::new().rotation(Rotation::NEVER).filename_prefix(file_name).build(&root) {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .with(file_layer)
                    .init();
                return Some(guard);
            }
        }
    }

    tracing_subscriber::registry().with(env_filter).with(console_layer).init();
    None
}
