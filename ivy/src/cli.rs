//! Command-line interface (spec.md §6).
//!
//! `ivy [global-options] <config>.ivy [command] [command-options] [proof...]`.
//! Grounded on `raiko2/bin/raiko2/src/cli.rs`'s `clap::Parser` derive style,
//! generalized to a config-file positional plus an optional subcommand that
//! defaults to `run`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ivy")]
#[command(version, about = "Formal-verification proof orchestrator", long_about = None)]
pub struct Cli {
    /// Path to the `.ivy` configuration file.
    pub config: PathBuf,

    /// Overwrite an existing work directory (only meaningful with `setup`).
    #[arg(short = 'f', long, global = true)]
    pub force: bool,

    /// Raise the tracing filter to `debug`.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Additionally trace every `ProofStatusEvent` as the scheduler handles it.
    #[arg(long, global = true)]
    pub debug_events: bool,

    /// Job-server lease capacity: at most this many solver subprocesses run
    /// concurrently.
    #[arg(short = 'j', long = "jobs", default_value_t = 1, global = true)]
    pub jobs: usize,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the work directory and persistent status store, then stop.
    Setup,
    /// Schedule and run proof tasks, then report status (default command).
    Run {
        /// Restrict to these proofs/invariants (and what they need); all
        /// solvable entities if omitted.
        proofs: Vec<String>,
    },
    /// Like `run`, but accepts `--reset-schedule`.
    Prove {
        /// Re-dispatch tasks left `pending`, `scheduled`, or `running` from
        /// an interrupted previous invocation, instead of skipping them.
        #[arg(long)]
        reset_schedule: bool,
        proofs: Vec<String>,
    },
    /// Print the current status report from the persisted store, without
    /// dispatching anything.
    Status { proofs: Vec<String> },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run { proofs: Vec::new() })
    }
}
