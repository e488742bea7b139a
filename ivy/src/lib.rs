//! Library surface for the `ivy` binary: exposed so the `tests/`
//! integration directory can drive the orchestration loop directly,
//! the way `raiko-host`'s `lib.rs` sits alongside its own `main.rs`.

pub mod cli;
pub mod error;
pub mod ingest;
pub mod orchestrate;
pub mod report;
pub mod workdir;
