//! `warden-log`: command-line entry point into the Warden logging pipeline.

pub mod bootstrap_helpers;
pub mod cli_args;
pub mod runtime;

pub use cli_args::Cli;
pub use runtime::{build_store, build_thread_sink, default_console, resolve_logs_config, run_cli};
