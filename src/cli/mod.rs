//! CLI module for obsmeta
//!
//! Provides command-line interface for:
//! - check: Validate and classify a metadata document
//! - datasets: List registered datasets
//! - meta / aggregate / diffexp: One-shot dataset queries
//! - cache-refresh: Recompute cached column listings

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    aggregate, cache_refresh, check, datasets, diffexp, meta, run, run_command, CheckOutcome,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
