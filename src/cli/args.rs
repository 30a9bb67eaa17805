//! CLI argument definitions using clap
//!
//! Commands:
//! - obsmeta check <yaml> [key=value...]
//! - obsmeta datasets [--has-de]
//! - obsmeta meta <dataset> <field> [--raw]
//! - obsmeta aggregate <dataset> <gene> <meta> [--refresh]
//! - obsmeta diffexp <dataset> <category> <gene>...
//! - obsmeta cache-refresh <dataset>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// obsmeta - metadata validation and derived statistics for single-cell datasets
#[derive(Parser, Debug)]
#[command(name = "obsmeta")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory, overriding the configuration
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a metadata document and write it back if it changed
    Check {
        /// Metadata document; its file stem is the dataset id
        yaml: PathBuf,

        /// Defaults for missing fields, as key=value
        defaults: Vec<String>,
    },

    /// List datasets
    Datasets {
        /// Only datasets with differential-expression data
        #[arg(long)]
        has_de: bool,
    },

    /// Print one observation column
    Meta {
        dataset: String,
        field: String,

        /// Stored values instead of labels or bins
        #[arg(long)]
        raw: bool,
    },

    /// Summarise a gene per category of an observation field
    Aggregate {
        dataset: String,
        gene: String,
        meta: String,

        /// Recompute instead of serving a cached summary
        #[arg(long)]
        refresh: bool,
    },

    /// Differential-expression results of one category
    Diffexp {
        dataset: String,
        category: String,

        #[arg(required = true)]
        genes: Vec<String>,
    },

    /// Recompute the cached column listings of a dataset
    CacheRefresh { dataset: String },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
