//! obsmeta - metadata validation and derived statistics for single-cell datasets
//!
//! - [`schema`]: metadata documents and their validation
//! - [`classify`]: observation field type inference
//! - [`aggregate`]: grouped summaries and quantile binning
//! - [`cache`]: persistent memoization of derived statistics
//! - [`registry`]: datasets, their column storage and queries over them
//! - [`persist`]: document files and backups

pub mod aggregate;
pub mod cache;
pub mod classify;
pub mod cli;
pub mod config;
pub mod observability;
pub mod persist;
pub mod registry;
pub mod schema;
