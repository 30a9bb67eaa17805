//! Derived-statistics cache
//!
//! Content-addressed memoization of expensive per-dataset computations,
//! such as column listings and full-dataset aggregates.
//!
//! # Design Principles
//!
//! - Keys are `(operation, canonical args)`, addressed by SHA-256
//! - Durable storage with atomic per-key writes
//! - No automatic eviction; entries are replaced only on refresh
//! - Store errors and computation errors stay distinct

mod errors;
mod key;
mod service;
mod store;

pub use errors::{CacheError, CacheResult};
pub use key::CacheKey;
pub use service::{CacheStats, StatisticsCache};
pub use store::{CacheEntry, CacheStore, DiskStore, MemoryStore};
