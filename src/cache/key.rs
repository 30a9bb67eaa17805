//! Cache keys
//!
//! A key is the operation name plus the canonical JSON of its arguments.
//! Arguments serialize through `serde_json::Value`, whose maps are ordered,
//! so equal arguments always produce equal keys. The digest addresses the
//! entry in the store.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::errors::{CacheError, CacheResult};

/// Identity of one memoized computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    operation: String,
    args: String,
    digest: String,
}

impl CacheKey {
    /// Builds a key from an operation name and any serializable arguments.
    pub fn new<A: Serialize + ?Sized>(operation: &str, args: &A) -> CacheResult<Self> {
        let canonical = serde_json::to_value(args)
            .and_then(|v| serde_json::to_string(&v))
            .map_err(|e| CacheError::Serialization(format!("arguments of {}: {}", operation, e)))?;

        let mut hasher = Sha256::new();
        hasher.update(operation.as_bytes());
        hasher.update([0u8]);
        hasher.update(canonical.as_bytes());

        Ok(Self {
            operation: operation.to_string(),
            args: canonical,
            digest: hex::encode(hasher.finalize()),
        })
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Canonical JSON of the arguments
    pub fn args(&self) -> &str {
        &self.args
    }

    /// Lowercase hex SHA-256 of operation and arguments
    pub fn digest(&self) -> &str {
        &self.digest
    }
}
