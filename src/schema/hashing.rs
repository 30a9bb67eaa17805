//! Content hashing of metadata documents
//!
//! The hash is SHA-256 over the canonical JSON rendering of the document.
//! All maps in the model are ordered, so equal documents always hash equal
//! regardless of the key order they were read in.

use sha2::{Digest, Sha256};

use super::errors::{SchemaError, SchemaResult};
use super::types::MetadataDocument;

/// Computes the content hash of a document as lowercase hex.
pub fn content_hash(document: &MetadataDocument) -> SchemaResult<String> {
    let canonical = serde_json::to_vec(document)
        .map_err(|e| SchemaError::serialization(format!("Failed to canonicalise document: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}
