//! Metadata document persistence
//!
//! YAML documents on disk, one per dataset, with backup rotation when a
//! validation pass rewrites one.

mod backup;
mod document;
mod errors;

pub use backup::{backup_and_write, backup_path, next_backup_path};
pub use document::{dataset_id_from_path, list_documents, read_document, write_document, DOCUMENT_EXTENSION};
pub use errors::{PersistError, PersistResult};
