//! Metadata schema subsystem
//!
//! Owns the per-dataset metadata document model and its validation.
//!
//! # Design Principles
//!
//! - Validation is a pure transform returning a new document
//! - Findings are data; only source failures are errors
//! - Legacy `obs_meta` shapes are migrated before any other logic
//! - A forced dtype is never reclassified
//! - Change detection by content hash, never by diffing

mod defaults;
mod errors;
mod hashing;
mod types;
mod validator;

pub use defaults::{coerce_default, DefaultOverrides};
pub use errors::{SchemaError, SchemaErrorCode, SchemaResult};
pub use hashing::content_hash;
pub use types::{
    AnnotationDescriptor, Dtype, FieldDescriptor, MetadataDocument, ObsMetaEntry, Organism,
    ValueDescriptor, ValueMap, LAYER_TYPES, MANDATORY_FIELDS, OPTIONAL_FIELDS,
};
pub use validator::{ObservationSource, SchemaValidator, ValidationReport};
