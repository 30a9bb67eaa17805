//! Dataset registry and column access
//!
//! The registry maps dataset ids to metadata documents; column storage
//! supplies observation, measurement and differential-expression tables.
//! [`DatasetService`] ties both to the statistics cache and is the
//! observation source the schema validator runs against.

mod columns;
mod diffexp;
mod errors;
#[allow(clippy::module_inception)]
mod registry;
mod service;

pub use columns::{ColumnSource, JsonColumnStore, MemoryColumnStore};
pub use diffexp::{parse_field, DeField, DiffExpPivot, DiffExpTable, DE_DELIMITER, FIELD_COLUMN};
pub use errors::{RegistryError, RegistryResult};
pub use registry::Registry;
pub use service::{ColumnSummary, DatasetService, MetaColumn};
