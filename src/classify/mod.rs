//! Observation field classification
//!
//! Inspects raw observation values and decides how each field is treated
//! downstream: binned as numerical, grouped as categorical, or skipped.
//! Classification is pure; the schema validator owns the document.

mod classifier;
mod de_fields;
mod series;

pub use classifier::{Classification, ClassifierConfig, TypeClassifier};
pub use de_fields::{DeFieldSet, DE_LFC_SUFFIX};
pub use series::{format_number, RawSeries, RawValue};
