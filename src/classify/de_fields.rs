//! Differential-expression field names
//!
//! DE measurement fields are named `{category}__{value}__{measurement}`.
//! The base names of the log-fold-change fields are what categorical values
//! are cross-referenced against.

use std::collections::BTreeSet;

/// Suffix marking a log-fold-change measurement.
pub const DE_LFC_SUFFIX: &str = "__lfc";

/// Base names `{category}__{value}` that have DE results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeFieldSet {
    names: BTreeSet<String>,
}

impl DeFieldSet {
    /// Builds the set from measurement field names, keeping only `__lfc`
    /// fields and stripping the suffix.
    pub fn from_measurement_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = fields
            .into_iter()
            .filter_map(|f| f.as_ref().strip_suffix(DE_LFC_SUFFIX).map(str::to_string))
            .collect();
        Self { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
