//! Differential-expression tables
//!
//! The table is long-form: each row is one `{category}__{value}__{measurement}`
//! field (for example `celltype__B__lfc`) with one number per gene. Rows
//! whose field does not split into exactly three parts are ignored.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::errors::{RegistryError, RegistryResult};

/// Name of the column holding the field names.
pub const FIELD_COLUMN: &str = "field";

/// Delimiter between the parts of a DE field name.
pub const DE_DELIMITER: &str = "__";

/// `value -> measurement -> gene -> number`
pub type DiffExpPivot = BTreeMap<String, BTreeMap<String, BTreeMap<String, Option<f64>>>>;

/// Parts of a DE field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeField<'a> {
    pub category: &'a str,
    pub value: &'a str,
    pub measurement: &'a str,
}

/// Splits a field name on `__` into exactly three parts.
pub fn parse_field(field: &str) -> Option<DeField<'_>> {
    let mut parts = field.split(DE_DELIMITER);
    let category = parts.next()?;
    let value = parts.next()?;
    let measurement = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some(DeField {
        category,
        value,
        measurement,
    })
}

/// A dataset's DE results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffExpTable {
    fields: Vec<String>,
    genes: BTreeMap<String, Vec<Option<f64>>>,
}

impl DiffExpTable {
    /// Builds a table from raw columns; the `field` column is required.
    pub fn from_columns(path: &Path, mut columns: BTreeMap<String, Vec<Value>>) -> RegistryResult<Self> {
        let fields = columns
            .remove(FIELD_COLUMN)
            .ok_or_else(|| RegistryError::Malformed {
                path: path.display().to_string(),
                reason: format!("missing '{}' column", FIELD_COLUMN),
            })?
            .into_iter()
            .map(|cell| match cell {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();

        let genes = columns
            .into_iter()
            .map(|(gene, cells)| (gene, cells.iter().map(Value::as_f64).collect()))
            .collect();

        Ok(Self { fields, genes })
    }

    pub fn new(fields: Vec<String>, genes: BTreeMap<String, Vec<Option<f64>>>) -> Self {
        Self { fields, genes }
    }

    /// Field names in row order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Distinct field names.
    pub fn distinct_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn genes(&self) -> impl Iterator<Item = &str> {
        self.genes.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Pivots the rows of one category for the given genes.
    ///
    /// # Errors
    ///
    /// `ColumnNotFound` if a gene has no column.
    pub fn pivot(&self, dataset_id: &str, category: &str, genes: &[String]) -> RegistryResult<DiffExpPivot> {
        let columns: Vec<(&String, &Vec<Option<f64>>)> = genes
            .iter()
            .map(|gene| {
                self.genes
                    .get(gene)
                    .map(|col| (gene, col))
                    .ok_or_else(|| RegistryError::column_not_found(dataset_id, gene))
            })
            .collect::<RegistryResult<_>>()?;

        let mut pivot = DiffExpPivot::new();
        for (row, field) in self.fields.iter().enumerate() {
            let Some(parsed) = parse_field(field) else {
                continue;
            };
            if parsed.category != category {
                continue;
            }
            let measurements = pivot
                .entry(parsed.value.to_string())
                .or_default()
                .entry(parsed.measurement.to_string())
                .or_default();
            for (gene, column) in &columns {
                let cell = column.get(row).copied().flatten();
                measurements.insert((*gene).clone(), cell);
            }
        }
        Ok(pivot)
    }
}
