//! Group-by aggregation of a measurement by category

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::errors::{AggregateError, AggregateResult};
use super::stats::{mean, quantile_sorted, sorted_finite, std_dev};

/// Summary of the measurement within one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRow {
    pub category: String,
    /// Non-missing measurement values in the group
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub median: Option<f64>,
    pub q01: Option<f64>,
    pub q25: Option<f64>,
    pub q75: Option<f64>,
    pub q99: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl AggregationRow {
    fn summarise(category: String, values: Vec<f64>) -> Self {
        let sorted = sorted_finite(values);
        let q = |p: f64| quantile_sorted(&sorted, p);
        Self {
            count: sorted.len(),
            mean: mean(&sorted),
            std: std_dev(&sorted),
            median: q(0.5),
            q01: q(0.01),
            q25: q(0.25),
            q75: q(0.75),
            q99: q(0.99),
            min: sorted.first().copied(),
            max: sorted.last().copied(),
            category,
        }
    }
}

/// Ordered rows, one per category present in the input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregationResult {
    rows: Vec<AggregationRow>,
}

impl AggregationResult {
    pub fn rows(&self) -> &[AggregationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<&AggregationRow> {
        self.rows.iter().find(|r| r.category == category)
    }

    pub fn categories(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.category.as_str()).collect()
    }
}

/// Groups `values` by `categories` and summarises each group.
///
/// Rows with a missing category are excluded; missing values still make
/// their category appear. Rows follow `order` when given (unlisted
/// categories after it, ascending), otherwise ascending by category.
///
/// # Errors
///
/// `LengthMismatch` if the two series differ in length, `EmptyInput` if no
/// row carries a category.
pub fn aggregate(
    values: &[Option<f64>],
    categories: &[Option<String>],
    order: Option<&[String]>,
) -> AggregateResult<AggregationResult> {
    if values.len() != categories.len() {
        return Err(AggregateError::LengthMismatch {
            left: values.len(),
            right: categories.len(),
        });
    }

    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (value, category) in values.iter().zip(categories) {
        let Some(category) = category.as_deref() else {
            continue;
        };
        let group = groups.entry(category).or_default();
        if let Some(v) = value {
            group.push(*v);
        }
    }

    if groups.is_empty() {
        return Err(AggregateError::EmptyInput(
            "no rows with a category".to_string(),
        ));
    }

    let mut rows = Vec::with_capacity(groups.len());
    if let Some(order) = order {
        for category in order {
            if let Some(group) = groups.remove(category.as_str()) {
                rows.push(AggregationRow::summarise(category.clone(), group));
            }
        }
    }
    rows.extend(
        groups
            .into_iter()
            .map(|(category, group)| AggregationRow::summarise(category.to_string(), group)),
    );

    Ok(AggregationResult { rows })
}
