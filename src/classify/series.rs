//! Raw observation values
//!
//! A raw series is whatever the column store holds for one observation
//! field: numbers, strings, booleans and missing entries, possibly mixed.
//! Everything here is order-independent: shuffling a series never changes
//! whether it is numeric or which distinct values it has.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// One raw cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Converts a JSON cell. Nested arrays and objects become text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => RawValue::Missing,
            Value::Bool(b) => RawValue::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(RawValue::Missing, RawValue::Number),
            Value::String(s) => RawValue::Text(s.clone()),
            other => RawValue::Text(other.to_string()),
        }
    }

    /// NaN counts as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            RawValue::Missing => true,
            RawValue::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// The numeric reading of this cell; text parses if it is a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) if n.is_finite() => Some(*n),
            RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// String form used for value labels.
    pub fn label(&self) -> String {
        match self {
            RawValue::Missing => String::new(),
            RawValue::Bool(b) => b.to_string(),
            RawValue::Number(n) => format_number(*n),
            RawValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Number(n as f64)
    }
}

/// Integral values print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// The raw values of one observation field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSeries {
    values: Vec<RawValue>,
}

impl RawSeries {
    pub fn new(values: Vec<RawValue>) -> Self {
        Self { values }
    }

    pub fn from_json(values: &[Value]) -> Self {
        Self::new(values.iter().map(RawValue::from_json).collect())
    }

    pub fn values(&self) -> &[RawValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn present(&self) -> impl Iterator<Item = &RawValue> {
        self.values.iter().filter(|v| !v.is_missing())
    }

    /// A series is numeric when it has at least one present entry and
    /// every present entry parses as a number.
    pub fn is_numeric(&self) -> bool {
        let mut seen = false;
        for value in self.present() {
            if value.as_number().is_none() {
                return false;
            }
            seen = true;
        }
        seen
    }

    /// Whether every present entry is an integral number.
    pub fn is_integral(&self) -> bool {
        self.is_numeric()
            && self
                .present()
                .filter_map(RawValue::as_number)
                .all(|n| n.fract() == 0.0)
    }

    /// Distinct present values as labels, in natural order.
    ///
    /// Numeric series are compared and ordered by value (so `1` and `"1.0"`
    /// collapse); anything else by label.
    pub fn distinct_labels(&self) -> Vec<String> {
        if self.is_numeric() {
            let mut numbers: Vec<f64> = self.present().filter_map(RawValue::as_number).collect();
            numbers.sort_by(|a, b| a.total_cmp(b));
            numbers.dedup();
            numbers.into_iter().map(format_number).collect()
        } else {
            self.present()
                .map(RawValue::label)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        }
    }

    pub fn unique_count(&self) -> usize {
        self.distinct_labels().len()
    }

    /// Present values as strings, missing entries as `None`.
    pub fn to_labels(&self) -> Vec<Option<String>> {
        self.values
            .iter()
            .map(|v| if v.is_missing() { None } else { Some(v.label()) })
            .collect()
    }

    /// Numeric reading of every entry; non-numeric and missing become `None`.
    pub fn to_numbers(&self) -> Vec<Option<f64>> {
        self.values.iter().map(RawValue::as_number).collect()
    }
}

impl FromIterator<RawValue> for RawSeries {
    fn from_iter<I: IntoIterator<Item = RawValue>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(values: &[&str]) -> RawSeries {
        values.iter().map(|v| RawValue::from(*v)).collect()
    }

    #[test]
    fn test_numeric_detection() {
        assert!(RawSeries::from_json(&[json!(1), json!(2.5), json!(null)]).is_numeric());
        assert!(text(&["1", " 2.5 ", "-3e2"]).is_numeric());
        assert!(!text(&["1", "b"]).is_numeric());
        assert!(!RawSeries::from_json(&[json!(true), json!(false)]).is_numeric());
    }

    #[test]
    fn test_all_missing_is_not_numeric() {
        assert!(!RawSeries::from_json(&[json!(null), json!(null)]).is_numeric());
        assert!(!RawSeries::default().is_numeric());
    }

    #[test]
    fn test_nan_text_is_not_a_number() {
        assert!(!text(&["1", "inf"]).is_numeric());
        assert!(RawSeries::new(vec![RawValue::Number(f64::NAN), RawValue::Number(2.0)]).is_numeric());
    }

    #[test]
    fn test_distinct_numeric_natural_order() {
        let series = RawSeries::from_json(&[json!(10), json!(2), json!("2.0"), json!(1)]);
        assert_eq!(series.distinct_labels(), vec!["1", "2", "10"]);
    }

    #[test]
    fn test_distinct_text_sorted() {
        let series = text(&["b", "a", "c", "a"]);
        assert_eq!(series.distinct_labels(), vec!["a", "b", "c"]);
        assert_eq!(series.unique_count(), 3);
    }

    #[test]
    fn test_order_independence() {
        let a = text(&["x", "10", "y", "x"]);
        let b = text(&["y", "x", "x", "10"]);
        assert_eq!(a.is_numeric(), b.is_numeric());
        assert_eq!(a.distinct_labels(), b.distinct_labels());
    }

    #[test]
    fn test_integral() {
        assert!(RawSeries::from_json(&[json!(1), json!("4")]).is_integral());
        assert!(!RawSeries::from_json(&[json!(1), json!(1.5)]).is_integral());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.25), "-0.25");
    }
}
