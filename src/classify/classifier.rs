//! Observation field type classification
//!
//! Decides whether a field is numerical, categorical or skipped from its
//! raw values. A dtype already present on the descriptor is forced: it is
//! never changed, only checked for disagreement with the data.

use crate::schema::{Dtype, FieldDescriptor, ValueDescriptor, ValueMap};

use super::de_fields::DeFieldSet;
use super::series::RawSeries;

/// Number of example values listed when a field is skipped.
const SKIP_EXAMPLES: usize = 4;

/// Thresholds driving classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Non-numeric fields with more distinct values are skipped; categorical
    /// fields with at most this many get a `values` mapping.
    pub categorical_max_unique: usize,
    /// Numerical fields with fewer distinct values draw a warning.
    pub numeric_low_unique_warn: usize,
    /// Substrings of field names that mark integer cluster IDs.
    pub cluster_name_hints: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            categorical_max_unique: 20,
            numeric_low_unique_warn: 15,
            cluster_name_hints: vec!["leiden".to_string(), "louvain".to_string()],
        }
    }
}

/// Outcome of classifying one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub dtype: Dtype,
    pub descriptor: FieldDescriptor,
    pub warnings: Vec<String>,
    pub messages: Vec<String>,
}

/// Pure classifier: same inputs, same outcome.
#[derive(Debug, Clone, Default)]
pub struct TypeClassifier {
    config: ClassifierConfig,
}

impl TypeClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classifies `field` given its raw values and current descriptor.
    pub fn classify(
        &self,
        field: &str,
        raw: &RawSeries,
        current: &FieldDescriptor,
        de_fields: &DeFieldSet,
    ) -> Classification {
        let numeric = raw.is_numeric();
        let distinct = raw.distinct_labels();
        let unique = distinct.len();

        let mut descriptor = current.clone();
        let mut warnings = Vec::new();
        let mut messages = Vec::new();

        let dtype = match current.dtype {
            Some(forced) => {
                if let Some(w) = disagreement(field, numeric, forced) {
                    warnings.push(w);
                }
                forced
            }
            None => {
                let inferred =
                    self.infer(field, raw, numeric, &distinct, &mut warnings, &mut messages);
                if unique == 1 && descriptor.ignore.is_none() {
                    descriptor.ignore = Some(true);
                    messages.push(format!("Field {} has a single value, marked as ignored", field));
                }
                inferred
            }
        };
        descriptor.dtype = Some(dtype);

        if dtype == Dtype::Categorical
            && unique <= self.config.categorical_max_unique
            && descriptor.values.is_none()
        {
            descriptor.values = Some(value_descriptors(field, &distinct, de_fields));
        }

        Classification {
            dtype,
            descriptor,
            warnings,
            messages,
        }
    }

    fn infer(
        &self,
        field: &str,
        raw: &RawSeries,
        numeric: bool,
        distinct: &[String],
        warnings: &mut Vec<String>,
        messages: &mut Vec<String>,
    ) -> Dtype {
        let unique = distinct.len();

        if unique == 0 {
            warnings.push(format!("Field `{}` has no values - Skipping!", field));
            return Dtype::Skip;
        }

        if numeric {
            if self.looks_like_cluster_ids(field, raw, unique) {
                warnings.push(format!(
                    "Expect {} to be cluster IDs, forcing to categorical",
                    field
                ));
                return Dtype::Categorical;
            }
            messages.push(format!("Assigned field {} as numerical", field));
            if unique < self.config.numeric_low_unique_warn {
                warnings.push(format!(
                    "Numerical field {} has only {} unique values - should this be categorical?",
                    field, unique
                ));
            }
            return Dtype::Numerical;
        }

        if unique > self.config.categorical_max_unique {
            let examples = distinct
                .iter()
                .take(SKIP_EXAMPLES)
                .cloned()
                .collect::<Vec<_>>()
                .join(",");
            warnings.push(format!(
                "Field `{}` appears categorical but has {} unique values - Skipping! - (first few: {})",
                field, unique, examples
            ));
            Dtype::Skip
        } else {
            messages.push(format!("Assigned field {} as categorical", field));
            Dtype::Categorical
        }
    }

    fn looks_like_cluster_ids(&self, field: &str, raw: &RawSeries, unique: usize) -> bool {
        let lowered = field.to_lowercase();
        unique < self.config.categorical_max_unique
            && raw.is_integral()
            && self
                .config
                .cluster_name_hints
                .iter()
                .any(|hint| lowered.contains(&hint.to_lowercase()))
    }
}

/// Advisory check of a forced dtype against the data. Skip is accepted for
/// both numeric and non-numeric data.
fn disagreement(field: &str, numeric: bool, forced: Dtype) -> Option<String> {
    match (numeric, forced) {
        (true, Dtype::Categorical) => Some(format!(
            "Field {} seems numeric, yet is assigned as {}",
            field, forced
        )),
        (false, Dtype::Numerical) => Some(format!(
            "Field {} seems categorical, yet is assigned as {}",
            field, forced
        )),
        _ => None,
    }
}

fn value_descriptors(
    field: &str,
    distinct: &[String],
    de_fields: &DeFieldSet,
) -> ValueMap {
    distinct
        .iter()
        .map(|label| {
            let de_key = format!("{}__{}", field, label);
            let de_prefix = de_fields.contains(&de_key).then_some(de_key);
            (label.clone(), ValueDescriptor::new(label.clone(), de_prefix))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RawValue;
    use serde_json::json;

    fn series(values: serde_json::Value) -> RawSeries {
        RawSeries::from_json(values.as_array().unwrap())
    }

    fn classifier() -> TypeClassifier {
        TypeClassifier::new(ClassifierConfig::default())
    }

    #[test]
    fn test_categorical_with_values() {
        let result = classifier().classify(
            "celltype",
            &series(json!(["a", "a", "b", "b", "c"])),
            &FieldDescriptor::named("celltype"),
            &DeFieldSet::default(),
        );

        assert_eq!(result.dtype, Dtype::Categorical);
        assert!(result.warnings.is_empty());
        assert_eq!(result.messages, vec!["Assigned field celltype as categorical"]);

        let values = result.descriptor.values.unwrap();
        assert_eq!(values.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        for (key, value) in &values {
            assert_eq!(&value.name, key);
            assert!(value.de_prefix.is_none());
        }
    }

    #[test]
    fn test_numeric_with_few_values_warns() {
        let result = classifier().classify(
            "dose",
            &series(json!([1, 1, 1, 2, 2])),
            &FieldDescriptor::named("dose"),
            &DeFieldSet::default(),
        );

        assert_eq!(result.dtype, Dtype::Numerical);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("only 2 unique values"));
        assert_eq!(result.messages, vec!["Assigned field dose as numerical"]);
        assert!(result.descriptor.values.is_none());
    }

    #[test]
    fn test_numeric_with_many_values_is_quiet() {
        let values: Vec<serde_json::Value> = (0..30).map(|i| json!(i as f64 * 0.5)).collect();
        let result = classifier().classify(
            "age",
            &RawSeries::from_json(&values),
            &FieldDescriptor::named("age"),
            &DeFieldSet::default(),
        );
        assert_eq!(result.dtype, Dtype::Numerical);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_high_cardinality_text_skipped() {
        let values: Vec<RawValue> = (0..25).map(|i| RawValue::Text(format!("cell{:02}", i))).collect();
        let result = classifier().classify(
            "barcode",
            &RawSeries::new(values),
            &FieldDescriptor::named("barcode"),
            &DeFieldSet::default(),
        );

        assert_eq!(result.dtype, Dtype::Skip);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("25 unique values"));
        assert!(result.warnings[0].contains("cell00,cell01,cell02,cell03)"));
        assert!(result.messages.is_empty());
        assert!(result.descriptor.values.is_none());
    }

    #[test]
    fn test_de_prefix_attached() {
        let de = DeFieldSet::from_measurement_fields(["cluster__b__lfc", "cluster__b__padj"]);
        let result = classifier().classify(
            "cluster",
            &series(json!(["a", "b"])),
            &FieldDescriptor::named("cluster"),
            &de,
        );
        let values = result.descriptor.values.unwrap();
        assert_eq!(values["b"].de_prefix.as_deref(), Some("cluster__b"));
        assert!(values["a"].de_prefix.is_none());
    }

    #[test]
    fn test_forced_dtype_is_sticky() {
        let mut current = FieldDescriptor::named("score");
        current.dtype = Some(Dtype::Skip);

        let result = classifier().classify(
            "score",
            &series(json!([1.5, 2.5, 3.5])),
            &current,
            &DeFieldSet::default(),
        );
        assert_eq!(result.dtype, Dtype::Skip);
        assert!(result.warnings.is_empty());
        assert!(result.messages.is_empty());
    }

    #[test]
    fn test_forced_mismatch_warns_without_change() {
        let mut current = FieldDescriptor::named("batch");
        current.dtype = Some(Dtype::Numerical);

        let result = classifier().classify(
            "batch",
            &series(json!(["x", "y"])),
            &current,
            &DeFieldSet::default(),
        );
        assert_eq!(result.dtype, Dtype::Numerical);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("seems categorical"));
        assert!(result.descriptor.values.is_none());
    }

    #[test]
    fn test_forced_categorical_numeric_gets_values_in_numeric_order() {
        let mut current = FieldDescriptor::named("cluster");
        current.dtype = Some(Dtype::Categorical);

        let result = classifier().classify(
            "cluster",
            &series(json!([10, 2, 1, 2])),
            &current,
            &DeFieldSet::default(),
        );
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("seems numeric"));
        let values = result.descriptor.values.unwrap();
        assert_eq!(values.keys().collect::<Vec<_>>(), vec!["1", "2", "10"]);
        assert_eq!(values["10"].name, "10");

        let yaml = serde_yaml::to_string(&values).unwrap();
        let one = yaml.find("'1':").unwrap();
        let two = yaml.find("'2':").unwrap();
        let ten = yaml.find("'10':").unwrap();
        assert!(one < two && two < ten);
    }

    #[test]
    fn test_existing_values_not_rebuilt() {
        let mut current = FieldDescriptor::named("celltype");
        current.dtype = Some(Dtype::Categorical);
        let mut values = ValueMap::new();
        values.insert("T".to_string(), ValueDescriptor::new("T cell", None));
        current.values = Some(values.clone());

        let result = classifier().classify(
            "celltype",
            &series(json!(["T", "B"])),
            &current,
            &DeFieldSet::default(),
        );
        assert_eq!(result.descriptor.values, Some(values));
    }

    #[test]
    fn test_cluster_hint_forces_categorical() {
        let result = classifier().classify(
            "leiden_res1",
            &series(json!([0, 1, 2, 3, 1, 0])),
            &FieldDescriptor::named("leiden_res1"),
            &DeFieldSet::default(),
        );
        assert_eq!(result.dtype, Dtype::Categorical);
        assert!(result.warnings[0].contains("cluster IDs"));
        assert_eq!(result.descriptor.values.unwrap().len(), 4);
    }

    #[test]
    fn test_single_value_marked_ignored() {
        let result = classifier().classify(
            "organism",
            &series(json!(["human", "human"])),
            &FieldDescriptor::named("organism"),
            &DeFieldSet::default(),
        );
        assert_eq!(result.descriptor.ignore, Some(true));
        assert_eq!(result.messages.len(), 2);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let raw = series(json!(["b", "a", "c", "a"]));
        let shuffled = series(json!(["a", "c", "a", "b"]));
        let current = FieldDescriptor::named("f");
        let de = DeFieldSet::default();
        let first = classifier().classify("f", &raw, &current, &de);
        assert_eq!(first, classifier().classify("f", &raw, &current, &de));
        assert_eq!(first, classifier().classify("f", &shuffled, &current, &de));
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let strict = TypeClassifier::new(ClassifierConfig {
            categorical_max_unique: 2,
            ..ClassifierConfig::default()
        });
        let result = strict.classify(
            "celltype",
            &series(json!(["a", "b", "c"])),
            &FieldDescriptor::named("celltype"),
            &DeFieldSet::default(),
        );
        assert_eq!(result.dtype, Dtype::Skip);
    }
}
