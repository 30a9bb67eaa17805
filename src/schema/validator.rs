//! Metadata document validation
//!
//! Validation is a pure transform: the caller's document is never touched.
//! A pass runs in a fixed order:
//! 1. Legacy `obs_meta` entries are migrated to descriptors
//! 2. Mandatory and optional fields are checked, defaults applied
//! 3. `year` and `organism` are checked against their types
//! 4. `layers` types are checked against the known set
//! 5. Every known observation field is classified
//!
//! Problems, warnings and messages are collected, never raised. Only a
//! failing observation source or an unserialisable document is an error.

use serde_json::Value;

use crate::classify::{ClassifierConfig, DeFieldSet, RawSeries, TypeClassifier};

use super::defaults::DefaultOverrides;
use super::errors::SchemaResult;
use super::hashing::content_hash;
use super::types::{
    FieldDescriptor, MetadataDocument, ObsMetaEntry, Organism, LAYER_TYPES, MANDATORY_FIELDS,
    OPTIONAL_FIELDS,
};

/// Raw observation data for datasets, as supplied by the registry.
pub trait ObservationSource {
    /// Names of all observation fields stored for the dataset.
    fn known_obs_fields(&self, dataset_id: &str) -> SchemaResult<Vec<String>>;

    /// Raw, unbinned values of one observation field.
    fn raw_obs_values(&self, dataset_id: &str, field: &str) -> SchemaResult<RawSeries>;

    /// DE base names derived from the dataset's measurement fields.
    fn de_field_names(&self, dataset_id: &str) -> SchemaResult<DeFieldSet>;
}

/// Result of one validation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub dataset_id: String,
    /// Whether the content hash differs from the input document's
    pub changed: bool,
    pub problems: Vec<String>,
    pub warnings: Vec<String>,
    pub messages: Vec<String>,
    pub document: MetadataDocument,
}

impl ValidationReport {
    /// Any problem is a hard failure for the caller.
    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }
}

/// Validates metadata documents against the field requirements and
/// classifies their observation fields.
pub struct SchemaValidator<'a> {
    source: &'a dyn ObservationSource,
    classifier: TypeClassifier,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(source: &'a dyn ObservationSource, config: ClassifierConfig) -> Self {
        Self {
            source,
            classifier: TypeClassifier::new(config),
        }
    }

    /// Validates `document` and returns the updated copy with its findings.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the observation source fails for this
    /// dataset (OBSMETA_SOURCE_UNAVAILABLE) or the document cannot be
    /// hashed (OBSMETA_DOCUMENT_SERIALIZATION).
    pub fn validate(
        &self,
        dataset_id: &str,
        document: &MetadataDocument,
        defaults: &DefaultOverrides,
    ) -> SchemaResult<ValidationReport> {
        let before = content_hash(document)?;

        let mut doc = document.clone();
        doc.migrate_legacy();

        let mut problems = Vec::new();
        let mut warnings = Vec::new();
        let mut messages = Vec::new();

        for field in MANDATORY_FIELDS {
            if !doc.contains(field) {
                match defaults.get(field) {
                    Some(value) => doc.set(field, value.clone()),
                    None => problems.push(format!("Missing field: {}", field)),
                }
            }
        }

        for field in OPTIONAL_FIELDS {
            if !doc.contains(field) {
                match defaults.get(field) {
                    Some(value) => doc.set(field, value.clone()),
                    None => warnings.push(format!("Missing optional field: {}", field)),
                }
            }
        }

        check_types(&doc, &mut problems);
        check_layers(&doc, &mut warnings);

        self.classify_fields(dataset_id, &mut doc, &mut warnings, &mut messages)?;

        let after = content_hash(&doc)?;

        Ok(ValidationReport {
            dataset_id: dataset_id.to_string(),
            changed: before != after,
            problems,
            warnings,
            messages,
            document: doc,
        })
    }

    fn classify_fields(
        &self,
        dataset_id: &str,
        doc: &mut MetadataDocument,
        warnings: &mut Vec<String>,
        messages: &mut Vec<String>,
    ) -> SchemaResult<()> {
        let known = self.source.known_obs_fields(dataset_id)?;
        let obs_meta = doc.obs_meta_mut();

        // Underscore-prefixed columns are internal to the store.
        let fields: Vec<String> = known.into_iter().filter(|f| !f.starts_with('_')).collect();
        if fields.is_empty() {
            return Ok(());
        }

        let de_fields = self.source.de_field_names(dataset_id)?;

        for field in fields {
            let current = obs_meta
                .get(&field)
                .cloned()
                .map(|entry| entry.into_descriptor(&field))
                .unwrap_or_else(|| FieldDescriptor::named(field.clone()));

            let raw = self.source.raw_obs_values(dataset_id, &field)?;
            let outcome = self.classifier.classify(&field, &raw, &current, &de_fields);

            warnings.extend(outcome.warnings);
            messages.extend(outcome.messages);
            obs_meta.insert(field, ObsMetaEntry::Descriptor(outcome.descriptor));
        }
        Ok(())
    }
}

fn check_types(doc: &MetadataDocument, problems: &mut Vec<String>) {
    if let Some(year) = doc.get("year") {
        if !(year.is_i64() || year.is_u64()) {
            problems.push(format!("Year is not an integer: {}", display_value(year)));
        }
    }

    if let Some(organism) = doc.get("organism") {
        let known = organism.as_str().and_then(Organism::parse).is_some();
        if !known {
            problems.push(format!("Unexpected organism: {}", display_value(organism)));
        }
    }
}

fn check_layers(doc: &MetadataDocument, warnings: &mut Vec<String>) {
    let Some(layers) = doc.layers.as_ref() else {
        return;
    };
    for (name, layer) in layers {
        if let Some(kind) = layer.kind.as_deref() {
            if !LAYER_TYPES.contains(&kind) {
                warnings.push(format!("Unexpected type '{}' for layer {}", kind, name));
            }
        }
    }
}

/// Strings print bare; anything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
