//! Metadata document model
//!
//! A metadata document is one YAML file per dataset. Top-level scalars
//! (author, title, year, ...) are kept loosely typed so that a malformed
//! value such as `year: "2020"` survives loading and is reported by the
//! validator instead of failing the parse.
//!
//! `obs_meta` entries come in two shapes: the structured descriptor and a
//! legacy bare string. [`MetadataDocument::migrate_legacy`] normalises the
//! latter before any other logic runs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Fields every dataset document must carry.
pub const MANDATORY_FIELDS: [&str; 7] = [
    "author",
    "title",
    "datatype",
    "organism",
    "short_title",
    "study",
    "year",
];

/// Fields that are reported as warnings when absent.
pub const OPTIONAL_FIELDS: [&str; 1] = ["description"];

/// Accepted values for `layers.<name>.type`.
pub const LAYER_TYPES: [&str; 4] = ["count", "rpm", "logrpm", "cell_abundance"];

/// Classification of an observation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    /// Continuous values, binned for display
    Numerical,
    /// Discrete labels
    Categorical,
    /// Excluded from display
    Skip,
}

impl Dtype {
    /// Returns the serialized name
    pub fn as_str(&self) -> &'static str {
        match self {
            Dtype::Numerical => "numerical",
            Dtype::Categorical => "categorical",
            Dtype::Skip => "skip",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Organisms a dataset may derive from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Organism {
    Human,
    Mouse,
    HumanMouse,
}

impl Organism {
    /// Parses the document spelling (`human`, `mouse`, `human+mouse`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "human" => Some(Organism::Human),
            "mouse" => Some(Organism::Mouse),
            "human+mouse" => Some(Organism::HumanMouse),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Organism::Human => "human",
            Organism::Mouse => "mouse",
            Organism::HumanMouse => "human+mouse",
        }
    }
}

/// Per-value annotation of a categorical field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDescriptor {
    /// Stringified value
    pub name: String,
    /// Name of the differential-expression field `{field}__{value}`, when one exists
    #[serde(rename = "DE_prefix", default, skip_serializing_if = "Option::is_none")]
    pub de_prefix: Option<String>,
    /// Unrecognised keys, preserved verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ValueDescriptor {
    pub fn new(name: impl Into<String>, de_prefix: Option<String>) -> Self {
        Self {
            name: name.into(),
            de_prefix,
            extra: BTreeMap::new(),
        }
    }
}

/// Value annotations keyed by label, in natural label order.
pub type ValueMap = IndexMap<String, ValueDescriptor>;

/// Annotation of one observation field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Classification; once set it is never overwritten by inference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<Dtype>,
    /// Value annotations, only for low-cardinality categorical fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<ValueMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unrecognised keys, preserved verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl FieldDescriptor {
    /// Creates an unclassified descriptor `{name: <name>}`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A descriptor is forced once its dtype has been set.
    pub fn is_forced(&self) -> bool {
        self.dtype.is_some()
    }
}

/// An `obs_meta` entry as found on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObsMetaEntry {
    /// Early documents stored only a display name
    Legacy(String),
    Descriptor(FieldDescriptor),
}

impl ObsMetaEntry {
    /// Converts to the structured form; a legacy string becomes the name.
    pub fn into_descriptor(self, key: &str) -> FieldDescriptor {
        match self {
            ObsMetaEntry::Legacy(name) => FieldDescriptor::named(name),
            ObsMetaEntry::Descriptor(mut descriptor) => {
                if descriptor.name.is_empty() {
                    descriptor.name = key.to_string();
                }
                descriptor
            }
        }
    }

    pub fn as_descriptor(&self) -> Option<&FieldDescriptor> {
        match self {
            ObsMetaEntry::Descriptor(d) => Some(d),
            ObsMetaEntry::Legacy(_) => None,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, ObsMetaEntry::Legacy(_))
    }
}

/// `{type, ignore, description}` shape shared by `layers` and `obsm`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotationDescriptor {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Per-dataset metadata document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetadataDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obs_meta: Option<BTreeMap<String, ObsMetaEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<BTreeMap<String, AnnotationDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obsm: Option<BTreeMap<String, AnnotationDescriptor>>,
    /// Top-level scalars and any other keys
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl MetadataDocument {
    /// Builds a document from a JSON object; used by tests and the CLI.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Ensures `obs_meta` exists and returns it.
    pub fn obs_meta_mut(&mut self) -> &mut BTreeMap<String, ObsMetaEntry> {
        self.obs_meta.get_or_insert_with(BTreeMap::new)
    }

    /// Returns the structured descriptor for `field`, if present.
    pub fn field_descriptor(&self, field: &str) -> Option<&FieldDescriptor> {
        self.obs_meta
            .as_ref()
            .and_then(|m| m.get(field))
            .and_then(ObsMetaEntry::as_descriptor)
    }

    /// Rewrites every legacy `obs_meta` entry into a structured descriptor.
    ///
    /// Returns the number of entries migrated.
    pub fn migrate_legacy(&mut self) -> usize {
        let Some(obs_meta) = self.obs_meta.as_mut() else {
            return 0;
        };
        let mut migrated = 0;
        for (key, entry) in obs_meta.iter_mut() {
            if let ObsMetaEntry::Legacy(name) = entry {
                *entry = ObsMetaEntry::Descriptor(FieldDescriptor::named(name.clone()));
                migrated += 1;
            } else if let ObsMetaEntry::Descriptor(d) = entry {
                if d.name.is_empty() {
                    d.name = key.clone();
                }
            }
        }
        migrated
    }

    /// Whether the document declares differential-expression data.
    pub fn has_diffexp(&self) -> bool {
        match self.fields.get("diffexp") {
            Some(Value::Object(map)) => !map.is_empty(),
            _ => false,
        }
    }

    /// Categories listed under `diffexp`.
    pub fn diffexp_categories(&self) -> Vec<String> {
        match self.fields.get("diffexp") {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dtype_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Dtype::Numerical).unwrap(), json!("numerical"));
        let parsed: Dtype = serde_json::from_value(json!("skip")).unwrap();
        assert_eq!(parsed, Dtype::Skip);
    }

    #[test]
    fn test_organism_enum() {
        assert_eq!(Organism::parse("human+mouse"), Some(Organism::HumanMouse));
        assert_eq!(Organism::parse("zebrafish"), None);
        assert_eq!(Organism::Mouse.as_str(), "mouse");
    }

    #[test]
    fn test_obs_meta_accepts_both_shapes() {
        let doc = MetadataDocument::from_json(json!({
            "author": "A",
            "obs_meta": {
                "cluster": "Cluster ID",
                "age": {"name": "age", "dtype": "numerical"}
            }
        }))
        .unwrap();

        let obs_meta = doc.obs_meta.as_ref().unwrap();
        assert!(obs_meta["cluster"].is_legacy());
        assert_eq!(
            obs_meta["age"].as_descriptor().unwrap().dtype,
            Some(Dtype::Numerical)
        );
        assert_eq!(doc.get("author"), Some(&json!("A")));
    }

    #[test]
    fn test_migrate_legacy_uses_string_as_name() {
        let mut doc = MetadataDocument::from_json(json!({
            "obs_meta": {
                "cluster": "Cluster ID",
                "age": {"dtype": "numerical"}
            }
        }))
        .unwrap();

        assert_eq!(doc.migrate_legacy(), 1);
        assert_eq!(doc.field_descriptor("cluster").unwrap().name, "Cluster ID");
        assert!(!doc.field_descriptor("cluster").unwrap().is_forced());
        assert_eq!(doc.field_descriptor("age").unwrap().name, "age");
        assert_eq!(doc.migrate_legacy(), 0);
    }

    #[test]
    fn test_unknown_keys_preserved() {
        let input = json!({
            "title": "T",
            "diffexp": {"cluster": {"keys": ["1", "2"]}},
            "obs_meta": {
                "cluster": {
                    "name": "cluster",
                    "dtype": "categorical",
                    "colour": "red",
                    "values": {"1": {"name": "1", "DE_prefix": "cluster__1", "note": "x"}}
                }
            },
            "layers": {"X": {"type": "logrpm", "load": true}}
        });
        let doc = MetadataDocument::from_json(input.clone()).unwrap();
        let output = serde_json::to_value(&doc).unwrap();
        assert_eq!(input, output);
    }

    #[test]
    fn test_has_diffexp() {
        let doc = MetadataDocument::from_json(json!({"diffexp": {}})).unwrap();
        assert!(!doc.has_diffexp());
        let doc = MetadataDocument::from_json(json!({"diffexp": {"cluster": {}}})).unwrap();
        assert!(doc.has_diffexp());
        assert_eq!(doc.diffexp_categories(), vec!["cluster".to_string()]);
    }
}
