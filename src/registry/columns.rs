//! Columnar dataset storage
//!
//! Each dataset has three column-oriented tables next to its metadata
//! document:
//! - `{id}.obs.json`: observation metadata, one column per field
//! - `{id}.X.json`: measurements, one numeric column per gene
//! - `{id}.var.json`: differential-expression results, a `field` column of
//!   `{category}__{value}__{measurement}` names plus one column per gene
//!
//! Every file is a JSON object mapping column name to an array of cells.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::classify::RawSeries;

use super::diffexp::DiffExpTable;
use super::errors::{RegistryError, RegistryResult};

/// Table names as used in file names.
const OBS_TABLE: &str = "obs";
const MEASUREMENT_TABLE: &str = "X";
const DIFFEXP_TABLE: &str = "var";

/// A queryable source of named columns per dataset.
pub trait ColumnSource: Send + Sync {
    /// Identifies where the tables live. Two sources with different
    /// locations never share cached results.
    fn location(&self) -> String;

    /// Names of observation fields, in table order.
    fn obs_columns(&self, dataset_id: &str) -> RegistryResult<Vec<String>>;

    /// Raw cells of one observation field.
    fn obs_column(&self, dataset_id: &str, field: &str) -> RegistryResult<RawSeries>;

    /// Names of measurement (gene) columns.
    fn measurement_columns(&self, dataset_id: &str) -> RegistryResult<Vec<String>>;

    /// One measurement column; `None` if the dataset has no such gene.
    fn measurement_column(&self, dataset_id: &str, gene: &str) -> RegistryResult<Option<Vec<Option<f64>>>>;

    /// The differential-expression table; empty if the dataset has none.
    fn diffexp_table(&self, dataset_id: &str) -> RegistryResult<DiffExpTable>;
}

type Columns = BTreeMap<String, Vec<Value>>;

fn to_numbers(cells: &[Value]) -> Vec<Option<f64>> {
    cells.iter().map(Value::as_f64).collect()
}

/// Column tables stored as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct JsonColumnStore {
    dir: PathBuf,
}

impl JsonColumnStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn table_path(&self, dataset_id: &str, table: &str) -> PathBuf {
        self.dir.join(format!("{}.{}.json", dataset_id, table))
    }

    fn read_table(&self, dataset_id: &str, table: &str) -> RegistryResult<Option<Columns>> {
        let path = self.table_path(dataset_id, table);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RegistryError::Io {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };
        parse_table(&path, &bytes).map(Some)
    }

    fn require_table(&self, dataset_id: &str, table: &str) -> RegistryResult<Columns> {
        self.read_table(dataset_id, table)?
            .ok_or_else(|| RegistryError::DatasetNotFound(dataset_id.to_string()))
    }
}

fn parse_table(path: &Path, bytes: &[u8]) -> RegistryResult<Columns> {
    let columns: Columns = serde_json::from_slice(bytes).map_err(|e| RegistryError::Malformed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut lengths = columns.values().map(Vec::len);
    if let Some(first) = lengths.next() {
        if lengths.any(|len| len != first) {
            return Err(RegistryError::Malformed {
                path: path.display().to_string(),
                reason: "columns differ in length".to_string(),
            });
        }
    }
    Ok(columns)
}

impl ColumnSource for JsonColumnStore {
    fn location(&self) -> String {
        let dir = fs::canonicalize(&self.dir).unwrap_or_else(|_| self.dir.clone());
        dir.display().to_string()
    }

    fn obs_columns(&self, dataset_id: &str) -> RegistryResult<Vec<String>> {
        Ok(self.require_table(dataset_id, OBS_TABLE)?.into_keys().collect())
    }

    fn obs_column(&self, dataset_id: &str, field: &str) -> RegistryResult<RawSeries> {
        self.require_table(dataset_id, OBS_TABLE)?
            .get(field)
            .map(|cells| RawSeries::from_json(cells))
            .ok_or_else(|| RegistryError::column_not_found(dataset_id, field))
    }

    fn measurement_columns(&self, dataset_id: &str) -> RegistryResult<Vec<String>> {
        Ok(self
            .require_table(dataset_id, MEASUREMENT_TABLE)?
            .into_keys()
            .collect())
    }

    fn measurement_column(&self, dataset_id: &str, gene: &str) -> RegistryResult<Option<Vec<Option<f64>>>> {
        Ok(self
            .require_table(dataset_id, MEASUREMENT_TABLE)?
            .get(gene)
            .map(|cells| to_numbers(cells)))
    }

    fn diffexp_table(&self, dataset_id: &str) -> RegistryResult<DiffExpTable> {
        let path = self.table_path(dataset_id, DIFFEXP_TABLE);
        match self.read_table(dataset_id, DIFFEXP_TABLE)? {
            Some(columns) => DiffExpTable::from_columns(&path, columns),
            None => Ok(DiffExpTable::default()),
        }
    }
}

static NEXT_MEMORY_STORE: AtomicU64 = AtomicU64::new(0);

/// In-memory column tables, for tests and embedding.
#[derive(Debug)]
pub struct MemoryColumnStore {
    id: u64,
    obs: RwLock<BTreeMap<String, Columns>>,
    measurements: RwLock<BTreeMap<String, Columns>>,
    diffexp: RwLock<BTreeMap<String, DiffExpTable>>,
}

impl Default for MemoryColumnStore {
    fn default() -> Self {
        Self {
            id: NEXT_MEMORY_STORE.fetch_add(1, Ordering::Relaxed),
            obs: RwLock::default(),
            measurements: RwLock::default(),
            diffexp: RwLock::default(),
        }
    }
}

impl MemoryColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_obs(&self, dataset_id: &str, field: &str, cells: Vec<Value>) {
        if let Ok(mut obs) = self.obs.write() {
            obs.entry(dataset_id.to_string())
                .or_default()
                .insert(field.to_string(), cells);
        }
    }

    pub fn insert_measurement(&self, dataset_id: &str, gene: &str, cells: Vec<Value>) {
        if let Ok(mut m) = self.measurements.write() {
            m.entry(dataset_id.to_string())
                .or_default()
                .insert(gene.to_string(), cells);
        }
    }

    pub fn insert_diffexp(&self, dataset_id: &str, table: DiffExpTable) {
        if let Ok(mut d) = self.diffexp.write() {
            d.insert(dataset_id.to_string(), table);
        }
    }

    fn table<T>(
        lock: &RwLock<BTreeMap<String, Columns>>,
        dataset_id: &str,
        f: impl FnOnce(&Columns) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        let tables = lock.read().map_err(|_| RegistryError::LockPoisoned)?;
        let columns = tables
            .get(dataset_id)
            .ok_or_else(|| RegistryError::DatasetNotFound(dataset_id.to_string()))?;
        f(columns)
    }
}

impl ColumnSource for MemoryColumnStore {
    fn location(&self) -> String {
        format!("memory:{}", self.id)
    }

    fn obs_columns(&self, dataset_id: &str) -> RegistryResult<Vec<String>> {
        Self::table(&self.obs, dataset_id, |c| Ok(c.keys().cloned().collect()))
    }

    fn obs_column(&self, dataset_id: &str, field: &str) -> RegistryResult<RawSeries> {
        Self::table(&self.obs, dataset_id, |c| {
            c.get(field)
                .map(|cells| RawSeries::from_json(cells))
                .ok_or_else(|| RegistryError::column_not_found(dataset_id, field))
        })
    }

    fn measurement_columns(&self, dataset_id: &str) -> RegistryResult<Vec<String>> {
        Self::table(&self.measurements, dataset_id, |c| Ok(c.keys().cloned().collect()))
    }

    fn measurement_column(&self, dataset_id: &str, gene: &str) -> RegistryResult<Option<Vec<Option<f64>>>> {
        Self::table(&self.measurements, dataset_id, |c| {
            Ok(c.get(gene).map(|cells| to_numbers(cells)))
        })
    }

    fn diffexp_table(&self, dataset_id: &str) -> RegistryResult<DiffExpTable> {
        let tables = self.diffexp.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(tables.get(dataset_id).cloned().unwrap_or_default())
    }
}
