//! Dataset registry
//!
//! Maps dataset ids to their metadata documents, read from the `*.yaml`
//! files of one directory. The registry is an explicit value: it loads
//! once on construction and only changes on [`Registry::reload`]. Reads
//! never mutate it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::observability::{log_event_with_fields, Event};
use crate::persist::{dataset_id_from_path, list_documents, read_document};
use crate::schema::MetadataDocument;

use super::errors::{RegistryError, RegistryResult};

/// Metadata documents by dataset id.
#[derive(Debug)]
pub struct Registry {
    data_dir: PathBuf,
    documents: RwLock<BTreeMap<String, MetadataDocument>>,
}

impl Registry {
    /// Loads every document in `data_dir`.
    pub fn load(data_dir: impl Into<PathBuf>) -> RegistryResult<Self> {
        let data_dir = data_dir.into();
        let documents = scan(&data_dir)?;

        let count = documents.len().to_string();
        log_event_with_fields(
            Event::RegistryLoaded,
            &[
                ("data_dir", data_dir.display().to_string().as_str()),
                ("datasets", count.as_str()),
            ],
        );

        Ok(Self {
            data_dir,
            documents: RwLock::new(documents),
        })
    }

    /// A registry over `data_dir` holding no documents until reloaded.
    pub fn empty(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Re-reads the directory, replacing all documents. Returns the new
    /// dataset count. On failure the previous contents stay in place.
    pub fn reload(&self) -> RegistryResult<usize> {
        let fresh = scan(&self.data_dir)?;
        let count = fresh.len();

        let mut documents = self
            .documents
            .write()
            .map_err(|_| RegistryError::LockPoisoned)?;
        *documents = fresh;

        log_event_with_fields(
            Event::RegistryReloaded,
            &[("datasets", count.to_string().as_str())],
        );
        Ok(count)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns a copy of one dataset's document.
    ///
    /// # Errors
    ///
    /// `DatasetNotFound` if no document has this id.
    pub fn get(&self, dataset_id: &str) -> RegistryResult<MetadataDocument> {
        let documents = self
            .documents
            .read()
            .map_err(|_| RegistryError::LockPoisoned)?;
        documents
            .get(dataset_id)
            .cloned()
            .ok_or_else(|| RegistryError::DatasetNotFound(dataset_id.to_string()))
    }

    pub fn contains(&self, dataset_id: &str) -> bool {
        self.documents
            .read()
            .map(|d| d.contains_key(dataset_id))
            .unwrap_or(false)
    }

    pub fn dataset_ids(&self) -> RegistryResult<Vec<String>> {
        let documents = self
            .documents
            .read()
            .map_err(|_| RegistryError::LockPoisoned)?;
        Ok(documents.keys().cloned().collect())
    }

    /// All datasets, or only those declaring differential-expression data.
    pub fn datasets(&self, has_de: bool) -> RegistryResult<BTreeMap<String, MetadataDocument>> {
        let documents = self
            .documents
            .read()
            .map_err(|_| RegistryError::LockPoisoned)?;
        Ok(documents
            .iter()
            .filter(|(_, doc)| !has_de || doc.has_diffexp())
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect())
    }
}

fn scan(data_dir: &Path) -> RegistryResult<BTreeMap<String, MetadataDocument>> {
    let mut documents = BTreeMap::new();
    for path in list_documents(data_dir)? {
        let id = dataset_id_from_path(&path)?;
        documents.insert(id, read_document(&path)?);
    }
    Ok(documents)
}
