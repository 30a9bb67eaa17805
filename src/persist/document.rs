//! YAML metadata document files
//!
//! One file per dataset; the file stem is the dataset id. Writes go to a
//! temporary sibling that is fsynced and renamed over the target.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::schema::MetadataDocument;

use super::errors::{PersistError, PersistResult};

/// Extension of metadata documents.
pub const DOCUMENT_EXTENSION: &str = "yaml";

/// Dataset id of a document path: its file stem.
pub fn dataset_id_from_path(path: &Path) -> PersistResult<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PersistError::InvalidPath(path.display().to_string()))
}

/// Reads a metadata document.
pub fn read_document(path: &Path) -> PersistResult<MetadataDocument> {
    let text = fs::read_to_string(path).map_err(|e| PersistError::io(path, e))?;
    if text.trim().is_empty() {
        return Ok(MetadataDocument::default());
    }
    serde_yaml::from_str(&text).map_err(|e| PersistError::yaml(path, e))
}

/// Writes a metadata document durably, replacing any existing file.
pub fn write_document(path: &Path, document: &MetadataDocument) -> PersistResult<()> {
    let text = serde_yaml::to_string(document).map_err(|e| PersistError::yaml(path, e))?;

    let tmp = temp_path(path);
    let mut file = File::create(&tmp).map_err(|e| PersistError::io(&tmp, e))?;
    file.write_all(text.as_bytes())
        .map_err(|e| PersistError::io(&tmp, e))?;
    file.sync_all().map_err(|e| PersistError::io(&tmp, e))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| PersistError::io(path, e))?;
    sync_parent(path)
}

/// Lists `*.yaml` documents in `dir`, sorted by path.
pub fn list_documents(dir: &Path) -> PersistResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| PersistError::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PersistError::io(dir, e))?.path();
        let is_document = path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXTENSION);
        if is_document {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

pub(crate) fn sync_parent(path: &Path) -> PersistResult<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    let dir = OpenOptions::new()
        .read(true)
        .open(parent)
        .map_err(|e| PersistError::io(parent, e))?;
    dir.sync_all().map_err(|e| PersistError::io(parent, e))
}
