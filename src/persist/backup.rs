//! Backup rotation for rewritten documents
//!
//! Before a changed document is written, the current file is moved to
//! `<file name>-backup-NNN`, with NNN the smallest unused three-digit number
//! starting at 000.

use std::fs;
use std::path::{Path, PathBuf};

use crate::schema::MetadataDocument;

use super::document::{sync_parent, write_document};
use super::errors::{PersistError, PersistResult};

/// Highest backup number that still fits three digits.
const MAX_BACKUP_INDEX: u32 = 999;

/// Path of backup number `index` for `path`.
pub fn backup_path(path: &Path, index: u32) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}-backup-{:03}", name, index))
}

/// First backup path that does not exist yet.
pub fn next_backup_path(path: &Path) -> PersistResult<PathBuf> {
    (0..=MAX_BACKUP_INDEX)
        .map(|i| backup_path(path, i))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| PersistError::BackupExhausted(path.display().to_string()))
}

/// Moves the current file to the next backup slot and writes `document` in
/// its place. Returns the backup path, or `None` if there was no file yet.
pub fn backup_and_write(path: &Path, document: &MetadataDocument) -> PersistResult<Option<PathBuf>> {
    let backup = if path.exists() {
        let target = next_backup_path(path)?;
        fs::rename(path, &target).map_err(|e| PersistError::io(&target, e))?;
        sync_parent(path)?;
        Some(target)
    } else {
        None
    };

    write_document(path, document)?;
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::read_document;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_backup_names() {
        let path = Path::new("/data/ds.yaml");
        assert_eq!(backup_path(path, 0), PathBuf::from("/data/ds.yaml-backup-000"));
        assert_eq!(backup_path(path, 12), PathBuf::from("/data/ds.yaml-backup-012"));
    }

    #[test]
    fn test_smallest_unused_slot() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ds.yaml");
        fs::write(backup_path(&path, 0), "").unwrap();
        fs::write(backup_path(&path, 2), "").unwrap();

        assert_eq!(next_backup_path(&path).unwrap(), backup_path(&path, 1));
    }

    #[test]
    fn test_backup_and_write_preserves_original() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ds.yaml");
        fs::write(&path, "author: old\n").unwrap();

        let doc = MetadataDocument::from_json(json!({"author": "new"})).unwrap();
        let backup = backup_and_write(&path, &doc).unwrap().unwrap();

        assert_eq!(backup, backup_path(&path, 0));
        assert_eq!(fs::read_to_string(&backup).unwrap(), "author: old\n");
        assert_eq!(read_document(&path).unwrap(), doc);

        let second = backup_and_write(&path, &doc).unwrap().unwrap();
        assert_eq!(second, backup_path(&path, 1));
    }
}
