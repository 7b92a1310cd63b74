//! Directory-backed key-value store with atomic writes
//!
//! Each key is one file in the progress directory. Writes go to a temp file
//! first and are renamed into place, so a crash never leaves half a record.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{KycError, KycResult};

use super::KeyValueStore;

/// Key-value storage in a directory, one file per key
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a store rooted at `dir` (created lazily on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the stored items
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

/// Map a key to a portable file name
///
/// Bytes outside `[A-Za-z0-9.-]` become `_XX` (uppercase hex), `_` included,
/// so distinct keys always get distinct names.
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for b in key.bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'.' => stem.push(char::from(b)),
            _ => stem.push_str(&format!("_{:02X}", b)),
        }
    }
    stem
}

impl KeyValueStore for FileStorage {
    fn get_item(&self, key: &str) -> KycResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path).map(Some).map_err(|e| {
            KycError::Storage(format!("Failed to read {}: {}", path.display(), e))
        })
    }

    fn set_item(&self, key: &str, value: &str) -> KycResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            KycError::Storage(format!(
                "Failed to create directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");

        let file = File::create(&temp_path)
            .map_err(|e| KycError::Storage(format!("Failed to create temp file: {}", e)))?;

        let mut writer = BufWriter::new(file);
        writer
            .write_all(value.as_bytes())
            .map_err(|e| KycError::Storage(format!("Failed to write data: {}", e)))?;

        writer
            .flush()
            .map_err(|e| KycError::Storage(format!("Failed to flush data: {}", e)))?;

        writer
            .get_ref()
            .sync_all()
            .map_err(|e| KycError::Storage(format!("Failed to sync data: {}", e)))?;

        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            KycError::Storage(format!("Failed to rename temp file: {}", e))
        })
    }

    fn remove_item(&self, key: &str) -> KycResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KycError::Storage(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStorage::new(temp_dir.path());
        assert_eq!(store.get_item("progress:42").unwrap(), None);
    }

    #[test]
    fn test_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStorage::new(temp_dir.path().join("progress"));

        store.set_item("progress:42", r#"{"step":1}"#).unwrap();
        assert_eq!(
            store.get_item("progress:42").unwrap().as_deref(),
            Some(r#"{"step":1}"#)
        );
    }

    #[test]
    fn test_atomic_write_no_temp_file_left() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStorage::new(temp_dir.path());
        store.set_item("progress:42", "{}").unwrap();

        let path = store.path_for("progress:42");
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_key_is_sanitized() {
        let store = FileStorage::new("/data");
        assert_eq!(
            store.path_for("progress:../../etc"),
            PathBuf::from("/data/progress_3A.._2F.._2Fetc.json")
        );
        assert_eq!(store.path_for("progress:42"), PathBuf::from("/data/progress_3A42.json"));
    }

    #[test]
    fn test_similar_keys_get_distinct_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStorage::new(temp_dir.path());
        assert_ne!(
            store.path_for("progress:jane@x.com"),
            store.path_for("progress:jane_x.com")
        );
        assert_ne!(store.path_for("progress:a_3A"), store.path_for("progress:a:"));

        store
            .set_item("progress:jane@x.com", r#"{"owner":"jane@x.com"}"#)
            .unwrap();
        assert_eq!(store.get_item("progress:jane_x.com").unwrap(), None);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStorage::new(temp_dir.path());
        store.set_item("k", "v").unwrap();
        store.remove_item("k").unwrap();
        store.remove_item("k").unwrap();
        assert_eq!(store.get_item("k").unwrap(), None);
    }
}
