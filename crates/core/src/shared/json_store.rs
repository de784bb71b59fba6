//! JSON persistence helpers shared by the corpus and registry stores.
//!
//! Writes go to a `.part` sibling first and are renamed into place, so a
//! reader never sees a half-written artifact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("inconsistent stored data: {0}")]
    Format(String),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    parse_json(path, &read_bytes(path)?)
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    write_atomic(path, &to_json_bytes(path, value)?)
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, StoreError> {
    fs::read(path).map_err(|e| StoreError::io(path, e))
}

/// Parses `bytes` read from `path`; the path only labels errors.
pub fn parse_json<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serde {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn to_json_bytes<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|e| StoreError::Serde {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
    }

    let temp_path = part_path(path);
    let result = write_then_rename(path, &temp_path, bytes);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_then_rename(path: &Path, temp_path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut file = fs::File::create(temp_path).map_err(|e| StoreError::io(temp_path, e))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| StoreError::io(temp_path, e))?;
    fs::rename(temp_path, path).map_err(|e| StoreError::io(path, e))
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let value: BTreeMap<u32, Vec<String>> =
            BTreeMap::from([(0, vec!["a.jpg".to_string()]), (3, vec![])]);

        write_json(&path, &value).unwrap();
        let back: BTreeMap<u32, Vec<String>> = read_json(&path).unwrap();

        assert_eq!(back, value);
    }

    #[test]
    fn test_write_creates_parent_dirs_and_leaves_no_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.json");

        write_json(&path, &vec![1, 2, 3]).unwrap();

        assert!(path.exists());
        assert!(!path.with_file_name("out.json.part").exists());
    }

    #[test]
    fn test_overwrite_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.json");
        write_json(&path, &vec![1]).unwrap();
        write_json(&path, &vec![2, 2]).unwrap();
        let back: Vec<i32> = read_json(&path).unwrap();
        assert_eq!(back, vec![2, 2]);
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result: Result<Vec<i32>, _> = read_json(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(StoreError::Io { .. })));
    }

    #[test]
    fn test_read_malformed_json_is_serde_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, b"{not json").unwrap();
        let result: Result<Vec<i32>, _> = read_json(&path);
        assert!(matches!(result, Err(StoreError::Serde { .. })));
    }
}
