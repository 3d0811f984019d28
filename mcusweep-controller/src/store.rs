//! Durable sweep progress
//!
//! Two whole-file JSON records live in the home directory:
//! - `skiplist.json`: `{"skipList": ["<device id>", ...]}`
//! - `storedvalue.json`: `{"storedValue": <last attempted value>}`
//!
//! Each update rewrites the file through a temporary sibling and a rename, so
//! a crash leaves either the old or the new record on disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const SKIPLIST_FILE: &str = "skiplist.json";
pub const STORED_VALUE_FILE: &str = "storedvalue.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persistence for the exclusion set and the search position
pub trait ProgressStore {
    fn load_exclusions(&self) -> Result<Vec<String>, StoreError>;

    /// Add `id` to the persisted exclusion set; a no-op if already present
    fn append_exclusion(&mut self, id: &str) -> Result<(), StoreError>;

    fn load_search_value(&self) -> Result<Option<u32>, StoreError>;

    fn save_search_value(&mut self, value: u32) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SkipList {
    #[serde(rename = "skipList", default)]
    skip_list: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredValue {
    #[serde(rename = "storedValue")]
    stored_value: u32,
}

/// [`ProgressStore`] backed by JSON files in one directory
#[derive(Debug)]
pub struct JsonFileStore {
    home: PathBuf,
    skip_list: SkipList,
}

impl JsonFileStore {
    /// Open the store in `home`, creating the directory if needed
    pub fn open(home: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let home = home.into();
        fs::create_dir_all(&home).map_err(|source| StoreError::Io { path: home.clone(), source })?;

        let skip_list = read_json(&home.join(SKIPLIST_FILE))?.unwrap_or_default();
        Ok(Self { home, skip_list })
    }
}

impl ProgressStore for JsonFileStore {
    fn load_exclusions(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.skip_list.skip_list.clone())
    }

    fn append_exclusion(&mut self, id: &str) -> Result<(), StoreError> {
        if self.skip_list.skip_list.iter().any(|known| known == id) {
            return Ok(());
        }
        self.skip_list.skip_list.push(id.to_string());
        write_json(&self.home.join(SKIPLIST_FILE), &self.skip_list)
    }

    fn load_search_value(&self) -> Result<Option<u32>, StoreError> {
        let stored: Option<StoredValue> = read_json(&self.home.join(STORED_VALUE_FILE))?;
        Ok(stored.map(|s| s.stored_value))
    }

    fn save_search_value(&mut self, value: u32) -> Result<(), StoreError> {
        write_json(&self.home.join(STORED_VALUE_FILE), &StoredValue { stored_value: value })
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path)
        .map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&data)
        .map(Some)
        .map_err(|source| StoreError::Json { path: path.to_path_buf(), source })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let data = serde_json::to_string_pretty(value)
        .map_err(|source| StoreError::Json { path: path.to_path_buf(), source })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
    fs::rename(&tmp, path).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("nested")).unwrap();
        assert!(store.load_exclusions().unwrap().is_empty());
        assert_eq!(store.load_search_value().unwrap(), None);
    }

    #[test]
    fn exclusions_survive_reopen_in_order() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = JsonFileStore::open(dir.path()).unwrap();
            store.append_exclusion("aa:bb").unwrap();
            store.append_exclusion("cc:dd").unwrap();
            store.append_exclusion("aa:bb").unwrap();
        }
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(store.load_exclusions().unwrap(), vec!["aa:bb", "cc:dd"]);
    }

    #[test]
    fn file_formats() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path()).unwrap();
        store.append_exclusion("11:22").unwrap();
        store.save_search_value(500).unwrap();

        let skip: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(SKIPLIST_FILE)).unwrap()).unwrap();
        assert_eq!(skip, serde_json::json!({ "skipList": ["11:22"] }));

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(STORED_VALUE_FILE)).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({ "storedValue": 500 }));

        assert!(!dir.path().join("storedvalue.json.tmp").exists());
    }

    #[test]
    fn search_value_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path()).unwrap();
        store.save_search_value(7).unwrap();
        store.save_search_value(8).unwrap();
        assert_eq!(store.load_search_value().unwrap(), Some(8));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STORED_VALUE_FILE), "{not json").unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(matches!(store.load_search_value(), Err(StoreError::Json { .. })));
    }
}
