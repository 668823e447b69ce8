use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to access preference file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("preference file {path:?} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("font size must be positive, got {0}")]
    InvalidFontSize(u32),
}

/// Durable string key/value storage for editor preferences.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A JSON object on disk. Every `set` rewrites the whole file through a
/// sibling `.tmp` file that is renamed over the original.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PreferenceError> {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| PreferenceError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(PreferenceError::Io { path, source }),
        };

        Ok(FileStore { path, entries })
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    fn flush(&self) -> Result<(), PreferenceError> {
        let bytes = serde_json::to_vec_pretty(&self.entries).map_err(|source| PreferenceError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.tmp_path();
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| PreferenceError::Io { path, source }
        };

        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .map_err(io_err(&tmp_path))?;
            file.write_all(&bytes).map_err(io_err(&tmp_path))?;
            file.sync_all().map_err(io_err(&tmp_path))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(io_err(&self.path))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("editor-theme"), None);
        store.set("editor-theme", "vs-light").unwrap();
        store.set("editor-code-rust", "fn main() {}\n").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("editor-theme").as_deref(), Some("vs-light"));
        assert_eq!(reopened.get("editor-code-rust").as_deref(), Some("fn main() {}\n"));
    }

    #[test]
    fn test_file_store_replaces_file_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        // A torn write from an earlier crash only ever lands in the tmp file.
        fs::write(dir.path().join("prefs.json.tmp"), b"{\"editor-th").unwrap();

        let mut store = FileStore::open(&path).unwrap();
        store.set("editor-language", "rust").unwrap();
        assert!(!dir.path().join("prefs.json.tmp").exists());

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("editor-language").as_deref(), Some("rust"));
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, b"not json").unwrap();

        let err = FileStore::open(&path).unwrap_err();
        assert!(matches!(err, PreferenceError::Json { .. }));
    }
}
