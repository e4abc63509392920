//! Persistent list of paths whose deletion failed and must be retried.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::RegistryError;

/// A set of paths that survives process restarts
pub trait PersistentPathSet {
    /// Record a path; adding one that is already present is a no-op
    fn add(&self, path: &Path) -> Result<(), RegistryError>;

    fn remove(&self, path: &Path) -> Result<(), RegistryError>;

    fn list(&self) -> Result<Vec<PathBuf>, RegistryError>;
}

/// Registry stored as a JSON array of path strings.
///
/// Every mutation rewrites the whole file through a temp file and a rename.
/// The mutex serializes access from threads of this process only.
#[derive(Debug)]
pub struct JsonPathSet {
    file: PathBuf,
    lock: Mutex<()>,
}

impl JsonPathSet {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<Vec<String>, RegistryError> {
        let data = match fs::read_to_string(&self.file) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&data) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                log::warn!(
                    "Cleanup registry {} is corrupt, starting empty: {}",
                    self.file.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    fn store(&self, entries: &[String]) -> Result<(), RegistryError> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.file.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(data.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.file)?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut Vec<String>) -> bool,
    {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut entries = self.load()?;
        if f(&mut entries) {
            self.store(&entries)?;
        }
        Ok(())
    }
}

impl PersistentPathSet for JsonPathSet {
    fn add(&self, path: &Path) -> Result<(), RegistryError> {
        let entry = path.to_string_lossy().into_owned();
        self.update(|entries| {
            if entries.contains(&entry) {
                return false;
            }
            entries.push(entry);
            true
        })
    }

    fn remove(&self, path: &Path) -> Result<(), RegistryError> {
        let entry = path.to_string_lossy();
        self.update(|entries| {
            let before = entries.len();
            entries.retain(|e| *e != entry);
            entries.len() != before
        })
    }

    fn list(&self) -> Result<Vec<PathBuf>, RegistryError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.load()?.into_iter().map(PathBuf::from).collect())
    }
}
