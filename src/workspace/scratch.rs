use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::defaults::{WORKSPACE_OUTPUT_NAME, WORKSPACE_PREFIX};

use super::cleanup::delete_or_defer;
use super::registry::PersistentPathSet;

/// Scratch directory owned by exactly one compression run
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    /// Create `pdf_compress_<uuid>` under `parent`. Fails if the name is taken.
    pub fn create(parent: &Path) -> io::Result<Self> {
        fs::create_dir_all(parent)?;
        let dir = parent.join(format!("{}{}", WORKSPACE_PREFIX, Uuid::new_v4().simple()));
        fs::create_dir(&dir)?;
        log::debug!("Created workspace {}", dir.display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Where the rewritten document is saved before it is copied out
    pub fn output_path(&self) -> PathBuf {
        self.artifact_path(WORKSPACE_OUTPUT_NAME)
    }

    pub fn write_artifact(&self, name: &str, data: &[u8]) -> io::Result<PathBuf> {
        let path = self.artifact_path(name);
        fs::write(&path, data)?;
        Ok(path)
    }

    /// Delete every entry and then the directory.
    ///
    /// Anything that cannot be deleted now is recorded in the registry.
    /// Returns how many paths were deferred.
    pub fn teardown(self, registry: &dyn PersistentPathSet) -> usize {
        let mut deferred = 0;
        match fs::read_dir(&self.dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    if !delete_or_defer(&entry.path(), registry) {
                        deferred += 1;
                    }
                }
            }
            Err(e) => log::debug!("Cannot list workspace {}: {}", self.dir.display(), e),
        }
        if !delete_or_defer(&self.dir, registry) {
            deferred += 1;
        }
        if deferred == 0 {
            log::debug!("Removed workspace {}", self.dir.display());
        }
        deferred
    }

    /// Give up on the workspace after a failed run: record it for a later
    /// retry, then try to tear it down now.
    pub fn abandon(self, registry: &dyn PersistentPathSet) {
        if let Err(e) = registry.add(&self.dir) {
            log::error!("Failed to record {} for cleanup: {}", self.dir.display(), e);
        }
        let dir = self.dir.clone();
        if self.teardown(registry) == 0 {
            if let Err(e) = registry.remove(&dir) {
                log::error!("Failed to update cleanup registry: {}", e);
            }
        }
    }
}
