//! Best-effort deletion with failures deferred to the registry.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::config::defaults::WORKSPACE_PREFIX;

use super::registry::PersistentPathSet;

/// Delete a file, or a directory that is already empty.
///
/// A path that no longer exists counts as deleted.
pub fn delete_path(path: &Path) -> io::Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Delete now or record the path for a later retry. Returns true if deleted.
pub fn delete_or_defer(path: &Path, registry: &dyn PersistentPathSet) -> bool {
    match delete_path(path) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Deferring cleanup of {}: {}", path.display(), e);
            if let Err(e) = registry.add(path) {
                log::error!("Failed to record {} for cleanup: {}", path.display(), e);
            }
            false
        }
    }
}

/// Outcome of a registry retry pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub cleaned: usize,
    pub pending: usize,
}

/// Retry every deferred path. Paths that are now gone leave the registry.
pub fn retry_pending(registry: &dyn PersistentPathSet) -> CleanupReport {
    let entries = match registry.list() {
        Ok(entries) => entries,
        Err(e) => {
            log::error!("Failed to read cleanup registry: {}", e);
            return CleanupReport::default();
        }
    };

    let mut report = CleanupReport::default();
    for path in entries {
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            delete_path(&path)
        };
        match result {
            Ok(()) => {
                if let Err(e) = registry.remove(&path) {
                    log::error!("Failed to update cleanup registry: {}", e);
                }
                report.cleaned += 1;
            }
            Err(e) => {
                log::debug!("Still unable to delete {}: {}", path.display(), e);
                report.pending += 1;
            }
        }
    }

    if report.cleaned > 0 || report.pending > 0 {
        log::info!(
            "Deferred cleanup: {} removed, {} still pending",
            report.cleaned,
            report.pending
        );
    }
    report
}

/// Remove workspaces left behind by runs that never reached teardown.
///
/// Assumes no other run is active under `root`. Returns how many were removed.
pub fn sweep_stale_workspaces(root: &Path, registry: &dyn PersistentPathSet) -> usize {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cannot scan {} for stale workspaces: {}", root.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let is_workspace = entry.file_name().to_string_lossy().starts_with(WORKSPACE_PREFIX)
            && entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_workspace {
            continue;
        }
        let path = entry.path();
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                log::info!("Removed stale workspace {}", path.display());
                removed += 1;
            }
            Err(e) => {
                log::warn!("Deferring stale workspace {}: {}", path.display(), e);
                if let Err(e) = registry.add(&path) {
                    log::error!("Failed to record {} for cleanup: {}", path.display(), e);
                }
            }
        }
    }
    removed
}
