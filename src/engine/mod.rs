//! Compression pipeline: inventory, per-image decisions, finalize, save.

pub mod cancel;
pub mod codec;
pub mod finalize;
pub mod inventory;
pub mod policy;
pub mod recompress;

use std::fs;
use std::path::Path;

use lopdf::Document;

use crate::config::Settings;
use crate::error::CompressError;
use crate::model::{CompressionProfile, CompressionSummary, FinalizeStats, RecompressionResult};
use crate::workspace::{PersistentPathSet, Workspace};

pub use cancel::CancelToken;
pub use finalize::{finalize, write_document};
pub use inventory::ImageInventory;
pub use recompress::ImageRecompressor;

/// Runs one compression job from a source file to a destination file
pub struct Compressor<'a> {
    settings: &'a Settings,
    registry: &'a dyn PersistentPathSet,
    cancel: CancelToken,
}

impl<'a> Compressor<'a> {
    pub fn new(settings: &'a Settings, registry: &'a dyn PersistentPathSet) -> Self {
        Self {
            settings,
            registry,
            cancel: CancelToken::new(),
        }
    }

    /// Observe `token` between images
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Compress `source` into `destination`.
    ///
    /// The source is only ever read. The destination is written once, from a
    /// verified copy in the workspace, after the document has been dropped.
    pub fn compress(&self, source: &Path, destination: &Path) -> Result<CompressionSummary, CompressError> {
        let open_error = |message: String| CompressError::Open {
            path: source.to_path_buf(),
            message,
        };
        let original_size = fs::metadata(source).map_err(|e| open_error(e.to_string()))?.len();
        let doc = Document::load(source).map_err(|e| open_error(e.to_string()))?;
        log::info!(
            "Loaded {} ({} pages, {} bytes)",
            source.display(),
            doc.get_pages().len(),
            original_size
        );

        let workspace = Workspace::create(&self.settings.scratch_root).map_err(CompressError::Workspace)?;

        match self.run(doc, &workspace, destination) {
            Ok((images, finalize, compressed_size)) => {
                workspace.teardown(self.registry);
                let summary = CompressionSummary {
                    original_size_bytes: original_size,
                    compressed_size_bytes: compressed_size,
                    images,
                    finalize,
                };
                log::info!(
                    "Wrote {} ({} images changed, {:.1}% smaller)",
                    destination.display(),
                    summary.commits(),
                    summary.reduction_percent()
                );
                Ok(summary)
            }
            Err(e) => {
                log::warn!("Compression failed, original file is unchanged: {}", e);
                workspace.abandon(self.registry);
                Err(e)
            }
        }
    }

    fn run(
        &self,
        mut doc: Document,
        workspace: &Workspace,
        destination: &Path,
    ) -> Result<(Vec<RecompressionResult>, FinalizeStats, u64), CompressError> {
        let (images, stats) =
            compress_document(&mut doc, &self.settings.profile, Some(workspace), &self.cancel)?;

        let temp_output = workspace.output_path();
        write_document(&mut doc, &temp_output, self.settings.object_streams)?;
        drop(doc);

        verify_output(&temp_output)?;
        let size = fs::copy(&temp_output, destination).map_err(|e| {
            CompressError::Save(format!("copy to {}: {}", destination.display(), e))
        })?;
        Ok((images, stats, size))
    }
}

/// Apply `profile` to every distinct image of an in-memory document, then finalize it.
///
/// Images are handled one at a time in page order. Cancellation is checked
/// before each image.
pub fn compress_document(
    doc: &mut Document,
    profile: &CompressionProfile,
    workspace: Option<&Workspace>,
    cancel: &CancelToken,
) -> Result<(Vec<RecompressionResult>, FinalizeStats), CompressError> {
    let inventory = ImageInventory::collect(doc);
    log::info!("Found {} distinct images", inventory.len());

    let mut recompressor = ImageRecompressor::new(*profile);
    if let Some(workspace) = workspace {
        recompressor = recompressor.with_workspace(workspace);
    }

    let mut results = Vec::with_capacity(inventory.len());
    for image in &inventory {
        if cancel.is_cancelled() {
            log::info!("Cancelled after {} of {} images", results.len(), inventory.len());
            return Err(CompressError::Cancelled);
        }
        results.push(recompressor.process(doc, image));
    }

    let stats = finalize(doc);
    Ok((results, stats))
}

/// The temp output must exist, be non-empty and start with a PDF header
fn verify_output(path: &Path) -> Result<(), CompressError> {
    let bytes = fs::read(path).map_err(|e| CompressError::Save(format!("{}: {}", path.display(), e)))?;
    if bytes.is_empty() {
        return Err(CompressError::Save(format!("{} is empty", path.display())));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(CompressError::Save(format!("{} has no PDF header", path.display())));
    }
    Ok(())
}
