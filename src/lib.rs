pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod workspace;

use std::path::Path;

pub use cli::Preset;
pub use config::Settings;
pub use engine::{compress_document, CancelToken, Compressor, ImageInventory};
pub use error::{CompressError, ImageError, RegistryError};
pub use model::{format_size, CompressionProfile, CompressionSummary, ImageAction, SkipReason};
pub use workspace::{JsonPathSet, PersistentPathSet};

/// High-level API for compressing one PDF file.
///
/// This is the recommended entry point for library consumers. It uses the
/// default settings (system temp directory for scratch space, the shared
/// pending-cleanup registry, object streams on) with the given profile.
///
/// # Arguments
///
/// * `source` - PDF to read; it is never modified
/// * `destination` - Where the compressed PDF is written
/// * `profile` - Usually `CompressionProfile::preset(..)`, optionally with
///   `with_aggressive` / `with_grayscale`
///
/// # Returns
///
/// A summary of the sizes and of what happened to every distinct image, or a
/// CompressError if the document could not be opened or written.
///
/// # Example
///
/// ```no_run
/// use pdf_squeeze::{compress_pdf, CompressionProfile, Preset};
/// use std::path::Path;
///
/// let profile = CompressionProfile::preset(Preset::MaximumCompression).with_aggressive(true);
/// let summary = compress_pdf(Path::new("scan.pdf"), Path::new("scan_small.pdf"), profile).unwrap();
///
/// println!("{:.1}% smaller", summary.reduction_percent());
/// ```
pub fn compress_pdf(
    source: &Path,
    destination: &Path,
    profile: CompressionProfile,
) -> Result<CompressionSummary, CompressError> {
    let settings = Settings::default().with_profile(profile);
    let registry = JsonPathSet::new(&settings.registry_path);
    Compressor::new(&settings, &registry).compress(source, destination)
}
