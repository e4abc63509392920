use serde::Serialize;

use super::image::ImageId;

/// Why an image was left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Below the minimum size; icons and thumbnails are never touched
    TooSmall,
    /// Encoding, colorspace or bit depth outside the supported set
    Unsupported,
    /// Quality-preserving profile and nothing forced a re-encode
    QualityPreserved,
    /// Already a JPEG at or below the target quality
    AlreadyOptimal,
    /// The re-encode was not meaningfully smaller
    NoSizeGain,
}

/// Outcome of the keep-or-replace decision for one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "detail")]
pub enum ImageAction {
    Skipped(SkipReason),
    /// Re-encoded with new pixel dimensions
    Resized { width: u32, height: u32 },
    /// Re-encoded at the original dimensions
    Recompressed,
    /// Decoding or encoding failed; the object is unchanged
    Discarded(String),
}

impl ImageAction {
    pub fn is_commit(&self) -> bool {
        matches!(self, ImageAction::Resized { .. } | ImageAction::Recompressed)
    }

    pub fn is_discard(&self) -> bool {
        matches!(self, ImageAction::Discarded(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecompressionResult {
    pub id: ImageId,
    pub original_bytes: usize,
    /// Equal to `original_bytes` unless the image was committed
    pub new_bytes: usize,
    pub action: ImageAction,
}

impl RecompressionResult {
    pub fn unchanged(id: ImageId, original_bytes: usize, action: ImageAction) -> Self {
        Self {
            id,
            original_bytes,
            new_bytes: original_bytes,
            action,
        }
    }

    pub fn bytes_saved(&self) -> usize {
        self.original_bytes.saturating_sub(self.new_bytes)
    }
}

/// Counters from the finalize pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FinalizeStats {
    pub pruned_objects: usize,
    pub recompressed_streams: usize,
}

/// Everything a caller needs to report on a finished run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompressionSummary {
    pub original_size_bytes: u64,
    pub compressed_size_bytes: u64,
    pub images: Vec<RecompressionResult>,
    pub finalize: FinalizeStats,
}

impl CompressionSummary {
    pub fn commits(&self) -> usize {
        self.images.iter().filter(|r| r.action.is_commit()).count()
    }

    pub fn discards(&self) -> usize {
        self.images.iter().filter(|r| r.action.is_discard()).count()
    }

    pub fn skips(&self) -> usize {
        self.images
            .iter()
            .filter(|r| matches!(r.action, ImageAction::Skipped(_)))
            .count()
    }

    /// Percentage by which the file shrank (negative if it grew)
    pub fn reduction_percent(&self) -> f64 {
        if self.original_size_bytes == 0 {
            return 0.0;
        }
        let original = self.original_size_bytes as f64;
        (original - self.compressed_size_bytes as f64) / original * 100.0
    }
}

/// Human-readable size in KB or MB
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    if kb > 1024.0 {
        format!("{:.2} MB", kb / 1024.0)
    } else {
        format!("{:.2} KB", kb)
    }
}
