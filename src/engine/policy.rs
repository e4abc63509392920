//! Profile presets and the arithmetic derived from them.
//!
//! Everything here is pure: no document access, no I/O.

use crate::cli::Preset;
use crate::config::defaults::*;
use crate::model::CompressionProfile;

/// Map a named preset to its profile
pub fn profile_for(preset: Preset) -> CompressionProfile {
    let label = preset.label();
    match preset {
        Preset::MaximumQuality => CompressionProfile::new(label, 100, 300, false),
        Preset::HighQuality => CompressionProfile::new(label, 95, 250, true),
        Preset::Balanced => CompressionProfile::new(label, 90, 200, true),
        Preset::MaximumCompression => CompressionProfile::new(label, 85, 150, true),
    }
}

/// Downsample factor for a profile: min(dpi / 300, 0.9), tightened under aggressive
pub fn dpi_scale(profile: &CompressionProfile) -> f64 {
    let scale = (profile.dpi_factor() as f64 / DPI_BASIS).min(MAX_DPI_SCALE);
    if profile.aggressive() {
        scale * AGGRESSIVE_DPI_SCALE
    } else {
        scale
    }
}

/// Long-edge target implied by the profile's downsample factor, if downsampling is on
pub fn dpi_long_edge(profile: &CompressionProfile) -> Option<u32> {
    if !profile.downsample() {
        return None;
    }
    Some(((MAX_LONG_EDGE as f64) * dpi_scale(profile)).round() as u32)
}

/// JPEG quality to encode at, given the size of the stored source stream
pub fn effective_quality(profile: &CompressionProfile, original_bytes: usize) -> u8 {
    let quality = profile.jpeg_quality();
    if profile.aggressive() && original_bytes > AGGRESSIVE_SIZE_THRESHOLD {
        quality
            .saturating_sub(AGGRESSIVE_QUALITY_PENALTY)
            .max(MIN_AGGRESSIVE_QUALITY)
    } else {
        quality
    }
}

/// Commit only on a real size win, unless the profile forces it
pub fn should_commit(original_bytes: usize, new_bytes: usize, aggressive: bool) -> bool {
    aggressive || (new_bytes as f64) < (original_bytes as f64) * SIZE_WIN_RATIO
}

/// Target dimensions for an image that must be resized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub width: u32,
    pub height: u32,
    pub ceiling_applied: bool,
    pub downsampled: bool,
}

impl ResizePlan {
    /// Uniform scale relative to the original long edge
    pub fn ratio(&self, width: u32, height: u32) -> f64 {
        self.width.max(self.height) as f64 / width.max(height).max(1) as f64
    }
}

/// Decide whether and how far an image of `width` x `height` is scaled.
///
/// The 1500px ceiling applies first. When the profile downsamples, the DPI
/// factor is not a per-image scale: it caps the long edge at the absolute
/// length `1500 * factor`, so images already within that cap keep their size
/// and a resized image is never shrunk again on a later run. The short edge is
/// never taken below the minimum image dimension. Returns `None` when the
/// image keeps its size.
pub fn plan_resize(width: u32, height: u32, profile: &CompressionProfile) -> Option<ResizePlan> {
    let mut dims = (width, height);
    let mut ceiling_applied = false;
    let mut downsampled = false;

    if dims.0.max(dims.1) > MAX_LONG_EDGE {
        dims = fit_long_edge(dims.0, dims.1, MAX_LONG_EDGE);
        ceiling_applied = true;
    }

    if let Some(target) = dpi_long_edge(profile) {
        let (w, h) = dims;
        let long = w.max(h);
        let short = w.min(h).max(1);
        // Smallest long edge that keeps the short edge at the minimum
        let floor = ((MIN_IMAGE_DIMENSION as u64 * long as u64).div_ceil(short as u64)) as u32;
        let target = target.max(floor);
        if long > target {
            dims = fit_long_edge(w, h, target);
            downsampled = true;
        }
    }

    if !ceiling_applied && !downsampled {
        return None;
    }

    Some(ResizePlan {
        width: dims.0,
        height: dims.1,
        ceiling_applied,
        downsampled,
    })
}

/// Scale uniformly so the long edge is exactly `long_edge`
fn fit_long_edge(width: u32, height: u32, long_edge: u32) -> (u32, u32) {
    let scale_other = |other: u32, long: u32| -> u32 {
        ((other as u64 * long_edge as u64) / long.max(1) as u64).max(1) as u32
    };
    if width >= height {
        (long_edge, scale_other(height, width))
    } else {
        (scale_other(width, height), long_edge)
    }
}
