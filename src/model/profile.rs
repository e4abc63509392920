use serde::Serialize;

use crate::cli::Preset;
use crate::engine::policy;

/// Immutable compression profile chosen by the caller.
///
/// Start from [`CompressionProfile::preset`]; the `with_*` methods return a
/// new value rather than changing this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressionProfile {
    label: &'static str,
    jpeg_quality: u8,
    dpi_factor: u32,
    grayscale: bool,
    aggressive: bool,
    downsample: bool,
}

impl CompressionProfile {
    pub fn new(
        label: &'static str,
        jpeg_quality: u8,
        dpi_factor: u32,
        downsample: bool,
    ) -> Self {
        Self {
            label,
            jpeg_quality: jpeg_quality.clamp(1, 100),
            dpi_factor,
            grayscale: false,
            aggressive: false,
            downsample,
        }
    }

    /// Profile for one of the named presets
    pub fn preset(preset: Preset) -> Self {
        policy::profile_for(preset)
    }

    pub fn with_aggressive(self, aggressive: bool) -> Self {
        Self { aggressive, ..self }
    }

    pub fn with_grayscale(self, grayscale: bool) -> Self {
        Self { grayscale, ..self }
    }

    pub fn with_downsample(self, downsample: bool) -> Self {
        Self { downsample, ..self }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    pub fn dpi_factor(&self) -> u32 {
        self.dpi_factor
    }

    pub fn grayscale(&self) -> bool {
        self.grayscale
    }

    pub fn aggressive(&self) -> bool {
        self.aggressive
    }

    pub fn downsample(&self) -> bool {
        self.downsample
    }

    /// Quality-100 profiles only re-encode when a resize or color conversion forces it
    pub fn preserves_quality(&self) -> bool {
        self.jpeg_quality >= 100
    }
}
