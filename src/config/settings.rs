use std::path::PathBuf;

use crate::cli::{Args, Preset};
use crate::model::CompressionProfile;

use super::defaults::*;

/// Runtime settings for a compression run
#[derive(Debug, Clone)]
pub struct Settings {
    pub profile: CompressionProfile,

    /// Parent directory for the per-run workspace
    pub scratch_root: PathBuf,

    /// Location of the persisted pending-cleanup list
    pub registry_path: PathBuf,

    /// Pack small objects into object streams on save
    pub object_streams: bool,

    /// Remove leftover workspaces from earlier crashed runs at startup
    pub sweep_stale: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: CompressionProfile::preset(Preset::Balanced),
            scratch_root: std::env::temp_dir(),
            registry_path: default_registry_path(),
            object_streams: true,
            sweep_stale: true,
        }
    }
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_args(args: &Args) -> Self {
        let profile = CompressionProfile::preset(args.profile)
            .with_aggressive(args.aggressive)
            .with_grayscale(args.grayscale);

        let defaults = Self::default();
        Self {
            profile,
            scratch_root: args.scratch_dir.clone().unwrap_or(defaults.scratch_root),
            registry_path: args.registry.clone().unwrap_or(defaults.registry_path),
            object_streams: !args.no_object_streams,
            ..defaults
        }
    }

    /// Same settings with a different profile
    pub fn with_profile(mut self, profile: CompressionProfile) -> Self {
        self.profile = profile;
        self
    }
}

/// The well-known registry location shared by every run on this machine
pub fn default_registry_path() -> PathBuf {
    std::env::temp_dir().join(REGISTRY_FILE_NAME)
}
