/// Images narrower or shorter than this (in pixels) are never touched
pub const MIN_IMAGE_DIMENSION: u32 = 100;

/// Hard ceiling for the long edge of any re-encoded image, in pixels
pub const MAX_LONG_EDGE: u32 = 1500;

/// Resolution that a DPI factor is measured against
pub const DPI_BASIS: f64 = 300.0;

/// Upper bound for the DPI downsample factor
pub const MAX_DPI_SCALE: f64 = 0.9;

/// Extra downsample multiplier under aggressive compression
pub const AGGRESSIVE_DPI_SCALE: f64 = 0.75;

/// A re-encode must be smaller than this fraction of the original to be committed
pub const SIZE_WIN_RATIO: f64 = 0.98;

/// Aggressive quality reduction only applies to streams larger than this (bytes)
pub const AGGRESSIVE_SIZE_THRESHOLD: usize = 100 * 1024;

/// JPEG quality points removed under aggressive compression
pub const AGGRESSIVE_QUALITY_PENALTY: u8 = 20;

/// Aggressive compression never goes below this JPEG quality
pub const MIN_AGGRESSIVE_QUALITY: u8 = 30;

/// A JPEG whose estimated quality is within this many points of the target is left alone
pub const QUALITY_TOLERANCE: u8 = 3;

/// Prefix for per-run scratch directories
pub const WORKSPACE_PREFIX: &str = "pdf_compress_";

/// Name of the rewritten document inside the workspace
pub const WORKSPACE_OUTPUT_NAME: &str = "output.pdf";

/// File name of the pending-cleanup registry in the system temp directory
pub const REGISTRY_FILE_NAME: &str = "pdf_squeeze_cleanup.json";

/// Objects packed into one object stream on save
pub const MAX_OBJECTS_PER_STREAM: usize = 200;

/// Deflate level used for generic stream recompression
pub const STREAM_COMPRESSION_LEVEL: u32 = 9;
