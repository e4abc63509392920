use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors for a compression run. The source file is never modified when
/// one of these is returned.
#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Failed to open PDF {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("Failed to allocate workspace: {0}")]
    Workspace(std::io::Error),

    #[error("Failed to write compressed PDF (original file is unchanged): {0}")]
    Save(String),

    #[error("Compression cancelled")]
    Cancelled,
}

/// Per-image failures. These never abort a run; the image is discarded.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to decode image stream: {0}")]
    Decode(String),

    #[error("Pixel buffer too short: expected {expected} bytes, got {actual}")]
    ShortBuffer { expected: usize, actual: usize },

    #[error("Decoded size {actual:?} does not match dictionary size {declared:?}")]
    DimensionMismatch {
        declared: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Failed to encode JPEG: {0}")]
    Encode(String),

    #[error("Failed to write scratch artifact: {0}")]
    Scratch(#[from] std::io::Error),

    #[error("Image object {0:?} is no longer a stream")]
    NotAStream((u32, u16)),
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Cleanup registry IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cleanup registry is not a JSON array of paths: {0}")]
    Json(#[from] serde_json::Error),
}
