pub mod image;
pub mod profile;
pub mod report;

pub use image::{ImageColorSpace, ImageFilter, ImageId, ImageObject};
pub use profile::CompressionProfile;
pub use report::{
    format_size, CompressionSummary, FinalizeStats, ImageAction, RecompressionResult, SkipReason,
};
