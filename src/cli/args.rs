use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pdf-squeeze")]
#[command(
    author,
    version,
    about = "Shrink PDF files by recompressing their embedded raster images"
)]
pub struct Args {
    /// Input PDF file path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output PDF file path (defaults to compressed_<input name> next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compression profile
    #[arg(short, long, value_enum, default_value = "balanced")]
    pub profile: Preset,

    /// Lower JPEG quality further, downsample harder and commit even without a size win
    #[arg(long)]
    pub aggressive: bool,

    /// Convert RGB images to grayscale
    #[arg(long)]
    pub grayscale: bool,

    /// Write a classic cross-reference table instead of object streams
    #[arg(long)]
    pub no_object_streams: bool,

    /// Directory under which the per-run scratch workspace is created
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Pending-cleanup registry file (defaults to a file in the system temp directory)
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Print the result summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Named compression presets
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum Preset {
    /// 300 DPI, quality 100; images are only touched when they must be resized
    MaximumQuality,
    /// 250 DPI, quality 95
    HighQuality,
    /// 200 DPI, quality 90
    #[default]
    Balanced,
    /// 150 DPI, quality 85
    MaximumCompression,
}

impl Preset {
    pub fn label(&self) -> &'static str {
        match self {
            Preset::MaximumQuality => "Maximum Quality",
            Preset::HighQuality => "High Quality",
            Preset::Balanced => "Balanced",
            Preset::MaximumCompression => "Maximum Compression",
        }
    }
}

impl Args {
    /// Get the output path, defaulting to compressed_<name> beside the input
    pub fn output_path(&self) -> PathBuf {
        if let Some(ref output) = self.output {
            return output.clone();
        }
        let name = self
            .input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "output.pdf".to_string());
        self.input.with_file_name(format!("compressed_{}", name))
    }
}
