use anyhow::{Context, Result};
use clap::Parser;

use pdf_squeeze::cli::Args;
use pdf_squeeze::config::Settings;
use pdf_squeeze::engine::Compressor;
use pdf_squeeze::workspace::{retry_pending, sweep_stale_workspaces, JsonPathSet};
use pdf_squeeze::{format_size, CompressionSummary};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    let settings = Settings::from_args(&args);
    let registry = JsonPathSet::new(&settings.registry_path);

    // Leftovers from earlier runs
    retry_pending(&registry);
    if settings.sweep_stale {
        sweep_stale_workspaces(&settings.scratch_root, &registry);
    }

    let output_path = args.output_path();
    log::info!(
        "Compressing {} with profile {}",
        args.input.display(),
        settings.profile.label()
    );

    let result = Compressor::new(&settings, &registry).compress(&args.input, &output_path);
    retry_pending(&registry);

    let summary = result.with_context(|| {
        format!(
            "Failed to compress {} (original file is unchanged)",
            args.input.display()
        )
    })?;

    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .with_context(|| "Failed to serialize summary")?;
        println!("{}", json);
    } else {
        print_summary(&summary);
        println!("Successfully wrote PDF to {}", output_path.display());
    }

    Ok(())
}

fn print_summary(summary: &CompressionSummary) {
    println!("Original size:   {}", format_size(summary.original_size_bytes));
    println!("Compressed size: {}", format_size(summary.compressed_size_bytes));
    println!("Reduction:       {:.1}%", summary.reduction_percent());
    println!(
        "Images:          {} changed, {} kept, {} failed",
        summary.commits(),
        summary.skips(),
        summary.discards()
    );
}
