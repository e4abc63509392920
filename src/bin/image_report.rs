//! Debug tool to list the images a PDF carries and how they would be classified
//! Run with: cargo run --bin image_report -- file.pdf

use lopdf::{Document, Object};
use pdf_squeeze::engine::codec::{estimate_jpeg_quality, SourceEncoding};
use pdf_squeeze::engine::ImageInventory;
use pdf_squeeze::format_size;

fn main() {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: image_report <file.pdf>");
        std::process::exit(2);
    };

    let doc = match Document::load(&path) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Failed to open {}: {}", path, e);
            std::process::exit(1);
        }
    };

    let inventory = ImageInventory::collect(&doc);
    println!(
        "{}: {} pages, {} distinct images",
        path,
        doc.get_pages().len(),
        inventory.len()
    );
    println!();
    println!(
        "{:<10} {:>11} {:>4} {:<10} {:<11} {:>10} {:>5} {:<9} {:>4}",
        "object", "size", "bpc", "colorspace", "filter", "stored", "refs", "handled", "q"
    );

    let mut stored_total = 0u64;
    for image in &inventory {
        let encoding = SourceEncoding::classify(image);
        let quality = match (encoding, doc.get_object(image.id.into())) {
            (Some(SourceEncoding::Jpeg), Ok(Object::Stream(stream))) => {
                estimate_jpeg_quality(&stream.content).map(|q| q.to_string())
            }
            _ => None,
        };
        stored_total += image.raw_len as u64;

        println!(
            "{:<10} {:>11} {:>4} {:<10} {:<11} {:>10} {:>5} {:<9} {:>4}",
            image.id.to_string(),
            format!("{}x{}", image.width, image.height),
            image.bits_per_component,
            format!("{:?}", image.color_space),
            format!("{:?}", image.filter),
            format_size(image.raw_len as u64),
            inventory.reference_count(image.id),
            match encoding {
                Some(e) => format!("{:?}", e),
                None => "-".to_string(),
            },
            quality.unwrap_or_else(|| "-".to_string()),
        );
    }

    println!();
    println!("Image data: {}", format_size(stored_total));
}
