//! Document-wide cleanup and the final save.
//!
//! Runs once after every image decision: unreachable objects are pruned,
//! unfiltered streams deflated, existing Flate streams re-deflated when that
//! helps, and the file written with object and cross-reference streams.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Document, Object, SaveOptions, Stream};

use crate::config::defaults::{MAX_OBJECTS_PER_STREAM, STREAM_COMPRESSION_LEVEL};
use crate::error::CompressError;
use crate::model::FinalizeStats;

/// Lowest version that allows object streams
const OBJECT_STREAM_VERSION: &str = "1.5";

/// Prune and compress the object graph in place
pub fn finalize(doc: &mut Document) -> FinalizeStats {
    let pruned = doc.prune_objects();
    if !pruned.is_empty() {
        log::debug!("Pruned {} unreachable objects", pruned.len());
    }

    // Streams without a filter get deflated here
    doc.compress();

    let recompressed = doc
        .objects
        .values_mut()
        .filter_map(|object| match object {
            Object::Stream(stream) => Some(stream),
            _ => None,
        })
        .map(redeflate)
        .filter(|changed| *changed)
        .count();
    if recompressed > 0 {
        log::debug!("Re-deflated {} streams", recompressed);
    }

    FinalizeStats {
        pruned_objects: pruned.len(),
        recompressed_streams: recompressed,
    }
}

/// Re-deflate a plain FlateDecode stream at best compression if that is smaller
fn redeflate(stream: &mut Stream) -> bool {
    if !stream.allows_compression || stream.dict.has(b"DecodeParms") {
        return false;
    }
    let single_flate = match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == b"FlateDecode",
        Ok(Object::Array(filters)) => {
            matches!(filters.as_slice(), [Object::Name(name)] if name == b"FlateDecode")
        }
        _ => false,
    };
    if !single_flate {
        return false;
    }

    let mut plain = Vec::new();
    if ZlibDecoder::new(stream.content.as_slice())
        .read_to_end(&mut plain)
        .is_err()
    {
        return false;
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(STREAM_COMPRESSION_LEVEL));
    if encoder.write_all(&plain).is_err() {
        return false;
    }
    match encoder.finish() {
        Ok(deflated) if deflated.len() < stream.content.len() => {
            stream.set_content(deflated);
            true
        }
        _ => false,
    }
}

/// Writer options for the final save
pub fn save_options(object_streams: bool) -> SaveOptions {
    SaveOptions::builder()
        .use_object_streams(object_streams)
        .use_xref_streams(object_streams)
        .max_objects_per_stream(MAX_OBJECTS_PER_STREAM)
        .compression_level(STREAM_COMPRESSION_LEVEL)
        .build()
}

/// Save to `path`, then flush, sync and close the handle. Returns the file size.
pub fn write_document(
    doc: &mut Document,
    path: &Path,
    object_streams: bool,
) -> Result<u64, CompressError> {
    if object_streams && version_below(&doc.version, OBJECT_STREAM_VERSION) {
        log::debug!("Raising PDF version {} to {}", doc.version, OBJECT_STREAM_VERSION);
        doc.version = OBJECT_STREAM_VERSION.to_string();
    }

    let file = File::create(path)
        .map_err(|e| CompressError::Save(format!("{}: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);
    doc.save_with_options(&mut writer, save_options(object_streams))
        .map_err(|e| CompressError::Save(e.to_string()))?;
    writer
        .flush()
        .map_err(|e| CompressError::Save(e.to_string()))?;
    let file = writer
        .into_inner()
        .map_err(|e| CompressError::Save(e.to_string()))?;
    file.sync_all()
        .map_err(|e| CompressError::Save(e.to_string()))?;
    let size = file
        .metadata()
        .map_err(|e| CompressError::Save(e.to_string()))?
        .len();
    drop(file);

    Ok(size)
}

fn version_below(version: &str, minimum: &str) -> bool {
    let parse = |v: &str| -> (u32, u32) {
        let mut parts = v.trim().splitn(2, '.');
        let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        (major, minor)
    };
    parse(version) < parse(minimum)
}
