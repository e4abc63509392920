//! Per-image keep-or-replace decision and the commit into the document.

use lopdf::{Document, Object, Stream};

use crate::config::defaults::{MIN_IMAGE_DIMENSION, QUALITY_TOLERANCE};
use crate::error::ImageError;
use crate::model::{
    CompressionProfile, ImageAction, ImageColorSpace, ImageId, ImageObject, RecompressionResult,
    SkipReason,
};
use crate::workspace::Workspace;

use super::codec::{self, EncodedJpeg, SourceEncoding};
use super::policy;

/// What the pure stages decided for one image
#[derive(Debug, Clone)]
pub enum Decision {
    Keep(SkipReason),
    Replace {
        jpeg: EncodedJpeg,
        resized: bool,
    },
}

/// Applies one profile to the images of a document
pub struct ImageRecompressor<'a> {
    profile: CompressionProfile,
    workspace: Option<&'a Workspace>,
}

impl<'a> ImageRecompressor<'a> {
    pub fn new(profile: CompressionProfile) -> Self {
        Self {
            profile,
            workspace: None,
        }
    }

    /// Also write each committed JPEG into the workspace
    pub fn with_workspace(mut self, workspace: &'a Workspace) -> Self {
        self.workspace = Some(workspace);
        self
    }

    /// Decide and, if worthwhile, replace one image.
    ///
    /// Never fails: problems with the image are reported as a discard and the
    /// object is left exactly as it was.
    pub fn process(&self, doc: &mut Document, image: &ImageObject) -> RecompressionResult {
        let id = image.id;
        let original = image.raw_len;

        if image.width < MIN_IMAGE_DIMENSION || image.height < MIN_IMAGE_DIMENSION {
            log::debug!("{}: {}x{} too small, skipped", id, image.width, image.height);
            let action = ImageAction::Skipped(SkipReason::TooSmall);
            return RecompressionResult::unchanged(id, original, action);
        }
        let Some(encoding) = SourceEncoding::classify(image) else {
            log::debug!(
                "{}: unsupported {:?}/{:?}/{} bpc, skipped",
                id,
                image.filter,
                image.color_space,
                image.bits_per_component
            );
            let action = ImageAction::Skipped(SkipReason::Unsupported);
            return RecompressionResult::unchanged(id, original, action);
        };

        // Work on a snapshot so nothing below touches the graph until commit
        let snapshot = match doc.get_object(id.into()) {
            Ok(Object::Stream(stream)) => stream.clone(),
            _ => return discard(id, original, ImageError::NotAStream(id.into())),
        };

        let decision = match evaluate(&snapshot, image, encoding, &self.profile) {
            Ok(decision) => decision,
            Err(e) => return discard(id, original, e),
        };

        match decision {
            Decision::Keep(reason) => {
                log::debug!("{}: kept ({:?})", id, reason);
                RecompressionResult::unchanged(id, original, ImageAction::Skipped(reason))
            }
            Decision::Replace { jpeg, resized } => {
                if let Some(workspace) = self.workspace {
                    let name = format!("img-{}-{}.jpg", id.number, id.generation);
                    if let Err(e) = workspace.write_artifact(&name, &jpeg.data) {
                        return discard(id, original, e.into());
                    }
                }
                let action = if resized {
                    ImageAction::Resized {
                        width: jpeg.width,
                        height: jpeg.height,
                    }
                } else {
                    ImageAction::Recompressed
                };
                let new_bytes = jpeg.data.len();
                if let Err(e) = commit(doc, id, jpeg) {
                    return discard(id, original, e);
                }
                log::debug!("{}: {} -> {} bytes ({:?})", id, original, new_bytes, action);
                RecompressionResult {
                    id,
                    original_bytes: original,
                    new_bytes,
                    action,
                }
            }
        }
    }
}

/// Decode, transform, encode and compare without touching the document
pub fn evaluate(
    stream: &Stream,
    image: &ImageObject,
    encoding: SourceEncoding,
    profile: &CompressionProfile,
) -> Result<Decision, ImageError> {
    let plan = policy::plan_resize(image.width, image.height, profile);
    let to_gray = profile.grayscale() && image.color_space == ImageColorSpace::DeviceRgb;
    let quality = policy::effective_quality(profile, image.raw_len);

    if plan.is_none() && !to_gray {
        if profile.preserves_quality() {
            return Ok(Decision::Keep(SkipReason::QualityPreserved));
        }
        if encoding == SourceEncoding::Jpeg {
            let estimate = codec::estimate_jpeg_quality(&stream.content);
            if estimate.is_some_and(|q| q <= quality.saturating_add(QUALITY_TOLERANCE)) {
                return Ok(Decision::Keep(SkipReason::AlreadyOptimal));
            }
        }
    }

    let decoded = codec::decode(stream, image, encoding)?;
    let transformed = codec::transform(decoded, plan.map(|p| (p.width, p.height)), to_gray);
    let jpeg = codec::encode_jpeg(&transformed, quality)?;

    if !policy::should_commit(image.raw_len, jpeg.data.len(), profile.aggressive()) {
        return Ok(Decision::Keep(SkipReason::NoSizeGain));
    }

    Ok(Decision::Replace {
        jpeg,
        resized: plan.is_some(),
    })
}

/// Replace the image stream with the encoded JPEG in a single assignment
pub fn commit(doc: &mut Document, id: ImageId, jpeg: EncodedJpeg) -> Result<(), ImageError> {
    let (mut dict, previous_components) = match doc.get_object(id.into()) {
        Ok(Object::Stream(current)) => (
            current.dict.clone(),
            ImageObject::from_stream(doc, id.into(), current)
                .color_space
                .components(),
        ),
        _ => return Err(ImageError::NotAStream(id.into())),
    };

    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    dict.set("Width", jpeg.width as i64);
    dict.set("Height", jpeg.height as i64);
    dict.set("BitsPerComponent", 8);
    if let Some(name) = jpeg.color_space.pdf_name() {
        dict.set("ColorSpace", Object::Name(name.as_bytes().to_vec()));
    }
    for key in [&b"DecodeParms"[..], b"Predictor", b"Interpolate"] {
        dict.remove(key);
    }
    if previous_components != jpeg.color_space.components() {
        dict.remove(b"Decode");
    }

    let mut replacement = Stream::new(dict, jpeg.data);
    replacement.allows_compression = false;

    let object = doc
        .get_object_mut(id.into())
        .map_err(|_| ImageError::NotAStream(id.into()))?;
    *object = Object::Stream(replacement);
    Ok(())
}

fn discard(id: ImageId, original: usize, error: ImageError) -> RecompressionResult {
    log::warn!("{}: discarded, image left unchanged: {}", id, error);
    RecompressionResult::unchanged(id, original, ImageAction::Discarded(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Preset;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use lopdf::{dictionary, ObjectId};
    use std::io::Write;

    /// Noisy gradient that deflates poorly and JPEG-encodes well
    fn noisy_rgb(width: u32, height: u32) -> Vec<u8> {
        let mut seed: u32 = 0x2545_F491;
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                let noise = (seed >> 28) as u32;
                pixels.push(((x * 255 / width) + noise).min(255) as u8);
                pixels.push(((y * 255 / height) + noise).min(255) as u8);
                pixels.push((128 + noise) as u8);
            }
        }
        pixels
    }

    fn flate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn add_image(doc: &mut Document, width: u32, height: u32, color_space: &str, content: Vec<u8>) -> ObjectId {
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "BitsPerComponent" => 8,
                "ColorSpace" => color_space,
                "Filter" => "FlateDecode",
                "Decode" => vec![0.into(), 1.into(), 0.into(), 1.into(), 0.into(), 1.into()],
                "DecodeParms" => dictionary! { "Columns" => width as i64 },
                "Interpolate" => true,
            },
            content,
        ))
    }

    fn inspect(doc: &Document, id: ObjectId) -> ImageObject {
        match doc.get_object(id).unwrap() {
            Object::Stream(stream) => ImageObject::from_stream(doc, id, stream),
            _ => panic!("not a stream"),
        }
    }

    #[test]
    fn test_cmyk_is_skipped_untouched() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(&mut doc, 200, 200, "DeviceCMYK", flate(&[0u8; 200 * 200 * 4]));
        let before = doc.get_object(id).unwrap().clone();

        let recompressor = ImageRecompressor::new(CompressionProfile::preset(Preset::MaximumCompression));
        let image = inspect(&doc, id);
        let result = recompressor.process(&mut doc, &image);

        assert_eq!(result.action, ImageAction::Skipped(SkipReason::Unsupported));
        assert_eq!(doc.get_object(id).unwrap(), &before);
    }

    #[test]
    fn test_tiny_image_is_skipped() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(&mut doc, 99, 400, "DeviceRGB", flate(&noisy_rgb(99, 400)));

        let recompressor = ImageRecompressor::new(CompressionProfile::preset(Preset::MaximumCompression));
        let image = inspect(&doc, id);
        let result = recompressor.process(&mut doc, &image);
        assert_eq!(result.action, ImageAction::Skipped(SkipReason::TooSmall));
    }

    #[test]
    fn test_maximum_quality_keeps_small_images() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(&mut doc, 300, 200, "DeviceRGB", flate(&noisy_rgb(300, 200)));

        let recompressor = ImageRecompressor::new(CompressionProfile::preset(Preset::MaximumQuality));
        let image = inspect(&doc, id);
        let result = recompressor.process(&mut doc, &image);
        assert_eq!(result.action, ImageAction::Skipped(SkipReason::QualityPreserved));
    }

    #[test]
    fn test_grayscale_commit_rewrites_dictionary() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(&mut doc, 300, 200, "DeviceRGB", flate(&noisy_rgb(300, 200)));

        let profile = CompressionProfile::preset(Preset::Balanced)
            .with_grayscale(true)
            .with_aggressive(true);
        let image = inspect(&doc, id);
        let result = ImageRecompressor::new(profile).process(&mut doc, &image);
        assert_eq!(result.action, ImageAction::Recompressed);
        assert!(result.new_bytes < result.original_bytes);

        let Object::Stream(stream) = doc.get_object(id).unwrap() else {
            panic!("not a stream");
        };
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert_eq!(stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceGray");
        assert_eq!(stream.dict.get(b"Length").unwrap().as_i64().unwrap(), result.new_bytes as i64);
        assert!(!stream.dict.has(b"DecodeParms"));
        assert!(!stream.dict.has(b"Interpolate"));
        assert!(!stream.dict.has(b"Decode"));
        assert!(!stream.allows_compression);
        assert!(stream.content.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn test_resize_records_new_dimensions() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(&mut doc, 1600, 400, "DeviceRGB", flate(&noisy_rgb(1600, 400)));

        let profile = CompressionProfile::preset(Preset::MaximumQuality).with_aggressive(true);
        let image = inspect(&doc, id);
        let result = ImageRecompressor::new(profile).process(&mut doc, &image);
        assert_eq!(result.action, ImageAction::Resized { width: 1500, height: 375 });

        let after = inspect(&doc, id);
        assert_eq!((after.width, after.height), (1500, 375));
        assert_eq!(after.filter, crate::model::ImageFilter::DctDecode);
    }

    #[test]
    fn test_jpeg_source_is_resized_and_committed() {
        let (width, height) = (2000, 1200);
        let pixels = image::RgbImage::from_raw(width, height, noisy_rgb(width, height)).unwrap();
        let source = codec::encode_jpeg(&image::DynamicImage::ImageRgb8(pixels), 100).unwrap();

        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "BitsPerComponent" => 8,
                "ColorSpace" => "DeviceRGB",
                "Filter" => "DCTDecode",
            },
            source.data,
        ));

        let image = inspect(&doc, id);
        let result = ImageRecompressor::new(CompressionProfile::preset(Preset::Balanced)).process(&mut doc, &image);
        assert_eq!(result.action, ImageAction::Resized { width: 1000, height: 600 });
        assert!((result.new_bytes as f64) < result.original_bytes as f64 * 0.98);

        let after = inspect(&doc, id);
        assert_eq!((after.width, after.height), (1000, 600));
        assert_eq!(after.filter, crate::model::ImageFilter::DctDecode);
        assert_eq!(after.color_space, ImageColorSpace::DeviceRgb);
        assert_eq!(after.raw_len, result.new_bytes);
    }

    #[test]
    fn test_color_key_mask_is_left_alone() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(&mut doc, 300, 200, "DeviceRGB", flate(&noisy_rgb(300, 200)));
        if let Ok(Object::Stream(stream)) = doc.get_object_mut(id) {
            let key = [0, 10, 0, 10, 0, 10].into_iter().map(Object::Integer).collect();
            stream.dict.set("Mask", Object::Array(key));
        }
        let before = doc.get_object(id).unwrap().clone();

        let profile = CompressionProfile::preset(Preset::Balanced)
            .with_grayscale(true)
            .with_aggressive(true);
        let image = inspect(&doc, id);
        let result = ImageRecompressor::new(profile).process(&mut doc, &image);

        assert_eq!(result.action, ImageAction::Skipped(SkipReason::Unsupported));
        assert_eq!(doc.get_object(id).unwrap(), &before);
    }

    #[test]
    fn test_corrupt_stream_is_discarded() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(&mut doc, 200, 200, "DeviceRGB", b"definitely not zlib".to_vec());
        let before = doc.get_object(id).unwrap().clone();

        let profile = CompressionProfile::preset(Preset::MaximumCompression).with_aggressive(true);
        let image = inspect(&doc, id);
        let result = ImageRecompressor::new(profile).process(&mut doc, &image);

        assert!(result.action.is_discard());
        assert_eq!(result.new_bytes, result.original_bytes);
        assert_eq!(doc.get_object(id).unwrap(), &before);
    }

    #[test]
    fn test_scratch_artifact_written() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(root.path()).unwrap();
        let mut doc = Document::with_version("1.5");
        let id = add_image(&mut doc, 300, 200, "DeviceRGB", flate(&noisy_rgb(300, 200)));

        let profile = CompressionProfile::preset(Preset::MaximumCompression).with_aggressive(true);
        let recompressor = ImageRecompressor::new(profile).with_workspace(&workspace);
        let image = inspect(&doc, id);
        let result = recompressor.process(&mut doc, &image);

        assert!(result.action.is_commit());
        let artifact = workspace.artifact_path(&format!("img-{}-{}.jpg", id.0, id.1));
        assert_eq!(std::fs::metadata(artifact).unwrap().len() as usize, result.new_bytes);
    }

    #[test]
    fn test_second_pass_on_own_output_is_already_optimal() {
        let mut doc = Document::with_version("1.5");
        let id = add_image(&mut doc, 400, 300, "DeviceRGB", flate(&noisy_rgb(400, 300)));
        let profile = CompressionProfile::preset(Preset::HighQuality).with_aggressive(true);

        let image = inspect(&doc, id);

        let first = ImageRecompressor::new(profile).process(&mut doc, &image);
        assert!(first.action.is_commit());

        let image = inspect(&doc, id);

        let second = ImageRecompressor::new(profile).process(&mut doc, &image);
        assert_eq!(second.action, ImageAction::Skipped(SkipReason::AlreadyOptimal));
    }
}
