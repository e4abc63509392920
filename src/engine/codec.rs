//! Raster decode/encode for the two supported source encodings.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::Stream;

use crate::error::ImageError;
use crate::model::{ImageColorSpace, ImageFilter, ImageObject};

/// Source encodings the recompressor can reconstruct pixels from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    /// DCTDecode, RGB or gray, 8 bits per component
    Jpeg,
    /// FlateDecode, 8-bit DeviceRGB samples
    RawRgb,
    /// FlateDecode, 8-bit DeviceGray samples
    RawGray,
}

impl SourceEncoding {
    /// Closed dispatch over filter x colorspace x bit depth. `None` means leave it alone.
    ///
    /// Color-key masks name exact sample values, which neither survive lossy
    /// encoding nor a change of component count, so those images are excluded.
    pub fn classify(image: &ImageObject) -> Option<Self> {
        if image.bits_per_component != 8 || image.color_key_mask {
            return None;
        }
        match (image.filter, image.color_space) {
            (ImageFilter::DctDecode, ImageColorSpace::DeviceRgb | ImageColorSpace::DeviceGray) => {
                Some(SourceEncoding::Jpeg)
            }
            (ImageFilter::FlateDecode, ImageColorSpace::DeviceRgb) => Some(SourceEncoding::RawRgb),
            (ImageFilter::FlateDecode, ImageColorSpace::DeviceGray) => {
                Some(SourceEncoding::RawGray)
            }
            _ => None,
        }
    }
}

/// Reconstruct the pixels of an image stream
pub fn decode(
    stream: &Stream,
    image: &ImageObject,
    encoding: SourceEncoding,
) -> Result<DynamicImage, ImageError> {
    let decoded = match encoding {
        SourceEncoding::Jpeg => {
            image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
                .map_err(|e| ImageError::Decode(e.to_string()))?
        }
        SourceEncoding::RawRgb => {
            let pixels = raw_samples(stream, image, 3)?;
            let img = RgbImage::from_raw(image.width, image.height, pixels)
                .ok_or_else(|| ImageError::Decode("RGB buffer does not fit dimensions".into()))?;
            DynamicImage::ImageRgb8(img)
        }
        SourceEncoding::RawGray => {
            let pixels = raw_samples(stream, image, 1)?;
            let img = GrayImage::from_raw(image.width, image.height, pixels)
                .ok_or_else(|| ImageError::Decode("gray buffer does not fit dimensions".into()))?;
            DynamicImage::ImageLuma8(img)
        }
    };

    let actual = (decoded.width(), decoded.height());
    if actual != (image.width, image.height) {
        return Err(ImageError::DimensionMismatch {
            declared: (image.width, image.height),
            actual,
        });
    }
    Ok(decoded)
}

/// Inflate a FlateDecode stream and cut it to width * height * components
fn raw_samples(
    stream: &Stream,
    image: &ImageObject,
    components: usize,
) -> Result<Vec<u8>, ImageError> {
    let mut data = stream
        .decompressed_content()
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    let stride = image.width as usize * components;
    let expected = stride * image.height as usize;
    if data.len() < expected {
        return Err(ImageError::ShortBuffer {
            expected,
            actual: data.len(),
        });
    }
    data.truncate(expected);
    Ok(data)
}

/// Resize (bicubic) and/or luma-convert
pub fn transform(
    img: DynamicImage,
    size: Option<(u32, u32)>,
    grayscale: bool,
) -> DynamicImage {
    let img = match size {
        Some((width, height)) => img.resize_exact(width, height, FilterType::CatmullRom),
        None => img,
    };
    if grayscale && !is_gray(&img) {
        DynamicImage::ImageLuma8(img.to_luma8())
    } else {
        img
    }
}

pub fn is_gray(img: &DynamicImage) -> bool {
    matches!(
        img.color(),
        ColorType::L8 | ColorType::L16 | ColorType::La8 | ColorType::La16
    )
}

/// JPEG bytes plus the colorspace they were written in
#[derive(Debug, Clone)]
pub struct EncodedJpeg {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub color_space: ImageColorSpace,
}

pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<EncodedJpeg, ImageError> {
    let (width, height) = (img.width(), img.height());
    let mut data = Vec::new();

    let color_space = {
        let mut encoder = JpegEncoder::new_with_quality(&mut data, quality.clamp(1, 100));
        if is_gray(img) {
            let luma = img.to_luma8();
            encoder
                .encode(luma.as_raw(), width, height, ColorType::L8)
                .map_err(|e| ImageError::Encode(e.to_string()))?;
            ImageColorSpace::DeviceGray
        } else {
            let rgb = img.to_rgb8();
            encoder
                .encode(rgb.as_raw(), width, height, ColorType::Rgb8)
                .map_err(|e| ImageError::Encode(e.to_string()))?;
            ImageColorSpace::DeviceRgb
        }
    };

    Ok(EncodedJpeg {
        data,
        width,
        height,
        color_space,
    })
}

/// IJG reference luminance quantization table
const STD_LUMINANCE_QTABLE: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, //
    12, 12, 14, 19, 26, 58, 60, 55, //
    14, 13, 16, 24, 40, 57, 69, 56, //
    14, 17, 22, 29, 51, 87, 80, 62, //
    18, 22, 37, 56, 68, 109, 103, 77, //
    24, 35, 55, 64, 81, 104, 113, 92, //
    49, 64, 78, 87, 103, 121, 120, 101, //
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Estimate the IJG quality setting a JPEG was written with.
///
/// Compares the sum of the luminance quantization table against the
/// reference table. Returns `None` if no table 0 is found before the scan.
pub fn estimate_jpeg_quality(data: &[u8]) -> Option<u8> {
    let table = luminance_qtable(data)?;
    let sum: u32 = table.iter().map(|&v| v as u32).sum();
    let reference: u32 = STD_LUMINANCE_QTABLE.iter().map(|&v| v as u32).sum();
    let scale = sum as f64 * 100.0 / reference as f64;
    let quality = if scale <= 100.0 {
        (200.0 - scale) / 2.0
    } else {
        5000.0 / scale
    };
    Some(quality.round().clamp(1.0, 100.0) as u8)
}

fn luminance_qtable(data: &[u8]) -> Option<[u16; 64]> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // Fill bytes and standalone markers carry no length
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if matches!(marker, 0x01 | 0xD0..=0xD7) {
            pos += 2;
            continue;
        }
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }
        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let end = pos + 2 + length;
        if length < 2 || end > data.len() {
            return None;
        }
        if marker == 0xDB {
            let mut cursor = pos + 4;
            while cursor < end {
                let precision = data[cursor] >> 4;
                let id = data[cursor] & 0x0F;
                let entry = if precision == 0 { 1 } else { 2 };
                let body = cursor + 1;
                if body + 64 * entry > end {
                    return None;
                }
                if id == 0 {
                    let mut table = [0u16; 64];
                    for (i, slot) in table.iter_mut().enumerate() {
                        let at = body + i * entry;
                        *slot = if entry == 1 {
                            data[at] as u16
                        } else {
                            u16::from_be_bytes([data[at], data[at + 1]])
                        };
                    }
                    return Some(table);
                }
                cursor = body + 64 * entry;
            }
        }
        pos = end;
    }
    None
}
