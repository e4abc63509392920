use std::fmt;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;

/// Stable identity of an image object in the document graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ImageId {
    pub number: u32,
    pub generation: u16,
}

impl From<ObjectId> for ImageId {
    fn from((number, generation): ObjectId) -> Self {
        Self { number, generation }
    }
}

impl From<ImageId> for ObjectId {
    fn from(id: ImageId) -> Self {
        (id.number, id.generation)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// Stream filter of an image. Only a single filter counts; chains are `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageFilter {
    DctDecode,
    FlateDecode,
    Other,
}

impl ImageFilter {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"DCTDecode" | b"DCT" => ImageFilter::DctDecode,
            b"FlateDecode" | b"Fl" => ImageFilter::FlateDecode,
            _ => ImageFilter::Other,
        }
    }

    fn from_object(doc: &Document, obj: Option<&Object>) -> Self {
        match obj.map(|o| resolve(doc, o)) {
            Some(Object::Name(name)) => Self::from_name(name),
            Some(Object::Array(filters)) if filters.len() == 1 => match resolve(doc, &filters[0]) {
                Object::Name(name) => Self::from_name(name),
                _ => ImageFilter::Other,
            },
            _ => ImageFilter::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageColorSpace {
    DeviceRgb,
    DeviceGray,
    Other,
}

impl ImageColorSpace {
    fn from_object(doc: &Document, obj: Option<&Object>) -> Self {
        match obj.map(|o| resolve(doc, o)) {
            Some(Object::Name(name)) => match name.as_slice() {
                b"DeviceRGB" | b"RGB" => ImageColorSpace::DeviceRgb,
                b"DeviceGray" | b"G" => ImageColorSpace::DeviceGray,
                _ => ImageColorSpace::Other,
            },
            _ => ImageColorSpace::Other,
        }
    }

    pub fn components(&self) -> Option<usize> {
        match self {
            ImageColorSpace::DeviceRgb => Some(3),
            ImageColorSpace::DeviceGray => Some(1),
            ImageColorSpace::Other => None,
        }
    }

    pub fn pdf_name(&self) -> Option<&'static str> {
        match self {
            ImageColorSpace::DeviceRgb => Some("DeviceRGB"),
            ImageColorSpace::DeviceGray => Some("DeviceGray"),
            ImageColorSpace::Other => None,
        }
    }
}

/// Attributes of one image XObject as read from its stream dictionary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageObject {
    pub id: ImageId,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u32,
    pub color_space: ImageColorSpace,
    pub filter: ImageFilter,
    /// Length of the stored (still encoded) stream content
    pub raw_len: usize,
    /// `Mask` is an array of color-key ranges rather than a stencil image
    pub color_key_mask: bool,
}

impl ImageObject {
    pub fn from_stream(doc: &Document, id: ObjectId, stream: &Stream) -> Self {
        let dict = &stream.dict;
        Self {
            id: id.into(),
            width: dict_u32(doc, dict, b"Width").unwrap_or(0),
            height: dict_u32(doc, dict, b"Height").unwrap_or(0),
            bits_per_component: dict_u32(doc, dict, b"BitsPerComponent").unwrap_or(8),
            color_space: ImageColorSpace::from_object(doc, dict.get(b"ColorSpace").ok()),
            filter: ImageFilter::from_object(doc, dict.get(b"Filter").ok()),
            raw_len: stream.content.len(),
            color_key_mask: matches!(
                dict.get(b"Mask").map(|m| resolve(doc, m)),
                Ok(Object::Array(_))
            ),
        }
    }
}

/// Follow a reference to the object it points at; other objects pass through
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Direct or indirect dictionary stored under `key`
pub fn dict_entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    match resolve(doc, dict.get(key).ok()?) {
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

fn dict_u32(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<u32> {
    match resolve(doc, dict.get(key).ok()?) {
        Object::Integer(n) if *n >= 0 => u32::try_from(*n).ok(),
        Object::Real(r) if *r >= 0.0 => Some(*r as u32),
        _ => None,
    }
}
