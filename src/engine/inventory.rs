//! Collects the distinct image XObjects a document's pages draw.

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::model::image::{dict_entry, resolve};
use crate::model::{ImageId, ImageObject};

/// Distinct images in first-seen page order
#[derive(Debug, Clone, Default)]
pub struct ImageInventory {
    images: Vec<ImageObject>,
    references: HashMap<ImageId, usize>,
}

impl ImageInventory {
    /// Walk every page (and nested Form XObjects) of the document
    pub fn collect(doc: &Document) -> Self {
        let mut walker = Walker {
            doc,
            inventory: ImageInventory::default(),
            visited: HashSet::new(),
        };

        for (page_number, page_id) in doc.get_pages() {
            let Some(resources) = page_resources(doc, page_id) else {
                log::debug!("Page {} has no resources", page_number);
                continue;
            };
            walker.visit_resources(resources);
        }

        log::debug!(
            "Inventory: {} distinct images from {} XObject references",
            walker.inventory.images.len(),
            walker.inventory.references.values().sum::<usize>()
        );
        walker.inventory
    }

    pub fn images(&self) -> &[ImageObject] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// How many XObject entries pointed at this image
    pub fn reference_count(&self, id: ImageId) -> usize {
        self.references.get(&id).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageObject> {
        self.images.iter()
    }
}

impl<'a> IntoIterator for &'a ImageInventory {
    type Item = &'a ImageObject;
    type IntoIter = std::slice::Iter<'a, ImageObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}

struct Walker<'a> {
    doc: &'a Document,
    inventory: ImageInventory,
    /// Every image or form object already expanded
    visited: HashSet<ObjectId>,
}

impl<'a> Walker<'a> {
    fn visit_resources(&mut self, resources: &'a Dictionary) {
        let Some(xobjects) = dict_entry(self.doc, resources, b"XObject") else {
            return;
        };
        for (_, value) in xobjects.iter() {
            if let Object::Reference(id) = value {
                self.visit_xobject(*id);
            }
        }
    }

    fn visit_xobject(&mut self, id: ObjectId) {
        let Ok(Object::Stream(stream)) = self.doc.get_object(id) else {
            return;
        };

        let subtype = match stream.dict.get(b"Subtype").map(|s| resolve(self.doc, s)) {
            Ok(Object::Name(name)) => name.as_slice(),
            _ => return,
        };

        match subtype {
            b"Image" => {
                *self.inventory.references.entry(id.into()).or_insert(0) += 1;
                if self.visited.insert(id) {
                    self.inventory
                        .images
                        .push(ImageObject::from_stream(self.doc, id, stream));
                }
            }
            b"Form" => {
                if !self.visited.insert(id) {
                    return;
                }
                if let Some(resources) = dict_entry(self.doc, &stream.dict, b"Resources") {
                    self.visit_resources(resources);
                }
            }
            _ => {}
        }
    }
}

/// Resources of a page, inherited from the nearest `Pages` ancestor when absent
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    let mut seen = HashSet::new();
    loop {
        if let Some(resources) = dict_entry(doc, node, b"Resources") {
            return Some(resources);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        if !seen.insert(parent) {
            return None;
        }
        node = doc.get_dictionary(parent).ok()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn image(doc: &mut Document, width: i64) -> ObjectId {
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => 200,
                "BitsPerComponent" => 8,
                "ColorSpace" => "DeviceRGB",
                "Filter" => "FlateDecode",
            },
            vec![0u8; 8],
        ))
    }

    /// Build a document whose pages carry the given resource dictionaries
    fn document_with_pages(doc: &mut Document, resources: Vec<Option<Object>>) {
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for res in resources {
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            };
            if let Some(res) = res {
                page.set("Resources", res);
            }
            kids.push(doc.add_object(page).into());
        }
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
    }

    fn xobject_resources(entries: Vec<(&str, ObjectId)>) -> Object {
        let mut xobjects = Dictionary::new();
        for (name, id) in entries {
            xobjects.set(name, Object::Reference(id));
        }
        Object::Dictionary(dictionary! { "XObject" => xobjects })
    }

    #[test]
    fn test_shared_image_collected_once() {
        let mut doc = Document::with_version("1.5");
        let shared = image(&mut doc, 300);
        let pages = (0..5)
            .map(|_| Some(xobject_resources(vec![("Im0", shared)])))
            .collect();
        document_with_pages(&mut doc, pages);

        let inventory = ImageInventory::collect(&doc);
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.reference_count(shared.into()), 5);
    }

    #[test]
    fn test_missing_resources_is_not_an_error() {
        let mut doc = Document::with_version("1.5");
        let img = image(&mut doc, 300);
        document_with_pages(
            &mut doc,
            vec![
                None,
                Some(Object::Dictionary(dictionary! { "Font" => Dictionary::new() })),
                Some(xobject_resources(vec![("Im1", img)])),
            ],
        );

        let inventory = ImageInventory::collect(&doc);
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.images()[0].id, ImageId::from(img));
    }

    #[test]
    fn test_recurses_into_forms() {
        let mut doc = Document::with_version("1.5");
        let inner = image(&mut doc, 400);
        let outer = image(&mut doc, 500);
        let form = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
                "Resources" => xobject_resources(vec![("Inner", inner)]),
            },
            b"/Inner Do".to_vec(),
        ));
        document_with_pages(
            &mut doc,
            vec![Some(xobject_resources(vec![("Fm0", form), ("Im0", outer)]))],
        );

        let inventory = ImageInventory::collect(&doc);
        let widths: Vec<u32> = inventory.iter().map(|i| i.width).collect();
        assert_eq!(inventory.len(), 2);
        assert!(widths.contains(&400));
        assert!(widths.contains(&500));
    }

    #[test]
    fn test_self_referencing_form_terminates() {
        let mut doc = Document::with_version("1.5");
        let form_id = doc.new_object_id();
        let img = image(&mut doc, 300);
        doc.objects.insert(
            form_id,
            Object::Stream(Stream::new(
                dictionary! {
                    "Subtype" => "Form",
                    "Resources" => xobject_resources(vec![("Self", form_id), ("Im0", img)]),
                },
                Vec::new(),
            )),
        );
        document_with_pages(&mut doc, vec![Some(xobject_resources(vec![("Fm0", form_id)]))]);

        assert_eq!(ImageInventory::collect(&doc).len(), 1);
    }

    #[test]
    fn test_inherited_resources() {
        let mut doc = Document::with_version("1.5");
        let img = image(&mut doc, 300);
        let pages_id = doc.new_object_id();
        let page = doc.add_object(dictionary! { "Type" => "Page", "Parent" => pages_id });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page.into()],
                "Count" => 1,
                "Resources" => xobject_resources(vec![("Im0", img)]),
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);

        assert_eq!(ImageInventory::collect(&doc).len(), 1);
    }
}
