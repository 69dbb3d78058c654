//! Page-level PDF operations behind a narrow trait
//!
//! The watermarking pipeline only needs three things from a PDF library:
//! load a document's pages, stamp an overlay onto one page, and write a list
//! of pages back out. [`PageStore`] captures exactly that so the pipeline can
//! run against in-memory stand-ins in tests. [`LopdfStore`] is the real
//! implementation on top of lopdf.

use std::collections::HashMap;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::{Error, Result};
use super::overlay::WatermarkOverlay;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_ATTRIBUTES: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Guard against cyclic Parent links in broken files
const MAX_TREE_DEPTH: usize = 64;

/// Load, merge and write pages of a PDF
pub trait PageStore {
    type Page;

    /// Read every page of the document at `path`, in page order
    fn load_pages(&mut self, path: &Path) -> Result<Vec<Self::Page>>;

    /// Composite the overlay on top of the page's existing content
    fn merge_overlay(&mut self, page: Self::Page, overlay: &WatermarkOverlay) -> Result<Self::Page>;

    /// Write exactly `pages`, in the given order, to `path` (create or overwrite)
    fn write_pages(&mut self, path: &Path, pages: Vec<Self::Page>) -> Result<()>;
}

/// Overlay objects copied into the currently loaded document
#[derive(Debug)]
struct ImportedOverlay {
    signature: Vec<u8>,
    /// Overlay content stream references (renumbered)
    content: Vec<Object>,
    /// Overlay page resources (renumbered)
    resources: Dictionary,
    /// Shared "q" stream placed before the original page content
    save_id: ObjectId,
    /// Shared "Q" stream placed after the original page content
    restore_id: ObjectId,
}

/// [`PageStore`] backed by a lopdf [`Document`]
///
/// Pages are object ids into the document loaded by the last `load_pages`.
#[derive(Debug, Default)]
pub struct LopdfStore {
    doc: Option<Document>,
    stamp: Option<ImportedOverlay>,
}

impl LopdfStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageStore for LopdfStore {
    type Page = ObjectId;

    fn load_pages(&mut self, path: &Path) -> Result<Vec<ObjectId>> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let doc = Document::load(path).map_err(|source| Error::PdfRead {
            path: path.to_path_buf(),
            source,
        })?;

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        debug!(path = %path.display(), pages = pages.len(), "loaded PDF");

        self.doc = Some(doc);
        self.stamp = None;
        Ok(pages)
    }

    fn merge_overlay(&mut self, page: ObjectId, overlay: &WatermarkOverlay) -> Result<ObjectId> {
        let Self { doc, stamp } = self;
        let doc = doc
            .as_mut()
            .ok_or_else(|| Error::General("No PDF loaded".to_string()))?;

        // Import the overlay once per loaded document
        if stamp.as_ref().map_or(true, |s| s.signature != overlay.signature()) {
            *stamp = Some(import_overlay(doc, overlay)?);
        }
        let stamp = stamp
            .as_ref()
            .ok_or_else(|| Error::General("Overlay not imported".to_string()))?;

        // 1. Contents: isolate the original content in q/Q, then draw the overlay
        let existing = content_references(doc, page)?;
        let mut contents = Vec::with_capacity(existing.len() + stamp.content.len() + 2);
        if !existing.is_empty() {
            contents.push(Object::Reference(stamp.save_id));
            contents.extend(existing);
            contents.push(Object::Reference(stamp.restore_id));
        }
        contents.extend(stamp.content.iter().cloned());

        // 2. Resources: page's own (or inherited) plus the overlay's
        let mut resources = match inherited_attribute(doc, page, "Resources")? {
            Some(obj) => resolve_dictionary(doc, &obj)?,
            None => Dictionary::new(),
        };
        merge_resources(doc, &mut resources, &stamp.resources)?;

        let page_dict = doc.get_dictionary_mut(page)?;
        page_dict.set("Contents", Object::Array(contents));
        page_dict.set("Resources", Object::Dictionary(resources));

        Ok(page)
    }

    fn write_pages(&mut self, path: &Path, pages: Vec<ObjectId>) -> Result<()> {
        let mut doc = self
            .doc
            .take()
            .ok_or_else(|| Error::General("No PDF loaded".to_string()))?;
        self.stamp = None;

        // Pages get a new parent, so pin down what they used to inherit
        for &page_id in &pages {
            for key in INHERITABLE_ATTRIBUTES {
                if doc.get_dictionary(page_id)?.has(key.as_bytes()) {
                    continue;
                }
                if let Some(value) = inherited_attribute(&doc, page_id, key)? {
                    doc.get_dictionary_mut(page_id)?.set(key, value);
                }
            }
        }

        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = pages.iter().map(|&id| Object::Reference(id)).collect();

        let mut pages_object = Dictionary::new();
        pages_object.set("Type", Object::Name(b"Pages".to_vec()));
        pages_object.set("Count", Object::Integer(pages.len() as i64));
        pages_object.set("Kids", Object::Array(kids));
        doc.objects.insert(pages_id, Object::Dictionary(pages_object));

        for &page_id in &pages {
            doc.get_dictionary_mut(page_id)?
                .set("Parent", Object::Reference(pages_id));
        }

        let catalog_id = doc.trailer.get(b"Root").and_then(Object::as_reference)?;
        doc.get_dictionary_mut(catalog_id)?
            .set("Pages", Object::Reference(pages_id));

        let pruned = doc.prune_objects();
        debug!(pruned = pruned.len(), "removed unreachable objects");

        doc.compress();
        doc.save(path)?;

        Ok(())
    }
}

/// Copy every overlay object into `doc` with fresh ids
fn import_overlay(doc: &mut Document, overlay: &WatermarkOverlay) -> Result<ImportedOverlay> {
    let source = overlay.document();
    let id_offset = doc.max_id;

    let id_map: HashMap<ObjectId, ObjectId> = source
        .objects
        .keys()
        .map(|&(num, gen)| ((num, gen), (num + id_offset, gen)))
        .collect();

    for (old_id, object) in source.objects.iter() {
        doc.objects
            .insert(id_map[old_id], renumber_object_references(object, &id_map));
    }
    doc.max_id = source.max_id + id_offset;

    let page = source.get_dictionary(overlay.page_id())?;
    let content = match renumber_object_references(page.get(b"Contents")?, &id_map) {
        Object::Array(items) => items,
        other => vec![other],
    };
    let resources = match page.get(b"Resources") {
        Ok(res) => match renumber_object_references(res, &id_map) {
            Object::Dictionary(dict) => dict,
            _ => Dictionary::new(),
        },
        Err(_) => Dictionary::new(),
    };

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    Ok(ImportedOverlay {
        signature: overlay.signature().to_vec(),
        content,
        resources,
        save_id,
        restore_id,
    })
}

/// Renumber all object references in an object
fn renumber_object_references(object: &Object, id_map: &HashMap<ObjectId, ObjectId>) -> Object {
    match object {
        Object::Reference(old_id) => Object::Reference(*id_map.get(old_id).unwrap_or(old_id)),
        Object::Array(arr) => {
            Object::Array(arr.iter().map(|obj| renumber_object_references(obj, id_map)).collect())
        }
        Object::Dictionary(dict) => Object::Dictionary(renumber_dictionary(dict, id_map)),
        Object::Stream(stream) => {
            let mut stream = stream.clone();
            stream.dict = renumber_dictionary(&stream.dict, id_map);
            Object::Stream(stream)
        }
        _ => object.clone(),
    }
}

fn renumber_dictionary(dict: &Dictionary, id_map: &HashMap<ObjectId, ObjectId>) -> Dictionary {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        new_dict.set(key.clone(), renumber_object_references(value, id_map));
    }
    new_dict
}

/// Content stream references of a page, whatever form `Contents` takes
fn content_references(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_dictionary(page_id)?;
    let contents = match page.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(Vec::new()),
    };

    Ok(match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            // Indirect array of streams
            Object::Array(items) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Object::Array(items) => items.clone(),
        _ => Vec::new(),
    })
}

/// Value of `key` on the page or its nearest ancestor in the page tree
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &str) -> Result<Option<Object>> {
    let mut node_id = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(node_id)?;
        if let Ok(value) = node.get(key.as_bytes()) {
            return Ok(Some(value.clone()));
        }
        match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => node_id = parent,
            Err(_) => return Ok(None),
        }
    }
    Ok(None)
}

/// Dictionary value, following one level of indirection
fn resolve_dictionary(doc: &Document, object: &Object) -> Result<Dictionary> {
    match object {
        Object::Dictionary(dict) => Ok(dict.clone()),
        Object::Reference(id) => Ok(doc.get_dictionary(*id)?.clone()),
        _ => Ok(Dictionary::new()),
    }
}

/// Merge overlay resources into the page's resources dictionary
///
/// Per category (Font, ExtGState, ...) entries are added next to the page's
/// own; overlay names are prefixed so they do not replace page resources.
fn merge_resources(doc: &Document, page_resources: &mut Dictionary, overlay_resources: &Dictionary) -> Result<()> {
    for (category, overlay_entries) in overlay_resources.iter() {
        let Object::Dictionary(overlay_entries) = overlay_entries else {
            continue;
        };

        let mut merged = match page_resources.get(category) {
            Ok(existing) => resolve_dictionary(doc, existing)?,
            Err(_) => Dictionary::new(),
        };
        for (name, value) in overlay_entries.iter() {
            merged.set(name.clone(), value.clone());
        }
        page_resources.set(category.clone(), Object::Dictionary(merged));
    }
    Ok(())
}
