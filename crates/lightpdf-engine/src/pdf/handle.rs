// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document handle — the single seam between the engine and `lopdf`. Every
// operation opens one handle from its input bytes, works on it, and saves it.

use std::collections::HashSet;

use lightpdf_core::error::{EngineError, Result};
use lightpdf_core::types::PageDimensions;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument, warn};

/// Every accepted input starts with these bytes.
pub const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Fallback page box when neither the page nor its ancestors carry one.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Guards against reference cycles in malformed page trees.
const MAX_TREE_DEPTH: usize = 64;

/// Reject buffers that are not PDFs before any parsing happens.
pub fn check_signature(bytes: &[u8]) -> Result<()> {
    if bytes.starts_with(PDF_SIGNATURE) {
        Ok(())
    } else {
        Err(EngineError::format("input does not begin with the %PDF signature"))
    }
}

/// Geometry and identity of one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
    /// 0-based position in the document.
    pub index: usize,
    pub id: ObjectId,
    /// Lower-left corner of the media box.
    pub origin: (f32, f32),
    pub width: f32,
    pub height: f32,
    /// Effective `/Rotate`, normalised to 0, 90, 180 or 270.
    pub rotation: i64,
}

impl PageInfo {
    pub fn dimensions(&self) -> PageDimensions {
        PageDimensions {
            width: self.width,
            height: self.height,
        }
    }
}

/// An image XObject reachable from a page's resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub id: ObjectId,
    /// Resource name the page draws it with.
    pub name: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Capabilities the engine needs from a document model.
pub trait DocumentModel: Sized {
    /// Parse a document from bytes.
    fn open(bytes: &[u8]) -> Result<Self>;

    /// Pages in document order.
    fn pages(&self) -> Vec<PageInfo>;

    /// Raster images drawn by a page, in resource order, without duplicates.
    fn images(&self, page: &PageInfo) -> Vec<ImageRef>;

    /// Serialise the (possibly mutated) document.
    fn save(self) -> Result<Vec<u8>>;
}

/// `lopdf`-backed document handle.
///
/// Owned by exactly one operation call; never shared across threads.
pub struct PdfHandle {
    document: Document,
    /// Size of the buffer the handle was opened from.
    source_len: usize,
    /// Whether the trailer links an `/Encrypt` dictionary.
    encrypted: bool,
}

impl PdfHandle {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Page ids in document order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.document.get_pages().into_values().collect()
    }
}

impl DocumentModel for PdfHandle {
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    fn open(bytes: &[u8]) -> Result<Self> {
        check_signature(bytes)?;
        let document = Document::load_mem(bytes).map_err(|err| {
            EngineError::processing(format!("failed to load PDF from memory: {err}"))
        })?;
        let encrypted = document.is_encrypted();
        debug!(pages = document.get_pages().len(), encrypted, "PDF loaded from bytes");
        Ok(Self {
            document,
            source_len: bytes.len(),
            encrypted,
        })
    }

    fn pages(&self) -> Vec<PageInfo> {
        self.document
            .get_pages()
            .into_values()
            .enumerate()
            .map(|(index, id)| page_info(&self.document, index, id))
            .collect()
    }

    fn images(&self, page: &PageInfo) -> Vec<ImageRef> {
        images_on_page(&self.document, page.id)
    }

    fn save(mut self) -> Result<Vec<u8>> {
        save_document(&mut self.document)
    }
}

/// Serialise a document into a fresh buffer.
pub fn save_document(document: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|err| EngineError::processing(format!("failed to serialise PDF: {err}")))?;
    Ok(output)
}

// -- Page geometry ------------------------------------------------------------

/// Compute the geometry of a page, honouring inherited attributes.
pub fn page_info(document: &Document, index: usize, id: ObjectId) -> PageInfo {
    let [x0, y0, x1, y1] = inherited(document, id, b"MediaBox")
        .and_then(|obj| resolve(document, obj).as_array().ok())
        .and_then(|arr| parse_box(document, arr))
        .unwrap_or(DEFAULT_MEDIA_BOX);
    let rotation = inherited(document, id, b"Rotate")
        .and_then(|obj| resolve(document, obj).as_i64().ok())
        .unwrap_or(0)
        .rem_euclid(360);

    PageInfo {
        index,
        id,
        origin: (x0.min(x1), y0.min(y1)),
        width: (x1 - x0).abs(),
        height: (y1 - y0).abs(),
        rotation,
    }
}

fn parse_box(document: &Document, arr: &[Object]) -> Option<[f32; 4]> {
    if arr.len() < 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, obj) in out.iter_mut().zip(arr) {
        *slot = number(resolve(document, obj))?;
    }
    Some(out)
}

/// Look up a page attribute, walking `/Parent` links for inheritable keys.
pub fn inherited<'a>(document: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let dict = document.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Follow references until a direct object is reached.
pub fn resolve<'a>(document: &'a Document, mut object: &'a Object) -> &'a Object {
    for _ in 0..MAX_TREE_DEPTH {
        match object {
            Object::Reference(id) => match document.get_object(*id) {
                Ok(next) => object = next,
                Err(err) => {
                    warn!(?id, %err, "Cannot resolve reference");
                    return &Object::Null;
                }
            },
            _ => return object,
        }
    }
    object
}

/// Resolve an object that should be a dictionary into an owned copy.
pub fn resolve_dict(document: &Document, object: &Object) -> Dictionary {
    match resolve(document, object) {
        Object::Dictionary(dict) => dict.clone(),
        Object::Stream(stream) => stream.dict.clone(),
        _ => Dictionary::new(),
    }
}

/// The page's effective resource dictionary, with inherited resources and
/// referenced sub-dictionaries resolved into an owned copy.
pub fn page_resources(document: &Document, page_id: ObjectId) -> Dictionary {
    let mut resources = inherited(document, page_id, b"Resources")
        .map(|obj| resolve_dict(document, obj))
        .unwrap_or_default();
    for key in [&b"Font"[..], b"XObject", b"ExtGState"] {
        if let Ok(value) = resources.get(key) {
            let resolved = resolve_dict(document, value);
            resources.set(key.to_vec(), Object::Dictionary(resolved));
        }
    }
    resources
}

/// Numeric value of an integer or real object.
pub fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

// -- Images -------------------------------------------------------------------

/// Image XObjects drawn by a page, including those nested in form XObjects.
pub fn images_on_page(document: &Document, page_id: ObjectId) -> Vec<ImageRef> {
    let resources = page_resources(document, page_id);
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    collect_images(document, &resources, &mut found, &mut seen, 0);
    found
}

fn collect_images(
    document: &Document,
    resources: &Dictionary,
    found: &mut Vec<ImageRef>,
    seen: &mut HashSet<ObjectId>,
    depth: usize,
) {
    if depth > MAX_TREE_DEPTH {
        return;
    }
    let Ok(xobjects) = resources.get(b"XObject") else {
        return;
    };
    let xobjects = resolve_dict(document, xobjects);

    for (name, value) in xobjects.iter() {
        let Object::Reference(id) = value else {
            continue;
        };
        if !seen.insert(*id) {
            continue;
        }
        let Ok(Object::Stream(stream)) = document.get_object(*id) else {
            continue;
        };
        let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name).ok();
        match subtype {
            Some(b"Image") => {
                let width = dimension(document, &stream.dict, b"Width");
                let height = dimension(document, &stream.dict, b"Height");
                found.push(ImageRef {
                    id: *id,
                    name: name.clone(),
                    width,
                    height,
                });
            }
            Some(b"Form") => {
                if let Ok(form_resources) = stream.dict.get(b"Resources") {
                    let nested = resolve_dict(document, form_resources);
                    collect_images(document, &nested, found, seen, depth + 1);
                }
            }
            _ => {}
        }
    }
}

fn dimension(document: &Document, dict: &Dictionary, key: &[u8]) -> u32 {
    dict.get(key)
        .ok()
        .and_then(|obj| resolve(document, obj).as_i64().ok())
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(0)
}
