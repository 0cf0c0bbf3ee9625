// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document assembler and partitioner — merge whole documents and split one
// document by range or into near-equal chunks, by copying page objects into
// fresh page trees.

use std::collections::HashMap;

use lightpdf_core::error::{EngineError, Result};
use lightpdf_core::params::SplitMode;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, info, instrument, warn};

use super::handle::{PdfHandle, inherited};
use crate::range;

/// Page attributes that may live on an ancestor `/Pages` node.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Source object id -> target object id, scoped to one copied document.
type CopyMemo = HashMap<ObjectId, ObjectId>;

/// Builds a new document by appending pages copied from other documents.
pub struct PageAssembler {
    target: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PageAssembler {
    pub fn new(version: &str) -> Self {
        let mut target = Document::with_version(version);
        let pages_id = target.new_object_id();
        Self {
            target,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append every page of `source`, in order.
    pub fn append_document(&mut self, source: &Document) -> Result<()> {
        let mut memo = CopyMemo::new();
        for page_id in source.get_pages().into_values() {
            self.append_page(source, page_id, &mut memo)?;
        }
        Ok(())
    }

    /// Copy one page and everything it references into the target. Objects
    /// already copied under the same `memo` are shared, not duplicated.
    pub fn append_page(
        &mut self,
        source: &Document,
        page_id: ObjectId,
        memo: &mut CopyMemo,
    ) -> Result<()> {
        let mut page = source
            .get_dictionary(page_id)
            .map_err(|err| {
                EngineError::processing(format!("cannot read page object {page_id:?}: {err}"))
            })?
            .clone();

        for key in INHERITABLE {
            if !page.has(key) {
                if let Some(value) = inherited(source, page_id, key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }

        // Reserved before recursing so back-references (annotation /P) resolve.
        let new_id = *memo
            .entry(page_id)
            .or_insert_with(|| self.target.new_object_id());
        let mut cloned = self.copy_dict(source, &page, memo);
        cloned.set("Parent", Object::Reference(self.pages_id));
        self.target.set_object(new_id, Object::Dictionary(cloned));
        self.kids.push(Object::Reference(new_id));
        Ok(())
    }

    /// Close the page tree and hand back the finished document.
    pub fn finish(mut self) -> Document {
        let count = self.kids.len() as i64;
        self.target.set_object(
            self.pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            },
        );
        let catalog_id = self.target.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.target.trailer.set("Root", catalog_id);
        self.target
    }

    fn copy_object(&mut self, source: &Document, object: &Object, memo: &mut CopyMemo) -> Object {
        match object {
            Object::Reference(id) => self.copy_reference(source, *id, memo),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dict(source, dict, memo)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(source, item, memo))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let dict = self.copy_dict(source, &stream.dict, memo);
                Object::Stream(
                    Stream::new(dict, stream.content.clone())
                        .with_compression(stream.allows_compression),
                )
            }
            other => other.clone(),
        }
    }

    fn copy_reference(&mut self, source: &Document, id: ObjectId, memo: &mut CopyMemo) -> Object {
        if let Some(mapped) = memo.get(&id) {
            return Object::Reference(*mapped);
        }
        let referenced = match source.get_object(id) {
            Ok(object) => object,
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using Null");
                return Object::Null;
            }
        };
        // Links to pages outside the copy would drag their whole tree along.
        if is_page_node(referenced) {
            return Object::Null;
        }

        let new_id = self.target.new_object_id();
        memo.insert(id, new_id);
        let cloned = self.copy_object(source, referenced, memo);
        self.target.set_object(new_id, cloned);
        Object::Reference(new_id)
    }

    /// `/Parent` links are dropped; the caller re-parents pages itself.
    fn copy_dict(&mut self, source: &Document, dict: &Dictionary, memo: &mut CopyMemo) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            if key == b"Parent" {
                continue;
            }
            let value = self.copy_object(source, value, memo);
            copy.set(key.clone(), value);
        }
        copy
    }
}

fn is_page_node(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        _ => return false,
    };
    matches!(
        dict.get(b"Type").and_then(Object::as_name),
        Ok(b"Page") | Ok(b"Pages")
    )
}

/// Highest header version among the inputs.
fn newest_version<'a>(documents: impl Iterator<Item = &'a Document>) -> String {
    documents
        .map(|doc| doc.version.clone())
        .max()
        .unwrap_or_else(|| "1.7".to_string())
}

// -- Merge --------------------------------------------------------------------

/// Concatenate whole documents, in input order or in the order given by
/// `order` (indices into `documents`; repetition allowed).
#[instrument(skip_all, fields(documents = documents.len(), ordered = order.is_some()))]
pub fn merge(documents: &[PdfHandle], order: Option<&[usize]>) -> Result<Document> {
    let sequence: Vec<usize> = match order {
        Some(order) => {
            if order.len() != documents.len() {
                return Err(EngineError::validation(format!(
                    "merge order has {} entries but {} documents were supplied",
                    order.len(),
                    documents.len()
                )));
            }
            if let Some(bad) = order.iter().find(|i| **i >= documents.len()) {
                return Err(EngineError::validation(format!(
                    "merge order index {bad} is out of range for {} documents",
                    documents.len()
                )));
            }
            order.to_vec()
        }
        None => (0..documents.len()).collect(),
    };

    info!(?sequence, "Merging PDFs");

    let version = newest_version(documents.iter().map(PdfHandle::document));
    let mut assembler = PageAssembler::new(&version);
    for index in sequence {
        assembler.append_document(documents[index].document())?;
    }

    debug!(pages = assembler.page_count(), "Merge complete");
    Ok(assembler.finish())
}

// -- Split --------------------------------------------------------------------

/// Split one document. Range mode yields a single document holding the
/// selected pages; chunk mode yields `n` documents of near-equal size.
#[instrument(skip_all, fields(pages = source.page_count()))]
pub fn split(source: &PdfHandle, mode: SplitMode<'_>) -> Result<Vec<Document>> {
    let page_ids = source.page_ids();
    let total = page_ids.len();

    let groups: Vec<Vec<usize>> = match mode {
        SplitMode::Pages(expr) => vec![range::resolve(Some(expr), total)?],
        SplitMode::Chunks(chunks) => {
            if chunks == 0 {
                return Err(EngineError::validation("chunks must be at least 1"));
            }
            let mut start = 0;
            range::chunk_sizes(total, chunks)
                .into_iter()
                .map(|size| {
                    let group = (start..start + size).collect();
                    start += size;
                    group
                })
                .collect()
        }
    };

    info!(total, groups = groups.len(), "Splitting PDF");

    let document = source.document();
    groups
        .iter()
        .map(|group| {
            let mut assembler = PageAssembler::new(&document.version);
            let mut memo = CopyMemo::new();
            for index in group {
                assembler.append_page(document, page_ids[*index], &mut memo)?;
            }
            debug!(pages = assembler.page_count(), "Split part assembled");
            Ok(assembler.finish())
        })
        .collect()
}
