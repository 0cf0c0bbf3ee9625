// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metadata reader — the document information dictionary plus structural facts.

use lightpdf_core::params::DocumentMetadata;
use lopdf::{Dictionary, Document, Object};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use super::handle::{DocumentModel, PdfHandle, resolve};

/// Read metadata without touching the document. `source` is the buffer the
/// handle was opened from; it supplies the byte size and fingerprint.
#[instrument(skip_all, fields(bytes_len = source.len()))]
pub fn read(handle: &PdfHandle, source: &[u8]) -> DocumentMetadata {
    let document = handle.document();
    let info = info_dictionary(document).unwrap_or_default();
    let field = |key: &[u8]| {
        info.get(key)
            .ok()
            .map(|obj| resolve(document, obj))
            .and_then(|obj| obj.as_str().ok())
            .map(decode_text_string)
            .unwrap_or_default()
    };

    let pages = handle.pages();
    let metadata = DocumentMetadata {
        title: field(b"Title"),
        author: field(b"Author"),
        subject: field(b"Subject"),
        creator: field(b"Creator"),
        producer: field(b"Producer"),
        creation_date: field(b"CreationDate"),
        modification_date: field(b"ModDate"),
        page_count: pages.len(),
        byte_size: source.len(),
        encrypted: handle.is_encrypted(),
        first_page_size: pages.first().map(|page| page.dimensions()),
        sha256: hex::encode(Sha256::digest(source)),
    };
    debug!(pages = metadata.page_count, title = %metadata.title, "Metadata read");
    metadata
}

fn info_dictionary(document: &Document) -> Option<Dictionary> {
    match resolve(document, document.trailer.get(b"Info").ok()?) {
        Object::Dictionary(dict) => Some(dict.clone()),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE when it carries a byte-order mark,
/// otherwise single-byte text read as Latin-1.
pub fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => bytes.iter().map(|b| char::from(*b)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn reads_info_dictionary() {
        let bytes = fixtures::pdf_with_info("Quarterly Report", "Ada");
        let handle = PdfHandle::open(&bytes).unwrap();
        let meta = read(&handle, &bytes);
        assert_eq!(meta.title, "Quarterly Report");
        assert_eq!(meta.author, "Ada");
        assert_eq!(meta.subject, "");
        assert_eq!(meta.page_count, 1);
        assert_eq!(meta.byte_size, bytes.len());
        assert!(!meta.encrypted);
        let size = meta.first_page_size.unwrap();
        assert_eq!((size.width, size.height), (612.0, 792.0));
        assert_eq!(meta.sha256.len(), 64);
    }

    #[test]
    fn missing_info_reads_as_empty() {
        let bytes = fixtures::pdf_with_pages(2);
        let handle = PdfHandle::open(&bytes).unwrap();
        let meta = read(&handle, &bytes);
        assert_eq!(meta.title, "");
        assert_eq!(meta.producer, "");
        assert_eq!(meta.page_count, 2);
    }

    #[test]
    fn text_strings_decode() {
        assert_eq!(decode_text_string(b"plain"), "plain");
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0xE9]), "Hé");
        assert_eq!(decode_text_string(&[0x43, 0x61, 0x66, 0xE9]), "Café");
    }
}
