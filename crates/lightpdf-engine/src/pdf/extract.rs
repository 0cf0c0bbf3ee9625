// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content extraction — page text and embedded raster images.

use lightpdf_core::error::{EngineError, Result};
use lightpdf_core::params::{ExtractedText, ImageAsset, ImageExtractionSpec, PageText};
use lightpdf_core::types::TextFormat;
use lopdf::Object;
use tracing::{debug, info, instrument, warn};

use super::handle::{DocumentModel, PdfHandle};
use super::xobject;
use crate::image::ImageProcessor;
use crate::range;

/// JPEG quality used when extracted images are re-encoded as JPEG.
pub const EXTRACT_JPEG_QUALITY: u8 = 90;

/// Pull the text of the selected pages and join it for `format`.
///
/// A page whose content cannot be interpreted contributes empty text rather
/// than failing the whole call.
#[instrument(skip_all, fields(format = ?format, pages = pages.unwrap_or("all")))]
pub fn extract_text(
    handle: &PdfHandle,
    pages: Option<&str>,
    format: TextFormat,
) -> Result<ExtractedText> {
    let selected = range::resolve(pages, handle.page_count())?;
    let document = handle.document();

    let entries: Vec<PageText> = selected
        .iter()
        .map(|&index| {
            let page = index + 1;
            let text = match u32::try_from(page) {
                Ok(number) => document.extract_text(&[number]).unwrap_or_else(|err| {
                    warn!(page, %err, "Text extraction failed for page");
                    String::new()
                }),
                Err(_) => String::new(),
            };
            let words = text.split_whitespace().count();
            PageText { page, text, words }
        })
        .collect();

    let word_count = entries.iter().map(|entry| entry.words).sum();
    let text = flatten(&entries, format);
    info!(pages = entries.len(), word_count, "Text extracted");

    Ok(ExtractedText {
        format,
        page_count: entries.len(),
        pages: entries,
        text,
        word_count,
    })
}

/// Join per-page entries into the flattened form. JSON keeps only the list.
pub fn flatten(entries: &[PageText], format: TextFormat) -> Option<String> {
    let block = |entry: &PageText| match format {
        TextFormat::Markdown => format!("## Page {}\n\n{}", entry.page, entry.text),
        _ => format!("Page {}:\n{}", entry.page, entry.text),
    };
    match format {
        TextFormat::Json => None,
        TextFormat::Text | TextFormat::Markdown => {
            Some(entries.iter().map(block).collect::<Vec<_>>().join("\n\n"))
        }
    }
}

/// Re-encode every embedded image on the selected pages that meets both
/// minimum dimensions. `image_index` counts all images on the page, kept or
/// not, so indices stay stable when the minimums change.
#[instrument(skip_all, fields(pages = spec.pages.as_deref().unwrap_or("all"), format = ?spec.format))]
pub fn extract_images(handle: &PdfHandle, spec: &ImageExtractionSpec) -> Result<Vec<ImageAsset>> {
    let pages = handle.pages();
    let selected = range::resolve(spec.pages.as_deref(), pages.len())?;
    let document = handle.document();

    let mut assets = Vec::new();
    for index in selected {
        let page = &pages[index];
        for (image_index, image) in handle.images(page).into_iter().enumerate() {
            // Filter on the declared size so small images are never decoded.
            if image.width < spec.min_width || image.height < spec.min_height {
                debug!(
                    page = page.index + 1,
                    image_index,
                    width = image.width,
                    height = image.height,
                    "Image below minimum size"
                );
                continue;
            }
            let Ok(Object::Stream(stream)) = document.get_object(image.id) else {
                continue;
            };
            let decoded = xobject::decode_image(document, stream).map_err(|err| {
                EngineError::format(format!(
                    "page {} image {image_index}: {err}",
                    page.index + 1
                ))
            })?;
            let processor = ImageProcessor::from_dynamic(decoded);
            let data = processor.encode(spec.format, EXTRACT_JPEG_QUALITY)?;
            assets.push(ImageAsset {
                data,
                width: processor.width(),
                height: processor.height(),
                page_index: page.index,
                image_index,
                format: spec.format,
            });
        }
    }
    info!(images = assets.len(), "Images extracted");
    Ok(assets)
}
