// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark compositor — overlays translucent text or an image on selected
// pages by appending a content stream to each page.

use lightpdf_core::error::{EngineError, Result};
use lightpdf_core::params::{WatermarkContent, WatermarkSpec};
use lightpdf_core::types::WatermarkPosition;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::{debug, info, instrument};

use super::handle::{DocumentModel, PageInfo, PdfHandle, page_resources, resolve};
use super::xobject;
use crate::image::ImageProcessor;
use crate::range;

/// Distance of corner placements from the page edges, in points.
const EDGE_OFFSET: f32 = 50.0;
/// Average glyph advance as a fraction of the font size.
const CHAR_WIDTH_FACTOR: f32 = 0.5;
/// Fill gray level of text watermarks.
const TEXT_GRAY: f32 = 0.5;
/// Share of the page an image watermark may cover.
const IMAGE_SCALE: f32 = 0.3;

/// Where and how large a text watermark is drawn, in page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    /// Counter-clockwise, degrees.
    pub angle: f32,
}

/// Lay out `char_count` characters of text on a `width` x `height` page.
///
/// The width estimate is a fixed heuristic, not glyph metrics. Coordinates
/// have their origin at the bottom-left of the page.
pub fn text_placement(
    width: f32,
    height: f32,
    char_count: usize,
    position: WatermarkPosition,
) -> TextPlacement {
    let font_size = width.min(height) / 10.0;
    let text_width = char_count as f32 * font_size * CHAR_WIDTH_FACTOR;
    let (x, y, angle) = match position {
        WatermarkPosition::Center => ((width - text_width) / 2.0, height / 2.0, 45.0),
        WatermarkPosition::TopLeft => (EDGE_OFFSET, height - EDGE_OFFSET, 0.0),
        WatermarkPosition::TopRight => (width - text_width - EDGE_OFFSET, height - EDGE_OFFSET, 0.0),
        WatermarkPosition::BottomLeft => (EDGE_OFFSET, EDGE_OFFSET, 0.0),
        WatermarkPosition::BottomRight => (width - text_width - EDGE_OFFSET, EDGE_OFFSET, 0.0),
    };
    TextPlacement {
        x,
        y,
        font_size,
        angle,
    }
}

/// Lower-left corner and size of an image watermark, in page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scale an `image_width` x `image_height` image to a fixed share of the page.
/// Only `center` is honoured; every other position sits at the top-left.
pub fn image_placement(
    width: f32,
    height: f32,
    image_width: f32,
    image_height: f32,
    position: WatermarkPosition,
) -> ImagePlacement {
    let scale = IMAGE_SCALE * (width / image_width).min(height / image_height);
    let drawn_w = image_width * scale;
    let drawn_h = image_height * scale;
    let (x, y) = match position {
        WatermarkPosition::Center => ((width - drawn_w) / 2.0, (height - drawn_h) / 2.0),
        _ => (EDGE_OFFSET, height - EDGE_OFFSET - drawn_h),
    };
    ImagePlacement {
        x,
        y,
        width: drawn_w,
        height: drawn_h,
    }
}

/// Shared objects every watermarked page points at.
struct Overlay<'a> {
    content: WatermarkContent<'a>,
    graphics_state: ObjectId,
    font: Option<ObjectId>,
    image: Option<(ObjectId, u32, u32)>,
}

/// Stamp the watermark described by `spec` onto the selected pages.
#[instrument(skip_all, fields(position = ?spec.position, opacity = spec.opacity))]
pub fn apply(handle: &mut PdfHandle, spec: &WatermarkSpec) -> Result<()> {
    let content = spec.content()?;
    let infos = handle.pages();
    let selected = range::resolve(spec.pages.as_deref(), infos.len())?;
    info!(
        selected = selected.len(),
        mode = if matches!(content, WatermarkContent::Text(_)) { "text" } else { "image" },
        "Applying watermark"
    );

    let document = handle.document_mut();
    let overlay = prepare_overlay(document, content, spec.opacity)?;

    for index in selected {
        stamp_page(document, &infos[index], &overlay, spec.position)?;
    }
    Ok(())
}

fn prepare_overlay<'a>(
    document: &mut Document,
    content: WatermarkContent<'a>,
    opacity: f32,
) -> Result<Overlay<'a>> {
    let graphics_state = document.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => opacity,
        "CA" => opacity,
    });

    let mut overlay = Overlay {
        content,
        graphics_state,
        font: None,
        image: None,
    };

    match content {
        WatermarkContent::Text(_) => {
            overlay.font = Some(document.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            }));
        }
        WatermarkContent::Image(bytes) => {
            let rgba = ImageProcessor::from_bytes(bytes)?.into_dynamic().to_rgba8();
            let (width, height) = rgba.dimensions();
            let encoded = xobject::raw_xobject(&rgba, true);
            let mut stream = encoded.stream;
            if let Some(mask) = encoded.mask {
                let mask_id = document.add_object(mask);
                stream.dict.set("SMask", Object::Reference(mask_id));
            }
            overlay.image = Some((document.add_object(stream), width, height));
        }
    }
    Ok(overlay)
}

fn stamp_page(
    document: &mut Document,
    page: &PageInfo,
    overlay: &Overlay<'_>,
    position: WatermarkPosition,
) -> Result<()> {
    let mut resources = page_resources(document, page.id);
    let gs_name = register(&mut resources, b"ExtGState", b"LpWmGs", overlay.graphics_state);
    let (origin_x, origin_y) = page.origin;

    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(gs_name)]),
    ];
    match overlay.content {
        WatermarkContent::Text(text) => {
            let Some(font) = overlay.font else {
                return Err(EngineError::processing("text watermark without a font"));
            };
            let font_name = register(&mut resources, b"Font", b"LpWmFont", font);
            let encoded = win_ansi(text);
            let place = text_placement(page.width, page.height, text.chars().count(), position);
            let (sin, cos) = place.angle.to_radians().sin_cos();
            operations.extend([
                Operation::new("g", vec![TEXT_GRAY.into()]),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(font_name), place.font_size.into()]),
                Operation::new(
                    "Tm",
                    vec![
                        cos.into(),
                        sin.into(),
                        (-sin).into(),
                        cos.into(),
                        (origin_x + place.x).into(),
                        (origin_y + place.y).into(),
                    ],
                ),
                Operation::new("Tj", vec![Object::String(encoded, StringFormat::Literal)]),
                Operation::new("ET", vec![]),
            ]);
        }
        WatermarkContent::Image(_) => {
            let Some((image, image_w, image_h)) = overlay.image else {
                return Err(EngineError::processing("image watermark without an image"));
            };
            let image_name = register(&mut resources, b"XObject", b"LpWmImg", image);
            let place = image_placement(
                page.width,
                page.height,
                image_w as f32,
                image_h as f32,
                position,
            );
            operations.extend([
                Operation::new(
                    "cm",
                    vec![
                        place.width.into(),
                        Object::Integer(0),
                        Object::Integer(0),
                        place.height.into(),
                        (origin_x + place.x).into(),
                        (origin_y + place.y).into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(image_name)]),
            ]);
        }
    }
    operations.push(Operation::new("Q", vec![]));

    let stamp = Content { operations }
        .encode()
        .map_err(|err| EngineError::processing(format!("failed to encode watermark: {err}")))?;
    let stamp_id = document.add_object(Stream::new(Dictionary::new(), stamp));

    // The original content is fenced in q/Q so its state cannot leak into the stamp.
    let open_id = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let close_id = document.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    let existing = existing_contents(document, page.id);
    let page_dict = document.get_dictionary_mut(page.id).map_err(|err| {
        EngineError::processing(format!("cannot update page {}: {err}", page.index + 1))
    })?;
    let mut contents = Vec::with_capacity(existing.len() + 3);
    if !existing.is_empty() {
        contents.push(Object::Reference(open_id));
        contents.extend(existing);
        contents.push(Object::Reference(close_id));
    }
    contents.push(Object::Reference(stamp_id));

    page_dict.set("Contents", Object::Array(contents));
    page_dict.set("Resources", Object::Dictionary(resources));
    debug!(page = page.index + 1, "Watermark stamped");
    Ok(())
}

/// The page's content streams as a flat list. `/Contents` may be a stream,
/// an array, or a reference to an array.
fn existing_contents(document: &Document, page_id: ObjectId) -> Vec<Object> {
    let Some(contents) = document
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Contents").ok())
    else {
        return Vec::new();
    };
    match resolve(document, contents) {
        Object::Array(items) => items.clone(),
        Object::Null => Vec::new(),
        _ => vec![contents.clone()],
    }
}

/// Add `id` under a fresh name in the `category` sub-dictionary and return
/// the name used.
fn register(resources: &mut Dictionary, category: &[u8], base: &[u8], id: ObjectId) -> Vec<u8> {
    let mut entries = match resources.get(category) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    let mut name = base.to_vec();
    let mut suffix = 1;
    while entries.has(&name) {
        name = [base, suffix.to_string().as_bytes()].concat();
        suffix += 1;
    }
    entries.set(name.clone(), Object::Reference(id));
    resources.set(category.to_vec(), Object::Dictionary(entries));
    name
}

/// Encode text for a WinAnsi simple font; unmappable characters become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            code @ 0x20..=0x7e | code @ 0xa0..=0xff => code as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn center_text_is_diagonal_at_midpoint() {
        let place = text_placement(600.0, 800.0, 5, WatermarkPosition::Center);
        assert_eq!(place.font_size, 60.0);
        // 5 chars * 60pt * 0.5 = 150pt wide
        assert_eq!(place.x, 225.0);
        assert_eq!(place.y, 400.0);
        assert_eq!(place.angle, 45.0);
    }

    #[test]
    fn corner_text_is_offset_from_edges() {
        let tl = text_placement(600.0, 800.0, 4, WatermarkPosition::TopLeft);
        assert_eq!((tl.x, tl.y, tl.angle), (50.0, 750.0, 0.0));

        let br = text_placement(600.0, 800.0, 4, WatermarkPosition::BottomRight);
        assert_eq!((br.x, br.y), (600.0 - 120.0 - 50.0, 50.0));

        let tr = text_placement(600.0, 800.0, 4, WatermarkPosition::TopRight);
        assert_eq!((tr.x, tr.y), (430.0, 750.0));

        let bl = text_placement(600.0, 800.0, 4, WatermarkPosition::BottomLeft);
        assert_eq!((bl.x, bl.y), (50.0, 50.0));
    }

    #[test]
    fn image_scaled_to_thirty_percent_of_fit() {
        let place = image_placement(600.0, 800.0, 300.0, 100.0, WatermarkPosition::Center);
        // fit factor min(2, 8) = 2, scaled by 0.3
        assert!((place.width - 180.0).abs() < 1e-3);
        assert!((place.height - 60.0).abs() < 1e-3);
        assert!((place.x - 210.0).abs() < 1e-3);
        assert!((place.y - 370.0).abs() < 1e-3);

        let corner = image_placement(600.0, 800.0, 300.0, 100.0, WatermarkPosition::BottomRight);
        assert_eq!(corner.x, 50.0);
        assert!((corner.y - (800.0 - 50.0 - 60.0)).abs() < 1e-3);
    }

    #[test]
    fn win_ansi_replaces_unmappable() {
        assert_eq!(win_ansi("Café ✓"), b"Caf\xe9 ?".to_vec());
    }

    #[test]
    fn register_avoids_name_clashes() {
        let mut resources = dictionary! {
            "Font" => dictionary! { "LpWmFont" => Object::Reference((9, 0)) },
        };
        let name = register(&mut resources, b"Font", b"LpWmFont", (10, 0));
        assert_eq!(name, b"LpWmFont1".to_vec());
    }

    #[test]
    fn text_watermark_appends_stream_and_keeps_pages() {
        let mut handle = PdfHandle::open(&fixtures::pdf_with_pages(3)).unwrap();
        let mut spec = WatermarkSpec::text("DRAFT");
        spec.pages = Some("1,3".into());
        apply(&mut handle, &spec).unwrap();

        let saved = PdfHandle::open(&handle.save().unwrap()).unwrap();
        assert_eq!(saved.page_count(), 3);
        let doc = saved.document();
        let pages = saved.page_ids();
        let stamped = doc.get_page_content(pages[0]).unwrap();
        assert!(String::from_utf8_lossy(&stamped).contains("DRAFT"));
        let untouched = doc.get_page_content(pages[1]).unwrap();
        assert!(!String::from_utf8_lossy(&untouched).contains("DRAFT"));
    }

    #[test]
    fn referenced_contents_array_is_flattened() {
        let mut handle = PdfHandle::open(&fixtures::pdf_with_pages(1)).unwrap();
        let page_id = handle.page_ids()[0];
        let document = handle.document_mut();
        let original = document
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Contents")
            .unwrap()
            .clone();
        let array_id = document.add_object(Object::Array(vec![original.clone()]));
        document
            .get_dictionary_mut(page_id)
            .unwrap()
            .set("Contents", Object::Reference(array_id));

        apply(&mut handle, &WatermarkSpec::text("DRAFT")).unwrap();

        let page = handle.document().get_dictionary(page_id).unwrap();
        let contents = page.get(b"Contents").unwrap().as_array().unwrap();
        assert_eq!(contents.len(), 4);
        assert_eq!(contents[1], original);
        assert!(contents.iter().all(|item| item.as_reference().is_ok()));
        let text = handle.document().get_page_content(page_id).unwrap();
        let text = String::from_utf8_lossy(&text);
        assert!(text.contains("alpha beta gamma"));
        assert!(text.contains("DRAFT"));
    }

    #[test]
    fn image_watermark_registers_xobject() {
        let png = fixtures::png_bytes(40, 20);
        let mut handle = PdfHandle::open(&fixtures::pdf_with_pages(1)).unwrap();
        apply(&mut handle, &WatermarkSpec::image(png)).unwrap();
        let page = handle.pages()[0];
        let images = handle.images(&page);
        assert_eq!(images.len(), 1);
        assert_eq!((images[0].width, images[0].height), (40, 20));
    }

    #[test]
    fn both_contents_rejected() {
        let mut handle = PdfHandle::open(&fixtures::pdf_with_pages(1)).unwrap();
        let mut spec = WatermarkSpec::text("X");
        spec.image = Some(fixtures::png_bytes(2, 2));
        assert!(matches!(
            apply(&mut handle, &spec),
            Err(EngineError::Validation(_))
        ));
    }
}
