// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image assembler — build a new PDF with one image per page using
// `printpdf` 0.8.
//
// printpdf 0.8 is data-oriented: each page is a `PdfPage` holding a list of
// `Op`s, and the whole document is serialised once by `PdfDocument::save()`.

use lightpdf_core::error::{EngineError, Result};
use lightpdf_core::params::AssemblySpec;
use lightpdf_core::types::MM_PER_PT;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

use crate::image::ImageProcessor;

/// With this DPI printpdf sizes an image at one point per pixel.
const POINT_DPI: f32 = 72.0;

/// Where an image lands on its page, in points from the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub width: f32,
    pub height: f32,
}

/// Fit an image inside the page minus `margin` on every edge, preserving
/// aspect ratio, and centre it in that box. Small images are scaled up.
pub fn placement(page: (f32, f32), margin: f32, image: (u32, u32)) -> Placement {
    let available_w = page.0 - 2.0 * margin;
    let available_h = page.1 - 2.0 * margin;
    let (img_w, img_h) = (image.0.max(1) as f32, image.1.max(1) as f32);
    let scale = (available_w / img_w).min(available_h / img_h);
    let width = img_w * scale;
    let height = img_h * scale;
    Placement {
        x: margin + (available_w - width) / 2.0,
        y: margin + (available_h - height) / 2.0,
        scale,
        width,
        height,
    }
}

/// Assemble `images` into one document, one page per image in input order.
#[instrument(skip_all, fields(images = images.len(), page_size = ?spec.page_size, margin = spec.margin))]
pub fn from_images(images: &[Vec<u8>], spec: &AssemblySpec, title: &str) -> Result<Vec<u8>> {
    if images.is_empty() {
        return Err(EngineError::validation("at least one image is required"));
    }
    let (page_w, page_h) = spec.page_size.dimensions_pt();
    let margin = spec.margin as f32;
    if 2.0 * margin >= page_w.min(page_h) {
        return Err(EngineError::validation(format!(
            "margin {} leaves no room on a {:?} page",
            spec.margin, spec.page_size
        )));
    }
    info!(title, "Assembling images into PDF");

    let mut doc = PdfDocument::new(title);
    let mut pages = Vec::with_capacity(images.len());
    for (index, bytes) in images.iter().enumerate() {
        let processor = if spec.auto_orient {
            ImageProcessor::from_bytes_oriented(bytes)
        } else {
            ImageProcessor::from_bytes(bytes)
        }
        .map_err(|err| EngineError::format(format!("image {index}: {err}")))?;

        let (width, height) = (processor.width(), processor.height());
        let rgb = processor.into_dynamic().to_rgb8();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: width as usize,
            height: height as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let xobject_id = doc.add_image(&raw);

        let place = placement((page_w, page_h), margin, (width, height));
        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(place.x)),
                translate_y: Some(Pt(place.y)),
                scale_x: Some(place.scale),
                scale_y: Some(place.scale),
                dpi: Some(POINT_DPI),
                rotate: None,
            },
        }];
        debug!(index, width, height, scale = place.scale, "Image placed on page");
        pages.push(PdfPage::new(Mm(page_w * MM_PER_PT), Mm(page_h * MM_PER_PT), ops));
    }
    doc.with_pages(pages);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        warn!(count = warnings.len(), "printpdf reported warnings while saving");
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::pdf::handle::{DocumentModel, PdfHandle};
    use lightpdf_core::types::PageSize;

    #[test]
    fn placement_fits_and_centres() {
        let place = placement((600.0, 800.0), 0.0, (300, 100));
        assert_eq!(place.scale, 2.0);
        assert_eq!((place.width, place.height), (600.0, 200.0));
        assert_eq!((place.x, place.y), (0.0, 300.0));
    }

    #[test]
    fn placement_respects_margin() {
        let place = placement((600.0, 800.0), 50.0, (100, 100));
        assert_eq!(place.scale, 5.0);
        assert_eq!(place.x, 50.0);
        assert_eq!(place.y, 150.0);
    }

    #[test]
    fn one_page_per_image() {
        let images = vec![fixtures::png_bytes(40, 30), fixtures::png_bytes(10, 60)];
        let spec = AssemblySpec {
            page_size: PageSize::Letter,
            ..AssemblySpec::default()
        };
        let pdf = from_images(&images, &spec, "Scans").unwrap();
        let handle = PdfHandle::open(&pdf).unwrap();
        let pages = handle.pages();
        assert_eq!(pages.len(), 2);
        assert!((pages[0].width - 612.0).abs() < 1.0);
        assert!((pages[0].height - 792.0).abs() < 1.0);
        assert!(!handle.images(&pages[1]).is_empty());
    }

    #[test]
    fn undecodable_image_is_format_error() {
        let images = vec![b"not an image".to_vec()];
        assert!(matches!(
            from_images(&images, &AssemblySpec::default(), "x"),
            Err(EngineError::Format(_))
        ));
    }

    #[test]
    fn empty_input_and_oversized_margin_rejected() {
        assert!(from_images(&[], &AssemblySpec::default(), "x").is_err());
        let spec = AssemblySpec {
            margin: 400,
            ..AssemblySpec::default()
        };
        assert!(matches!(
            from_images(&[fixtures::png_bytes(4, 4)], &spec, "x"),
            Err(EngineError::Validation(_))
        ));
    }
}
