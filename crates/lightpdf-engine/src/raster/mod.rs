// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster module — pages to images and images to pages.

pub mod assemble;
pub mod fill;
pub mod font;
pub mod render;
pub mod text;

use lightpdf_core::error::Result;
use lightpdf_core::params::RasterSpec;
use tracing::{info, instrument};

use crate::image::ImageProcessor;
use crate::pdf::handle::{DocumentModel, PdfHandle};
use crate::range;

pub use assemble::from_images;
pub use render::PageRasterizer;

/// JPEG quality for rendered pages.
pub const RENDER_JPEG_QUALITY: u8 = 90;

/// Render the selected pages, in ascending page order, one encoded image per
/// page.
#[instrument(skip_all, fields(dpi = spec.dpi, format = ?spec.format))]
pub fn to_images(handle: &PdfHandle, spec: &RasterSpec) -> Result<Vec<Vec<u8>>> {
    let pages = handle.pages();
    let selected = range::resolve(spec.pages.as_deref(), pages.len())?;
    info!(selected = selected.len(), total = pages.len(), "Rasterising pages");

    selected
        .into_iter()
        .map(|index| {
            let canvas = PageRasterizer::render(handle.document(), &pages[index], spec.dpi)?;
            let opaque = image::DynamicImage::ImageRgb8(canvas.to_rgb8());
            ImageProcessor::from_dynamic(opaque).encode(spec.format, RENDER_JPEG_QUALITY)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use lightpdf_core::params::AssemblySpec;
    use lightpdf_core::types::ImageFormat;

    #[test]
    fn one_image_per_selected_page() {
        let handle = PdfHandle::open(&fixtures::pdf_with_pages(4)).unwrap();
        let spec = RasterSpec {
            dpi: 36,
            format: ImageFormat::Jpeg,
            pages: Some("2-3".into()),
        };
        let images = to_images(&handle, &spec).unwrap();
        assert_eq!(images.len(), 2);
        let decoded = image::load_from_memory(&images[0]).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (306, 396));
    }

    #[test]
    fn page_count_survives_round_trip() {
        let source = PdfHandle::open(&fixtures::pdf_with_page_sizes(&[
            (612.0, 792.0),
            (792.0, 612.0),
            (300.0, 300.0),
        ]))
        .unwrap();
        let spec = RasterSpec {
            dpi: 72,
            ..RasterSpec::default()
        };
        let images = to_images(&source, &spec).unwrap();
        let rebuilt = from_images(&images, &AssemblySpec::default(), "round trip").unwrap();
        assert_eq!(PdfHandle::open(&rebuilt).unwrap().page_count(), 3);
    }

    #[test]
    fn every_format_encodes() {
        let handle = PdfHandle::open(&fixtures::pdf_with_pages(1)).unwrap();
        for format in [
            ImageFormat::Png,
            ImageFormat::Jpeg,
            ImageFormat::Gif,
            ImageFormat::Bmp,
            ImageFormat::Tiff,
        ] {
            let spec = RasterSpec {
                dpi: 18,
                format,
                pages: None,
            };
            let images = to_images(&handle, &spec).unwrap();
            assert_eq!(images.len(), 1, "{format:?}");
            assert!(image::load_from_memory(&images[0]).is_ok(), "{format:?}");
        }
    }
}
