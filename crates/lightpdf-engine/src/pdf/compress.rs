// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster compressor — downsample and JPEG re-encode embedded images, then
// drop unreachable objects and Flate-compress the remaining streams.

use std::collections::HashSet;

use lightpdf_core::error::Result;
use lightpdf_core::types::CompressionProfile;
use lopdf::{Object, ObjectId};
use tracing::{debug, info, instrument, warn};

use super::handle::{DocumentModel, PdfHandle};
use super::xobject::{self, color_model};
use crate::image::ImageProcessor;

/// Percentage saved: `(1 - compressed/original) * 100`. Negative when the
/// output grew.
pub fn compression_ratio(original: usize, compressed: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (1.0 - compressed as f64 / original as f64) * 100.0
}

/// Re-encode every gray or RGB image drawn by any page. Returns how many
/// image streams were replaced.
#[instrument(skip_all, fields(level = ?profile.level, target_dpi = profile.target_dpi))]
pub fn recompress(handle: &mut PdfHandle, profile: &CompressionProfile) -> Result<usize> {
    let mut seen = HashSet::new();
    let targets: Vec<ObjectId> = handle
        .pages()
        .iter()
        .flat_map(|page| handle.images(page))
        .map(|image| image.id)
        .filter(|id| seen.insert(*id))
        .collect();
    info!(images = targets.len(), quality = profile.quality, "Compressing PDF");

    let mut replaced = 0;
    for id in targets {
        if recompress_image(handle, id, profile) {
            replaced += 1;
        }
    }

    let document = handle.document_mut();
    let pruned = document.prune_objects();
    document.compress();
    debug!(replaced, pruned = pruned.len(), "Compression pass complete");
    Ok(replaced)
}

fn recompress_image(handle: &mut PdfHandle, id: ObjectId, profile: &CompressionProfile) -> bool {
    let document = handle.document();
    let Ok(Object::Stream(stream)) = document.get_object(id) else {
        return false;
    };
    if stream
        .dict
        .get(b"ImageMask")
        .and_then(Object::as_bool)
        .unwrap_or(false)
    {
        return false;
    }
    match color_model(document, &stream.dict) {
        Some(model) if !model.is_cmyk() => {}
        _ => {
            debug!(?id, "Skipping image outside gray/RGB");
            return false;
        }
    }

    let decoded = match xobject::decode_pixels(document, stream) {
        Ok(image) => image,
        Err(err) => {
            warn!(?id, %err, "Leaving undecodable image untouched");
            return false;
        }
    };
    let (from_w, from_h) = (decoded.width(), decoded.height());
    let processor =
        ImageProcessor::from_dynamic(decoded).fit_within(profile.target_dpi, profile.target_dpi);
    let jpeg = match processor.to_jpeg_bytes(profile.quality) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(?id, %err, "JPEG re-encode failed");
            return false;
        }
    };

    let replacement = xobject::jpeg_xobject(
        stream.dict.clone(),
        jpeg,
        processor.width(),
        processor.height(),
        processor.is_grayscale(),
    );
    debug!(
        ?id,
        from_w,
        from_h,
        to_w = processor.width(),
        to_h = processor.height(),
        bytes = replacement.content.len(),
        "Image re-encoded"
    );
    handle.document_mut().set_object(id, replacement);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use lightpdf_core::types::CompressionLevel;

    #[test]
    fn ratio_formula() {
        assert_eq!(compression_ratio(200, 50), 75.0);
        assert_eq!(compression_ratio(100, 100), 0.0);
        assert!(compression_ratio(100, 150) < 0.0);
    }

    #[test]
    fn large_images_are_downsampled_to_target() {
        let bytes = fixtures::pdf_with_images(&[(400, 200), (50, 50)]);
        let mut handle = PdfHandle::open(&bytes).unwrap();
        let profile = CompressionProfile::new(CompressionLevel::High, 100);
        assert_eq!(recompress(&mut handle, &profile).unwrap(), 2);

        let reopened = PdfHandle::open(&handle.save().unwrap()).unwrap();
        let page = reopened.pages()[0];
        let dims: Vec<(u32, u32)> = reopened
            .images(&page)
            .iter()
            .map(|img| (img.width, img.height))
            .collect();
        assert_eq!(dims, vec![(100, 50), (50, 50)]);
    }

    #[test]
    fn replaced_images_are_jpeg() {
        let bytes = fixtures::pdf_with_images(&[(64, 64)]);
        let mut handle = PdfHandle::open(&bytes).unwrap();
        recompress(&mut handle, &CompressionProfile::new(CompressionLevel::Medium, 150)).unwrap();

        let page = handle.pages()[0];
        let image = &handle.images(&page)[0];
        let Ok(Object::Stream(stream)) = handle.document().get_object(image.id) else {
            panic!("image is not a stream");
        };
        assert_eq!(
            stream.dict.get(b"Filter").and_then(Object::as_name).unwrap(),
            b"DCTDecode"
        );
        assert!(stream.content.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn inverted_decode_survives_reencoding() {
        let bytes = fixtures::pdf_with_images(&[(64, 64)]);
        let mut handle = PdfHandle::open(&bytes).unwrap();
        let page = handle.pages()[0];
        let id = handle.images(&page)[0].id;
        if let Ok(Object::Stream(stream)) = handle.document_mut().get_object_mut(id) {
            let inverted: Vec<Object> =
                [1, 0, 1, 0, 1, 0].into_iter().map(Object::Integer).collect();
            stream.dict.set("Decode", inverted);
        }
        // Samples are (i, 40, 200); a viewer shows (255 - i, 215, 55).
        let profile = CompressionProfile::new(CompressionLevel::Medium, 150);
        assert!(recompress_image(&mut handle, id, &profile));

        let Ok(Object::Stream(stream)) = handle.document().get_object(id) else {
            panic!("image is not a stream");
        };
        assert!(!stream.dict.has(b"Decode"));
        let pixel = xobject::decode_pixels(handle.document(), stream)
            .unwrap()
            .to_rgb8()
            .get_pixel(32, 32)
            .0;
        assert!((200..=230).contains(&pixel[1]), "got {pixel:?}");
        assert!((40..=70).contains(&pixel[2]), "got {pixel:?}");
    }

    #[test]
    fn page_count_unchanged() {
        let bytes = fixtures::pdf_with_pages(4);
        let mut handle = PdfHandle::open(&bytes).unwrap();
        recompress(&mut handle, &CompressionProfile::new(CompressionLevel::Low, 150)).unwrap();
        let reopened = PdfHandle::open(&handle.save().unwrap()).unwrap();
        assert_eq!(reopened.page_count(), 4);
    }
}
