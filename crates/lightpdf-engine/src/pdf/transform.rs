// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page transform — quarter-turn rotation of selected pages.

use lightpdf_core::error::{EngineError, Result};
use lopdf::Object;
use tracing::{debug, info, instrument};

use super::handle::{DocumentModel, PdfHandle};
use crate::range;

/// Angles a page may be turned by.
pub const ALLOWED_ANGLES: [i64; 3] = [90, 180, 270];

/// Reject anything but a clockwise quarter turn.
pub fn validate_angle(angle: i64) -> Result<()> {
    if ALLOWED_ANGLES.contains(&angle) {
        Ok(())
    } else {
        Err(EngineError::validation(format!(
            "rotation angle must be 90, 180 or 270, got {angle}"
        )))
    }
}

/// Add `angle` to the effective `/Rotate` of every selected page. Pages
/// outside the selection are left untouched.
#[instrument(skip_all, fields(angle = angle, pages = pages.unwrap_or("all")))]
pub fn rotate(handle: &mut PdfHandle, angle: i64, pages: Option<&str>) -> Result<()> {
    validate_angle(angle)?;

    let infos = handle.pages();
    let selected = range::resolve(pages, infos.len())?;
    info!(selected = selected.len(), total = infos.len(), "Rotating pages");

    let document = handle.document_mut();
    for index in selected {
        let page = infos[index];
        let rotation = (page.rotation + angle).rem_euclid(360);
        let dict = document.get_dictionary_mut(page.id).map_err(|err| {
            EngineError::processing(format!("cannot update page {}: {err}", index + 1))
        })?;
        dict.set("Rotate", Object::Integer(rotation));
        debug!(page = index + 1, from = page.rotation, to = rotation, "Page rotated");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn rotations(handle: &PdfHandle) -> Vec<i64> {
        handle.pages().iter().map(|p| p.rotation).collect()
    }

    fn round_trip(handle: PdfHandle) -> PdfHandle {
        PdfHandle::open(&handle.save().unwrap()).unwrap()
    }

    #[test]
    fn rejects_other_angles() {
        for angle in [0, 45, 360, -90, 91] {
            assert!(matches!(
                validate_angle(angle),
                Err(EngineError::Validation(_))
            ));
        }
        let mut handle = PdfHandle::open(&fixtures::pdf_with_pages(1)).unwrap();
        assert!(rotate(&mut handle, 45, None).is_err());
    }

    #[test]
    fn two_quarter_turns_equal_half_turn() {
        let bytes = fixtures::pdf_with_pages(3);

        let mut twice = PdfHandle::open(&bytes).unwrap();
        rotate(&mut twice, 90, None).unwrap();
        rotate(&mut twice, 90, None).unwrap();

        let mut once = PdfHandle::open(&bytes).unwrap();
        rotate(&mut once, 180, None).unwrap();

        assert_eq!(rotations(&round_trip(twice)), vec![180, 180, 180]);
        assert_eq!(rotations(&round_trip(once)), vec![180, 180, 180]);
    }

    #[test]
    fn wraps_past_full_turn() {
        let mut handle = PdfHandle::open(&fixtures::pdf_with_pages(1)).unwrap();
        rotate(&mut handle, 270, None).unwrap();
        rotate(&mut handle, 180, None).unwrap();
        assert_eq!(rotations(&handle), vec![90]);
    }

    #[test]
    fn only_selected_pages_turn() {
        let mut handle = PdfHandle::open(&fixtures::pdf_with_pages(4)).unwrap();
        rotate(&mut handle, 90, Some("2-3")).unwrap();
        let handle = round_trip(handle);
        assert_eq!(rotations(&handle), vec![0, 90, 90, 0]);
        assert_eq!(handle.page_count(), 4);
    }

    #[test]
    fn composes_with_inherited_rotation() {
        let mut handle =
            PdfHandle::open(&fixtures::pdf_with_inherited_rotation(2, 90)).unwrap();
        rotate(&mut handle, 180, Some("1")).unwrap();
        assert_eq!(rotations(&handle), vec![270, 90]);
    }
}
