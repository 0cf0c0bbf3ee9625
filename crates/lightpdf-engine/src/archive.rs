// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Archive packaging — bundle multi-buffer results into one zip.

use std::io::{Cursor, Write};

use lightpdf_core::error::{EngineError, Result};
use lightpdf_core::params::ImageAsset;
use tracing::{debug, instrument};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

fn zip_error(err: zip::result::ZipError) -> EngineError {
    EngineError::processing(format!("archive write failed: {err}"))
}

/// Write `(name, bytes)` entries into an in-memory deflated zip.
pub fn write_entries<'a, I>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (String, &'a [u8])>,
{
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut count = 0usize;
    for (name, data) in entries {
        writer.start_file(name, options).map_err(zip_error)?;
        writer.write_all(data)?;
        count += 1;
    }
    let cursor = writer.finish().map_err(zip_error)?;
    let bytes = cursor.into_inner();
    debug!(entries = count, bytes = bytes.len(), "Archive written");
    Ok(bytes)
}

/// One entry per extracted image, named `page_{page}_image_{index}.{ext}`.
#[instrument(skip_all, fields(images = assets.len()))]
pub fn package_images(assets: &[ImageAsset]) -> Result<Vec<u8>> {
    write_entries(
        assets
            .iter()
            .map(|asset| (asset.archive_name(), asset.data.as_slice())),
    )
}

/// One entry per buffer, named `{stem}_{n}.{ext}` with `n` counting from 1.
#[instrument(skip_all, fields(buffers = buffers.len(), stem = stem))]
pub fn package_pages(buffers: &[Vec<u8>], stem: &str, extension: &str) -> Result<Vec<u8>> {
    write_entries(
        buffers
            .iter()
            .enumerate()
            .map(|(index, data)| (format!("{stem}_{}.{extension}", index + 1), data.as_slice())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightpdf_core::types::ImageFormat;
    use std::io::Read;
    use zip::ZipArchive;

    fn entry_names(bytes: Vec<u8>) -> Vec<String> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn images_named_by_page_and_index() {
        let asset = |page_index, image_index| ImageAsset {
            data: vec![1, 2, 3],
            width: 200,
            height: 200,
            page_index,
            image_index,
            format: ImageFormat::Png,
        };
        let bytes = package_images(&[asset(0, 0), asset(0, 3), asset(4, 1)]).unwrap();
        assert_eq!(
            entry_names(bytes),
            vec!["page_1_image_0.png", "page_1_image_3.png", "page_5_image_1.png"]
        );
    }

    #[test]
    fn numbered_entries_keep_content() {
        let buffers = vec![b"first".to_vec(), b"second".to_vec()];
        let bytes = package_pages(&buffers, "split", "pdf").unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        archive
            .by_name("split_2.pdf")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "second");
        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn empty_archive_is_valid() {
        let bytes = package_pages(&[], "page", "png").unwrap();
        assert!(entry_names(bytes).is_empty());
    }
}
