// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine facade — validates caller input against the configuration, opens a
// handle per call, runs one operation and returns finished buffers.

use std::path::Path;

use lightpdf_core::EngineConfig;
use lightpdf_core::error::{EngineError, Result};
use lightpdf_core::params::{
    AssemblySpec, CompressionOutcome, DocumentMetadata, ExtractedText, ImageAsset,
    ImageExtractionSpec, RasterSpec, SecuritySpec, SplitSpec, WatermarkSpec,
};
use lightpdf_core::types::{CompressionLevel, CompressionProfile, TextFormat};
use tracing::{debug, info, instrument};

use crate::archive;
use crate::pdf::handle::{DocumentModel, PdfHandle, save_document};
use crate::pdf::{assemble, compress, extract, metadata, security, transform, watermark};
use crate::raster;

/// Stateless document transformation service.
///
/// Holds only configuration. Each call owns the document handles it opens,
/// so one engine may serve concurrent callers on distinct buffers.
#[derive(Debug, Clone, Default)]
pub struct PdfEngine {
    config: EngineConfig,
}

impl PdfEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- Input gates ----------------------------------------------------------

    fn check_size(&self, len: usize) -> Result<()> {
        if len as u64 > self.config.max_upload_size {
            return Err(EngineError::Resource(format!(
                "input of {len} bytes exceeds the {} byte limit",
                self.config.max_upload_size
            )));
        }
        Ok(())
    }

    /// Size gate, then signature gate, then parse.
    fn open(&self, bytes: &[u8]) -> Result<PdfHandle> {
        self.check_size(bytes.len())?;
        PdfHandle::open(bytes)
    }

    fn check_range(name: &str, value: u32, min: u32, max: u32) -> Result<()> {
        if (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(EngineError::validation(format!(
                "{name} must be between {min} and {max}, got {value}"
            )))
        }
    }

    // -- Structure ------------------------------------------------------------

    /// Concatenate documents, optionally reordered.
    #[instrument(skip_all, fields(inputs = inputs.len()))]
    pub fn merge(&self, inputs: &[Vec<u8>], order: Option<&[usize]>) -> Result<Vec<u8>> {
        if inputs.is_empty() {
            return Err(EngineError::validation("merge requires at least one document"));
        }
        if inputs.len() > self.config.max_merge_files {
            return Err(EngineError::validation(format!(
                "merge accepts at most {} documents, got {}",
                self.config.max_merge_files,
                inputs.len()
            )));
        }
        let handles = inputs
            .iter()
            .map(|bytes| self.open(bytes))
            .collect::<Result<Vec<_>>>()?;
        let mut merged = assemble::merge(&handles, order)?;
        let output = save_document(&mut merged)?;
        info!(bytes = output.len(), "Merged PDF written");
        Ok(output)
    }

    /// Split by range expression (one output) or into near-equal chunks.
    #[instrument(skip_all, fields(bytes_len = input.len()))]
    pub fn split(&self, input: &[u8], spec: &SplitSpec) -> Result<Vec<Vec<u8>>> {
        let mode = spec.mode()?;
        let handle = self.open(input)?;
        assemble::split(&handle, mode)?
            .iter_mut()
            .map(save_document)
            .collect()
    }

    /// Quarter-turn the selected pages.
    #[instrument(skip_all, fields(bytes_len = input.len(), angle = angle))]
    pub fn rotate(&self, input: &[u8], angle: i64, pages: Option<&str>) -> Result<Vec<u8>> {
        transform::validate_angle(angle)?;
        let mut handle = self.open(input)?;
        transform::rotate(&mut handle, angle, pages)?;
        handle.save()
    }

    // -- Content --------------------------------------------------------------

    /// Re-encode embedded images at `level` and report the size change.
    /// `dpi` falls back to the configured compression default.
    #[instrument(skip_all, fields(bytes_len = input.len(), level = ?level))]
    pub fn compress(
        &self,
        input: &[u8],
        level: CompressionLevel,
        dpi: Option<u32>,
    ) -> Result<CompressionOutcome> {
        let target_dpi = dpi.unwrap_or(self.config.compress_default_dpi);
        Self::check_range(
            "compression dpi",
            target_dpi,
            self.config.compress_min_dpi,
            self.config.compress_max_dpi,
        )?;
        let mut handle = self.open(input)?;
        let profile = CompressionProfile::new(level, target_dpi);
        let images_recompressed = compress::recompress(&mut handle, &profile)?;
        let data = handle.save()?;

        let outcome = CompressionOutcome {
            original_size: input.len(),
            compressed_size: data.len(),
            ratio: compress::compression_ratio(input.len(), data.len()),
            images_recompressed,
            data,
        };
        info!(
            original = outcome.original_size,
            compressed = outcome.compressed_size,
            ratio = outcome.ratio,
            "PDF compressed"
        );
        Ok(outcome)
    }

    /// Stamp a text or image watermark on the selected pages.
    #[instrument(skip_all, fields(bytes_len = input.len()))]
    pub fn watermark(&self, input: &[u8], spec: &WatermarkSpec) -> Result<Vec<u8>> {
        spec.content()?;
        if let Some(image) = &spec.image {
            self.check_size(image.len())?;
        }
        let mut handle = self.open(input)?;
        watermark::apply(&mut handle, spec)?;
        handle.save()
    }

    /// Encrypt with the standard security handler.
    #[instrument(skip_all, fields(bytes_len = input.len()))]
    pub fn secure(&self, input: &[u8], spec: &SecuritySpec) -> Result<Vec<u8>> {
        spec.strength()?;
        let mut handle = self.open(input)?;
        security::secure(&mut handle, spec, input)?;
        handle.save()
    }

    // -- Raster ---------------------------------------------------------------

    /// Render the selected pages to encoded images.
    #[instrument(skip_all, fields(bytes_len = input.len(), dpi = spec.dpi))]
    pub fn to_images(&self, input: &[u8], spec: &RasterSpec) -> Result<Vec<Vec<u8>>> {
        Self::check_range("dpi", spec.dpi, self.config.min_dpi, self.config.max_dpi)?;
        let handle = self.open(input)?;
        raster::to_images(&handle, spec)
    }

    /// Build a document with one page per image.
    #[instrument(skip_all, fields(images = images.len()))]
    pub fn from_images(&self, images: &[Vec<u8>], spec: &AssemblySpec) -> Result<Vec<u8>> {
        if images.len() > self.config.max_images {
            return Err(EngineError::validation(format!(
                "at most {} images may be assembled, got {}",
                self.config.max_images,
                images.len()
            )));
        }
        Self::check_range("margin", spec.margin, 0, self.config.max_margin)?;
        for image in images {
            self.check_size(image.len())?;
        }
        raster::from_images(images, spec, &self.config.document_title)
    }

    // -- Readers --------------------------------------------------------------

    #[instrument(skip_all, fields(bytes_len = input.len()))]
    pub fn read_metadata(&self, input: &[u8]) -> Result<DocumentMetadata> {
        let handle = self.open(input)?;
        Ok(metadata::read(&handle, input))
    }

    #[instrument(skip_all, fields(bytes_len = input.len(), format = ?format))]
    pub fn extract_text(
        &self,
        input: &[u8],
        pages: Option<&str>,
        format: TextFormat,
    ) -> Result<ExtractedText> {
        let handle = self.open(input)?;
        extract::extract_text(&handle, pages, format)
    }

    #[instrument(skip_all, fields(bytes_len = input.len()))]
    pub fn extract_images(
        &self,
        input: &[u8],
        spec: &ImageExtractionSpec,
    ) -> Result<Vec<ImageAsset>> {
        let handle = self.open(input)?;
        extract::extract_images(&handle, spec)
    }

    // -- Packaging and output -------------------------------------------------

    /// Zip extracted images as `page_{page}_image_{index}.{ext}`.
    pub fn package_images(&self, assets: &[ImageAsset]) -> Result<Vec<u8>> {
        archive::package_images(assets)
    }

    /// Zip rendered pages or split parts as `{stem}_{n}.{ext}`.
    pub fn package_pages(
        &self,
        buffers: &[Vec<u8>],
        stem: &str,
        extension: &str,
    ) -> Result<Vec<u8>> {
        archive::package_pages(buffers, stem, extension)
    }

    /// Write a finished buffer to disk.
    pub fn write_output(&self, path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
        std::fs::write(path.as_ref(), bytes)?;
        debug!(bytes = bytes.len(), "Wrote output to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use lightpdf_core::ErrorKind;
    use lightpdf_core::types::{ImageFormat, Permission};

    fn engine() -> PdfEngine {
        PdfEngine::default()
    }

    fn page_count(bytes: &[u8]) -> usize {
        PdfHandle::open(bytes).unwrap().page_count()
    }

    #[test]
    fn oversized_input_is_resource_error() {
        let config = EngineConfig {
            max_upload_size: 16,
            ..EngineConfig::default()
        };
        let engine = PdfEngine::new(config).unwrap();
        let err = engine.read_metadata(&fixtures::pdf_with_pages(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
    }

    #[test]
    fn non_pdf_input_is_format_error() {
        let err = engine().rotate(b"GIF89a....", 90, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn merge_page_count_is_sum_of_inputs() {
        let inputs = vec![fixtures::pdf_with_pages(2), fixtures::pdf_with_pages(3)];
        let merged = engine().merge(&inputs, None).unwrap();
        assert_eq!(page_count(&merged), 5);

        let err = engine().merge(&inputs, Some(&[0])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn merge_limits_input_count() {
        assert!(engine().merge(&[], None).is_err());
        let inputs = vec![fixtures::pdf_with_pages(1); 21];
        let err = engine().merge(&inputs, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn split_into_chunks_of_near_equal_size() {
        let parts = engine()
            .split(&fixtures::pdf_with_pages(10), &SplitSpec::by_chunks(3))
            .unwrap();
        let sizes: Vec<usize> = parts.iter().map(|part| page_count(part)).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
    }

    #[test]
    fn split_rejects_malformed_range() {
        let err = engine()
            .split(&fixtures::pdf_with_pages(3), &SplitSpec::by_pages("1-"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn compress_reports_sizes() {
        let input = fixtures::pdf_with_images(&[(300, 300)]);
        let outcome = engine()
            .compress(&input, CompressionLevel::High, Some(100))
            .unwrap();
        assert_eq!(outcome.original_size, input.len());
        assert_eq!(outcome.compressed_size, outcome.data.len());
        assert_eq!(outcome.images_recompressed, 1);
        assert!(outcome.ratio > 0.0);
        assert_eq!(page_count(&outcome.data), 1);
    }

    #[test]
    fn compress_dpi_bounds() {
        let input = fixtures::pdf_with_pages(1);
        for dpi in [71, 301] {
            let err = engine()
                .compress(&input, CompressionLevel::Low, Some(dpi))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn rotate_twice_equals_half_turn() {
        let input = fixtures::pdf_with_pages(2);
        let twice = engine()
            .rotate(&engine().rotate(&input, 90, None).unwrap(), 90, None)
            .unwrap();
        let handle = PdfHandle::open(&twice).unwrap();
        assert!(handle.pages().iter().all(|page| page.rotation == 180));
        assert!(engine().rotate(&input, 45, None).is_err());
    }

    #[test]
    fn watermark_keeps_page_count() {
        let output = engine()
            .watermark(&fixtures::pdf_with_pages(3), &WatermarkSpec::text("CONFIDENTIAL"))
            .unwrap();
        assert_eq!(page_count(&output), 3);
    }

    #[test]
    fn secured_output_declares_encryption() {
        let mut spec = SecuritySpec::new("owner-secret");
        spec.permissions = vec![Permission::Print];
        let output = engine().secure(&fixtures::pdf_with_pages(1), &spec).unwrap();
        assert!(output.windows(8).any(|w| w == b"/Encrypt"));

        spec.encryption_level = 256;
        let err = engine().secure(&fixtures::pdf_with_pages(1), &spec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn raster_round_trip_keeps_page_count() {
        let input = fixtures::pdf_with_pages(3);
        let spec = RasterSpec {
            dpi: 72,
            format: ImageFormat::Png,
            pages: None,
        };
        let images = engine().to_images(&input, &spec).unwrap();
        assert_eq!(images.len(), 3);
        let rebuilt = engine().from_images(&images, &AssemblySpec::default()).unwrap();
        assert_eq!(page_count(&rebuilt), 3);
    }

    #[test]
    fn raster_dpi_and_margin_bounds() {
        let spec = RasterSpec {
            dpi: 601,
            ..RasterSpec::default()
        };
        let err = engine().to_images(&fixtures::pdf_with_pages(1), &spec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let assembly = AssemblySpec {
            margin: 101,
            ..AssemblySpec::default()
        };
        let err = engine()
            .from_images(&[fixtures::png_bytes(8, 8)], &assembly)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn metadata_reports_structure() {
        let input = fixtures::pdf_with_info("Annual Report", "Grace");
        let meta = engine().read_metadata(&input).unwrap();
        assert_eq!(meta.title, "Annual Report");
        assert_eq!(meta.byte_size, input.len());
        assert_eq!(meta.page_count, 1);
    }

    #[test]
    fn extracted_images_package_into_archive() {
        let input = fixtures::pdf_with_images(&[(150, 150), (20, 20)]);
        let assets = engine()
            .extract_images(&input, &ImageExtractionSpec::default())
            .unwrap();
        assert_eq!(assets.len(), 1);
        let archive = engine().package_images(&assets).unwrap();
        assert!(archive.starts_with(b"PK"));
    }

    #[test]
    fn text_counts_match_across_formats() {
        let input = fixtures::pdf_with_pages(2);
        let text = engine().extract_text(&input, None, TextFormat::Text).unwrap();
        let json = engine().extract_text(&input, None, TextFormat::Json).unwrap();
        assert_eq!(text.word_count, json.word_count);
        assert_eq!(text.page_count, 2);
        assert!(text.text.unwrap().starts_with("Page 1:\n"));
    }

    #[test]
    fn write_output_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.pdf");
        let bytes = fixtures::pdf_with_pages(1);
        engine().write_output(&path, &bytes).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }
}
