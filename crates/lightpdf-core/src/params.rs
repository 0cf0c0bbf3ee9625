// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operation parameters and result records exchanged with the engine.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::types::{
    EncryptionStrength, ImageFormat, PageDimensions, PageSize, Permission, TextFormat,
    WatermarkPosition,
};

// -- Split --------------------------------------------------------------------

/// How a split divides its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitMode<'a> {
    /// One output holding the pages selected by a range expression.
    Pages(&'a str),
    /// `n` outputs of near-equal size.
    Chunks(usize),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitSpec {
    pub pages: Option<String>,
    pub chunks: Option<usize>,
}

impl SplitSpec {
    pub fn by_pages(expr: impl Into<String>) -> Self {
        Self {
            pages: Some(expr.into()),
            chunks: None,
        }
    }

    pub fn by_chunks(chunks: usize) -> Self {
        Self {
            pages: None,
            chunks: Some(chunks),
        }
    }

    /// Exactly one of `pages` / `chunks` must be set; an empty range
    /// expression counts as unset.
    pub fn mode(&self) -> Result<SplitMode<'_>> {
        let pages = self.pages.as_deref().filter(|p| !p.trim().is_empty());
        match (pages, self.chunks) {
            (Some(expr), None) => Ok(SplitMode::Pages(expr)),
            (None, Some(0)) => Err(EngineError::validation("chunks must be at least 1")),
            (None, Some(n)) => Ok(SplitMode::Chunks(n)),
            (Some(_), Some(_)) => Err(EngineError::validation(
                "specify either pages or chunks, not both",
            )),
            (None, None) => Err(EngineError::validation("specify either pages or chunks")),
        }
    }
}

// -- Watermark ----------------------------------------------------------------

/// The content a watermark draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WatermarkContent<'a> {
    Text(&'a str),
    /// Encoded image bytes (PNG, JPEG, ...).
    Image(&'a [u8]),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkSpec {
    pub text: Option<String>,
    #[serde(skip)]
    pub image: Option<Vec<u8>>,
    pub opacity: f32,
    pub position: WatermarkPosition,
    pub pages: Option<String>,
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            text: None,
            image: None,
            opacity: 0.5,
            position: WatermarkPosition::Center,
            pages: None,
        }
    }
}

impl WatermarkSpec {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn image(bytes: Vec<u8>) -> Self {
        Self {
            image: Some(bytes),
            ..Self::default()
        }
    }

    /// Validate opacity and resolve the mutually exclusive content fields.
    pub fn content(&self) -> Result<WatermarkContent<'_>> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(EngineError::validation(format!(
                "opacity must be within 0.0..=1.0, got {}",
                self.opacity
            )));
        }
        let text = self.text.as_deref().filter(|t| !t.is_empty());
        let image = self.image.as_deref().filter(|i| !i.is_empty());
        match (text, image) {
            (Some(text), None) => Ok(WatermarkContent::Text(text)),
            (None, Some(image)) => Ok(WatermarkContent::Image(image)),
            (Some(_), Some(_)) => Err(EngineError::validation(
                "watermark takes either text or an image, not both",
            )),
            (None, None) => Err(EngineError::validation(
                "watermark requires text or an image",
            )),
        }
    }
}

// -- Security -----------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySpec {
    pub user_password: Option<String>,
    pub owner_password: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default = "default_encryption_level")]
    pub encryption_level: u16,
}

fn default_encryption_level() -> u16 {
    128
}

impl SecuritySpec {
    pub fn new(owner_password: impl Into<String>) -> Self {
        Self {
            user_password: None,
            owner_password: owner_password.into(),
            permissions: Vec::new(),
            encryption_level: default_encryption_level(),
        }
    }

    pub fn strength(&self) -> Result<EncryptionStrength> {
        EncryptionStrength::from_bits(self.encryption_level)
    }

    /// OR of the bits for every granted permission. Reserved names add nothing.
    pub fn permission_flags(&self) -> u32 {
        self.permissions
            .iter()
            .filter_map(Permission::bit)
            .fold(0, |acc, bit| acc | bit)
    }

    /// Parse permission names, rejecting anything outside the accepted list.
    pub fn parse_permissions<S: AsRef<str>>(names: &[S]) -> Result<Vec<Permission>> {
        names.iter().map(|name| name.as_ref().parse()).collect()
    }
}

// -- Rasterisation / assembly -------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterSpec {
    pub dpi: u32,
    pub format: ImageFormat,
    pub pages: Option<String>,
}

impl Default for RasterSpec {
    fn default() -> Self {
        Self {
            dpi: 200,
            format: ImageFormat::Png,
            pages: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblySpec {
    pub page_size: PageSize,
    /// Inset on every edge, in points.
    pub margin: u32,
    /// Correct EXIF orientation before placement.
    pub auto_orient: bool,
}

impl Default for AssemblySpec {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            margin: 0,
            auto_orient: true,
        }
    }
}

// -- Extraction ---------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageExtractionSpec {
    pub pages: Option<String>,
    pub min_width: u32,
    pub min_height: u32,
    pub format: ImageFormat,
}

impl Default for ImageExtractionSpec {
    fn default() -> Self {
        Self {
            pages: None,
            min_width: 100,
            min_height: 100,
            format: ImageFormat::Png,
        }
    }
}

/// An embedded raster image pulled out of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAsset {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// 0-based index of the page the image was found on.
    pub page_index: usize,
    /// Position of the image among the page's images.
    pub image_index: usize,
    pub format: ImageFormat,
}

impl ImageAsset {
    /// Archive entry name: `page_{page}_image_{index}.{ext}` with a 1-based page.
    pub fn archive_name(&self) -> String {
        format!(
            "page_{}_image_{}.{}",
            self.page_index + 1,
            self.image_index,
            self.format.extension()
        )
    }
}

/// Text of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-based page number.
    pub page: usize,
    pub text: String,
    pub words: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedText {
    pub format: TextFormat,
    pub pages: Vec<PageText>,
    /// Flattened text for `text` and `markdown`; `None` for `json`.
    pub text: Option<String>,
    pub word_count: usize,
    pub page_count: usize,
}

impl ExtractedText {
    /// Render the result the way the caller asked for it: the flattened text,
    /// or a JSON array of the per-page entries.
    pub fn render(&self) -> Result<String> {
        match &self.text {
            Some(text) => Ok(text.clone()),
            None => Ok(serde_json::to_string(&self.pages)?),
        }
    }
}

/// Document-level facts returned by the metadata reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub creator: String,
    pub producer: String,
    pub creation_date: String,
    pub modification_date: String,
    pub page_count: usize,
    pub byte_size: usize,
    pub encrypted: bool,
    pub first_page_size: Option<PageDimensions>,
    /// SHA-256 of the input buffer, lowercase hex.
    pub sha256: String,
}

/// Result of recompressing a document.
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub data: Vec<u8>,
    pub original_size: usize,
    pub compressed_size: usize,
    /// `(1 - compressed/original) * 100`. Negative when the output grew.
    pub ratio: f64,
    /// Number of image streams that were re-encoded.
    pub images_recompressed: usize,
}
