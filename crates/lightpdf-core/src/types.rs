// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Lightpdf engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Standard page sizes for image-to-document assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    Letter,
    Legal,
    Tabloid,
}

impl PageSize {
    /// Dimensions in PDF points (width, height), portrait.
    pub fn dimensions_pt(&self) -> (f32, f32) {
        match self {
            Self::A4 => (595.275_6, 841.889_8),
            Self::A3 => (841.889_8, 1_190.551_2),
            Self::Letter => (612.0, 792.0),
            Self::Legal => (612.0, 1_008.0),
            Self::Tabloid => (792.0, 1_224.0),
        }
    }

    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_pt();
        (w * MM_PER_PT, h * MM_PER_PT)
    }
}

/// Millimetres per PDF point (1pt = 1/72in).
pub const MM_PER_PT: f32 = 25.4 / 72.0;

impl FromStr for PageSize {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "a4" => Ok(Self::A4),
            "a3" => Ok(Self::A3),
            "letter" => Ok(Self::Letter),
            "legal" => Ok(Self::Legal),
            "tabloid" => Ok(Self::Tabloid),
            other => Err(EngineError::validation(format!("unknown page size '{other}'"))),
        }
    }
}

/// Named compression levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
    Extreme,
}

impl CompressionLevel {
    /// JPEG quality used when re-encoding images at this level. Stronger
    /// levels never use a higher quality than weaker ones.
    pub fn quality(&self) -> u8 {
        match self {
            Self::Low => 85,
            Self::Medium => 70,
            Self::High => 50,
            Self::Extreme => 30,
        }
    }

    pub const ALL: [CompressionLevel; 4] = [Self::Low, Self::Medium, Self::High, Self::Extreme];
}

impl FromStr for CompressionLevel {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "extreme" => Ok(Self::Extreme),
            other => Err(EngineError::validation(format!(
                "unknown compression level '{other}'"
            ))),
        }
    }
}

/// A compression level resolved against the caller's target resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionProfile {
    pub level: CompressionLevel,
    /// JPEG quality, 0–100.
    pub quality: u8,
    /// Pixel-dimension ceiling. Images wider or taller than this are scaled
    /// down to fit inside a `target_dpi` square.
    pub target_dpi: u32,
}

impl CompressionProfile {
    pub fn new(level: CompressionLevel, target_dpi: u32) -> Self {
        Self {
            level,
            quality: level.quality(),
            target_dpi,
        }
    }
}

/// Where a watermark is anchored on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl FromStr for WatermarkPosition {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "center" => Ok(Self::Center),
            "top-left" => Ok(Self::TopLeft),
            "top-right" => Ok(Self::TopRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-right" => Ok(Self::BottomRight),
            other => Err(EngineError::validation(format!(
                "unknown watermark position '{other}'"
            ))),
        }
    }
}

/// Permissions granted to a user-password holder of an encrypted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Print,
    Modify,
    Copy,
    Annotate,
    // Accepted for request compatibility; they carry no bit of their own.
    FillForms,
    Extract,
    Assemble,
    PrintHighQuality,
}

impl Permission {
    /// The permission bit in the standard security handler's `/P` value,
    /// or `None` for reserved names.
    pub fn bit(&self) -> Option<u32> {
        match self {
            Self::Print => Some(1 << 2),
            Self::Modify => Some(1 << 3),
            Self::Copy => Some(1 << 4),
            Self::Annotate => Some(1 << 5),
            Self::FillForms | Self::Extract | Self::Assemble | Self::PrintHighQuality => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Modify => "modify",
            Self::Copy => "copy",
            Self::Annotate => "annotate",
            Self::FillForms => "fill_forms",
            Self::Extract => "extract",
            Self::Assemble => "assemble",
            Self::PrintHighQuality => "print_high_quality",
        }
    }
}

impl FromStr for Permission {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "print" => Ok(Self::Print),
            "modify" => Ok(Self::Modify),
            "copy" => Ok(Self::Copy),
            "annotate" => Ok(Self::Annotate),
            "fill_forms" => Ok(Self::FillForms),
            "extract" => Ok(Self::Extract),
            "assemble" => Ok(Self::Assemble),
            "print_high_quality" => Ok(Self::PrintHighQuality),
            other => Err(EngineError::validation(format!("unknown permission '{other}'"))),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// RC4 key strength for the standard security handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionStrength {
    /// 40-bit key, revision 2.
    Rc4_40,
    /// 128-bit key, revision 3.
    Rc4_128,
}

impl EncryptionStrength {
    /// Map the caller's bit count. Only 40 and 128 are accepted.
    pub fn from_bits(bits: u16) -> Result<Self, EngineError> {
        match bits {
            40 => Ok(Self::Rc4_40),
            128 => Ok(Self::Rc4_128),
            other => Err(EngineError::validation(format!(
                "encryption level must be 40 or 128, got {other}"
            ))),
        }
    }

    pub fn key_bits(&self) -> u32 {
        match self {
            Self::Rc4_40 => 40,
            Self::Rc4_128 => 128,
        }
    }

    /// Key length in bytes.
    pub fn key_len(&self) -> usize {
        self.key_bits() as usize / 8
    }

    /// `/V` entry of the encryption dictionary.
    pub fn version(&self) -> i64 {
        match self {
            Self::Rc4_40 => 1,
            Self::Rc4_128 => 2,
        }
    }

    /// `/R` entry of the encryption dictionary.
    pub fn revision(&self) -> i64 {
        match self {
            Self::Rc4_40 => 2,
            Self::Rc4_128 => 3,
        }
    }
}

/// Raster output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
    Gif,
    Bmp,
    Tiff,
}

impl ImageFormat {
    /// File extension used when packaging images.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "gif" => Ok(Self::Gif),
            "bmp" => Ok(Self::Bmp),
            "tiff" | "tif" => Ok(Self::Tiff),
            other => Err(EngineError::validation(format!("unknown image format '{other}'"))),
        }
    }
}

/// Flattening style for extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    #[default]
    Text,
    Json,
    Markdown,
}

impl FromStr for TextFormat {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "markdown" => Ok(Self::Markdown),
            other => Err(EngineError::validation(format!("unknown text format '{other}'"))),
        }
    }
}

/// Page width and height in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub width: f32,
    pub height: f32,
}
