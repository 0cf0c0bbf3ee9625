// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode, orient, resize, rotate and re-encode raster images
// using the `image` crate.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use lightpdf_core::error::{EngineError, Result};
use lightpdf_core::types::ImageFormat;
use tracing::{debug, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Transformations consume `self` and return a new processor, so calls chain:
///
/// ```ignore
/// let jpeg = ImageProcessor::from_bytes(&png)?
///     .fit_within(300, 300)
///     .to_jpeg_bytes(70)?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode encoded bytes (PNG, JPEG, GIF, BMP, TIFF, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data)
            .map_err(|err| EngineError::format(format!("failed to decode image: {err}")))?;
        debug!(
            width = image.width(),
            height = image.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image })
    }

    /// Decode encoded bytes and undo the quarter-turn recorded in EXIF
    /// orientation metadata. Mirrored orientations are left as stored.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes_oriented(data: &[u8]) -> Result<Self> {
        let mut decoder = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|err| EngineError::format(format!("failed to sniff image format: {err}")))?
            .into_decoder()
            .map_err(|err| EngineError::format(format!("failed to decode image: {err}")))?;
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let image = DynamicImage::from_decoder(decoder)
            .map_err(|err| EngineError::format(format!("failed to decode image: {err}")))?;
        debug!(?orientation, width = image.width(), height = image.height(), "Image decoded");
        Ok(Self {
            image: apply_quarter_turns(image, quarter_turns(orientation)),
        })
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    pub fn is_grayscale(&self) -> bool {
        !self.image.color().has_color()
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Shrink to fit inside `max_width` x `max_height`, preserving aspect
    /// ratio. Images already inside the box are returned unchanged.
    #[instrument(skip(self), fields(max_width, max_height))]
    pub fn fit_within(self, max_width: u32, max_height: u32) -> Self {
        if self.image.width() <= max_width && self.image.height() <= max_height {
            return self;
        }
        let resized = self
            .image
            .resize(max_width.max(1), max_height.max(1), FilterType::Lanczos3);
        debug!(
            new_w = resized.width(),
            new_h = resized.height(),
            "Resize complete"
        );
        Self { image: resized }
    }

    /// Rotate clockwise by a multiple of 90 degrees. Other angles are ignored.
    pub fn rotate_clockwise(self, degrees: i64) -> Self {
        let turns = (degrees.rem_euclid(360) / 90) as u8;
        Self {
            image: apply_quarter_turns(self.image, turns),
        }
    }

    // -- Output ---------------------------------------------------------------

    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_to_format(&self.image, image::ImageFormat::Png)
    }

    /// Encode as baseline JPEG. Grayscale images stay single-channel.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        let written = if self.is_grayscale() {
            self.image.to_luma8().write_with_encoder(encoder)
        } else {
            self.image.to_rgb8().write_with_encoder(encoder)
        };
        written
            .map_err(|err| EngineError::processing(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }

    /// Encode into the requested output format. `quality` only affects JPEG.
    pub fn encode(&self, format: ImageFormat, quality: u8) -> Result<Vec<u8>> {
        match format {
            ImageFormat::Jpeg => self.to_jpeg_bytes(quality),
            ImageFormat::Png => self.to_png_bytes(),
            ImageFormat::Gif => encode_to_format(
                &DynamicImage::ImageRgba8(self.image.to_rgba8()),
                image::ImageFormat::Gif,
            ),
            ImageFormat::Bmp => encode_to_format(&self.normalised(), image::ImageFormat::Bmp),
            ImageFormat::Tiff => encode_to_format(&self.normalised(), image::ImageFormat::Tiff),
        }
    }

    /// 8-bit RGB or RGBA, which every supported encoder accepts.
    fn normalised(&self) -> DynamicImage {
        if self.has_alpha() {
            DynamicImage::ImageRgba8(self.image.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(self.image.to_rgb8())
        }
    }
}

/// Clockwise quarter turns that undo an EXIF orientation.
pub fn quarter_turns(orientation: Orientation) -> u8 {
    match orientation {
        Orientation::Rotate90 => 1,
        Orientation::Rotate180 => 2,
        Orientation::Rotate270 => 3,
        _ => 0,
    }
}

fn apply_quarter_turns(image: DynamicImage, turns: u8) -> DynamicImage {
    match turns % 4 {
        1 => image.rotate90(),
        2 => image.rotate180(),
        3 => image.rotate270(),
        _ => image,
    }
}

fn encode_to_format(image: &DynamicImage, format: image::ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), format)
        .map_err(|err| EngineError::processing(format!("image encoding failed: {err}")))?;
    Ok(buffer)
}
