// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image XObject codec — decode embedded image streams into pixels and build
// new image streams from pixels.

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, RgbImage, Rgba, RgbaImage};
use lightpdf_core::error::{EngineError, Result};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use tracing::warn;

use super::handle::{number, resolve};

/// How many nested `/SMask` hops are followed.
const MAX_MASK_DEPTH: usize = 2;

/// Colour model of an image stream, resolved through ICC and indexed spaces.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    Indexed { base: Box<ColorModel>, lookup: Vec<u8> },
}

impl ColorModel {
    fn channels(&self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
            Self::Indexed { .. } => 1,
        }
    }

    fn rgb(&self, bytes: &[u8]) -> Option<[u8; 3]> {
        match self {
            Self::Gray => {
                let v = *bytes.first()?;
                Some([v, v, v])
            }
            Self::Rgb => Some([*bytes.first()?, *bytes.get(1)?, *bytes.get(2)?]),
            Self::Cmyk => {
                let k = 255 - u16::from(*bytes.get(3)?);
                let channel = |c: u8| ((255 - u16::from(c)) * k / 255) as u8;
                Some([
                    channel(*bytes.first()?),
                    channel(*bytes.get(1)?),
                    channel(*bytes.get(2)?),
                ])
            }
            Self::Indexed { base, lookup } => {
                let width = base.channels();
                let offset = usize::from(*bytes.first()?) * width;
                base.rgb(lookup.get(offset..offset + width)?)
            }
        }
    }

    pub fn is_cmyk(&self) -> bool {
        match self {
            Self::Cmyk => true,
            Self::Indexed { base, .. } => base.is_cmyk(),
            _ => false,
        }
    }
}

/// Resolve the `/ColorSpace` of an image dictionary. Missing entries read as
/// gray, which is what image masks and soft masks use.
pub fn color_model(document: &Document, dict: &Dictionary) -> Option<ColorModel> {
    match dict.get(b"ColorSpace") {
        Ok(obj) => parse_color_space(document, obj),
        Err(_) => Some(ColorModel::Gray),
    }
}

fn parse_color_space(document: &Document, object: &Object) -> Option<ColorModel> {
    match resolve(document, object) {
        Object::Name(name) => model_from_name(name),
        Object::Array(arr) => {
            let head = resolve(document, arr.first()?).as_name().ok()?;
            match head {
                b"ICCBased" => {
                    let Object::Stream(profile) = resolve(document, arr.get(1)?) else {
                        return None;
                    };
                    match profile.dict.get(b"N").ok().and_then(|n| n.as_i64().ok()) {
                        Some(1) => Some(ColorModel::Gray),
                        Some(4) => Some(ColorModel::Cmyk),
                        _ => Some(ColorModel::Rgb),
                    }
                }
                b"Indexed" => {
                    let base = parse_color_space(document, arr.get(1)?)?;
                    if matches!(base, ColorModel::Indexed { .. }) {
                        return None;
                    }
                    let lookup = match resolve(document, arr.get(3)?) {
                        Object::String(bytes, _) => bytes.clone(),
                        Object::Stream(stream) => stream.get_plain_content().ok()?,
                        _ => return None,
                    };
                    Some(ColorModel::Indexed {
                        base: Box::new(base),
                        lookup,
                    })
                }
                b"CalRGB" => Some(ColorModel::Rgb),
                b"CalGray" => Some(ColorModel::Gray),
                other => model_from_name(other),
            }
        }
        _ => None,
    }
}

fn model_from_name(name: &[u8]) -> Option<ColorModel> {
    match name {
        b"DeviceGray" | b"G" | b"CalGray" => Some(ColorModel::Gray),
        b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(ColorModel::Rgb),
        b"DeviceCMYK" | b"CMYK" => Some(ColorModel::Cmyk),
        _ => None,
    }
}

/// Decode an image XObject into pixels, applying its soft mask if present.
pub fn decode_image(document: &Document, stream: &Stream) -> Result<DynamicImage> {
    decode_with_mask(document, stream, 0)
}

fn decode_with_mask(document: &Document, stream: &Stream, depth: usize) -> Result<DynamicImage> {
    let base = decode_pixels(document, stream)?;
    if depth >= MAX_MASK_DEPTH {
        return Ok(base);
    }
    let Ok(mask_ref) = stream.dict.get(b"SMask") else {
        return Ok(base);
    };
    let Object::Stream(mask_stream) = resolve(document, mask_ref) else {
        return Ok(base);
    };
    let mask = decode_with_mask(document, mask_stream, depth + 1)?.to_luma8();
    if mask.dimensions() != (base.width(), base.height()) {
        return Ok(base);
    }

    let mut rgba = base.to_rgba8();
    for (pixel, alpha) in rgba.pixels_mut().zip(mask.pixels()) {
        pixel.0[3] = alpha.0[0];
    }
    Ok(DynamicImage::ImageRgba8(rgba))
}

/// Decode an image XObject's own samples, ignoring any soft mask. A `/Decode`
/// array is applied to the samples, so the pixels show what a viewer shows.
pub fn decode_pixels(document: &Document, stream: &Stream) -> Result<DynamicImage> {
    let filters = stream.filters().unwrap_or_default();
    if filters.iter().any(|f| *f == b"DCTDecode".as_slice()) {
        if filters.len() > 1 {
            return Err(EngineError::format("chained filters before DCTDecode"));
        }
        let image = image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
            .map_err(|err| EngineError::format(format!("embedded JPEG is corrupt: {err}")))?;
        return Ok(match decode_ranges(document, &stream.dict, &ColorModel::Rgb) {
            Some(ranges) if ranges.len() == 1 => {
                let mut gray = image.into_luma8();
                remap_samples(&mut gray, &ranges, false);
                DynamicImage::ImageLuma8(gray)
            }
            Some(ranges) if ranges.len() == 3 => {
                let mut rgb = image.into_rgb8();
                remap_samples(&mut rgb, &ranges, false);
                DynamicImage::ImageRgb8(rgb)
            }
            _ => image,
        });
    }
    if let Some(filter) = filters.iter().find(|f| {
        matches!(**f, b"JPXDecode" | b"JBIG2Decode" | b"CCITTFaxDecode")
    }) {
        return Err(EngineError::format(format!(
            "unsupported image filter {}",
            String::from_utf8_lossy(filter)
        )));
    }

    let width = int_entry(document, &stream.dict, b"Width")
        .ok_or_else(|| EngineError::format("image stream has no /Width"))?;
    let height = int_entry(document, &stream.dict, b"Height")
        .ok_or_else(|| EngineError::format("image stream has no /Height"))?;
    let is_mask = stream
        .dict
        .get(b"ImageMask")
        .and_then(Object::as_bool)
        .unwrap_or(false);
    let bpc = if is_mask {
        1
    } else {
        int_entry(document, &stream.dict, b"BitsPerComponent").unwrap_or(8)
    };
    let model = color_model(document, &stream.dict)
        .ok_or_else(|| EngineError::format("unsupported image colour space"))?;

    let plain = stream
        .get_plain_content()
        .map_err(|err| EngineError::format(format!("cannot decode image stream: {err}")))?;
    let ranges = decode_ranges(document, &stream.dict, &model);

    match (bpc, &model) {
        (8, _) => decode_8bit(&plain, width, height, &model, ranges.as_deref()),
        (1, ColorModel::Gray) => {
            let inverted = ranges
                .as_deref()
                .and_then(<[_]>::first)
                .is_some_and(|(low, high)| low > high);
            Ok(decode_1bit(&plain, width, height, inverted))
        }
        _ => Err(EngineError::format(format!(
            "unsupported image layout: {bpc} bits per component"
        ))),
    }
}

/// `(Dmin, Dmax)` per component from `/Decode`, or `None` when the array is
/// absent, malformed or the identity mapping.
fn decode_ranges(document: &Document, dict: &Dictionary, model: &ColorModel) -> Option<Vec<(f32, f32)>> {
    let values: Vec<f32> = dict
        .get(b"Decode")
        .ok()
        .and_then(|obj| resolve(document, obj).as_array().ok())?
        .iter()
        .filter_map(|item| number(resolve(document, item)))
        .collect();
    if values.is_empty() || values.len() % 2 != 0 {
        return None;
    }
    let identity = if matches!(model, ColorModel::Indexed { .. }) {
        (0.0, 255.0)
    } else {
        (0.0, 1.0)
    };
    let ranges: Vec<(f32, f32)> = values.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect();
    (!ranges.iter().all(|range| *range == identity)).then_some(ranges)
}

/// Map 8-bit samples through their decode ranges. Palette indices map
/// within `0..=255`; colour components map within `0.0..=1.0`.
fn remap_samples(samples: &mut [u8], ranges: &[(f32, f32)], indexed: bool) {
    for (index, sample) in samples.iter_mut().enumerate() {
        let (low, high) = ranges[index % ranges.len()];
        let value = low + f32::from(*sample) / 255.0 * (high - low);
        let scaled = if indexed { value } else { value * 255.0 };
        *sample = scaled.round().clamp(0.0, 255.0) as u8;
    }
}

fn decode_8bit(
    plain: &[u8],
    width: u32,
    height: u32,
    model: &ColorModel,
    ranges: Option<&[(f32, f32)]>,
) -> Result<DynamicImage> {
    let channels = model.channels();
    let expected = (width as usize) * (height as usize) * channels;
    if plain.len() < expected {
        return Err(EngineError::format(format!(
            "image data truncated: {} of {expected} bytes",
            plain.len()
        )));
    }
    let mut data = plain[..expected].to_vec();
    if let Some(ranges) = ranges {
        remap_samples(&mut data, ranges, matches!(model, ColorModel::Indexed { .. }));
    }
    match model {
        ColorModel::Gray => GrayImage::from_raw(width, height, data)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(|| EngineError::format("gray image buffer mismatch")),
        ColorModel::Rgb => RgbImage::from_raw(width, height, data)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| EngineError::format("RGB image buffer mismatch")),
        _ => {
            let mut rgb = Vec::with_capacity((width as usize) * (height as usize) * 3);
            for pixel in data.chunks_exact(channels) {
                let [r, g, b] = model
                    .rgb(pixel)
                    .ok_or_else(|| EngineError::format("palette index out of range"))?;
                rgb.extend_from_slice(&[r, g, b]);
            }
            RgbImage::from_raw(width, height, rgb)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| EngineError::format("image buffer mismatch"))
        }
    }
}

/// Rows are padded to whole bytes. A set bit reads as white, or black when
/// `/Decode` is `[1 0]`, which also leaves stencil-mask samples unpainted.
fn decode_1bit(plain: &[u8], width: u32, height: u32, inverted: bool) -> DynamicImage {
    let row_bytes = (width as usize).div_ceil(8);
    let image: GrayImage = ImageBuffer::from_fn(width, height, |x, y| {
        let byte = plain
            .get(y as usize * row_bytes + x as usize / 8)
            .copied()
            .unwrap_or(0);
        let white = ((byte >> (7 - (x % 8))) & 1 == 1) != inverted;
        Luma([if white { 255 } else { 0 }])
    });
    DynamicImage::ImageLuma8(image)
}

fn int_entry(document: &Document, dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .ok()
        .map(|obj| resolve(document, obj))
        .and_then(number)
        .filter(|v| *v >= 0.0)
        .map(|v| v as u32)
}

// -- Encoding -----------------------------------------------------------------

/// An image XObject ready to be added to a document, plus its soft mask.
pub struct EncodedImage {
    pub stream: Stream,
    pub mask: Option<Stream>,
}

/// Build a Flate-compressed image XObject. Alpha, if any, becomes a soft mask
/// the caller must link via `/SMask` after adding it to the document.
pub fn raw_xobject(image: &RgbaImage, keep_alpha: bool) -> EncodedImage {
    let (width, height) = image.dimensions();
    let mut rgb = Vec::with_capacity((width as usize) * (height as usize) * 3);
    let mut alpha = Vec::with_capacity((width as usize) * (height as usize));
    for Rgba([r, g, b, a]) in image.pixels() {
        rgb.extend_from_slice(&[*r, *g, *b]);
        alpha.push(*a);
    }

    let mut stream = Stream::new(image_dict(width, height, b"DeviceRGB"), rgb);
    if let Err(err) = stream.compress() {
        warn!(%err, "Image stream left uncompressed");
    }

    let mask = (keep_alpha && alpha.iter().any(|a| *a != 255)).then(|| {
        let mut mask = Stream::new(image_dict(width, height, b"DeviceGray"), alpha);
        if let Err(err) = mask.compress() {
            warn!(%err, "Soft mask left uncompressed");
        }
        mask
    });

    EncodedImage { stream, mask }
}

/// Turn `dict` into the dictionary of a DCT-encoded image and attach the
/// JPEG bytes. Entries unrelated to the sample encoding (`/SMask`,
/// `/Intent`, ...) survive.
pub fn jpeg_xobject(
    mut dict: Dictionary,
    jpeg: Vec<u8>,
    width: u32,
    height: u32,
    grayscale: bool,
) -> Stream {
    let space: &[u8] = if grayscale { b"DeviceGray" } else { b"DeviceRGB" };
    for key in [&b"DecodeParms"[..], b"Decode", b"Length"] {
        dict.remove(key);
    }
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", i64::from(width));
    dict.set("Height", i64::from(height));
    dict.set("ColorSpace", Object::Name(space.to_vec()));
    dict.set("BitsPerComponent", 8i64);
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    Stream::new(dict, jpeg).with_compression(false)
}

fn image_dict(width: u32, height: u32, color_space: &[u8]) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => Object::Name(color_space.to_vec()),
        "BitsPerComponent" => 8,
    }
}
