// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasteriser — interprets a page's content stream onto a white canvas.
//
// Covers the graphics state stack, the current transformation matrix, solid
// colours with constant alpha, filled and stroked paths, text, image XObjects
// and nested form XObjects. Clipping paths and shadings are ignored.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use image::{DynamicImage, Pixel, Rgba, RgbaImage};
use imageproc::drawing::{Blend, draw_line_segment_mut};
use lightpdf_core::error::{EngineError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument, warn};

use super::fill::{FillRule, fill_subpaths};
use super::font::PdfFont;
use super::text::{self, TextObject, TextParams, TextPaint};
use crate::image::ImageProcessor;
use crate::pdf::handle::{PageInfo, number, page_resources, resolve, resolve_dict};
use crate::pdf::xobject;

/// Largest canvas the rasteriser will allocate, in pixels.
pub const MAX_CANVAS_PIXELS: u64 = 150_000_000;

/// Form XObjects nested deeper than this are not drawn.
const MAX_FORM_DEPTH: usize = 16;

/// Line segments per cubic Bézier curve.
const CURVE_STEPS: usize = 16;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Row-vector affine matrix `[a b c d e f]`, as used by `cm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        let values: Vec<f32> = operands.iter().filter_map(number).collect();
        match values[..] {
            [a, b, c, d, e, f] => Some(Self::new(a, b, c, d, e, f)),
            _ => None,
        }
    }

    /// `self` applied first, then `rhs`.
    pub fn concat(self, rhs: Self) -> Self {
        Self {
            a: self.a * rhs.a + self.b * rhs.c,
            b: self.a * rhs.b + self.b * rhs.d,
            c: self.c * rhs.a + self.d * rhs.c,
            d: self.c * rhs.b + self.d * rhs.d,
            e: self.e * rhs.a + self.f * rhs.c + rhs.e,
            f: self.e * rhs.b + self.f * rhs.d + rhs.f,
        }
    }

    pub fn transform_point(self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn invert(self) -> Option<Self> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-9 {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Self {
            a,
            b,
            c,
            d,
            e: -(self.e * a + self.f * c),
            f: -(self.e * b + self.f * d),
        })
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: [u8; 3],
    stroke: [u8; 3],
    fill_alpha: f32,
    stroke_alpha: f32,
    text: TextParams,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            fill: [0, 0, 0],
            stroke: [0, 0, 0],
            fill_alpha: 1.0,
            stroke_alpha: 1.0,
            text: TextParams::default(),
        }
    }
}

/// Paths are kept in device space; `cm` cannot occur inside a path.
#[derive(Default)]
struct PathBuilder {
    subpaths: Vec<Vec<(f32, f32)>>,
    current: (f32, f32),
    start: (f32, f32),
}

impl PathBuilder {
    fn move_to(&mut self, ctm: Matrix, x: f32, y: f32) {
        self.subpaths.push(vec![ctm.transform_point(x, y)]);
        self.current = (x, y);
        self.start = (x, y);
    }

    fn line_to(&mut self, ctm: Matrix, x: f32, y: f32) {
        if self.subpaths.is_empty() {
            self.move_to(ctm, x, y);
            return;
        }
        if let Some(path) = self.subpaths.last_mut() {
            path.push(ctm.transform_point(x, y));
        }
        self.current = (x, y);
    }

    fn curve_to(&mut self, ctm: Matrix, c1: (f32, f32), c2: (f32, f32), end: (f32, f32)) {
        let p0 = self.current;
        for step in 1..=CURVE_STEPS {
            let t = step as f32 / CURVE_STEPS as f32;
            let u = 1.0 - t;
            let (w0, w1, w2, w3) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            let x = w0 * p0.0 + w1 * c1.0 + w2 * c2.0 + w3 * end.0;
            let y = w0 * p0.1 + w1 * c1.1 + w2 * c2.1 + w3 * end.1;
            self.line_to(ctm, x, y);
        }
        self.current = end;
    }

    fn rectangle(&mut self, ctm: Matrix, x: f32, y: f32, w: f32, h: f32) {
        self.move_to(ctm, x, y);
        self.line_to(ctm, x + w, y);
        self.line_to(ctm, x + w, y + h);
        self.line_to(ctm, x, y + h);
        self.close(ctm);
    }

    fn close(&mut self, ctm: Matrix) {
        let start = ctm.transform_point(self.start.0, self.start.1);
        if let Some(path) = self.subpaths.last_mut() {
            if path.last() != Some(&start) {
                path.push(start);
            }
        }
        self.current = self.start;
    }

    fn take(&mut self) -> Vec<Vec<(f32, f32)>> {
        std::mem::take(&mut self.subpaths)
    }
}

/// Rasterises one page at a time. Holds the canvas and interpreter state.
pub struct PageRasterizer<'a> {
    document: &'a Document,
    canvas: Blend<RgbaImage>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    path: PathBuilder,
    text: TextObject,
    fonts: HashMap<ObjectId, Arc<PdfFont>>,
    active_forms: HashSet<ObjectId>,
}

impl<'a> PageRasterizer<'a> {
    /// Paint `page` at `dpi` pixels per inch. The page's `/Rotate` is applied
    /// as a clockwise turn of the finished canvas.
    #[instrument(skip_all, fields(page = page.index + 1, dpi = dpi))]
    pub fn render(document: &'a Document, page: &PageInfo, dpi: u32) -> Result<DynamicImage> {
        let scale = dpi as f32 / 72.0;
        let width = (page.width * scale).round().max(1.0) as u32;
        let height = (page.height * scale).round().max(1.0) as u32;
        if u64::from(width) * u64::from(height) > MAX_CANVAS_PIXELS {
            return Err(EngineError::Resource(format!(
                "page {} at {dpi} dpi needs a {width}x{height} canvas",
                page.index + 1
            )));
        }

        let device = Matrix::new(
            scale,
            0.0,
            0.0,
            -scale,
            -page.origin.0 * scale,
            height as f32 + page.origin.1 * scale,
        );
        let mut rasterizer = Self {
            document,
            canvas: Blend(RgbaImage::from_pixel(width, height, WHITE)),
            state: GraphicsState::new(device),
            stack: Vec::new(),
            path: PathBuilder::default(),
            text: TextObject::default(),
            fonts: HashMap::new(),
            active_forms: HashSet::new(),
        };

        let content = document
            .get_page_content(page.id)
            .map_err(|err| EngineError::processing(format!("unreadable page content: {err}")))?;
        let operations = decode_content(&content);
        let resources = page_resources(document, page.id);
        rasterizer.run(&operations, &resources, 0);
        debug!(
            width,
            height,
            ops = operations.len(),
            fonts = rasterizer.fonts.len(),
            "Page painted"
        );

        Ok(ImageProcessor::from_dynamic(DynamicImage::ImageRgba8(rasterizer.canvas.0))
            .rotate_clockwise(page.rotation)
            .into_dynamic())
    }

    fn run(&mut self, operations: &[Operation], resources: &Dictionary, depth: usize) {
        for op in operations {
            let operands = op.operands.as_slice();
            let nums: Vec<f32> = operands.iter().filter_map(number).collect();
            let ctm = self.state.ctm;
            match (op.operator.as_str(), nums.as_slice()) {
                ("q", _) => self.stack.push(self.state.clone()),
                ("Q", _) => {
                    if let Some(previous) = self.stack.pop() {
                        self.state = previous;
                    }
                }
                ("cm", _) => {
                    if let Some(matrix) = Matrix::from_operands(operands) {
                        self.state.ctm = matrix.concat(ctm);
                    }
                }
                ("gs", _) => self.apply_ext_gstate(resources, operands),

                ("g", &[gray]) => self.state.fill = gray_rgb(gray),
                ("G", &[gray]) => self.state.stroke = gray_rgb(gray),
                ("rg", &[r, g, b]) => self.state.fill = rgb(r, g, b),
                ("RG", &[r, g, b]) => self.state.stroke = rgb(r, g, b),
                ("k", &[c, m, y, k]) => self.state.fill = cmyk_rgb(c, m, y, k),
                ("K", &[c, m, y, k]) => self.state.stroke = cmyk_rgb(c, m, y, k),
                ("sc" | "scn", components) => {
                    if let Some(colour) = components_rgb(components) {
                        self.state.fill = colour;
                    }
                }
                ("SC" | "SCN", components) => {
                    if let Some(colour) = components_rgb(components) {
                        self.state.stroke = colour;
                    }
                }

                ("m", &[x, y]) => self.path.move_to(ctm, x, y),
                ("l", &[x, y]) => self.path.line_to(ctm, x, y),
                ("c", &[x1, y1, x2, y2, x3, y3]) => {
                    self.path.curve_to(ctm, (x1, y1), (x2, y2), (x3, y3))
                }
                ("v", &[x2, y2, x3, y3]) => {
                    let current = self.path.current;
                    self.path.curve_to(ctm, current, (x2, y2), (x3, y3))
                }
                ("y", &[x1, y1, x3, y3]) => self.path.curve_to(ctm, (x1, y1), (x3, y3), (x3, y3)),
                ("re", &[x, y, w, h]) => self.path.rectangle(ctm, x, y, w, h),
                ("h", _) => self.path.close(ctm),

                ("f" | "F", _) => self.paint(Some(FillRule::NonZero), false),
                ("f*", _) => self.paint(Some(FillRule::EvenOdd), false),
                ("S", _) => self.paint(None, true),
                ("s", _) => {
                    self.path.close(ctm);
                    self.paint(None, true);
                }
                ("B", _) => self.paint(Some(FillRule::NonZero), true),
                ("B*", _) => self.paint(Some(FillRule::EvenOdd), true),
                ("b", _) => {
                    self.path.close(ctm);
                    self.paint(Some(FillRule::NonZero), true);
                }
                ("b*", _) => {
                    self.path.close(ctm);
                    self.paint(Some(FillRule::EvenOdd), true);
                }
                ("n", _) => {
                    self.path.take();
                }

                ("BT", _) => self.text = TextObject::default(),
                ("Tf", _) => self.set_font(resources, operands),
                ("Tc", &[spacing]) => self.state.text.char_spacing = spacing,
                ("Tw", &[spacing]) => self.state.text.word_spacing = spacing,
                ("Tz", &[scale]) => self.state.text.h_scale = scale / 100.0,
                ("TL", &[leading]) => self.state.text.leading = leading,
                ("Ts", &[rise]) => self.state.text.rise = rise,
                ("Tr", &[mode]) => self.state.text.render_mode = mode as i64,
                ("Td", &[tx, ty]) => self.text.move_line(tx, ty),
                ("TD", &[tx, ty]) => {
                    self.state.text.leading = -ty;
                    self.text.move_line(tx, ty);
                }
                ("Tm", _) => {
                    if let Some(matrix) = Matrix::from_operands(operands) {
                        self.text.set(matrix);
                    }
                }
                ("T*", _) => self.next_line(),
                ("Tj", _) => self.show_operand(operands.first()),
                ("'", _) => {
                    self.next_line();
                    self.show_operand(operands.first());
                }
                ("\"", &[word_spacing, char_spacing]) => {
                    self.state.text.word_spacing = word_spacing;
                    self.state.text.char_spacing = char_spacing;
                    self.next_line();
                    self.show_operand(operands.get(2));
                }
                ("TJ", _) => {
                    if let Some(Object::Array(items)) = operands.first() {
                        self.show_array(items);
                    }
                }

                ("Do", _) => {
                    if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                        self.draw_xobject(resources, name, depth);
                    }
                }
                _ => {}
            }
        }
    }

    fn apply_ext_gstate(&mut self, resources: &Dictionary, operands: &[Object]) {
        let Some(name) = operands.first().and_then(|o| o.as_name().ok()) else {
            return;
        };
        let Ok(states) = resources.get(b"ExtGState") else {
            return;
        };
        let states = resolve_dict(self.document, states);
        let Ok(state) = states.get(name) else {
            return;
        };
        let state = resolve_dict(self.document, state);
        if let Some(alpha) = state.get(b"ca").ok().and_then(number) {
            self.state.fill_alpha = alpha.clamp(0.0, 1.0);
        }
        if let Some(alpha) = state.get(b"CA").ok().and_then(number) {
            self.state.stroke_alpha = alpha.clamp(0.0, 1.0);
        }
    }

    fn paint(&mut self, fill: Option<FillRule>, stroke: bool) {
        let subpaths = self.path.take();
        if let Some(rule) = fill {
            let colour = with_alpha(self.state.fill, self.state.fill_alpha);
            fill_subpaths(&mut self.canvas.0, &subpaths, colour, rule);
        }
        if stroke {
            self.stroke_subpaths(&subpaths, false);
        }
    }

    fn stroke_subpaths(&mut self, subpaths: &[Vec<(f32, f32)>], closed: bool) {
        let colour = with_alpha(self.state.stroke, self.state.stroke_alpha);
        for subpath in subpaths {
            for segment in subpath.windows(2) {
                draw_line_segment_mut(&mut self.canvas, segment[0], segment[1], colour);
            }
            if let (true, Some(&first), Some(&last)) = (closed, subpath.first(), subpath.last()) {
                draw_line_segment_mut(&mut self.canvas, last, first, colour);
            }
        }
    }

    /// `Tf`. Fonts are loaded once per object; a name missing from the
    /// resources falls back to a sans face.
    fn set_font(&mut self, resources: &Dictionary, operands: &[Object]) {
        if let Some(size) = operands.get(1).and_then(number) {
            self.state.text.size = size;
        }
        let Some(name) = operands.first().and_then(|o| o.as_name().ok()) else {
            return;
        };
        let document = self.document;
        let fonts = resources
            .get(b"Font")
            .map(|fonts| resolve_dict(document, fonts))
            .unwrap_or_default();
        let font = match fonts.get(name) {
            Ok(Object::Reference(id)) => {
                let id = *id;
                self.fonts
                    .entry(id)
                    .or_insert_with(|| {
                        let dict = resolve_dict(document, &Object::Reference(id));
                        Arc::new(PdfFont::load(document, &dict))
                    })
                    .clone()
            }
            Ok(entry) => Arc::new(PdfFont::load(document, &resolve_dict(document, entry))),
            Err(_) => {
                debug!(font = %String::from_utf8_lossy(name), "Font resource missing");
                Arc::new(PdfFont::load(document, &Dictionary::new()))
            }
        };
        self.state.text.font = Some(font);
    }

    /// `T*`
    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.text.move_line(0.0, -leading);
    }

    fn show_operand(&mut self, operand: Option<&Object>) {
        if let Some(bytes) = operand.and_then(|o| o.as_str().ok()) {
            self.show_text(bytes);
        }
    }

    /// `TJ`: strings are shown, numbers move the pen back in thousandths
    /// of the font size.
    fn show_array(&mut self, items: &[Object]) {
        for item in items {
            match item {
                Object::String(bytes, _) => self.show_text(bytes),
                other => {
                    if let Some(adjust) = number(other) {
                        let params = &self.state.text;
                        self.text
                            .advance(-adjust / 1000.0 * params.size * params.h_scale);
                    }
                }
            }
        }
    }

    fn show_text(&mut self, bytes: &[u8]) {
        let outlines = text::layout(&self.state.text, &mut self.text, self.state.ctm, bytes);
        let paint = TextPaint::from_mode(self.state.text.render_mode);
        if outlines.is_empty() {
            return;
        }
        if paint.fills() {
            let colour = with_alpha(self.state.fill, self.state.fill_alpha);
            fill_subpaths(&mut self.canvas.0, &outlines, colour, FillRule::NonZero);
        }
        if paint.strokes() {
            self.stroke_subpaths(&outlines, true);
        }
    }

    fn draw_xobject(&mut self, resources: &Dictionary, name: &[u8], depth: usize) {
        let Ok(xobjects) = resources.get(b"XObject") else {
            return;
        };
        let xobjects = resolve_dict(self.document, xobjects);
        let Ok(Object::Reference(id)) = xobjects.get(name) else {
            return;
        };
        let document = self.document;
        let Ok(Object::Stream(stream)) = document.get_object(*id) else {
            return;
        };

        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => match xobject::decode_image(document, stream) {
                Ok(image) => self.draw_image(&image.to_rgba8()),
                Err(err) => warn!(?id, %err, "Skipping undecodable image"),
            },
            Ok(b"Form") => {
                if depth >= MAX_FORM_DEPTH || !self.active_forms.insert(*id) {
                    return;
                }
                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .map(|m| resolve(document, m))
                    .and_then(|m| m.as_array().ok())
                    .and_then(|m| Matrix::from_operands(m))
                    .unwrap_or(Matrix::IDENTITY);
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .map(|r| resolve_dict(document, r))
                    .unwrap_or_else(|_| resources.clone());
                let content = stream.get_plain_content().unwrap_or_default();

                let saved = self.state.clone();
                self.state.ctm = matrix.concat(saved.ctm);
                self.run(&decode_content(&content), &form_resources, depth + 1);
                self.state = saved;
                self.active_forms.remove(id);
            }
            _ => {}
        }
    }

    /// Map the unit square through the CTM and sample the image with
    /// nearest-neighbour lookup for every covered device pixel.
    fn draw_image(&mut self, image: &RgbaImage) {
        let ctm = self.state.ctm;
        let Some(inverse) = ctm.invert() else {
            return;
        };
        let (img_w, img_h) = image.dimensions();
        if img_w == 0 || img_h == 0 {
            return;
        }

        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
            .map(|(u, v)| ctm.transform_point(u, v));
        let canvas = &mut self.canvas.0;
        let (width, height) = canvas.dimensions();
        let (min_x, max_x) = pixel_span(corners.map(|p| p.0), width);
        let (min_y, max_y) = pixel_span(corners.map(|p| p.1), height);

        let alpha = self.state.fill_alpha;
        for py in min_y..max_y {
            for px in min_x..max_x {
                let (u, v) = inverse.transform_point(px as f32 + 0.5, py as f32 + 0.5);
                if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                    continue;
                }
                let sx = ((u * img_w as f32) as u32).min(img_w - 1);
                let sy = (((1.0 - v) * img_h as f32) as u32).min(img_h - 1);
                let mut sample = *image.get_pixel(sx, sy);
                sample.0[3] = (f32::from(sample.0[3]) * alpha).round() as u8;
                let target = canvas.get_pixel_mut(px, py);
                if sample.0[3] == u8::MAX {
                    *target = sample;
                } else {
                    target.blend(&sample);
                }
            }
        }
    }
}

/// Half-open pixel range covering `coords`, clipped to `0..limit`.
fn pixel_span(coords: [f32; 4], limit: u32) -> (u32, u32) {
    let low = coords.iter().copied().fold(f32::MAX, f32::min).floor();
    let high = coords.iter().copied().fold(f32::MIN, f32::max).ceil();
    let clip = |value: f32| value.clamp(0.0, limit as f32) as u32;
    (clip(low), clip(high))
}

fn decode_content(bytes: &[u8]) -> Vec<Operation> {
    match Content::decode(bytes) {
        Ok(content) => content.operations,
        Err(err) => {
            warn!(%err, "Content stream could not be parsed");
            Vec::new()
        }
    }
}

fn channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn gray_rgb(gray: f32) -> [u8; 3] {
    [channel(gray); 3]
}

fn rgb(r: f32, g: f32, b: f32) -> [u8; 3] {
    [channel(r), channel(g), channel(b)]
}

fn cmyk_rgb(c: f32, m: f32, y: f32, k: f32) -> [u8; 3] {
    let k = k.clamp(0.0, 1.0);
    rgb((1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k))
}

/// Colour from `sc`/`scn` operands, guessing the space from the count.
fn components_rgb(components: &[f32]) -> Option<[u8; 3]> {
    match *components {
        [gray] => Some(gray_rgb(gray)),
        [r, g, b] => Some(rgb(r, g, b)),
        [c, m, y, k] => Some(cmyk_rgb(c, m, y, k)),
        _ => None,
    }
}

fn with_alpha([r, g, b]: [u8; 3], alpha: f32) -> Rgba<u8> {
    Rgba([r, g, b, channel(alpha)])
}
