// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text layout for the rasteriser — turns shown strings into device-space
// glyph outlines and keeps the text matrices moving.

use std::sync::Arc;

use ttf_parser::{Face, GlyphId, OutlineBuilder};

use super::font::{GLYPH_UNITS, PdfFont};
use super::render::Matrix;

/// Line segments per quadratic curve in a glyph outline.
const QUAD_STEPS: usize = 8;
/// Line segments per cubic curve in a glyph outline.
const CUBIC_STEPS: usize = 12;

/// Text parameters that live in the graphics state.
#[derive(Debug, Clone)]
pub struct TextParams {
    pub font: Option<Arc<PdfFont>>,
    pub size: f32,
    pub char_spacing: f32,
    pub word_spacing: f32,
    /// `Tz` as a fraction, 1.0 is unscaled.
    pub h_scale: f32,
    pub leading: f32,
    pub rise: f32,
    pub render_mode: i64,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            render_mode: 0,
        }
    }
}

/// How glyphs are painted under a `Tr` mode. Clipping modes paint like
/// their non-clipping counterparts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPaint {
    Fill,
    Stroke,
    FillStroke,
    Invisible,
}

impl TextPaint {
    pub fn from_mode(mode: i64) -> Self {
        match mode.rem_euclid(4) {
            0 => Self::Fill,
            1 => Self::Stroke,
            2 => Self::FillStroke,
            _ => Self::Invisible,
        }
    }

    pub fn fills(self) -> bool {
        matches!(self, Self::Fill | Self::FillStroke)
    }

    pub fn strokes(self) -> bool {
        matches!(self, Self::Stroke | Self::FillStroke)
    }
}

/// Text matrix and text line matrix of the current text object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextObject {
    pub matrix: Matrix,
    pub line_matrix: Matrix,
}

impl Default for TextObject {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
        }
    }
}

impl TextObject {
    /// `Td`: start a new line offset from the start of the current one.
    pub fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).concat(self.line_matrix);
        self.matrix = self.line_matrix;
    }

    /// `Tm`
    pub fn set(&mut self, matrix: Matrix) {
        self.matrix = matrix;
        self.line_matrix = matrix;
    }

    /// Move the pen along the baseline by `tx` text space units.
    pub fn advance(&mut self, tx: f32) {
        self.matrix = Matrix::translate(tx, 0.0).concat(self.matrix);
    }
}

/// Lay out `bytes` with the current font and advance `text` past them.
/// Returns the outlines of every glyph in device space.
///
/// Glyphs with no outline source are drawn as solid boxes of their advance
/// width and half an em tall.
pub fn layout(
    params: &TextParams,
    text: &mut TextObject,
    ctm: Matrix,
    bytes: &[u8],
) -> Vec<Vec<(f32, f32)>> {
    let Some(font) = params.font.as_deref() else {
        return Vec::new();
    };
    let face = font.program().and_then(|data| Face::parse(data, 0).ok());
    let font_matrix = Matrix::new(
        params.size * params.h_scale,
        0.0,
        0.0,
        params.size,
        0.0,
        params.rise,
    );

    let mut subpaths = Vec::new();
    for code in font.codes(bytes) {
        let advance = font.advance(code, face.as_ref());
        let render = font_matrix.concat(text.matrix).concat(ctm);
        let glyph = face
            .as_ref()
            .and_then(|face| font.glyph(face, code).map(|id| (face, id)));
        match glyph {
            Some((face, id)) => subpaths.extend(outline(face, id, render)),
            None if !font.is_word_space(code) => subpaths.push(glyph_box(advance, render)),
            None => {}
        }

        let mut tx = advance / GLYPH_UNITS * params.size + params.char_spacing;
        if font.is_word_space(code) {
            tx += params.word_spacing;
        }
        text.advance(tx * params.h_scale);
    }
    subpaths
}

fn glyph_box(advance: f32, render: Matrix) -> Vec<(f32, f32)> {
    let width = advance / GLYPH_UNITS;
    let (left, right) = (width * 0.1, width * 0.9);
    [(left, 0.0), (right, 0.0), (right, 0.5), (left, 0.5)]
        .into_iter()
        .map(|(x, y)| render.transform_point(x, y))
        .collect()
}

fn outline(face: &Face<'_>, glyph: GlyphId, render: Matrix) -> Vec<Vec<(f32, f32)>> {
    let scale = 1.0 / f32::from(face.units_per_em().max(1));
    let mut builder = GlyphOutline {
        transform: Matrix::new(scale, 0.0, 0.0, scale, 0.0, 0.0).concat(render),
        subpaths: Vec::new(),
        current: (0.0, 0.0),
    };
    face.outline_glyph(glyph, &mut builder);
    builder.subpaths
}

/// Collects a glyph outline as flattened device-space subpaths.
struct GlyphOutline {
    transform: Matrix,
    subpaths: Vec<Vec<(f32, f32)>>,
    /// Last point in font units.
    current: (f32, f32),
}

impl GlyphOutline {
    fn push(&mut self, x: f32, y: f32) {
        let point = self.transform.transform_point(x, y);
        match self.subpaths.last_mut() {
            Some(path) => path.push(point),
            None => self.subpaths.push(vec![point]),
        }
        self.current = (x, y);
    }
}

impl OutlineBuilder for GlyphOutline {
    fn move_to(&mut self, x: f32, y: f32) {
        self.subpaths.push(Vec::new());
        self.push(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.push(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x0, y0) = self.current;
        for step in 1..=QUAD_STEPS {
            let t = step as f32 / QUAD_STEPS as f32;
            let u = 1.0 - t;
            let (w0, w1, w2) = (u * u, 2.0 * u * t, t * t);
            self.push(w0 * x0 + w1 * x1 + w2 * x, w0 * y0 + w1 * y1 + w2 * y);
        }
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x0, y0) = self.current;
        for step in 1..=CUBIC_STEPS {
            let t = step as f32 / CUBIC_STEPS as f32;
            let u = 1.0 - t;
            let (w0, w1, w2, w3) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            self.push(
                w0 * x0 + w1 * x1 + w2 * x2 + w3 * x,
                w0 * y0 + w1 * y1 + w2 * y2 + w3 * y,
            );
        }
    }

    fn close(&mut self) {}
}
