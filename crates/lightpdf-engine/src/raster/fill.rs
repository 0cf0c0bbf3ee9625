// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanline polygon fill over device-space subpaths.

use image::{Pixel, Rgba, RgbaImage};

/// Which points of a self-overlapping path count as inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

impl FillRule {
    fn inside(self, winding: i32) -> bool {
        match self {
            Self::NonZero => winding != 0,
            Self::EvenOdd => winding % 2 != 0,
        }
    }
}

struct Edge {
    /// Endpoint with the smaller y.
    low: (f32, f32),
    high: (f32, f32),
    winding: i32,
}

/// Fill every pixel whose centre lies inside the union of `subpaths`. Each
/// subpath is closed implicitly.
pub fn fill_subpaths(
    canvas: &mut RgbaImage,
    subpaths: &[Vec<(f32, f32)>],
    colour: Rgba<u8>,
    rule: FillRule,
) {
    let edges = edges(subpaths);
    if edges.is_empty() || colour.0[3] == 0 {
        return;
    }

    let (width, height) = canvas.dimensions();
    let top = edges.iter().map(|e| e.low.1).fold(f32::MAX, f32::min);
    let bottom = edges.iter().map(|e| e.high.1).fold(f32::MIN, f32::max);
    let first_row = top.floor().clamp(0.0, height as f32) as u32;
    let last_row = bottom.ceil().clamp(0.0, height as f32) as u32;

    let mut crossings: Vec<(f32, i32)> = Vec::new();
    for row in first_row..last_row {
        let y = row as f32 + 0.5;
        crossings.clear();
        for edge in &edges {
            if y < edge.low.1 || y >= edge.high.1 {
                continue;
            }
            let t = (y - edge.low.1) / (edge.high.1 - edge.low.1);
            crossings.push((edge.low.0 + t * (edge.high.0 - edge.low.0), edge.winding));
        }
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut winding = 0;
        for pair in crossings.windows(2) {
            winding += pair[0].1;
            if !rule.inside(winding) {
                continue;
            }
            let start = (pair[0].0 - 0.5).ceil().clamp(0.0, width as f32) as u32;
            let end = (pair[1].0 - 0.5).ceil().clamp(0.0, width as f32) as u32;
            for x in start..end {
                paint(canvas, x, row, colour);
            }
        }
    }
}

fn edges(subpaths: &[Vec<(f32, f32)>]) -> Vec<Edge> {
    let mut edges = Vec::new();
    for path in subpaths {
        let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
            continue;
        };
        let segments = path
            .windows(2)
            .map(|w| (w[0], w[1]))
            .chain(std::iter::once((last, first)));
        for (from, to) in segments {
            if from.1 == to.1 {
                continue;
            }
            edges.push(if from.1 < to.1 {
                Edge {
                    low: from,
                    high: to,
                    winding: 1,
                }
            } else {
                Edge {
                    low: to,
                    high: from,
                    winding: -1,
                }
            });
        }
    }
    edges
}

/// Opaque colours are written as-is; translucent ones are blended.
pub fn paint(canvas: &mut RgbaImage, x: u32, y: u32, colour: Rgba<u8>) {
    let target = canvas.get_pixel_mut(x, y);
    if colour.0[3] == u8::MAX {
        *target = colour;
    } else {
        target.blend(&colour);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn blank(size: u32) -> RgbaImage {
        RgbaImage::from_pixel(size, size, Rgba([255, 255, 255, 255]))
    }

    fn square(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<(f32, f32)> {
        vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
    }

    fn square_reversed(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<(f32, f32)> {
        vec![(x0, y0), (x0, y1), (x1, y1), (x1, y0)]
    }

    #[test]
    fn square_covers_pixel_centres() {
        let mut canvas = blank(10);
        fill_subpaths(&mut canvas, &[square(2.0, 2.0, 5.0, 5.0)], BLACK, FillRule::NonZero);
        assert_eq!(canvas.get_pixel(2, 2).0, [0, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(4, 4).0, [0, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(5, 5).0, [255, 255, 255, 255]);
        assert_eq!(canvas.get_pixel(1, 3).0, [255, 255, 255, 255]);
    }

    #[test]
    fn counter_wound_hole_stays_empty() {
        let mut canvas = blank(12);
        let ring = [square(1.0, 1.0, 11.0, 11.0), square_reversed(4.0, 4.0, 8.0, 8.0)];
        fill_subpaths(&mut canvas, &ring, BLACK, FillRule::NonZero);
        assert_eq!(canvas.get_pixel(2, 6).0, [0, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(6, 6).0, [255, 255, 255, 255]);
    }

    #[test]
    fn even_odd_cuts_same_direction_hole() {
        let ring = [square(1.0, 1.0, 11.0, 11.0), square(4.0, 4.0, 8.0, 8.0)];

        let mut nonzero = blank(12);
        fill_subpaths(&mut nonzero, &ring, BLACK, FillRule::NonZero);
        assert_eq!(nonzero.get_pixel(6, 6).0, [0, 0, 0, 255]);

        let mut even_odd = blank(12);
        fill_subpaths(&mut even_odd, &ring, BLACK, FillRule::EvenOdd);
        assert_eq!(even_odd.get_pixel(6, 6).0, [255, 255, 255, 255]);
    }

    #[test]
    fn off_canvas_geometry_is_clipped() {
        let mut canvas = blank(4);
        fill_subpaths(&mut canvas, &[square(-10.0, -10.0, 50.0, 2.0)], BLACK, FillRule::NonZero);
        assert_eq!(canvas.get_pixel(3, 1).0, [0, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(3, 2).0, [255, 255, 255, 255]);
    }
}
