// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the lightpdf-engine crate. Input documents are
// assembled from synthetic images through the public API, so no binary
// fixtures are needed.

use std::io::Cursor;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgb, RgbImage};

use lightpdf_core::{AssemblySpec, CompressionLevel, RasterSpec, SplitSpec};
use lightpdf_engine::PdfEngine;
use lightpdf_engine::range;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode synthetic PNG");
    bytes
}

/// A document of `pages` pages, one 64x64 image each.
fn document(engine: &PdfEngine, pages: usize) -> Vec<u8> {
    let images = vec![png(64, 64); pages];
    engine
        .from_images(&images, &AssemblySpec::default())
        .expect("assemble benchmark document")
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Page-range parsing on a mixed expression against a large document.
fn bench_resolve(c: &mut Criterion) {
    c.bench_function("range::resolve (mixed, 500 pages)", |b| {
        b.iter(|| range::resolve(black_box(Some("1-3,5,7-10,40-400,499")), black_box(500)));
    });
}

/// Merging two 20-page documents with a reversed order.
fn bench_merge(c: &mut Criterion) {
    let engine = PdfEngine::default();
    let inputs = vec![document(&engine, 20), document(&engine, 20)];
    c.bench_function("merge (2 x 20 pages)", |b| {
        b.iter(|| engine.merge(black_box(&inputs), Some(&[1, 0])));
    });
}

/// Splitting a 30-page document into four chunks.
fn bench_split(c: &mut Criterion) {
    let engine = PdfEngine::default();
    let input = document(&engine, 30);
    let spec = SplitSpec::by_chunks(4);
    c.bench_function("split (30 pages, 4 chunks)", |b| {
        b.iter(|| engine.split(black_box(&input), &spec));
    });
}

/// Rotating every page of a 30-page document.
fn bench_rotate(c: &mut Criterion) {
    let engine = PdfEngine::default();
    let input = document(&engine, 30);
    c.bench_function("rotate (30 pages, 90)", |b| {
        b.iter(|| engine.rotate(black_box(&input), 90, None));
    });
}

/// Recompressing a single large image.
fn bench_compress(c: &mut Criterion) {
    let engine = PdfEngine::default();
    let input = engine
        .from_images(&[png(600, 400)], &AssemblySpec::default())
        .expect("assemble benchmark document");
    c.bench_function("compress (600x400 image, medium)", |b| {
        b.iter(|| engine.compress(black_box(&input), CompressionLevel::Medium, Some(150)));
    });
}

/// Rasterising one page at a low resolution.
fn bench_to_images(c: &mut Criterion) {
    let engine = PdfEngine::default();
    let input = document(&engine, 1);
    let spec = RasterSpec {
        dpi: 72,
        ..RasterSpec::default()
    };
    c.bench_function("to_images (1 page, 72 dpi)", |b| {
        b.iter(|| engine.to_images(black_box(&input), &spec));
    });
}

criterion_group!(
    benches,
    bench_resolve,
    bench_merge,
    bench_split,
    bench_rotate,
    bench_compress,
    bench_to_images
);
criterion_main!(benches);
