// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lightpdf-engine — Stateless PDF transformation engine.
//
// Provides page-range resolution, document operations over `lopdf` (merge,
// split, compress, rotate, watermark, encrypt, metadata, text and image
// extraction), rasterisation and image-to-PDF assembly, and zip packaging of
// multi-buffer results.

pub mod archive;
pub mod engine;
pub mod image;
pub mod pdf;
pub mod range;
pub mod raster;

#[cfg(test)]
mod fixtures;

// Re-export the primary entry points so callers can use `lightpdf_engine::PdfEngine` etc.
pub use self::image::ImageProcessor;
pub use engine::PdfEngine;
pub use pdf::{DocumentModel, PdfHandle};
pub use raster::PageRasterizer;
