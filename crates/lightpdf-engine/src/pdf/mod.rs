// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — document handle, page assembly, and the per-document
// transformations built on it.

pub mod assemble;
pub mod compress;
pub mod extract;
pub mod handle;
pub mod metadata;
pub mod security;
pub mod transform;
pub mod watermark;
pub mod xobject;

pub use assemble::PageAssembler;
pub use handle::{DocumentModel, ImageRef, PageInfo, PdfHandle};
