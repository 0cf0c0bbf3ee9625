// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lightpdf — Core types, operation parameters, and error definitions shared by
// the engine and whatever outer layer drives it.

pub mod config;
pub mod error;
pub mod params;
pub mod types;

pub use config::EngineConfig;
pub use error::{EngineError, ErrorKind, Result};
pub use params::*;
pub use types::*;
