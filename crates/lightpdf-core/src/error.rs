// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Lightpdf.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    // -- Caller input --
    /// Malformed page range, bad merge order, disallowed angle/opacity/
    /// encryption level/permission, conflicting or missing content.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Input is not a PDF, or an embedded image cannot be decoded.
    #[error("unsupported or corrupt format: {0}")]
    Format(String),

    /// Input exceeds a configured limit.
    #[error("resource limit exceeded: {0}")]
    Resource(String),

    // -- Document model --
    /// The PDF library failed while reading or mutating structure.
    #[error("PDF processing failed: {0}")]
    Processing(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification the outer layer maps onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Format,
    Resource,
    Processing,
}

impl EngineError {
    /// Taxonomy kind of this error. I/O and serialization failures count as
    /// processing failures.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Format(_) => ErrorKind::Format,
            Self::Resource(_) => ErrorKind::Resource,
            Self::Processing(_) | Self::Io(_) | Self::Serialization(_) => ErrorKind::Processing,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing(message.into())
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EngineError>;
