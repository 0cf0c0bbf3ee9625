// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Settings the engine is constructed with.
///
/// The engine keeps no state between calls; this record only carries limits
/// and defaults that every operation consults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scratch directory handed to collaborators that need files on disk.
    pub temp_dir: PathBuf,
    /// Largest accepted input buffer, in bytes.
    pub max_upload_size: u64,
    /// Rasterisation resolution used when the caller does not pick one.
    pub default_dpi: u32,
    /// Accepted rasterisation resolutions (inclusive).
    pub min_dpi: u32,
    pub max_dpi: u32,
    /// Accepted compression targets (inclusive).
    pub compress_min_dpi: u32,
    pub compress_max_dpi: u32,
    /// Compression target used when the caller does not pick one.
    pub compress_default_dpi: u32,
    /// Largest page margin accepted by image assembly, in points.
    pub max_margin: u32,
    /// Most documents a single merge accepts.
    pub max_merge_files: usize,
    /// Most images a single assembly accepts.
    pub max_images: usize,
    /// Title written into documents the engine creates from scratch.
    pub document_title: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("/tmp/pdf-api"),
            max_upload_size: 50 * 1024 * 1024,
            default_dpi: 200,
            min_dpi: 72,
            max_dpi: 600,
            compress_min_dpi: 72,
            compress_max_dpi: 300,
            compress_default_dpi: 150,
            max_margin: 100,
            max_merge_files: 20,
            max_images: 50,
            document_title: "Lightpdf Document".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration document. Missing keys fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configured ranges are internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.max_upload_size == 0 {
            return Err(EngineError::validation("max_upload_size must be positive"));
        }
        if self.min_dpi == 0 || self.min_dpi > self.max_dpi {
            return Err(EngineError::validation(format!(
                "invalid rasterisation DPI range {}..={}",
                self.min_dpi, self.max_dpi
            )));
        }
        if !(self.min_dpi..=self.max_dpi).contains(&self.default_dpi) {
            return Err(EngineError::validation(format!(
                "default_dpi {} outside {}..={}",
                self.default_dpi, self.min_dpi, self.max_dpi
            )));
        }
        if self.max_merge_files == 0 || self.max_images == 0 {
            return Err(EngineError::validation(
                "max_merge_files and max_images must be positive",
            ));
        }
        if self.compress_min_dpi == 0 || self.compress_min_dpi > self.compress_max_dpi {
            return Err(EngineError::validation(format!(
                "invalid compression DPI range {}..={}",
                self.compress_min_dpi, self.compress_max_dpi
            )));
        }
        if !(self.compress_min_dpi..=self.compress_max_dpi).contains(&self.compress_default_dpi) {
            return Err(EngineError::validation(format!(
                "compress_default_dpi {} outside {}..={}",
                self.compress_default_dpi, self.compress_min_dpi, self.compress_max_dpi
            )));
        }
        Ok(())
    }
}
