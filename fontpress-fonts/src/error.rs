//! Typed error types for fontpress-fonts.
//!
//! Each pipeline stage owned by this crate has its own error type so the
//! orchestrator can report which stage failed and why without string matching.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use write_fonts::read::ReadError;
use write_fonts::types::Tag;

// ---------------------------------------------------------------------------
// Catalog / lookup
// ---------------------------------------------------------------------------

/// Errors produced by the face index and family cache.
///
/// `Clone` because a single enumeration result is shared by every caller
/// waiting on the same refresh.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// No face with the given PostScript name exists in the current snapshot.
    #[error("font face not found: {0}")]
    NotFound(String),

    /// No family with the given name exists in the current snapshot.
    #[error("font family not found: {0}")]
    FamilyNotFound(String),

    /// The font catalog could not be enumerated and no earlier snapshot exists.
    #[error("font catalog unavailable: {0}")]
    Enumeration(String),
}

impl CatalogError {
    /// Stable machine-readable kind used in tool error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::NotFound(_) => "not_found",
            CatalogError::FamilyNotFound(_) => "family_not_found",
            CatalogError::Enumeration(_) => "enumeration",
        }
    }
}

// ---------------------------------------------------------------------------
// sfnt tables
// ---------------------------------------------------------------------------

/// Problems reading or rebuilding an sfnt font.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SfntError {
    #[error("font data could not be read: {0}")]
    Read(String),

    #[error("font has no tables")]
    Empty,

    #[error("table '{0}' is malformed")]
    Malformed(Tag),

    #[error("table '{tag}' could not be written: {reason}")]
    Write { tag: Tag, reason: String },
}

impl From<ReadError> for SfntError {
    fn from(err: ReadError) -> Self {
        SfntError::Read(err.to_string())
    }
}

/// Errors reading a font file from disk for inspection.
#[derive(Debug, Error)]
pub enum FontFileError {
    #[error("failed to read font file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("font '{path}' could not be parsed: {reason}")]
    Parse { path: PathBuf, reason: String },
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// The transform step that was running when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformStep {
    Read,
    Subset,
    Instance,
    DropHints,
    Write,
}

impl fmt::Display for TransformStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransformStep::Read => "read",
            TransformStep::Subset => "subset",
            TransformStep::Instance => "instance",
            TransformStep::DropHints => "drop_hints",
            TransformStep::Write => "write",
        };
        f.write_str(name)
    }
}

/// A transform step failed; the chain was aborted and no file was produced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transform step '{step}' failed: {reason}")]
pub struct TransformError {
    pub step: TransformStep,
    pub reason: String,
}

impl TransformError {
    pub fn new(step: TransformStep, reason: impl Into<String>) -> Self {
        Self {
            step,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// WOFF2 conversion failures. Never recovered by shipping the source font.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input is not a convertible font: {0}")]
    InvalidFont(String),

    #[error("WOFF2 encoding failed: {0}")]
    Codec(String),
}

impl From<SfntError> for ConversionError {
    fn from(err: SfntError) -> Self {
        ConversionError::InvalidFont(err.to_string())
    }
}
