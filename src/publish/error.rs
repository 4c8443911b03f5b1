//! Publish failures: the first fatal stage error plus the warnings collected
//! before it.

use std::fmt;

use fontpress_fonts::{CatalogError, ConversionError, TransformError};
use fontpress_mcp::ToolFailure;
use fontpress_store::{StoreError, UploadError};
use serde::Serialize;
use thiserror::Error;

use super::artifacts::GenerateError;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Arguments,
    Resolve,
    Transform,
    Convert,
    Upload,
    Generate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Arguments => "arguments",
            Stage::Resolve => "resolve",
            Stage::Transform => "transform",
            Stage::Convert => "convert",
            Stage::Upload => "upload",
            Stage::Generate => "generate",
        };
        f.write_str(name)
    }
}

/// `Clone` so every caller coalesced onto one publish receives the failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{stage} failed ({kind}): {message}")]
pub struct PublishError {
    pub stage: Stage,
    pub kind: String,
    pub message: String,
    pub warnings: Vec<String>,
}

impl PublishError {
    pub fn new(stage: Stage, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind: kind.into(),
            message: message.into(),
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// A task or runtime failure outside the stage's own error taxonomy.
    pub fn internal(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, "internal", message)
    }

    pub fn arguments(message: impl Into<String>) -> Self {
        Self::new(Stage::Arguments, "invalid_arguments", message)
    }
}

impl From<CatalogError> for PublishError {
    fn from(err: CatalogError) -> Self {
        Self::new(Stage::Resolve, err.kind(), err.to_string())
    }
}

impl From<TransformError> for PublishError {
    fn from(err: TransformError) -> Self {
        Self::new(Stage::Transform, err.step.to_string(), err.reason)
    }
}

impl From<ConversionError> for PublishError {
    fn from(err: ConversionError) -> Self {
        let kind = match &err {
            ConversionError::Read { .. } => "read",
            ConversionError::InvalidFont(_) => "invalid_font",
            ConversionError::Codec(_) => "codec",
        };
        Self::new(Stage::Convert, kind, err.to_string())
    }
}

impl From<UploadError> for PublishError {
    fn from(err: UploadError) -> Self {
        Self::new(Stage::Upload, err.cause.kind(), err.to_string())
    }
}

impl From<StoreError> for PublishError {
    fn from(err: StoreError) -> Self {
        Self::new(Stage::Upload, err.kind(), err.to_string())
    }
}

impl From<GenerateError> for PublishError {
    fn from(err: GenerateError) -> Self {
        Self::new(Stage::Generate, "invalid_input", err.to_string())
    }
}

impl From<PublishError> for ToolFailure {
    fn from(err: PublishError) -> Self {
        ToolFailure::new(err.stage.to_string(), err.kind, err.message).with_warnings(err.warnings)
    }
}
