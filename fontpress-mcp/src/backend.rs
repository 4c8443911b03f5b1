//! The seam between the MCP surface and the font service.

use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::args::{FacesForFamilyRequest, FontOverviewRequest, PublishFontRequest};

/// A failed tool call, rendered to the client as an `isError` result whose
/// text is this struct as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{stage} failed ({kind}): {message}")]
pub struct ToolFailure {
    /// Pipeline stage that failed, e.g. `resolve`, `upload`, `arguments`.
    pub stage: String,
    /// Error kind within the stage, e.g. `not_found`, `transient`.
    pub kind: String,
    pub message: String,
    pub warnings: Vec<String>,
}

impl ToolFailure {
    pub fn new(
        stage: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage: stage.into(),
            kind: kind.into(),
            message: message.into(),
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Operations the tools expose. Results are JSON values ready to return.
pub trait ToolBackend: Send + Sync + 'static {
    fn list_families(&self) -> impl Future<Output = Result<Value, ToolFailure>> + Send;

    fn faces_for_family(
        &self,
        request: FacesForFamilyRequest,
    ) -> impl Future<Output = Result<Value, ToolFailure>> + Send;

    fn font_overview(
        &self,
        request: FontOverviewRequest,
    ) -> impl Future<Output = Result<Value, ToolFailure>> + Send;

    fn publish_font(
        &self,
        request: PublishFontRequest,
    ) -> impl Future<Output = Result<Value, ToolFailure>> + Send;
}
