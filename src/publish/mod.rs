//! The publish pipeline.
//!
//! - [`request`] maps validated tool arguments onto [`PublishRequest`]
//! - [`orchestrator`] runs the stages with single-flight coalescing
//! - [`artifacts`] renders the `@font-face` rule and HTML preview
//! - [`error`] carries the failing stage and the warnings gathered so far

pub mod artifacts;
pub mod error;
pub mod orchestrator;
pub mod request;

use std::collections::BTreeMap;

use fontpress_store::UploadResult;
use serde::Serialize;

pub use artifacts::{ArtifactGenerator, Artifacts, GenerateError};
pub use error::{PublishError, Stage};
pub use orchestrator::{Publisher, PublisherSettings, SCRATCH_PREFIX};
pub use request::{PublishRequest, build_request};

/// A completed publish. Returned whole or not at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishResult {
    pub post_script_name: String,
    pub woff2_url: String,
    pub css: String,
    pub sample_html: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub source_size_bytes: u64,
    pub upload: UploadResult,
    /// Axis location a variable face was pinned at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<BTreeMap<String, f32>>,
    pub warnings: Vec<String>,
}
