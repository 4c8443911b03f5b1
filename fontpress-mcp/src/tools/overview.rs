//! Handler for the `font_overview` tool.

use serde_json::Value;

use super::argument_failure;
use crate::args::FontOverviewRequest;
use crate::backend::{ToolBackend, ToolFailure};

pub async fn font_overview<B: ToolBackend>(
    backend: &B,
    arguments: Option<&Value>,
) -> Result<Value, ToolFailure> {
    let request = FontOverviewRequest::from_arguments(arguments).map_err(argument_failure)?;
    backend.font_overview(request).await
}
