//! Handler for the `publish_font` tool.

use serde_json::Value;

use super::argument_failure;
use crate::args::PublishFontRequest;
use crate::backend::{ToolBackend, ToolFailure};

pub async fn publish_font<B: ToolBackend>(
    backend: &B,
    arguments: Option<&Value>,
) -> Result<Value, ToolFailure> {
    let request = PublishFontRequest::from_arguments(arguments).map_err(argument_failure)?;
    log::info!("publish_font: {}", request.post_script_name);
    backend.publish_font(request).await
}
