//! Handlers for the `list_families` and `faces_for_family` tools.

use serde_json::Value;

use super::argument_failure;
use crate::args::FacesForFamilyRequest;
use crate::backend::{ToolBackend, ToolFailure};

pub async fn list_families<B: ToolBackend>(backend: &B) -> Result<Value, ToolFailure> {
    backend.list_families().await
}

pub async fn faces_for_family<B: ToolBackend>(
    backend: &B,
    arguments: Option<&Value>,
) -> Result<Value, ToolFailure> {
    let request = FacesForFamilyRequest::from_arguments(arguments).map_err(argument_failure)?;
    backend.faces_for_family(request).await
}
