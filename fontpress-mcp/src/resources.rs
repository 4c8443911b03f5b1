//! MCP resources: `font://families`.

use serde_json::Value;

use crate::backend::ToolBackend;

pub const FAMILIES_URI: &str = "font://families";

/// Handle the `resources/list` request.
pub fn handle_resources_list() -> Value {
    serde_json::json!({
        "resources": [{
            "uri": FAMILIES_URI,
            "name": "families",
            "description": "Installed font families and their face counts",
            "mimeType": "application/json"
        }]
    })
}

/// Handle `resources/read`. `Err` carries a JSON-RPC error code and message.
pub async fn handle_resources_read<B: ToolBackend>(
    backend: &B,
    params: Option<Value>,
) -> Result<Value, (i64, String)> {
    let uri = params
        .as_ref()
        .and_then(|p| p.get("uri"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            (
                crate::jsonrpc::INVALID_PARAMS,
                "Missing 'uri' in resources/read params".to_string(),
            )
        })?;

    if uri != FAMILIES_URI {
        return Err((
            crate::jsonrpc::RESOURCE_NOT_FOUND,
            format!("Resource not found: {uri}"),
        ));
    }

    let families = backend
        .list_families()
        .await
        .map_err(|failure| (crate::jsonrpc::INTERNAL_ERROR, failure.to_string()))?;
    let text = serde_json::to_string_pretty(&families)
        .map_err(|e| (crate::jsonrpc::INTERNAL_ERROR, e.to_string()))?;
    Ok(serde_json::json!({
        "contents": [{
            "uri": FAMILIES_URI,
            "mimeType": "application/json",
            "text": text
        }]
    }))
}
