//! Tool registration, descriptors, and dispatch for the MCP server.
//!
//! This module owns the tool registry: it builds the `tools/list` response and
//! dispatches `tools/call` requests to the appropriate per-tool handler.

pub mod families;
pub mod overview;
pub mod publish;

use serde_json::Value;

use crate::backend::{ToolBackend, ToolFailure};

// ---------------------------------------------------------------------------
// Tool descriptors
// ---------------------------------------------------------------------------

fn list_families_tool() -> Value {
    serde_json::json!({
        "name": "list_families",
        "description": "List installed font families with their face count.",
        "inputSchema": {"type": "object", "properties": {}}
    })
}

fn faces_for_family_tool() -> Value {
    serde_json::json!({
        "name": "faces_for_family",
        "description": "List the faces of one installed family: PostScript name, style, weight, width, variable axes, license and embedding permissions.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "family": {"type": "string", "description": "Family name, e.g. \"Helvetica\""}
            },
            "required": ["family"]
        }
    })
}

fn font_overview_tool() -> Value {
    serde_json::json!({
        "name": "font_overview",
        "description": "Describe one installed face: names, version, license, glyph count, variable axes and named instances, OpenType tables and color formats.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "postScriptName": {"type": "string"}
            },
            "required": ["postScriptName"]
        }
    })
}

fn publish_font_tool() -> Value {
    serde_json::json!({
        "name": "publish_font",
        "description": "Convert an installed face to WOFF2 (optionally subset, instanced or unhinted), upload it under a content-addressed key and return its URL, an @font-face rule and an HTML preview.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "postScriptName": {"type": "string"},
                "convert": {
                    "type": "object",
                    "properties": {
                        "subset_mode": {"type": "string", "enum": ["text", "unicodes", "ranges", "language"]},
                        "text": {"type": "string"},
                        "unicodes": {"type": "array", "items": {"type": "string"}, "description": "Code points such as \"U+0041\" or \"0041\""},
                        "ranges": {"type": "array", "items": {"type": "string"}, "description": "Ranges such as \"U+0000-00FF\""},
                        "language": {"type": "string", "description": "latin, latin-ext, cyrillic, greek, vietnamese or an ISO code such as de, ru, el"},
                        "drop_hints": {"type": "boolean"},
                        "retain_gsub_gpos": {"type": "boolean", "default": true},
                        "target_axes": {"type": "object", "additionalProperties": {"type": "number"}, "description": "Axis tag or name to value"},
                        "named_instance": {"type": "string"}
                    }
                },
                "publish": {
                    "type": "object",
                    "properties": {
                        "bucket": {"type": "string"},
                        "prefix": {"type": "string"},
                        "region": {"type": "string"},
                        "public": {"type": "boolean"},
                        "cache_seconds": {"type": "integer", "minimum": 0},
                        "overwrite": {"type": "boolean"}
                    }
                }
            },
            "required": ["postScriptName", "publish"]
        }
    })
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Handle the `tools/list` request.
pub fn handle_tools_list() -> Value {
    serde_json::json!({
        "tools": [
            list_families_tool(),
            faces_for_family_tool(),
            font_overview_tool(),
            publish_font_tool()
        ]
    })
}

/// Handle the `tools/call` request.
pub async fn handle_tools_call<B: ToolBackend>(backend: &B, params: Option<Value>) -> Value {
    let params = match params {
        Some(p) => p,
        None => {
            return tool_error("Missing params for tools/call");
        }
    };

    let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
    let arguments = params.get("arguments");

    let outcome = match name {
        "list_families" => families::list_families(backend).await,
        "faces_for_family" => families::faces_for_family(backend, arguments).await,
        "font_overview" => overview::font_overview(backend, arguments).await,
        "publish_font" => publish::publish_font(backend, arguments).await,
        _ => return tool_error(&format!("Unknown tool: {name}")),
    };
    match outcome {
        Ok(value) => tool_result(&value),
        Err(failure) => {
            log::warn!("Tool {} failed: {}", name, failure);
            tool_failure(&failure)
        }
    }
}

// ---------------------------------------------------------------------------
// Result helpers
// ---------------------------------------------------------------------------

/// Build a tool error result from a plain message.
pub fn tool_error(message: &str) -> Value {
    serde_json::json!({
        "isError": true,
        "content": [{
            "type": "text",
            "text": message
        }]
    })
}

/// Build a tool error result carrying a structured failure body.
pub fn tool_failure(failure: &ToolFailure) -> Value {
    let body = serde_json::to_string_pretty(failure).unwrap_or_else(|_| failure.to_string());
    serde_json::json!({
        "isError": true,
        "content": [{
            "type": "text",
            "text": body
        }]
    })
}

/// Build a successful tool result with the JSON value as text.
pub fn tool_result(value: &Value) -> Value {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    serde_json::json!({
        "content": [{
            "type": "text",
            "text": text
        }],
        "structuredContent": value
    })
}

fn argument_failure(err: crate::args::ArgumentError) -> ToolFailure {
    ToolFailure::new("arguments", "invalid_arguments", err.0)
}
