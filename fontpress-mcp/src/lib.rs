//! Minimal MCP (Model Context Protocol) server over stdio.
//!
//! Reads line-delimited JSON-RPC 2.0 from stdin and writes responses to stdout.
//! Exposes font tools backed by a [`ToolBackend`]:
//! - `list_families`: installed families with face counts
//! - `faces_for_family`: the faces of one family, enriched from the font files
//! - `font_overview`: details of one face
//! - `publish_font`: convert, upload and emit `@font-face` CSS for one face
//!
//! and the `font://families` resource.
//!
//! Every request runs as its own task so a slow publish does not block
//! listing calls; responses are written in completion order.
//!
//! # Module layout
//!
//! - [`jsonrpc`]: JSON-RPC 2.0 wire types, response helpers, and line framing
//! - [`args`]: strict argument parsing into typed requests
//! - [`backend`]: the [`ToolBackend`] trait and [`ToolFailure`]
//! - [`tools`]: tool registration, descriptors, and dispatch
//! - [`resources`]: the `font://families` resource

pub mod args;
pub mod backend;
pub mod jsonrpc;
pub mod resources;
pub mod tools;

use std::sync::Arc;
use std::sync::OnceLock;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

pub use args::{
    ArgumentError, ConvertRequest, FacesForFamilyRequest, FontOverviewRequest, InstanceRequest,
    PublishFontRequest, PublishOptions, SubsetRequest,
};
pub use backend::{ToolBackend, ToolFailure};
use jsonrpc::{
    IncomingMessage, Response, encode_line, error_response, internal_error, method_not_found,
    parse_error, success_response,
};
use resources::{handle_resources_list, handle_resources_read};
use tools::{handle_tools_call, handle_tools_list};

// ---------------------------------------------------------------------------
// Protocol constants (pub(crate) so submodules can access them)
// ---------------------------------------------------------------------------

/// MCP protocol version.
pub(crate) const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported during initialization.
pub(crate) const SERVER_NAME: &str = "fontpress";

/// Application version set by the main crate.
/// Use `set_app_version()` to initialize this before calling [`serve`].
static APP_VERSION: OnceLock<String> = OnceLock::new();

/// Set the application version (should be called from the main crate with
/// the root crate's version before running the MCP server).
pub fn set_app_version(version: impl Into<String>) {
    let _ = APP_VERSION.set(version.into());
}

/// Get the application version, falling back to the crate version if not set.
pub(crate) fn get_app_version() -> &'static str {
    APP_VERSION
        .get()
        .map(|s| s.as_str())
        .unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Handle the `initialize` JSON-RPC request.
fn handle_initialize() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {},
            "resources": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": get_app_version()
        }
    })
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// How a parsed line is answered.
enum Dispatch {
    /// Notification or message without a method: no response.
    Ignore,
    /// Answered without touching the backend.
    Immediate(Response),
    /// Needs the backend; answered from a spawned task.
    Deferred {
        id: Value,
        method: String,
        params: Option<Value>,
    },
}

fn classify(line: &str) -> Dispatch {
    let msg: IncomingMessage = match serde_json::from_str(line) {
        Ok(m) => m,
        Err(e) => {
            log::warn!("Parse error: {}", e);
            return Dispatch::Immediate(parse_error());
        }
    };

    let Some(method) = msg.method else {
        log::debug!("Ignoring message without method");
        return Dispatch::Ignore;
    };

    // Notifications (no id) don't get responses
    let Some(id) = msg.id else {
        log::debug!("Notification: {}", method);
        return Dispatch::Ignore;
    };

    match method.as_str() {
        "initialize" => Dispatch::Immediate(success_response(id, handle_initialize())),
        "ping" => Dispatch::Immediate(success_response(id, serde_json::json!({}))),
        "tools/list" => Dispatch::Immediate(success_response(id, handle_tools_list())),
        "resources/list" => Dispatch::Immediate(success_response(id, handle_resources_list())),
        "tools/call" | "resources/read" => Dispatch::Deferred {
            id,
            method,
            params: msg.params,
        },
        _ => Dispatch::Immediate(method_not_found(id, &method)),
    }
}

async fn dispatch_deferred<B: ToolBackend>(
    backend: &B,
    id: Value,
    method: &str,
    params: Option<Value>,
) -> Response {
    match method {
        "tools/call" => success_response(id, handle_tools_call(backend, params).await),
        "resources/read" => match handle_resources_read(backend, params).await {
            Ok(result) => success_response(id, result),
            Err((code, message)) => error_response(id, code, message),
        },
        _ => method_not_found(id, method),
    }
}

/// Answer a single JSON-RPC line. `None` for notifications.
pub async fn handle_line<B: ToolBackend>(backend: &B, line: &str) -> Option<Response> {
    match classify(line.trim()) {
        Dispatch::Ignore => None,
        Dispatch::Immediate(response) => Some(response),
        Dispatch::Deferred { id, method, params } => {
            Some(dispatch_deferred(backend, id, &method, params).await)
        }
    }
}

// ---------------------------------------------------------------------------
// Server loop
// ---------------------------------------------------------------------------

async fn write_response<W: AsyncWrite + Unpin>(
    output: &mut W,
    response: &Response,
) -> std::io::Result<()> {
    if let Some(line) = encode_line(response) {
        log::debug!("-> {}", line.trim_end());
        output.write_all(line.as_bytes()).await?;
        output.flush().await?;
    }
    Ok(())
}

/// Run the MCP server until `input` reaches EOF, then wait for in-flight
/// requests to finish and return.
pub async fn serve<B, R, W>(backend: Arc<B>, input: R, output: &mut W) -> std::io::Result<()>
where
    B: ToolBackend,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    log::info!("Starting fontpress MCP server v{}", get_app_version());

    let mut lines = BufReader::new(input).lines();
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
    let mut input_open = true;
    let mut pending = 0usize;

    while input_open || pending > 0 {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        log::info!("stdin closed, waiting for {} in-flight request(s)", pending);
                        input_open = false;
                        continue;
                    }
                    Err(e) => {
                        log::error!("Error reading stdin: {}", e);
                        input_open = false;
                        continue;
                    }
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                log::debug!("<- {}", trimmed);

                match classify(trimmed) {
                    Dispatch::Ignore => {}
                    Dispatch::Immediate(response) => write_response(output, &response).await?,
                    Dispatch::Deferred { id, method, params } => {
                        pending += 1;
                        let backend = Arc::clone(&backend);
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            let task_id = id.clone();
                            let handle = tokio::spawn(async move {
                                dispatch_deferred(backend.as_ref(), id, &method, params).await
                            });
                            let response = match handle.await {
                                Ok(response) => response,
                                Err(e) => internal_error(task_id, format!("request task failed: {e}")),
                            };
                            let _ = tx.send(response);
                        });
                    }
                }
            }
            Some(response) = rx.recv() => {
                pending = pending.saturating_sub(1);
                write_response(output, &response).await?;
            }
        }
    }

    log::info!("MCP server exiting");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
