//! fontpress: publish installed fonts as content-addressed WOFF2 web fonts.
//!
//! The binary is an MCP stdio server. This library holds the pieces it
//! wires together:
//!
//! - [`service`]: [`service::FontService`], the tool backend over the face
//!   index and publisher
//! - [`publish`]: the resolve → transform → convert → upload → generate pipeline
//! - [`logging`]: stderr/file `log` bridge
//! - [`janitor`]: stale scratch directory cleanup
//! - [`cli`]: command-line parsing

pub mod cli;
pub mod janitor;
pub mod logging;
pub mod publish;
pub mod service;

pub use publish::{PublishError, PublishRequest, PublishResult, Publisher, Stage};
pub use service::FontService;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
