//! Shared integration test helpers for fontpress.
//!
//! Include with `mod common;` at the top of each test file. The
//! `#[allow(dead_code)]` attribute suppresses warnings when a file uses only
//! some of the helpers.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fontpress::FontService;
use fontpress_config::{Config, StorageBackendKind};
use fontpress_fonts::testing::TestFont;
use fontpress_fonts::{Converter, ConverterOptions, SystemCatalog};
use fontpress_mcp::PublishFontRequest;
use fontpress_store::{MemoryStore, RetryPolicy, Sleeper, StoreBackend, StoreProvider, Uploader};
use serde_json::{Value, json};
use tempfile::TempDir;

pub const BUCKET: &str = "fonts";
pub const PREFIX: &str = "web";
pub const BASE_URL: &str = "https://cdn.test/";

/// Skips backoff delays.
pub struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) {}
}

/// A service over synthetic fonts and an in-memory store.
///
/// The `TempDir`s must outlive the service.
pub struct TestContext {
    pub service: FontService,
    pub store: Arc<MemoryStore>,
    pub fonts: TempDir,
    pub scratch: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Build with a config tweak applied on top of [`test_config`].
    pub fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let fonts = tempfile::tempdir().expect("font dir");
        let scratch = tempfile::tempdir().expect("scratch dir");
        TestFont::new("Helvetica", "Bold")
            .write_to(fonts.path())
            .expect("write Helvetica-Bold");
        TestFont::new("Helvetica", "Regular")
            .write_to(fonts.path())
            .expect("write Helvetica-Regular");
        TestFont::new("Flex Sans", "Regular")
            .variable()
            .write_to(fonts.path())
            .expect("write FlexSans-Regular");

        let mut config = test_config(scratch.path());
        tweak(&mut config);

        let store = Arc::new(MemoryStore::new(BASE_URL));
        let catalog = SystemCatalog::new(false, vec![fonts.path().to_path_buf()]);
        let uploader = Uploader::new(RetryPolicy {
            max_attempts: config.upload.max_attempts,
            verify: config.upload.verify,
        })
        .with_sleeper(Arc::new(NoSleep));
        let service = FontService::new(
            config,
            Arc::new(catalog),
            Arc::new(StoreProvider::new(StoreBackend::Memory(Arc::clone(&store)))),
            uploader,
        );
        Self {
            service,
            store,
            fonts,
            scratch,
        }
    }

    pub fn font_path(&self, post_script_name: &str) -> PathBuf {
        self.fonts.path().join(format!("{post_script_name}.ttf"))
    }

    /// Scratch directories still present under the scratch root.
    pub fn leftover_scratch(&self) -> usize {
        std::fs::read_dir(self.scratch.path())
            .map(|entries| entries.filter_map(Result::ok).count())
            .unwrap_or(0)
    }

    /// Convert a font file exactly as the configured pipeline would.
    pub fn convert(&self, post_script_name: &str) -> fontpress_fonts::ConvertedArtifact {
        let convert = &self.service.config().convert;
        Converter::new(ConverterOptions {
            quality: convert.brotli_quality,
            window: convert.brotli_window,
        })
        .convert(&self.font_path(post_script_name), 0, post_script_name)
        .expect("convert")
    }
}

/// Memory backend, fast Brotli settings and a scratch root inside `scratch`.
pub fn test_config(scratch: &Path) -> Config {
    let mut config = Config::default();
    config.storage.backend = StorageBackendKind::Memory;
    config.publish.bucket = Some(BUCKET.to_string());
    config.publish.prefix = PREFIX.to_string();
    config.convert.brotli_quality = 4;
    config.convert.brotli_window = 16;
    config.convert.scratch_dir = Some(scratch.to_string_lossy().into_owned());
    config.catalog.refresh_on_miss_secs = 0;
    config
}

/// `publish_font` arguments through the same validation MCP clients hit.
pub fn publish_request(arguments: Value) -> PublishFontRequest {
    PublishFontRequest::from_arguments(Some(&arguments)).expect("valid publish arguments")
}

pub fn plain_publish(post_script_name: &str) -> PublishFontRequest {
    publish_request(json!({"postScriptName": post_script_name, "publish": {}}))
}
