//! Server configuration.
//!
//! # Sub-modules
//!
//! - [`env_vars`] `${VAR}` substitution with an allowlist
//! - [`persistence`] load/save and path resolution
//! - [`validation`] semantic range checks

pub mod env_vars;
pub mod persistence;
pub mod validation;

pub use env_vars::{
    ALLOWED_ENV_VARS, Expander, Expansion, is_env_var_allowed, substitute_variables, substitute_variables_with_allowlist,
};

use crate::defaults;
use crate::types::{LogLevel, StorageBackendKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration. Every section falls back to its defaults when
/// omitted, and every key within a section does too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Resolve every `${VAR}` in the file, not just allowlisted ones.
    pub allow_all_env_vars: bool,
    pub catalog: CatalogConfig,
    pub publish: PublishDefaults,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub convert: ConvertConfig,
    pub artifacts: ArtifactsConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Family snapshot lifetime.
    #[serde(default = "defaults::catalog_ttl_secs")]
    pub ttl_secs: u64,

    /// An unknown PostScript name forces a refresh when the snapshot is older
    /// than this. `0` disables refresh-on-miss.
    #[serde(default = "defaults::refresh_on_miss_secs")]
    pub refresh_on_miss_secs: u64,

    #[serde(default = "defaults::bool_true")]
    pub include_system_fonts: bool,

    /// Extra directories scanned for fonts. `~/` is expanded.
    #[serde(default)]
    pub font_dirs: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ttl_secs: defaults::catalog_ttl_secs(),
            refresh_on_miss_secs: defaults::refresh_on_miss_secs(),
            include_system_fonts: defaults::bool_true(),
            font_dirs: Vec::new(),
        }
    }
}

impl CatalogConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn refresh_on_miss(&self) -> Option<Duration> {
        (self.refresh_on_miss_secs > 0).then(|| Duration::from_secs(self.refresh_on_miss_secs))
    }
}

// ---------------------------------------------------------------------------
// Publish defaults
// ---------------------------------------------------------------------------

/// Destination values used when a publish request leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishDefaults {
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default)]
    pub prefix: String,

    #[serde(default = "defaults::region")]
    pub region: String,

    /// Upload with a `public-read` ACL.
    #[serde(default = "defaults::bool_true")]
    pub public: bool,

    #[serde(default = "defaults::cache_seconds")]
    pub cache_seconds: u64,

    #[serde(default = "defaults::bool_false")]
    pub overwrite: bool,
}

impl Default for PublishDefaults {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: String::new(),
            region: defaults::region(),
            public: defaults::bool_true(),
            cache_seconds: defaults::cache_seconds(),
            overwrite: defaults::bool_false(),
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackendKind,

    /// Custom endpoint for S3-compatible stores, e.g. `https://minio.local:9000`.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "defaults::bool_false")]
    pub path_style: bool,

    /// CDN or website base URL used for returned object URLs.
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Static credentials. When absent the `AWS_*` environment is used.
    #[serde(default)]
    pub credentials: Option<CredentialsConfig>,

    #[serde(default = "defaults::storage_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::default(),
            endpoint: None,
            path_style: defaults::bool_false(),
            public_base_url: None,
            credentials: None,
            timeout_secs: defaults::storage_timeout_secs(),
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Total PUT attempts, including the first.
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "defaults::base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "defaults::max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "defaults::bool_true")]
    pub jitter: bool,

    /// HEAD the object after PUT and compare size and hash.
    #[serde(default = "defaults::bool_true")]
    pub verify: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_delay_ms: defaults::base_delay_ms(),
            max_delay_ms: defaults::max_delay_ms(),
            jitter: defaults::bool_true(),
            verify: defaults::bool_true(),
        }
    }
}

impl UploadConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Convert
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Brotli quality, 0-11.
    #[serde(default = "defaults::brotli_quality")]
    pub brotli_quality: u32,

    /// Brotli window bits, 10-24.
    #[serde(default = "defaults::brotli_window")]
    pub brotli_window: u32,

    /// Concurrent transform+convert jobs.
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Parent of per-request scratch directories. Defaults to the system
    /// temp dir under `fontpress/`.
    #[serde(default)]
    pub scratch_dir: Option<String>,

    #[serde(default = "defaults::scratch_max_age_hours")]
    pub scratch_max_age_hours: u64,

    /// Scratch entries kept before the oldest are removed.
    #[serde(default = "defaults::scratch_max_entries")]
    pub scratch_max_entries: usize,

    /// Combined scratch size, in MiB, before the oldest entries are removed.
    #[serde(default = "defaults::scratch_max_mb")]
    pub scratch_max_mb: u64,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            brotli_quality: defaults::brotli_quality(),
            brotli_window: defaults::brotli_window(),
            max_concurrent: defaults::max_concurrent(),
            scratch_dir: None,
            scratch_max_age_hours: defaults::scratch_max_age_hours(),
            scratch_max_entries: defaults::scratch_max_entries(),
            scratch_max_mb: defaults::scratch_max_mb(),
        }
    }
}

impl ConvertConfig {
    pub fn scratch_max_age(&self) -> Duration {
        Duration::from_secs(self.scratch_max_age_hours * 3600)
    }

    pub fn scratch_max_bytes(&self) -> u64 {
        self.scratch_max_mb.saturating_mul(1024 * 1024)
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// `font-display` descriptor in the generated `@font-face` rule.
    #[serde(default = "defaults::font_display")]
    pub font_display: String,

    /// Line rendered in the HTML preview when the request has no subset text.
    #[serde(default = "defaults::sample_text")]
    pub sample_text: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            font_display: defaults::font_display(),
            sample_text: defaults::sample_text(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    /// Also append log lines to this file. `~/` is expanded.
    #[serde(default)]
    pub file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.catalog.ttl_secs, 300);
        assert_eq!(config.catalog.refresh_on_miss(), Some(Duration::from_secs(30)));
        assert_eq!(config.publish.region, "us-east-1");
        assert!(config.publish.public);
        assert_eq!(config.publish.cache_seconds, 31_536_000);
        assert_eq!(config.storage.backend, StorageBackendKind::S3);
        assert_eq!(config.storage.timeout(), Duration::from_secs(30));
        assert_eq!(config.upload.max_attempts, 3);
        assert_eq!(config.upload.base_delay(), Duration::from_millis(500));
        assert_eq!(config.convert.brotli_quality, 11);
        assert_eq!(config.convert.brotli_window, 22);
        assert_eq!(config.convert.max_concurrent, 2);
        assert_eq!(config.convert.scratch_max_entries, 1000);
        assert_eq!(config.convert.scratch_max_bytes(), 500 * 1024 * 1024);
        assert_eq!(config.artifacts.font_display, "swap");
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "publish:\n  bucket: my-fonts\nupload:\n  max_attempts: 5\n";
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.publish.bucket.as_deref(), Some("my-fonts"));
        assert_eq!(config.publish.region, "us-east-1");
        assert_eq!(config.upload.max_attempts, 5);
        assert!(config.upload.verify);
        assert_eq!(config.catalog, CatalogConfig::default());
    }

    #[test]
    fn test_scratch_caps_from_yaml() {
        let yaml = "convert:\n  scratch_max_entries: 50\n  scratch_max_mb: 2\n";
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.convert.scratch_max_entries, 50);
        assert_eq!(config.convert.scratch_max_bytes(), 2 * 1024 * 1024);
        assert_eq!(config.convert.scratch_max_age_hours, 24);
    }

    #[test]
    fn test_refresh_on_miss_zero_disables() {
        let catalog = CatalogConfig {
            refresh_on_miss_secs: 0,
            ..CatalogConfig::default()
        };
        assert_eq!(catalog.refresh_on_miss(), None);
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let creds = CredentialsConfig {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI".to_string(),
            session_token: Some("token".to_string()),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("wJalrXUtnFEMI"));
        assert!(!debug.contains("\"token\""));
    }

    #[test]
    fn test_storage_backend_memory() {
        let config: Config = serde_yaml_ng::from_str("storage:\n  backend: memory\n").unwrap();
        assert_eq!(config.storage.backend, StorageBackendKind::Memory);
    }
}
