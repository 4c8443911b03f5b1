//! Configuration for the fontpress server.
//!
//! A YAML file at `~/.config/fontpress/config.yaml` (or an explicit path)
//! with `${VAR}` substitution, per-key defaults and range validation.

pub mod config;
pub mod defaults;
pub mod error;
pub mod types;

pub use config::{
    ALLOWED_ENV_VARS, ArtifactsConfig, CatalogConfig, Config, ConvertConfig, CredentialsConfig,
    LoggingConfig, PublishDefaults, StorageConfig, UploadConfig, is_env_var_allowed,
    persistence::expand_tilde, substitute_variables, substitute_variables_with_allowlist,
};
pub use error::ConfigError;
pub use types::{LogLevel, StorageBackendKind};
