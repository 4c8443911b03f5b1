//! Config persistence and path resolution for `Config`.
//!
//! Covers:
//! - `load` / `load_from` / `save_to` (YAML file I/O with atomic write)
//! - `init` for the `init-config` subcommand
//! - XDG-style path helpers (`config_path`, `config_dir`)
//! - `~/` expansion for the path-valued settings

use super::Config;
use super::env_vars::{pre_scan_allow_all_env_vars, substitute_variables_with_allowlist};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "fontpress";

impl Config {
    /// Load configuration from `path`, or from [`Config::config_path`] when
    /// `None`.
    ///
    /// A missing default file yields defaults and is not created. A missing
    /// explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file {} does not exist", path.display());
                }
                Self::load_from(path)
            }
            None => {
                let config_path = Self::config_path();
                if config_path.exists() {
                    Self::load_from(&config_path)
                } else {
                    log::info!(
                        "Config file not found at {:?}, using defaults",
                        config_path
                    );
                    Ok(Self::default())
                }
            }
        }
    }

    /// Read, substitute, parse and validate one config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        log::info!("Loading config from {:?}", path);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = fs::metadata(path) {
                let mode = metadata.permissions().mode();
                if mode & 0o044 != 0 {
                    log::warn!(
                        "Config file {:?} has insecure permissions (mode {:04o}). \
                         It may contain storage credentials. Run: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path,
                    );
                }
            }
        }

        let contents = fs::read_to_string(path)
            .map_err(crate::ConfigError::from)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&contents).with_context(|| format!("loading {}", path.display()))
    }

    /// Parse config text. An empty document yields defaults.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let allow_all = pre_scan_allow_all_env_vars(contents);
        let contents = substitute_variables_with_allowlist(contents, allow_all);

        let config: Config = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(&contents).map_err(crate::ConfigError::from)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path` with an atomic temp-file rename.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml_ng::to_string(self)?;

        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Write a default config file. Refuses to overwrite unless `force`.
    pub fn init(path: Option<&Path>, force: bool) -> Result<PathBuf> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        if path.exists() && !force {
            anyhow::bail!(
                "Config file {} already exists (use --force to overwrite)",
                path.display()
            );
        }
        Self::default().save_to(&path)?;
        log::info!("Wrote default config to {:?}", path);
        Ok(path)
    }

    /// Get the configuration file path: `~/.config/fontpress/config.yaml`.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Get the configuration directory path (using XDG convention)
    pub fn config_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            if let Some(config_dir) = dirs::config_dir() {
                config_dir.join(APP_DIR)
            } else {
                PathBuf::from(".")
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Some(home_dir) = dirs::home_dir() {
                home_dir.join(".config").join(APP_DIR)
            } else {
                PathBuf::from(".")
            }
        }
    }

    /// Parent directory for per-request scratch directories.
    pub fn scratch_root(&self) -> PathBuf {
        match &self.convert.scratch_dir {
            Some(dir) => expand_tilde(dir),
            None => std::env::temp_dir().join(APP_DIR),
        }
    }

    /// Extra font directories with `~/` expanded.
    pub fn font_dirs(&self) -> Vec<PathBuf> {
        self.catalog
            .font_dirs
            .iter()
            .map(|dir| expand_tilde(dir))
            .collect()
    }

    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.logging.file.as_deref().map(expand_tilde)
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.publish.bucket = Some("fonts-bucket".to_string());
        config.upload.max_attempts = 4;
        config.save_to(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
        assert!(!path.with_extension("yaml.tmp").exists());
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_env_substitution_applies() {
        let config = Config::from_yaml(
            "publish:\n  bucket: ${FONTPRESS_TEST_UNSET_BUCKET_VAR:-from-default}\n",
        )
        .unwrap();
        assert_eq!(config.publish.bucket.as_deref(), Some("from-default"));
    }

    #[test]
    fn test_invalid_yaml_downcasts_to_parse_error() {
        let err = Config::from_yaml("upload: [unclosed").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_runs_on_load() {
        let err = Config::from_yaml("upload:\n  max_attempts: 0\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        assert_eq!(Config::init(Some(&path), false).unwrap(), path);
        assert!(Config::init(Some(&path), false).is_err());
        assert!(Config::init(Some(&path), true).is_ok());
    }

    #[test]
    fn test_config_path_under_app_dir() {
        let path = Config::config_path();
        assert!(path.ends_with("fontpress/config.yaml"));
    }

    #[test]
    fn test_scratch_root_default_and_explicit() {
        let mut config = Config::default();
        assert_eq!(config.scratch_root(), std::env::temp_dir().join("fontpress"));
        config.convert.scratch_dir = Some("/var/tmp/fp".to_string());
        assert_eq!(config.scratch_root(), PathBuf::from("/var/tmp/fp"));
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/fonts"), home.join("fonts"));
        }
    }
}
