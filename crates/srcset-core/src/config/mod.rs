//! Configuration management for srcset.
//!
//! Configuration is read from `srcset.toml` in the site directory, falling back
//! to the per-user config file and then to built-in defaults. All config
//! structs implement `Default` with the values the site has always shipped.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use crate::layout::SiteLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the project-local config file looked up in the site directory.
pub const SITE_CONFIG_FILE: &str = "srcset.toml";

/// Root configuration structure for srcset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source, output and web root locations
    pub paths: PathsConfig,

    /// Source discovery settings
    pub processing: ProcessingConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Responsive derivative settings
    pub derivatives: DerivativeConfig,

    /// Inline blur placeholder settings
    pub blur: BlurConfig,

    /// Invalid-source fallback settings
    pub fallback: FallbackConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default per-user location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration for a site.
    ///
    /// Precedence: `explicit` path, then `<site_dir>/srcset.toml`, then the
    /// per-user config file, then defaults.
    pub fn load_for_site(site_dir: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let local = site_dir.join(SITE_CONFIG_FILE);
        if local.exists() {
            tracing::debug!("Using site config {:?}", local);
            return Self::load_from(&local);
        }
        Self::load()
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default per-user config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.srcset.srcset/config.toml
    /// - Linux: ~/.config/srcset/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\srcset\config\config.toml
    ///
    /// Falls back to ~/.srcset/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "srcset", "srcset")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".srcset").join("config.toml")
            })
    }

    /// Resolve the configured paths against a site directory.
    pub fn layout(&self, site_dir: &Path) -> Result<SiteLayout, ConfigError> {
        let resolve = |raw: &str| {
            let expanded = PathBuf::from(shellexpand::tilde(raw).into_owned());
            if expanded.is_absolute() {
                expanded
            } else {
                site_dir.join(expanded)
            }
        };
        SiteLayout::new(
            resolve(&self.paths.source_dir),
            resolve(&self.paths.output_dir),
            resolve(&self.paths.web_root),
            &self.paths.manifest_name,
        )
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
