//! User configuration and plugins-directory resolution.
//!
//! The config file only supplies defaults at the front-end boundary; the
//! target directory and active loader filter stay explicit parameters of
//! every core operation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::catalog::Loader;

/// Contents of `~/.config/quarry/config.toml`. A missing file means
/// defaults; a present but unparsable file is an error, not a fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarryConfig {
    /// Loaders assumed when no `--loader` flag is given.
    pub default_loaders: Vec<Loader>,
    /// Fixed plugins directory, overriding cwd detection.
    pub plugins_dir: Option<PathBuf>,
    /// Alternate catalog endpoint (mirrors).
    pub api_url: Option<Url>,
}

impl Default for QuarryConfig {
    fn default() -> Self {
        Self {
            default_loaders: vec![Loader::Paper, Loader::Spigot, Loader::Bukkit, Loader::Purpur],
            plugins_dir: None,
            api_url: None,
        }
    }
}

impl QuarryConfig {
    /// Default config file location.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("quarry"))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".config")
                    .join("quarry")
            })
            .join("config.toml")
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

/// Determine the plugins directory for downloads.
///
/// An explicit override wins and is created if missing. Otherwise: a cwd
/// already named `plugins` is used as-is, an existing `plugins/` child is
/// used, and failing both a `plugins/` directory is created under cwd.
pub fn resolve_plugins_dir(cwd: &Path, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = override_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create plugins directory: {}", dir.display()))?;
        return Ok(dir.to_path_buf());
    }

    if cwd.file_name().is_some_and(|name| name == "plugins") {
        return Ok(cwd.to_path_buf());
    }

    let plugins = cwd.join("plugins");
    if !plugins.is_dir() {
        fs::create_dir_all(&plugins).with_context(|| {
            format!("Failed to create plugins directory: {}", plugins.display())
        })?;
    }
    Ok(plugins)
}
