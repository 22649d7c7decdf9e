//! Configuration loading and discovery for `spritealign.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::Config;
use log::debug;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up on disk
pub const CONFIG_FILE_NAME: &str = "spritealign.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse spritealign.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override the chroma key color
    pub chroma_color: Option<String>,
    /// Override the chroma key tolerance
    pub chroma_tolerance: Option<u8>,
    /// Override the alpha feather radius
    pub feather_radius: Option<f32>,
    /// Override frames per second
    pub fps: Option<f64>,
    /// Override the loop count
    pub loop_count: Option<u32>,
}

/// Find spritealign.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for spritealign.toml
/// 2. Check XDG_CONFIG_HOME/spritealign/spritealign.toml (or ~/.config/spritealign/spritealign.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find spritealign.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("spritealign").join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find spritealign.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration.
///
/// # Arguments
/// - `path` - Explicit config file; when `None`, [`find_config`] is used
///
/// # Returns
/// - `Ok(Config)` from the file, or the defaults when no file is found
/// - `Err(ConfigError)` if the file cannot be read, parsed or validated
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            debug!("Using config: {}", p.display());
            load_config_file(&p)
        }
        None => {
            debug!("No {} found, using defaults", CONFIG_FILE_NAME);
            Ok(Config::default())
        }
    }
}

fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors));
    }

    Ok(config)
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(ref color) = overrides.chroma_color {
        config.chroma.color = color.clone();
    }
    if let Some(tolerance) = overrides.chroma_tolerance {
        config.chroma.tolerance = tolerance;
    }
    if let Some(radius) = overrides.feather_radius {
        config.classify.feather_radius = radius;
    }
    if let Some(fps) = overrides.fps {
        config.combine.fps = fps;
    }
    if let Some(loop_count) = overrides.loop_count {
        config.combine.loop_count = loop_count;
    }
}
