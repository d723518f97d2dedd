//! Installation-level configuration.
//!
//! This is the TOML file next to the settings document. It holds knobs that
//! are not edited from the UI: where the settings document lives, timings for
//! the cancel animation, and how to launch the transcription backend.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::APP_NAME;

/// Configuration structure for the application.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Path of the JSON settings document. Defaults to `settings.json` in the
    /// config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    settings_file: Option<PathBuf>,

    /// Length of the overlay cancel animation in milliseconds
    #[serde(
        default = "default_cancel_animation_ms",
        skip_serializing_if = "is_default_cancel_animation_ms"
    )]
    cancel_animation_ms: u64,

    /// Extra time the overlay stays up after the cancel animation
    #[serde(
        default = "default_cancel_margin_ms",
        skip_serializing_if = "is_default_cancel_margin_ms"
    )]
    cancel_margin_ms: u64,

    /// Offset in pixels from the pointer to the overlay's top-left corner
    #[serde(
        default = "default_overlay_offset",
        skip_serializing_if = "is_default_overlay_offset"
    )]
    overlay_offset: i32,

    /// Command line of the transcription backend, e.g.
    /// `backend = ["python3", "backend.py"]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backend: Option<Vec<String>>,
}

fn default_cancel_animation_ms() -> u64 {
    800
}

fn is_default_cancel_animation_ms(v: &u64) -> bool {
    *v == default_cancel_animation_ms()
}

fn default_cancel_margin_ms() -> u64 {
    200
}

fn is_default_cancel_margin_ms(v: &u64) -> bool {
    *v == default_cancel_margin_ms()
}

fn default_overlay_offset() -> i32 {
    10
}

fn is_default_overlay_offset(v: &i32) -> bool {
    *v == default_overlay_offset()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_file: None,
            cancel_animation_ms: default_cancel_animation_ms(),
            cancel_margin_ms: default_cancel_margin_ms(),
            overlay_offset: default_overlay_offset(),
            backend: None,
        }
    }
}

impl Config {
    /// Explicit settings file path, if configured.
    pub fn settings_file(&self) -> Option<&std::path::Path> {
        self.settings_file.as_deref()
    }

    /// How long the cancel timer waits before hiding the overlay.
    pub fn cancel_timer_duration(&self) -> Duration {
        Duration::from_millis(self.cancel_animation_ms + self.cancel_margin_ms)
    }

    pub fn overlay_offset(&self) -> i32 {
        self.overlay_offset
    }

    /// Backend argv, if one is configured and non-empty.
    pub fn backend(&self) -> Option<&[String]> {
        self.backend.as_deref().filter(|argv| !argv.is_empty())
    }

    #[cfg(test)]
    fn set_backend(&mut self, argv: Vec<String>) {
        self.backend = Some(argv);
    }
}

/// Manages loading and saving the configuration file.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new `ConfigManager` with the default configuration directory.
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Creates a new `ConfigManager` with a specified configuration directory.
    #[cfg(test)]
    pub fn with_config_dir<P: AsRef<std::path::Path>>(dir: P) -> Self {
        let config_path = dir.as_ref().join(format!("{}.toml", APP_NAME));
        Self { config_path }
    }

    /// Returns the directory holding the config and settings files.
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to retrieve configuration directory")?;
        Ok(config_dir.join(APP_NAME))
    }

    /// Returns the default path to the configuration file.
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(format!("{}.toml", APP_NAME)))
    }

    /// Where the settings document lives for `config`.
    pub fn settings_path(&self, config: &Config) -> PathBuf {
        match config.settings_file() {
            Some(path) => path.to_path_buf(),
            None => self.config_path.with_file_name("settings.json"),
        }
    }

    /// Loads the configuration from the config file or returns the default.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let config_content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file at {:?}", self.config_path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file at {:?}", self.config_path))?;

        if config.backend().is_none() {
            warn!(
                "No transcription backend configured. Recording will only drive the overlay \
                 until `backend` is set in {:?}.",
                self.config_path
            );
        }

        Ok(config)
    }

    /// Saves the configuration, only writing non-default fields.
    pub fn save(&self, config: &Config) -> Result<()> {
        let config_dir = self
            .config_path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {:?}", self.config_path))?;

        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory at {:?}", config_dir))?;

        let serialized =
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, serialized)
            .with_context(|| format!("Failed to write config file at {:?}", self.config_path))?;

        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path(&self) -> &std::path::Path {
        &self.config_path
    }
}
