//! Core types, configuration and settings persistence for openwhisper.
//!
//! This crate has no dependency on any UI toolkit. It holds the installation
//! config, the shared JSON settings document, hotkey bindings and the small
//! state enums the engine and the app agree on.

mod config;
mod error;
mod hotkeys;
mod settings;
mod state;

pub use config::{Config, ConfigManager};
pub use error::{Result, SettingsError};
pub use hotkeys::{Combo, HotkeyAction, HotkeyBindings, validate_combo};
pub use settings::{SettingsDocument, SettingsStore, StyleConfigs, WAVEFORM_STYLES};
pub use state::{OverlayState, RecordingLifecycle};

/// Application name
pub const APP_NAME: &str = "openwhisper";

/// Pretty application name for display
pub const APP_NAME_PRETTY: &str = "OpenWhisper";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";
