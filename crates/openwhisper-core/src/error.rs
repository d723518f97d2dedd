use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by settings validation and persistence.
///
/// Load failures never show up here: they are logged and replaced by
/// defaults inside [`crate::SettingsStore`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Style name outside the known waveform styles
    #[error("unknown waveform style: {0:?}")]
    UnknownStyle(String),

    /// The current style has no entry in the submitted style configs
    #[error("current waveform style {0:?} has no entry in the style configs")]
    MissingStyleConfig(String),

    /// A required string was empty
    #[error("{0} cannot be empty")]
    Empty(String),

    /// Hotkey combination that does not parse as `mod+...+key`
    #[error("invalid hotkey {combo:?}: {reason}")]
    InvalidCombo { combo: String, reason: &'static str },

    /// A document value has the wrong shape for its key
    #[error("settings key {key:?} has an unexpected shape")]
    Shape {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Writing the settings file failed
    #[error("failed to write settings file at {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Serializing the settings document failed
    #[error("failed to serialize settings")]
    Serialize(#[source] serde_json::Error),
}

impl SettingsError {
    /// True for malformed caller input, false for persistence failures and
    /// bad stored data.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            SettingsError::Io { .. } | SettingsError::Serialize(_) | SettingsError::Shape { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SettingsError>;
