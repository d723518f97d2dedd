//! Overlay and recording state types.

use std::fmt;

/// What the transient overlay is currently showing.
///
/// Only `Idle` and `Canceling` may be left without an explicit trigger; the
/// cancel timer hides the overlay from either of them. A hidden overlay
/// always reports `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OverlayState {
    #[default]
    Idle,
    Recording,
    Processing,
    Transcribing,
    Canceling,
    Copied,
    SttEnabled,
    SttDisabled,
}

impl OverlayState {
    /// Whether the cancel timer may hide the overlay from this state.
    pub fn auto_hides(&self) -> bool {
        matches!(self, OverlayState::Idle | OverlayState::Canceling)
    }

    /// Default caption a rendering layer shows for this state.
    pub fn caption(&self) -> &'static str {
        match self {
            OverlayState::Idle => "",
            OverlayState::Recording => "Recording...",
            OverlayState::Processing => "Processing...",
            OverlayState::Transcribing => "Transcribing...",
            OverlayState::Canceling => "Cancelled",
            OverlayState::Copied => "Copied",
            OverlayState::SttEnabled => "STT Enabled",
            OverlayState::SttDisabled => "STT Disabled",
        }
    }
}

impl fmt::Display for OverlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OverlayState::Idle => "idle",
            OverlayState::Recording => "recording",
            OverlayState::Processing => "processing",
            OverlayState::Transcribing => "transcribing",
            OverlayState::Canceling => "canceling",
            OverlayState::Copied => "copied",
            OverlayState::SttEnabled => "stt_enable",
            OverlayState::SttDisabled => "stt_disable",
        };
        f.write_str(name)
    }
}

/// Whether audio is currently being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingLifecycle {
    /// Not recording
    #[default]
    Idle,
    /// Actively recording audio
    Recording,
}

impl RecordingLifecycle {
    pub fn is_recording(&self) -> bool {
        matches!(self, RecordingLifecycle::Recording)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_idle_and_canceling_auto_hide() {
        let auto: Vec<_> = [
            OverlayState::Idle,
            OverlayState::Recording,
            OverlayState::Processing,
            OverlayState::Transcribing,
            OverlayState::Canceling,
            OverlayState::Copied,
            OverlayState::SttEnabled,
            OverlayState::SttDisabled,
        ]
        .into_iter()
        .filter(OverlayState::auto_hides)
        .collect();
        assert_eq!(auto, vec![OverlayState::Idle, OverlayState::Canceling]);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(OverlayState::default(), OverlayState::Idle);
        assert!(!RecordingLifecycle::default().is_recording());
    }
}
