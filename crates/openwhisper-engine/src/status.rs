//! Maps free-text backend status messages onto overlay actions.

use openwhisper_core::OverlayState;

/// What a status message asks the overlay to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    /// Enter the cancel flow and re-arm the cancel timer
    Cancel,
    /// Show the overlay in this state
    Show(OverlayState),
    /// Hide the overlay
    Hide,
    /// No overlay effect
    Ignore,
}

/// Case-insensitive markers, checked in order before the STT markers.
const LIFECYCLE_MARKERS: [(&str, StatusAction); 4] = [
    ("cancel", StatusAction::Cancel),
    ("recording", StatusAction::Show(OverlayState::Recording)),
    ("processing", StatusAction::Show(OverlayState::Processing)),
    ("transcribing", StatusAction::Show(OverlayState::Transcribing)),
];

/// Case-insensitive markers that end the visible flow.
const FINISH_MARKERS: [&str; 4] = ["complete", "ready", "failed", "error"];

/// Classifies `text` by the first marker it contains.
///
/// The STT markers are matched case-sensitively, everything else is not.
pub fn classify(text: &str) -> StatusAction {
    let lowered = text.to_lowercase();

    if let Some((_, action)) = LIFECYCLE_MARKERS
        .iter()
        .find(|(marker, _)| lowered.contains(marker))
    {
        return *action;
    }

    if text.contains("STT Enabled") {
        return StatusAction::Show(OverlayState::SttEnabled);
    }
    if text.contains("STT Disabled") {
        return StatusAction::Show(OverlayState::SttDisabled);
    }

    if FINISH_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return StatusAction::Hide;
    }

    StatusAction::Ignore
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_messages() {
        assert_eq!(
            classify("Recording in progress..."),
            StatusAction::Show(OverlayState::Recording)
        );
        assert_eq!(
            classify("Processing audio"),
            StatusAction::Show(OverlayState::Processing)
        );
        assert_eq!(
            classify("Transcribing chunk 2/5..."),
            StatusAction::Show(OverlayState::Transcribing)
        );
        assert_eq!(classify("Recording cancelled"), StatusAction::Cancel);
        assert_eq!(classify("CANCELED"), StatusAction::Cancel);
    }

    #[test]
    fn test_finish_messages_hide() {
        for text in [
            "Transcription complete!",
            "Ready (Pasted)",
            "Transcription complete (paste failed)",
            "Error: model not loaded",
            "Upload FAILED",
        ] {
            assert_eq!(classify(text), StatusAction::Hide, "{text}");
        }
    }

    #[test]
    fn test_first_match_wins() {
        // "cancel" is checked before "recording"
        assert_eq!(classify("recording canceled"), StatusAction::Cancel);
        // "processing" is checked before "error"
        assert_eq!(
            classify("error while processing, retrying"),
            StatusAction::Show(OverlayState::Processing)
        );
    }

    #[test]
    fn test_stt_markers_are_case_sensitive() {
        assert_eq!(
            classify("STT Enabled"),
            StatusAction::Show(OverlayState::SttEnabled)
        );
        assert_eq!(
            classify("STT Disabled"),
            StatusAction::Show(OverlayState::SttDisabled)
        );
        assert_eq!(classify("stt enabled"), StatusAction::Ignore);
        assert_eq!(classify("STT DISABLED"), StatusAction::Ignore);
    }

    #[test]
    fn test_unmatched_is_ignored() {
        assert_eq!(classify(""), StatusAction::Ignore);
        assert_eq!(classify("Loading model..."), StatusAction::Ignore);
    }

    #[test]
    fn test_classification_is_deterministic() {
        for text in ["Recording...", "STT Enabled", "done, ready", "hello"] {
            assert_eq!(classify(text), classify(text));
        }
    }
}
