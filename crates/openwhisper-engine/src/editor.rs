//! Edit-then-commit flow for hotkey bindings.
//!
//! An editor owns a working copy of the bindings for its lifetime. Captured
//! combos only touch that copy; nothing reaches the settings file until
//! [`HotkeyEditor::save`]. Dropping the editor throws the copy away and
//! terminates any capture still listening.

use openwhisper_core::{HotkeyAction, HotkeyBindings, SettingsError, SettingsStore};
use tracing::{debug, info};

use crate::capture::{CaptureError, CaptureOutcome, HotkeyCapture};

/// Field text shown while a capture is listening.
pub const LISTENING_TEXT: &str = "Waiting for input...";

pub struct HotkeyEditor {
    working: HotkeyBindings,
    capture: HotkeyCapture,
    listening: Option<HotkeyAction>,
}

impl HotkeyEditor {
    /// Opens an editor on the persisted bindings.
    pub fn open(store: &SettingsStore, capture: HotkeyCapture) -> Self {
        let working = store.load_bindings();
        debug!(path = %store.path().display(), "Hotkey editor opened");
        Self {
            working,
            capture,
            listening: None,
        }
    }

    /// The working copy, including unsaved changes.
    pub fn bindings(&self) -> &HotkeyBindings {
        &self.working
    }

    /// What the field for `action` currently shows.
    pub fn display(&self, action: HotkeyAction) -> &str {
        if self.listening == Some(action) {
            LISTENING_TEXT
        } else {
            self.working.get(action)
        }
    }

    pub fn listening_for(&self) -> Option<HotkeyAction> {
        self.listening
    }

    /// Marks the field for `action` as listening and starts a capture,
    /// replacing any capture in flight.
    pub fn begin_capture(&mut self, action: HotkeyAction) -> Result<(), CaptureError> {
        self.listening = Some(action);
        if let Err(e) = self.capture.begin(action) {
            self.listening = None;
            return Err(e);
        }
        Ok(())
    }

    /// Applies a capture outcome delivered through the event loop. Returns
    /// `true` if the working copy changed.
    pub fn on_capture(&mut self, outcome: CaptureOutcome) -> bool {
        let Some(outcome) = self.capture.resolve(outcome) else {
            return false;
        };
        self.listening = None;

        match outcome {
            CaptureOutcome::Captured { action, combo, .. } => {
                info!(action = %action, combo = %combo, "Hotkey staged");
                self.working.set(action, combo);
                true
            }
            CaptureOutcome::Failed { action, .. } => {
                debug!(action = %action, "Capture failed, keeping previous combo");
                false
            }
        }
    }

    /// Replaces the working copy with the defaults. Nothing is persisted.
    pub fn reset_to_defaults(&mut self) {
        self.stop_listening();
        self.working = HotkeyBindings::default();
        info!("Hotkeys reset to defaults (unsaved)");
    }

    /// Validates the working copy and writes it as the `hotkeys` setting.
    /// On a validation error nothing is written.
    pub fn save(&mut self, store: &SettingsStore) -> Result<(), SettingsError> {
        self.stop_listening();
        store.save_bindings(&self.working)?;
        info!("Hotkeys saved");
        Ok(())
    }

    /// Closes the editor without saving.
    pub fn discard(self) {
        debug!("Hotkey editor discarded");
    }

    fn stop_listening(&mut self) {
        self.capture.cancel();
        self.listening = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use tempfile::tempdir;

    use super::*;
    use crate::capture::tests::{StubbornPrimitive, collector};

    const WAIT: Duration = Duration::from_secs(5);

    struct Harness {
        editor: HotkeyEditor,
        keys: mpsc::Sender<Result<String, CaptureError>>,
        outcomes: mpsc::Receiver<CaptureOutcome>,
    }

    impl Harness {
        fn open(store: &SettingsStore) -> Self {
            let (primitive, keys) = StubbornPrimitive::new();
            let (deliver, outcomes) = collector();
            let capture = HotkeyCapture::new(primitive, deliver);
            Self {
                editor: HotkeyEditor::open(store, capture),
                keys,
                outcomes,
            }
        }

        fn press(&mut self, combo: &str) -> bool {
            self.keys.send(Ok(combo.to_string())).unwrap();
            let outcome = self.outcomes.recv_timeout(WAIT).unwrap();
            self.editor.on_capture(outcome)
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("settings.json"))
    }

    #[test]
    fn test_capture_then_save_persists() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let mut h = Harness::open(&store);

        h.editor.begin_capture(HotkeyAction::RecordToggle).unwrap();
        assert_eq!(h.editor.display(HotkeyAction::RecordToggle), LISTENING_TEXT);
        assert_eq!(h.editor.display(HotkeyAction::Cancel), "-");

        assert!(h.press("f9"));
        assert_eq!(h.editor.display(HotkeyAction::RecordToggle), "f9");
        assert_eq!(h.editor.listening_for(), None);

        // Nothing is written before save.
        assert_eq!(store.load_bindings(), HotkeyBindings::default());

        h.editor.save(&store).unwrap();
        assert_eq!(store.load_bindings().get(HotkeyAction::RecordToggle), "f9");
    }

    #[test]
    fn test_discard_leaves_store_untouched() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let mut h = Harness::open(&store);

        h.editor.begin_capture(HotkeyAction::Cancel).unwrap();
        assert!(h.press("esc"));
        h.editor.discard();

        assert!(!store.path().exists());
        assert_eq!(store.load_bindings().get(HotkeyAction::Cancel), "-");
    }

    #[test]
    fn test_failed_capture_reverts_display() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let mut h = Harness::open(&store);

        h.editor.begin_capture(HotkeyAction::EnableDisable).unwrap();
        h.keys
            .send(Err(CaptureError::Platform("hook lost".into())))
            .unwrap();
        let outcome = h.outcomes.recv_timeout(WAIT).unwrap();

        assert!(!h.editor.on_capture(outcome));
        assert_eq!(h.editor.display(HotkeyAction::EnableDisable), "ctrl+alt+*");
        assert_eq!(h.editor.bindings(), &HotkeyBindings::default());
    }

    #[test]
    fn test_stale_outcome_is_ignored() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let mut h = Harness::open(&store);

        h.editor.begin_capture(HotkeyAction::RecordToggle).unwrap();
        h.editor.begin_capture(HotkeyAction::Cancel).unwrap();

        let stale = CaptureOutcome::Captured {
            session: 1,
            action: HotkeyAction::RecordToggle,
            combo: "f1".into(),
        };
        assert!(!h.editor.on_capture(stale));
        assert_eq!(h.editor.listening_for(), Some(HotkeyAction::Cancel));
        assert_eq!(h.editor.display(HotkeyAction::RecordToggle), "*");
    }

    #[test]
    fn test_reset_to_defaults_is_unsaved() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let mut saved = HotkeyBindings::default();
        saved.set(HotkeyAction::RecordToggle, "f9");
        store.save_bindings(&saved).unwrap();

        let mut h = Harness::open(&store);
        assert_eq!(h.editor.display(HotkeyAction::RecordToggle), "f9");
        h.editor.reset_to_defaults();
        assert_eq!(h.editor.display(HotkeyAction::RecordToggle), "*");
        assert_eq!(store.load_bindings().get(HotkeyAction::RecordToggle), "f9");

        h.editor.save(&store).unwrap();
        assert_eq!(store.load_bindings(), HotkeyBindings::default());
    }

    #[test]
    fn test_invalid_working_copy_is_not_saved() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let mut h = Harness::open(&store);

        h.editor.begin_capture(HotkeyAction::Cancel).unwrap();
        assert!(h.press("ctrl+"));
        let err = h.editor.save(&store).unwrap_err();
        assert!(err.is_validation());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_editor_keeps_unknown_settings() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), r#"{"selected_model":"base.en","hotkeys":{}}"#).unwrap();

        let mut h = Harness::open(&store);
        h.editor.begin_capture(HotkeyAction::RecordToggle).unwrap();
        assert!(h.press("ctrl+shift+r"));
        h.editor.save(&store).unwrap();

        let document = store.load_all();
        assert_eq!(document.selected_model(), Some("base.en"));
        assert_eq!(document.hotkeys().get(HotkeyAction::RecordToggle), "ctrl+shift+r");
    }

    #[test]
    fn test_legacy_modifier_names_do_not_block_save() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"{"hotkeys":{"enable_disable":"windows+alt+*"}}"#,
        )
        .unwrap();

        let mut h = Harness::open(&store);
        h.editor.begin_capture(HotkeyAction::Cancel).unwrap();
        assert!(h.press("esc"));
        h.editor.save(&store).unwrap();

        let bindings = store.load_bindings();
        assert_eq!(bindings.get(HotkeyAction::Cancel), "esc");
        assert_eq!(bindings.get(HotkeyAction::EnableDisable), "windows+alt+*");
    }
}
