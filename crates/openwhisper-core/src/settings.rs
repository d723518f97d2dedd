//! The shared JSON settings document and the store that guards it.
//!
//! The document is an open-ended JSON object. Typed accessors cover the keys
//! the application knows about; every other key is carried through a
//! load -> mutate -> save cycle untouched.
//!
//! All writes go through [`SettingsStore::update`], which holds a single
//! mutex across the whole read-modify-write so two savers can never drop each
//! other's changes.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::{HotkeyBindings, Result, SettingsError};

const KEY_HOTKEYS: &str = "hotkeys";
const KEY_SELECTED_MODEL: &str = "selected_model";
const KEY_CURRENT_STYLE: &str = "current_waveform_style";
const KEY_STYLE_CONFIGS: &str = "waveform_style_configs";

/// Style used when the document does not name one.
const DEFAULT_STYLE: &str = "modern";

/// The closed set of waveform styles a style config may name.
pub const WAVEFORM_STYLES: [&str; 7] = [
    "modern",
    "retro",
    "minimalist",
    "spectrum",
    "particle",
    "neon_matrix",
    "galaxy_warp",
];

/// Per-style option maps, keyed by style name.
pub type StyleConfigs = BTreeMap<String, Map<String, Value>>;

/// The whole persisted settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsDocument {
    entries: Map<String, Value>,
}

impl SettingsDocument {
    /// Raw access to any key, known or not.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Hotkey bindings, with defaults for anything missing or malformed.
    pub fn hotkeys(&self) -> HotkeyBindings {
        match self.entries.get(KEY_HOTKEYS) {
            None => HotkeyBindings::default(),
            Some(value) => HotkeyBindings::deserialize(value).unwrap_or_else(|e| {
                warn!(error = %e, "Malformed hotkeys in settings, using defaults");
                HotkeyBindings::default()
            }),
        }
    }

    pub fn set_hotkeys(&mut self, bindings: &HotkeyBindings) -> Result<()> {
        let value = serde_json::to_value(bindings).map_err(SettingsError::Serialize)?;
        self.entries.insert(KEY_HOTKEYS.to_owned(), value);
        Ok(())
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.entries.get(KEY_SELECTED_MODEL).and_then(Value::as_str)
    }

    /// Boolean preference such as `auto_paste`, `copy_clipboard` or
    /// `minimize_tray`, falling back to `default` when unset or not a bool.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.entries
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    pub fn auto_paste(&self) -> bool {
        self.flag("auto_paste", true)
    }

    pub fn copy_clipboard(&self) -> bool {
        self.flag("copy_clipboard", true)
    }

    pub fn minimize_tray(&self) -> bool {
        self.flag("minimize_tray", false)
    }

    pub fn current_waveform_style(&self) -> &str {
        self.entries
            .get(KEY_CURRENT_STYLE)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_STYLE)
    }

    /// Style configs currently stored, or an error if the key has the wrong
    /// shape.
    pub fn waveform_style_configs(&self) -> Result<StyleConfigs> {
        match self.entries.get(KEY_STYLE_CONFIGS) {
            None => Ok(StyleConfigs::new()),
            Some(value) => StyleConfigs::deserialize(value).map_err(|source| {
                SettingsError::Shape {
                    key: KEY_STYLE_CONFIGS,
                    source,
                }
            }),
        }
    }
}

/// Validates a style selection before it is merged into the document.
fn validate_styles(current: &str, configs: &StyleConfigs) -> Result<()> {
    if current.trim().is_empty() {
        return Err(SettingsError::Empty("current waveform style".to_owned()));
    }
    if !WAVEFORM_STYLES.contains(&current) {
        return Err(SettingsError::UnknownStyle(current.to_owned()));
    }
    if let Some(unknown) = configs
        .keys()
        .find(|name| !WAVEFORM_STYLES.contains(&name.as_str()))
    {
        return Err(SettingsError::UnknownStyle(unknown.clone()));
    }
    if !configs.contains_key(current) {
        return Err(SettingsError::MissingStyleConfig(current.to_owned()));
    }
    Ok(())
}

/// Loads and saves the settings document at a single path.
pub struct SettingsStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Returns the path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the whole document. A missing or corrupt file yields an empty
    /// document; corruption is logged, never raised.
    pub fn load_all(&self) -> SettingsDocument {
        let _guard = self.guard.lock();
        self.read()
    }

    /// Replaces the whole document on disk.
    pub fn save_all(&self, document: &SettingsDocument) -> Result<()> {
        let _guard = self.guard.lock();
        self.write(document)
    }

    /// Runs `mutate` on the freshly loaded document and saves the result,
    /// all under the store guard. If `mutate` fails nothing is written.
    pub fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut SettingsDocument) -> Result<()>,
    {
        let _guard = self.guard.lock();
        let mut document = self.read();
        mutate(&mut document)?;
        self.write(&document)
    }

    /// Persisted hotkey bindings, or the defaults.
    pub fn load_bindings(&self) -> HotkeyBindings {
        self.load_all().hotkeys()
    }

    /// Validates `bindings` and replaces the persisted `hotkeys` key.
    pub fn save_bindings(&self, bindings: &HotkeyBindings) -> Result<()> {
        bindings.validate()?;
        self.update(|document| document.set_hotkeys(bindings))?;
        info!("Hotkey settings saved");
        Ok(())
    }

    /// The selected waveform style and the stored style configs. A malformed
    /// configs value is logged and treated as empty.
    pub fn load_waveform_style(&self) -> (String, StyleConfigs) {
        let document = self.load_all();
        let configs = document.waveform_style_configs().unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring malformed waveform style configs");
            StyleConfigs::new()
        });
        (document.current_waveform_style().to_owned(), configs)
    }

    /// Validates the selection and merges `configs` over the stored ones,
    /// leaving configs for styles not mentioned untouched. Stored configs
    /// with the wrong shape are dropped.
    pub fn save_waveform_style(&self, current: &str, configs: StyleConfigs) -> Result<()> {
        validate_styles(current, &configs)?;
        self.update(|document| {
            let mut merged = document.waveform_style_configs().unwrap_or_else(|e| {
                warn!(error = %e, "Replacing malformed waveform style configs");
                StyleConfigs::new()
            });
            merged.extend(configs);
            let merged = serde_json::to_value(merged).map_err(SettingsError::Serialize)?;
            document.set(KEY_CURRENT_STYLE, Value::from(current));
            document.set(KEY_STYLE_CONFIGS, merged);
            Ok(())
        })?;
        info!(style = current, "Waveform style saved");
        Ok(())
    }

    /// Persists the selected transcription model.
    pub fn save_model_selection(&self, model: &str) -> Result<()> {
        if model.trim().is_empty() {
            return Err(SettingsError::Empty("model name".to_owned()));
        }
        self.update(|document| {
            document.set(KEY_SELECTED_MODEL, Value::from(model));
            Ok(())
        })
    }

    fn read(&self) -> SettingsDocument {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "No settings file yet, using defaults");
                return SettingsDocument::default();
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to read settings, using defaults");
                return SettingsDocument::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = ?self.path, error = %e, "Failed to parse settings, using defaults");
            SettingsDocument::default()
        })
    }

    fn write(&self, document: &SettingsDocument) -> Result<()> {
        self.try_write(document).inspect_err(|e| {
            error!(path = ?self.path, error = %e, "Failed to save settings");
        })
    }

    fn try_write(&self, document: &SettingsDocument) -> Result<()> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }

        let serialized =
            serde_json::to_string_pretty(document).map_err(SettingsError::Serialize)?;

        // Write next to the target and rename so readers never see half a file.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serialized).map_err(io_err)?;
        fs::rename(&staging, &self.path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use serde_json::json;
    use tempfile::tempdir;

    use super::*;
    use crate::HotkeyAction;

    fn store_in(dir: &Path) -> SettingsStore {
        SettingsStore::new(dir.join("settings.json"))
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = store_in(temp.path());
        assert_eq!(store.load_all(), SettingsDocument::default());
        assert_eq!(store.load_bindings(), HotkeyBindings::default());
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = store_in(temp.path());
        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load_bindings(), HotkeyBindings::default());
    }

    #[test]
    fn test_bindings_round_trip() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = store_in(temp.path());

        let mut bindings = HotkeyBindings::default();
        bindings.set(HotkeyAction::RecordToggle, "f9");
        bindings.set(HotkeyAction::Cancel, "esc");
        bindings.set(HotkeyAction::EnableDisable, "ctrl+alt+f9");
        store.save_bindings(&bindings).unwrap();

        assert_eq!(store.load_bindings(), bindings);
        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(
            raw["hotkeys"],
            json!({"record_toggle": "f9", "cancel": "esc", "enable_disable": "ctrl+alt+f9"})
        );
    }

    #[test]
    fn test_unknown_keys_survive_save() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = store_in(temp.path());
        fs::write(
            store.path(),
            r#"{"auto_paste": false, "window_geometry": [1, 2, 3], "hotkeys": {"cancel": "x"}}"#,
        )
        .unwrap();

        store.save_bindings(&HotkeyBindings::default()).unwrap();

        let document = store.load_all();
        assert_eq!(document.get("window_geometry"), Some(&json!([1, 2, 3])));
        assert!(!document.auto_paste());
        assert_eq!(document.hotkeys(), HotkeyBindings::default());
    }

    #[test]
    fn test_invalid_bindings_persist_nothing() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = store_in(temp.path());

        let mut bindings = HotkeyBindings::default();
        bindings.set(HotkeyAction::Cancel, "hyper+x");
        let err = store.save_bindings(&bindings).unwrap_err();

        assert!(err.is_validation());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_style_missing_from_configs_is_rejected() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = store_in(temp.path());

        let mut configs = StyleConfigs::new();
        configs.insert("retro".to_owned(), Map::new());
        let err = store.save_waveform_style("modern", configs).unwrap_err();

        assert!(matches!(err, SettingsError::MissingStyleConfig(ref s) if s == "modern"));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_unknown_style_is_rejected() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = store_in(temp.path());

        let mut configs = StyleConfigs::new();
        configs.insert("modern".to_owned(), Map::new());
        configs.insert("vaporwave".to_owned(), Map::new());
        let err = store.save_waveform_style("modern", configs).unwrap_err();
        assert!(matches!(err, SettingsError::UnknownStyle(ref s) if s == "vaporwave"));
    }

    #[test]
    fn test_style_configs_merge() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = store_in(temp.path());

        let mut first = StyleConfigs::new();
        first.insert("retro".to_owned(), json!({"scanlines": true}).as_object().cloned().unwrap());
        store.save_waveform_style("retro", first).unwrap();

        let mut second = StyleConfigs::new();
        second.insert("particle".to_owned(), json!({"count": 64}).as_object().cloned().unwrap());
        store.save_waveform_style("particle", second).unwrap();

        let (current, configs) = store.load_waveform_style();
        assert_eq!(current, "particle");
        assert_eq!(configs["retro"]["scanlines"], json!(true));
        assert_eq!(configs["particle"]["count"], json!(64));
    }

    #[test]
    fn test_style_save_replaces_malformed_configs() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = store_in(temp.path());
        fs::write(
            store.path(),
            r#"{"waveform_style_configs": {"modern": 5}, "auto_paste": false}"#,
        )
        .unwrap();

        let (_, loaded) = store.load_waveform_style();
        assert!(loaded.is_empty());

        let mut configs = StyleConfigs::new();
        configs.insert("modern".to_owned(), json!({"bars": 32}).as_object().cloned().unwrap());
        store.save_waveform_style("modern", configs).unwrap();

        let (current, configs) = store.load_waveform_style();
        assert_eq!(current, "modern");
        assert_eq!(configs["modern"]["bars"], json!(32));
        assert!(!store.load_all().auto_paste());
    }

    #[test]
    fn test_shape_error_is_not_validation() {
        let mut document = SettingsDocument::default();
        document.set("waveform_style_configs", json!([1, 2]));
        let err = document.waveform_style_configs().unwrap_err();
        assert!(matches!(err, SettingsError::Shape { .. }));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_model_selection() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = store_in(temp.path());

        assert!(store.save_model_selection("  ").unwrap_err().is_validation());
        store.save_model_selection("api_whisper").unwrap();
        assert_eq!(store.load_all().selected_model(), Some("api_whisper"));
    }

    #[test]
    fn test_concurrent_updates_are_serialized() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = Arc::new(store_in(temp.path()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    store
                        .update(|document| {
                            document.set(format!("key_{i}"), Value::from(i));
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let document = store.load_all();
        for i in 0..8 {
            assert_eq!(document.get(&format!("key_{i}")), Some(&Value::from(i)));
        }
    }

    #[test]
    fn test_write_failure_is_reported() {
        let temp = tempdir().expect("Failed to create temp dir");
        // The settings path is a directory, so the rename cannot succeed.
        let path = temp.path().join("settings.json");
        fs::create_dir_all(path.join("occupied")).unwrap();
        let store = SettingsStore::new(&path);

        let err = store.save_all(&SettingsDocument::default()).unwrap_err();
        assert!(!err.is_validation());
    }
}
