//! System-wide hotkeys for the bound actions.

use global_hotkey::GlobalHotKeyManager;
use global_hotkey::hotkey::{HotKey, HotKeyParseError};
use openwhisper_core::{Combo, HotkeyAction, HotkeyBindings, SettingsError};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum HotkeyError {
    #[error(transparent)]
    Invalid(#[from] SettingsError),
    #[error("key `{0}` cannot be bound globally")]
    UnsupportedKey(String),
    #[error(transparent)]
    Parse(#[from] HotKeyParseError),
    #[error(transparent)]
    Register(#[from] global_hotkey::Error),
}

/// Converts a stored combo such as `ctrl+alt+*` into a [`HotKey`].
pub fn parse_hotkey(combo: &str) -> Result<HotKey, HotkeyError> {
    let combo = Combo::parse(combo)?;
    let code = key_code(&combo.key).ok_or_else(|| HotkeyError::UnsupportedKey(combo.key.clone()))?;

    let mut parts: Vec<String> = combo
        .modifiers
        .iter()
        .map(|m| match m.as_str() {
            "ctrl" => "control".to_owned(),
            "win" => "super".to_owned(),
            other => other.to_owned(),
        })
        .collect();
    parts.push(code);
    Ok(parts.join("+").parse::<HotKey>()?)
}

/// The `global-hotkey` code name for a combo key.
fn key_code(key: &str) -> Option<String> {
    let code = match key {
        "*" => "NumpadMultiply",
        "+" => "NumpadAdd",
        "-" => "Minus",
        "/" => "Slash",
        "=" => "Equal",
        "," => "Comma",
        "." => "Period",
        ";" => "Semicolon",
        "'" => "Quote",
        "`" => "Backquote",
        "[" => "BracketLeft",
        "]" => "BracketRight",
        "\\" => "Backslash",
        "esc" => "Escape",
        "space" => "Space",
        "enter" => "Enter",
        "tab" => "Tab",
        "backspace" => "Backspace",
        "delete" => "Delete",
        "insert" => "Insert",
        "home" => "Home",
        "end" => "End",
        "pageup" => "PageUp",
        "pagedown" => "PageDown",
        "up" => "ArrowUp",
        "down" => "ArrowDown",
        "left" => "ArrowLeft",
        "right" => "ArrowRight",
        "printscreen" => "PrintScreen",
        "scrolllock" => "ScrollLock",
        "pause" => "Pause",
        _ => {
            let mut chars = key.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_lowercase() => Some(format!("Key{}", c.to_ascii_uppercase())),
                (Some(c), None) if c.is_ascii_digit() => Some(format!("Digit{}", c)),
                _ => key
                    .strip_prefix('f')
                    .and_then(|n| n.parse::<u8>().ok())
                    .filter(|n| (1..=24).contains(n))
                    .map(|n| format!("F{}", n)),
            };
        }
    };
    Some(code.to_owned())
}

/// Keeps one registered [`HotKey`] per action.
pub struct HotkeyRegistry {
    manager: GlobalHotKeyManager,
    registered: Vec<(HotkeyAction, HotKey)>,
}

impl HotkeyRegistry {
    pub fn new() -> Result<Self, HotkeyError> {
        Ok(Self {
            manager: GlobalHotKeyManager::new()?,
            registered: Vec::new(),
        })
    }

    /// Replaces all registrations with `bindings`. A binding that cannot be
    /// registered is skipped with a warning so the others still work.
    pub fn register_all(&mut self, bindings: &HotkeyBindings) {
        for (action, hotkey) in self.registered.drain(..) {
            if let Err(e) = self.manager.unregister(hotkey) {
                warn!(action = %action, "Failed to unregister hotkey: {}", e);
            }
        }

        for (action, combo) in bindings.iter() {
            let result = parse_hotkey(combo)
                .and_then(|hotkey| self.manager.register(hotkey).map(|_| hotkey).map_err(Into::into));
            match result {
                Ok(hotkey) => {
                    info!(action = %action, combo = %combo, "Hotkey registered");
                    self.registered.push((action, hotkey));
                }
                Err(e) => warn!(action = %action, combo = %combo, "Failed to register hotkey: {}", e),
            }
        }
    }

    /// The action a hotkey event id belongs to.
    pub fn action_for(&self, id: u32) -> Option<HotkeyAction> {
        self.registered
            .iter()
            .find(|(_, hotkey)| hotkey.id() == id)
            .map(|(action, _)| *action)
    }
}
