//! Hotkey actions and their key-combination bindings.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Result, SettingsError};

/// Maps a modifier name to its canonical spelling: `ctrl`, `alt`, `shift`
/// or `win`.
fn canonical_modifier(name: &str) -> Option<&'static str> {
    match name {
        "ctrl" | "control" => Some("ctrl"),
        "alt" | "option" => Some("alt"),
        "shift" => Some("shift"),
        "win" | "windows" | "super" | "cmd" | "command" | "meta" => Some("win"),
        _ => None,
    }
}

/// The logical actions a hotkey can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HotkeyAction {
    RecordToggle,
    Cancel,
    EnableDisable,
}

impl HotkeyAction {
    pub const ALL: [HotkeyAction; 3] = [
        HotkeyAction::RecordToggle,
        HotkeyAction::Cancel,
        HotkeyAction::EnableDisable,
    ];

    /// Key used in the settings document.
    pub fn name(&self) -> &'static str {
        match self {
            HotkeyAction::RecordToggle => "record_toggle",
            HotkeyAction::Cancel => "cancel",
            HotkeyAction::EnableDisable => "enable_disable",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }

    /// Label shown next to the binding field.
    pub fn label(&self) -> &'static str {
        match self {
            HotkeyAction::RecordToggle => "Record Toggle",
            HotkeyAction::Cancel => "Cancel Recording",
            HotkeyAction::EnableDisable => "Enable/Disable",
        }
    }

    /// Binding used when the settings document has none.
    pub fn default_combo(&self) -> &'static str {
        match self {
            HotkeyAction::RecordToggle => "*",
            HotkeyAction::Cancel => "-",
            HotkeyAction::EnableDisable => "ctrl+alt+*",
        }
    }
}

impl fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Exactly one key combination per [`HotkeyAction`].
///
/// Serialized as a plain `action -> combo` object. Entries for unknown
/// actions are dropped on read and missing actions get their defaults, so a
/// value of this type is always complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct HotkeyBindings {
    combos: BTreeMap<HotkeyAction, String>,
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self {
            combos: HotkeyAction::ALL
                .into_iter()
                .map(|action| (action, action.default_combo().to_owned()))
                .collect(),
        }
    }
}

impl HotkeyBindings {
    /// Returns the combination bound to `action`.
    pub fn get(&self, action: HotkeyAction) -> &str {
        self.combos
            .get(&action)
            .map(String::as_str)
            .unwrap_or_else(|| action.default_combo())
    }

    pub fn set(&mut self, action: HotkeyAction, combo: impl Into<String>) {
        self.combos.insert(action, combo.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (HotkeyAction, &str)> {
        self.combos.iter().map(|(action, combo)| (*action, combo.as_str()))
    }

    /// Checks every binding is a well formed combination.
    pub fn validate(&self) -> Result<()> {
        for (action, combo) in self.iter() {
            if combo.trim().is_empty() {
                return Err(SettingsError::Empty(format!("hotkey for {}", action)));
            }
            validate_combo(combo)?;
        }
        Ok(())
    }
}

impl From<BTreeMap<String, String>> for HotkeyBindings {
    fn from(map: BTreeMap<String, String>) -> Self {
        let mut bindings = Self::default();
        for (name, combo) in map {
            match HotkeyAction::from_name(&name) {
                Some(action) => bindings.set(action, combo),
                None => warn!(action = %name, "Ignoring binding for unknown hotkey action"),
            }
        }
        bindings
    }
}

impl From<HotkeyBindings> for BTreeMap<String, String> {
    fn from(bindings: HotkeyBindings) -> Self {
        bindings
            .combos
            .into_iter()
            .map(|(action, combo)| (action.name().to_owned(), combo))
            .collect()
    }
}

/// A parsed key combination: lowercase modifiers followed by one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combo {
    pub modifiers: Vec<String>,
    pub key: String,
}

impl Combo {
    /// Parses a combination of the form `mod+mod+key`.
    ///
    /// Every part but the last must be a modifier (case-insensitive). Aliases
    /// such as `control`, `windows` or `command` are normalized to `ctrl`,
    /// `alt`, `shift` and `win`. The last part is the key and must be
    /// non-empty.
    pub fn parse(combo: &str) -> Result<Self> {
        let invalid = |reason| SettingsError::InvalidCombo {
            combo: combo.to_owned(),
            reason,
        };

        let lowered = combo.trim().to_lowercase();
        if lowered.is_empty() {
            return Err(invalid("empty combination"));
        }

        // A trailing "++" or a lone "+" binds the plus key itself
        let (mods, key) = if lowered == "+" {
            ("", "+")
        } else if let Some(rest) = lowered.strip_suffix("++") {
            (rest, "+")
        } else {
            lowered.rsplit_once('+').unwrap_or(("", lowered.as_str()))
        };

        if key.is_empty() {
            return Err(invalid("missing key after modifiers"));
        }
        let modifiers = if mods.is_empty() {
            Vec::new()
        } else {
            mods.split('+')
                .map(|m| canonical_modifier(m).map(str::to_owned))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| invalid("unknown modifier"))?
        };

        Ok(Self {
            modifiers,
            key: key.to_owned(),
        })
    }
}

/// Checks that `combo` parses as a [`Combo`].
pub fn validate_combo(combo: &str) -> Result<()> {
    Combo::parse(combo).map(|_| ())
}
