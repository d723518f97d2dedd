//! Puts finished transcripts where the user wants them.

use std::thread::sleep;
use std::time::Duration;

use arboard::Clipboard;
use enigo::Direction::{Click, Press, Release};
use enigo::{Enigo, Key, Keyboard};
use tracing::{info, warn};

const SLEEP_TIME: Duration = Duration::from_millis(10);

/// What to do with one transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Plan {
    set_clipboard: bool,
    paste: bool,
    restore_clipboard: bool,
}

impl Plan {
    fn new(copy_clipboard: bool, auto_paste: bool) -> Self {
        Self {
            // Pasting goes through the clipboard even when the user did not
            // ask for a copy; the old contents are put back afterwards.
            set_clipboard: copy_clipboard || auto_paste,
            paste: auto_paste,
            restore_clipboard: auto_paste && !copy_clipboard,
        }
    }
}

/// Clipboard and keyboard access, owned by the event loop.
pub struct TranscriptOutput {
    clipboard: Option<Clipboard>,
    enigo: Option<Enigo>,
}

impl Default for TranscriptOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptOutput {
    pub fn new() -> Self {
        let clipboard = Clipboard::new()
            .map_err(|e| warn!("Clipboard unavailable: {}", e))
            .ok();
        let enigo = Enigo::new(&enigo::Settings::default())
            .map_err(|e| warn!("Keyboard simulation unavailable: {}", e))
            .ok();
        Self { clipboard, enigo }
    }

    /// Copies and/or pastes `text`. Failures are logged.
    pub fn deliver(&mut self, text: &str, copy_clipboard: bool, auto_paste: bool) {
        let plan = Plan::new(copy_clipboard, auto_paste);
        info!(
            copy_clipboard,
            auto_paste,
            chars = text.chars().count(),
            "Handling transcription"
        );
        if !plan.set_clipboard {
            return;
        }
        let Some(clipboard) = self.clipboard.as_mut() else {
            warn!("No clipboard, transcript not delivered");
            return;
        };

        let previous = if plan.restore_clipboard {
            match clipboard.get_text() {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!("Failed to get clipboard text: {}", e);
                    None
                }
            }
        } else {
            None
        };

        if let Err(e) = clipboard.set_text(text) {
            warn!("Failed to set clipboard text: {}", e);
            return;
        }

        if plan.paste {
            match self.enigo.as_mut() {
                Some(enigo) => {
                    if let Err(e) = paste(enigo) {
                        warn!("Failed to paste transcription: {}", e);
                    }
                }
                None => warn!("No keyboard simulation, transcript left on the clipboard"),
            }
            if let Some(previous) = previous {
                // Give the target app time to read the clipboard first
                sleep(SLEEP_TIME * 10);
                if let Err(e) = clipboard.set_text(previous) {
                    warn!("Failed to restore clipboard text: {}", e);
                }
            }
        }
    }

    /// Puts arbitrary text on the clipboard.
    pub fn copy_text(&mut self, text: &str) -> anyhow::Result<()> {
        let clipboard = self
            .clipboard
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("clipboard unavailable"))?;
        clipboard.set_text(text)?;
        Ok(())
    }
}

fn paste(enigo: &mut Enigo) -> anyhow::Result<()> {
    #[cfg(target_os = "macos")]
    let paste_modifier = Key::Meta;
    #[cfg(not(target_os = "macos"))]
    let paste_modifier = Key::Control;

    enigo.key(paste_modifier, Press)?;
    sleep(SLEEP_TIME);
    enigo.key(Key::Unicode('v'), Click)?;
    sleep(SLEEP_TIME);
    enigo.key(paste_modifier, Release)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan() {
        assert_eq!(
            Plan::new(true, true),
            Plan {
                set_clipboard: true,
                paste: true,
                restore_clipboard: false
            }
        );
        assert_eq!(
            Plan::new(false, true),
            Plan {
                set_clipboard: true,
                paste: true,
                restore_clipboard: true
            }
        );
        assert_eq!(
            Plan::new(true, false),
            Plan {
                set_clipboard: true,
                paste: false,
                restore_clipboard: false
            }
        );
        assert!(!Plan::new(false, false).set_clipboard);
    }
}
