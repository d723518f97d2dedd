//! Overlay surface shown through the tray icon.
//!
//! The tray icon is tinted for the current state and its tooltip carries the
//! caption. The icon itself only exists once the event loop has started, so
//! updates before [`TrayOverlay::attach`] are remembered and applied then.

use enigo::{Enigo, Mouse};
use openwhisper_core::{APP_NAME_PRETTY, OverlayState};
use openwhisper_engine::{Anchor, OverlaySurface};
use tracing::{debug, warn};
use tray_icon::TrayIcon;

use crate::icon::icon_for;

pub struct TrayOverlay {
    tray: Option<TrayIcon>,
    pointer: Option<Enigo>,
    painted: OverlayState,
}

impl Default for TrayOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl TrayOverlay {
    pub fn new() -> Self {
        let pointer = Enigo::new(&enigo::Settings::default())
            .map_err(|e| warn!("Pointer location unavailable, overlay will anchor at the origin: {}", e))
            .ok();
        Self {
            tray: None,
            pointer,
            painted: OverlayState::Idle,
        }
    }

    /// Starts drawing onto `tray`.
    pub fn attach(&mut self, tray: TrayIcon) {
        self.tray = Some(tray);
        self.paint(self.painted);
    }

    /// Releases the tray icon, removing it from the system tray.
    pub fn detach(&mut self) -> Option<TrayIcon> {
        self.tray.take()
    }

    fn paint(&mut self, state: OverlayState) {
        self.painted = state;
        let Some(tray) = &self.tray else {
            return;
        };

        match icon_for(state) {
            Ok(icon) => {
                if let Err(e) = tray.set_icon(Some(icon)) {
                    warn!(state = %state, "Failed to set tray icon: {}", e);
                }
            }
            Err(e) => warn!(state = %state, "Failed to build tray icon: {}", e),
        }

        if let Err(e) = tray.set_tooltip(Some(tooltip(state))) {
            debug!("Failed to set tray tooltip: {}", e);
        }
    }
}

fn tooltip(state: OverlayState) -> String {
    match state.caption() {
        "" => format!("{} - speech to text", APP_NAME_PRETTY),
        caption => format!("{} - {}", APP_NAME_PRETTY, caption),
    }
}

impl OverlaySurface for TrayOverlay {
    fn present(&mut self, anchor: Anchor, state: OverlayState) {
        debug!(x = anchor.x, y = anchor.y, state = %state, "Presenting overlay");
        self.paint(state);
    }

    fn render(&mut self, state: OverlayState) {
        self.paint(state);
    }

    fn dismiss(&mut self) {
        self.paint(OverlayState::Idle);
    }

    fn cursor_position(&self) -> Anchor {
        let Some(pointer) = &self.pointer else {
            return Anchor::default();
        };
        match pointer.location() {
            Ok((x, y)) => Anchor::new(x, y),
            Err(e) => {
                debug!("Failed to read pointer location: {}", e);
                Anchor::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tooltip() {
        assert_eq!(tooltip(OverlayState::Idle), "OpenWhisper - speech to text");
        assert_eq!(tooltip(OverlayState::Recording), "OpenWhisper - Recording...");
        assert_eq!(tooltip(OverlayState::SttDisabled), "OpenWhisper - STT Disabled");
    }
}
