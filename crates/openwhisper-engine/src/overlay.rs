//! The overlay state machine.
//!
//! [`OverlayStateMachine`] is the single source of truth for whether the
//! overlay is visible, where it is, and which [`OverlayState`] it shows. The
//! actual drawing is left to an [`OverlaySurface`].

use openwhisper_core::OverlayState;
use thiserror::Error;
use tracing::debug;

/// Screen position the overlay is shown at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
}

impl Anchor {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// This anchor moved right and down by `offset` pixels.
    pub fn offset(self, offset: i32) -> Self {
        Self {
            x: self.x.saturating_add(offset),
            y: self.y.saturating_add(offset),
        }
    }
}

/// The rendering side of the overlay.
///
/// The state machine only calls `present` on a hidden overlay, `render` on a
/// visible one, and `dismiss` to hide.
pub trait OverlaySurface {
    /// Make the overlay visible at `anchor` showing `state`.
    fn present(&mut self, anchor: Anchor, state: OverlayState);
    /// Switch a visible overlay to `state`.
    fn render(&mut self, state: OverlayState);
    /// Hide the overlay.
    fn dismiss(&mut self);
    /// Current pointer location.
    fn cursor_position(&self) -> Anchor;
}

/// Contract violations on the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OverlayError {
    #[error("overlay is already visible, use set_state")]
    AlreadyVisible,
    #[error("overlay is hidden, use show_at")]
    NotVisible,
}

pub struct OverlayStateMachine<S> {
    surface: S,
    visible: bool,
    state: OverlayState,
    anchor: Option<Anchor>,
}

impl<S: OverlaySurface> OverlayStateMachine<S> {
    /// A hidden overlay drawing onto `surface`.
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            visible: false,
            state: OverlayState::Idle,
            anchor: None,
        }
    }

    /// Shows a hidden overlay at `anchor` in `state`.
    pub fn show_at(&mut self, anchor: Anchor, state: OverlayState) -> Result<(), OverlayError> {
        if self.visible {
            return Err(OverlayError::AlreadyVisible);
        }
        debug!(state = %state, x = anchor.x, y = anchor.y, "Overlay shown");
        self.visible = true;
        self.state = state;
        self.anchor = Some(anchor);
        self.surface.present(anchor, state);
        Ok(())
    }

    /// Moves a visible overlay to `state`, keeping its position.
    pub fn set_state(&mut self, state: OverlayState) -> Result<(), OverlayError> {
        if !self.visible {
            return Err(OverlayError::NotVisible);
        }
        if self.state != state {
            debug!(from = %self.state, to = %state, "Overlay state changed");
        }
        self.state = state;
        self.surface.render(state);
        Ok(())
    }

    /// Hides the overlay. Calling this on a hidden overlay does nothing.
    pub fn hide(&mut self) {
        if !self.visible {
            return;
        }
        debug!(state = %self.state, "Overlay hidden");
        self.visible = false;
        self.state = OverlayState::Idle;
        self.anchor = None;
        self.surface.dismiss();
    }

    pub fn current_state(&self) -> OverlayState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Where the overlay was last shown, while it is visible.
    pub fn anchor(&self) -> Option<Anchor> {
        self.anchor
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}
