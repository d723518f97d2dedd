//! Coordination engine for openwhisper.
//!
//! Everything here runs on the application's event loop except the hotkey
//! capture worker and the timer tasks, which report back through callbacks
//! that the application turns into loop events.

mod capture;
mod coordinator;
mod editor;
mod overlay;
mod status;
mod timer;

use std::sync::Arc;

pub use capture::{CancelToken, CaptureError, CaptureOutcome, CapturePrimitive, HotkeyCapture, SessionId};
pub use coordinator::{DEFAULT_ANCHOR_OFFSET, LifecycleEvent, RecordingCoordinator};
pub use editor::{HotkeyEditor, LISTENING_TEXT};
pub use overlay::{Anchor, OverlayError, OverlayStateMachine, OverlaySurface};
pub use status::{StatusAction, classify};
pub use timer::{CancelTimer, TimerScheduler, TimerToken, TokioTimerScheduler};

/// Callback used by background work to hand a value back to the event loop.
pub type Deliver<T> = Arc<dyn Fn(T) + Send + Sync>;
