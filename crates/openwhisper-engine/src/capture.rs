//! Background capture of a single key combination.
//!
//! The platform primitive blocks until a combination is pressed, so each
//! capture runs on its own worker thread. At most one session is live: a new
//! [`HotkeyCapture::begin`] cancels the previous session's token, and a late
//! result from a superseded worker is dropped both in the worker and again in
//! [`HotkeyCapture::resolve`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use openwhisper_core::HotkeyAction;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::Deliver;

/// Identifies one capture session.
pub type SessionId = u64;

/// Shared flag a primitive can poll to stop early.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The primitive noticed its token was cancelled
    #[error("capture was cancelled")]
    Cancelled,
    /// The platform input hook failed
    #[error("key capture failed: {0}")]
    Platform(String),
}

/// Blocking source of one key combination.
///
/// Implementations should return [`CaptureError::Cancelled`] soon after
/// `cancel` is set if the platform lets them. Ones that cannot are simply
/// abandoned and their result discarded.
pub trait CapturePrimitive: Send + Sync + 'static {
    fn capture_one_combo(&self, cancel: &CancelToken) -> Result<String, CaptureError>;
}

/// Result of a capture session, delivered at most once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Captured {
        session: SessionId,
        action: HotkeyAction,
        combo: String,
    },
    Failed {
        session: SessionId,
        action: HotkeyAction,
        error: CaptureError,
    },
}

impl CaptureOutcome {
    pub fn session(&self) -> SessionId {
        match self {
            CaptureOutcome::Captured { session, .. } | CaptureOutcome::Failed { session, .. } => {
                *session
            }
        }
    }

    pub fn action(&self) -> HotkeyAction {
        match self {
            CaptureOutcome::Captured { action, .. } | CaptureOutcome::Failed { action, .. } => {
                *action
            }
        }
    }
}

struct ActiveSession {
    id: SessionId,
    action: HotkeyAction,
    cancel: CancelToken,
}

/// Owner of the single in-flight capture.
pub struct HotkeyCapture {
    primitive: Arc<dyn CapturePrimitive>,
    deliver: Deliver<CaptureOutcome>,
    last_session: SessionId,
    active: Option<ActiveSession>,
}

impl HotkeyCapture {
    /// `deliver` is called from the worker thread with each outcome; it
    /// should forward it to the event loop, which passes it to
    /// [`HotkeyCapture::resolve`].
    pub fn new(primitive: Arc<dyn CapturePrimitive>, deliver: Deliver<CaptureOutcome>) -> Self {
        Self {
            primitive,
            deliver,
            last_session: 0,
            active: None,
        }
    }

    /// Starts listening for a combination for `action`, terminating any
    /// capture already in flight.
    pub fn begin(&mut self, action: HotkeyAction) -> Result<SessionId, CaptureError> {
        self.terminate();

        self.last_session += 1;
        let session = self.last_session;
        let cancel = CancelToken::new();

        let primitive = self.primitive.clone();
        let deliver = self.deliver.clone();
        let worker_cancel = cancel.clone();
        thread::Builder::new()
            .name("hotkey-capture".into())
            .spawn(move || run_capture(&*primitive, &worker_cancel, session, action, &deliver))
            .map_err(|e| {
                warn!(action = %action, error = %e, "Failed to spawn hotkey capture worker");
                CaptureError::Platform(e.to_string())
            })?;

        info!(action = %action, session, "Listening for hotkey");
        self.active = Some(ActiveSession {
            id: session,
            action,
            cancel,
        });
        Ok(session)
    }

    /// Accepts an outcome from the event loop. Returns it only if it belongs
    /// to the live session, which then ends.
    pub fn resolve(&mut self, outcome: CaptureOutcome) -> Option<CaptureOutcome> {
        match &self.active {
            Some(active) if active.id == outcome.session() => {
                self.active = None;
                Some(outcome)
            }
            _ => {
                debug!(session = outcome.session(), "Discarding outcome of a finished capture");
                None
            }
        }
    }

    /// Abandons the live capture, if any.
    pub fn cancel(&mut self) {
        self.terminate();
    }

    pub fn is_listening(&self) -> bool {
        self.active.is_some()
    }

    /// The action the live capture is for.
    pub fn listening_for(&self) -> Option<HotkeyAction> {
        self.active.as_ref().map(|active| active.action)
    }

    fn terminate(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(action = %active.action, session = active.id, "Terminating hotkey capture");
            active.cancel.cancel();
        }
    }
}

impl Drop for HotkeyCapture {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn run_capture(
    primitive: &dyn CapturePrimitive,
    cancel: &CancelToken,
    session: SessionId,
    action: HotkeyAction,
    deliver: &Deliver<CaptureOutcome>,
) {
    let result = primitive.capture_one_combo(cancel);

    if cancel.is_cancelled() {
        debug!(session, "Dropping result of a terminated capture");
        return;
    }

    let outcome = match result {
        Ok(combo) => {
            info!(action = %action, combo = %combo, "Hotkey captured");
            CaptureOutcome::Captured {
                session,
                action,
                combo,
            }
        }
        Err(error) => {
            warn!(action = %action, error = %error, "Hotkey capture failed");
            CaptureOutcome::Failed {
                session,
                action,
                error,
            }
        }
    };
    deliver(outcome);
}
