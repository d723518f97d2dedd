//! Ties the recording lifecycle, backend status updates and the overlay
//! together.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use openwhisper_core::{OverlayState, RecordingLifecycle};
use tracing::{debug, info, warn};

use crate::overlay::{OverlayStateMachine, OverlaySurface};
use crate::status::{StatusAction, classify};
use crate::timer::{CancelTimer, TimerScheduler, TimerToken};

/// Pixels between the pointer and a freshly shown overlay.
pub const DEFAULT_ANCHOR_OFFSET: i32 = 10;

const STT_ENABLED: &str = "STT Enabled";
const STT_DISABLED: &str = "STT Disabled";

/// An effective lifecycle transition, sent to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Started,
    Stopped,
    Canceled,
}

impl LifecycleEvent {
    /// Command word sent to the transcription backend.
    pub fn command(&self) -> &'static str {
        match self {
            LifecycleEvent::Started => "start",
            LifecycleEvent::Stopped => "stop",
            LifecycleEvent::Canceled => "cancel",
        }
    }
}

pub struct RecordingCoordinator<S, T> {
    lifecycle: RecordingLifecycle,
    overlay: OverlayStateMachine<S>,
    cancel_timer: CancelTimer,
    scheduler: T,
    anchor_offset: i32,
    transcript: Option<String>,
    enabled: bool,
    subscribers: Vec<Sender<LifecycleEvent>>,
}

impl<S: OverlaySurface, T: TimerScheduler> RecordingCoordinator<S, T> {
    /// `cancel_duration` is how long the cancel animation stays up,
    /// margin included.
    pub fn new(surface: S, scheduler: T, cancel_duration: Duration) -> Self {
        Self {
            lifecycle: RecordingLifecycle::Idle,
            overlay: OverlayStateMachine::new(surface),
            cancel_timer: CancelTimer::new(cancel_duration),
            scheduler,
            anchor_offset: DEFAULT_ANCHOR_OFFSET,
            transcript: None,
            enabled: true,
            subscribers: Vec::new(),
        }
    }

    pub fn with_anchor_offset(mut self, offset: i32) -> Self {
        self.anchor_offset = offset;
        self
    }

    pub fn start_recording(&mut self) {
        if !self.enabled {
            debug!("Speech-to-text disabled, ignoring start");
            return;
        }
        if self.lifecycle.is_recording() {
            debug!("Already recording, ignoring start");
            return;
        }
        info!("Recording started");
        self.lifecycle = RecordingLifecycle::Recording;
        self.publish(LifecycleEvent::Started);
        self.reflect(OverlayState::Recording);
    }

    pub fn stop_recording(&mut self) {
        if !self.lifecycle.is_recording() {
            debug!("Not recording, ignoring stop");
            return;
        }
        info!("Recording stopped");
        self.lifecycle = RecordingLifecycle::Idle;
        self.publish(LifecycleEvent::Stopped);
        self.reflect(OverlayState::Processing);
    }

    pub fn cancel_recording(&mut self) {
        if !self.lifecycle.is_recording() {
            debug!("Not recording, ignoring cancel");
            return;
        }
        info!("Recording canceled");
        self.lifecycle = RecordingLifecycle::Idle;
        self.publish(LifecycleEvent::Canceled);
        self.enter_cancel();
    }

    pub fn toggle_recording(&mut self) {
        if self.lifecycle.is_recording() {
            self.stop_recording();
        } else {
            self.start_recording();
        }
    }

    /// Applies a free-text status message from the backend.
    pub fn status_update(&mut self, text: &str) {
        match classify(text) {
            StatusAction::Cancel => self.enter_cancel(),
            StatusAction::Show(state) => self.reflect(state),
            StatusAction::Hide => self.overlay.hide(),
            StatusAction::Ignore => debug!(status = text, "Status has no overlay effect"),
        }
    }

    /// Keeps the transcript for display and hides the overlay.
    pub fn transcription_received(&mut self, text: impl Into<String>) {
        let text = text.into();
        debug!(chars = text.chars().count(), "Transcript received");
        self.transcript = Some(text);
        self.overlay.hide();
    }

    /// Handles an expired cancel timer delivered by the scheduler.
    pub fn on_cancel_timer(&mut self, token: TimerToken) {
        if !self.cancel_timer.expire(token) {
            return;
        }
        let state = self.overlay.current_state();
        if state.auto_hides() {
            self.overlay.hide();
        } else {
            debug!(state = %state, "Overlay moved on, leaving it visible");
        }
    }

    /// Flips speech-to-text on or off and shows the matching status.
    /// Returns the new setting.
    pub fn toggle_enabled(&mut self) -> bool {
        self.enabled = !self.enabled;
        info!(enabled = self.enabled, "Speech-to-text toggled");
        let status = if self.enabled { STT_ENABLED } else { STT_DISABLED };
        self.status_update(status);
        self.enabled
    }

    /// Receives every effective lifecycle transition from now on.
    pub fn subscribe(&mut self) -> Receiver<LifecycleEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn lifecycle(&self) -> RecordingLifecycle {
        self.lifecycle
    }

    pub fn overlay(&self) -> &OverlayStateMachine<S> {
        &self.overlay
    }

    /// The last transcript, cleared when a recording is canceled.
    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The rendering layer, for setup the state machine does not cover.
    pub fn surface_mut(&mut self) -> &mut S {
        self.overlay.surface_mut()
    }

    pub fn scheduler(&self) -> &T {
        &self.scheduler
    }

    /// Shows `state`, opening the overlay at the pointer if it is hidden.
    fn reflect(&mut self, state: OverlayState) {
        let result = if self.overlay.is_visible() {
            self.overlay.set_state(state)
        } else {
            let anchor = self
                .overlay
                .surface()
                .cursor_position()
                .offset(self.anchor_offset);
            self.overlay.show_at(anchor, state)
        };
        if let Err(e) = result {
            warn!(state = %state, error = %e, "Overlay rejected update");
        }
    }

    fn enter_cancel(&mut self) {
        self.transcript = None;
        self.reflect(OverlayState::Canceling);
        self.cancel_timer.arm(&mut self.scheduler);
    }

    fn publish(&mut self, event: LifecycleEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}
