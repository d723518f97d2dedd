//! Application events for the tao event loop.

use std::sync::Arc;

use global_hotkey::GlobalHotKeyEvent;
use openwhisper_engine::{CaptureOutcome, Deliver, TimerToken};
use parking_lot::Mutex;
use tao::event_loop::EventLoopProxy;
use tracing::debug;
use tray_icon::menu::MenuEvent;

use crate::sidecar::BackendMessage;

/// Events posted to the loop from background threads.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A tray menu item was clicked
    Menu(MenuEvent),
    /// A registered global hotkey changed state
    Hotkey(GlobalHotKeyEvent),
    /// A status line from the transcription backend
    Status(String),
    /// A finished transcript from the backend
    Transcript(String),
    /// The backend closed its output
    BackendExited,
    /// A cancel timer fired
    CancelTimer(TimerToken),
    /// A hotkey capture session finished
    HotkeyCaptured(CaptureOutcome),
}

impl From<BackendMessage> for AppEvent {
    fn from(message: BackendMessage) -> Self {
        match message {
            BackendMessage::Status(text) => AppEvent::Status(text),
            BackendMessage::Transcript(text) => AppEvent::Transcript(text),
            BackendMessage::Exited => AppEvent::BackendExited,
        }
    }
}

/// Turns values produced off the loop into [`AppEvent`]s posted on it.
pub fn forward<T: 'static>(proxy: EventLoopProxy<AppEvent>, wrap: fn(T) -> AppEvent) -> Deliver<T> {
    let proxy = Mutex::new(proxy);
    Arc::new(move |value| {
        if proxy.lock().send_event(wrap(value)).is_err() {
            debug!("Event loop closed, dropping event");
        }
    })
}
