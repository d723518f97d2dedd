//! Key capture backed by a global `rdev` input hook.
//!
//! `rdev::listen` never returns, so one listener thread is started for the
//! whole process and forwards key events to whichever capture currently
//! holds the sink. A capture polls its cancel token between events.

use std::sync::Once;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use openwhisper_engine::{CancelToken, CaptureError, CapturePrimitive};
use parking_lot::{Mutex, const_mutex};
use rdev::{EventType, Key};
use tracing::{debug, error};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

struct Listener {
    started: Once,
    generation: AtomicU64,
    sink: Mutex<Option<(u64, Sender<EventType>)>>,
    failure: Mutex<Option<String>>,
}

static LISTENER: Listener = Listener {
    started: Once::new(),
    generation: AtomicU64::new(0),
    sink: const_mutex(None),
    failure: const_mutex(None),
};

impl Listener {
    fn ensure_running(&'static self) {
        self.started.call_once(|| {
            let spawned = thread::Builder::new()
                .name("key-listener".into())
                .spawn(move || {
                    let result = rdev::listen(move |event| {
                        if let Some((_, sink)) = &*self.sink.lock() {
                            let _ = sink.send(event.event_type);
                        }
                    });
                    if let Err(e) = result {
                        error!("Keyboard listener stopped: {:?}", e);
                        *self.failure.lock() = Some(format!("{:?}", e));
                    }
                });
            if let Err(e) = spawned {
                error!("Failed to start keyboard listener: {}", e);
                *self.failure.lock() = Some(e.to_string());
            }
        });
    }

    /// Routes key events to a fresh channel, taking them from any earlier
    /// capture.
    fn attach(&self) -> (u64, Receiver<EventType>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::channel();
        *self.sink.lock() = Some((generation, tx));
        (generation, rx)
    }

    fn detach(&self, generation: u64) {
        let mut sink = self.sink.lock();
        if matches!(&*sink, Some((current, _)) if *current == generation) {
            *sink = None;
        }
    }

    fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }
}

/// The platform [`CapturePrimitive`].
#[derive(Debug, Default)]
pub struct RdevCapture;

impl RdevCapture {
    pub fn new() -> Self {
        Self
    }
}

impl CapturePrimitive for RdevCapture {
    fn capture_one_combo(&self, cancel: &CancelToken) -> Result<String, CaptureError> {
        LISTENER.ensure_running();
        let (generation, events) = LISTENER.attach();
        let result = wait_for_combo(&events, cancel);
        LISTENER.detach(generation);
        result
    }
}

fn wait_for_combo(events: &Receiver<EventType>, cancel: &CancelToken) -> Result<String, CaptureError> {
    let mut builder = ComboBuilder::default();
    loop {
        if cancel.is_cancelled() {
            return Err(CaptureError::Cancelled);
        }
        if let Some(reason) = LISTENER.failure() {
            return Err(CaptureError::Platform(reason));
        }
        match events.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                if let Some(combo) = builder.feed(event) {
                    return Ok(combo);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Another capture took over the keyboard listener");
                return Err(CaptureError::Cancelled);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Win,
}

impl Modifier {
    fn of(key: Key) -> Option<Self> {
        match key {
            Key::ControlLeft | Key::ControlRight => Some(Modifier::Ctrl),
            Key::Alt | Key::AltGr => Some(Modifier::Alt),
            Key::ShiftLeft | Key::ShiftRight => Some(Modifier::Shift),
            Key::MetaLeft | Key::MetaRight => Some(Modifier::Win),
            _ => None,
        }
    }
}

/// Folds raw key events into `mod+mod+key`. The combo is complete on the
/// first press of a key that is not a modifier.
#[derive(Debug, Default)]
struct ComboBuilder {
    ctrl: bool,
    alt: bool,
    shift: bool,
    win: bool,
}

impl ComboBuilder {
    fn feed(&mut self, event: EventType) -> Option<String> {
        match event {
            EventType::KeyPress(key) => match Modifier::of(key) {
                Some(modifier) => {
                    self.hold(modifier, true);
                    None
                }
                None => key_name(key).map(|name| self.render(name)),
            },
            EventType::KeyRelease(key) => {
                if let Some(modifier) = Modifier::of(key) {
                    self.hold(modifier, false);
                }
                None
            }
            _ => None,
        }
    }

    fn hold(&mut self, modifier: Modifier, held: bool) {
        match modifier {
            Modifier::Ctrl => self.ctrl = held,
            Modifier::Alt => self.alt = held,
            Modifier::Shift => self.shift = held,
            Modifier::Win => self.win = held,
        }
    }

    fn render(&self, key: &str) -> String {
        let held = [
            (self.ctrl, "ctrl"),
            (self.alt, "alt"),
            (self.shift, "shift"),
            (self.win, "win"),
        ];
        let mut parts: Vec<&str> = held
            .iter()
            .filter(|(down, _)| *down)
            .map(|(_, name)| *name)
            .collect();
        parts.push(key);
        parts.join("+")
    }
}

/// Name of a non-modifier key as it appears in a combo.
fn key_name(key: Key) -> Option<&'static str> {
    let name = match key {
        Key::KeyA => "a",
        Key::KeyB => "b",
        Key::KeyC => "c",
        Key::KeyD => "d",
        Key::KeyE => "e",
        Key::KeyF => "f",
        Key::KeyG => "g",
        Key::KeyH => "h",
        Key::KeyI => "i",
        Key::KeyJ => "j",
        Key::KeyK => "k",
        Key::KeyL => "l",
        Key::KeyM => "m",
        Key::KeyN => "n",
        Key::KeyO => "o",
        Key::KeyP => "p",
        Key::KeyQ => "q",
        Key::KeyR => "r",
        Key::KeyS => "s",
        Key::KeyT => "t",
        Key::KeyU => "u",
        Key::KeyV => "v",
        Key::KeyW => "w",
        Key::KeyX => "x",
        Key::KeyY => "y",
        Key::KeyZ => "z",
        Key::Num0 | Key::Kp0 => "0",
        Key::Num1 | Key::Kp1 => "1",
        Key::Num2 | Key::Kp2 => "2",
        Key::Num3 | Key::Kp3 => "3",
        Key::Num4 | Key::Kp4 => "4",
        Key::Num5 | Key::Kp5 => "5",
        Key::Num6 | Key::Kp6 => "6",
        Key::Num7 | Key::Kp7 => "7",
        Key::Num8 | Key::Kp8 => "8",
        Key::Num9 | Key::Kp9 => "9",
        Key::F1 => "f1",
        Key::F2 => "f2",
        Key::F3 => "f3",
        Key::F4 => "f4",
        Key::F5 => "f5",
        Key::F6 => "f6",
        Key::F7 => "f7",
        Key::F8 => "f8",
        Key::F9 => "f9",
        Key::F10 => "f10",
        Key::F11 => "f11",
        Key::F12 => "f12",
        Key::KpMultiply => "*",
        Key::KpMinus | Key::Minus => "-",
        Key::KpPlus => "+",
        Key::KpDivide | Key::Slash => "/",
        Key::Equal => "=",
        Key::Comma => ",",
        Key::Dot => ".",
        Key::SemiColon => ";",
        Key::Quote => "'",
        Key::BackQuote => "`",
        Key::LeftBracket => "[",
        Key::RightBracket => "]",
        Key::BackSlash => "\\",
        Key::Escape => "esc",
        Key::Space => "space",
        Key::Return | Key::KpReturn => "enter",
        Key::Tab => "tab",
        Key::Backspace => "backspace",
        Key::Delete | Key::KpDelete => "delete",
        Key::Insert => "insert",
        Key::Home => "home",
        Key::End => "end",
        Key::PageUp => "pageup",
        Key::PageDown => "pagedown",
        Key::UpArrow => "up",
        Key::DownArrow => "down",
        Key::LeftArrow => "left",
        Key::RightArrow => "right",
        Key::PrintScreen => "printscreen",
        Key::ScrollLock => "scrolllock",
        Key::Pause => "pause",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(events: &[EventType]) -> Option<String> {
        let mut builder = ComboBuilder::default();
        events.iter().find_map(|event| builder.feed(*event))
    }

    #[test]
    fn test_plain_key() {
        assert_eq!(feed_all(&[EventType::KeyPress(Key::F9)]), Some("f9".into()));
        assert_eq!(feed_all(&[EventType::KeyPress(Key::KpMultiply)]), Some("*".into()));
    }

    #[test]
    fn test_modifiers_in_canonical_order() {
        let combo = feed_all(&[
            EventType::KeyPress(Key::AltGr),
            EventType::KeyPress(Key::ControlLeft),
            EventType::KeyPress(Key::KpMultiply),
        ]);
        assert_eq!(combo.as_deref(), Some("ctrl+alt+*"));

        let combo = feed_all(&[
            EventType::KeyPress(Key::MetaLeft),
            EventType::KeyPress(Key::ShiftRight),
            EventType::KeyPress(Key::KeyR),
        ]);
        assert_eq!(combo.as_deref(), Some("shift+win+r"));
    }

    #[test]
    fn test_released_modifier_is_dropped() {
        let combo = feed_all(&[
            EventType::KeyPress(Key::ShiftLeft),
            EventType::KeyRelease(Key::ShiftLeft),
            EventType::KeyPress(Key::Escape),
        ]);
        assert_eq!(combo.as_deref(), Some("esc"));
    }

    #[test]
    fn test_modifiers_alone_do_not_complete() {
        assert_eq!(
            feed_all(&[
                EventType::KeyPress(Key::ControlLeft),
                EventType::KeyPress(Key::Alt),
                EventType::KeyRelease(Key::Alt),
            ]),
            None
        );
        assert_eq!(feed_all(&[EventType::KeyPress(Key::Unknown(999))]), None);
    }

    #[test]
    fn test_rendered_combos_validate() {
        let combos = [
            feed_all(&[EventType::KeyPress(Key::ControlLeft), EventType::KeyPress(Key::KpPlus)]),
            feed_all(&[EventType::KeyPress(Key::Minus)]),
            feed_all(&[EventType::KeyPress(Key::MetaRight), EventType::KeyPress(Key::Space)]),
        ];
        for combo in combos.into_iter().flatten() {
            openwhisper_core::validate_combo(&combo).unwrap();
        }
    }

    #[test]
    fn test_detach_keeps_newer_sink() {
        let (first, _first_rx) = LISTENER.attach();
        let (second, _second_rx) = LISTENER.attach();
        LISTENER.detach(first);
        assert!(matches!(&*LISTENER.sink.lock(), Some((g, _)) if *g == second));
        LISTENER.detach(second);
        assert!(LISTENER.sink.lock().is_none());
    }
}
