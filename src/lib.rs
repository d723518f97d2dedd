// Re-export from sub-crates
pub use openwhisper_core::{
    APP_NAME, APP_NAME_PRETTY, Config, ConfigManager, DEFAULT_LOG_LEVEL, HotkeyAction,
    HotkeyBindings, OverlayState, SettingsStore,
};
pub use openwhisper_engine::{
    HotkeyCapture, HotkeyEditor, LifecycleEvent, RecordingCoordinator, TokioTimerScheduler,
};

// App-specific modules
pub mod capture;
pub mod color;
pub mod event;
pub mod hotkeys;
pub mod icon;
pub mod notify;
pub mod output;
pub mod sidecar;
pub mod surface;

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
