use std::sync::Arc;
use std::sync::mpsc::Receiver;

use anyhow::{Context, Result};
use global_hotkey::{GlobalHotKeyEvent, HotKeyState};
use openwhisper::capture::RdevCapture;
use openwhisper::event::{AppEvent, forward};
use openwhisper::hotkeys::HotkeyRegistry;
use openwhisper::icon::icon_for;
use openwhisper::notify::NotificationLayer;
use openwhisper::output::TranscriptOutput;
use openwhisper::sidecar::{Backend, BackendMessage};
use openwhisper::surface::TrayOverlay;
use openwhisper::{
    APP_NAME_PRETTY, ConfigManager, DEFAULT_LOG_LEVEL, HotkeyAction, HotkeyCapture, HotkeyEditor,
    LifecycleEvent, OverlayState, RecordingCoordinator, SettingsStore, TokioTimerScheduler, VERSION,
};
use openwhisper_engine::CapturePrimitive;
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tray_icon::TrayIconBuilder;
use tray_icon::menu::{AboutMetadataBuilder, Menu, MenuEvent, MenuItem, PredefinedMenuItem, Submenu};

type Coordinator = RecordingCoordinator<TrayOverlay, TokioTimerScheduler>;

fn main() -> Result<()> {
    // Initialize the logger
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("OPENWHISPER_LOG")
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .finish()
        .with(NotificationLayer::new())
        .init();

    // Load config
    let config_manager = ConfigManager::new()?;
    let config = config_manager.load()?;
    // save back the config to create the file if it doesn't exist
    config_manager.save(&config)?;
    let store = SettingsStore::new(config_manager.settings_path(&config));
    info!(settings = %store.path().display(), "Using settings document");

    let event_loop: EventLoop<AppEvent> = EventLoopBuilder::with_user_event().build();
    let proxy = event_loop.create_proxy();

    // Menu and hotkey events are forwarded into the loop so they wake it.
    let on_menu = forward(proxy.clone(), AppEvent::Menu);
    MenuEvent::set_event_handler(Some(move |event| on_menu(event)));
    let on_hotkey = forward(proxy.clone(), AppEvent::Hotkey);
    GlobalHotKeyEvent::set_event_handler(Some(move |event| on_hotkey(event)));

    let scheduler = TokioTimerScheduler::new(forward(proxy.clone(), AppEvent::CancelTimer))
        .context("Failed to start timer runtime")?;
    let mut coordinator = RecordingCoordinator::new(
        TrayOverlay::new(),
        scheduler,
        config.cancel_timer_duration(),
    )
    .with_anchor_offset(config.overlay_offset());
    let lifecycle_events = coordinator.subscribe();

    let backend = config.backend().and_then(|argv| {
        match Backend::spawn(argv, forward::<BackendMessage>(proxy.clone(), AppEvent::from)) {
            Ok(backend) => Some(backend),
            Err(e) => {
                error!("Failed to start transcription backend: {}", e);
                None
            }
        }
    });

    let mut registry = HotkeyRegistry::new().context("Failed to create hotkey manager")?;
    registry.register_all(&store.load_bindings());

    let menu = TrayMenu::new()?;

    let mut app = App {
        coordinator,
        lifecycle_events,
        backend,
        store,
        registry,
        editor: None,
        primitive: Arc::new(RdevCapture::new()),
        proxy,
        output: TranscriptOutput::new(),
        menu,
    };
    app.refresh_hotkey_labels();

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::NewEvents(StartCause::Init) => {
                // We create the icon once the event loop is actually running
                // to prevent issues like https://github.com/tauri-apps/tray-icon/issues/90
                if let Err(e) = app.create_tray() {
                    error!("Failed to create tray icon: {:#}", e);
                    *control_flow = ControlFlow::Exit;
                    return;
                }

                // We have to request a redraw here to have the icon actually show up.
                // Tao only exposes a redraw method on the Window so we use core-foundation directly.
                #[cfg(target_os = "macos")]
                unsafe {
                    use core_foundation::runloop::{CFRunLoopGetMain, CFRunLoopWakeUp};

                    let rl = CFRunLoopGetMain();
                    CFRunLoopWakeUp(rl);
                }

                info!("{} ready", APP_NAME_PRETTY);
            }
            Event::UserEvent(event) => {
                if app.handle(event) == Flow::Quit {
                    app.coordinator.surface_mut().detach();
                    *control_flow = ControlFlow::Exit;
                }
            }
            _ => {}
        }

        app.forward_lifecycle();
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct App {
    coordinator: Coordinator,
    lifecycle_events: Receiver<LifecycleEvent>,
    backend: Option<Backend>,
    store: SettingsStore,
    registry: HotkeyRegistry,
    editor: Option<HotkeyEditor>,
    primitive: Arc<dyn CapturePrimitive>,
    proxy: EventLoopProxy<AppEvent>,
    output: TranscriptOutput,
    menu: TrayMenu,
}

impl App {
    fn create_tray(&mut self) -> Result<()> {
        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(self.menu.menu.clone()))
            .with_tooltip(format!("{} - speech to text", APP_NAME_PRETTY))
            .with_icon(icon_for(OverlayState::Idle)?)
            .build()?;
        self.coordinator.surface_mut().attach(tray);
        Ok(())
    }

    fn handle(&mut self, event: AppEvent) -> Flow {
        match event {
            AppEvent::Menu(event) => return self.handle_menu(event),
            AppEvent::Hotkey(event) => self.handle_hotkey(event),
            AppEvent::Status(text) => {
                debug!(status = %text, "Backend status");
                self.coordinator.status_update(&text);
            }
            AppEvent::Transcript(text) => {
                self.coordinator.transcription_received(text.as_str());
                let settings = self.store.load_all();
                self.output
                    .deliver(&text, settings.copy_clipboard(), settings.auto_paste());
            }
            AppEvent::BackendExited => {
                warn!("Transcription backend exited");
                self.backend = None;
                self.coordinator.cancel_recording();
            }
            AppEvent::CancelTimer(token) => self.coordinator.on_cancel_timer(token),
            AppEvent::HotkeyCaptured(outcome) => {
                match self.editor.as_mut() {
                    Some(editor) => {
                        editor.on_capture(outcome);
                    }
                    None => debug!("Hotkey captured after the editor closed"),
                }
                self.refresh_hotkey_labels();
            }
        }
        Flow::Continue
    }

    fn handle_hotkey(&mut self, event: GlobalHotKeyEvent) {
        if event.state() != HotKeyState::Pressed {
            return;
        }
        // Keys pressed while capturing belong to the capture.
        if self.editor.as_ref().is_some_and(|e| e.listening_for().is_some()) {
            return;
        }
        match self.registry.action_for(event.id()) {
            Some(HotkeyAction::RecordToggle) => self.coordinator.toggle_recording(),
            Some(HotkeyAction::Cancel) => self.coordinator.cancel_recording(),
            Some(HotkeyAction::EnableDisable) => self.toggle_enabled(),
            None => debug!(id = event.id(), "Unknown hotkey"),
        }
    }

    fn handle_menu(&mut self, event: MenuEvent) -> Flow {
        let menu = &self.menu;
        if event.id == menu.quit.id() {
            return Flow::Quit;
        } else if event.id == menu.toggle_recording.id() {
            self.coordinator.toggle_recording();
        } else if event.id == menu.toggle_enabled.id() {
            self.toggle_enabled();
        } else if event.id == menu.copy_settings_path.id() {
            let path = self.store.path().to_string_lossy().into_owned();
            if let Err(e) = self.output.copy_text(&path) {
                error!("Failed to copy settings path to clipboard: {}", e);
            }
        } else if event.id == menu.hotkeys_reset.id() {
            self.editor().reset_to_defaults();
            self.refresh_hotkey_labels();
        } else if event.id == menu.hotkeys_save.id() {
            self.save_hotkeys();
        } else if event.id == menu.hotkeys_discard.id() {
            if let Some(editor) = self.editor.take() {
                editor.discard();
            }
            self.refresh_hotkey_labels();
        } else if let Some(action) = menu.field_action(&event) {
            if let Err(e) = self.editor().begin_capture(action) {
                warn!(action = %action, "Failed to start hotkey capture: {}", e);
            }
            self.refresh_hotkey_labels();
        }
        Flow::Continue
    }

    fn toggle_enabled(&mut self) {
        let enabled = self.coordinator.toggle_enabled();
        self.menu.show_enabled(enabled);
    }

    /// The open hotkey editor, opening one on the saved bindings if needed.
    fn editor(&mut self) -> &mut HotkeyEditor {
        let store = &self.store;
        let primitive = &self.primitive;
        let proxy = &self.proxy;
        self.editor.get_or_insert_with(|| {
            let capture = HotkeyCapture::new(
                primitive.clone(),
                forward(proxy.clone(), AppEvent::HotkeyCaptured),
            );
            HotkeyEditor::open(store, capture)
        })
    }

    fn save_hotkeys(&mut self) {
        let Some(editor) = self.editor.as_mut() else {
            debug!("No hotkey changes to save");
            return;
        };
        match editor.save(&self.store) {
            Ok(()) => {
                self.registry.register_all(editor.bindings());
                self.editor = None;
            }
            Err(e) if e.is_validation() => warn!("Hotkeys not saved: {}", e),
            // Already logged by the store
            Err(_) => {}
        }
        self.refresh_hotkey_labels();
    }

    fn refresh_hotkey_labels(&self) {
        let saved = self.store.load_bindings();
        for (action, item) in &self.menu.hotkey_fields {
            let shown = match &self.editor {
                Some(editor) => editor.display(*action),
                None => saved.get(*action),
            };
            item.set_text(format!("{}: {}", action.label(), shown));
        }
    }

    /// Passes lifecycle transitions on to the backend.
    fn forward_lifecycle(&mut self) {
        for event in self.lifecycle_events.try_iter() {
            match self.backend.as_mut() {
                Some(backend) => {
                    if let Err(e) = backend.send(event) {
                        error!("Failed to notify backend: {}", e);
                    }
                }
                None => debug!(event = ?event, "No backend to notify"),
            }
        }
    }
}

struct TrayMenu {
    menu: Menu,
    toggle_recording: MenuItem,
    toggle_enabled: MenuItem,
    hotkey_fields: Vec<(HotkeyAction, MenuItem)>,
    hotkeys_reset: MenuItem,
    hotkeys_save: MenuItem,
    hotkeys_discard: MenuItem,
    copy_settings_path: MenuItem,
    quit: MenuItem,
}

impl TrayMenu {
    fn new() -> Result<Self> {
        let toggle_recording = MenuItem::new("Toggle Recording", true, None);
        let toggle_enabled = MenuItem::new("Disable Speech-to-Text", true, None);
        let hotkey_fields: Vec<(HotkeyAction, MenuItem)> = HotkeyAction::ALL
            .into_iter()
            .map(|action| (action, MenuItem::new(action.label(), true, None)))
            .collect();
        let hotkeys_reset = MenuItem::new("Reset to Defaults", true, None);
        let hotkeys_save = MenuItem::new("Save Hotkeys", true, None);
        let hotkeys_discard = MenuItem::new("Discard Changes", true, None);
        let copy_settings_path = MenuItem::new("Copy settings path", true, None);
        let quit = MenuItem::new("Quit", true, None);

        let hotkeys = Submenu::new("Hotkeys", true);
        for (_, item) in &hotkey_fields {
            hotkeys.append(item)?;
        }
        hotkeys.append_items(&[
            &PredefinedMenuItem::separator(),
            &hotkeys_reset,
            &hotkeys_save,
            &hotkeys_discard,
        ])?;

        let menu = Menu::new();
        menu.append_items(&[
            // the name of the app
            &MenuItem::new(APP_NAME_PRETTY, false, None),
            &PredefinedMenuItem::separator(),
            &toggle_recording,
            &toggle_enabled,
            &hotkeys,
            &PredefinedMenuItem::separator(),
            &PredefinedMenuItem::about(
                None,
                Some(
                    AboutMetadataBuilder::new()
                        .version(Some(VERSION.to_owned()))
                        .build(),
                ),
            ),
            &copy_settings_path,
            &PredefinedMenuItem::separator(),
            &quit,
        ])?;

        Ok(Self {
            menu,
            toggle_recording,
            toggle_enabled,
            hotkey_fields,
            hotkeys_reset,
            hotkeys_save,
            hotkeys_discard,
            copy_settings_path,
            quit,
        })
    }

    fn field_action(&self, event: &MenuEvent) -> Option<HotkeyAction> {
        self.hotkey_fields
            .iter()
            .find(|(_, item)| event.id == item.id())
            .map(|(action, _)| *action)
    }

    fn show_enabled(&self, enabled: bool) {
        self.toggle_enabled.set_text(if enabled {
            "Disable Speech-to-Text"
        } else {
            "Enable Speech-to-Text"
        });
    }
}
