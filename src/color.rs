//! macOS system colors, used to tint the tray icon per overlay state.
//!
//! https://developer.apple.com/design/human-interface-guidelines/color#macOS-system-colors

use openwhisper_core::OverlayState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub default_light: (u8, u8, u8),
    pub default_dark: (u8, u8, u8),
}

pub static RED: Color = Color {
    default_light: (255, 59, 48),
    default_dark: (255, 69, 58),
};

pub static ORANGE: Color = Color {
    default_light: (255, 149, 0),
    default_dark: (255, 159, 10),
};

pub static YELLOW: Color = Color {
    default_light: (255, 204, 0),
    default_dark: (255, 214, 10),
};

pub static GREEN: Color = Color {
    default_light: (40, 205, 65),
    default_dark: (50, 215, 75),
};

pub static MINT: Color = Color {
    default_light: (0, 199, 190),
    default_dark: (102, 212, 207),
};

pub static BLUE: Color = Color {
    default_light: (0, 122, 255),
    default_dark: (10, 132, 255),
};

pub static PURPLE: Color = Color {
    default_light: (175, 82, 222),
    default_dark: (191, 90, 242),
};

pub static GRAY: Color = Color {
    default_light: (142, 142, 147),
    default_dark: (152, 152, 157),
};

/// The tint shown for `state`.
pub fn for_state(state: OverlayState) -> Color {
    match state {
        OverlayState::Idle => GRAY,
        OverlayState::Recording => RED,
        OverlayState::Processing => ORANGE,
        OverlayState::Transcribing => BLUE,
        OverlayState::Canceling => YELLOW,
        OverlayState::Copied => GREEN,
        OverlayState::SttEnabled => MINT,
        OverlayState::SttDisabled => PURPLE,
    }
}
