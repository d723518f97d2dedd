//! Tray icons, drawn as a tinted dot per overlay state.

use image::{Rgba, RgbaImage};
use openwhisper_core::OverlayState;
use tray_icon::{BadIcon, Icon};

use crate::color::{self, Color};

const ICON_SIZE: u32 = 32;

/// Builds the tray icon for `state`.
pub fn icon_for(state: OverlayState) -> Result<Icon, BadIcon> {
    let image = draw_dot(color::for_state(state), ICON_SIZE);
    let (width, height) = image.dimensions();
    Icon::from_rgba(image.into_raw(), width, height)
}

/// A filled circle in `color` on a transparent square.
fn draw_dot(color: Color, size: u32) -> RgbaImage {
    let (r, g, b) = color.default_dark;
    let center = (size as f32 - 1.0) / 2.0;
    let radius = size as f32 / 2.0 - 1.0;

    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        if dx * dx + dy * dy <= radius * radius {
            Rgba([r, g, b, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}
