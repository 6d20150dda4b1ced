//! Observer Components
//!
//! Observers are the scarce side of every trigger query: the engine
//! iterates observers and carriers, never machines, when searching space.

use bevy_ecs::prelude::*;

use super::machine::Position;

/// Marker component: a player-controlled observer avatar
#[derive(Component, Debug, Clone, Copy)]
pub struct Observer;

/// Marker component: the observer is currently connected
#[derive(Component, Debug, Clone, Copy)]
pub struct Connected;

/// Component: display geometry used to derive a world-space view rectangle
#[derive(Component, Debug, Clone, Copy)]
pub struct Display {
    pub width: u32,
    pub height: u32,
    /// UI scale; higher scale shows fewer world tiles
    pub scale: f32,
}

impl Display {
    pub fn new(width: u32, height: u32, scale: f32) -> Self {
        Self { width, height, scale }
    }

    /// World-space rectangle visible on this display when centered at `center`
    pub fn view_rect(&self, center: Position, tiles_per_pixel: f32) -> ViewRect {
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        let half_w = self.width as f32 * tiles_per_pixel / scale / 2.0;
        let half_h = self.height as f32 * tiles_per_pixel / scale / 2.0;
        ViewRect {
            min_x: center.x - half_w,
            min_y: center.y - half_h,
            max_x: center.x + half_w,
            max_y: center.y + half_h,
        }
    }
}

/// Axis-aligned world-space rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl ViewRect {
    pub fn contains(&self, p: Position) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }
}

/// Component: a mobile carrier that may bear a sensor attachment.
/// Only carriers with a sensor extend the equipment trigger.
#[derive(Component, Debug, Clone, Copy)]
pub struct Carrier {
    pub has_sensor: bool,
}
