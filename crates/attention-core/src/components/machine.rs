//! Machine Components
//!
//! Identity, position, and group membership for tracked machines.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Component: stable integer identity of a machine, unique while it exists
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitNumber(pub u64);

/// Marker component: the attention engine may track this entity
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Trackable;

/// Component: world-space position in tiles
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Component: the group (team) whose upgrades govern this entity
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}
