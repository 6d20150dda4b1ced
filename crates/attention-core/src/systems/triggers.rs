//! Trigger Evaluator
//!
//! Builds the three per-cycle membership sets: proximity, viewport, and
//! equipment. Every query iterates the scarce side (observers, carriers)
//! against the spatial grid, or walks all machines exactly once; looping
//! machines first and searching per machine is the shape this module
//! exists to avoid.

use bevy_ecs::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::components::machine::{GroupId, Position};
use crate::components::observer::{Connected, Display, Observer, ViewRect};

use super::spatial::{grid_cell, SpatialGrid};

/// Resource: membership sets computed in phase one of each cycle
#[derive(Resource, Debug, Clone, Default)]
pub struct TriggerSets {
    pub proximity: HashSet<u64>,
    pub viewport: HashSet<u64>,
    pub equipment: HashSet<u64>,
}

impl TriggerSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.proximity.clear();
        self.viewport.clear();
        self.equipment.clear();
    }

    /// Membership flags for one unit: (proximity, viewport, equipment)
    pub fn flags(&self, unit: u64) -> (bool, bool, bool) {
        (
            self.proximity.contains(&unit),
            self.viewport.contains(&unit),
            self.equipment.contains(&unit),
        )
    }
}

/// Resource: fog-of-war chart per group, tracked in grid cells.
/// A machine is viewport-visible to a group only where that group has
/// charted the surrounding cell.
#[derive(Resource, Debug)]
pub struct FogMap {
    /// Charted cells per group. Keyed by group so the per-machine lookup
    /// in the viewport pass borrows the name instead of cloning it.
    charted: HashMap<String, HashSet<(i32, i32)>>,
    cell_size: f32,
}

impl Default for FogMap {
    fn default() -> Self {
        Self::new(super::spatial::DEFAULT_CELL_SIZE)
    }
}

impl FogMap {
    pub fn new(cell_size: f32) -> Self {
        Self {
            charted: HashMap::new(),
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
        }
    }

    /// Mark the cell containing `position` as charted for a group
    pub fn chart(&mut self, group: &str, position: Position) {
        let cell = grid_cell(position, self.cell_size);
        self.charted.entry(group.to_string()).or_default().insert(cell);
    }

    /// Chart every cell overlapping the rectangle `[min, max]`
    pub fn chart_area(&mut self, group: &str, min: Position, max: Position) {
        let (min_cx, min_cy) = grid_cell(min, self.cell_size);
        let (max_cx, max_cy) = grid_cell(max, self.cell_size);
        let cells = self.charted.entry(group.to_string()).or_default();
        for cx in min_cx..=max_cx {
            for cy in min_cy..=max_cy {
                cells.insert((cx, cy));
            }
        }
    }

    pub fn is_charted(&self, group: &str, position: Position) -> bool {
        self.charted
            .get(group)
            .map_or(false, |cells| cells.contains(&grid_cell(position, self.cell_size)))
    }
}

/// Per-cycle view of one connected observer
#[derive(Debug, Clone)]
pub struct ObserverView {
    pub position: Position,
    pub group: String,
    pub rect: ViewRect,
}

/// Gather views for every connected observer with a live avatar
pub fn collect_observer_views(world: &mut World, tiles_per_pixel: f32) -> Vec<ObserverView> {
    let mut query = world.query_filtered::<(&Position, &GroupId, &Display), (
        With<Observer>,
        With<Connected>,
    )>();

    query
        .iter(world)
        .map(|(position, group, display)| ObserverView {
            position: *position,
            group: group.0.clone(),
            rect: display.view_rect(*position, tiles_per_pixel),
        })
        .collect()
}

/// Build all three membership sets for this cycle.
///
/// Proximity and equipment iterate observers (and the carriers near
/// them); viewport precomputes observer rectangles and then walks all
/// machines once, short-circuiting per machine on the first hit.
pub fn build_trigger_sets(
    sets: &mut TriggerSets,
    grid: &SpatialGrid,
    fog: &FogMap,
    observers: &[ObserverView],
    radius: f32,
    carrier_radius_factor: f32,
) {
    sets.clear();

    for observer in observers {
        // Proximity: machines around the avatar
        for (unit, _) in grid.machines_within(observer.position, radius) {
            sets.proximity.insert(unit);
        }

        // Equipment: sensor carriers around the avatar, machines around
        // each carrier
        let carrier_radius = radius * carrier_radius_factor;
        for (_, carrier_pos) in grid.carriers_within(observer.position, carrier_radius) {
            for (unit, _) in grid.machines_within(carrier_pos, radius) {
                sets.equipment.insert(unit);
            }
        }
    }

    // Viewport: one pass over all machines against precomputed rects
    for (unit, position) in grid.iter_machines() {
        for observer in observers {
            if observer.rect.contains(position) && fog.is_charted(&observer.group, position) {
                sets.viewport.insert(unit);
                break;
            }
        }
    }
}

/// Recompute trigger membership for a single machine directly, without
/// consulting phase-one sets. Used by the immediate interaction path,
/// which cannot assume the batch sets are fresh.
pub fn machine_triggers(
    position: Position,
    grid: &SpatialGrid,
    fog: &FogMap,
    observers: &[ObserverView],
    radius: f32,
    carrier_radius_factor: f32,
) -> (bool, bool, bool) {
    let proximity = observers
        .iter()
        .any(|o| o.position.distance_to(&position) <= radius);

    let viewport = observers
        .iter()
        .any(|o| o.rect.contains(position) && fog.is_charted(&o.group, position));

    let carrier_radius = radius * carrier_radius_factor;
    let equipment = grid
        .carriers_within(position, radius)
        .iter()
        .any(|(_, carrier_pos)| {
            observers
                .iter()
                .any(|o| o.position.distance_to(carrier_pos) <= carrier_radius)
        });

    (proximity, viewport, equipment)
}
