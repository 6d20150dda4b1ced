//! Spatial Grid
//!
//! Uniform-cell index over machine and carrier positions, rebuilt once per
//! cycle so that every radius query walks only nearby cells. This is what
//! keeps trigger evaluation O(observers + machines) instead of
//! O(machines x search).

use bevy_ecs::prelude::*;
use std::collections::HashMap;

use crate::components::machine::{Position, Trackable, UnitNumber};
use crate::components::observer::Carrier;

/// Default edge length of one grid cell, in tiles
pub const DEFAULT_CELL_SIZE: f32 = 32.0;

/// Cell coordinates for a position at the given cell size
pub(crate) fn grid_cell(p: Position, cell_size: f32) -> (i32, i32) {
    let size = if cell_size > 0.0 { cell_size } else { 1.0 };
    ((p.x / size).floor() as i32, (p.y / size).floor() as i32)
}

/// Resource: per-cycle spatial index of machines and sensor carriers
#[derive(Resource, Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    machines: HashMap<(i32, i32), Vec<(u64, Position)>>,
    carriers: HashMap<(i32, i32), Vec<(Entity, Position)>>,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
            machines: HashMap::new(),
            carriers: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Clear all indexed entries (called before rebuilding)
    pub fn clear(&mut self) {
        self.machines.clear();
        self.carriers.clear();
    }

    pub fn insert_machine(&mut self, unit: u64, position: Position) {
        self.machines
            .entry(grid_cell(position, self.cell_size))
            .or_default()
            .push((unit, position));
    }

    pub fn insert_carrier(&mut self, entity: Entity, position: Position) {
        self.carriers
            .entry(grid_cell(position, self.cell_size))
            .or_default()
            .push((entity, position));
    }

    /// All indexed machines, in arbitrary order
    pub fn iter_machines(&self) -> impl Iterator<Item = (u64, Position)> + '_ {
        self.machines.values().flatten().copied()
    }

    pub fn machine_count(&self) -> usize {
        self.machines.values().map(|v| v.len()).sum()
    }

    /// Machines within `radius` of `center`
    pub fn machines_within(&self, center: Position, radius: f32) -> Vec<(u64, Position)> {
        self.collect_within(&self.machines, center, radius)
    }

    /// Sensor carriers within `radius` of `center`
    pub fn carriers_within(&self, center: Position, radius: f32) -> Vec<(Entity, Position)> {
        self.collect_within(&self.carriers, center, radius)
    }

    fn collect_within<T: Copy>(
        &self,
        index: &HashMap<(i32, i32), Vec<(T, Position)>>,
        center: Position,
        radius: f32,
    ) -> Vec<(T, Position)> {
        if radius <= 0.0 {
            return Vec::new();
        }
        let (min_cx, min_cy) = grid_cell(
            Position::new(center.x - radius, center.y - radius),
            self.cell_size,
        );
        let (max_cx, max_cy) = grid_cell(
            Position::new(center.x + radius, center.y + radius),
            self.cell_size,
        );

        let mut found = Vec::new();
        for cx in min_cx..=max_cx {
            for cy in min_cy..=max_cy {
                if let Some(entries) = index.get(&(cx, cy)) {
                    for &(item, position) in entries {
                        if center.distance_to(&position) <= radius {
                            found.push((item, position));
                        }
                    }
                }
            }
        }
        found
    }
}

/// System: rebuild the spatial grid from live machines and sensor carriers
pub fn rebuild_spatial_grid(
    mut grid: ResMut<SpatialGrid>,
    machines: Query<(&UnitNumber, &Position), With<Trackable>>,
    carriers: Query<(Entity, &Position, &Carrier)>,
) {
    grid.clear();

    for (unit, position) in machines.iter() {
        grid.insert_machine(unit.0, *position);
    }
    for (entity, position, carrier) in carriers.iter() {
        if carrier.has_sensor {
            grid.insert_carrier(entity, *position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_query_filters_by_distance() {
        let mut grid = SpatialGrid::new(8.0);
        grid.insert_machine(1, Position::new(0.0, 0.0));
        grid.insert_machine(2, Position::new(5.0, 0.0));
        grid.insert_machine(3, Position::new(20.0, 0.0));

        let hits = grid.machines_within(Position::new(0.0, 0.0), 10.0);
        let units: Vec<u64> = hits.iter().map(|(u, _)| *u).collect();
        assert!(units.contains(&1));
        assert!(units.contains(&2));
        assert!(!units.contains(&3));
    }

    #[test]
    fn test_radius_query_crosses_cell_boundaries() {
        let mut grid = SpatialGrid::new(4.0);
        // Neighbouring cells around the query center
        grid.insert_machine(1, Position::new(-3.5, -3.5));
        grid.insert_machine(2, Position::new(3.5, 3.5));

        let hits = grid.machines_within(Position::new(0.0, 0.0), 6.0);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_boundary_distance_is_inclusive() {
        let mut grid = SpatialGrid::new(8.0);
        grid.insert_machine(1, Position::new(10.0, 0.0));

        assert_eq!(grid.machines_within(Position::new(0.0, 0.0), 10.0).len(), 1);
        assert!(grid.machines_within(Position::new(0.0, 0.0), 9.99).is_empty());
    }

    #[test]
    fn test_zero_radius_finds_nothing() {
        let mut grid = SpatialGrid::new(8.0);
        grid.insert_machine(1, Position::new(0.0, 0.0));
        assert!(grid.machines_within(Position::new(0.0, 0.0), 0.0).is_empty());
    }

    #[test]
    fn test_rebuild_system_skips_sensorless_carriers() {
        let mut world = World::new();
        world.insert_resource(SpatialGrid::new(8.0));

        world.spawn((UnitNumber(1), Position::new(1.0, 1.0), Trackable));
        world.spawn((Position::new(2.0, 2.0), Carrier { has_sensor: true }));
        world.spawn((Position::new(3.0, 3.0), Carrier { has_sensor: false }));

        let mut schedule = Schedule::default();
        schedule.add_systems(rebuild_spatial_grid);
        schedule.run(&mut world);

        let grid = world.resource::<SpatialGrid>();
        assert_eq!(grid.machine_count(), 1);
        assert_eq!(grid.carriers_within(Position::new(0.0, 0.0), 10.0).len(), 1);
    }
}
