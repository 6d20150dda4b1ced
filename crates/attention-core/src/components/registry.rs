//! Machine Registry
//!
//! Owns the mapping from machine identity to its mutable attention state.
//! Backing entity handles may be invalidated by external code at any time,
//! so every access revalidates before use.

use bevy_ecs::prelude::*;
use std::collections::HashMap;

use crate::collaborators::{ActuatorHandle, DecorationHandle};

use super::machine::GroupId;

/// Mutable per-machine attention state
#[derive(Debug, Clone)]
pub struct MachineRecord {
    /// Backing ECS entity; validity is re-checked every access
    pub entity: Entity,
    pub group: GroupId,
    /// Current attention in [0, 1]; out-of-range legacy values are
    /// clamped on first touch rather than rejected
    pub attention: f32,
    /// Last computed composite target in [0, 1]
    pub target_attention: f32,
    pub has_attention: bool,
    /// Set externally on interaction open/close
    pub gui_open: bool,
    pub actuator: Option<ActuatorHandle>,
    pub decoration: Option<DecorationHandle>,
    /// Authoritative last tier applied to the actuator; the external
    /// object is never inspected for comparison
    pub last_tier: Option<u32>,
}

impl MachineRecord {
    pub fn new(entity: Entity, group: GroupId) -> Self {
        Self {
            entity,
            group,
            attention: 0.0,
            target_attention: 0.0,
            has_attention: false,
            gui_open: false,
            actuator: None,
            decoration: None,
            last_tier: None,
        }
    }
}

/// Resource: registry of all tracked machines
#[derive(Resource, Debug, Default)]
pub struct MachineRegistry {
    records: HashMap<u64, MachineRecord>,
}

impl MachineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a machine for tracking. Returns false if the unit is
    /// already tracked (registration is idempotent).
    pub fn register(&mut self, unit: u64, entity: Entity, group: GroupId) -> bool {
        if self.records.contains_key(&unit) {
            return false;
        }
        self.records.insert(unit, MachineRecord::new(entity, group));
        true
    }

    /// Insert a pre-built record, replacing any existing entry.
    /// Used when restoring persisted state.
    pub fn insert_record(&mut self, unit: u64, record: MachineRecord) {
        self.records.insert(unit, record);
    }

    pub fn get(&self, unit: u64) -> Option<&MachineRecord> {
        self.records.get(&unit)
    }

    pub fn get_mut(&mut self, unit: u64) -> Option<&mut MachineRecord> {
        self.records.get_mut(&unit)
    }

    /// Remove a record, returning it so the caller can destroy its
    /// actuator and decoration.
    pub fn remove(&mut self, unit: u64) -> Option<MachineRecord> {
        self.records.remove(&unit)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u64, &MachineRecord)> {
        self.records.iter()
    }

    /// Snapshot of tracked unit numbers, for iteration while mutating
    pub fn unit_numbers(&self) -> Vec<u64> {
        self.records.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sweep all records, removing any whose backing entity fails the
    /// validity predicate. The cleanup callback runs once per removed
    /// record, before removal. Returns the number removed.
    pub fn validate_all<V, F>(&mut self, is_valid: V, mut cleanup: F) -> usize
    where
        V: Fn(Entity) -> bool,
        F: FnMut(u64, &MachineRecord),
    {
        let dead: Vec<u64> = self
            .records
            .iter()
            .filter(|(_, record)| !is_valid(record.entity))
            .map(|(unit, _)| *unit)
            .collect();

        for unit in &dead {
            if let Some(record) = self.records.remove(unit) {
                cleanup(*unit, &record);
            }
        }
        dead.len()
    }
}
