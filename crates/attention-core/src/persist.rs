//! State Persistence
//!
//! Captures registry state into snapshots and restores it against the
//! live world. Restore matches records to live machines by unit number,
//! never by entity handle; orphaned records are dropped rather than
//! resurrected.

use bevy_ecs::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

use attention_events::{AttentionSnapshot, MachineStateRecord};

use crate::collaborators::{ActuatorHandle, DecorationHandle};
use crate::components::machine::{GroupId, Trackable, UnitNumber};
use crate::components::registry::{MachineRecord, MachineRegistry};

/// Persistence error type
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Capture the registry into a snapshot. Records are sorted by unit
/// number so identical states serialize identically.
pub fn capture_snapshot(registry: &MachineRegistry, sequence: u64, tick: u64) -> AttentionSnapshot {
    let mut snapshot = AttentionSnapshot::new(sequence, tick);
    for (&unit, record) in registry.iter() {
        snapshot.machines.push(MachineStateRecord {
            unit,
            attention: record.attention,
            target_attention: record.target_attention,
            has_attention: record.has_attention,
            gui_open: record.gui_open,
            actuator: record.actuator.map(|h| h.0),
            decoration: record.decoration.map(|h| h.0),
            last_tier: record.last_tier,
        });
    }
    snapshot.machines.sort_by_key(|m| m.unit);
    snapshot
}

/// Write a snapshot as pretty-printed JSON
pub fn write_snapshot(snapshot: &AttentionSnapshot, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), snapshot)?;
    Ok(())
}

/// Read a snapshot back from JSON
pub fn read_snapshot(path: impl AsRef<Path>) -> Result<AttentionSnapshot, SnapshotError> {
    let file = File::open(path)?;
    let snapshot = serde_json::from_reader(BufReader::new(file))?;
    Ok(snapshot)
}

/// Restore a snapshot against the live world. Each persisted record is
/// matched to a live trackable machine by unit number; records with no
/// live counterpart are skipped. Persisted handles are carried over but
/// the applied tier is cleared, so the first reconcile after load always
/// touches the external object: a handle that no longer resolves fails
/// that reconfigure and gets recreated. Returns the number of records
/// restored.
pub fn restore_snapshot(world: &mut World, snapshot: &AttentionSnapshot) -> usize {
    let mut live_units = std::collections::HashMap::new();
    let mut query = world.query_filtered::<(Entity, &UnitNumber, &GroupId), With<Trackable>>();
    for (entity, unit, group) in query.iter(world) {
        live_units.insert(unit.0, (entity, group.clone()));
    }

    let mut registry = world.resource_mut::<MachineRegistry>();
    let mut restored = 0;
    for persisted in &snapshot.machines {
        let Some((entity, group)) = live_units.get(&persisted.unit) else {
            tracing::debug!("snapshot record {} has no live machine, dropped", persisted.unit);
            continue;
        };
        let mut record = MachineRecord::new(*entity, group.clone());
        record.attention = persisted.attention;
        record.target_attention = persisted.target_attention;
        record.has_attention = persisted.has_attention;
        record.gui_open = persisted.gui_open;
        record.actuator = persisted.actuator.map(ActuatorHandle);
        record.decoration = persisted.decoration.map(DecorationHandle);
        // Not the persisted tier: a stable tier would otherwise skip the
        // external call forever, leaving a dead handle trusted
        record.last_tier = None;
        registry.insert_record(persisted.unit, record);
        restored += 1;
    }
    restored
}
