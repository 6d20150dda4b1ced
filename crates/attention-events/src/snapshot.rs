//! Snapshot Types
//!
//! Serialization structs for persisted attention state.
//!
//! A snapshot holds one record per tracked machine identity. Handles to
//! external actuator/decoration objects are persisted as raw values and
//! revalidated (never reconstructed) when the snapshot is restored.

use serde::{Deserialize, Serialize};

/// Generates a snapshot ID with the given sequence number.
pub fn generate_snapshot_id(sequence: u64) -> String {
    format!("snap_{:06}", sequence)
}

/// Persisted state of a single tracked machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineStateRecord {
    pub unit: u64,
    pub attention: f32,
    pub target_attention: f32,
    pub has_attention: bool,
    pub gui_open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actuator: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tier: Option<u32>,
}

/// Complete attention engine state at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionSnapshot {
    pub snapshot_id: String,
    pub tick: u64,
    pub machines: Vec<MachineStateRecord>,
}

impl AttentionSnapshot {
    pub fn new(sequence: u64, tick: u64) -> Self {
        Self {
            snapshot_id: generate_snapshot_id(sequence),
            tick,
            machines: Vec::new(),
        }
    }

    /// Look up the record for a unit number
    pub fn record_for(&self, unit: u64) -> Option<&MachineStateRecord> {
        self.machines.iter().find(|m| m.unit == unit)
    }
}
