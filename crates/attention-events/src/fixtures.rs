//! Canned test data for downstream crates.
//!
//! Enabled with the `test-fixtures` feature.

use crate::snapshot::{AttentionSnapshot, MachineStateRecord};

/// A machine record at rest (no attention, no effects)
pub fn idle_record(unit: u64) -> MachineStateRecord {
    MachineStateRecord {
        unit,
        attention: 0.0,
        target_attention: 0.0,
        has_attention: false,
        gui_open: false,
        actuator: None,
        decoration: None,
        last_tier: None,
    }
}

/// A machine record mid-ramp with a live actuator
pub fn active_record(unit: u64, attention: f32, tier: u32) -> MachineStateRecord {
    MachineStateRecord {
        unit,
        attention,
        target_attention: 1.0,
        has_attention: true,
        gui_open: false,
        actuator: Some(unit * 10),
        decoration: Some(unit * 10 + 1),
        last_tier: Some(tier),
    }
}

/// A snapshot holding `count` idle machines numbered from 1
pub fn snapshot_with_idle_machines(count: u64, tick: u64) -> AttentionSnapshot {
    let mut snapshot = AttentionSnapshot::new(1, tick);
    for unit in 1..=count {
        snapshot.machines.push(idle_record(unit));
    }
    snapshot
}
