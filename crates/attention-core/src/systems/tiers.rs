//! Tier Table and Actuator Reconciliation
//!
//! Discretizes the continuous multiplier into integer percentage tiers and
//! decides whether the external actuator needs to be created, swapped in
//! place, or left alone. The engine stores the last-applied tier itself;
//! it never reads tier state back out of the actuator.

use bevy_ecs::prelude::*;

use crate::collaborators::ActuatorFactory;
use crate::components::registry::MachineRecord;

/// Resource: ordered tier boundaries in integer percent
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    values: Vec<u32>,
    interval_pct: u32,
}

impl TierTable {
    /// Build the full table spanning `[min*100, max*100]` at the given
    /// percentage interval. Always rebuilt whole, never patched.
    pub fn build(min_multiplier: f32, max_multiplier: f32, interval_pct: u32) -> Self {
        let interval = interval_pct.max(1);
        let first = (min_multiplier * 100.0).round().max(0.0) as u32;
        let last = (max_multiplier * 100.0).round().max(first as f32) as u32;

        let mut values = Vec::new();
        let mut value = first;
        while value <= last {
            values.push(value);
            value += interval;
        }

        Self {
            values,
            interval_pct: interval,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> u32 {
        self.values.first().copied().unwrap_or(0)
    }

    pub fn last(&self) -> u32 {
        self.values.last().copied().unwrap_or(0)
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Round a multiplier (as a fraction) to the nearest tier value.
    /// Exactly-halfway values round to the higher tier; results clamp to
    /// the table's `[first, last]` range.
    pub fn nearest_tier(&self, multiplier: f32) -> u32 {
        let pct = multiplier * 100.0;
        let first = self.first() as f32;
        let interval = self.interval_pct as f32;

        let steps = ((pct - first) / interval + 0.5).floor();
        let index = if steps < 0.0 {
            0
        } else {
            (steps as usize).min(self.values.len().saturating_sub(1))
        };
        self.values.get(index).copied().unwrap_or(0)
    }
}

/// What reconciliation did to the actuator this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Tier unchanged; no external call issued
    Unchanged,
    /// A new actuator was created at this tier
    Created(u32),
    /// The existing actuator was reconfigured in place to this tier
    Reconfigured(u32),
    /// The factory produced nothing; retried next cycle
    CreationFailed,
    /// The stored handle no longer resolves; dropped, recreated next cycle
    Lost,
}

/// Reconcile one machine's actuator against its freshly computed
/// multiplier. Comparison runs against the record's stored tier, so a
/// repeated multiplier issues no external call at all.
pub fn reconcile_actuator(
    record: &mut MachineRecord,
    multiplier: f32,
    table: &TierTable,
    factory: &mut dyn ActuatorFactory,
) -> ReconcileOutcome {
    let tier = table.nearest_tier(multiplier);

    match record.actuator {
        None => match factory.create(tier) {
            Some(handle) => {
                record.actuator = Some(handle);
                record.last_tier = Some(tier);
                ReconcileOutcome::Created(tier)
            }
            None => {
                record.last_tier = None;
                ReconcileOutcome::CreationFailed
            }
        },
        Some(handle) => {
            if record.last_tier == Some(tier) {
                return ReconcileOutcome::Unchanged;
            }
            if factory.reconfigure(handle, tier) {
                record.last_tier = Some(tier);
                ReconcileOutcome::Reconfigured(tier)
            } else {
                record.actuator = None;
                record.last_tier = None;
                ReconcileOutcome::Lost
            }
        }
    }
}
