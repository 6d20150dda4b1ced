//! External Collaborator Contracts
//!
//! The engine drives two opaque external systems: an actuator factory
//! whose objects encode the current tier, and a decoration renderer for
//! cosmetic indicators. The engine never inspects either beyond the
//! handles it stores; decoration failures are ignored.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque handle to an external actuator object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActuatorHandle(pub u64);

/// Opaque handle to an external visual indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecorationHandle(pub u64);

/// Instantiates, reconfigures, and destroys actuator objects for a tier.
pub trait ActuatorFactory {
    /// Create an actuator configured for the given tier; None on failure
    /// (the engine retries next cycle).
    fn create(&mut self, tier: u32) -> Option<ActuatorHandle>;

    /// Reconfigure an existing actuator in place, preserving its identity.
    /// Returns false if the handle no longer resolves.
    fn reconfigure(&mut self, handle: ActuatorHandle, tier: u32) -> bool;

    fn destroy(&mut self, handle: ActuatorHandle);
}

/// Creates, updates, and removes cosmetic indicators.
pub trait DecorationRenderer {
    /// Show (or refresh) the indicator for a unit; None on failure.
    fn show(&mut self, unit: u64, value: f32, active: bool) -> Option<DecorationHandle>;

    fn remove(&mut self, handle: DecorationHandle);
}

/// Resource wrapper for the host-provided actuator factory
#[derive(Resource)]
pub struct ActuatorService(pub Box<dyn ActuatorFactory + Send + Sync>);

/// Resource wrapper for the host-provided decoration renderer
#[derive(Resource)]
pub struct DecorationService(pub Box<dyn DecorationRenderer + Send + Sync>);

/// Destroy a removed machine's external effects. Handles that were never
/// created are skipped.
pub fn destroy_effects(
    record: &crate::components::registry::MachineRecord,
    factory: &mut dyn ActuatorFactory,
    renderer: &mut dyn DecorationRenderer,
) {
    if let Some(handle) = record.actuator {
        factory.destroy(handle);
    }
    if let Some(handle) = record.decoration {
        renderer.remove(handle);
    }
}

/// In-memory factory that records every operation.
/// Used by tests and the standalone driver.
#[derive(Debug, Default)]
pub struct RecordingFactory {
    next_handle: u64,
    /// Live actuators and their configured tier
    pub tiers: HashMap<u64, u32>,
    pub created: u64,
    pub reconfigured: u64,
    pub destroyed: u64,
    /// When set, create() fails; models ActuatorCreationFailure
    pub fail_creation: bool,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total mutating operations issued against the external system
    pub fn mutation_count(&self) -> u64 {
        self.created + self.reconfigured + self.destroyed
    }
}

impl ActuatorFactory for RecordingFactory {
    fn create(&mut self, tier: u32) -> Option<ActuatorHandle> {
        if self.fail_creation {
            return None;
        }
        self.next_handle += 1;
        self.tiers.insert(self.next_handle, tier);
        self.created += 1;
        Some(ActuatorHandle(self.next_handle))
    }

    fn reconfigure(&mut self, handle: ActuatorHandle, tier: u32) -> bool {
        match self.tiers.get_mut(&handle.0) {
            Some(current) => {
                *current = tier;
                self.reconfigured += 1;
                true
            }
            None => false,
        }
    }

    fn destroy(&mut self, handle: ActuatorHandle) {
        if self.tiers.remove(&handle.0).is_some() {
            self.destroyed += 1;
        }
    }
}

/// In-memory renderer that tracks live indicators per unit.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    next_handle: u64,
    handles_by_unit: HashMap<u64, u64>,
    /// Live indicators: handle -> (value, active)
    pub live: HashMap<u64, (f32, bool)>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecorationRenderer for RecordingRenderer {
    fn show(&mut self, unit: u64, value: f32, active: bool) -> Option<DecorationHandle> {
        let handle = *self.handles_by_unit.entry(unit).or_insert_with(|| {
            self.next_handle += 1;
            self.next_handle
        });
        self.live.insert(handle, (value, active));
        Some(DecorationHandle(handle))
    }

    fn remove(&mut self, handle: DecorationHandle) {
        self.live.remove(&handle.0);
        self.handles_by_unit.retain(|_, h| *h != handle.0);
    }
}
