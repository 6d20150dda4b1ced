//! Host Adapter
//!
//! The narrow surface the host simulation calls into. Entry points take
//! the whole `World` so engine state never leaks out as globals, and each
//! does exactly one thing: register, remove, refresh, invalidate, or
//! reload. Everything here funnels into the same advance/reconcile path
//! the batch cycle uses.

use bevy_ecs::prelude::*;
use bevy_ecs::system::RunSystemOnce;
use std::path::Path;

use attention_events::{AttentionEventKind, RemovalReason};

use crate::collaborators::{destroy_effects, DecorationService};
use crate::components::machine::{GroupId, Position, Trackable, UnitNumber};
use crate::components::registry::MachineRegistry;
use crate::config::AttentionConfig;
use crate::events::EventLog;
use crate::persist::{capture_snapshot, read_snapshot, restore_snapshot, write_snapshot};
use crate::AttentionError;
use crate::systems::attention::{advance_record, composite_target, RateCurve};
use crate::systems::orchestrator::{AttentionClock, TakenServices, DEFAULT_GROUP};
use crate::systems::params::{ParameterCache, UpgradeLevels};
use crate::systems::spatial::{rebuild_spatial_grid, SpatialGrid};
use crate::systems::tiers::{reconcile_actuator, ReconcileOutcome, TierTable};
use crate::systems::triggers::{collect_observer_views, machine_triggers, FogMap};

/// Start tracking a freshly built machine. The entity must carry
/// [`UnitNumber`] and [`Trackable`]; a missing [`GroupId`] falls back to
/// the default group. Returns false when the entity does not qualify or
/// the unit is already tracked.
pub fn machine_built(world: &mut World, entity: Entity) -> bool {
    let tick = world.resource::<AttentionClock>().current_tick;

    let Some(entity_ref) = world.get_entity(entity) else {
        return false;
    };
    if !entity_ref.contains::<Trackable>() {
        return false;
    }
    let Some(unit) = entity_ref.get::<UnitNumber>().map(|u| u.0) else {
        return false;
    };
    let group = entity_ref
        .get::<GroupId>()
        .cloned()
        .unwrap_or_else(|| GroupId::new(DEFAULT_GROUP));

    let registered = world
        .resource_mut::<MachineRegistry>()
        .register(unit, entity, group.clone());
    if !registered {
        return false;
    }

    // Indicator starts at rest; the first cycle will refresh it
    world.resource_scope(|world, mut decorations: Mut<DecorationService>| {
        if let Some(handle) = decorations.0.show(unit, 0.0, false) {
            if let Some(record) = world.resource_mut::<MachineRegistry>().get_mut(unit) {
                record.decoration = Some(handle);
            }
        }
    });

    world.resource_mut::<EventLog>().record(
        tick,
        AttentionEventKind::MachineRegistered {
            unit,
            group: group.0,
        },
    );
    true
}

/// Stop tracking a destroyed machine, tearing down its actuator and
/// decoration. Returns false when the unit was not tracked.
pub fn machine_removed(world: &mut World, unit: u64) -> bool {
    let tick = world.resource::<AttentionClock>().current_tick;

    let Some(mut services) = TakenServices::take(world) else {
        return false;
    };
    let removed = services.registry.remove(unit);
    if let Some(ref dead) = removed {
        destroy_effects(
            dead,
            services.actuators.0.as_mut(),
            services.decorations.0.as_mut(),
        );
        services.log.record(
            tick,
            AttentionEventKind::MachineRemoved {
                unit,
                reason: RemovalReason::Destroyed,
            },
        );
    }
    services.restore(world);
    removed.is_some()
}

/// A player opened this machine's interaction window
pub fn gui_opened(world: &mut World, unit: u64) -> bool {
    set_gui_state(world, unit, true)
}

/// A player closed this machine's interaction window
pub fn gui_closed(world: &mut World, unit: u64) -> bool {
    set_gui_state(world, unit, false)
}

fn set_gui_state(world: &mut World, unit: u64, open: bool) -> bool {
    let found = match world.resource_mut::<MachineRegistry>().get_mut(unit) {
        Some(record) => {
            record.gui_open = open;
            true
        }
        None => false,
    };
    if !found {
        return false;
    }
    // Interaction must not wait for the next batch cycle
    refresh_machine(world, unit)
}

/// Re-evaluate one machine immediately, outside the batch cycle. Triggers
/// are recomputed directly for this machine rather than read from the
/// possibly stale phase-one sets. Returns false when the unit is unknown
/// or its entity has gone stale (in which case the record is removed).
pub fn refresh_machine(world: &mut World, unit: u64) -> bool {
    let tick = world.resource::<AttentionClock>().current_tick;
    let config = world.resource::<AttentionConfig>().clone();

    world.run_system_once(rebuild_spatial_grid);
    let observers = collect_observer_views(world, config.search.tiles_per_pixel);
    let table = world.resource::<TierTable>().clone();

    let Some(mut services) = TakenServices::take(world) else {
        return false;
    };

    let mut refreshed = false;
    if let Some((entity, group, gui_open)) = services
        .registry
        .get(unit)
        .map(|r| (r.entity, r.group.0.clone(), r.gui_open))
    {
        let position = world
            .get_entity(entity)
            .filter(|e| e.contains::<Trackable>())
            .and_then(|e| e.get::<Position>().copied());

        match position {
            None => {
                if let Some(dead) = services.registry.remove(unit) {
                    destroy_effects(
                        &dead,
                        services.actuators.0.as_mut(),
                        services.decorations.0.as_mut(),
                    );
                    services.log.record(
                        tick,
                        AttentionEventKind::MachineRemoved {
                            unit,
                            reason: RemovalReason::StaleHandle,
                        },
                    );
                }
            }
            Some(position) => {
                let params =
                    services
                        .cache
                        .resolve(&group, world.resource::<UpgradeLevels>(), &config, tick);
                let (proximity, viewport, equipment) = machine_triggers(
                    position,
                    world.resource::<SpatialGrid>(),
                    world.resource::<FogMap>(),
                    &observers,
                    params.radius,
                    config.search.carrier_radius_factor,
                );
                let target =
                    composite_target(proximity, viewport, equipment, gui_open, &config.targets);

                if let Some(record) = services.registry.get_mut(unit) {
                    let previous = record.last_tier;
                    let multiplier = advance_record(
                        record,
                        target,
                        &params,
                        config.bounds.inverted,
                        RateCurve::default(),
                    );
                    match reconcile_actuator(
                        record,
                        multiplier,
                        &table,
                        services.actuators.0.as_mut(),
                    ) {
                        ReconcileOutcome::Created(tier) | ReconcileOutcome::Reconfigured(tier) => {
                            services.log.record(
                                tick,
                                AttentionEventKind::TierChanged {
                                    unit,
                                    previous,
                                    current: tier,
                                },
                            );
                        }
                        ReconcileOutcome::CreationFailed => {
                            tracing::warn!(
                                "actuator creation failed for machine {}, will retry",
                                unit
                            );
                        }
                        ReconcileOutcome::Lost => {
                            tracing::warn!("actuator handle lost for machine {}, will recreate", unit);
                        }
                        ReconcileOutcome::Unchanged => {}
                    }
                    if let Some(handle) =
                        services
                            .decorations
                            .0
                            .show(unit, record.attention, record.has_attention)
                    {
                        record.decoration = Some(handle);
                    }
                    refreshed = true;
                }
            }
        }
    }

    services.restore(world);
    refreshed
}

/// An upgrade landed for this group; its cached parameters are stale
pub fn upgrade_completed(world: &mut World, group: &str) {
    let tick = world.resource::<AttentionClock>().current_tick;
    world.resource_mut::<ParameterCache>().invalidate(group);
    world.resource_mut::<EventLog>().record(
        tick,
        AttentionEventKind::CacheInvalidated {
            group: Some(group.to_string()),
        },
    );
}

/// Swap in a new configuration: rebuild the tier table whole, drop every
/// cached parameter set, and sweep out records whose entities have gone
/// stale. Rejects configurations that fail validation, leaving the old
/// one in place.
pub fn configuration_changed(
    world: &mut World,
    config: AttentionConfig,
) -> Result<(), AttentionError> {
    config.validate().map_err(AttentionError::Config)?;
    let tick = world.resource::<AttentionClock>().current_tick;

    let table = TierTable::build(
        config.bounds.min_multiplier,
        config.bounds.max_multiplier,
        config.tiers.interval_pct,
    );
    world.insert_resource(table);
    world.insert_resource(config);

    let Some(mut services) = TakenServices::take(world) else {
        return Ok(());
    };
    services.cache.invalidate_all();

    let swept = {
        let TakenServices {
            registry,
            actuators,
            decorations,
            log,
            ..
        } = &mut services;
        registry.validate_all(
            |entity| {
                world
                    .get_entity(entity)
                    .map_or(false, |e| e.contains::<Trackable>())
            },
            |unit, record| {
                destroy_effects(record, actuators.0.as_mut(), decorations.0.as_mut());
                log.record(
                    tick,
                    AttentionEventKind::MachineRemoved {
                        unit,
                        reason: RemovalReason::Sweep,
                    },
                );
            },
        )
    };

    services
        .log
        .record(tick, AttentionEventKind::CacheInvalidated { group: None });
    services.log.record(tick, AttentionEventKind::ConfigReloaded);
    services.restore(world);

    if swept > 0 {
        tracing::info!(swept, "dropped stale machine records during config reload");
    }
    Ok(())
}

/// Capture engine state and write it to a JSON snapshot file
pub fn save_state(
    world: &World,
    sequence: u64,
    path: impl AsRef<Path>,
) -> Result<(), AttentionError> {
    let tick = world.resource::<AttentionClock>().current_tick;
    let snapshot = capture_snapshot(world.resource::<MachineRegistry>(), sequence, tick);
    write_snapshot(&snapshot, path).map_err(AttentionError::Snapshot)?;
    Ok(())
}

/// Load a snapshot file and restore it against the live world. Returns
/// the number of records restored.
pub fn load_state(world: &mut World, path: impl AsRef<Path>) -> Result<usize, AttentionError> {
    let snapshot = read_snapshot(path).map_err(AttentionError::Snapshot)?;
    Ok(restore_snapshot(world, &snapshot))
}

/// Current attention of a tracked machine
pub fn attention_of(world: &World, unit: u64) -> Option<f32> {
    world.resource::<MachineRegistry>().get(unit).map(|r| r.attention)
}

/// Number of machines currently tracked
pub fn tracked_count(world: &World) -> usize {
    world.resource::<MachineRegistry>().len()
}
