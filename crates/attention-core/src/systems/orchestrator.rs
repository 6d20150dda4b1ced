//! Update Orchestrator
//!
//! Drives the fixed-interval attention cycle. Every cycle has two phases,
//! always both: phase one builds the spatial index and the three trigger
//! membership sets once; phase two walks every tracked machine exactly
//! once, advancing its state and reconciling its actuator. Collapsing the
//! phases into a per-machine search would break the
//! O(observers + machines) cost of trigger evaluation.

use bevy_ecs::prelude::*;
use bevy_ecs::system::RunSystemOnce;

use attention_events::{AttentionEventKind, RemovalReason};

use crate::collaborators::{destroy_effects, ActuatorService, DecorationService};
use crate::components::machine::Trackable;
use crate::components::registry::MachineRegistry;
use crate::config::AttentionConfig;
use crate::events::EventLog;

use super::attention::{advance_record, composite_target, RateCurve};
use super::params::{ParameterCache, UpgradeLevels};
use super::spatial::{rebuild_spatial_grid, SpatialGrid};
use super::tiers::{reconcile_actuator, ReconcileOutcome, TierTable};
use super::triggers::{build_trigger_sets, collect_observer_views, FogMap, TriggerSets};

/// Group used when no connected observer is present to govern the cycle
pub const DEFAULT_GROUP: &str = "default";

/// Resource: the engine's tick clock, advanced by the host
#[derive(Resource, Debug, Default)]
pub struct AttentionClock {
    pub current_tick: u64,
}

impl AttentionClock {
    pub fn advance(&mut self) {
        self.current_tick += 1;
    }
}

/// Engine resources taken out of the world for the duration of phase two,
/// so records, caches, and collaborator services can be mutated while
/// entity validity is checked against the world.
pub(crate) struct TakenServices {
    pub registry: MachineRegistry,
    pub cache: ParameterCache,
    pub actuators: ActuatorService,
    pub decorations: DecorationService,
    pub log: EventLog,
}

impl TakenServices {
    pub fn take(world: &mut World) -> Option<Self> {
        let registry = world.remove_resource::<MachineRegistry>();
        let cache = world.remove_resource::<ParameterCache>();
        let actuators = world.remove_resource::<ActuatorService>();
        let decorations = world.remove_resource::<DecorationService>();
        let log = world.remove_resource::<EventLog>();

        match (registry, cache, actuators, decorations, log) {
            (Some(registry), Some(cache), Some(actuators), Some(decorations), Some(log)) => {
                Some(Self {
                    registry,
                    cache,
                    actuators,
                    decorations,
                    log,
                })
            }
            (registry, cache, actuators, decorations, log) => {
                tracing::warn!("attention engine resources incomplete; skipping cycle");
                if let Some(r) = registry {
                    world.insert_resource(r);
                }
                if let Some(c) = cache {
                    world.insert_resource(c);
                }
                if let Some(a) = actuators {
                    world.insert_resource(a);
                }
                if let Some(d) = decorations {
                    world.insert_resource(d);
                }
                if let Some(l) = log {
                    world.insert_resource(l);
                }
                None
            }
        }
    }

    pub fn restore(self, world: &mut World) {
        world.insert_resource(self.registry);
        world.insert_resource(self.cache);
        world.insert_resource(self.actuators);
        world.insert_resource(self.decorations);
        world.insert_resource(self.log);
    }
}

/// Run one attention cycle if the configured interval has elapsed.
/// Returns true when a cycle ran.
pub fn run_attention_cycle(world: &mut World) -> bool {
    let tick = world.resource::<AttentionClock>().current_tick;
    let interval = world.resource::<AttentionConfig>().cycle.update_interval;
    if interval == 0 || tick % interval != 0 {
        return false;
    }
    run_cycle_now(world);
    true
}

/// Exclusive system wrapper around [`run_attention_cycle`], for hosts
/// driving the engine from a schedule.
pub fn attention_cycle_system(world: &mut World) {
    run_attention_cycle(world);
}

/// Run both phases of the cycle unconditionally.
pub fn run_cycle_now(world: &mut World) {
    let tick = world.resource::<AttentionClock>().current_tick;
    let config = world.resource::<AttentionConfig>().clone();

    // Phase 1: index space, gather observers, build the three sets once
    world.run_system_once(rebuild_spatial_grid);
    let observers = collect_observer_views(world, config.search.tiles_per_pixel);

    let governing_group = observers
        .first()
        .map(|o| o.group.clone())
        .unwrap_or_else(|| DEFAULT_GROUP.to_string());

    let governing_params = world.resource_scope(|world, mut cache: Mut<ParameterCache>| {
        let levels = world.resource::<UpgradeLevels>();
        cache.resolve(&governing_group, levels, &config, tick)
    });

    world.resource_scope(|world, mut sets: Mut<TriggerSets>| {
        let grid = world.resource::<SpatialGrid>();
        let fog = world.resource::<FogMap>();
        build_trigger_sets(
            &mut sets,
            grid,
            fog,
            &observers,
            governing_params.radius,
            config.search.carrier_radius_factor,
        );
    });

    // Phase 2: one pass over every tracked machine
    let sets = world.resource::<TriggerSets>().clone();
    let table = world.resource::<TierTable>().clone();

    let Some(mut services) = TakenServices::take(world) else {
        return;
    };

    let mut removed = 0usize;
    for unit in services.registry.unit_numbers() {
        let Some((entity, group, gui_open)) = services
            .registry
            .get(unit)
            .map(|r| (r.entity, r.group.0.clone(), r.gui_open))
        else {
            continue;
        };

        let alive = world
            .get_entity(entity)
            .map_or(false, |e| e.contains::<Trackable>());
        if !alive {
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
                tracing::debug!("machine {} invalid at cycle start, removed", unit);
                removed += 1;
            }
            continue;
        }

        let (proximity, viewport, equipment) = sets.flags(unit);
        let target = composite_target(proximity, viewport, equipment, gui_open, &config.targets);
        let params =
            services
                .cache
                .resolve(&group, world.resource::<UpgradeLevels>(), &config, tick);

        let Some(record) = services.registry.get_mut(unit) else {
            continue;
        };
        let previous_tier = record.last_tier;
        let multiplier = advance_record(
            record,
            target,
            &params,
            config.bounds.inverted,
            RateCurve::default(),
        );

        let outcome = reconcile_actuator(record, multiplier, &table, services.actuators.0.as_mut());
        match outcome {
            ReconcileOutcome::Created(tier) | ReconcileOutcome::Reconfigured(tier) => {
                services.log.record(
                    tick,
                    AttentionEventKind::TierChanged {
                        unit,
                        previous: previous_tier,
                        current: tier,
                    },
                );
            }
            ReconcileOutcome::CreationFailed => {
                tracing::warn!("actuator creation failed for machine {}, will retry", unit);
            }
            ReconcileOutcome::Lost => {
                tracing::warn!("actuator handle lost for machine {}, will recreate", unit);
            }
            ReconcileOutcome::Unchanged => {}
        }

        // Decoration is cosmetic; a None result is silently ignored
        if let Some(handle) =
            services
                .decorations
                .0
                .show(unit, record.attention, record.has_attention)
        {
            record.decoration = Some(handle);
        }
    }

    let tracked = services.registry.len();
    services.restore(world);

    tracing::debug!(
        tick,
        tracked,
        removed,
        observers = observers.len(),
        "attention cycle complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{RecordingFactory, RecordingRenderer};
    use crate::components::machine::{GroupId, Position, UnitNumber};
    use crate::components::observer::{Connected, Display, Observer};
    use crate::systems::spatial::SpatialGrid;

    fn engine_world(config: AttentionConfig) -> World {
        let mut world = World::new();
        world.insert_resource(AttentionClock::default());
        world.insert_resource(MachineRegistry::new());
        world.insert_resource(ParameterCache::new(config.modifiers.cache_ttl_ticks));
        world.insert_resource(UpgradeLevels::new());
        world.insert_resource(SpatialGrid::default());
        world.insert_resource(FogMap::default());
        world.insert_resource(TriggerSets::new());
        world.insert_resource(TierTable::build(
            config.bounds.min_multiplier,
            config.bounds.max_multiplier,
            config.tiers.interval_pct,
        ));
        world.insert_resource(ActuatorService(Box::new(RecordingFactory::new())));
        world.insert_resource(DecorationService(Box::new(RecordingRenderer::new())));
        world.insert_resource(EventLog::null());
        world.insert_resource(config);
        world
    }

    fn spawn_machine(world: &mut World, unit: u64, x: f32, y: f32) -> Entity {
        let entity = world
            .spawn((
                UnitNumber(unit),
                Position::new(x, y),
                GroupId::new(DEFAULT_GROUP),
                Trackable,
            ))
            .id();
        let group = GroupId::new(DEFAULT_GROUP);
        world
            .resource_mut::<MachineRegistry>()
            .register(unit, entity, group);
        entity
    }

    fn spawn_observer(world: &mut World, x: f32, y: f32) -> Entity {
        world
            .spawn((
                Observer,
                Connected,
                Position::new(x, y),
                GroupId::new(DEFAULT_GROUP),
                Display::new(1920, 1080, 1.0),
            ))
            .id()
    }

    #[test]
    fn test_cycle_respects_update_interval() {
        let mut world = engine_world(AttentionConfig::default());
        spawn_machine(&mut world, 1, 0.0, 0.0);

        world.resource_mut::<AttentionClock>().current_tick = 1;
        assert!(!run_attention_cycle(&mut world));

        world.resource_mut::<AttentionClock>().current_tick = 60;
        assert!(run_attention_cycle(&mut world));
    }

    #[test]
    fn test_observed_machine_gains_attention() {
        let mut world = engine_world(AttentionConfig::default());
        spawn_machine(&mut world, 1, 4.0, 0.0);
        spawn_observer(&mut world, 0.0, 0.0);

        run_cycle_now(&mut world);

        let registry = world.resource::<MachineRegistry>();
        let record = registry.get(1).unwrap();
        assert!(record.has_attention);
        assert!(record.attention > 0.0);
        assert!(record.actuator.is_some());
    }

    #[test]
    fn test_unobserved_machine_stays_at_rest() {
        let mut world = engine_world(AttentionConfig::default());
        spawn_machine(&mut world, 1, 500.0, 500.0);
        spawn_observer(&mut world, 0.0, 0.0);

        run_cycle_now(&mut world);

        let registry = world.resource::<MachineRegistry>();
        let record = registry.get(1).unwrap();
        assert!(!record.has_attention);
        assert_eq!(record.attention, 0.0);
        // Actuator still exists, parked at the bottom tier
        assert_eq!(record.last_tier, Some(20));
    }

    #[test]
    fn test_stale_machine_removed_during_cycle() {
        let mut world = engine_world(AttentionConfig::default());
        let entity = spawn_machine(&mut world, 1, 0.0, 0.0);
        spawn_observer(&mut world, 0.0, 0.0);

        run_cycle_now(&mut world);
        assert_eq!(world.resource::<MachineRegistry>().len(), 1);

        world.despawn(entity);
        run_cycle_now(&mut world);
        assert!(world.resource::<MachineRegistry>().is_empty());
    }

    #[test]
    fn test_attention_saturates_over_cycles() {
        let mut world = engine_world(AttentionConfig::default());
        spawn_machine(&mut world, 1, 4.0, 0.0);
        spawn_observer(&mut world, 0.0, 0.0);

        // growth 0.2 toward target 1.0: exactly saturated after 5 cycles
        for _ in 0..5 {
            run_cycle_now(&mut world);
        }
        let registry = world.resource::<MachineRegistry>();
        let record = registry.get(1).unwrap();
        assert_eq!(record.attention, 1.0);
        assert_eq!(record.last_tier, Some(120));
    }

    #[test]
    fn test_no_observers_decays_everything() {
        let mut world = engine_world(AttentionConfig::default());
        spawn_machine(&mut world, 1, 0.0, 0.0);
        {
            let mut registry = world.resource_mut::<MachineRegistry>();
            registry.get_mut(1).unwrap().attention = 0.3;
        }

        // decay 0.05: gone within ceil(0.3 / 0.05) = 6 cycles
        for _ in 0..6 {
            run_cycle_now(&mut world);
        }
        let registry = world.resource::<MachineRegistry>();
        assert_eq!(registry.get(1).unwrap().attention, 0.0);
    }
}
