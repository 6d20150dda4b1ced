//! Attention Engine Driver
//!
//! Standalone harness that spawns a field of machines, a handful of
//! wandering observers, and some sensor carriers, then drives the
//! attention cycle for a fixed number of ticks. Actuators and decorations
//! are backed by in-memory recording implementations.

use bevy_ecs::prelude::*;
use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

use attention_core::adapter::{self, machine_built};
use attention_core::collaborators::{
    ActuatorService, DecorationService, RecordingFactory, RecordingRenderer,
};
use attention_core::components::machine::{GroupId, Position, Trackable, UnitNumber};
use attention_core::components::observer::{Carrier, Connected, Display, Observer};
use attention_core::components::registry::MachineRegistry;
use attention_core::config::AttentionConfig;
use attention_core::events::EventLog;
use attention_core::systems::orchestrator::{run_attention_cycle, AttentionClock, DEFAULT_GROUP};
use attention_core::systems::params::{ParameterCache, UpgradeLevels};
use attention_core::systems::spatial::SpatialGrid;
use attention_core::systems::tiers::TierTable;
use attention_core::systems::triggers::{FogMap, TriggerSets};

/// Command line arguments for the driver
#[derive(Parser, Debug)]
#[command(name = "attention_sim")]
#[command(about = "Machine attention engine driver")]
struct Args {
    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 3600)]
    ticks: u64,

    /// Number of machines to spawn
    #[arg(long, default_value_t = 200)]
    machines: usize,

    /// Number of wandering observers
    #[arg(long, default_value_t = 3)]
    observers: usize,

    /// Number of sensor carriers
    #[arg(long, default_value_t = 5)]
    carriers: usize,

    /// Edge length of the square world, in tiles
    #[arg(long, default_value_t = 512.0)]
    world_size: f32,

    /// Tuning file to load
    #[arg(long, default_value = "tuning.toml")]
    tuning: PathBuf,

    /// Where to write the final state snapshot
    #[arg(long, default_value = "output/attention.json")]
    snapshot: PathBuf,

    /// Where to write the event log
    #[arg(long, default_value = "output/events.jsonl")]
    events: PathBuf,
}

/// Seeded RNG resource for deterministic runs
#[derive(Resource)]
struct SimRng(SmallRng);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    println!("Attention Engine Driver");
    println!("=======================");
    println!("Seed: {}", args.seed);
    println!("Ticks: {}", args.ticks);
    println!(
        "Machines: {}, observers: {}, carriers: {}",
        args.machines, args.observers, args.carriers
    );
    println!();

    if let Some(parent) = args.snapshot.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Warning: could not create output directory: {}", e);
        }
    }

    let config = AttentionConfig::load(&args.tuning).unwrap_or_else(|e| {
        eprintln!("Warning: could not load {}: {}", args.tuning.display(), e);
        AttentionConfig::default()
    });
    let cycle_interval = config.cycle.update_interval;

    // Initialize the ECS world
    let mut world = World::new();
    world.insert_resource(AttentionClock::default());
    world.insert_resource(MachineRegistry::new());
    world.insert_resource(ParameterCache::new(config.modifiers.cache_ttl_ticks));
    world.insert_resource(UpgradeLevels::new());
    world.insert_resource(SpatialGrid::default());
    world.insert_resource(TriggerSets::new());
    world.insert_resource(TierTable::build(
        config.bounds.min_multiplier,
        config.bounds.max_multiplier,
        config.tiers.interval_pct,
    ));
    world.insert_resource(ActuatorService(Box::new(RecordingFactory::new())));
    world.insert_resource(DecorationService(Box::new(RecordingRenderer::new())));
    world.insert_resource(SimRng(SmallRng::seed_from_u64(args.seed)));

    // The whole field is charted for the default group, so viewport
    // visibility depends only on screen geometry
    let mut fog = FogMap::default();
    fog.chart_area(
        DEFAULT_GROUP,
        Position::new(0.0, 0.0),
        Position::new(args.world_size, args.world_size),
    );
    world.insert_resource(fog);

    match EventLog::new(&args.events) {
        Ok(log) => world.insert_resource(log),
        Err(e) => {
            eprintln!("Warning: could not open event log: {}", e);
            world.insert_resource(EventLog::null());
        }
    }
    world.insert_resource(config);

    // Spawn the field
    println!("Spawning entities...");
    {
        // Take the RNG out to avoid borrow conflicts
        let mut rng = world.remove_resource::<SimRng>().unwrap();
        spawn_field(&mut world, &mut rng.0, &args);
        world.insert_resource(rng);
    }
    println!("  Tracking {} machines", adapter::tracked_count(&world));
    println!();
    println!("Starting simulation...");
    println!();

    // Main loop
    for tick in 0..args.ticks {
        world.resource_mut::<AttentionClock>().current_tick = tick;

        {
            let mut rng = world.remove_resource::<SimRng>().unwrap();
            wander_observers(&mut world, &mut rng.0, args.world_size);
            world.insert_resource(rng);
        }

        let ran = run_attention_cycle(&mut world);

        if ran && tick > 0 && tick % (cycle_interval * 10) == 0 {
            let registry = world.resource::<MachineRegistry>();
            let active = registry.iter().filter(|(_, r)| r.has_attention).count();
            let log = world.resource::<EventLog>();
            println!(
                "[Tick {:>6}] {} tracked, {} with attention, {} events",
                tick,
                registry.len(),
                active,
                log.event_count()
            );
        }
    }

    // Final snapshot
    world.resource_mut::<AttentionClock>().current_tick = args.ticks;
    match adapter::save_state(&world, 1, &args.snapshot) {
        Ok(()) => println!("Wrote snapshot to {}", args.snapshot.display()),
        Err(e) => eprintln!("Warning: could not write snapshot: {}", e),
    }
    if let Err(e) = world.resource_mut::<EventLog>().flush() {
        eprintln!("Warning: could not flush event log: {}", e);
    }

    println!();
    println!(
        "Run complete. {} ticks, {} machines tracked, {} events.",
        args.ticks,
        adapter::tracked_count(&world),
        world.resource::<EventLog>().event_count()
    );
}

/// Spawn machines, observers, and carriers at random positions
fn spawn_field(world: &mut World, rng: &mut SmallRng, args: &Args) {
    for i in 0..args.machines {
        let entity = world
            .spawn((
                UnitNumber(i as u64 + 1),
                Position::new(
                    rng.gen_range(0.0..args.world_size),
                    rng.gen_range(0.0..args.world_size),
                ),
                GroupId::new(DEFAULT_GROUP),
                Trackable,
            ))
            .id();
        machine_built(world, entity);
    }

    for _ in 0..args.observers {
        world.spawn((
            Observer,
            Connected,
            Position::new(
                rng.gen_range(0.0..args.world_size),
                rng.gen_range(0.0..args.world_size),
            ),
            GroupId::new(DEFAULT_GROUP),
            Display::new(1920, 1080, 1.0),
        ));
    }

    for _ in 0..args.carriers {
        world.spawn((
            Carrier { has_sensor: true },
            Position::new(
                rng.gen_range(0.0..args.world_size),
                rng.gen_range(0.0..args.world_size),
            ),
        ));
    }
}

/// Random-walk every observer and carrier one step, clamped to the world
fn wander_observers(world: &mut World, rng: &mut SmallRng, world_size: f32) {
    let mut movers = world.query_filtered::<&mut Position, Or<(With<Observer>, With<Carrier>)>>();
    for mut position in movers.iter_mut(world) {
        position.x = (position.x + rng.gen_range(-1.0..=1.0)).clamp(0.0, world_size);
        position.y = (position.y + rng.gen_range(-1.0..=1.0)).clamp(0.0, world_size);
    }
}
