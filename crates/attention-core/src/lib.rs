//! Machine attention engine: per-machine attention state derived from
//! observer proximity, viewport visibility, sensor carriers, and direct
//! interaction, smoothed over time and mapped to tiered actuator effects.

use thiserror::Error;

pub mod adapter;
pub mod collaborators;
pub mod components;
pub mod config;
pub mod events;
pub mod persist;
pub mod systems;

pub use adapter::{attention_of, tracked_count};
pub use components::registry::{MachineRecord, MachineRegistry};
pub use config::AttentionConfig;
pub use systems::orchestrator::{run_attention_cycle, AttentionClock};

/// Errors that can occur in attention engine operations.
#[derive(Debug, Error)]
pub enum AttentionError {
    /// Error loading configuration
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    /// Error reading or writing persisted state
    #[error("snapshot error: {0}")]
    Snapshot(#[from] persist::SnapshotError),
}
