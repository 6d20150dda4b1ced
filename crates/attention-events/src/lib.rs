//! Shared serialized types for the attention engine.
//!
//! Event records describe lifecycle transitions (registration, removal,
//! tier changes) and are written as JSONL by the engine. Snapshot records
//! capture per-machine attention state for save/reload.

pub mod event;
pub mod snapshot;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

pub use event::{generate_event_id, AttentionEvent, AttentionEventKind, RemovalReason};
pub use snapshot::{generate_snapshot_id, AttentionSnapshot, MachineStateRecord};
