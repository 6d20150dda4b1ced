//! Attention Engine Systems
//!
//! Parameter resolution, spatial indexing, trigger evaluation, attention
//! state advancement, tier mapping, and the cycle orchestrator.

pub mod attention;
pub mod orchestrator;
pub mod params;
pub mod spatial;
pub mod tiers;
pub mod triggers;

// Re-export commonly used items
pub use attention::{advance_record, composite_target, smootherstep, step_attention, RateCurve};
pub use orchestrator::{run_attention_cycle, run_cycle_now, AttentionClock};
pub use params::{EffectiveParams, GroupUpgrades, ParameterCache, UpgradeLevels};
pub use spatial::{rebuild_spatial_grid, SpatialGrid};
pub use tiers::{reconcile_actuator, ReconcileOutcome, TierTable};
pub use triggers::{FogMap, TriggerSets};
