//! Attention State Machine
//!
//! Advances each machine's attention scalar toward its composite target
//! with asymmetric linear rates, then maps it to an actuator multiplier
//! through a smootherstep curve.

use crate::components::registry::MachineRecord;
use crate::config::TargetConfig;

use super::params::EffectiveParams;

/// Dead zone around the target below which the state is left untouched,
/// suppressing float jitter
pub const ATTENTION_EPSILON: f32 = 0.001;

/// Clamp into [0, 1]; non-finite values collapse to 0
pub fn clamp01(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Smootherstep curve `6t^5 - 15t^4 + 10t^3` over clamped `t`,
/// mapped into `[min, max]`
pub fn smootherstep(t: f32, min: f32, max: f32) -> f32 {
    let t = clamp01(t);
    let s = t * t * t * (t * (t * 6.0 - 15.0) + 10.0);
    min + (max - min) * s
}

/// How attention approaches its target each cycle. Linear steps are the
/// only implemented rule; the enum keeps the transform pluggable for a
/// ramped variant later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateCurve {
    #[default]
    Linear,
}

/// One step of the attention state toward `target`
pub fn step_attention(
    current: f32,
    target: f32,
    growth_rate: f32,
    decay_rate: f32,
    curve: RateCurve,
) -> f32 {
    let current = clamp01(current);
    let target = clamp01(target);

    if (current - target).abs() <= ATTENTION_EPSILON {
        return current;
    }

    match curve {
        RateCurve::Linear => {
            if target > current {
                (current + growth_rate).min(target)
            } else {
                (current - decay_rate).max(target)
            }
        }
    }
}

/// Composite target for one machine: the maximum over active factor
/// targets. An inactive factor contributes 0.
pub fn composite_target(
    proximity_active: bool,
    viewport_active: bool,
    equipment_active: bool,
    gui_open: bool,
    targets: &TargetConfig,
) -> f32 {
    let mut target = 0.0f32;
    if proximity_active {
        target = target.max(targets.proximity);
    }
    if viewport_active {
        target = target.max(targets.visibility);
    }
    if equipment_active {
        target = target.max(targets.equipment);
    }
    if gui_open {
        target = target.max(targets.gui);
    }
    clamp01(target)
}

/// Advance one machine record for this cycle and return the resulting
/// actuator multiplier. Out-of-range stored attention is clamped here,
/// migrating corrupted or legacy state on first touch.
pub fn advance_record(
    record: &mut MachineRecord,
    target: f32,
    params: &EffectiveParams,
    inverted: bool,
    curve: RateCurve,
) -> f32 {
    record.attention = clamp01(record.attention);
    record.target_attention = clamp01(target);
    record.has_attention = record.target_attention > 0.0;

    record.attention = step_attention(
        record.attention,
        record.target_attention,
        params.growth_rate,
        params.decay_rate,
        curve,
    );

    let t = if inverted {
        1.0 - record.attention
    } else {
        record.attention
    };
    smootherstep(t, params.min_multiplier, params.max_multiplier)
}
