//! Configuration System
//!
//! Loads tuning parameters from tuning.toml for easy adjustment without recompiling.

use bevy_ecs::prelude::*;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default tuning file path
pub const DEFAULT_TUNING_PATH: &str = "tuning.toml";

/// Top-level configuration structure
#[derive(Resource, Debug, Clone, Deserialize)]
pub struct AttentionConfig {
    pub cycle: CycleConfig,
    pub targets: TargetConfig,
    pub rates: RateConfig,
    pub bounds: BoundsConfig,
    pub tiers: TierConfig,
    pub search: SearchConfig,
    pub modifiers: ModifierConfig,
}

/// Update cycle parameters
#[derive(Debug, Clone, Deserialize)]
pub struct CycleConfig {
    /// Ticks between batch updates
    pub update_interval: u64,
}

/// Attention targets contributed by each trigger factor
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub proximity: f32,
    pub visibility: f32,
    pub equipment: f32,
    pub gui: f32,
}

/// Base growth/decay rates (per cycle, before group modifiers)
#[derive(Debug, Clone, Deserialize)]
pub struct RateConfig {
    pub growth: f32,
    pub decay: f32,
    /// Absolute floor for effective decay after modifiers
    pub minimum_decay: f32,
}

/// Output multiplier bounds
#[derive(Debug, Clone, Deserialize)]
pub struct BoundsConfig {
    pub min_multiplier: f32,
    pub max_multiplier: f32,
    /// Flip the curve input so unwatched machines run fastest
    pub inverted: bool,
}

/// Tier discretization
#[derive(Debug, Clone, Deserialize)]
pub struct TierConfig {
    /// Percentage points between adjacent tiers
    pub interval_pct: u32,
}

/// Spatial search parameters
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Base trigger radius in tiles (before group modifiers)
    pub base_radius: f32,
    /// Carrier search radius as a multiple of the trigger radius
    pub carrier_radius_factor: f32,
    /// World tiles per screen pixel, used to derive viewport rectangles
    pub tiles_per_pixel: f32,
}

/// Per-upgrade-level parameter modifiers
#[derive(Debug, Clone, Deserialize)]
pub struct ModifierConfig {
    pub floor_per_level: f32,
    pub ceiling_per_level: f32,
    pub decay_per_level: f32,
    pub growth_per_level: f32,
    /// Extra radius in tiles per unlocked range tier
    pub range_step: f32,
    /// Elapsed-tick lifetime of parameter cache entries
    pub cache_ttl_ticks: u64,
}

impl AttentionConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default path, or use defaults if not found
    pub fn load_or_default() -> Self {
        Self::load(DEFAULT_TUNING_PATH).unwrap_or_else(|e| {
            tracing::warn!("could not load {}: {}. Using defaults.", DEFAULT_TUNING_PATH, e);
            Self::default()
        })
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bounds.max_multiplier <= self.bounds.min_multiplier {
            return Err(ConfigError::Invalid(
                "bounds.max_multiplier must exceed bounds.min_multiplier".to_string(),
            ));
        }
        if self.tiers.interval_pct == 0 {
            return Err(ConfigError::Invalid(
                "tiers.interval_pct must be at least 1".to_string(),
            ));
        }
        if self.rates.growth <= 0.0 || self.rates.decay <= 0.0 {
            return Err(ConfigError::Invalid(
                "rates.growth and rates.decay must be positive".to_string(),
            ));
        }
        if self.search.base_radius <= 0.0 {
            return Err(ConfigError::Invalid(
                "search.base_radius must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            cycle: CycleConfig {
                update_interval: 60,
            },
            targets: TargetConfig {
                proximity: 1.0,
                visibility: 0.5,
                equipment: 0.8,
                gui: 1.0,
            },
            rates: RateConfig {
                growth: 0.2,
                decay: 0.05,
                minimum_decay: 0.01,
            },
            bounds: BoundsConfig {
                min_multiplier: 0.2,
                max_multiplier: 1.2,
                inverted: false,
            },
            tiers: TierConfig { interval_pct: 5 },
            search: SearchConfig {
                base_radius: 32.0,
                carrier_radius_factor: 2.0,
                tiles_per_pixel: 1.0 / 32.0,
            },
            modifiers: ModifierConfig {
                floor_per_level: 0.05,
                ceiling_per_level: 0.1,
                decay_per_level: 0.005,
                growth_per_level: 0.02,
                range_step: 8.0,
                cache_ttl_ticks: 600,
            },
        }
    }
}

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
