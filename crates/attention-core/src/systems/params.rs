//! Parameter Resolver
//!
//! Computes effective min/max/decay/growth/radius per group from the base
//! configuration plus cumulative upgrade levels, behind a cache keyed by
//! group. Cache entries expire by elapsed ticks rather than wall clock so
//! staleness stays deterministic across save/load and speed changes, and
//! tolerate missed invalidations.

use bevy_ecs::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::config::AttentionConfig;

/// Effective parameters for one group. A fresh immutable snapshot;
/// callers must never mutate cache-returned values in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveParams {
    pub min_multiplier: f32,
    pub max_multiplier: f32,
    pub decay_rate: f32,
    pub growth_rate: f32,
    pub radius: f32,
}

/// Cumulative upgrade state for one group
#[derive(Debug, Clone, Default)]
pub struct GroupUpgrades {
    pub floor_level: u32,
    pub ceiling_level: u32,
    pub decay_level: u32,
    pub growth_level: u32,
    /// Discrete range tiers unlocked, numbered from 1
    pub range_tiers: HashSet<u32>,
}

impl GroupUpgrades {
    /// Range tiers only count while unlocked in unbroken order from 1;
    /// an out-of-order unlock beyond a gap contributes nothing.
    pub fn contiguous_range_tiers(&self) -> u32 {
        let mut count = 0;
        while self.range_tiers.contains(&(count + 1)) {
            count += 1;
        }
        count
    }
}

/// Resource: upgrade levels per group
#[derive(Resource, Debug, Default)]
pub struct UpgradeLevels {
    levels: HashMap<String, GroupUpgrades>,
}

impl UpgradeLevels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, group: &str) -> Option<&GroupUpgrades> {
        self.levels.get(group)
    }

    pub fn group_mut(&mut self, group: impl Into<String>) -> &mut GroupUpgrades {
        self.levels.entry(group.into()).or_default()
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    params: EffectiveParams,
    computed_at: u64,
}

/// Resource: per-group parameter cache with elapsed-tick expiry
#[derive(Resource, Debug)]
pub struct ParameterCache {
    entries: HashMap<String, CacheEntry>,
    ttl_ticks: u64,
}

impl ParameterCache {
    pub fn new(ttl_ticks: u64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_ticks,
        }
    }

    /// Drop the cached entry for one group
    pub fn invalidate(&mut self, group: &str) {
        self.entries.remove(group);
    }

    /// Drop every cached entry
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn cached_groups(&self) -> usize {
        self.entries.len()
    }

    /// Resolve effective parameters for a group, recomputing if the
    /// cached entry is missing or older than the ttl.
    pub fn resolve(
        &mut self,
        group: &str,
        levels: &UpgradeLevels,
        config: &AttentionConfig,
        current_tick: u64,
    ) -> EffectiveParams {
        if let Some(entry) = self.entries.get(group) {
            if current_tick.saturating_sub(entry.computed_at) < self.ttl_ticks {
                return entry.params;
            }
        }

        let params = compute_effective_params(group, levels, config);
        self.entries.insert(
            group.to_string(),
            CacheEntry {
                params,
                computed_at: current_tick,
            },
        );
        params
    }
}

/// Compute effective parameters from base config and a group's upgrades.
/// A group with no recorded upgrades resolves to the global base values.
pub fn compute_effective_params(
    group: &str,
    levels: &UpgradeLevels,
    config: &AttentionConfig,
) -> EffectiveParams {
    let default_upgrades = GroupUpgrades::default();
    let upgrades = levels.get(group).unwrap_or(&default_upgrades);
    let m = &config.modifiers;

    let min_multiplier =
        config.bounds.min_multiplier + m.floor_per_level * upgrades.floor_level as f32;
    let max_multiplier =
        config.bounds.max_multiplier + m.ceiling_per_level * upgrades.ceiling_level as f32;
    let decay_rate = (config.rates.decay - m.decay_per_level * upgrades.decay_level as f32)
        .max(config.rates.minimum_decay);
    let growth_rate = config.rates.growth + m.growth_per_level * upgrades.growth_level as f32;
    let radius =
        config.search.base_radius + m.range_step * upgrades.contiguous_range_tiers() as f32;

    EffectiveParams {
        min_multiplier,
        max_multiplier,
        decay_rate,
        growth_rate,
        radius,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_group_falls_back_to_base_values() {
        let config = AttentionConfig::default();
        let levels = UpgradeLevels::new();

        let params = compute_effective_params("nobody", &levels, &config);
        assert_eq!(params.min_multiplier, config.bounds.min_multiplier);
        assert_eq!(params.max_multiplier, config.bounds.max_multiplier);
        assert_eq!(params.decay_rate, config.rates.decay);
        assert_eq!(params.growth_rate, config.rates.growth);
        assert_eq!(params.radius, config.search.base_radius);
    }

    #[test]
    fn test_levels_shift_parameters() {
        let config = AttentionConfig::default();
        let mut levels = UpgradeLevels::new();
        {
            let group = levels.group_mut("north");
            group.floor_level = 2;
            group.ceiling_level = 1;
            group.growth_level = 3;
        }

        let params = compute_effective_params("north", &levels, &config);
        assert_eq!(
            params.min_multiplier,
            config.bounds.min_multiplier + 2.0 * config.modifiers.floor_per_level
        );
        assert_eq!(
            params.max_multiplier,
            config.bounds.max_multiplier + config.modifiers.ceiling_per_level
        );
        assert_eq!(
            params.growth_rate,
            config.rates.growth + 3.0 * config.modifiers.growth_per_level
        );
    }

    #[test]
    fn test_decay_never_drops_below_minimum() {
        let config = AttentionConfig::default();
        let mut levels = UpgradeLevels::new();
        levels.group_mut("north").decay_level = 1000;

        let params = compute_effective_params("north", &levels, &config);
        assert_eq!(params.decay_rate, config.rates.minimum_decay);
    }

    #[test]
    fn test_range_tiers_count_in_strict_order() {
        let config = AttentionConfig::default();
        let mut levels = UpgradeLevels::new();
        {
            let group = levels.group_mut("north");
            // Tier 3 is missing, so tier 4 must not count
            group.range_tiers.extend([1, 2, 4]);
        }

        assert_eq!(levels.get("north").unwrap().contiguous_range_tiers(), 2);
        let params = compute_effective_params("north", &levels, &config);
        assert_eq!(
            params.radius,
            config.search.base_radius + 2.0 * config.modifiers.range_step
        );
    }

    #[test]
    fn test_cache_serves_stale_entry_within_ttl() {
        let config = AttentionConfig::default();
        let mut levels = UpgradeLevels::new();
        let mut cache = ParameterCache::new(100);

        let before = cache.resolve("north", &levels, &config, 0);

        // Upgrade lands but nothing invalidates; entry is still fresh
        levels.group_mut("north").growth_level = 5;
        let cached = cache.resolve("north", &levels, &config, 50);
        assert_eq!(cached, before);

        // Past the ttl the entry recomputes even without invalidation
        let recomputed = cache.resolve("north", &levels, &config, 100);
        assert!(recomputed.growth_rate > before.growth_rate);
    }

    #[test]
    fn test_explicit_invalidation_recomputes_immediately() {
        let config = AttentionConfig::default();
        let mut levels = UpgradeLevels::new();
        let mut cache = ParameterCache::new(1000);

        let before = cache.resolve("north", &levels, &config, 0);
        levels.group_mut("north").ceiling_level = 2;

        cache.invalidate("north");
        let after = cache.resolve("north", &levels, &config, 1);
        assert!(after.max_multiplier > before.max_multiplier);
    }

    #[test]
    fn test_invalidate_all_clears_every_group() {
        let config = AttentionConfig::default();
        let levels = UpgradeLevels::new();
        let mut cache = ParameterCache::new(1000);

        cache.resolve("north", &levels, &config, 0);
        cache.resolve("south", &levels, &config, 0);
        assert_eq!(cache.cached_groups(), 2);

        cache.invalidate_all();
        assert_eq!(cache.cached_groups(), 0);
    }
}
