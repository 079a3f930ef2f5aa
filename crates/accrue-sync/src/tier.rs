// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tier policy: a lookup table from plan tier to limits, plus a pure function
//! from (tier, platform) to the policy that governs one platform.

use accrue_config::model::{TierOverride, TiersConfig};
use accrue_core::{PlanTier, Platform, SyncFrequency};

/// What a plan tier grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierLimits {
    pub max_resources_per_platform: usize,
    pub sync_frequency: SyncFrequency,
    pub live_query_platforms: Vec<Platform>,
}

/// How a platform's resources are kept fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Synced into the context store on a fixed interval.
    Scheduled(SyncFrequency),
    /// Never cached: every read queries the source.
    LiveQuery,
}

/// The policy for one platform under one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformPolicy {
    pub max_resources: usize,
    pub cadence: Cadence,
}

impl PlatformPolicy {
    pub fn is_live_query(&self) -> bool {
        matches!(self.cadence, Cadence::LiveQuery)
    }
}

/// Built-in plan table.
fn builtin(tier: PlanTier) -> (usize, SyncFrequency) {
    match tier {
        PlanTier::Free => (5, SyncFrequency::Daily),
        PlanTier::Starter => (10, SyncFrequency::TwiceDaily),
        PlanTier::Pro => (25, SyncFrequency::Every6h),
        PlanTier::Business => (100, SyncFrequency::Hourly),
    }
}

#[derive(Debug, Clone)]
pub struct TierPolicy {
    free: (usize, SyncFrequency),
    starter: (usize, SyncFrequency),
    pro: (usize, SyncFrequency),
    business: (usize, SyncFrequency),
    live_query_platforms: Vec<Platform>,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self::from_config(&TiersConfig::default())
    }
}

impl TierPolicy {
    /// Builds the table from the built-in plans with config overrides applied.
    pub fn from_config(config: &TiersConfig) -> Self {
        fn apply(tier: PlanTier, o: &TierOverride) -> (usize, SyncFrequency) {
            let (max, freq) = builtin(tier);
            (
                o.max_resources_per_platform.unwrap_or(max),
                o.sync_frequency.unwrap_or(freq),
            )
        }
        Self {
            free: apply(PlanTier::Free, &config.free),
            starter: apply(PlanTier::Starter, &config.starter),
            pro: apply(PlanTier::Pro, &config.pro),
            business: apply(PlanTier::Business, &config.business),
            live_query_platforms: config.live_query_platforms.clone(),
        }
    }

    fn entry(&self, tier: PlanTier) -> (usize, SyncFrequency) {
        match tier {
            PlanTier::Free => self.free,
            PlanTier::Starter => self.starter,
            PlanTier::Pro => self.pro,
            PlanTier::Business => self.business,
        }
    }

    pub fn limits(&self, tier: PlanTier) -> TierLimits {
        let (max_resources_per_platform, sync_frequency) = self.entry(tier);
        TierLimits {
            max_resources_per_platform,
            sync_frequency,
            live_query_platforms: self.live_query_platforms.clone(),
        }
    }

    pub fn is_live_query(&self, platform: Platform) -> bool {
        self.live_query_platforms.contains(&platform)
    }

    pub fn policy_for(&self, tier: PlanTier, platform: Platform) -> PlatformPolicy {
        let (max_resources, frequency) = self.entry(tier);
        let cadence = if self.is_live_query(platform) {
            Cadence::LiveQuery
        } else {
            Cadence::Scheduled(frequency)
        };
        PlatformPolicy {
            max_resources,
            cadence,
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn builtin_plans() {
        let policy = TierPolicy::default();
        let free = policy.limits(PlanTier::Free);
        assert_eq!(free.max_resources_per_platform, 5);
        assert_eq!(free.sync_frequency, SyncFrequency::Daily);
        assert_eq!(free.live_query_platforms, vec![Platform::Calendar]);
        assert_eq!(policy.limits(PlanTier::Business).sync_frequency, SyncFrequency::Hourly);
    }

    #[test]
    fn calendar_is_live_query_on_every_tier() {
        let policy = TierPolicy::default();
        for tier in PlanTier::iter() {
            assert!(policy.policy_for(tier, Platform::Calendar).is_live_query());
            assert_eq!(
                policy.policy_for(tier, Platform::Slack).cadence,
                Cadence::Scheduled(policy.limits(tier).sync_frequency)
            );
        }
    }

    #[test]
    fn higher_tiers_never_grant_less() {
        let policy = TierPolicy::default();
        let tiers: Vec<PlanTier> = PlanTier::iter().collect();
        for pair in tiers.windows(2) {
            let (lo, hi) = (policy.limits(pair[0]), policy.limits(pair[1]));
            assert!(lo.max_resources_per_platform <= hi.max_resources_per_platform);
            assert!(lo.sync_frequency.interval() >= hi.sync_frequency.interval());
        }
    }

    #[test]
    fn overrides_replace_only_set_fields() {
        let config = TiersConfig {
            pro: TierOverride {
                max_resources_per_platform: Some(3),
                sync_frequency: None,
            },
            live_query_platforms: vec![],
            ..TiersConfig::default()
        };
        let policy = TierPolicy::from_config(&config);
        let pro = policy.policy_for(PlanTier::Pro, Platform::Calendar);
        assert_eq!(pro.max_resources, 3);
        assert_eq!(pro.cadence, Cadence::Scheduled(SyncFrequency::Every6h));
    }
}
