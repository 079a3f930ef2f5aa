// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resource selection under the tier cap, and the downgrade policy.
//!
//! Downgrade tie-break: within a platform, active resources are ordered by
//! `(selected_at, resource_id)` ascending. The first `cap` keep their
//! selection; the rest are excluded, so the most recent selections go first.

use std::collections::BTreeSet;
use std::sync::Arc;

use accrue_core::{
    AccrueError, Lease, PlanTier, Platform, Resource, ResourceKey, SelectionChange,
    StorageAdapter, User,
};
use chrono::{DateTime, TimeDelta, Utc};
use strum::IntoEnumIterator;
use tracing::info;

use crate::tier::TierPolicy;

const SELECTION_LEASE_TTL: TimeDelta = TimeDelta::seconds(30);

/// Orders resources by the downgrade tie-break.
pub fn downgrade_order(resources: &mut [Resource]) {
    resources.sort_by(|a, b| {
        a.selected_at
            .cmp(&b.selected_at)
            .then_with(|| a.resource_id.cmp(&b.resource_id))
    });
}

/// Writes selection changes for a user's resources.
pub struct ResourceSelector {
    storage: Arc<dyn StorageAdapter>,
    policy: Arc<TierPolicy>,
}

impl ResourceSelector {
    pub fn new(storage: Arc<dyn StorageAdapter>, policy: Arc<TierPolicy>) -> Self {
        Self { storage, policy }
    }

    async fn user(&self, user_id: &str) -> Result<User, AccrueError> {
        self.storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| AccrueError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })
    }

    /// Replaces the selected set on `platform` with `resource_ids`.
    ///
    /// Resources dropped from the set become excluded; re-selecting an
    /// excluded resource clears the flag. Resources that stay selected keep
    /// their original `selected_at`. Over the cap the whole request is
    /// rejected and nothing changes.
    pub async fn update_selected_resources(
        &self,
        user_id: &str,
        platform: Platform,
        resource_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<Resource>, AccrueError> {
        let lease = Lease::acquire_or_conflict(
            self.storage.as_ref(),
            format!("selection:{user_id}"),
            SELECTION_LEASE_TTL,
            now,
        )
        .await?;
        let result = self
            .apply_selection(user_id, platform, resource_ids, now)
            .await;
        lease.release(self.storage.as_ref()).await;
        result
    }

    async fn apply_selection(
        &self,
        user_id: &str,
        platform: Platform,
        resource_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<Resource>, AccrueError> {
        let user = self.user(user_id).await?;
        let limit = self.policy.policy_for(user.tier, platform).max_resources;
        let existing = self.storage.list_resources(user_id, Some(platform)).await?;
        let current = existing.iter().filter(|r| r.is_active()).count();

        let requested: BTreeSet<&str> = resource_ids.iter().map(String::as_str).collect();
        if requested.len() > limit {
            return Err(AccrueError::TierLimitExceeded {
                platform,
                current,
                requested: requested.len(),
                limit,
            });
        }
        for id in &requested {
            if !existing.iter().any(|r| r.resource_id == *id) {
                return Err(AccrueError::NotFound {
                    entity: "resource",
                    id: ResourceKey::new(user_id, platform, *id).to_string(),
                });
            }
        }

        let mut changes = Vec::new();
        for r in &existing {
            let wanted = requested.contains(r.resource_id.as_str());
            let change = match (wanted, r.is_active()) {
                (true, true) => None,
                (true, false) => Some(SelectionChange {
                    key: r.key(),
                    selected: true,
                    excluded: false,
                    selected_at: Some(now),
                }),
                (false, true) => Some(SelectionChange {
                    key: r.key(),
                    selected: false,
                    excluded: true,
                    selected_at: None,
                }),
                (false, false) => None,
            };
            changes.extend(change);
        }

        if !changes.is_empty() {
            self.storage.update_resource_selection(&changes).await?;
        }
        info!(
            user_id,
            platform = %platform,
            selected = requested.len(),
            changed = changes.len(),
            "resource selection updated"
        );
        self.storage.list_resources(user_id, Some(platform)).await
    }

    /// Changes a user's tier. On downgrade, active resources beyond the new
    /// cap are excluded by the tie-break; returns the excluded keys.
    pub async fn apply_tier_change(
        &self,
        user_id: &str,
        tier: PlanTier,
        now: DateTime<Utc>,
    ) -> Result<Vec<ResourceKey>, AccrueError> {
        let lease = Lease::acquire_or_conflict(
            self.storage.as_ref(),
            format!("selection:{user_id}"),
            SELECTION_LEASE_TTL,
            now,
        )
        .await?;
        let result = self.apply_tier(user_id, tier).await;
        lease.release(self.storage.as_ref()).await;
        result
    }

    async fn apply_tier(
        &self,
        user_id: &str,
        tier: PlanTier,
    ) -> Result<Vec<ResourceKey>, AccrueError> {
        let previous = self.user(user_id).await?.tier;

        let mut changes = Vec::new();
        for platform in Platform::iter() {
            let cap = self.policy.policy_for(tier, platform).max_resources;
            let mut active: Vec<Resource> = self
                .storage
                .list_resources(user_id, Some(platform))
                .await?
                .into_iter()
                .filter(Resource::is_active)
                .collect();
            if active.len() <= cap {
                continue;
            }
            downgrade_order(&mut active);
            changes.extend(active.iter().skip(cap).map(|r| SelectionChange {
                key: r.key(),
                selected: false,
                excluded: true,
                selected_at: None,
            }));
        }

        if !self
            .storage
            .apply_tier_change(user_id, tier, &changes)
            .await?
        {
            return Err(AccrueError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            });
        }
        info!(
            user_id,
            from = %previous,
            to = %tier,
            excluded = changes.len(),
            "plan tier changed"
        );
        Ok(changes.into_iter().map(|c| c.key).collect())
    }
}
