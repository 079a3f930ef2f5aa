// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for durable persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AccrueError;
use crate::records::{
    ContextItem, Deliverable, DeliverableVersion, DiscoveredResource, FeedbackObservation,
    ItemWindow, Resource, ResourceKey, SelectionChange, User, VersionTransition, WorkRecord,
};
use crate::traits::adapter::PluginAdapter;
use crate::types::{PlanTier, Platform, VersionStatus};

/// Adapter for persistent storage of users, resources, context items,
/// deliverables, versions, leases and feedback.
///
/// Every multi-row write is atomic. Methods returning `bool` report whether a
/// conditional write took effect.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initialize the storage backend (create tables, run migrations, etc.).
    async fn initialize(&self) -> Result<(), AccrueError>;

    /// Close the storage backend cleanly.
    async fn close(&self) -> Result<(), AccrueError>;

    // --- Users ---

    /// Inserts the user, or updates the tier if it already exists.
    async fn upsert_user(&self, user: &User) -> Result<(), AccrueError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AccrueError>;

    async fn list_users(&self) -> Result<Vec<User>, AccrueError>;

    /// Returns `false` if the user does not exist.
    async fn set_user_tier(&self, user_id: &str, tier: PlanTier) -> Result<bool, AccrueError>;

    /// Sets the tier and applies `changes` atomically. Returns `false`, with
    /// nothing written, if the user does not exist.
    async fn apply_tier_change(
        &self,
        user_id: &str,
        tier: PlanTier,
        changes: &[SelectionChange],
    ) -> Result<bool, AccrueError>;

    // --- Resources ---

    /// Records a landscape entry. Existing selection and sync state are kept;
    /// only descriptive fields are refreshed.
    async fn upsert_discovered_resource(
        &self,
        user_id: &str,
        platform: Platform,
        discovered: &DiscoveredResource,
        now: DateTime<Utc>,
    ) -> Result<(), AccrueError>;

    async fn get_resource(&self, key: &ResourceKey) -> Result<Option<Resource>, AccrueError>;

    /// Lists a user's resources, optionally restricted to one platform.
    async fn list_resources(
        &self,
        user_id: &str,
        platform: Option<Platform>,
    ) -> Result<Vec<Resource>, AccrueError>;

    /// All selected, non-excluded resources across every user.
    async fn list_active_resources(&self) -> Result<Vec<Resource>, AccrueError>;

    /// Applies every change in one transaction.
    async fn update_resource_selection(&self, changes: &[SelectionChange])
    -> Result<(), AccrueError>;

    /// Persists a successful fetch atomically: items, cursor, sync timestamp
    /// and partial flag. A `None` cursor keeps the stored one. Returns the
    /// number of newly inserted items.
    async fn apply_sync_page(
        &self,
        key: &ResourceKey,
        items: &[ContextItem],
        next_cursor: Option<&str>,
        partial: bool,
        synced_at: DateTime<Utc>,
    ) -> Result<usize, AccrueError>;

    /// Records a failed fetch; cursor and sync timestamp are untouched.
    async fn record_sync_failure(
        &self,
        key: &ResourceKey,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AccrueError>;

    async fn count_resource_items(&self, key: &ResourceKey) -> Result<usize, AccrueError>;

    // --- Context items ---

    /// Inserts items, ignoring ones whose external id already exists for the
    /// same resource. Returns the number inserted.
    async fn insert_items(&self, items: &[ContextItem]) -> Result<usize, AccrueError>;

    /// The most recent `limit` items of a resource inside `window`, ordered
    /// oldest first by `source_timestamp`.
    async fn list_resource_items(
        &self,
        key: &ResourceKey,
        window: ItemWindow,
        limit: usize,
    ) -> Result<Vec<ContextItem>, AccrueError>;

    /// Retained items for a user: user-wide ones plus those scoped to
    /// `deliverable_id`, oldest first.
    async fn list_retained_items(
        &self,
        user_id: &str,
        deliverable_id: Option<&str>,
    ) -> Result<Vec<ContextItem>, AccrueError>;

    async fn get_item(&self, item_id: &str) -> Result<Option<ContextItem>, AccrueError>;

    /// Returns `false` if the item does not exist.
    async fn set_item_retained(&self, item_id: &str, retained: bool) -> Result<bool, AccrueError>;

    /// Deletes non-retained items fetched before `cutoff`.
    async fn purge_items_before(&self, cutoff: DateTime<Utc>) -> Result<usize, AccrueError>;

    // --- Deliverables ---

    async fn create_deliverable(&self, deliverable: &Deliverable) -> Result<(), AccrueError>;

    async fn get_deliverable(&self, id: &str) -> Result<Option<Deliverable>, AccrueError>;

    async fn list_deliverables(&self, user_id: Option<&str>)
    -> Result<Vec<Deliverable>, AccrueError>;

    async fn set_deliverable_last_run(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AccrueError>;

    async fn set_deliverable_paused(&self, id: &str, paused: bool) -> Result<bool, AccrueError>;

    // --- Versions ---

    /// Allocates the next version number and inserts a `generating` version
    /// in one transaction. Fails with a concurrency conflict if another
    /// version of the deliverable is still generating.
    async fn allocate_version(
        &self,
        deliverable_id: &str,
        at: DateTime<Utc>,
    ) -> Result<DeliverableVersion, AccrueError>;

    async fn get_version(&self, version_id: &str)
    -> Result<Option<DeliverableVersion>, AccrueError>;

    /// All versions of a deliverable ordered by version number.
    async fn list_versions(&self, deliverable_id: &str)
    -> Result<Vec<DeliverableVersion>, AccrueError>;

    /// Versions in `status` across every deliverable.
    async fn list_versions_with_status(
        &self,
        status: VersionStatus,
    ) -> Result<Vec<DeliverableVersion>, AccrueError>;

    /// Applies the transition iff the stored status equals `expected`.
    /// Sets `staged_at` when moving to staged, `decided_at` when moving to a
    /// decided status.
    async fn transition_version(&self, transition: &VersionTransition)
    -> Result<bool, AccrueError>;

    /// Staged versions whose semi-auto deadline is at or before `now`.
    async fn due_auto_approvals(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DeliverableVersion>, AccrueError>;

    /// Approved or delivered versions with no feedback observation yet.
    async fn approved_without_feedback(
        &self,
        limit: usize,
    ) -> Result<Vec<DeliverableVersion>, AccrueError>;

    // --- Work records ---

    async fn insert_work_record(&self, record: &WorkRecord) -> Result<(), AccrueError>;

    async fn get_work_record(&self, version_id: &str) -> Result<Option<WorkRecord>, AccrueError>;

    async fn delete_work_record(&self, version_id: &str) -> Result<bool, AccrueError>;

    // --- Leases ---

    /// Takes the lease if it is free or expired. Returns `false` if another
    /// holder owns an unexpired lease.
    async fn try_acquire_lease(
        &self,
        key: &str,
        holder: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AccrueError>;

    /// Releases the lease if `holder` still owns it.
    async fn release_lease(&self, key: &str, holder: &str) -> Result<bool, AccrueError>;

    // --- Feedback ---

    /// Returns `false` if the version already has an observation.
    async fn insert_feedback_observation(
        &self,
        observation: &FeedbackObservation,
    ) -> Result<bool, AccrueError>;

    /// Observations of a deliverable, newest version first.
    async fn list_feedback_observations(
        &self,
        deliverable_id: &str,
    ) -> Result<Vec<FeedbackObservation>, AccrueError>;

    async fn get_feedback_observation(
        &self,
        version_id: &str,
    ) -> Result<Option<FeedbackObservation>, AccrueError>;
}
