// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use accrue_config::model::StorageConfig;
use accrue_core::{
    AccrueError, AdapterType, ContextItem, Deliverable, DeliverableVersion, DiscoveredResource,
    FeedbackObservation, HealthStatus, ItemWindow, PlanTier, Platform, PluginAdapter, Resource, ResourceKey,
    SelectionChange, StorageAdapter, User, VersionStatus, VersionTransition, WorkRecord,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, AccrueError> {
        self.db.get().ok_or_else(|| AccrueError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, AccrueError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AccrueError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), AccrueError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| AccrueError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), AccrueError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Users ---

    async fn upsert_user(&self, user: &User) -> Result<(), AccrueError> {
        queries::users::upsert_user(self.db()?, user).await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AccrueError> {
        queries::users::get_user(self.db()?, user_id).await
    }

    async fn list_users(&self) -> Result<Vec<User>, AccrueError> {
        queries::users::list_users(self.db()?).await
    }

    async fn set_user_tier(&self, user_id: &str, tier: PlanTier) -> Result<bool, AccrueError> {
        queries::users::set_user_tier(self.db()?, user_id, tier).await
    }

    async fn apply_tier_change(
        &self,
        user_id: &str,
        tier: PlanTier,
        changes: &[SelectionChange],
    ) -> Result<bool, AccrueError> {
        queries::users::change_tier(self.db()?, user_id, tier, changes).await
    }

    // --- Resources ---

    async fn upsert_discovered_resource(
        &self,
        user_id: &str,
        platform: Platform,
        discovered: &DiscoveredResource,
        now: DateTime<Utc>,
    ) -> Result<(), AccrueError> {
        queries::resources::upsert_discovered(self.db()?, user_id, platform, discovered, now).await
    }

    async fn get_resource(&self, key: &ResourceKey) -> Result<Option<Resource>, AccrueError> {
        queries::resources::get_resource(self.db()?, key).await
    }

    async fn list_resources(
        &self,
        user_id: &str,
        platform: Option<Platform>,
    ) -> Result<Vec<Resource>, AccrueError> {
        queries::resources::list_resources(self.db()?, user_id, platform).await
    }

    async fn list_active_resources(&self) -> Result<Vec<Resource>, AccrueError> {
        queries::resources::list_active(self.db()?).await
    }

    async fn update_resource_selection(
        &self,
        changes: &[SelectionChange],
    ) -> Result<(), AccrueError> {
        queries::resources::update_selection(self.db()?, changes).await
    }

    async fn apply_sync_page(
        &self,
        key: &ResourceKey,
        items: &[ContextItem],
        next_cursor: Option<&str>,
        partial: bool,
        synced_at: DateTime<Utc>,
    ) -> Result<usize, AccrueError> {
        queries::resources::apply_sync_page(self.db()?, key, items, next_cursor, partial, synced_at)
            .await
    }

    async fn record_sync_failure(
        &self,
        key: &ResourceKey,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AccrueError> {
        queries::resources::record_sync_failure(self.db()?, key, error, at).await
    }

    async fn count_resource_items(&self, key: &ResourceKey) -> Result<usize, AccrueError> {
        queries::resources::count_items(self.db()?, key).await
    }

    // --- Context items ---

    async fn insert_items(&self, items: &[ContextItem]) -> Result<usize, AccrueError> {
        queries::items::insert_items(self.db()?, items).await
    }

    async fn list_resource_items(
        &self,
        key: &ResourceKey,
        window: ItemWindow,
        limit: usize,
    ) -> Result<Vec<ContextItem>, AccrueError> {
        queries::items::list_resource_items(self.db()?, key, window, limit).await
    }

    async fn list_retained_items(
        &self,
        user_id: &str,
        deliverable_id: Option<&str>,
    ) -> Result<Vec<ContextItem>, AccrueError> {
        queries::items::list_retained(self.db()?, user_id, deliverable_id).await
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<ContextItem>, AccrueError> {
        queries::items::get_item(self.db()?, item_id).await
    }

    async fn set_item_retained(&self, item_id: &str, retained: bool) -> Result<bool, AccrueError> {
        queries::items::set_retained(self.db()?, item_id, retained).await
    }

    async fn purge_items_before(&self, cutoff: DateTime<Utc>) -> Result<usize, AccrueError> {
        queries::items::purge_before(self.db()?, cutoff).await
    }

    // --- Deliverables ---

    async fn create_deliverable(&self, deliverable: &Deliverable) -> Result<(), AccrueError> {
        queries::deliverables::create_deliverable(self.db()?, deliverable).await
    }

    async fn get_deliverable(&self, id: &str) -> Result<Option<Deliverable>, AccrueError> {
        queries::deliverables::get_deliverable(self.db()?, id).await
    }

    async fn list_deliverables(
        &self,
        user_id: Option<&str>,
    ) -> Result<Vec<Deliverable>, AccrueError> {
        queries::deliverables::list_deliverables(self.db()?, user_id).await
    }

    async fn set_deliverable_last_run(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AccrueError> {
        queries::deliverables::set_last_run(self.db()?, id, at).await
    }

    async fn set_deliverable_paused(&self, id: &str, paused: bool) -> Result<bool, AccrueError> {
        queries::deliverables::set_paused(self.db()?, id, paused).await
    }

    // --- Versions ---

    async fn allocate_version(
        &self,
        deliverable_id: &str,
        at: DateTime<Utc>,
    ) -> Result<DeliverableVersion, AccrueError> {
        queries::versions::allocate_version(self.db()?, deliverable_id, at).await
    }

    async fn get_version(
        &self,
        version_id: &str,
    ) -> Result<Option<DeliverableVersion>, AccrueError> {
        queries::versions::get_version(self.db()?, version_id).await
    }

    async fn list_versions(
        &self,
        deliverable_id: &str,
    ) -> Result<Vec<DeliverableVersion>, AccrueError> {
        queries::versions::list_versions(self.db()?, deliverable_id).await
    }

    async fn list_versions_with_status(
        &self,
        status: VersionStatus,
    ) -> Result<Vec<DeliverableVersion>, AccrueError> {
        queries::versions::list_with_status(self.db()?, status).await
    }

    async fn transition_version(
        &self,
        transition: &VersionTransition,
    ) -> Result<bool, AccrueError> {
        queries::versions::transition_version(self.db()?, transition).await
    }

    async fn due_auto_approvals(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DeliverableVersion>, AccrueError> {
        queries::versions::due_auto_approvals(self.db()?, now).await
    }

    async fn approved_without_feedback(
        &self,
        limit: usize,
    ) -> Result<Vec<DeliverableVersion>, AccrueError> {
        queries::versions::approved_without_feedback(self.db()?, limit).await
    }

    // --- Work records ---

    async fn insert_work_record(&self, record: &WorkRecord) -> Result<(), AccrueError> {
        queries::work_records::insert_work_record(self.db()?, record).await
    }

    async fn get_work_record(&self, version_id: &str) -> Result<Option<WorkRecord>, AccrueError> {
        queries::work_records::get_work_record(self.db()?, version_id).await
    }

    async fn delete_work_record(&self, version_id: &str) -> Result<bool, AccrueError> {
        queries::work_records::delete_work_record(self.db()?, version_id).await
    }

    // --- Leases ---

    async fn try_acquire_lease(
        &self,
        key: &str,
        holder: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AccrueError> {
        queries::leases::try_acquire(self.db()?, key, holder, now, expires_at).await
    }

    async fn release_lease(&self, key: &str, holder: &str) -> Result<bool, AccrueError> {
        queries::leases::release(self.db()?, key, holder).await
    }

    // --- Feedback ---

    async fn insert_feedback_observation(
        &self,
        observation: &FeedbackObservation,
    ) -> Result<bool, AccrueError> {
        queries::feedback::insert_observation(self.db()?, observation).await
    }

    async fn list_feedback_observations(
        &self,
        deliverable_id: &str,
    ) -> Result<Vec<FeedbackObservation>, AccrueError> {
        queries::feedback::list_observations(self.db()?, deliverable_id).await
    }

    async fn get_feedback_observation(
        &self,
        version_id: &str,
    ) -> Result<Option<FeedbackObservation>, AccrueError> {
        queries::feedback::get_observation(self.db()?, version_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_config(dir: &std::path::Path) -> StorageConfig {
        StorageConfig {
            database_path: dir.join("test.db").to_str().unwrap().to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn uninitialized_storage_reports_error() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(test_config(dir.path()));
        let err = storage.get_user("u1").await.unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn double_initialize_fails() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(test_config(dir.path()));
        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_and_shutdown() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(test_config(dir.path()));
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
        storage.shutdown().await.unwrap();
    }
}
