// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for integration tests.
//!
//! `TestHarness` holds a temp SQLite database, every mock adapter and the
//! configuration. Component crates build their own services from these parts.

use std::sync::Arc;

use accrue_config::model::{AccrueConfig, StorageConfig};
use accrue_core::{
    AccrueError, DiscoveredResource, PlanTier, Platform, Resource, ResourceKey, SelectionChange,
    StorageAdapter, User,
};
use accrue_storage::SqliteStorage;
use chrono::{DateTime, TimeZone, Utc};

use crate::mock_connector::{MockConnector, discovered};
use crate::mock_delivery::MockDelivery;
use crate::mock_fetcher::MockFetcher;
use crate::mock_generator::MockGenerator;

/// Fixed reference instant for deterministic tests: 2026-03-02 09:00 UTC.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    users: Vec<(String, PlanTier)>,
    config: AccrueConfig,
    responses: Vec<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            users: Vec::new(),
            config: AccrueConfig::default(),
            responses: Vec::new(),
        }
    }

    /// Adds a user on `tier`.
    pub fn with_user(mut self, user_id: &str, tier: PlanTier) -> Self {
        self.users.push((user_id.to_string(), tier));
        self
    }

    /// Replaces the configuration. The storage section is always pointed at
    /// the temp database.
    pub fn with_config(mut self, config: AccrueConfig) -> Self {
        self.config = config;
        self
    }

    /// Edits the configuration in place.
    pub fn configure(mut self, f: impl FnOnce(&mut AccrueConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    pub async fn build(self) -> Result<TestHarness, AccrueError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| AccrueError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage = Arc::new(storage);

        for (id, tier) in self.users {
            storage
                .upsert_user(&User {
                    id,
                    tier,
                    created_at: t0(),
                })
                .await?;
        }

        Ok(TestHarness {
            storage,
            connector: Arc::new(MockConnector::new()),
            generator: Arc::new(MockGenerator::with_responses(self.responses)),
            delivery: Arc::new(MockDelivery::new()),
            fetcher: Arc::new(MockFetcher::new()),
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub connector: Arc<MockConnector>,
    pub generator: Arc<MockGenerator>,
    pub delivery: Arc<MockDelivery>,
    pub fetcher: Arc<MockFetcher>,
    pub config: AccrueConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The storage as the trait object components take.
    pub fn storage(&self) -> Arc<dyn StorageAdapter> {
        self.storage.clone()
    }

    /// Records a resource as discovered and, if `selected_at` is set,
    /// selects it at that instant. The connector landscape is left alone.
    pub async fn seed_resource(
        &self,
        user_id: &str,
        platform: Platform,
        resource_id: &str,
        selected_at: Option<DateTime<Utc>>,
    ) -> Result<Resource, AccrueError> {
        let entry: DiscoveredResource = discovered(resource_id, resource_id);
        self.storage
            .upsert_discovered_resource(user_id, platform, &entry, t0())
            .await?;
        let key = ResourceKey::new(user_id, platform, resource_id);
        if let Some(at) = selected_at {
            self.storage
                .update_resource_selection(&[SelectionChange {
                    key: key.clone(),
                    selected: true,
                    excluded: false,
                    selected_at: Some(at),
                }])
                .await?;
        }
        self.storage
            .get_resource(&key)
            .await?
            .ok_or_else(|| AccrueError::NotFound {
                entity: "resource",
                id: key.to_string(),
            })
    }
}
