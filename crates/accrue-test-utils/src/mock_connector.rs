// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock connector directory with scripted fetch results.
//!
//! Each resource has its own FIFO queue of outcomes. An empty queue yields an
//! empty, complete page that keeps the cursor.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use accrue_core::types::{AdapterType, HealthStatus};
use accrue_core::{
    AccrueError, ConnectorDirectory, DiscoveredResource, FetchPage, PluginAdapter, Platform,
    ResourceKey,
};

/// One recorded `fetch_items` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub key: ResourceKey,
    pub cursor: Option<String>,
}

#[derive(Default)]
struct State {
    landscapes: HashMap<(String, Platform), Vec<DiscoveredResource>>,
    scripts: HashMap<ResourceKey, VecDeque<Result<FetchPage, String>>>,
    latency: Option<Duration>,
    calls: Vec<FetchCall>,
}

#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<State>>,
}

/// Builds a landscape entry with sensible defaults.
pub fn discovered(resource_id: &str, name: &str) -> DiscoveredResource {
    DiscoveredResource {
        resource_id: resource_id.to_string(),
        resource_type: "channel".to_string(),
        name: name.to_string(),
        is_private: false,
        metadata: None,
    }
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets what the landscape query returns for one user and platform.
    pub async fn set_landscape(
        &self,
        user_id: &str,
        platform: Platform,
        resources: Vec<DiscoveredResource>,
    ) {
        self.state
            .lock()
            .await
            .landscapes
            .insert((user_id.to_string(), platform), resources);
    }

    /// Queues a successful page for `key`.
    pub async fn push_page(&self, key: &ResourceKey, page: FetchPage) {
        self.queue(key, Ok(page)).await;
    }

    /// Queues a failed fetch for `key`.
    pub async fn push_failure(&self, key: &ResourceKey, message: &str) {
        self.queue(key, Err(message.to_string())).await;
    }

    async fn queue(&self, key: &ResourceKey, outcome: Result<FetchPage, String>) {
        self.state
            .lock()
            .await
            .scripts
            .entry(key.clone())
            .or_default()
            .push_back(outcome);
    }

    /// Every fetch then sleeps this long before answering.
    pub async fn set_latency(&self, latency: Duration) {
        self.state.lock().await.latency = Some(latency);
    }

    pub async fn calls(&self) -> Vec<FetchCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self, key: &ResourceKey) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| &c.key == key)
            .count()
    }
}

#[async_trait]
impl PluginAdapter for MockConnector {
    fn name(&self) -> &str {
        "mock-connector"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Connector
    }

    async fn health_check(&self) -> Result<HealthStatus, AccrueError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AccrueError> {
        Ok(())
    }
}

#[async_trait]
impl ConnectorDirectory for MockConnector {
    async fn list_resources(
        &self,
        user_id: &str,
        platform: Platform,
    ) -> Result<Vec<DiscoveredResource>, AccrueError> {
        Ok(self
            .state
            .lock()
            .await
            .landscapes
            .get(&(user_id.to_string(), platform))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_items(
        &self,
        key: &ResourceKey,
        cursor: Option<&str>,
    ) -> Result<FetchPage, AccrueError> {
        let (latency, outcome) = {
            let mut state = self.state.lock().await;
            state.calls.push(FetchCall {
                key: key.clone(),
                cursor: cursor.map(str::to_string),
            });
            let outcome = state
                .scripts
                .get_mut(key)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Ok(FetchPage::default()));
            (state.latency, outcome)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        outcome.map_err(|message| AccrueError::SourceFetch {
            source_id: key.to_string(),
            message,
        })
    }
}
