// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connector used when no connector directory is wired in.

use accrue_core::types::{AdapterType, HealthStatus};
use accrue_core::{
    AccrueError, ConnectorDirectory, DiscoveredResource, FetchPage, PluginAdapter, Platform,
    ResourceKey,
};
use async_trait::async_trait;

/// Lists nothing and fetches empty pages.
pub struct NullConnector;

#[async_trait]
impl PluginAdapter for NullConnector {
    fn name(&self) -> &str {
        "null-connector"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Connector
    }

    async fn health_check(&self) -> Result<HealthStatus, AccrueError> {
        Ok(HealthStatus::Degraded("no connector directory configured".into()))
    }

    async fn shutdown(&self) -> Result<(), AccrueError> {
        Ok(())
    }
}

#[async_trait]
impl ConnectorDirectory for NullConnector {
    async fn list_resources(
        &self,
        _user_id: &str,
        _platform: Platform,
    ) -> Result<Vec<DiscoveredResource>, AccrueError> {
        Ok(Vec::new())
    }

    async fn fetch_items(
        &self,
        _key: &ResourceKey,
        _cursor: Option<&str>,
    ) -> Result<FetchPage, AccrueError> {
        Ok(FetchPage::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_nothing_and_fetches_nothing() {
        let c = NullConnector;
        assert!(c.list_resources("u1", Platform::Slack).await.unwrap().is_empty());
        let key = ResourceKey::new("u1", Platform::Slack, "C1");
        let page = c.fetch_items(&key, Some("cursor")).await.unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
        assert!(matches!(
            c.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
    }
}
