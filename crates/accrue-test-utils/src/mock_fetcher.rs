// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock URL fetcher serving canned documents.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use accrue_core::types::{AdapterType, HealthStatus};
use accrue_core::{AccrueError, FetchedDocument, PluginAdapter, SourceFetcher};

/// Unknown URLs fail with a source fetch error.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<Mutex<HashMap<String, Result<FetchedDocument, String>>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_page(&self, url: &str, title: Option<&str>, text: &str) {
        self.pages.lock().await.insert(
            url.to_string(),
            Ok(FetchedDocument {
                title: title.map(str::to_string),
                text: text.to_string(),
            }),
        );
    }

    pub async fn add_failure(&self, url: &str, message: &str) {
        self.pages
            .lock()
            .await
            .insert(url.to_string(), Err(message.to_string()));
    }
}

#[async_trait]
impl PluginAdapter for MockFetcher {
    fn name(&self) -> &str {
        "mock-fetcher"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SourceFetcher
    }

    async fn health_check(&self) -> Result<HealthStatus, AccrueError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AccrueError> {
        Ok(())
    }
}

#[async_trait]
impl SourceFetcher for MockFetcher {
    async fn fetch_url(&self, url: &str) -> Result<FetchedDocument, AccrueError> {
        match self.pages.lock().await.get(url) {
            Some(Ok(doc)) => Ok(doc.clone()),
            Some(Err(message)) => Err(AccrueError::SourceFetch {
                source_id: url.to_string(),
                message: message.clone(),
            }),
            None => Err(AccrueError::SourceFetch {
                source_id: url.to_string(),
                message: "HTTP 404".to_string(),
            }),
        }
    }
}
