// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Source fetcher trait for ad hoc URL sources.

use async_trait::async_trait;

use crate::error::AccrueError;
use crate::traits::adapter::PluginAdapter;

/// A fetched external document reduced to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    pub title: Option<String>,
    pub text: String,
}

/// Fetches external URLs named directly by a deliverable.
#[async_trait]
pub trait SourceFetcher: PluginAdapter {
    async fn fetch_url(&self, url: &str) -> Result<FetchedDocument, AccrueError>;
}
