// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connector directory trait: the only capability the pipeline needs from
//! platform integrations.

use async_trait::async_trait;

use crate::error::AccrueError;
use crate::records::{DiscoveredResource, FetchPage, ResourceKey};
use crate::traits::adapter::PluginAdapter;
use crate::types::Platform;

/// Lists a user's syncable resources and fetches raw items from them.
///
/// Authorization is the directory's concern; callers only name a resource
/// and a cursor.
#[async_trait]
pub trait ConnectorDirectory: PluginAdapter {
    /// Landscape query: every resource the user could select on `platform`.
    async fn list_resources(
        &self,
        user_id: &str,
        platform: Platform,
    ) -> Result<Vec<DiscoveredResource>, AccrueError>;

    /// Fetches items after `cursor` (from the beginning when `None`).
    async fn fetch_items(
        &self,
        key: &ResourceKey,
        cursor: Option<&str>,
    ) -> Result<FetchPage, AccrueError>;
}
