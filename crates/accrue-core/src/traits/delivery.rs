// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery adapter trait for pushing approved content to a destination.

use async_trait::async_trait;

use crate::error::AccrueError;
use crate::records::{Deliverable, DeliverableVersion};
use crate::traits::adapter::PluginAdapter;
use crate::types::Destination;

#[async_trait]
pub trait DeliveryAdapter: PluginAdapter {
    /// Delivers `content` (the version's final content) to `destination`.
    async fn deliver(
        &self,
        destination: &Destination,
        deliverable: &Deliverable,
        version: &DeliverableVersion,
        content: &str,
    ) -> Result<(), AccrueError>;
}
