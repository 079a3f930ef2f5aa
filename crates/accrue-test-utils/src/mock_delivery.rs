// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock delivery adapter that captures what would have been sent.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use accrue_core::types::{AdapterType, HealthStatus};
use accrue_core::{
    AccrueError, Deliverable, DeliverableVersion, DeliveryAdapter, Destination, PluginAdapter,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRecord {
    pub destination: Destination,
    pub deliverable_id: String,
    pub version_id: String,
    pub content: String,
}

#[derive(Clone, Default)]
pub struct MockDelivery {
    delivered: Arc<Mutex<Vec<DeliveryRecord>>>,
    failures: Arc<Mutex<usize>>,
}

impl MockDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` deliveries fail.
    pub async fn fail_next(&self, n: usize) {
        *self.failures.lock().await += n;
    }

    pub async fn delivered(&self) -> Vec<DeliveryRecord> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockDelivery {
    fn name(&self) -> &str {
        "mock-delivery"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Delivery
    }

    async fn health_check(&self) -> Result<HealthStatus, AccrueError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AccrueError> {
        Ok(())
    }
}

#[async_trait]
impl DeliveryAdapter for MockDelivery {
    async fn deliver(
        &self,
        destination: &Destination,
        deliverable: &Deliverable,
        version: &DeliverableVersion,
        content: &str,
    ) -> Result<(), AccrueError> {
        {
            let mut failures = self.failures.lock().await;
            if *failures > 0 {
                *failures -= 1;
                return Err(AccrueError::Internal(format!(
                    "delivery to {} unavailable",
                    destination.channel
                )));
            }
        }
        self.delivered.lock().await.push(DeliveryRecord {
            destination: destination.clone(),
            deliverable_id: deliverable.id.clone(),
            version_id: version.id.clone(),
            content: content.to_string(),
        });
        Ok(())
    }
}
