// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds the service from configuration.

use std::sync::Arc;

use accrue_anthropic::AnthropicGenerator;
use accrue_config::AccrueConfig;
use accrue_context::HttpSourceFetcher;
use accrue_core::{AccrueError, StorageAdapter};
use accrue_service::AccrueService;
use accrue_storage::SqliteStorage;
use tracing::{info, warn};

use crate::null_connector::NullConnector;

/// Opens storage, runs migrations and wires every adapter.
///
/// No delivery adapter ships with the binary, so approved versions with a
/// destination are recorded as failed deliveries until one is wired in.
pub async fn build_service(config: AccrueConfig) -> Result<AccrueService, AccrueError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    info!(path = %config.storage.database_path, "storage ready");

    let generator = AnthropicGenerator::new(&config.anthropic)?;
    let fetcher = HttpSourceFetcher::new(&config.context)?;
    warn!("no connector directory configured; resources cannot be discovered");

    AccrueService::builder(config)
        .storage(Arc::new(storage))
        .connector(Arc::new(NullConnector))
        .generator(Arc::new(generator))
        .fetcher(Arc::new(fetcher))
        .build()
}
