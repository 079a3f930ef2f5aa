// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod connector;
pub mod delivery;
pub mod generator;
pub mod source;
pub mod storage;

pub use adapter::PluginAdapter;
pub use connector::ConnectorDirectory;
pub use delivery::DeliveryAdapter;
pub use generator::{DraftGenerator, DraftRequest};
pub use source::{FetchedDocument, SourceFetcher};
pub use storage::StorageAdapter;
