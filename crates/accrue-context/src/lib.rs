// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context layer for the Accrue pipeline.
//!
//! - [`ContextStore`]: user facts, promotion and age-based expiry on top of
//!   the storage adapter.
//! - [`HttpSourceFetcher`]: bounded HTTP fetches for ad hoc URL sources.
//! - [`ContextAggregator`]: turns a deliverable's sources into one bounded,
//!   deterministic payload.

pub mod aggregator;
pub mod fetcher;
pub mod payload;
pub mod store;

pub use aggregator::ContextAggregator;
pub use fetcher::HttpSourceFetcher;
pub use payload::{ContextPayload, FailedSource};
pub use store::ContextStore;
