// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Accrue integration tests.
//!
//! Provides mock adapters and a temp-database harness for fast,
//! deterministic tests without external services.
//!
//! # Components
//!
//! - [`MockConnector`] - scripted connector directory with failures and latency
//! - [`MockGenerator`] - queued drafts, errors, delay and a concurrency gate
//! - [`MockDelivery`] - captures deliveries, can be told to fail
//! - [`MockFetcher`] - canned URL documents
//! - [`TestHarness`] - temp SQLite storage plus every mock

pub mod harness;
pub mod mock_connector;
pub mod mock_delivery;
pub mod mock_fetcher;
pub mod mock_generator;

pub use harness::{TestHarness, TestHarnessBuilder, t0};
pub use mock_connector::{FetchCall, MockConnector, discovered};
pub use mock_delivery::{DeliveryRecord, MockDelivery};
pub use mock_fetcher::MockFetcher;
pub use mock_generator::MockGenerator;
