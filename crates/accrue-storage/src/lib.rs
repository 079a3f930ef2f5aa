// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Accrue context pipeline.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed queries for users,
//! resources, context items, deliverables, versions, work records, leases
//! and feedback observations.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;
mod rows;

pub use adapter::SqliteStorage;
pub use database::Database;
