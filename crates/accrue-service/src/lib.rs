// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The operation surface the dashboard and CLI call.
//!
//! [`AccrueService`] wires the sync scheduler, context store, generation
//! pipeline, governance and feedback loop over one storage adapter and
//! exposes each user-facing operation as an async method.

pub mod clock;
pub mod service;

pub use clock::{Clock, SystemClock};
pub use service::{AccrueService, AccrueServiceBuilder, NewDeliverable, SyncTarget};
