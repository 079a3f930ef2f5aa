// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per collection.
//!
//! Every function takes `&Database` and runs its statements inside a single
//! `conn.call()` closure, so each function is atomic with respect to every
//! other storage call.

pub mod deliverables;
pub mod feedback;
pub mod items;
pub mod leases;
pub mod resources;
pub mod users;
pub mod versions;
pub mod work_records;
