// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The periodic runner behind `accrue serve`.

pub mod runner;
pub mod schedule;

pub use runner::{CronJobs, CronRunner, TickReport};
pub use schedule::{next_occurrence, parse_schedule, scheduled_run_due};
