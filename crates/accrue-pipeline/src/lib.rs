// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deliverable generation and the version/governance state machine.

pub mod governance;
pub mod pipeline;
pub mod templates;
pub mod validation;

pub use governance::{Governance, is_allowed};
pub use pipeline::{GenerationPipeline, RunReport, run_lease_key};
pub use templates::instruction_prompt;
pub use validation::{OutputBounds, bounds_for, validate_output};
