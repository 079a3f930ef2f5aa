// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Accrue context pipeline.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and diagnostic
//! error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use accrue_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Database: {}", config.storage.database_path);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::AccrueConfig;

use std::path::Path;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid `AccrueConfig` or a list of diagnostic errors.
pub fn load_and_validate() -> Result<AccrueConfig, Vec<ConfigError>> {
    finish(loader::load_config(), || {
        loader::search_paths()
            .iter()
            .filter_map(|path| read_source(path))
            .collect()
    })
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<AccrueConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Load configuration from a specific TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<AccrueConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![diagnostic::TomlSource::new("<inline>", toml_content)]
    })
}

/// Sources are only read back when extraction failed and spans are needed.
fn finish(
    extracted: Result<AccrueConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<diagnostic::TomlSource>,
) -> Result<AccrueConfig, Vec<ConfigError>> {
    let config = extracted.map_err(|err| diagnostic::from_figment(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

fn read_source(path: &Path) -> Option<diagnostic::TomlSource> {
    let content = std::fs::read_to_string(path).ok()?;
    Some(diagnostic::TomlSource::new(path.display().to_string(), content))
}
