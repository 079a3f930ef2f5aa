// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./accrue.toml` > `~/.config/accrue/accrue.toml` > `/etc/accrue/accrue.toml`
//! with environment variable overrides via `ACCRUE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::AccrueConfig;

/// Top-level sections reachable from environment variables.
const SECTIONS: &[&str] = &[
    "service",
    "storage",
    "sync",
    "tiers",
    "context",
    "generation",
    "governance",
    "feedback",
    "anthropic",
    "metrics",
];

const TIER_NAMES: &[&str] = &["free", "starter", "pro", "business"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/accrue/accrue.toml` (system-wide)
/// 3. `~/.config/accrue/accrue.toml` (user XDG config)
/// 4. `./accrue.toml` (local directory)
/// 5. `ACCRUE_*` environment variables
pub fn load_config() -> Result<AccrueConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<AccrueConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AccrueConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AccrueConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AccrueConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    search_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(AccrueConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        )
        .merge(env_provider())
}

/// Candidate config files, lowest precedence first.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/accrue/accrue.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("accrue").join("accrue.toml"));
    }
    let local = std::env::current_dir()
        .map(|d| d.join("accrue.toml"))
        .unwrap_or_else(|_| PathBuf::from("accrue.toml"));
    paths.push(local);
    paths
}

/// Create the environment variable provider with an explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `ACCRUE_SYNC_FETCH_TIMEOUT_SECS` must map to
/// `sync.fetch_timeout_secs`, not `sync.fetch.timeout.secs`.
fn env_provider() -> Env {
    Env::prefixed("ACCRUE_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        else {
            continue;
        };
        if *section == "tiers" {
            for tier in TIER_NAMES {
                if let Some(field) = rest.strip_prefix(tier).and_then(|r| r.strip_prefix('_')) {
                    return format!("tiers.{tier}.{field}");
                }
            }
        }
        return format!("{section}.{rest}");
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("sync_fetch_timeout_secs"), "sync.fetch_timeout_secs");
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("anthropic_api_key"), "anthropic.api_key");
        assert_eq!(
            map_env_key("tiers_pro_max_resources_per_platform"),
            "tiers.pro.max_resources_per_platform"
        );
        assert_eq!(
            map_env_key("tiers_live_query_platforms"),
            "tiers.live_query_platforms"
        );
    }

    #[test]
    fn local_file_has_highest_file_precedence() {
        let paths = search_paths();
        assert_eq!(paths[0], PathBuf::from("/etc/accrue/accrue.toml"));
        assert!(paths.last().unwrap().ends_with("accrue.toml"));
        assert!(!paths.last().unwrap().starts_with("/etc"));
    }

    #[test]
    fn unmapped_keys_pass_through() {
        assert_eq!(map_env_key("unknown"), "unknown");
        assert_eq!(map_env_key("synchronous"), "synchronous");
    }
}
