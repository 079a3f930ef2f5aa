// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Accrue context pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use accrue_core::{Platform, SyncFrequency};
use serde::{Deserialize, Serialize};

/// Top-level Accrue configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccrueConfig {
    /// Service identity and runner settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Sync scheduler settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Per-tier policy overrides.
    #[serde(default)]
    pub tiers: TiersConfig,

    /// Context store and aggregator settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// Generation pipeline settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Governance settings.
    #[serde(default)]
    pub governance: GovernanceConfig,

    /// Feedback loop settings.
    #[serde(default)]
    pub feedback: FeedbackConfig,

    /// Anthropic API settings for the reference generator.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Service identity and runner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Instance name, reported in startup logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between two cron runner ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            tick_interval_secs: default_tick_interval(),
        }
    }
}

fn default_service_name() -> String {
    "accrue".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tick_interval() -> u64 {
    60
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for better concurrent read performance.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("accrue").join("accrue.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("accrue.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Sync scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Upper bound on one connector fetch.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Lifetime of a per-resource sync lease.
    #[serde(default = "default_sync_lease_ttl")]
    pub lease_ttl_secs: u64,

    /// After a failed attempt, scheduled syncs wait this long before retrying.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,

    /// Multiple of the cadence interval after which content is stale.
    #[serde(default = "default_stale_multiplier")]
    pub stale_multiplier: f64,

    /// Maximum syncs in flight during one scheduler pass.
    #[serde(default = "default_max_concurrent_syncs")]
    pub max_concurrent_syncs: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout(),
            lease_ttl_secs: default_sync_lease_ttl(),
            retry_backoff_secs: default_retry_backoff(),
            stale_multiplier: default_stale_multiplier(),
            max_concurrent_syncs: default_max_concurrent_syncs(),
        }
    }
}

impl SyncConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_sync_lease_ttl() -> u64 {
    120
}

fn default_retry_backoff() -> u64 {
    900
}

fn default_stale_multiplier() -> f64 {
    2.0
}

fn default_max_concurrent_syncs() -> usize {
    8
}

/// Overrides for one plan tier. Unset fields keep the built-in policy.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TierOverride {
    #[serde(default)]
    pub max_resources_per_platform: Option<usize>,

    #[serde(default)]
    pub sync_frequency: Option<SyncFrequency>,
}

/// Tier policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TiersConfig {
    /// Platforms read directly from the source on every access.
    #[serde(default = "default_live_query_platforms")]
    pub live_query_platforms: Vec<Platform>,

    #[serde(default)]
    pub free: TierOverride,

    #[serde(default)]
    pub starter: TierOverride,

    #[serde(default)]
    pub pro: TierOverride,

    #[serde(default)]
    pub business: TierOverride,
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            live_query_platforms: default_live_query_platforms(),
            free: TierOverride::default(),
            starter: TierOverride::default(),
            pro: TierOverride::default(),
            business: TierOverride::default(),
        }
    }
}

fn default_live_query_platforms() -> Vec<Platform> {
    vec![Platform::Calendar]
}

/// Context store and aggregator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Window used for a deliverable that has never run.
    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: u32,

    /// Maximum characters in an aggregated payload.
    #[serde(default = "default_max_payload_chars")]
    pub max_payload_chars: usize,

    /// Maximum items read from one resource per aggregation.
    #[serde(default = "default_max_items_per_source")]
    pub max_items_per_source: usize,

    /// Age after which non-retained items are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    #[serde(default = "default_url_fetch_timeout")]
    pub url_fetch_timeout_secs: u64,

    /// Response bodies beyond this size are cut off.
    #[serde(default = "default_max_url_bytes")]
    pub max_url_bytes: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            recent_window_days: default_recent_window_days(),
            max_payload_chars: default_max_payload_chars(),
            max_items_per_source: default_max_items_per_source(),
            retention_days: default_retention_days(),
            url_fetch_timeout_secs: default_url_fetch_timeout(),
            max_url_bytes: default_max_url_bytes(),
        }
    }
}

fn default_recent_window_days() -> u32 {
    7
}

fn default_max_payload_chars() -> usize {
    48_000
}

fn default_max_items_per_source() -> usize {
    200
}

fn default_retention_days() -> u32 {
    90
}

fn default_url_fetch_timeout() -> u64 {
    15
}

fn default_max_url_bytes() -> usize {
    262_144
}

/// Generation pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Upper bound on one draft generator call.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Lifetime of a per-deliverable run lease.
    #[serde(default = "default_generation_lease_ttl")]
    pub lease_ttl_secs: u64,

    /// Versions generating longer than this are failed as abandoned.
    #[serde(default = "default_stuck_after")]
    pub stuck_after_secs: u64,

    /// Retry a failed scheduled run once on the next tick instead of
    /// waiting for the next occurrence.
    #[serde(default)]
    pub auto_retry_failed: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_generation_timeout(),
            lease_ttl_secs: default_generation_lease_ttl(),
            stuck_after_secs: default_stuck_after(),
            auto_retry_failed: false,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_generation_timeout() -> u64 {
    120
}

fn default_generation_lease_ttl() -> u64 {
    300
}

fn default_stuck_after() -> u64 {
    900
}

/// Governance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GovernanceConfig {
    /// Semi-auto versions approve themselves this long after staging.
    #[serde(default = "default_semi_auto_window")]
    pub semi_auto_window_secs: u64,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            semi_auto_window_secs: default_semi_auto_window(),
        }
    }
}

fn default_semi_auto_window() -> u64 {
    86_400
}

/// Feedback loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackConfig {
    /// Consecutive versions sharing an edit category before it is learned.
    #[serde(default = "default_min_consecutive")]
    pub min_consecutive: usize,

    /// Final/draft length ratio at or below which an edit counts as shortening.
    #[serde(default = "default_shorten_ratio")]
    pub shorten_ratio: f64,

    /// Final/draft length ratio at or above which an edit counts as lengthening.
    #[serde(default = "default_lengthen_ratio")]
    pub lengthen_ratio: f64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            min_consecutive: default_min_consecutive(),
            shorten_ratio: default_shorten_ratio(),
            lengthen_ratio: default_lengthen_ratio(),
        }
    }
}

fn default_min_consecutive() -> usize {
    2
}

fn default_shorten_ratio() -> f64 {
    0.8
}

fn default_lengthen_ratio() -> f64 {
    1.2
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// API key; falls back to the `ANTHROPIC_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
            base_url: default_base_url(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

/// Prometheus exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_address")]
    pub listen_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: default_metrics_address(),
        }
    }
}

fn default_metrics_address() -> String {
    "127.0.0.1:9464".to_string()
}

impl AccrueConfig {
    /// A copy safe to print: secrets replaced by a marker.
    pub fn redacted(&self) -> AccrueConfig {
        let mut copy = self.clone();
        if copy.anthropic.api_key.is_some() {
            copy.anthropic.api_key = Some("<redacted>".to_string());
        }
        copy
    }
}
