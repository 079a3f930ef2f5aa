// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as positive timeouts, ordered ratios, and parseable addresses.

use crate::diagnostic::ConfigError;
use crate::model::AccrueConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &AccrueConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.service.name.trim().is_empty() {
        fail("service.name must not be empty".to_string());
    }

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        fail(format!(
            "service.log_level `{}` must be one of {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    for (key, value) in [
        ("service.tick_interval_secs", config.service.tick_interval_secs),
        ("sync.fetch_timeout_secs", config.sync.fetch_timeout_secs),
        ("sync.lease_ttl_secs", config.sync.lease_ttl_secs),
        ("context.url_fetch_timeout_secs", config.context.url_fetch_timeout_secs),
        ("generation.timeout_secs", config.generation.timeout_secs),
        ("generation.lease_ttl_secs", config.generation.lease_ttl_secs),
        ("generation.stuck_after_secs", config.generation.stuck_after_secs),
    ] {
        if value == 0 {
            fail(format!("{key} must be positive"));
        }
    }

    // A lease shorter than the bounded operation could expire mid-flight.
    if config.sync.lease_ttl_secs < config.sync.fetch_timeout_secs {
        fail(format!(
            "sync.lease_ttl_secs ({}) must be at least sync.fetch_timeout_secs ({})",
            config.sync.lease_ttl_secs, config.sync.fetch_timeout_secs
        ));
    }
    if config.generation.lease_ttl_secs < config.generation.timeout_secs {
        fail(format!(
            "generation.lease_ttl_secs ({}) must be at least generation.timeout_secs ({})",
            config.generation.lease_ttl_secs, config.generation.timeout_secs
        ));
    }
    if config.generation.stuck_after_secs < config.generation.timeout_secs {
        fail(format!(
            "generation.stuck_after_secs ({}) must be at least generation.timeout_secs ({})",
            config.generation.stuck_after_secs, config.generation.timeout_secs
        ));
    }

    if !config.sync.stale_multiplier.is_finite() || config.sync.stale_multiplier < 1.0 {
        fail(format!(
            "sync.stale_multiplier must be at least 1.0, got {}",
            config.sync.stale_multiplier
        ));
    }

    if config.sync.max_concurrent_syncs == 0 {
        fail("sync.max_concurrent_syncs must be at least 1".to_string());
    }

    if config.context.max_payload_chars == 0 {
        fail("context.max_payload_chars must be positive".to_string());
    }
    if config.context.max_items_per_source == 0 {
        fail("context.max_items_per_source must be positive".to_string());
    }
    if config.context.recent_window_days == 0 {
        fail("context.recent_window_days must be positive".to_string());
    }
    if config.context.retention_days < config.context.recent_window_days {
        fail(format!(
            "context.retention_days ({}) must be at least context.recent_window_days ({})",
            config.context.retention_days, config.context.recent_window_days
        ));
    }
    if config.context.max_url_bytes == 0 {
        fail("context.max_url_bytes must be positive".to_string());
    }

    for (name, tier) in [
        ("free", &config.tiers.free),
        ("starter", &config.tiers.starter),
        ("pro", &config.tiers.pro),
        ("business", &config.tiers.business),
    ] {
        if tier.max_resources_per_platform == Some(0) {
            fail(format!(
                "tiers.{name}.max_resources_per_platform must be at least 1"
            ));
        }
    }

    if config.feedback.min_consecutive < 1 {
        fail("feedback.min_consecutive must be at least 1".to_string());
    }
    let (shorten, lengthen) = (config.feedback.shorten_ratio, config.feedback.lengthen_ratio);
    if !(shorten > 0.0 && shorten < 1.0) {
        fail(format!(
            "feedback.shorten_ratio must be between 0 and 1 exclusive, got {shorten}"
        ));
    }
    if !(lengthen > 1.0 && lengthen.is_finite()) {
        fail(format!("feedback.lengthen_ratio must be above 1, got {lengthen}"));
    }

    if config.anthropic.max_tokens == 0 {
        fail("anthropic.max_tokens must be positive".to_string());
    }
    if !config.anthropic.base_url.starts_with("http://")
        && !config.anthropic.base_url.starts_with("https://")
    {
        fail(format!(
            "anthropic.base_url `{}` must start with http:// or https://",
            config.anthropic.base_url
        ));
    }

    if config.metrics.enabled
        && config
            .metrics
            .listen_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        fail(format!(
            "metrics.listen_address `{}` is not a valid socket address",
            config.metrics.listen_address
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&AccrueConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = AccrueConfig::default();
        config.storage.database_path = "  ".to_string();
        config.sync.stale_multiplier = 0.5;
        config.generation.timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert!(messages.iter().any(|m| m.contains("storage.database_path")));
        assert!(messages.iter().any(|m| m.contains("stale_multiplier")));
        assert!(messages.iter().any(|m| m.contains("generation.timeout_secs must be positive")));
    }

    #[test]
    fn ratios_must_bracket_one() {
        let mut config = AccrueConfig::default();
        config.feedback.shorten_ratio = 1.1;
        config.feedback.lengthen_ratio = 0.9;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn zero_tier_cap_is_rejected() {
        let mut config = AccrueConfig::default();
        config.tiers.pro.max_resources_per_platform = Some(0);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("tiers.pro"));
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = AccrueConfig::default();
        config.metrics.listen_address = "not an address".to_string();
        assert!(validate_config(&config).is_ok());
        config.metrics.enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
