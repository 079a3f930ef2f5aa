// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Accrue configuration system.

use accrue_config::diagnostic::ConfigError;
use accrue_config::model::AccrueConfig;
use accrue_config::{load_and_validate_str, load_config_from_path, load_config_from_str};
use accrue_core::{Platform, SyncFrequency};

#[test]
fn valid_toml_deserializes_into_accrue_config() {
    let toml = r#"
[service]
name = "accrue-test"
log_level = "debug"
tick_interval_secs = 10

[storage]
database_path = "/tmp/accrue-test.db"
wal_mode = false

[sync]
fetch_timeout_secs = 5
lease_ttl_secs = 60
stale_multiplier = 3.0

[tiers]
live_query_platforms = ["calendar", "notion"]

[tiers.pro]
max_resources_per_platform = 30
sync_frequency = "hourly"

[context]
max_payload_chars = 1000

[generation]
timeout_secs = 30
auto_retry_failed = true

[governance]
semi_auto_window_secs = 600

[anthropic]
api_key = "sk-ant-test"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "accrue-test");
    assert_eq!(config.service.tick_interval_secs, 10);
    assert_eq!(config.storage.database_path, "/tmp/accrue-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.sync.fetch_timeout_secs, 5);
    assert_eq!(config.sync.stale_multiplier, 3.0);
    assert_eq!(config.sync.retry_backoff_secs, 900);
    assert_eq!(
        config.tiers.live_query_platforms,
        vec![Platform::Calendar, Platform::Notion]
    );
    assert_eq!(config.tiers.pro.max_resources_per_platform, Some(30));
    assert_eq!(config.tiers.pro.sync_frequency, Some(SyncFrequency::Hourly));
    assert_eq!(config.tiers.free.max_resources_per_platform, None);
    assert_eq!(config.context.max_payload_chars, 1000);
    assert_eq!(config.context.recent_window_days, 7);
    assert!(config.generation.auto_retry_failed);
    assert_eq!(config.governance.semi_auto_window_secs, 600);
    assert_eq!(config.anthropic.api_key.as_deref(), Some("sk-ant-test"));
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").unwrap();
    assert_eq!(config.service.tick_interval_secs, 60);
    assert_eq!(config.sync.lease_ttl_secs, 120);
    assert_eq!(config.sync.max_concurrent_syncs, 8);
    assert_eq!(config.context.retention_days, 90);
    assert_eq!(config.context.max_url_bytes, 262_144);
    assert_eq!(config.generation.stuck_after_secs, 900);
    assert!(!config.generation.auto_retry_failed);
    assert_eq!(config.feedback.min_consecutive, 2);
    assert_eq!(config.tiers.live_query_platforms, vec![Platform::Calendar]);
    assert!(!config.metrics.enabled);
}

#[test]
fn unknown_field_is_rejected_with_suggestion() {
    let toml = r#"
[sync]
lease_tll_secs = 10
"#;

    let errors = load_and_validate_str(toml).unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "lease_tll_secs");
            assert_eq!(suggestion.as_deref(), Some("lease_ttl_secs"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[telegram]\nbot_token = \"x\"\n").unwrap_err();
    assert!(matches!(errors[0], ConfigError::UnknownKey { .. }));
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[sync]\nfetch_timeout_secs = \"soon\"\n").unwrap_err();
    assert!(
        matches!(&errors[0], ConfigError::InvalidType { key, .. } if key.contains("fetch_timeout_secs")),
        "got {:?}",
        errors[0]
    );
}

#[test]
fn unknown_sync_frequency_is_reported() {
    let errors =
        load_and_validate_str("[tiers.free]\nsync_frequency = \"weekly\"\n").unwrap_err();
    let msg = errors[0].to_string();
    assert!(msg.contains("weekly"), "got {msg}");
}

#[test]
fn semantic_errors_are_collected() {
    let toml = r#"
[sync]
fetch_timeout_secs = 0
stale_multiplier = 0.5

[feedback]
shorten_ratio = 1.5
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(errors.len() >= 3, "got {errors:?}");
    assert!(errors.iter().all(|e| matches!(e, ConfigError::Validation { .. })));
}

#[test]
fn redacted_hides_api_key() {
    let config = load_config_from_str("[anthropic]\napi_key = \"sk-secret\"\n").unwrap();
    let redacted = config.redacted();
    assert_eq!(redacted.anthropic.api_key.as_deref(), Some("<redacted>"));
    let rendered = toml::to_string(&redacted).unwrap();
    assert!(!rendered.contains("sk-secret"));
}

#[test]
fn env_vars_override_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            "[sync]\nfetch_timeout_secs = 5\n[context]\nretention_days = 30\n",
        )?;
        jail.set_env("ACCRUE_SYNC_FETCH_TIMEOUT_SECS", "9");
        jail.set_env("ACCRUE_TIERS_PRO_MAX_RESOURCES_PER_PLATFORM", "40");

        let config: AccrueConfig =
            load_config_from_path(std::path::Path::new("custom.toml"))?;
        assert_eq!(config.sync.fetch_timeout_secs, 9);
        assert_eq!(config.context.retention_days, 30);
        assert_eq!(config.tiers.pro.max_resources_per_platform, Some(40));
        Ok(())
    });
}
