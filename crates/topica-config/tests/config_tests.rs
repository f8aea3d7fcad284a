// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Topica configuration system.

use topica_config::diagnostic::ConfigError;
use topica_config::model::TopicaConfig;
use topica_config::{load_and_validate_str, load_config, load_config_from_str};

#[test]
fn defaults_match_memory_engine_constants() {
    let config = TopicaConfig::default();
    assert_eq!(config.memory.shift_similarity_threshold, 0.45);
    assert_eq!(config.memory.min_exchanges_for_shift, 3);
    assert_eq!(config.memory.max_context_chars, 25_000);
    assert_eq!(config.memory.short_term_threshold, 0.75);
    assert_eq!(config.memory.short_term_max_k, 2);
    assert_eq!(config.memory.long_term_threshold, 0.5);
    assert_eq!(config.memory.long_term_max_k, 3);
    assert_eq!(config.memory.fact_importance_threshold, 7);
    assert_eq!(config.provider.max_attempts, 3);
    assert_eq!(config.agent.name, "topica");
}

#[test]
fn valid_toml_deserializes_into_topica_config() {
    let toml = r#"
[agent]
name = "test-agent"
log_level = "debug"

[memory]
short_term_threshold = 0.8
long_term_max_k = 5
fact_capacity = 20

[provider]
base_url = "http://localhost:8080/v1"
chat_model = "local-model"
max_attempts = 2

[storage]
data_dir = "/tmp/topica-test"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "test-agent");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.memory.short_term_threshold, 0.8);
    assert_eq!(config.memory.long_term_max_k, 5);
    assert_eq!(config.memory.fact_capacity, 20);
    // Untouched keys keep their defaults.
    assert_eq!(config.memory.short_term_max_k, 2);
    assert_eq!(config.provider.base_url, "http://localhost:8080/v1");
    assert_eq!(config.provider.chat_model, "local-model");
    assert_eq!(config.provider.max_attempts, 2);
    assert_eq!(config.storage.data_dir, "/tmp/topica-test");
}

#[test]
fn unknown_field_in_memory_produces_suggestion() {
    let toml = r#"
[memory]
short_term_treshold = 0.8
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "short_term_treshold");
            assert_eq!(suggestion.as_deref(), Some("short_term_threshold"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[memory]
fact_capacity = "lots"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject wrong type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "expected InvalidType, got {errors:?}"
    );
}

#[test]
fn out_of_range_values_are_all_collected() {
    let toml = r#"
[memory]
short_term_threshold = 1.5
long_term_max_k = 0
fact_importance_threshold = 11

[provider]
max_attempts = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("validation should fail");
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    assert_eq!(messages.len(), 4, "got {messages:?}");
    assert!(messages.iter().any(|m| m.contains("memory.short_term_threshold")));
    assert!(messages.iter().any(|m| m.contains("memory.long_term_max_k")));
    assert!(messages.iter().any(|m| m.contains("memory.fact_importance_threshold")));
    assert!(messages.iter().any(|m| m.contains("provider.max_attempts")));
}

#[test]
fn default_config_is_valid() {
    let config = load_and_validate_str("").expect("defaults should validate");
    assert_eq!(config.memory.fact_capacity, 100);
}

#[test]
fn env_overrides_map_section_prefix_only() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("topica.toml", "[agent]\nname = \"from-file\"\n")?;
        jail.set_env("TOPICA_MEMORY_FACT_CAPACITY", "12");
        jail.set_env("TOPICA_PROVIDER_CHAT_MODEL", "env-model");

        let config = load_config()?;
        assert_eq!(config.agent.name, "from-file");
        assert_eq!(config.memory.fact_capacity, 12);
        assert_eq!(config.provider.chat_model, "env-model");
        Ok(())
    });
}

#[test]
fn effective_config_renders_as_loadable_toml() {
    let mut config = TopicaConfig::default();
    config.memory.long_term_max_k = 4;
    let rendered = topica_config::to_toml_string(&config).expect("config should render");
    assert!(rendered.contains("[memory]"));

    let reloaded = load_config_from_str(&rendered).expect("rendered TOML should load");
    assert_eq!(reloaded.memory.long_term_max_k, 4);
    assert_eq!(reloaded.provider.api_key, None);
}
