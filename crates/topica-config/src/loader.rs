// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./topica.toml` > `~/.config/topica/topica.toml` > `/etc/topica/topica.toml`
//! with environment variable overrides via `TOPICA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TopicaConfig;

/// Config sections addressable through `TOPICA_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &["agent", "memory", "provider", "storage"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/topica/topica.toml` (system-wide)
/// 3. `~/.config/topica/topica.toml` (user XDG config)
/// 4. `./topica.toml` (local directory)
/// 5. `TOPICA_*` environment variables
pub fn load_config() -> Result<TopicaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TopicaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TopicaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TopicaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TopicaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TopicaConfig::default()))
        .merge(Toml::file("/etc/topica/topica.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("topica/topica.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("topica.toml"))
        .merge(env_provider())
}

/// Environment provider mapping only the leading section name to a dot.
///
/// `TOPICA_MEMORY_FACT_CAPACITY` must map to `memory.fact_capacity`, not
/// `memory.fact.capacity`, so `Env::split("_")` is not usable here.
fn env_provider() -> Env {
    Env::prefixed("TOPICA_").map(|key| {
        let key_str = key.as_str();
        let mapped = ENV_SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}
