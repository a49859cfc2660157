// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./envx.toml` > `~/.config/envx/envx.toml` > `/etc/envx/envx.toml`
//! with environment variable overrides via `ENVX_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and unboxed

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::EnvxConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/envx/envx.toml";

/// Project-local configuration file, relative to the working directory.
pub const LOCAL_CONFIG_FILE: &str = "envx.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/envx/envx.toml` (system-wide)
/// 3. `~/.config/envx/envx.toml` (user XDG config)
/// 4. `./envx.toml` (project directory)
/// 5. `ENVX_*` environment variables
pub fn load_config() -> Result<EnvxConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<EnvxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EnvxConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<EnvxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EnvxConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(EnvxConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// `~/.config/envx/envx.toml`, if the platform has a config directory.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("envx/envx.toml"))
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because field names contain
/// underscores: `ENVX_KDF_MEMORY_KB` must map to `kdf.memory_kb`, not
/// `kdf.memory.kb`. `ENVX_PASSWORD` is consumed by the passphrase prompt and is
/// not a configuration key.
fn env_provider() -> Env {
    Env::prefixed("ENVX_")
        .ignore(&["password"])
        .map(|key| map_env_key(key.as_str()).into())
}

/// Top-level sections an `ENVX_<SECTION>_<FIELD>` variable can target.
const SECTIONS: &[&str] = &["key", "files", "kdf", "log"];

/// Map a lowercased, prefix-stripped env var name onto a dotted config path.
///
/// Only the first underscore after a known section name becomes a dot:
/// `kdf_scrypt_log_n` -> `kdf.scrypt_log_n`.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(field) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{field}");
        }
    }
    key.to_string()
}
