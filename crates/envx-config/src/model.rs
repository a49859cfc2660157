// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for envx.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a typo in `envx.toml`
//! is reported instead of silently falling back to a default.

use serde::{Deserialize, Serialize};

/// Top-level envx configuration.
///
/// Every section is optional and defaults to the values the CLI uses when
/// no configuration file exists.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvxConfig {
    /// Where the raw symmetric key lives.
    #[serde(default)]
    pub key: KeyConfig,

    /// Default plaintext and container paths.
    #[serde(default)]
    pub files: FilesConfig,

    /// Password-based key derivation parameters.
    #[serde(default)]
    pub kdf: KdfConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Key file location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeyConfig {
    /// Path to the 32-byte key file.
    #[serde(default = "default_key_path")]
    pub path: String,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            path: default_key_path(),
        }
    }
}

fn default_key_path() -> String {
    ".envx.key".to_string()
}

/// Input and output files for encrypt/decrypt.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FilesConfig {
    /// Plaintext `.env` file read by `encrypt` and written by `decrypt`.
    #[serde(default = "default_input")]
    pub input: String,

    /// Encrypted container written by `encrypt` and read by `decrypt`.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
        }
    }
}

fn default_input() -> String {
    ".env".to_string()
}

fn default_output() -> String {
    ".env.envx".to_string()
}

/// Which password hashing function derives keys in password mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfAlgorithmConfig {
    #[default]
    Argon2id,
    Scrypt,
}

/// Key derivation parameters (Argon2id primary, scrypt fallback).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KdfConfig {
    /// Algorithm used by `init --password` (default: argon2id).
    #[serde(default)]
    pub algorithm: KdfAlgorithmConfig,

    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB).
    #[serde(default = "default_memory_kb")]
    pub memory_kb: u32,

    /// Argon2id time cost (default: 3).
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Argon2id lanes (default: 1).
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,

    /// scrypt cost as log2(N) (default: 15, i.e. N = 32768).
    #[serde(default = "default_scrypt_log_n")]
    pub scrypt_log_n: u8,

    /// scrypt block size (default: 8).
    #[serde(default = "default_scrypt_r")]
    pub scrypt_r: u32,

    /// scrypt parallelization (default: 1).
    #[serde(default = "default_scrypt_p")]
    pub scrypt_p: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            algorithm: KdfAlgorithmConfig::default(),
            memory_kb: default_memory_kb(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
            scrypt_log_n: default_scrypt_log_n(),
            scrypt_r: default_scrypt_r(),
            scrypt_p: default_scrypt_p(),
        }
    }
}

fn default_memory_kb() -> u32 {
    65536
}

fn default_iterations() -> u32 {
    3
}

fn default_parallelism() -> u32 {
    1
}

fn default_scrypt_log_n() -> u8 {
    15
}

fn default_scrypt_r() -> u32 {
    8
}

fn default_scrypt_p() -> u32 {
    1
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
