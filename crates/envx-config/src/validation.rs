// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express: non-empty paths, KDF parameter
//! ranges the underlying primitives accept, and known log levels.

use std::ops::RangeInclusive;

use crate::diagnostic::ConfigError;
use crate::model::EnvxConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Most working memory any KDF setting may ask for: 2 GiB.
///
/// Containers carry their own KDF parameters, so the vault applies these
/// same bounds to whatever it reads back.
pub const KDF_MAX_MEMORY_BYTES: u64 = 2 << 30;

/// Argon2 time cost ceiling.
pub const KDF_MAX_ITERATIONS: u32 = 100;

/// Argon2 lane ceiling.
pub const KDF_MAX_PARALLELISM: u32 = 64;

/// Accepted scrypt cost exponents, N = 2^log_n.
pub const SCRYPT_LOG_N_RANGE: RangeInclusive<u8> = 10..=24;

pub const SCRYPT_MAX_R: u32 = 32;
pub const SCRYPT_MAX_P: u32 = 16;

/// Bytes scrypt allocates for its main buffer: 128 * r * N.
pub fn scrypt_memory_bytes(log_n: u8, r: u32) -> u128 {
    (128 * u128::from(r)) << log_n.min(64)
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &EnvxConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    for (name, value) in [
        ("key.path", &config.key.path),
        ("files.input", &config.files.input),
        ("files.output", &config.files.output),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{name} must not be empty"),
            });
        }
    }

    if config.files.input == config.files.output && !config.files.input.is_empty() {
        errors.push(ConfigError::Validation {
            message: format!(
                "files.input and files.output must differ, both are `{}`",
                config.files.input
            ),
        });
    }

    let kdf = &config.kdf;

    if kdf.parallelism < 1 {
        errors.push(ConfigError::Validation {
            message: format!("kdf.parallelism must be at least 1, got {}", kdf.parallelism),
        });
    }

    // Argon2 requires at least 8 KiB per lane.
    if u64::from(kdf.memory_kb) < 8 * u64::from(kdf.parallelism.max(1)) {
        errors.push(ConfigError::Validation {
            message: format!(
                "kdf.memory_kb must be at least 8 * kdf.parallelism ({}), got {}",
                8 * u64::from(kdf.parallelism.max(1)),
                kdf.memory_kb
            ),
        });
    }

    if u64::from(kdf.memory_kb) * 1024 > KDF_MAX_MEMORY_BYTES {
        errors.push(ConfigError::Validation {
            message: format!(
                "kdf.memory_kb must be at most {}, got {}",
                KDF_MAX_MEMORY_BYTES / 1024,
                kdf.memory_kb
            ),
        });
    }

    if kdf.parallelism > KDF_MAX_PARALLELISM {
        errors.push(ConfigError::Validation {
            message: format!(
                "kdf.parallelism must be at most {KDF_MAX_PARALLELISM}, got {}",
                kdf.parallelism
            ),
        });
    }

    if !(1..=KDF_MAX_ITERATIONS).contains(&kdf.iterations) {
        errors.push(ConfigError::Validation {
            message: format!(
                "kdf.iterations must be between 1 and {KDF_MAX_ITERATIONS}, got {}",
                kdf.iterations
            ),
        });
    }

    if !SCRYPT_LOG_N_RANGE.contains(&kdf.scrypt_log_n) {
        errors.push(ConfigError::Validation {
            message: format!(
                "kdf.scrypt_log_n must be between {} and {}, got {}",
                SCRYPT_LOG_N_RANGE.start(),
                SCRYPT_LOG_N_RANGE.end(),
                kdf.scrypt_log_n
            ),
        });
    }

    if !(1..=SCRYPT_MAX_R).contains(&kdf.scrypt_r) {
        errors.push(ConfigError::Validation {
            message: format!(
                "kdf.scrypt_r must be between 1 and {SCRYPT_MAX_R}, got {}",
                kdf.scrypt_r
            ),
        });
    }

    if !(1..=SCRYPT_MAX_P).contains(&kdf.scrypt_p) {
        errors.push(ConfigError::Validation {
            message: format!(
                "kdf.scrypt_p must be between 1 and {SCRYPT_MAX_P}, got {}",
                kdf.scrypt_p
            ),
        });
    }

    if SCRYPT_LOG_N_RANGE.contains(&kdf.scrypt_log_n)
        && scrypt_memory_bytes(kdf.scrypt_log_n, kdf.scrypt_r) > u128::from(KDF_MAX_MEMORY_BYTES)
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "kdf.scrypt_log_n = {} with kdf.scrypt_r = {} needs more than {} MiB",
                kdf.scrypt_log_n,
                kdf.scrypt_r,
                KDF_MAX_MEMORY_BYTES >> 20
            ),
        });
    }

    if !LOG_LEVELS.contains(&config.log.level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level `{}` is not one of {}",
                config.log.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
