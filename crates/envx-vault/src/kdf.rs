// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password-based key derivation.
//!
//! Argon2id (Algorithm::Argon2id, Version::V0x13) is the primary algorithm,
//! scrypt the fallback. Both produce a 32-byte key from a password and a
//! 16-byte salt. The salt and parameters are returned as [`KdfMetadata`] so
//! the same key can be re-derived later; neither is secret.
//!
//! Derivation works directly on the caller's password and salt slices and
//! writes into a zeroizing output buffer, so no internal copies of the
//! password outlive the call. Wiping the caller's own password buffer is
//! the caller's job.

use envx_config::validation::{
    KDF_MAX_ITERATIONS, KDF_MAX_MEMORY_BYTES, KDF_MAX_PARALLELISM, SCRYPT_LOG_N_RANGE,
    SCRYPT_MAX_P, SCRYPT_MAX_R, scrypt_memory_bytes,
};
use envx_config::{KdfAlgorithmConfig, KdfConfig};
use envx_core::EnvxError;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::key::{KEY_LEN, SymmetricKey};

/// Salt length for both algorithms.
pub const SALT_LEN: usize = 16;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Argon2Params {
    /// Memory cost in KiB.
    pub memory_kb: u32,
    /// Time cost (passes over memory).
    pub iterations: u32,
    /// Lanes.
    pub parallelism: u32,
}

impl Argon2Params {
    /// Reject costs outside what envx will spend on one derivation.
    ///
    /// Containers are untrusted input, so this runs before any memory is
    /// allocated for them.
    pub fn check(&self) -> Result<(), String> {
        if !(1..=KDF_MAX_PARALLELISM).contains(&self.parallelism) {
            return Err(format!(
                "argon2id parallelism must be between 1 and {KDF_MAX_PARALLELISM}, got {}",
                self.parallelism
            ));
        }
        if !(1..=KDF_MAX_ITERATIONS).contains(&self.iterations) {
            return Err(format!(
                "argon2id iterations must be between 1 and {KDF_MAX_ITERATIONS}, got {}",
                self.iterations
            ));
        }
        let floor = 8 * u64::from(self.parallelism);
        let ceiling = KDF_MAX_MEMORY_BYTES / 1024;
        if !(floor..=ceiling).contains(&u64::from(self.memory_kb)) {
            return Err(format!(
                "argon2id memory_kb must be between {floor} and {ceiling}, got {}",
                self.memory_kb
            ));
        }
        Ok(())
    }
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kb: 65536,
            iterations: 3,
            parallelism: 1,
        }
    }
}

/// scrypt cost parameters. `n` is stored as the real cost, not its log2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScryptParams {
    pub n: u64,
    pub r: u32,
    pub p: u32,
    pub output_len: usize,
}

impl Default for ScryptParams {
    fn default() -> Self {
        Self {
            n: 1 << 15,
            r: 8,
            p: 1,
            output_len: KEY_LEN,
        }
    }
}

impl ScryptParams {
    /// log2(n), provided `n` is a power of two greater than one.
    pub fn log_n(&self) -> Option<u8> {
        if self.n > 1 && self.n.is_power_of_two() {
            u8::try_from(self.n.trailing_zeros()).ok()
        } else {
            None
        }
    }

    /// Reject costs outside what envx will spend on one derivation.
    pub fn check(&self) -> Result<(), String> {
        let log_n = self.log_n().ok_or_else(|| {
            format!("scrypt n must be a power of two greater than 1, got {}", self.n)
        })?;
        if !SCRYPT_LOG_N_RANGE.contains(&log_n) {
            return Err(format!(
                "scrypt n must be between 2^{} and 2^{}, got 2^{log_n}",
                SCRYPT_LOG_N_RANGE.start(),
                SCRYPT_LOG_N_RANGE.end()
            ));
        }
        if !(1..=SCRYPT_MAX_R).contains(&self.r) {
            return Err(format!("scrypt r must be in 1..={SCRYPT_MAX_R}, got {}", self.r));
        }
        if !(1..=SCRYPT_MAX_P).contains(&self.p) {
            return Err(format!("scrypt p must be in 1..={SCRYPT_MAX_P}, got {}", self.p));
        }
        if scrypt_memory_bytes(log_n, self.r) > u128::from(KDF_MAX_MEMORY_BYTES) {
            return Err(format!(
                "scrypt n = 2^{log_n} with r = {} needs more than {} MiB",
                self.r,
                KDF_MAX_MEMORY_BYTES >> 20
            ));
        }
        if self.output_len != KEY_LEN {
            return Err(format!(
                "scrypt output_len must be {KEY_LEN}, got {}",
                self.output_len
            ));
        }
        Ok(())
    }
}

/// Which password hashing function to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KdfAlgorithm {
    #[default]
    Argon2id,
    Scrypt,
}

impl KdfAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Argon2id => "argon2id",
            Self::Scrypt => "scrypt",
        }
    }
}

/// Derivation settings threaded through the orchestration layer.
///
/// `KdfSettings::default()` yields Argon2id with 64 MiB / 3 passes / 1 lane
/// and scrypt with N = 2^15, r = 8, p = 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KdfSettings {
    pub algorithm: KdfAlgorithm,
    pub argon2: Argon2Params,
    pub scrypt: ScryptParams,
}

impl KdfSettings {
    /// Build settings from the `[kdf]` configuration section.
    pub fn from_config(config: &KdfConfig) -> Self {
        Self {
            algorithm: match config.algorithm {
                KdfAlgorithmConfig::Argon2id => KdfAlgorithm::Argon2id,
                KdfAlgorithmConfig::Scrypt => KdfAlgorithm::Scrypt,
            },
            argon2: Argon2Params {
                memory_kb: config.memory_kb,
                iterations: config.iterations,
                parallelism: config.parallelism,
            },
            scrypt: ScryptParams {
                n: 1u64.checked_shl(u32::from(config.scrypt_log_n)).unwrap_or(0),
                r: config.scrypt_r,
                p: config.scrypt_p,
                output_len: KEY_LEN,
            },
        }
    }

    pub fn with_algorithm(mut self, algorithm: KdfAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/// How a container's key was produced.
///
/// Persisted in the container as `{"type": "none"}` or
/// `{"type": "argon2id", "salt": "<base64>", "params": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", from = "RawKdfMetadata")]
pub enum KdfMetadata {
    /// Random key, nothing to re-derive.
    None,
    Argon2id {
        #[serde(with = "b64")]
        salt: Vec<u8>,
        params: Argon2Params,
    },
    Scrypt {
        #[serde(with = "b64")]
        salt: Vec<u8>,
        params: ScryptParams,
    },
}

/// Wire form of [`KdfMetadata`]. `None` is an empty struct variant so that
/// `deny_unknown_fields` also rejects stray keys next to `"type": "none"`.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
enum RawKdfMetadata {
    None {},
    Argon2id {
        #[serde(with = "b64")]
        salt: Vec<u8>,
        params: Argon2Params,
    },
    Scrypt {
        #[serde(with = "b64")]
        salt: Vec<u8>,
        params: ScryptParams,
    },
}

impl From<RawKdfMetadata> for KdfMetadata {
    fn from(raw: RawKdfMetadata) -> Self {
        match raw {
            RawKdfMetadata::None {} => Self::None,
            RawKdfMetadata::Argon2id { salt, params } => Self::Argon2id { salt, params },
            RawKdfMetadata::Scrypt { salt, params } => Self::Scrypt { salt, params },
        }
    }
}

impl KdfMetadata {
    /// The `type` tag as written in the container.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Argon2id { .. } => "argon2id",
            Self::Scrypt { .. } => "scrypt",
        }
    }

    pub fn salt(&self) -> Option<&[u8]> {
        match self {
            Self::None => None,
            Self::Argon2id { salt, .. } | Self::Scrypt { salt, .. } => Some(salt),
        }
    }
}

/// A freshly derived key together with what is needed to derive it again.
#[derive(Debug)]
pub struct DerivedKey {
    pub key: SymmetricKey,
    pub metadata: KdfMetadata,
}

/// Derive a key from `password` using `settings`.
///
/// A fresh random salt is generated unless `salt` pins one (tests do, for
/// determinism). On failure no key is returned.
pub fn derive(
    password: &[u8],
    settings: &KdfSettings,
    salt: Option<[u8; SALT_LEN]>,
) -> Result<DerivedKey, EnvxError> {
    let salt = match salt {
        Some(salt) => salt,
        None => generate_salt()?,
    };

    let (key, metadata) = match settings.algorithm {
        KdfAlgorithm::Argon2id => (
            derive_argon2id(password, &salt, &settings.argon2)?,
            KdfMetadata::Argon2id {
                salt: salt.to_vec(),
                params: settings.argon2,
            },
        ),
        KdfAlgorithm::Scrypt => (
            derive_scrypt(password, &salt, &settings.scrypt)?,
            KdfMetadata::Scrypt {
                salt: salt.to_vec(),
                params: settings.scrypt,
            },
        ),
    };

    debug!(algorithm = settings.algorithm.as_str(), "key derived");
    Ok(DerivedKey {
        key: SymmetricKey::from_derived(key),
        metadata,
    })
}

/// Re-derive the key described by persisted metadata.
pub fn rederive(password: &[u8], metadata: &KdfMetadata) -> Result<SymmetricKey, EnvxError> {
    let key = match metadata {
        KdfMetadata::None => {
            return Err(EnvxError::KdfFailure(
                "container was encrypted with a random key; no password derivation recorded"
                    .to_string(),
            ));
        }
        KdfMetadata::Argon2id { salt, params } => derive_argon2id(password, salt, params)?,
        KdfMetadata::Scrypt { salt, params } => derive_scrypt(password, salt, params)?,
    };
    Ok(SymmetricKey::from_derived(key))
}

/// Derive a 32-byte key with Argon2id.
pub fn derive_argon2id(
    password: &[u8],
    salt: &[u8],
    params: &Argon2Params,
) -> Result<Zeroizing<[u8; KEY_LEN]>, EnvxError> {
    params.check().map_err(EnvxError::KdfFailure)?;
    let argon_params = argon2::Params::new(
        params.memory_kb,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| EnvxError::KdfFailure(format!("invalid Argon2id parameters: {e}")))?;

    let argon2 =
        argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, argon_params);

    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, output.as_mut())
        .map_err(|e| EnvxError::KdfFailure(format!("Argon2id derivation failed: {e}")))?;

    Ok(output)
}

/// Derive a 32-byte key with scrypt.
pub fn derive_scrypt(
    password: &[u8],
    salt: &[u8],
    params: &ScryptParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>, EnvxError> {
    params.check().map_err(EnvxError::KdfFailure)?;
    let log_n = params
        .log_n()
        .ok_or_else(|| EnvxError::Internal("scrypt n checked but has no log2".to_string()))?;
    let scrypt_params = scrypt::Params::new(log_n, params.r, params.p, KEY_LEN)
        .map_err(|e| EnvxError::KdfFailure(format!("invalid scrypt parameters: {e}")))?;

    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    scrypt::scrypt(password, salt, &scrypt_params, output.as_mut())
        .map_err(|e| EnvxError::KdfFailure(format!("scrypt derivation failed: {e}")))?;

    Ok(output)
}

/// Generate a random 16-byte salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN], EnvxError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| EnvxError::KdfFailure("failed to generate random salt".to_string()))?;
    Ok(salt)
}

/// Standard base64 (with padding) for byte fields in JSON.
pub(crate) mod b64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| serde::de::Error::custom(format!("invalid base64: {e}")))
    }
}
