// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `.envx` container: on-disk JSON representation of an encrypted secret set.
//!
//! ```json
//! {
//!   "version": 1,
//!   "cipher": "AES-256-GCM",
//!   "kdf": { "type": "none" },
//!   "nonce_map": { "API_KEY": "<base64 12-byte nonce>" },
//!   "values":    { "API_KEY": "<base64 tag || ciphertext>" },
//!   "meta": { "created_at": "2026-01-01T00:00:00Z" }
//! }
//! ```
//!
//! Nothing read from disk is trusted until [`validate`] has accepted it.
//! Any version other than [`FORMAT_VERSION`] is rejected outright; there is
//! no migration or best-effort path, so an attacker cannot downgrade a file
//! to a weaker format.

use std::collections::BTreeMap;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use envx_core::EnvxError;
use serde::{Deserialize, Serialize};

use crate::cipher::{CIPHER_ID, EncryptedValues, NONCE_LEN, TAG_LEN};
use crate::kdf::{KdfMetadata, SALT_LEN};

/// The only container format version this build reads or writes.
pub const FORMAT_VERSION: u64 = 1;

/// Free-form container metadata.
///
/// `created_at` is required; unknown keys are preserved as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerMeta {
    pub created_at: DateTime<Utc>,

    /// Tool that wrote the container, e.g. `envx/0.1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ContainerMeta {
    /// Metadata stamped with the current time and this crate's version.
    pub fn now() -> Self {
        Self {
            created_at: Utc::now(),
            generator: Some(concat!("envx/", env!("CARGO_PKG_VERSION")).to_string()),
            extra: BTreeMap::new(),
        }
    }
}

impl Default for ContainerMeta {
    fn default() -> Self {
        Self::now()
    }
}

/// A validated encrypted container.
///
/// Fields are private and deserialization goes through [`RawContainer`]
/// and [`validate`], so a `Container` only comes out of
/// [`Container::build`], [`parse`] or serde after the version, cipher and
/// every field have been checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContainer")]
pub struct Container {
    version: u64,
    cipher: String,
    kdf: KdfMetadata,
    nonce_map: BTreeMap<String, String>,
    values: BTreeMap<String, String>,
    meta: ContainerMeta,
}

/// Container JSON as read, before any cross-field check.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawContainer {
    version: u64,
    cipher: String,
    kdf: KdfMetadata,
    nonce_map: BTreeMap<String, String>,
    values: BTreeMap<String, String>,
    meta: ContainerMeta,
}

impl TryFrom<RawContainer> for Container {
    type Error = EnvxError;

    fn try_from(raw: RawContainer) -> Result<Self, Self::Error> {
        validate(Container {
            version: raw.version,
            cipher: raw.cipher,
            kdf: raw.kdf,
            nonce_map: raw.nonce_map,
            values: raw.values,
            meta: raw.meta,
        })
    }
}

impl Container {
    /// Assemble a container from cipher output.
    ///
    /// The result goes through the same [`validate`] as parsed input.
    pub fn build(
        kdf: KdfMetadata,
        nonce_map: BTreeMap<String, String>,
        values: BTreeMap<String, String>,
        meta: Option<ContainerMeta>,
    ) -> Result<Self, EnvxError> {
        validate(Self {
            version: FORMAT_VERSION,
            cipher: CIPHER_ID.to_string(),
            kdf,
            nonce_map,
            values,
            meta: meta.unwrap_or_default(),
        })
    }

    /// [`Container::build`] from an [`EncryptedValues`] batch.
    pub fn from_encrypted(
        kdf: KdfMetadata,
        encrypted: EncryptedValues,
        meta: Option<ContainerMeta>,
    ) -> Result<Self, EnvxError> {
        Self::build(kdf, encrypted.nonce_map, encrypted.values, meta)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn cipher(&self) -> &str {
        &self.cipher
    }

    pub fn kdf(&self) -> &KdfMetadata {
        &self.kdf
    }

    pub fn nonce_map(&self) -> &BTreeMap<String, String> {
        &self.nonce_map
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn meta(&self) -> &ContainerMeta {
        &self.meta
    }

    /// Number of encrypted entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Variable names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn to_json_pretty(&self) -> Result<String, EnvxError> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| EnvxError::Internal(format!("failed to serialize container: {e}")))?;
        json.push('\n');
        Ok(json)
    }

    /// Persist with write-to-temp-then-rename.
    pub fn write_atomic(&self, path: &Path) -> Result<(), EnvxError> {
        crate::fs::write_atomic(path, self.to_json_pretty()?.as_bytes())
    }

    /// Read, parse and validate a container file.
    pub fn read(path: &Path) -> Result<Self, EnvxError> {
        let bytes = std::fs::read(path)
            .map_err(|e| EnvxError::io(format!("reading container {}", path.display()), e))?;
        parse(&bytes)
    }
}

/// Parse and validate raw container bytes.
///
/// Shape errors come back as `Validation`; a wrong version or cipher keeps
/// its own typed error.
pub fn parse(bytes: &[u8]) -> Result<Container, EnvxError> {
    let raw: RawContainer = serde_json::from_slice(bytes)
        .map_err(|e| EnvxError::validation(format!("malformed container: {e}")))?;
    Container::try_from(raw)
}

/// Enforce the cross-field invariants serde cannot express.
fn validate(candidate: Container) -> Result<Container, EnvxError> {
    if candidate.version != FORMAT_VERSION {
        return Err(EnvxError::UnsupportedVersion {
            found: candidate.version,
            expected: FORMAT_VERSION,
        });
    }

    if candidate.cipher != CIPHER_ID {
        return Err(EnvxError::UnsupportedCipher {
            found: candidate.cipher,
            expected: CIPHER_ID,
        });
    }

    if let Some(name) = candidate
        .values
        .keys()
        .find(|name| !candidate.nonce_map.contains_key(*name))
    {
        return Err(EnvxError::KeySetMismatch {
            name: name.clone(),
            present_in: "values",
            missing_from: "nonce_map",
        });
    }
    if let Some(name) = candidate
        .nonce_map
        .keys()
        .find(|name| !candidate.values.contains_key(*name))
    {
        return Err(EnvxError::KeySetMismatch {
            name: name.clone(),
            present_in: "nonce_map",
            missing_from: "values",
        });
    }

    for (name, nonce) in &candidate.nonce_map {
        if name.is_empty() {
            return Err(EnvxError::validation("variable names must not be empty"));
        }
        let decoded = decode_field(name, "nonce", nonce)?;
        if decoded.len() != NONCE_LEN {
            return Err(EnvxError::validation(format!(
                "nonce for `{name}` must decode to {NONCE_LEN} bytes, got {}",
                decoded.len()
            )));
        }
    }

    for (name, value) in &candidate.values {
        let decoded = decode_field(name, "value", value)?;
        if decoded.len() < TAG_LEN {
            return Err(EnvxError::validation(format!(
                "value for `{name}` must decode to at least {TAG_LEN} bytes, got {}",
                decoded.len()
            )));
        }
    }

    validate_kdf(&candidate.kdf)?;

    Ok(candidate)
}

fn decode_field(name: &str, field: &str, encoded: &str) -> Result<Vec<u8>, EnvxError> {
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(|_| EnvxError::validation(format!("{field} for `{name}` is not valid base64")))
}

fn validate_kdf(kdf: &KdfMetadata) -> Result<(), EnvxError> {
    if let Some(salt) = kdf.salt() {
        if salt.len() != SALT_LEN {
            return Err(EnvxError::validation(format!(
                "{} salt must be {SALT_LEN} bytes, got {}",
                kdf.type_name(),
                salt.len()
            )));
        }
    }

    let params = match kdf {
        KdfMetadata::None => Ok(()),
        KdfMetadata::Argon2id { params, .. } => params.check(),
        KdfMetadata::Scrypt { params, .. } => params.check(),
    };
    params.map_err(|message| EnvxError::validation(format!("kdf params rejected: {message}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::encrypt_all;
    use crate::kdf::{Argon2Params, ScryptParams};
    use crate::key::SymmetricKey;
    use crate::secret_set::SecretSet;

    fn sample_container() -> Container {
        let secrets: SecretSet = [("API_KEY", "sk-1234"), ("DEBUG", "true")]
            .into_iter()
            .collect();
        let key = SymmetricKey::generate().unwrap();
        let encrypted = encrypt_all(&secrets, key.as_bytes()).unwrap();
        Container::from_encrypted(KdfMetadata::None, encrypted, None).unwrap()
    }

    fn to_value(container: &Container) -> serde_json::Value {
        serde_json::to_value(container).unwrap()
    }

    fn parse_value(value: &serde_json::Value) -> Result<Container, EnvxError> {
        parse(value.to_string().as_bytes())
    }

    #[test]
    fn build_stamps_version_and_cipher() {
        let container = sample_container();
        assert_eq!(container.version(), 1);
        assert_eq!(container.cipher(), "AES-256-GCM");
        assert_eq!(container.len(), 2);
        assert_eq!(
            container.nonce_map().keys().collect::<Vec<_>>(),
            container.values().keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn serialized_field_names_are_stable() {
        let json = to_value(&sample_container());
        let object = json.as_object().unwrap();
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        for expected in ["version", "cipher", "kdf", "nonce_map", "values", "meta"] {
            assert!(keys.contains(&expected), "missing {expected}");
        }
        assert_eq!(json["kdf"]["type"], "none");
        assert!(json["meta"]["created_at"].is_string());
    }

    #[test]
    fn parse_accepts_own_output() {
        let container = sample_container();
        let parsed = parse(container.to_json_pretty().unwrap().as_bytes()).unwrap();
        assert_eq!(parsed, container);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut json = to_value(&sample_container());
        json["version"] = 2.into();
        let err = parse_value(&json).unwrap_err();
        assert!(matches!(err, EnvxError::UnsupportedVersion { found: 2, expected: 1 }));
    }

    #[test]
    fn version_zero_is_rejected() {
        let mut json = to_value(&sample_container());
        json["version"] = 0.into();
        assert!(parse_value(&json).is_err());
    }

    #[test]
    fn string_version_is_rejected() {
        let mut json = to_value(&sample_container());
        json["version"] = "1".into();
        assert!(matches!(
            parse_value(&json).unwrap_err(),
            EnvxError::Validation { .. }
        ));
    }

    #[test]
    fn unknown_cipher_is_rejected() {
        let mut json = to_value(&sample_container());
        json["cipher"] = "ChaCha20-Poly1305".into();
        let err = parse_value(&json).unwrap_err();
        assert!(matches!(err, EnvxError::UnsupportedCipher { .. }));
    }

    #[test]
    fn cipher_match_is_exact() {
        let mut json = to_value(&sample_container());
        json["cipher"] = "aes-256-gcm".into();
        assert!(parse_value(&json).is_err());
    }

    #[test]
    fn value_without_nonce_is_rejected() {
        let mut json = to_value(&sample_container());
        json["nonce_map"].as_object_mut().unwrap().remove("DEBUG");
        let err = parse_value(&json).unwrap_err();
        assert!(matches!(
            err,
            EnvxError::KeySetMismatch { ref name, missing_from: "nonce_map", .. } if name == "DEBUG"
        ));
    }

    #[test]
    fn nonce_without_value_is_rejected() {
        let mut json = to_value(&sample_container());
        json["nonce_map"]["EXTRA"] = "AAAAAAAAAAAAAAAA".into();
        let err = parse_value(&json).unwrap_err();
        assert!(matches!(
            err,
            EnvxError::KeySetMismatch { ref name, missing_from: "values", .. } if name == "EXTRA"
        ));
    }

    #[test]
    fn short_nonce_is_rejected() {
        let mut json = to_value(&sample_container());
        json["nonce_map"]["DEBUG"] = STANDARD.encode([0u8; 8]).into();
        assert!(parse_value(&json).is_err());
    }

    #[test]
    fn value_shorter_than_tag_is_rejected() {
        let mut json = to_value(&sample_container());
        json["values"]["DEBUG"] = STANDARD.encode([0u8; 15]).into();
        assert!(parse_value(&json).is_err());
    }

    #[test]
    fn bare_tag_value_is_accepted() {
        let mut json = to_value(&sample_container());
        json["values"]["DEBUG"] = STANDARD.encode([0u8; 16]).into();
        assert!(parse_value(&json).is_ok());
    }

    #[test]
    fn non_base64_value_is_rejected() {
        let mut json = to_value(&sample_container());
        json["values"]["DEBUG"] = "not base64!".into();
        assert!(parse_value(&json).is_err());
    }

    #[test]
    fn unknown_top_level_field_is_rejected() {
        let mut json = to_value(&sample_container());
        json["compression"] = "gzip".into();
        assert!(parse_value(&json).is_err());
    }

    #[test]
    fn missing_meta_is_rejected() {
        let mut json = to_value(&sample_container());
        json.as_object_mut().unwrap().remove("meta");
        assert!(parse_value(&json).is_err());
    }

    #[test]
    fn extra_meta_keys_are_preserved() {
        let mut json = to_value(&sample_container());
        json["meta"]["comment"] = "production".into();
        let parsed = parse_value(&json).unwrap();
        assert_eq!(parsed.meta().extra["comment"], "production");
    }

    #[test]
    fn unknown_kdf_type_is_rejected() {
        let mut json = to_value(&sample_container());
        json["kdf"] = serde_json::json!({"type": "pbkdf2"});
        assert!(parse_value(&json).is_err());
    }

    #[test]
    fn argon2id_salt_must_be_present_and_sized() {
        let mut json = to_value(&sample_container());
        json["kdf"] = serde_json::json!({
            "type": "argon2id",
            "params": {"memory_kb": 65536, "iterations": 3, "parallelism": 1}
        });
        assert!(parse_value(&json).is_err(), "missing salt");

        json["kdf"]["salt"] = STANDARD.encode([0u8; 8]).into();
        assert!(parse_value(&json).is_err(), "short salt");

        json["kdf"]["salt"] = STANDARD.encode([0u8; 16]).into();
        let parsed = parse_value(&json).unwrap();
        assert_eq!(parsed.kdf().type_name(), "argon2id");
    }

    #[test]
    fn scrypt_params_are_checked() {
        let good = KdfMetadata::Scrypt {
            salt: vec![1; SALT_LEN],
            params: ScryptParams::default(),
        };
        assert!(validate_kdf(&good).is_ok());

        let bad_n = KdfMetadata::Scrypt {
            salt: vec![1; SALT_LEN],
            params: ScryptParams {
                n: 1000,
                ..ScryptParams::default()
            },
        };
        assert!(validate_kdf(&bad_n).is_err());

        let bad_len = KdfMetadata::Scrypt {
            salt: vec![1; SALT_LEN],
            params: ScryptParams {
                output_len: 16,
                ..ScryptParams::default()
            },
        };
        assert!(validate_kdf(&bad_len).is_err());
    }

    #[test]
    fn serde_deserialize_runs_validation() {
        let mut json = to_value(&sample_container());
        json["version"] = 7.into();
        let err = serde_json::from_value::<Container>(json.clone()).unwrap_err();
        assert!(err.to_string().contains("version"), "{err}");

        json["version"] = 1.into();
        json["cipher"] = "ROT13".into();
        assert!(serde_json::from_value::<Container>(json.clone()).is_err());

        json["cipher"] = CIPHER_ID.into();
        let container: Container = serde_json::from_value(json).unwrap();
        assert_eq!(container.version(), FORMAT_VERSION);
        assert_eq!(container.len(), 2);
    }

    #[test]
    fn serde_deserialize_rejects_unknown_fields() {
        let mut json = to_value(&sample_container());
        json["compression"] = "gzip".into();
        assert!(serde_json::from_value::<Container>(json).is_err());
    }

    #[test]
    fn huge_scrypt_cost_is_rejected_on_parse() {
        let mut json = to_value(&sample_container());
        json["kdf"] = serde_json::json!({
            "type": "scrypt",
            "salt": STANDARD.encode([0u8; SALT_LEN]),
            "params": {"n": 1u64 << 40, "r": 8, "p": 1, "output_len": 32}
        });
        let err = parse_value(&json).unwrap_err();
        assert!(matches!(
            err,
            EnvxError::Validation { ref message } if message.contains("2^40")
        ));
    }

    #[test]
    fn huge_argon2_cost_is_rejected_on_parse() {
        let mut json = to_value(&sample_container());
        json["kdf"] = serde_json::json!({
            "type": "argon2id",
            "salt": STANDARD.encode([0u8; SALT_LEN]),
            "params": {"memory_kb": u32::MAX, "iterations": 3, "parallelism": 1}
        });
        let err = parse_value(&json).unwrap_err();
        assert!(matches!(
            err,
            EnvxError::Validation { ref message } if message.contains("memory_kb")
        ));

        json["kdf"]["params"] = serde_json::json!({
            "memory_kb": 65536, "iterations": u32::MAX, "parallelism": 1
        });
        assert!(parse_value(&json).is_err());
    }

    #[test]
    fn stray_kdf_keys_are_rejected() {
        let mut json = to_value(&sample_container());
        json["kdf"] = serde_json::json!({"type": "none", "salt": STANDARD.encode([0u8; 16])});
        assert!(parse_value(&json).is_err(), "salt on a random-key container");

        json["kdf"] = serde_json::json!({
            "type": "argon2id",
            "salt": STANDARD.encode([0u8; SALT_LEN]),
            "params": {"memory_kb": 65536, "iterations": 3, "parallelism": 1},
            "pepper": "x"
        });
        assert!(parse_value(&json).is_err(), "unknown key beside params");
    }

    #[test]
    fn build_rejects_mismatched_maps() {
        let nonces = BTreeMap::from([("A".to_string(), STANDARD.encode([0u8; NONCE_LEN]))]);
        let err = Container::build(KdfMetadata::None, nonces, BTreeMap::new(), None).unwrap_err();
        assert!(matches!(err, EnvxError::KeySetMismatch { .. }));
    }

    #[test]
    fn build_records_kdf_metadata() {
        let kdf = KdfMetadata::Argon2id {
            salt: vec![9; SALT_LEN],
            params: Argon2Params::default(),
        };
        let container =
            Container::build(kdf.clone(), BTreeMap::new(), BTreeMap::new(), None).unwrap();
        assert_eq!(container.kdf(), &kdf);
        assert!(container.is_empty());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            parse(b"not json at all").unwrap_err(),
            EnvxError::Validation { .. }
        ));
        assert!(parse(b"[]").is_err());
    }

    #[test]
    fn write_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env.envx");
        let container = sample_container();
        container.write_atomic(&path).unwrap();
        assert_eq!(Container::read(&path).unwrap(), container);
    }
}
