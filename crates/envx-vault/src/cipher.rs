// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-value AES-256-GCM encryption.
//!
//! Every value is sealed under its own random 96-bit nonce drawn from the
//! system CSPRNG. Nonce reuse under one key is catastrophic for GCM, so a
//! repeated nonce within a batch aborts the whole batch instead of being
//! retried: with 96 random bits a collision means the RNG is broken.
//!
//! Stored values are `tag || ciphertext`, base64 encoded, with the 16-byte tag
//! first. Decryption is all-or-nothing: one bad value fails the whole call and
//! the values already opened are wiped.

use std::collections::{BTreeMap, HashSet};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use envx_core::{DecryptFailure, EnvxError};
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::debug;
use zeroize::Zeroizing;

use crate::key::SymmetricKey;
use crate::secret_set::SecretSet;
use crate::wipe;

/// Cipher identifier written into every container.
pub const CIPHER_ID: &str = "AES-256-GCM";

/// AES-GCM nonce length.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// Source of per-value nonces.
pub trait NonceSource {
    fn fill_nonce(&self, nonce: &mut [u8; NONCE_LEN]) -> Result<(), EnvxError>;
}

/// Nonces from ring's [`SystemRandom`].
#[derive(Debug)]
pub struct SystemNonceSource(SystemRandom);

impl Default for SystemNonceSource {
    fn default() -> Self {
        Self(SystemRandom::new())
    }
}

impl NonceSource for SystemNonceSource {
    fn fill_nonce(&self, nonce: &mut [u8; NONCE_LEN]) -> Result<(), EnvxError> {
        self.0
            .fill(nonce)
            .map_err(|_| EnvxError::Encryption("failed to generate random nonce".to_string()))
    }
}

/// Base64 nonces and sealed values keyed by variable name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptedValues {
    pub nonce_map: BTreeMap<String, String>,
    pub values: BTreeMap<String, String>,
}

fn aead_key(key: &SymmetricKey) -> Result<LessSafeKey, EnvxError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes())
        .map_err(|_| EnvxError::Encryption("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Seal `plaintext` under `nonce`, returning `tag || ciphertext`.
pub fn seal(
    key: &SymmetricKey,
    nonce: [u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, EnvxError> {
    let less_safe = aead_key(key)?;

    let mut in_out = wipe::scoped(plaintext.to_vec());
    let tag = less_safe
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(nonce),
            Aad::empty(),
            in_out.as_mut_slice(),
        )
        .map_err(|_| EnvxError::Encryption("AES-256-GCM encryption failed".to_string()))?;

    let mut sealed = Vec::with_capacity(TAG_LEN + in_out.len());
    sealed.extend_from_slice(tag.as_ref());
    sealed.extend_from_slice(&in_out);
    Ok(sealed)
}

/// Open a `tag || ciphertext` buffer. Any failure is reported as an
/// authentication failure.
pub fn open(
    key: &SymmetricKey,
    nonce: &[u8; NONCE_LEN],
    sealed: &[u8],
) -> Result<Zeroizing<Vec<u8>>, EnvxError> {
    let authentication = EnvxError::Decryption {
        reason: DecryptFailure::Authentication,
    };
    if sealed.len() < TAG_LEN {
        return Err(authentication);
    }
    let less_safe = aead_key(key)?;

    // ring expects ciphertext || tag.
    let (tag, ciphertext) = sealed.split_at(TAG_LEN);
    let mut in_out = wipe::scoped(Vec::with_capacity(sealed.len()));
    in_out.extend_from_slice(ciphertext);
    in_out.extend_from_slice(tag);

    let plaintext_len = less_safe
        .open_in_place(Nonce::assume_unique_for_key(*nonce), Aad::empty(), in_out.as_mut_slice())
        .map_err(|_| authentication)?
        .len();
    in_out.truncate(plaintext_len);
    Ok(in_out)
}

/// Encrypt every value in `values` under `key` with fresh random nonces.
///
/// The key length is checked before any value is touched.
pub fn encrypt_all(values: &SecretSet, key: &[u8]) -> Result<EncryptedValues, EnvxError> {
    encrypt_all_with(values, key, &SystemNonceSource::default())
}

/// [`encrypt_all`] with an explicit nonce source.
pub fn encrypt_all_with(
    values: &SecretSet,
    key: &[u8],
    nonces: &dyn NonceSource,
) -> Result<EncryptedValues, EnvxError> {
    let key = SymmetricKey::from_slice(key)?;
    encrypt_with_key(values, &key, nonces)
}

pub(crate) fn encrypt_with_key(
    values: &SecretSet,
    key: &SymmetricKey,
    nonces: &dyn NonceSource,
) -> Result<EncryptedValues, EnvxError> {
    let mut out = EncryptedValues::default();
    let mut used = HashSet::with_capacity(values.len());

    for (name, plaintext) in values.iter() {
        if name.is_empty() {
            return Err(EnvxError::validation("variable names must not be empty"));
        }

        let mut nonce = [0u8; NONCE_LEN];
        nonces.fill_nonce(&mut nonce)?;
        if !used.insert(nonce) {
            return Err(EnvxError::NonceCollision {
                name: name.to_string(),
            });
        }

        let sealed = seal(key, nonce, plaintext.as_bytes())?;
        out.nonce_map.insert(name.to_string(), STANDARD.encode(nonce));
        out.values.insert(name.to_string(), STANDARD.encode(&sealed));
    }

    debug!(entries = out.values.len(), "encrypted secret set");
    Ok(out)
}

/// Decrypt and authenticate every entry of `cipher_map`.
///
/// Fails as a whole if any single entry is missing its nonce, is malformed,
/// or does not authenticate. No partial result is ever returned.
pub fn decrypt_all(
    cipher_map: &BTreeMap<String, String>,
    nonce_map: &BTreeMap<String, String>,
    key: &[u8],
) -> Result<SecretSet, EnvxError> {
    let key = SymmetricKey::from_slice(key)?;
    decrypt_with_key(cipher_map, nonce_map, &key)
}

pub(crate) fn decrypt_with_key(
    cipher_map: &BTreeMap<String, String>,
    nonce_map: &BTreeMap<String, String>,
    key: &SymmetricKey,
) -> Result<SecretSet, EnvxError> {
    // Dropped (and wiped) if any entry below fails.
    let mut secrets = SecretSet::new();

    for (name, encoded_value) in cipher_map {
        let encoded_nonce = nonce_map
            .get(name)
            .ok_or_else(|| EnvxError::MissingNonce { name: name.clone() })?;

        let nonce_bytes = STANDARD
            .decode(encoded_nonce.as_bytes())
            .map_err(|_| EnvxError::Decryption {
                reason: DecryptFailure::Encoding,
            })?;
        let nonce: [u8; NONCE_LEN] =
            nonce_bytes
                .as_slice()
                .try_into()
                .map_err(|_| EnvxError::Decryption {
                    reason: DecryptFailure::NonceLength,
                })?;

        let sealed = STANDARD
            .decode(encoded_value.as_bytes())
            .map_err(|_| EnvxError::Decryption {
                reason: DecryptFailure::Encoding,
            })?;
        if sealed.len() < TAG_LEN {
            return Err(EnvxError::InvalidCiphertextLength {
                name: name.clone(),
                actual: sealed.len(),
                minimum: TAG_LEN,
            });
        }

        let plaintext = open(key, &nonce, &sealed)?;
        let value = wipe::into_utf8(plaintext).ok_or(EnvxError::Decryption {
            reason: DecryptFailure::Utf8,
        })?;
        secrets.insert(name.clone(), value);
    }

    debug!(entries = secrets.len(), "decrypted secret set");
    Ok(secrets)
}
