// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The 32-byte symmetric key.

use envx_core::EnvxError;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Key length for AES-256-GCM.
pub const KEY_LEN: usize = 32;

/// A 256-bit AEAD key, zeroized on drop.
///
/// Only constructible from the system CSPRNG, from a KDF, or from a slice
/// that passes the length gate.
#[derive(Clone)]
pub struct SymmetricKey(Zeroizing<[u8; KEY_LEN]>);

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

impl SymmetricKey {
    /// Generate a fresh random key.
    pub fn generate() -> Result<Self, EnvxError> {
        let rng = SystemRandom::new();
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        rng.fill(key.as_mut())
            .map_err(|_| EnvxError::Encryption("failed to generate random key".to_string()))?;
        Ok(Self(key))
    }

    /// Copy key material out of `bytes`, which must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EnvxError> {
        let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| EnvxError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(Zeroizing::new(array)))
    }

    pub(crate) fn from_derived(key: Zeroizing<[u8; KEY_LEN]>) -> Self {
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}
