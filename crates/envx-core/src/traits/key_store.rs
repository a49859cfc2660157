// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw key bytes provider.

use zeroize::Zeroizing;

use crate::error::EnvxError;

/// A byte-addressable location holding exactly one raw symmetric key.
///
/// The core only needs "read the whole key" and "write a new key with
/// restrictive permissions". Implementations must refuse to overwrite an
/// existing key in [`KeyStore::write_new`]; replacing a key is always an
/// explicit rotation onto a fresh location.
pub trait KeyStore {
    /// Human-readable location used in errors and logs (a path, a label).
    fn location(&self) -> String;

    /// Whether a key is currently present at this location.
    fn exists(&self) -> Result<bool, EnvxError>;

    /// Read the full key contents.
    ///
    /// Returns [`EnvxError::MissingKey`] when nothing is stored. Length is
    /// not checked here; callers gate on the expected size.
    fn read(&self) -> Result<Zeroizing<Vec<u8>>, EnvxError>;

    /// Store a new key. Fails with [`EnvxError::FileExists`] if occupied.
    fn write_new(&self, key: &[u8]) -> Result<(), EnvxError>;
}
