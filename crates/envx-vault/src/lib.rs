// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted, version-control-friendly replacement for plaintext `.env` files.
//!
//! Every secret value is sealed independently with AES-256-GCM under a single
//! 32-byte key and a fresh random nonce. The results are collected into a
//! JSON [`Container`] that is strictly validated before anything in it is
//! trusted. The key is either random or derived from a password with
//! Argon2id (scrypt as a fallback), and the [`Envx`] facade ties key
//! loading, encryption, decryption, verification and rotation together.
//!
//! Buffers holding keys and plaintext are zeroized when dropped. This is
//! defense in depth, not a security boundary.

pub mod cipher;
pub mod container;
pub mod envx;
pub mod fs;
pub mod kdf;
pub mod key;
pub mod key_store;
pub mod prompt;
pub mod secret_set;
pub mod wipe;

pub use cipher::{CIPHER_ID, EncryptedValues, decrypt_all, encrypt_all};
pub use container::{Container, ContainerMeta, FORMAT_VERSION};
pub use envx::{Envx, KeyMode, VerifyReport, decrypt_with_password, mask_secret, verify};
pub use kdf::{KdfAlgorithm, KdfMetadata, KdfSettings, derive, rederive};
pub use key::SymmetricKey;
pub use key_store::{FileKeyStore, MemoryKeyStore};
pub use prompt::{get_password, get_password_with_confirm};
pub use secret_set::SecretSet;

pub use envx_core::{EnvxError, ErrorKind, KeyStore};
