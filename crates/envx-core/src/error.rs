// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for envx.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// The primary error type used across the envx crates.
///
/// Variants carry only non-sensitive context: variable names, paths,
/// lengths and reason codes. Key material, plaintext, nonces and tags never
/// appear in an error.
#[derive(Debug, Error)]
pub enum EnvxError {
    /// Malformed container: unparseable JSON, schema violation, bad encoding.
    #[error("invalid container: {message}")]
    Validation { message: String },

    /// Container declares a format version this build does not read.
    #[error("unsupported container version {found} (expected {expected})")]
    UnsupportedVersion { found: u64, expected: u64 },

    /// Container declares a cipher other than the one supported identifier.
    #[error("unsupported cipher `{found}` (expected `{expected}`)")]
    UnsupportedCipher { found: String, expected: &'static str },

    /// A name appears in only one of `nonce_map` / `values`.
    #[error("invalid container: `{name}` is present in {present_in} but missing from {missing_from}")]
    KeySetMismatch {
        name: String,
        present_in: &'static str,
        missing_from: &'static str,
    },

    /// Password-based key derivation failed.
    #[error("key derivation failed: {0}")]
    KdfFailure(String),

    /// Key material has the wrong size.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// The RNG produced the same nonce twice within one batch.
    #[error("nonce collision while encrypting `{name}`; refusing to reuse a nonce")]
    NonceCollision { name: String },

    /// Any other failure on the encryption path (RNG, primitive setup).
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// A ciphertext has no matching nonce.
    #[error("missing nonce for `{name}`")]
    MissingNonce { name: String },

    /// A stored value is shorter than the authentication tag.
    #[error("invalid ciphertext length for `{name}`: {actual} bytes is shorter than the {minimum}-byte tag")]
    InvalidCiphertextLength {
        name: String,
        actual: usize,
        minimum: usize,
    },

    /// Authentication failure. The message is deliberately generic.
    #[error("decryption failed: wrong key or corrupted data")]
    Decryption { reason: DecryptFailure },

    /// No key at the expected location.
    #[error("key not found at {location}")]
    MissingKey { location: String },

    /// Refusing to overwrite an existing file or key.
    #[error("refusing to overwrite existing {location}")]
    FileExists { location: String },

    /// Filesystem errors with the operation that failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors outside the miette diagnostic path.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Why a decryption was rejected.
///
/// Internal detail for logs and debugging; never part of `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptFailure {
    /// AEAD tag verification failed (wrong key or tampered data).
    Authentication,
    /// A nonce or value was not valid base64.
    Encoding,
    /// A nonce did not decode to the expected size.
    NonceLength,
    /// The authenticated plaintext was not valid UTF-8.
    Utf8,
}

impl DecryptFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Encoding => "encoding",
            Self::NonceLength => "nonce_length",
            Self::Utf8 => "utf8",
        }
    }
}

/// Closed classification of [`EnvxError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    KdfFailure,
    EncryptionFailure,
    DecryptionFailure,
    MissingKey,
    FileExists,
    Io,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::KdfFailure => "kdf_failure",
            Self::EncryptionFailure => "encryption_failure",
            Self::DecryptionFailure => "decryption_failure",
            Self::MissingKey => "missing_key",
            Self::FileExists => "file_exists",
            Self::Io => "io",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EnvxError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. }
            | Self::UnsupportedVersion { .. }
            | Self::UnsupportedCipher { .. }
            | Self::KeySetMismatch { .. } => ErrorKind::Validation,
            Self::KdfFailure(_) => ErrorKind::KdfFailure,
            Self::InvalidKeyLength { .. } | Self::NonceCollision { .. } | Self::Encryption(_) => {
                ErrorKind::EncryptionFailure
            }
            Self::MissingNonce { .. }
            | Self::InvalidCiphertextLength { .. }
            | Self::Decryption { .. } => ErrorKind::DecryptionFailure,
            Self::MissingKey { .. } => ErrorKind::MissingKey,
            Self::FileExists { .. } => ErrorKind::FileExists,
            Self::Io { .. } => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Structured, non-sensitive context for log sinks.
    pub fn context(&self) -> BTreeMap<&'static str, String> {
        let mut ctx = BTreeMap::new();
        ctx.insert("kind", self.kind().as_str().to_string());
        match self {
            Self::UnsupportedVersion { found, expected } => {
                ctx.insert("found", found.to_string());
                ctx.insert("expected", expected.to_string());
            }
            Self::UnsupportedCipher { found, expected } => {
                ctx.insert("found", found.clone());
                ctx.insert("expected", (*expected).to_string());
            }
            Self::KeySetMismatch { name, missing_from, .. } => {
                ctx.insert("name", name.clone());
                ctx.insert("missing_from", (*missing_from).to_string());
            }
            Self::InvalidKeyLength { expected, actual } => {
                ctx.insert("expected", expected.to_string());
                ctx.insert("actual", actual.to_string());
            }
            Self::NonceCollision { name } | Self::MissingNonce { name } => {
                ctx.insert("name", name.clone());
            }
            Self::InvalidCiphertextLength { name, actual, .. } => {
                ctx.insert("name", name.clone());
                ctx.insert("actual", actual.to_string());
            }
            Self::Decryption { reason } => {
                ctx.insert("reason", reason.as_str().to_string());
            }
            Self::MissingKey { location } | Self::FileExists { location } => {
                ctx.insert("location", location.clone());
            }
            Self::Io { context, source } => {
                ctx.insert("operation", context.clone());
                ctx.insert("io_kind", format!("{:?}", source.kind()));
            }
            Self::Validation { .. }
            | Self::KdfFailure(_)
            | Self::Encryption(_)
            | Self::Config(_)
            | Self::Internal(_) => {}
        }
        ctx
    }

    /// Short human-readable category for user-facing output.
    pub fn category(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Validation => "invalid container",
            ErrorKind::KdfFailure => "key derivation failed",
            ErrorKind::EncryptionFailure => "encryption failed",
            ErrorKind::DecryptionFailure => "decryption failed: wrong key or corrupted data",
            ErrorKind::MissingKey => "key not found",
            ErrorKind::FileExists => "file already exists",
            ErrorKind::Io => "i/o error",
            ErrorKind::Config => "configuration error",
            ErrorKind::Internal => "internal error",
        }
    }

    /// Wrap an `std::io::Error` with the operation that produced it.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
