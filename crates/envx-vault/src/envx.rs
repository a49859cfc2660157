// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key lifecycle and whole-file operations: init, encrypt, decrypt, verify, rotate.
//!
//! [`Envx`] holds nothing but a key location and KDF settings. Every call
//! loads the key, uses it, and lets it drop (and zeroize) before returning:
//!
//! - `{no key}` --init--> `{key present}`
//! - `{key present}` --encrypt--> container
//! - `{key present, container}` --decrypt / verify--> no state change
//! - `{key present, container}` --rotate(new store)--> new key, new container
//!
//! Encrypting or decrypting without a key is a `MissingKey` error, never an
//! implicit init.

use std::path::PathBuf;

use envx_core::{EnvxError, KeyStore};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cipher::{self, NonceSource, SystemNonceSource};
use crate::container::{self, Container, ContainerMeta};
use crate::kdf::{self, KdfMetadata, KdfSettings};
use crate::key::SymmetricKey;
use crate::key_store::FileKeyStore;
use crate::secret_set::SecretSet;

/// How a new key is produced.
#[derive(Debug)]
pub enum KeyMode {
    /// 32 bytes from the system CSPRNG.
    Random,
    /// Derived from a password with the configured KDF.
    Password(SecretString),
}

/// Orchestration over a single key location.
///
/// Debug output never includes key material because the key is never held.
#[derive(Debug)]
pub struct Envx<S: KeyStore = FileKeyStore> {
    store: S,
    kdf: KdfSettings,
}

impl Envx<FileKeyStore> {
    /// Facade over a key file path with default KDF settings.
    pub fn open(key_path: impl Into<PathBuf>) -> Self {
        Self::new(FileKeyStore::new(key_path))
    }
}

impl<S: KeyStore> Envx<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            kdf: KdfSettings::default(),
        }
    }

    /// Use `settings` for password-mode init and rotation.
    pub fn with_kdf_settings(mut self, settings: KdfSettings) -> Self {
        self.kdf = settings;
        self
    }

    pub fn kdf_settings(&self) -> &KdfSettings {
        &self.kdf
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create the key. Fails with `FileExists` if the location is occupied.
    ///
    /// Returns how the key was produced. Pass it to [`Envx::encrypt`] so the
    /// container records it; it is not persisted anywhere by `init` itself.
    pub fn init(&self, mode: &KeyMode) -> Result<KdfMetadata, EnvxError> {
        ensure_vacant(&self.store)?;
        let (key, metadata) = make_key(&self.kdf, mode)?;
        store_key(&self.store, &key, &metadata)?;
        Ok(metadata)
    }

    /// Encrypt `secrets` under the stored key and build a container that
    /// records `kdf` (use [`KdfMetadata::None`] for random keys).
    pub fn encrypt(&self, secrets: &SecretSet, kdf: &KdfMetadata) -> Result<Container, EnvxError> {
        let key = self.load_key()?;
        seal_container(secrets, &key, kdf.clone(), &SystemNonceSource::default())
    }

    /// Decrypt an already-validated container. All-or-nothing.
    pub fn decrypt(&self, container: &Container) -> Result<SecretSet, EnvxError> {
        let key = self.load_key()?;
        let secrets =
            cipher::decrypt_with_key(container.values(), container.nonce_map(), &key)?;
        info!(entries = secrets.len(), "container decrypted");
        Ok(secrets)
    }

    /// Parse, validate and decrypt raw container bytes.
    pub fn decrypt_bytes(&self, bytes: &[u8]) -> Result<SecretSet, EnvxError> {
        let container = container::parse(bytes)?;
        self.decrypt(&container)
    }

    /// Structural check followed by a full decrypt with the stored key.
    ///
    /// Key loading errors are returned as `Err`; a container that fails to
    /// authenticate yields a report with `authenticated: Some(false)`.
    pub fn verify_authentic(&self, bytes: &[u8]) -> Result<VerifyReport, EnvxError> {
        let (mut report, parsed) = structural_check(bytes);
        let Some(container) = parsed else {
            return Ok(report);
        };

        let key = self.load_key()?;
        match cipher::decrypt_with_key(container.values(), container.nonce_map(), &key) {
            Ok(_secrets) => {
                report.authenticated = Some(true);
                report.details.push("all entries authenticated with key".to_string());
            }
            Err(e) => {
                debug!(context = ?e.context(), "authenticity check failed");
                report.authenticated = Some(false);
                report.valid = false;
                report.details.push(e.to_string());
            }
        }
        Ok(report)
    }

    /// Re-encrypt `container` under a brand new key written to `new_store`.
    ///
    /// `new_store` must be empty; that is checked before anything else. The
    /// new key is only written once the rotated container has been sealed,
    /// so a failed rotation leaves `new_store` empty. The intermediate
    /// plaintext is dropped, and zeroized, on every path.
    pub fn rotate_key<N: KeyStore>(
        &self,
        container: &Container,
        new_store: &N,
        mode: &KeyMode,
    ) -> Result<Container, EnvxError> {
        self.rotate_key_with(container, new_store, mode, &SystemNonceSource::default())
    }

    fn rotate_key_with<N: KeyStore>(
        &self,
        container: &Container,
        new_store: &N,
        mode: &KeyMode,
        nonces: &dyn NonceSource,
    ) -> Result<Container, EnvxError> {
        ensure_vacant(new_store)?;

        let secrets = self.decrypt(container)?;
        let (new_key, metadata) = make_key(&self.kdf, mode)?;
        let rotated = seal_container(&secrets, &new_key, metadata, nonces)?;
        drop(secrets);

        store_key(new_store, &new_key, rotated.kdf())?;
        info!(
            entries = rotated.len(),
            from = %self.store.location(),
            to = %new_store.location(),
            kdf = rotated.kdf().type_name(),
            "key rotated"
        );
        Ok(rotated)
    }

    /// Read the key and gate it on length. The raw buffer is wiped on return.
    fn load_key(&self) -> Result<SymmetricKey, EnvxError> {
        let raw = self.store.read()?;
        SymmetricKey::from_slice(&raw)
    }
}

/// Decrypt a password-mode container by re-deriving its key from the
/// container's own KDF metadata. No key store is involved.
pub fn decrypt_with_password(
    container: &Container,
    password: &SecretString,
) -> Result<SecretSet, EnvxError> {
    let key = kdf::rederive(password.expose_secret().as_bytes(), container.kdf())?;
    let secrets = cipher::decrypt_with_key(container.values(), container.nonce_map(), &key)?;
    info!(
        entries = secrets.len(),
        kdf = container.kdf().type_name(),
        "container decrypted with password"
    );
    Ok(secrets)
}

/// Structural check only. Needs no key and says nothing about authenticity.
pub fn verify(bytes: &[u8]) -> VerifyReport {
    structural_check(bytes).0
}

fn ensure_vacant<S: KeyStore + ?Sized>(store: &S) -> Result<(), EnvxError> {
    if store.exists()? {
        return Err(EnvxError::FileExists {
            location: store.location(),
        });
    }
    Ok(())
}

/// Produce a key in memory. Nothing is persisted.
fn make_key(
    settings: &KdfSettings,
    mode: &KeyMode,
) -> Result<(SymmetricKey, KdfMetadata), EnvxError> {
    match mode {
        KeyMode::Random => Ok((SymmetricKey::generate()?, KdfMetadata::None)),
        KeyMode::Password(password) => {
            let password = password.expose_secret();
            if password.is_empty() {
                return Err(EnvxError::KdfFailure("password must not be empty".to_string()));
            }
            let derived = kdf::derive(password.as_bytes(), settings, None)?;
            Ok((derived.key, derived.metadata))
        }
    }
}

fn store_key<S: KeyStore + ?Sized>(
    store: &S,
    key: &SymmetricKey,
    metadata: &KdfMetadata,
) -> Result<(), EnvxError> {
    store.write_new(key.as_bytes())?;
    info!(location = %store.location(), kdf = metadata.type_name(), "key initialized");
    Ok(())
}

fn seal_container(
    secrets: &SecretSet,
    key: &SymmetricKey,
    kdf: KdfMetadata,
    nonces: &dyn NonceSource,
) -> Result<Container, EnvxError> {
    let encrypted = cipher::encrypt_with_key(secrets, key, nonces)?;
    let container = Container::from_encrypted(kdf, encrypted, Some(ContainerMeta::now()))?;
    info!(
        entries = container.len(),
        kdf = container.kdf().type_name(),
        "container encrypted"
    );
    Ok(container)
}

fn structural_check(bytes: &[u8]) -> (VerifyReport, Option<Container>) {
    match container::parse(bytes) {
        Ok(container) => {
            let report = VerifyReport {
                valid: true,
                structural: true,
                authenticated: None,
                entries: container.len(),
                kdf: container.kdf().type_name(),
                details: vec![format!(
                    "version {}, cipher {}, {} entries",
                    container.version(),
                    container.cipher(),
                    container.len()
                )],
            };
            (report, Some(container))
        }
        Err(e) => {
            warn!(kind = %e.kind(), "container failed validation");
            let report = VerifyReport {
                valid: false,
                structural: false,
                authenticated: None,
                entries: 0,
                kdf: "unknown",
                details: vec![e.to_string()],
            };
            (report, None)
        }
    }
}

/// Outcome of [`verify`] or [`Envx::verify_authentic`].
///
/// `structural` and `authenticated` answer different questions: a
/// structurally valid container may still have been tampered with, which
/// only a decrypt with the right key can reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub valid: bool,
    pub structural: bool,
    /// `None` when no key was used.
    pub authenticated: Option<bool>,
    pub entries: usize,
    pub kdf: &'static str,
    pub details: Vec<String>,
}

impl VerifyReport {
    /// One-line human summary that keeps the two checks apart.
    pub fn summary(&self) -> String {
        if !self.structural {
            return "invalid container".to_string();
        }
        let structure = format!(
            "structurally valid ({} entries, kdf {})",
            self.entries, self.kdf
        );
        match self.authenticated {
            None => format!("{structure}; authenticity not checked (no key used)"),
            Some(true) => format!("{structure}; authenticated with key"),
            Some(false) => format!("{structure}; NOT authenticated: wrong key or tampered data"),
        }
    }
}

/// Mask a secret for display, showing at most four characters at each end.
pub fn mask_secret(value: &str) -> String {
    let count = value.chars().count();
    if count < 10 {
        return "****".to_string();
    }
    let prefix: String = value.chars().take(4).collect();
    let suffix: String = value.chars().skip(count - 4).collect();
    format!("{prefix}...{suffix}")
}
