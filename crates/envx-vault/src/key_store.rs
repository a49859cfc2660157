// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`KeyStore`] implementations: a key file on disk and an in-memory slot.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use envx_core::{EnvxError, KeyStore};
use zeroize::Zeroizing;

/// A raw 32-byte key file.
///
/// New key files are created exclusively and, on unix, with mode `0600`
/// from the start.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyStore for FileKeyStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn exists(&self) -> Result<bool, EnvxError> {
        self.path
            .try_exists()
            .map_err(|e| EnvxError::io(format!("checking {}", self.location()), e))
    }

    fn read(&self) -> Result<Zeroizing<Vec<u8>>, EnvxError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Zeroizing::new(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(EnvxError::MissingKey {
                location: self.location(),
            }),
            Err(e) => Err(EnvxError::io(format!("reading key {}", self.location()), e)),
        }
    }

    fn write_new(&self, key: &[u8]) -> Result<(), EnvxError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    EnvxError::io(format!("creating directory {}", parent.display()), e)
                })?;
            }
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = match options.open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(EnvxError::FileExists {
                    location: self.location(),
                });
            }
            Err(e) => return Err(EnvxError::io(format!("creating key {}", self.location()), e)),
        };

        let written = file.write_all(key).and_then(|()| file.sync_all());
        if let Err(e) = written {
            drop(file);
            let _ = std::fs::remove_file(&self.path);
            return Err(EnvxError::io(format!("writing key {}", self.location()), e));
        }
        Ok(())
    }
}

/// A key held in process memory. Useful for tests and embedding.
#[derive(Default)]
pub struct MemoryKeyStore {
    slot: Mutex<Option<Zeroizing<Vec<u8>>>>,
}

impl std::fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKeyStore")
            .field("slot", &"[REDACTED]")
            .finish()
    }
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `key`. Length is not checked.
    pub fn with_key(key: &[u8]) -> Self {
        Self {
            slot: Mutex::new(Some(Zeroizing::new(key.to_vec()))),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<Zeroizing<Vec<u8>>>>, EnvxError> {
        self.slot
            .lock()
            .map_err(|_| EnvxError::Internal("memory key store lock poisoned".to_string()))
    }
}

impl KeyStore for MemoryKeyStore {
    fn location(&self) -> String {
        "<memory>".to_string()
    }

    fn exists(&self) -> Result<bool, EnvxError> {
        Ok(self.lock()?.is_some())
    }

    fn read(&self) -> Result<Zeroizing<Vec<u8>>, EnvxError> {
        self.lock()?.clone().ok_or_else(|| EnvxError::MissingKey {
            location: self.location(),
        })
    }

    fn write_new(&self, key: &[u8]) -> Result<(), EnvxError> {
        let mut slot = self.lock()?;
        if slot.is_some() {
            return Err(EnvxError::FileExists {
                location: self.location(),
            });
        }
        *slot = Some(Zeroizing::new(key.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join(".envx.key"));
        assert!(!store.exists().unwrap());

        store.write_new(&[7u8; 32]).unwrap();
        assert!(store.exists().unwrap());
        assert_eq!(store.read().unwrap().as_slice(), &[7u8; 32]);
    }

    #[test]
    fn file_store_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join(".envx.key"));
        store.write_new(&[1u8; 32]).unwrap();

        let err = store.write_new(&[2u8; 32]).unwrap_err();
        assert!(matches!(err, EnvxError::FileExists { .. }));
        assert_eq!(store.read().unwrap().as_slice(), &[1u8; 32]);
    }

    #[test]
    fn file_store_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("nope.key"));
        let err = store.read().unwrap_err();
        assert!(matches!(
            err,
            EnvxError::MissingKey { ref location } if location.ends_with("nope.key")
        ));
    }

    #[test]
    fn file_store_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("nested/keys/.envx.key"));
        store.write_new(&[3u8; 32]).unwrap();
        assert!(store.exists().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn file_store_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join(".envx.key"));
        store.write_new(&[0u8; 32]).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn file_store_read_does_not_check_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.key");
        std::fs::write(&path, [0u8; 16]).unwrap();
        assert_eq!(FileKeyStore::new(&path).read().unwrap().len(), 16);
    }

    #[test]
    fn memory_store_lifecycle() {
        let store = MemoryKeyStore::new();
        assert!(!store.exists().unwrap());
        assert!(matches!(store.read().unwrap_err(), EnvxError::MissingKey { .. }));

        store.write_new(&[9u8; 32]).unwrap();
        assert_eq!(store.read().unwrap().as_slice(), &[9u8; 32]);
        assert!(matches!(
            store.write_new(&[1u8; 32]).unwrap_err(),
            EnvxError::FileExists { .. }
        ));
    }
}
