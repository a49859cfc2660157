// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atomic file replacement.

use std::io::Write;
use std::path::Path;

use envx_core::EnvxError;

/// Write `contents` to `path` by writing a temp file in the same directory
/// and renaming it over the destination.
///
/// The temp file is created with mode `0600` on unix, so plaintext written
/// this way is never world-readable, even briefly.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), EnvxError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let location = path.display().to_string();

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| EnvxError::io(format!("creating temp file next to {location}"), e))?;
    tmp.write_all(contents)
        .map_err(|e| EnvxError::io(format!("writing {location}"), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| EnvxError::io(format!("syncing {location}"), e))?;
    tmp.persist(path)
        .map_err(|e| EnvxError::io(format!("replacing {location}"), e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, b"old").unwrap();

        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[cfg(unix)]
    #[test]
    fn written_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        write_atomic(&path, b"A=1\n").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
