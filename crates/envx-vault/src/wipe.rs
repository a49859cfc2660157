// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort zeroing of buffers that held secrets.
//!
//! Defense in depth, not a security boundary: copies made by the allocator,
//! the OS or earlier moves are out of reach. Long-lived buffers use
//! [`Zeroizing`] so they are wiped on every exit path, including `?` returns.

use zeroize::{Zeroize, Zeroizing};

/// Zero a byte buffer in place.
pub fn wipe_bytes(buf: &mut [u8]) {
    buf.zeroize();
}

/// Zero a string's full capacity and leave it empty.
pub fn wipe_string(s: &mut String) {
    s.zeroize();
}

/// Take ownership of `bytes` in a guard that zeroes them when dropped.
pub fn scoped(bytes: Vec<u8>) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(bytes)
}

/// Convert authenticated plaintext into a `String`, wiping the bytes if they
/// are not valid UTF-8.
pub fn into_utf8(bytes: Zeroizing<Vec<u8>>) -> Option<String> {
    let mut bytes = bytes;
    match String::from_utf8(std::mem::take(&mut *bytes)) {
        Ok(s) => Some(s),
        Err(e) => {
            let mut raw = e.into_bytes();
            wipe_bytes(&mut raw);
            None
        }
    }
}
