// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for envx.
//!
//! Holds the error taxonomy shared by every envx crate and the collaborator
//! traits the cryptographic core depends on.

pub mod error;
pub mod traits;

pub use error::{DecryptFailure, EnvxError, ErrorKind};
pub use traits::KeyStore;
