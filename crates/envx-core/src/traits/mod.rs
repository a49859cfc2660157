// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator interfaces consumed by the envx core.

pub mod key_store;

pub use key_store::KeyStore;
