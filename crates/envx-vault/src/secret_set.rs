// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plaintext name/value secrets, wiped when dropped.

use std::collections::BTreeMap;

use crate::wipe::wipe_string;

/// A mapping from variable name to plaintext value.
///
/// Names and values are zeroized when the set is dropped, and a value that
/// gets replaced by [`SecretSet::insert`] is zeroized immediately. `Debug`
/// prints names only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretSet {
    entries: BTreeMap<String, String>,
}

impl SecretSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if let Some(mut previous) = self.entries.insert(name.into(), value.into()) {
            wipe_string(&mut previous);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Variable names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(name, value)` pairs in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Drop for SecretSet {
    fn drop(&mut self) {
        for (mut name, mut value) in std::mem::take(&mut self.entries) {
            wipe_string(&mut name);
            wipe_string(&mut value);
        }
    }
}

impl std::fmt::Debug for SecretSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.keys().map(|k| (k, "[REDACTED]")))
            .finish()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for SecretSet {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut set = SecretSet::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

impl<N: Into<String>, V: Into<String>> Extend<(N, V)> for SecretSet {
    fn extend<I: IntoIterator<Item = (N, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}
