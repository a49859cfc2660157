// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password acquisition via TTY prompt or the ENVX_PASSWORD environment variable.

use envx_core::EnvxError;
use secrecy::SecretString;
use zeroize::Zeroizing;

/// The environment variable consulted before prompting.
pub const PASSWORD_ENV_VAR: &str = "ENVX_PASSWORD";

const NO_PASSWORD: &str =
    "no password provided. Set ENVX_PASSWORD or run interactively";

fn from_env() -> Option<SecretString> {
    match std::env::var(PASSWORD_ENV_VAR) {
        Ok(password) if !password.is_empty() => Some(SecretString::from(password)),
        _ => None,
    }
}

fn stdin_is_terminal() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdin())
}

fn read_line(prompt: &str) -> Result<Zeroizing<String>, EnvxError> {
    eprint!("{prompt}");
    rpassword::read_password()
        .map(Zeroizing::new)
        .map_err(|e| EnvxError::io("reading password", e))
}

/// Get a password from `ENVX_PASSWORD` or an interactive prompt.
///
/// Empty passwords are rejected.
pub fn get_password() -> Result<SecretString, EnvxError> {
    if let Some(password) = from_env() {
        return Ok(password);
    }

    if stdin_is_terminal() {
        let password = read_line("Password: ")?;
        if password.is_empty() {
            return Err(EnvxError::KdfFailure("empty password not allowed".to_string()));
        }
        return Ok(SecretString::from(password.to_string()));
    }

    Err(EnvxError::KdfFailure(NO_PASSWORD.to_string()))
}

/// Like [`get_password`], but an interactive prompt asks twice.
///
/// The environment variable is taken as-is without confirmation.
pub fn get_password_with_confirm() -> Result<SecretString, EnvxError> {
    if let Some(password) = from_env() {
        return Ok(password);
    }

    if stdin_is_terminal() {
        let first = read_line("New password: ")?;
        let second = read_line("Confirm password: ")?;
        if *first != *second {
            return Err(EnvxError::KdfFailure("passwords do not match".to_string()));
        }
        if first.is_empty() {
            return Err(EnvxError::KdfFailure("empty password not allowed".to_string()));
        }
        return Ok(SecretString::from(first.to_string()));
    }

    Err(EnvxError::KdfFailure(NO_PASSWORD.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    #[test]
    #[serial]
    fn password_from_env_var() {
        // SAFETY: env mutation is serialized across tests with #[serial].
        unsafe { std::env::set_var(PASSWORD_ENV_VAR, "hunter2") };
        let result = get_password();
        unsafe { std::env::remove_var(PASSWORD_ENV_VAR) };

        assert_eq!(result.unwrap().expose_secret(), "hunter2");
    }

    #[test]
    #[serial]
    fn confirm_from_env_var_skips_prompt() {
        unsafe { std::env::set_var(PASSWORD_ENV_VAR, "hunter2") };
        let result = get_password_with_confirm();
        unsafe { std::env::remove_var(PASSWORD_ENV_VAR) };

        assert!(result.is_ok());
    }

    #[test]
    #[serial]
    fn empty_env_var_is_ignored() {
        unsafe { std::env::set_var(PASSWORD_ENV_VAR, "") };
        let from_env = from_env();
        unsafe { std::env::remove_var(PASSWORD_ENV_VAR) };

        assert!(from_env.is_none());
    }
}
