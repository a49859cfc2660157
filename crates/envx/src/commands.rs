// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `envx` subcommand implementations.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use envx_config::EnvxConfig;
use envx_vault::{
    Container, Envx, EnvxError, FileKeyStore, KdfAlgorithm, KdfMetadata, KdfSettings, KeyMode,
    SecretSet, VerifyReport, decrypt_with_password, get_password, get_password_with_confirm,
    mask_secret,
};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use crate::dotenv;

/// Suffix of the file recording how a key was produced.
const KDF_SIDECAR_SUFFIX: &str = ".kdf.json";

/// Errors surfaced by the CLI.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Envx(#[from] EnvxError),

    #[error("{path}: {source}")]
    Dotenv {
        path: String,
        #[source]
        source: dotenv::ParseError,
    },

    #[error("container did not verify")]
    NotVerified,
}

impl CommandError {
    /// Short human-readable category printed on failure.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Envx(e) => e.category(),
            Self::Dotenv { .. } => "invalid .env file",
            Self::NotVerified => "verification failed",
        }
    }
}

/// `envx init`
pub fn init(
    config: &EnvxConfig,
    key: Option<PathBuf>,
    password: bool,
    algorithm: Option<KdfAlgorithm>,
) -> Result<(), CommandError> {
    let key_path = key_path(config, key);
    let mut settings = KdfSettings::from_config(&config.kdf);
    if let Some(algorithm) = algorithm {
        settings = settings.with_algorithm(algorithm);
    }

    let envx = Envx::open(&key_path).with_kdf_settings(settings);
    let mode = if password {
        KeyMode::Password(get_password_with_confirm()?)
    } else {
        KeyMode::Random
    };

    let kdf = envx.init(&mode)?;
    write_kdf_sidecar(&key_path, &kdf)?;

    println!("created key {} ({})", key_path.display(), describe_kdf(&kdf));
    println!("keep this file out of version control");
    Ok(())
}

/// `envx encrypt`
pub fn encrypt(
    config: &EnvxConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    key: Option<PathBuf>,
) -> Result<(), CommandError> {
    let input = input.unwrap_or_else(|| PathBuf::from(&config.files.input));
    let output = output.unwrap_or_else(|| PathBuf::from(&config.files.output));
    if input == output {
        return Err(EnvxError::Config(format!(
            "input and output are the same file: {}",
            input.display()
        ))
        .into());
    }
    let key_path = key_path(config, key);

    let secrets = read_dotenv(&input)?;
    let kdf = read_kdf_sidecar(&key_path)?;
    let container = Envx::open(&key_path).encrypt(&secrets, &kdf)?;
    container.write_atomic(&output)?;

    println!(
        "encrypted {} variables from {} to {}",
        container.len(),
        input.display(),
        output.display()
    );
    Ok(())
}

/// `envx decrypt`
///
/// Writes `.env` text to `output` (mode 0600), or to stdout when `output`
/// is absent or `-`. With `list`, prints names and masked values instead.
pub fn decrypt(
    config: &EnvxConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    key: Option<PathBuf>,
    password: bool,
    list: bool,
) -> Result<(), CommandError> {
    let input = input.unwrap_or_else(|| PathBuf::from(&config.files.output));
    let container = Container::read(&input)?;

    let secrets = if password {
        decrypt_with_password(&container, &get_password()?)?
    } else {
        Envx::open(key_path(config, key)).decrypt(&container)?
    };

    if list {
        for (name, value) in secrets.iter() {
            println!("{name}={}", mask_secret(value));
        }
        return Ok(());
    }

    let rendered = Zeroizing::new(dotenv::render(&secrets));
    match output {
        Some(path) if path.as_os_str() != "-" => {
            envx_vault::fs::write_atomic(&path, rendered.as_bytes())?;
            eprintln!("decrypted {} variables to {}", secrets.len(), path.display());
        }
        _ => print!("{}", rendered.as_str()),
    }
    Ok(())
}

/// `envx verify`
///
/// Structural only unless a key is given. Fails when the report is not valid.
pub fn verify(
    config: &EnvxConfig,
    input: Option<PathBuf>,
    key: Option<PathBuf>,
    json: bool,
) -> Result<(), CommandError> {
    let input = input.unwrap_or_else(|| PathBuf::from(&config.files.output));
    let bytes = std::fs::read(&input)
        .map_err(|e| EnvxError::io(format!("reading container {}", input.display()), e))?;

    let report = match key {
        Some(key) => Envx::open(key).verify_authentic(&bytes)?,
        None => envx_vault::verify(&bytes),
    };

    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| EnvxError::Internal(format!("failed to serialize report: {e}")))?;
        println!("{rendered}");
    } else {
        print_report(&input, &report);
    }

    if report.valid {
        Ok(())
    } else {
        Err(CommandError::NotVerified)
    }
}

/// `envx rotate`
pub fn rotate(
    config: &EnvxConfig,
    new_key: PathBuf,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    key: Option<PathBuf>,
    password: bool,
) -> Result<(), CommandError> {
    let input = input.unwrap_or_else(|| PathBuf::from(&config.files.output));
    let output = output.unwrap_or_else(|| input.clone());
    let container = Container::read(&input)?;

    let envx = Envx::open(key_path(config, key))
        .with_kdf_settings(KdfSettings::from_config(&config.kdf));
    let new_store = FileKeyStore::new(&new_key);
    let mode = if password {
        KeyMode::Password(get_password_with_confirm()?)
    } else {
        KeyMode::Random
    };

    let rotated = envx.rotate_key(&container, &new_store, &mode)?;
    write_kdf_sidecar(&new_key, rotated.kdf())?;
    rotated.write_atomic(&output)?;

    println!(
        "rotated {} variables to key {} ({}), wrote {}",
        rotated.len(),
        new_key.display(),
        describe_kdf(rotated.kdf()),
        output.display()
    );
    Ok(())
}

fn key_path(config: &EnvxConfig, key: Option<PathBuf>) -> PathBuf {
    key.unwrap_or_else(|| PathBuf::from(&config.key.path))
}

fn read_dotenv(path: &Path) -> Result<SecretSet, CommandError> {
    let text = Zeroizing::new(
        std::fs::read_to_string(path)
            .map_err(|e| EnvxError::io(format!("reading {}", path.display()), e))?,
    );
    let entries = dotenv::parse(&text).map_err(|source| CommandError::Dotenv {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), entries = entries.len(), "parsed .env file");
    Ok(entries.into_iter().collect())
}

/// `<key path>.kdf.json`, next to the key.
pub fn kdf_sidecar_path(key_path: &Path) -> PathBuf {
    let mut name = key_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(KDF_SIDECAR_SUFFIX);
    key_path.with_file_name(name)
}

fn write_kdf_sidecar(key_path: &Path, kdf: &KdfMetadata) -> Result<(), EnvxError> {
    let mut json = serde_json::to_string_pretty(kdf)
        .map_err(|e| EnvxError::Internal(format!("failed to serialize kdf metadata: {e}")))?;
    json.push('\n');
    envx_vault::fs::write_atomic(&kdf_sidecar_path(key_path), json.as_bytes())
}

/// KDF metadata recorded at init time, or `None` when no sidecar exists.
fn read_kdf_sidecar(key_path: &Path) -> Result<KdfMetadata, EnvxError> {
    let path = kdf_sidecar_path(key_path);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(KdfMetadata::None),
        Err(e) => return Err(EnvxError::io(format!("reading {}", path.display()), e)),
    };
    serde_json::from_slice(&bytes)
        .map_err(|e| EnvxError::Config(format!("invalid key metadata {}: {e}", path.display())))
}

fn describe_kdf(kdf: &KdfMetadata) -> &'static str {
    match kdf {
        KdfMetadata::None => "random",
        KdfMetadata::Argon2id { .. } => "password, argon2id",
        KdfMetadata::Scrypt { .. } => "password, scrypt",
    }
}

fn print_report(input: &Path, report: &VerifyReport) {
    use colored::Colorize;

    let use_color = std::io::stdout().is_terminal();
    let mark = |ok: bool| -> String {
        match (ok, use_color) {
            (true, true) => "✓".green().to_string(),
            (false, true) => "✗".red().to_string(),
            (true, false) => "[OK]  ".to_string(),
            (false, false) => "[FAIL]".to_string(),
        }
    };

    let first = report.details.first().map(String::as_str).unwrap_or("");
    let last = report.details.last().map(String::as_str).unwrap_or("");

    println!("  {}", input.display());
    println!("    {} {:<14} {first}", mark(report.structural), "structure");
    match report.authenticated {
        Some(ok) => println!("    {} {:<14} {last}", mark(ok), "authenticity"),
        None if report.structural => println!(
            "    {:<6} {:<14} not checked (pass --key to decrypt)",
            "-", "authenticity"
        ),
        None => {}
    }
    println!("  {}", report.summary());
}
