// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! envx - encrypted, commit-safe `.env` files.
//!
//! This is the binary entry point.

mod commands;
mod dotenv;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use envx_vault::KdfAlgorithm;
use tracing::error;

use crate::commands::CommandError;

/// envx - encrypted, commit-safe `.env` files.
#[derive(Parser, Debug)]
#[command(name = "envx", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides `[log] level`.
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new key file.
    Init {
        /// Derive the key from a password (ENVX_PASSWORD or prompt).
        #[arg(long)]
        password: bool,
        /// Key derivation function for --password.
        #[arg(long, value_enum)]
        kdf: Option<KdfArg>,
        /// Key file path.
        #[arg(long, value_name = "PATH")]
        key: Option<PathBuf>,
    },
    /// Encrypt a .env file into a container.
    Encrypt {
        #[arg(long, value_name = "PATH")]
        input: Option<PathBuf>,
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
        #[arg(long, value_name = "PATH")]
        key: Option<PathBuf>,
    },
    /// Decrypt a container back into .env text.
    Decrypt {
        #[arg(long, value_name = "PATH")]
        input: Option<PathBuf>,
        /// Output file, or `-` for stdout (default).
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
        #[arg(long, value_name = "PATH")]
        key: Option<PathBuf>,
        /// Re-derive the key from a password instead of reading the key file.
        #[arg(long)]
        password: bool,
        /// Print names with masked values only.
        #[arg(long)]
        list: bool,
    },
    /// Check a container's structure, and its authenticity when a key is given.
    Verify {
        #[arg(long, value_name = "PATH")]
        input: Option<PathBuf>,
        /// Also decrypt with this key to check authenticity.
        #[arg(long, value_name = "PATH")]
        key: Option<PathBuf>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Re-encrypt a container under a brand new key.
    Rotate {
        /// Path for the new key. Must not exist.
        #[arg(long, value_name = "PATH")]
        new_key: PathBuf,
        #[arg(long, value_name = "PATH")]
        input: Option<PathBuf>,
        /// Defaults to overwriting the input container.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Current key file.
        #[arg(long, value_name = "PATH")]
        key: Option<PathBuf>,
        /// Derive the new key from a password.
        #[arg(long)]
        password: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum KdfArg {
    Argon2id,
    Scrypt,
}

impl From<KdfArg> for KdfAlgorithm {
    fn from(arg: KdfArg) -> Self {
        match arg {
            KdfArg::Argon2id => KdfAlgorithm::Argon2id,
            KdfArg::Scrypt => KdfAlgorithm::Scrypt,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => envx_config::load_and_validate_path(path),
        None => envx_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            envx_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.log.level);
    init_tracing(level);

    let result = match cli.command {
        Commands::Init { password, kdf, key } => {
            commands::init(&config, key, password, kdf.map(Into::into))
        }
        Commands::Encrypt { input, output, key } => commands::encrypt(&config, input, output, key),
        Commands::Decrypt {
            input,
            output,
            key,
            password,
            list,
        } => commands::decrypt(&config, input, output, key, password, list),
        Commands::Verify { input, key, json } => commands::verify(&config, input, key, json),
        Commands::Rotate {
            new_key,
            input,
            output,
            key,
            password,
        } => commands::rotate(&config, new_key, input, output, key, password),
    };

    if let Err(e) = result {
        report_error(&e);
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber on stderr, leaving stdout for output.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("envx={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn report_error(err: &CommandError) {
    use colored::Colorize;

    if let CommandError::Envx(e) = err {
        error!(kind = %e.kind(), context = ?e.context(), "command failed");
    }

    let label = if std::io::stderr().is_terminal() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    };
    let category = err.category();
    let detail = err.to_string();
    eprintln!("{label} {category}");
    if detail != category {
        eprintln!("  {detail}");
    }
}
