// CLI module - command-line argument parsing and handlers
//
// Subcommands:
// - serve (default): run the wire server
// - config --show/--reset/--edit/--path: configuration management
// - keygen: print a fresh secret key
// - sign: sign a state snapshot with the configured key

use crate::codec::SecretKey;
use crate::component::StateSnapshot;
use crate::config::{Config, SecurityConfig, VERSION};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::process::Command;

/// wirebound - server-driven UI components over a signed-state wire protocol
#[derive(Parser, Debug)]
#[command(name = "wirebound")]
#[command(version = VERSION)]
#[command(about = "Server-driven UI components over a signed-state wire protocol", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the wire server (default)
    Serve,

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Open config file in $EDITOR
        #[arg(long)]
        edit: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Print a new random secret key for [security] secret_key
    Keygen,

    /// Sign a state snapshot with the configured key
    Sign {
        /// Component id to tag the token with
        component_id: String,

        /// State snapshot as a JSON object, e.g. '{"count": 3}'
        state: String,
    },
}

/// Handle CLI commands. Returns true if a command was handled (exit after).
pub fn handle_cli() -> Result<bool> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Serve) => Ok(false),
        Some(Commands::Config {
            show,
            reset,
            edit,
            path,
        }) => {
            if path {
                handle_config_path()?;
            } else if show {
                handle_config_show()?;
            } else if reset {
                handle_config_reset()?;
            } else if edit {
                handle_config_edit()?;
            } else {
                println!("Usage: wirebound config [--show|--reset|--edit|--path]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --reset   Reset config file to defaults");
                println!("  --edit    Open config file in $EDITOR");
                println!("  --path    Show config file path");
            }
            Ok(true)
        }
        Some(Commands::Keygen) => {
            let (_, hex) = SecretKey::generate();
            println!("{}", hex);
            Ok(true)
        }
        Some(Commands::Sign {
            component_id,
            state,
        }) => {
            let config = Config::from_env()?;
            println!("{}", sign_state(&config.security, &component_id, &state)?);
            Ok(true)
        }
    }
}

/// Sign `state_json` for `component_id` with the configured key
///
/// A generated key would produce a token no running server accepts, so a
/// configured key is required.
pub fn sign_state(security: &SecurityConfig, component_id: &str, state_json: &str) -> Result<String> {
    if security.secret_key.is_none() {
        bail!("No secret_key configured; set WIREBOUND_SECRET_KEY or [security] secret_key");
    }
    let (codec, _) = security.build_codec()?;

    let state: StateSnapshot =
        serde_json::from_str(state_json).context("State must be a JSON object")?;
    codec
        .serialize(component_id, &state)
        .context("Failed to sign state")
}

fn config_path() -> Result<std::path::PathBuf> {
    Config::config_path().context("Could not determine config path")
}

fn handle_config_path() -> Result<()> {
    println!("{}", config_path()?.display());
    Ok(())
}

fn handle_config_show() -> Result<()> {
    let config = Config::from_env()?;

    println!("# Effective configuration (env > file > defaults)");
    println!();
    println!("bind_addr = {:?}", config.bind_addr.to_string());
    println!("max_body_bytes = {}", config.max_body_bytes);
    println!();
    println!("[security]");
    println!(
        "secret_key = {}",
        if config.security.secret_key.is_some() {
            "<set>"
        } else {
            "<generated at boot>"
        }
    );
    println!("max_token_age_secs = {}", config.security.max_token_age_secs);
    println!();
    println!("[demo]");
    println!("enabled = {}", config.demo.enabled);
    println!();
    println!("[logging]");
    println!("level = {:?}", config.logging.level);
    println!("file_enabled = {}", config.logging.file_enabled);
    println!("file_dir = {:?}", config.logging.file_dir.display().to_string());
    println!("file_rotation = {:?}", config.logging.file_rotation.as_str());
    println!("file_prefix = {:?}", config.logging.file_prefix);

    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
    Ok(())
}

fn handle_config_reset() -> Result<()> {
    let path = config_path()?;

    if path.exists() {
        eprint!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Error creating directory {}", parent.display()))?;
    }

    std::fs::write(&path, Config::default().to_toml())
        .with_context(|| format!("Error writing config {}", path.display()))?;

    println!("Config reset to defaults: {}", path.display());
    Ok(())
}

fn handle_config_edit() -> Result<()> {
    let path = config_path()?;

    if !path.exists() {
        Config::ensure_config_exists();
        println!("Created new config file: {}", path.display());
    }

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| {
            if cfg!(windows) {
                "notepad".to_string()
            } else {
                "nano".to_string()
            }
        });

    println!("Opening {} with {}", path.display(), editor);

    let status = Command::new(&editor).arg(&path).status().with_context(|| {
        format!(
            "Failed to launch editor '{}'; set $EDITOR to your preferred editor",
            editor
        )
    })?;

    if !status.success() {
        bail!("Editor exited with status: {}", status);
    }
    Ok(())
}
