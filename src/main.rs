// wirebound - server-driven UI components over a signed-state wire protocol
//
// Boot sequence: CLI -> config -> logging -> signing key -> registry -> server.
// Ctrl-C triggers a graceful shutdown.

use anyhow::Result;
use std::sync::Arc;
use wirebound::config::Config;
use wirebound::wire::{start_server, WireState};
use wirebound::{cli, demo, logging, startup, Registry};

#[tokio::main]
async fn main() -> Result<()> {
    // Handle CLI commands first (config, keygen, sign); exit if one ran
    if cli::handle_cli()? {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let config = Config::from_env()?;

    // The guard must be kept alive for the duration of the program to flush logs
    let _file_guard = logging::init(&config.logging)?;

    let (codec, key_source) = config.security.build_codec()?;
    let registry = Registry::new(codec);
    if config.demo.enabled {
        demo::register_all(&registry);
    }

    let components = registry.factory_names();
    startup::print_startup(&config, key_source, &components);
    tracing::debug!(?key_source, components = ?components, "Registry ready");

    let state = WireState::new(Arc::new(registry)).with_max_body_bytes(config.max_body_bytes);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let mut server = tokio::spawn(start_server(config.bind_addr, state, shutdown_rx));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down...");
        }
        // The server only stops on its own when it fails (bind error, etc.)
        joined = &mut server => {
            return joined?;
        }
    }

    // If the send fails, the server has already stopped
    let _ = shutdown_tx.send(());
    server.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
