//! avsync daemon
//!
//! Supervises the display connection and serves the HTTP control surface.

use anyhow::{Context, Result};
use avsync::core::config::Config;
use avsync::core::state::SharedState;
use avsync::display::WebOsConnector;
use avsync::receiver::{CommandSerializer, OnkyoTransport};
use avsync::rpc::{self, ControlState};
use avsync::supervisor::Supervisor;
use avsync::wol::MagicPacket;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "avsync", about = "Keeps an A/V receiver in step with a webOS display")]
struct Cli {
    /// Config file (defaults to config.toml in the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides [server] listen
    #[arg(long)]
    listen: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default configuration file
    DefaultConfig,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Some(Commands::DefaultConfig) = cli.command {
        print!("{}", Config::default_config_str());
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let shared = Arc::new(SharedState::new());

    let transport = OnkyoTransport::new(config.receiver.address, config.timeouts.connect())
        .context("Failed to create receiver HTTP client")?;
    let serializer = Arc::new(CommandSerializer::new(Arc::new(transport)));

    let connector = WebOsConnector::new(
        config.display.address,
        config.display.client_key.clone(),
        config.timeouts.connect(),
    );
    let supervisor = Supervisor::new(
        Arc::new(connector),
        serializer,
        Arc::clone(&shared),
        config.timeouts.clone(),
    );

    let control = Arc::new(ControlState {
        shared: Arc::clone(&shared),
        waker: Arc::new(MagicPacket),
        display_mac: config.display.mac,
        display_address: config.display.address,
        pc_mac: config.pc.mac,
        display_boot: config.timeouts.display_boot(),
    });
    let app = rpc::router(control);

    // Failing to bind is the one fatal runtime error
    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.listen))?;
    info!("Listening on {}", config.server.listen);

    let shutdown = CancellationToken::new();

    let mut server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
            {
                error!("Server error: {}", e);
            }
        }
    });

    let supervisor_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { supervisor.run(shutdown).await }
    });

    // Wait for shutdown
    tokio::select! {
        _ = &mut server => {}
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Received Ctrl+C, shutting down..."),
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
        }
    }

    shutdown.cancel();
    let _ = supervisor_task.await;
    if !server.is_finished() {
        let _ = server.await;
    }

    info!("avsync exiting");
    Ok(())
}
