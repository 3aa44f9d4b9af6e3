//! dbsc-server: demo HTTP server for Device Bound Session Credentials

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dbsc_server::app::{router, AppState};
use dbsc_server::config::ServerConfig;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "dbsc-server")]
#[command(about = "Demo server for Device Bound Session Credentials")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the login, registration and refresh endpoints
    Serve {
        /// Config file (defaults to the user config dir, then env vars)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Listen address, overriding the config
        #[arg(long)]
        listen: Option<String>,
    },

    /// Validate and print the effective configuration
    CheckConfig {
        /// Config file (defaults to the user config dir, then env vars)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dbsc=info".parse()?)
                .add_directive("dbsc_server=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => run_serve(config, listen).await,
        Commands::CheckConfig { config } => run_check_config(config),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<ServerConfig> {
    let config = match path {
        Some(path) => ServerConfig::from_file(&path)?,
        None => ServerConfig::load()?,
    };
    Ok(config)
}

/// Run the HTTP server until Ctrl+C
async fn run_serve(config: Option<PathBuf>, listen: Option<String>) -> anyhow::Result<()> {
    let mut config = load_config(config)?;
    if let Some(listen) = listen {
        config.listen = listen;
    }
    config.validate()?;

    if !config.dbsc.secure_transport {
        warn!("Secure transport disabled; refresh cookies will not carry the Secure attribute");
    }

    let addr = config.listen_addr()?;
    let app = router(AppState::new(&config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "DBSC demo server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}

/// Validate the configuration and print it as YAML
fn run_check_config(config: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    config.validate()?;
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
