//! Places service: CLI server
//!
//! ```sh
//! # Run with default config (~/.config/places-service/config.toml)
//! places-service
//!
//! # Custom config path
//! places-service --config /etc/places-service/config.toml
//!
//! # Override the port
//! places-service --port 8080
//!
//! # Validate config without starting
//! places-service --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use places_service::config::AppConfig;
use places_service::infrastructure::database::redact_url;
use places_service::server::{init_tracing, ServerHandle, ServerOptions};

/// Places service: REST API for sharing geocoded places with images.
#[derive(Parser, Debug)]
#[command(
    name = "places-service",
    version,
    about = "REST API for sharing places",
    long_about = "Places service: users sign up, then create places whose address is \
                  geocoded and whose image is stored in an object store.\n\n\
                  Default config: ~/.config/places-service/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "PLACES_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(places_service::default_config_path);

    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::from_env(), Some(e)),
    };

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    init_tracing(&config);
    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        config.validate()?;
        println!("Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}", config.server.address());
        println!("   Database    : {}", redact_url(&config.database.connection_url()));
        println!("   Images      : {:?}", config.storage.backend);
        println!("   Log level   : {}", config.logging.level);
        return Ok(());
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await?;

    handle.install_signal_handler();
    info!("Press Ctrl+C to shutdown gracefully.");

    handle.wait().await;

    Ok(())
}
