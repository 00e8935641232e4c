//! Sonos Doorbell - plays a ringtone on a Sonos zone when a button is pressed.
//!
//! The server resolves the zone once at startup, then waits for
//! `GET /doorbell_press` requests and serves the ringtone files to the
//! speaker from the same port.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use doorbell_core::{
    bootstrap_services, start_server, NetworkContext, UdpProbeIpDetector, UsageError,
};
use tokio::signal;

use crate::config::ServerConfig;

/// Sonos Doorbell - ring a Sonos zone over HTTP.
#[derive(Parser, Debug)]
#[command(name = "sonos-doorbell")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Name of the Sonos zone (room) to ring on.
    zone: String,

    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "DOORBELL_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Listening port (overrides config file).
    #[arg(short = 'p', long, env = "DOORBELL_PORT")]
    port: Option<u16>,

    /// IP address speakers use to reach this server (overrides config file).
    #[arg(short = 'i', long = "ip", env = "DOORBELL_ADVERTISE_IP")]
    advertise_ip: Option<std::net::IpAddr>,

    /// Directory holding the ringtones (overrides config file).
    #[arg(short = 'm', long, env = "DOORBELL_MUSIC_DIR")]
    music_dir: Option<PathBuf>,

    /// Directory for the zone address cache (overrides config file).
    #[arg(long, env = "DOORBELL_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<UsageError>() {
            Some(usage) => {
                log::error!("{}", usage);
                ExitCode::from(usage.exit_code())
            }
            None => {
                log::error!("{:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(args: Args) -> Result<()> {
    log::info!("Sonos Doorbell v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(ip) = args.advertise_ip {
        config.advertise_ip = Some(ip);
    }
    if let Some(dir) = args.music_dir {
        config.music_dir = dir;
    }
    if let Some(dir) = args.cache_dir {
        config.cache_dir = dir;
    }

    // Resolve advertise IP: use explicit config, or fall back to auto-detection
    let network = if let Some(ip) = config.advertise_ip {
        log::info!("Configuration: port={}, advertise_ip={}", config.port, ip);
        NetworkContext::explicit(config.port, ip)
    } else {
        log::info!("Configuration: port={}, advertise_ip=auto", config.port);
        NetworkContext::auto_detect(config.port, UdpProbeIpDetector::arc()).context(
            "Failed to auto-detect local IP address. \
             Please specify --ip or set DOORBELL_ADVERTISE_IP to the IP \
             address that Sonos speakers can reach.",
        )?
    };

    let services = bootstrap_services(config.to_core_config(), &config.music_dir, network)
        .context("Failed to bootstrap services")?;

    // Usage errors pass through unwrapped so main can pick the exit code
    let device = services
        .resolve_device(&args.zone, &config.cache_dir)
        .await?;

    let app_state = services.into_app_state(device);
    start_server(app_state, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn cli_accepts_short_flags() {
        let args = Args::try_parse_from([
            "sonos-doorbell",
            "Living Room",
            "-p",
            "9000",
            "-i",
            "192.168.1.5",
            "-m",
            "/srv/bells",
        ])
        .expect("args");
        assert_eq!(args.zone, "Living Room");
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.music_dir, Some(PathBuf::from("/srv/bells")));
    }

    #[test]
    fn cli_requires_zone() {
        assert!(Args::try_parse_from(["sonos-doorbell"]).is_err());
    }
}
