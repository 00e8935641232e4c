//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.
//! Command-line flags are applied on top in `main.rs`.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use doorbell_core::protocol_constants::{DEFAULT_PORT, DEFAULT_RING_VOLUME};

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Port of the trigger/static HTTP server.
    /// Override: `DOORBELL_PORT`
    pub port: u16,

    /// IP address speakers use to fetch ringtones.
    /// If not specified, auto-detection will be attempted.
    /// Override: `DOORBELL_ADVERTISE_IP`
    pub advertise_ip: Option<IpAddr>,

    /// Directory holding the ringtones; also served over HTTP.
    /// Override: `DOORBELL_MUSIC_DIR`
    pub music_dir: PathBuf,

    /// Directory for the `<zone>_ip.txt` address cache.
    /// Override: `DOORBELL_CACHE_DIR`
    pub cache_dir: PathBuf,

    /// Volume for triggers without a usable `volume` parameter.
    /// Override: `DOORBELL_DEFAULT_VOLUME`
    pub default_volume: u8,

    /// Extra bind attempts while the port is in use.
    /// Override: `DOORBELL_BIND_RETRIES`
    pub bind_retries: u32,

    /// SSDP listening window in milliseconds.
    /// Override: `DOORBELL_DISCOVERY_TIMEOUT_MS`
    pub discovery_timeout_ms: u64,

    /// Enable SSDP multicast discovery.
    pub discovery_ssdp_multicast: bool,

    /// Enable SSDP broadcast discovery.
    pub discovery_ssdp_broadcast: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = doorbell_core::Config::default();
        Self {
            port: DEFAULT_PORT,
            advertise_ip: None,
            music_dir: PathBuf::from("."),
            cache_dir: PathBuf::from("."),
            default_volume: DEFAULT_RING_VOLUME,
            bind_retries: core.bind_retries,
            discovery_timeout_ms: core.discovery_timeout_ms,
            discovery_ssdp_multicast: core.discovery_ssdp_multicast,
            discovery_ssdp_broadcast: core.discovery_ssdp_broadcast,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        // An empty file deserializes to null
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    ///
    /// Unparseable values are ignored with a warning.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(key: &str, value: Option<String>) -> Option<T> {
            let value = value?;
            match value.parse() {
                Ok(parsed) => Some(parsed),
                Err(_) => {
                    log::warn!("Ignoring invalid {}={:?}", key, value);
                    None
                }
            }
        }

        if let Some(port) = parsed("DOORBELL_PORT", var("DOORBELL_PORT")) {
            self.port = port;
        }
        if let Some(ip) = parsed("DOORBELL_ADVERTISE_IP", var("DOORBELL_ADVERTISE_IP")) {
            self.advertise_ip = Some(ip);
        }
        if let Some(dir) = var("DOORBELL_MUSIC_DIR") {
            self.music_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("DOORBELL_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(volume) = parsed("DOORBELL_DEFAULT_VOLUME", var("DOORBELL_DEFAULT_VOLUME")) {
            self.default_volume = volume;
        }
        if let Some(retries) = parsed("DOORBELL_BIND_RETRIES", var("DOORBELL_BIND_RETRIES")) {
            self.bind_retries = retries;
        }
        if let Some(timeout) = parsed(
            "DOORBELL_DISCOVERY_TIMEOUT_MS",
            var("DOORBELL_DISCOVERY_TIMEOUT_MS"),
        ) {
            self.discovery_timeout_ms = timeout;
        }
    }

    /// Converts to doorbell-core's Config type.
    pub fn to_core_config(&self) -> doorbell_core::Config {
        doorbell_core::Config {
            port: self.port,
            bind_retries: self.bind_retries,
            default_volume: self.default_volume,
            discovery_timeout_ms: self.discovery_timeout_ms,
            discovery_ssdp_multicast: self.discovery_ssdp_multicast,
            discovery_ssdp_broadcast: self.discovery_ssdp_broadcast,
            ..Default::default()
        }
    }
}
