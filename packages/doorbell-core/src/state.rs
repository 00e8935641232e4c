//! Core configuration.
//!
//! [`Config`] holds every tunable of the doorbell core. The server binary
//! builds it from its YAML file, environment and CLI; all fields default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{DEFAULT_PORT, DEFAULT_RING_VOLUME, MAX_VOLUME};
use crate::sonos::discovery::ssdp::SsdpConfig;
use crate::sonos::discovery::DiscoveryConfig;

/// Configuration for the doorbell.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    // Server
    /// Port of the trigger/static HTTP server.
    pub port: u16,

    /// Extra attempts to bind the port when it is in use (3 s apart).
    pub bind_retries: u32,

    // Ringing
    /// Volume used when a trigger carries no usable `volume` parameter.
    pub default_volume: u8,

    // Discovery
    /// Total SSDP listening window (milliseconds).
    pub discovery_timeout_ms: u64,

    /// Number of M-SEARCH packets to send during discovery.
    pub ssdp_send_count: u64,

    /// Delay between M-SEARCH packet retries (milliseconds).
    pub ssdp_retry_delay_ms: u64,

    /// Enable SSDP multicast discovery.
    pub discovery_ssdp_multicast: bool,

    /// Enable SSDP broadcast discovery.
    pub discovery_ssdp_broadcast: bool,

    /// Timeout for fetching one device description (milliseconds).
    pub description_fetch_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_retries: 0,
            default_volume: DEFAULT_RING_VOLUME,
            discovery_timeout_ms: 5000,
            ssdp_send_count: 3,
            ssdp_retry_delay_ms: 800,
            discovery_ssdp_multicast: true,
            discovery_ssdp_broadcast: true,
            description_fetch_timeout_ms: 2000,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_volume > MAX_VOLUME {
            return Err(format!(
                "default_volume must be <= {} (got {})",
                MAX_VOLUME, self.default_volume
            ));
        }
        if self.ssdp_send_count == 0 {
            return Err("ssdp_send_count must be >= 1".to_string());
        }
        if self.discovery_timeout_ms == 0 {
            return Err("discovery_timeout_ms must be >= 1".to_string());
        }
        Ok(())
    }

    /// Builds the discovery settings from this configuration.
    #[must_use]
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            ssdp_multicast_enabled: self.discovery_ssdp_multicast,
            ssdp_broadcast_enabled: self.discovery_ssdp_broadcast,
            ssdp: SsdpConfig {
                send_count: self.ssdp_send_count,
                retry_delay: Duration::from_millis(self.ssdp_retry_delay_ms),
                discovery_timeout: Duration::from_millis(self.discovery_timeout_ms),
                ..SsdpConfig::default()
            },
            description_fetch_timeout: Duration::from_millis(self.description_fetch_timeout_ms),
            ..DiscoveryConfig::default()
        }
    }
}
