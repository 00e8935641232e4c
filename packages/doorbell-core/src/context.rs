//! Network configuration context for the trigger server.
//!
//! This module provides [`NetworkContext`] which bundles the listening port
//! and the address speakers use to fetch audio files. It supports both
//! explicit configuration (`--ip`) and auto-detection.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::Arc;

/// Network configuration shared across services.
///
/// # Modes
///
/// - **Explicit**: the advertise IP is given in configuration.
///   Use [`NetworkContext::explicit`].
/// - **Auto-detect**: the IP is detected once at startup.
///   Use [`NetworkContext::auto_detect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkContext {
    port: u16,
    advertise_ip: IpAddr,
}

impl NetworkContext {
    /// Creates a `NetworkContext` with explicit configuration.
    ///
    /// # Arguments
    ///
    /// * `port` - Port the trigger server listens on.
    /// * `advertise_ip` - IP address that Sonos speakers can reach us at.
    #[must_use]
    pub fn explicit(port: u16, advertise_ip: IpAddr) -> Self {
        Self { port, advertise_ip }
    }

    /// Creates a `NetworkContext` with an auto-detected advertise IP.
    ///
    /// # Errors
    ///
    /// Returns an error if IP detection fails.
    pub fn auto_detect(port: u16, ip_detector: Arc<dyn IpDetector>) -> Result<Self, NetworkError> {
        let advertise_ip = ip_detector.detect()?;
        log::info!("[Server] Detected local IP {}", advertise_ip);
        Ok(Self::explicit(port, advertise_ip))
    }

    /// Creates a `NetworkContext` for testing with a fixed IP.
    #[cfg(test)]
    pub fn for_test() -> Self {
        Self::explicit(8888, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 5)))
    }

    /// Returns the listening port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the advertised IP.
    #[must_use]
    pub fn advertise_ip(&self) -> IpAddr {
        self.advertise_ip
    }

    /// Returns a `UrlBuilder` for the current network configuration.
    #[must_use]
    pub fn url_builder(&self) -> UrlBuilder {
        UrlBuilder::new(self.advertise_ip.to_string(), self.port)
    }
}

/// Trait for detecting the local IP address.
///
/// Different environments may need different detection strategies.
/// This trait allows injecting the appropriate detector.
pub trait IpDetector: Send + Sync {
    /// Detects the local IP address.
    fn detect(&self) -> Result<IpAddr, NetworkError>;
}

/// Detects the IP of the interface that routes to the internet.
///
/// "Connecting" a UDP socket sends nothing; it only asks the OS which
/// source address it would use. Falls back to [`LocalIpDetector`] on hosts
/// without a default route.
#[derive(Debug, Clone, Default)]
pub struct UdpProbeIpDetector;

impl UdpProbeIpDetector {
    /// Address used to pick the outbound interface.
    const PROBE_TARGET: (Ipv4Addr, u16) = (Ipv4Addr::new(8, 8, 8, 8), 80);

    /// Creates a new detector wrapped in an Arc.
    #[must_use]
    pub fn arc() -> Arc<dyn IpDetector> {
        Arc::new(Self)
    }

    fn probe() -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(Self::PROBE_TARGET)?;
        Ok(socket.local_addr()?.ip())
    }
}

impl IpDetector for UdpProbeIpDetector {
    fn detect(&self) -> Result<IpAddr, NetworkError> {
        match Self::probe() {
            Ok(ip) if !ip.is_unspecified() => Ok(ip),
            Ok(_) => LocalIpDetector.detect(),
            Err(e) => {
                log::debug!("[Server] UDP route probe failed ({}), using interface list", e);
                LocalIpDetector.detect()
            }
        }
    }
}

/// IP detector using the system's network interfaces.
#[derive(Debug, Clone, Default)]
pub struct LocalIpDetector;

impl IpDetector for LocalIpDetector {
    fn detect(&self) -> Result<IpAddr, NetworkError> {
        local_ip_address::local_ip().map_err(|e| NetworkError::Detection(e.to_string()))
    }
}

/// Errors that can occur during network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Could not detect local IP address.
    #[error("Failed to detect local IP: {0}")]
    Detection(String),
}

/// Builder for URLs that speakers fetch from this server.
pub struct UrlBuilder {
    ip: String,
    port: u16,
}

impl UrlBuilder {
    /// Creates a new `UrlBuilder` for the given server address.
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    /// Returns the base URL for the server (e.g., `http://192.168.1.100:8888`).
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }

    /// Returns the URL of a catalog file.
    ///
    /// `relative_path` must already be percent-encoded.
    #[must_use]
    pub fn media_url(&self, relative_path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url(),
            relative_path.trim_start_matches('/')
        )
    }
}
