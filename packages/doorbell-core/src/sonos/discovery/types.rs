//! Shared types for Sonos speaker discovery.

use serde::Serialize;
use thiserror::Error;

/// Discovery method identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryMethod {
    /// SSDP multicast to 239.255.255.250:1900
    SsdpMulticast,
    /// SSDP broadcast (directed per-interface + limited 255.255.255.255)
    SsdpBroadcast,
}

impl std::fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SsdpMulticast => write!(f, "SSDP multicast"),
            Self::SsdpBroadcast => write!(f, "SSDP broadcast"),
        }
    }
}

/// Errors that can occur during discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Failed to bind UDP socket for discovery.
    #[error("failed to bind UDP socket: {0}")]
    SocketBind(#[source] std::io::Error),

    /// No usable network interfaces found.
    #[error("no usable network interfaces found")]
    NoInterfaces,

    /// Every enabled discovery method was disabled or failed.
    #[error("all discovery methods failed: {}", format_failures(.0))]
    AllMethodsFailed(Vec<(DiscoveryMethod, String)>),
}

fn format_failures(failures: &[(DiscoveryMethod, String)]) -> String {
    if failures.is_empty() {
        return "no method enabled".to_string();
    }
    failures
        .iter()
        .map(|(method, reason)| format!("{}: {}", method, reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenient Result alias for speaker discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// A discovered Sonos speaker with resolved metadata.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Speaker {
    /// IP address of the speaker.
    pub ip: String,
    /// Room (zone) name as configured in the Sonos app.
    pub name: String,
    /// Canonical UUID (normalized RINCON_xxx).
    pub uuid: String,
    /// Model name (e.g., "Sonos One").
    #[serde(rename = "modelName", skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

/// A raw SSDP responder, before its device description is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSpeaker {
    /// Source IP of the SSDP response.
    pub ip: String,
    /// UUID from the USN header (may need normalization).
    pub uuid: String,
    /// SSDP LOCATION URL if present (authoritative for device description).
    pub location: Option<String>,
}

/// Device information parsed from a device description document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Raw UDN (`uuid:RINCON_xxx`).
    pub uuid: String,
    /// Room name, falling back to the UPnP friendly name.
    pub room_name: String,
    /// Model name (e.g., "Sonos Arc").
    pub model_name: Option<String>,
}

/// Normalizes a Sonos UUID to canonical form for deduplication.
///
/// Handles the shapes seen in the wild:
/// - `uuid:` prefix (from UPnP UDN)
/// - `::urn:schemas-upnp-org:device:ZonePlayer:1` suffix (from USN)
/// - `_MS`, `_MR`, `_LR` subdevice suffixes
pub fn normalize_uuid(raw: &str) -> String {
    let mut uuid = raw.trim();
    uuid = uuid.strip_prefix("uuid:").unwrap_or(uuid);
    if let Some(idx) = uuid.find("::") {
        uuid = &uuid[..idx];
    }
    while let Some(stripped) = ["_MS", "_MR", "_LR"]
        .iter()
        .find_map(|suffix| uuid.strip_suffix(suffix))
    {
        uuid = stripped;
    }
    uuid.to_string()
}

/// Virtual interface prefixes to filter out during discovery.
pub const VIRTUAL_INTERFACE_PREFIXES: &[&str] = &[
    "lo", "docker", "veth", "br-", "virbr", "vmnet", "vbox", "tun", "tap",
];

/// Checks if an interface name belongs to a virtual/container interface.
pub fn is_virtual_interface(name: &str) -> bool {
    let name_lower = name.to_lowercase();
    VIRTUAL_INTERFACE_PREFIXES
        .iter()
        .any(|prefix| name_lower.starts_with(prefix))
}
