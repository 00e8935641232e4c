//! Fixed protocol constants that should NOT be changed.
//!
//! These values are either defined by external specifications (UPnP, Sonos)
//! or are part of the doorbell's public HTTP contract that existing
//! integrations (home automation buttons, scripts) depend on.

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Trigger Contract
// ─────────────────────────────────────────────────────────────────────────────

/// Path of the trigger endpoint.
pub const TRIGGER_PATH: &str = "/doorbell_press";

/// Default HTTP port for the trigger server.
pub const DEFAULT_PORT: u16 = 8888;

/// Volume used when the request does not carry a usable `volume` parameter.
pub const DEFAULT_RING_VOLUME: u8 = 40;

/// Upper bound of the Sonos volume scale.
pub const MAX_VOLUME: u8 = 100;

/// Delay between attempts to bind the listener when the port is in use (seconds).
pub const BIND_RETRY_DELAY_SECS: u64 = 3;

// ─────────────────────────────────────────────────────────────────────────────
// Sonos / UPnP
// ─────────────────────────────────────────────────────────────────────────────

/// Timeout for SOAP HTTP requests (seconds).
///
/// 10 seconds is reasonable for LAN operations.
pub const SOAP_TIMEOUT_SECS: u64 = 10;

/// Title shown on the Sonos controller while the doorbell plays.
pub const DOORBELL_TITLE: &str = "Doorbell";

/// URI scheme used by Sonos home theater speakers for the TV/HDMI input.
pub const TV_INPUT_URI_PREFIX: &str = "x-sonos-htastream:";

/// URI scheme of a speaker's local queue.
pub const QUEUE_URI_PREFIX: &str = "x-rincon-queue:";

/// Marker present in the queue metadata of cloud-controlled queues
/// (Spotify Connect, Sonos app "cloud" queues).
pub const CLOUD_QUEUE_MARKER: &str = "x-sonos-vli:";

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

/// Suffix of the per-zone address cache file (`<zone>_ip.txt`).
pub const ADDRESS_CACHE_SUFFIX: &str = "_ip.txt";

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used in protocol data (DIDL-Lite metadata).
pub const APP_NAME: &str = "Sonos Doorbell";
