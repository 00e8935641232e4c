//! Sonos speaker control and discovery.
//!
//! This module provides functionality for discovering and controlling Sonos speakers
//! on the local network using UPnP/SOAP protocols.
//!
//! # Module Structure
//!
//! - `types` - Domain types for transport state, media info and zone groups
//! - `services` - UPnP service definitions (URNs, paths)
//! - `traits` - Trait abstractions for testability
//! - `client` - `SonosClientImpl` concrete trait implementation
//! - `zone_groups` - Zone group topology parsing and retrieval
//! - `didl` - DIDL-Lite metadata formatting for Sonos display
//! - `playback` - Play, pause, stop, seek and transport queries
//! - `volume` - Per-speaker volume/mute control
//! - `snapshot` - Capture/restore of playback state around a ring
//! - `discovery` - SSDP speaker discovery (multicast + broadcast)
//! - `soap` - Low-level SOAP protocol implementation
//! - `utils` - Shared utility functions

pub mod client;
pub(crate) mod didl;
pub mod discovery;
pub mod playback;
pub(crate) mod retry;
pub mod services;
pub mod snapshot;
pub mod soap;
pub mod traits;
pub mod types;
pub mod utils;
pub(crate) mod volume;
pub(crate) mod zone_groups;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export domain types
pub use services::SonosService;
pub use snapshot::Snapshot;

// Re-export trait abstractions
pub use traits::{SonosDiscovery, SonosRemote};

// Re-export concrete implementation
pub use client::SonosClientImpl;
