//! Doorbell Core - library behind the Sonos doorbell server.
//!
//! A press on a doorbell button (any HTTP client) plays a ringtone on one
//! Sonos zone, then puts the zone back to whatever it was doing.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`catalog`]: Ringtone scanning, lookup and duration probing
//! - [`services`]: Device resolution, ring state and the ring cycle
//! - [`sonos`]: Sonos speaker control and discovery (UPnP/SOAP, SSDP)
//! - [`api`]: Trigger endpoint, static file serving and server startup
//! - [`bootstrap`]: Composition root wiring the above together
//! - [`context`]: Network configuration and URL building
//! - [`runtime`]: Task spawning abstraction
//! - [`state`]: Core configuration
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - [`IpDetector`](context::IpDetector): Local IP detection
//! - [`AddressStore`](services::AddressStore): Zone address cache
//! - [`DurationProbe`](catalog::DurationProbe): Audio duration extraction
//! - [`SonosRemote`](sonos::SonosRemote): Speaker control, mocked in tests

#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod catalog;
pub mod context;
pub mod error;
pub mod protocol_constants;
pub mod runtime;
pub mod services;
pub mod sonos;
pub mod state;

// Re-export commonly used types at the crate root
pub use catalog::{AudioEntry, Catalog, CatalogError};
pub use context::{
    IpDetector, LocalIpDetector, NetworkContext, NetworkError, UdpProbeIpDetector, UrlBuilder,
};
pub use error::{DoorbellError, DoorbellResult, ErrorCode, TriggerError};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::Config;

// Re-export Sonos types
pub use sonos::discovery::Speaker;
pub use sonos::types::{TransportState, ZoneGroup};
pub use sonos::{SonosClientImpl, SonosDiscovery, SonosRemote, Snapshot};

// Re-export service types
pub use services::{
    DoorbellOrchestrator, FileAddressStore, RingOutcome, SpeakerHandle, UsageError,
};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, BootstrapError, BootstrappedServices};

// Re-export API types
pub use api::{start_server, AppState, ServerError};
