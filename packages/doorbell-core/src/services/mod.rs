//! Application services layer.
//!
//! This module contains the business logic that sits between the HTTP API
//! and the Sonos control layer (sonos/).

pub mod device_resolver;
pub mod doorbell;
pub mod ring_state;

pub use device_resolver::{
    check_coordinator, AddressStore, DeviceResolver, FileAddressStore, MemoryAddressStore,
    SpeakerHandle, UsageError,
};
pub use doorbell::{DoorbellOrchestrator, RingOutcome};
pub use ring_state::{RingGuard, RingState};
