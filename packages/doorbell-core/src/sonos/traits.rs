//! Trait abstractions for Sonos operations.
//!
//! The doorbell, the snapshot driver and startup validation depend on these
//! traits rather than on `SonosClientImpl`, so tests can substitute mocks.

use async_trait::async_trait;

use crate::error::{DiscoveryResult, SoapResult};
use crate::sonos::discovery::Speaker;
use crate::sonos::playback::SeekUnit;
use crate::sonos::types::{MediaInfo, PositionInfo, TransportState, ZoneGroup};

/// Trait for Sonos transport (AVTransport) operations.
#[async_trait]
pub trait SonosPlayback: Send + Sync {
    /// Loads `uri` with DIDL-Lite metadata titled `title` and starts playback.
    ///
    /// # Arguments
    /// * `ip` - IP address of the Sonos speaker (must be a group coordinator)
    /// * `uri` - HTTP URL of the audio file
    /// * `title` - Title shown on Sonos controllers
    async fn play_uri(&self, ip: &str, uri: &str, title: &str) -> SoapResult<()>;

    /// Sets the transport source without starting playback.
    async fn set_av_transport_uri(&self, ip: &str, uri: &str, metadata: &str) -> SoapResult<()>;

    /// Starts or resumes playback of the loaded source.
    async fn play(&self, ip: &str) -> SoapResult<()>;

    /// Pauses playback.
    async fn pause(&self, ip: &str) -> SoapResult<()>;

    /// Stops playback.
    async fn stop(&self, ip: &str) -> SoapResult<()>;

    /// Seeks by track number or relative time within the loaded source.
    async fn seek(&self, ip: &str, unit: SeekUnit, target: &str) -> SoapResult<()>;

    /// Gets the current transport state.
    async fn get_transport_state(&self, ip: &str) -> SoapResult<TransportState>;

    /// Gets the URI and metadata of the loaded source.
    async fn get_media_info(&self, ip: &str) -> SoapResult<MediaInfo>;

    /// Gets the current track number and position.
    async fn get_position_info(&self, ip: &str) -> SoapResult<PositionInfo>;
}

/// Trait for per-speaker volume and mute control.
#[async_trait]
pub trait SonosVolumeControl: Send + Sync {
    /// Gets the speaker volume (0-100).
    async fn get_speaker_volume(&self, ip: &str) -> SoapResult<u8>;

    /// Sets the speaker volume (0-100, values > 100 are clamped).
    async fn set_speaker_volume(&self, ip: &str, volume: u8) -> SoapResult<()>;

    /// Gets the speaker mute state.
    async fn get_speaker_mute(&self, ip: &str) -> SoapResult<bool>;

    /// Sets the speaker mute state.
    async fn set_speaker_mute(&self, ip: &str, mute: bool) -> SoapResult<()>;
}

/// Trait for Sonos topology operations.
#[async_trait]
pub trait SonosTopology: Send + Sync {
    /// Fetches the current zone groups from a Sonos speaker.
    ///
    /// # Arguments
    /// * `ip` - IP address of any Sonos speaker on the network
    async fn get_zone_groups(&self, ip: &str) -> SoapResult<Vec<ZoneGroup>>;
}

/// Trait for Sonos speaker discovery operations.
#[async_trait]
pub trait SonosDiscovery: Send + Sync {
    /// Discovers Sonos speakers on the local network using SSDP.
    async fn discover_speakers(&self) -> DiscoveryResult<Vec<Speaker>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Combined Traits (for trait objects)
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a ring cycle needs: transport, volume and topology.
pub trait SonosRemote: SonosPlayback + SonosVolumeControl + SonosTopology {}

impl<T: SonosPlayback + SonosVolumeControl + SonosTopology> SonosRemote for T {}
