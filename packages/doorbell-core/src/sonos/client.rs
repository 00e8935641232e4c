//! Concrete Sonos client backed by the SOAP and SSDP modules.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::{Arc, OnceLock};

use crate::error::{DiscoveryResult, SoapResult};
use crate::sonos::discovery::{DiscoveryConfig, DiscoveryCoordinator, Speaker};
use crate::sonos::playback::{self, SeekUnit};
use crate::sonos::traits::{SonosDiscovery, SonosPlayback, SonosTopology, SonosVolumeControl};
use crate::sonos::types::{MediaInfo, PositionInfo, TransportState, ZoneGroup};
use crate::sonos::{volume, zone_groups};

/// Concrete implementation of the Sonos client traits.
///
/// Wraps the free functions of the protocol modules so services receive an
/// injectable `Arc<dyn SonosRemote>` or `Arc<dyn SonosDiscovery>`.
pub struct SonosClientImpl {
    /// HTTP client for Sonos communication.
    client: Client,
    /// Discovery coordinator (lazily initialized).
    discovery_coordinator: OnceLock<Arc<DiscoveryCoordinator>>,
    /// Discovery configuration.
    discovery_config: DiscoveryConfig,
}

impl std::fmt::Debug for SonosClientImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonosClientImpl")
            .field("client", &"Client")
            .field("discovery_config", &self.discovery_config)
            .finish()
    }
}

impl SonosClientImpl {
    /// Creates a client with default discovery settings.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_discovery_config(client, DiscoveryConfig::default())
    }

    /// Creates a client with custom discovery settings.
    ///
    /// # Arguments
    /// * `client` - The HTTP client to use for all SOAP communication
    /// * `discovery_config` - Which SSDP methods to run and for how long
    #[must_use]
    pub fn with_discovery_config(client: Client, discovery_config: DiscoveryConfig) -> Self {
        Self {
            client,
            discovery_coordinator: OnceLock::new(),
            discovery_config,
        }
    }

    fn discovery_coordinator(&self) -> &Arc<DiscoveryCoordinator> {
        self.discovery_coordinator
            .get_or_init(|| Arc::new(DiscoveryCoordinator::new(self.discovery_config.clone())))
    }
}

#[async_trait]
impl SonosPlayback for SonosClientImpl {
    async fn play_uri(&self, ip: &str, uri: &str, title: &str) -> SoapResult<()> {
        playback::play_uri(&self.client, ip, uri, title).await
    }

    async fn set_av_transport_uri(&self, ip: &str, uri: &str, metadata: &str) -> SoapResult<()> {
        playback::set_av_transport_uri(&self.client, ip, uri, metadata).await
    }

    async fn play(&self, ip: &str) -> SoapResult<()> {
        playback::play(&self.client, ip).await
    }

    async fn pause(&self, ip: &str) -> SoapResult<()> {
        playback::pause(&self.client, ip).await
    }

    async fn stop(&self, ip: &str) -> SoapResult<()> {
        playback::stop(&self.client, ip).await
    }

    async fn seek(&self, ip: &str, unit: SeekUnit, target: &str) -> SoapResult<()> {
        playback::seek(&self.client, ip, unit, target).await
    }

    async fn get_transport_state(&self, ip: &str) -> SoapResult<TransportState> {
        playback::get_transport_state(&self.client, ip).await
    }

    async fn get_media_info(&self, ip: &str) -> SoapResult<MediaInfo> {
        playback::get_media_info(&self.client, ip).await
    }

    async fn get_position_info(&self, ip: &str) -> SoapResult<PositionInfo> {
        playback::get_position_info(&self.client, ip).await
    }
}

#[async_trait]
impl SonosVolumeControl for SonosClientImpl {
    async fn get_speaker_volume(&self, ip: &str) -> SoapResult<u8> {
        volume::get_speaker_volume(&self.client, ip).await
    }

    async fn set_speaker_volume(&self, ip: &str, level: u8) -> SoapResult<()> {
        volume::set_speaker_volume(&self.client, ip, level).await
    }

    async fn get_speaker_mute(&self, ip: &str) -> SoapResult<bool> {
        volume::get_speaker_mute(&self.client, ip).await
    }

    async fn set_speaker_mute(&self, ip: &str, mute: bool) -> SoapResult<()> {
        volume::set_speaker_mute(&self.client, ip, mute).await
    }
}

#[async_trait]
impl SonosTopology for SonosClientImpl {
    async fn get_zone_groups(&self, ip: &str) -> SoapResult<Vec<ZoneGroup>> {
        zone_groups::get_zone_groups(&self.client, ip).await
    }
}

#[async_trait]
impl SonosDiscovery for SonosClientImpl {
    async fn discover_speakers(&self) -> DiscoveryResult<Vec<Speaker>> {
        self.discovery_coordinator().discover_speakers().await
    }
}
