//! Shared test doubles for the Sonos traits.
//!
//! `MockSonos` answers every query from canned state and records each
//! command as a short string (`"pause"`, `"set_volume:40"`...) so tests can
//! assert on the exact call sequence of a ring cycle.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{DiscoveryResult, SoapResult};
use crate::sonos::discovery::{DiscoveryError, Speaker};
use crate::sonos::playback::SeekUnit;
use crate::sonos::soap::SoapError;
use crate::sonos::traits::{SonosDiscovery, SonosPlayback, SonosTopology, SonosVolumeControl};
use crate::sonos::types::{MediaInfo, PositionInfo, TransportState, ZoneGroup, ZoneGroupMember};

pub const TEST_IP: &str = "192.168.1.50";
pub const TEST_UUID: &str = "RINCON_TEST01400";

pub struct MockSonos {
    calls: Mutex<Vec<String>>,
    pub transport_state: Mutex<TransportState>,
    pub media: MediaInfo,
    pub position: PositionInfo,
    pub volume: u8,
    pub mute: bool,
    pub groups: Vec<ZoneGroup>,
    /// `None` makes discovery fail.
    pub speakers: Option<Vec<Speaker>>,
    /// Action names (e.g. `"Play"`) that answer with a UPnP fault.
    pub failing: Vec<&'static str>,
    pub discover_calls: AtomicUsize,
}

impl MockSonos {
    /// A standalone, stopped coordinator at `TEST_IP` with an empty queue.
    pub fn standalone() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            transport_state: Mutex::new(TransportState::Stopped),
            media: MediaInfo {
                current_uri: String::new(),
                current_uri_metadata: String::new(),
            },
            position: PositionInfo {
                track: 0,
                track_uri: String::new(),
                rel_time: "0:00:00".into(),
                track_duration: String::new(),
            },
            volume: 25,
            mute: false,
            groups: vec![group(TEST_UUID, &[(TEST_UUID, TEST_IP, "Kitchen")])],
            speakers: Some(Vec::new()),
            failing: Vec::new(),
            discover_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_state(self, state: TransportState) -> Self {
        *self.transport_state.lock() = state;
        self
    }

    pub fn with_media(mut self, uri: &str, metadata: &str) -> Self {
        self.media = MediaInfo {
            current_uri: uri.into(),
            current_uri_metadata: metadata.into(),
        };
        self
    }

    pub fn with_position(mut self, track: u32, track_uri: &str, rel_time: &str) -> Self {
        self.position = PositionInfo {
            track,
            track_uri: track_uri.into(),
            rel_time: rel_time.into(),
            track_duration: String::new(),
        };
        self
    }

    pub fn with_groups(mut self, groups: Vec<ZoneGroup>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_speakers(mut self, speakers: Option<Vec<Speaker>>) -> Self {
        self.speakers = speakers;
        self
    }

    pub fn failing(mut self, action: &'static str) -> Self {
        self.failing.push(action);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls.lock().iter().any(|c| c.starts_with(prefix))
    }

    fn record(&self, action: &'static str, call: String) -> SoapResult<()> {
        self.calls.lock().push(call);
        if self.failing.contains(&action) {
            return Err(SoapError::Fault(format!("{} failed (UPnP error 501)", action)));
        }
        Ok(())
    }
}

pub fn group(coordinator_uuid: &str, members: &[(&str, &str, &str)]) -> ZoneGroup {
    ZoneGroup {
        id: format!("{}:1", coordinator_uuid),
        coordinator_uuid: coordinator_uuid.into(),
        members: members
            .iter()
            .map(|(uuid, ip, name)| ZoneGroupMember {
                uuid: (*uuid).into(),
                ip: (*ip).into(),
                zone_name: (*name).into(),
            })
            .collect(),
    }
}

pub fn speaker(name: &str, ip: &str) -> Speaker {
    Speaker {
        ip: ip.into(),
        name: name.into(),
        uuid: format!("RINCON_{}", name.to_uppercase().replace(' ', "")),
        model_name: Some("Sonos One".into()),
    }
}

#[async_trait]
impl SonosPlayback for MockSonos {
    async fn play_uri(&self, _ip: &str, uri: &str, title: &str) -> SoapResult<()> {
        self.record("PlayUri", format!("play_uri:{}:{}", title, uri))?;
        *self.transport_state.lock() = TransportState::Playing;
        Ok(())
    }

    async fn set_av_transport_uri(&self, _ip: &str, uri: &str, _metadata: &str) -> SoapResult<()> {
        self.record("SetAVTransportURI", format!("set_uri:{}", uri))
    }

    async fn play(&self, _ip: &str) -> SoapResult<()> {
        self.record("Play", "play".into())?;
        *self.transport_state.lock() = TransportState::Playing;
        Ok(())
    }

    async fn pause(&self, _ip: &str) -> SoapResult<()> {
        self.record("Pause", "pause".into())?;
        *self.transport_state.lock() = TransportState::Paused;
        Ok(())
    }

    async fn stop(&self, _ip: &str) -> SoapResult<()> {
        self.record("Stop", "stop".into())?;
        *self.transport_state.lock() = TransportState::Stopped;
        Ok(())
    }

    async fn seek(&self, _ip: &str, unit: SeekUnit, target: &str) -> SoapResult<()> {
        let unit = match unit {
            SeekUnit::TrackNumber => "track",
            SeekUnit::RelativeTime => "time",
        };
        self.record("Seek", format!("seek_{}:{}", unit, target))
    }

    async fn get_transport_state(&self, _ip: &str) -> SoapResult<TransportState> {
        Ok(*self.transport_state.lock())
    }

    async fn get_media_info(&self, _ip: &str) -> SoapResult<MediaInfo> {
        if self.failing.contains(&"GetMediaInfo") {
            return Err(SoapError::Fault("GetMediaInfo failed (UPnP error 501)".into()));
        }
        Ok(self.media.clone())
    }

    async fn get_position_info(&self, _ip: &str) -> SoapResult<PositionInfo> {
        Ok(self.position.clone())
    }
}

#[async_trait]
impl SonosVolumeControl for MockSonos {
    async fn get_speaker_volume(&self, _ip: &str) -> SoapResult<u8> {
        Ok(self.volume)
    }

    async fn set_speaker_volume(&self, _ip: &str, volume: u8) -> SoapResult<()> {
        self.record("SetVolume", format!("set_volume:{}", volume))
    }

    async fn get_speaker_mute(&self, _ip: &str) -> SoapResult<bool> {
        Ok(self.mute)
    }

    async fn set_speaker_mute(&self, _ip: &str, mute: bool) -> SoapResult<()> {
        self.record("SetMute", format!("set_mute:{}", mute))
    }
}

#[async_trait]
impl SonosTopology for MockSonos {
    async fn get_zone_groups(&self, _ip: &str) -> SoapResult<Vec<ZoneGroup>> {
        Ok(self.groups.clone())
    }
}

#[async_trait]
impl SonosDiscovery for MockSonos {
    async fn discover_speakers(&self) -> DiscoveryResult<Vec<Speaker>> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        self.speakers
            .clone()
            .ok_or(DiscoveryError::AllMethodsFailed(Vec::new()))
    }
}
