//! Capture and restore of a speaker's playback state around a ring.
//!
//! A snapshot records what the speaker was doing (source, queue position,
//! transport state, volume, mute) so it can be put back after the doorbell
//! sound has played. Only a group coordinator owns a transport; for other
//! speakers only volume and mute are recorded.

use crate::protocol_constants::CLOUD_QUEUE_MARKER;
use crate::sonos::playback::SeekUnit;
use crate::sonos::soap::SoapResult;
use crate::sonos::traits::SonosRemote;
use crate::sonos::types::{MediaInfo, PositionInfo, TransportState, ZoneGroup};
use crate::sonos::utils::{format_secs_as_hms, parse_hms_to_secs};

/// Transport-level state, present only for coordinators.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TransportSnapshot {
    media: MediaInfo,
    position: PositionInfo,
    state: TransportState,
}

/// Pre-ring playback state of one speaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    ip: String,
    transport: Option<TransportSnapshot>,
    volume: u8,
    mute: bool,
}

/// Returns true if the speaker at `ip` coordinates its zone group.
#[must_use]
pub fn is_group_coordinator(groups: &[ZoneGroup], ip: &str) -> bool {
    groups.iter().any(|group| {
        group
            .member_by_ip(ip)
            .is_some_and(|member| member.uuid == group.coordinator_uuid)
    })
}

impl Snapshot {
    /// Records the current state of the speaker at `ip`.
    pub async fn capture<R: SonosRemote + ?Sized>(remote: &R, ip: &str) -> SoapResult<Self> {
        let groups = remote.get_zone_groups(ip).await?;

        let transport = if is_group_coordinator(&groups, ip) {
            Some(TransportSnapshot {
                media: remote.get_media_info(ip).await?,
                position: remote.get_position_info(ip).await?,
                state: remote.get_transport_state(ip).await?,
            })
        } else {
            None
        };

        let snapshot = Self {
            ip: ip.to_string(),
            transport,
            volume: remote.get_speaker_volume(ip).await?,
            mute: remote.get_speaker_mute(ip).await?,
        };
        log::debug!("[Sonos] Snapshot of {}: {:?}", ip, snapshot);
        Ok(snapshot)
    }

    /// Whether the speaker owned its transport when captured.
    #[must_use]
    pub fn is_coordinator(&self) -> bool {
        self.transport.is_some()
    }

    /// Whether the speaker was playing its TV/HDMI input.
    #[must_use]
    pub fn is_tv_input(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.media.is_tv_input())
    }

    /// Whether the source was a cloud-controlled queue, which Sonos does not
    /// let a local client re-enter.
    #[must_use]
    pub fn is_cloud_queue(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| {
            t.media.current_uri.starts_with(CLOUD_QUEUE_MARKER)
                || t.position.track_uri.starts_with(CLOUD_QUEUE_MARKER)
        })
    }

    /// Transport state at capture time (None for non-coordinators).
    #[must_use]
    pub fn transport_state(&self) -> Option<TransportState> {
        self.transport.as_ref().map(|t| t.state)
    }

    /// Puts the speaker back into the captured state, without fading.
    ///
    /// Queue sources are re-entered at the captured track and position;
    /// any other source is reloaded as-is. Playback resumes only if it was
    /// playing before, and a stopped speaker is stopped again.
    pub async fn restore<R: SonosRemote + ?Sized>(&self, remote: &R) -> SoapResult<()> {
        let ip = self.ip.as_str();

        if let Some(transport) = &self.transport {
            if remote.get_transport_state(ip).await? == TransportState::Playing {
                remote.pause(ip).await?;
            }

            let media = &transport.media;
            if media.is_queue() && transport.position.track > 0 {
                remote.set_av_transport_uri(ip, &media.current_uri, "").await?;
                remote
                    .seek(ip, SeekUnit::TrackNumber, &transport.position.track.to_string())
                    .await?;
                if let Some(secs) = parse_hms_to_secs(&transport.position.rel_time) {
                    if let Err(e) = remote
                        .seek(ip, SeekUnit::RelativeTime, &format_secs_as_hms(secs))
                        .await
                    {
                        log::warn!("[Sonos] Could not restore track position on {}: {}", ip, e);
                    }
                }
            } else if !media.current_uri.is_empty() {
                remote
                    .set_av_transport_uri(ip, &media.current_uri, &media.current_uri_metadata)
                    .await?;
            }
        }

        remote.set_speaker_mute(ip, self.mute).await?;
        remote.set_speaker_volume(ip, self.volume).await?;

        match self.transport_state() {
            Some(TransportState::Playing) => remote.play(ip).await?,
            Some(TransportState::Stopped) => remote.stop(ip).await?,
            _ => {}
        }

        Ok(())
    }
}
