//! Sonos domain types for transport state, media state and zone groups.
//!
//! These types represent what the doorbell reads back from a speaker via
//! UPnP/SOAP before and after a ring.

use serde::Serialize;
use thiserror::Error;

use crate::protocol_constants::{QUEUE_URI_PREFIX, TV_INPUT_URI_PREFIX};

// ─────────────────────────────────────────────────────────────────────────────
// Transport State
// ─────────────────────────────────────────────────────────────────────────────

/// Playback transport state of a Sonos speaker.
///
/// Represents the current playback state as reported by the AVTransport service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransportState {
    Playing,
    #[serde(rename = "PAUSED_PLAYBACK")]
    Paused,
    Stopped,
    Transitioning,
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Playing => write!(f, "Playing"),
            Self::Paused => write!(f, "Paused"),
            Self::Stopped => write!(f, "Stopped"),
            Self::Transitioning => write!(f, "Transitioning"),
        }
    }
}

/// Error returned when parsing an unknown transport state string.
#[derive(Debug, Clone, Error)]
#[error("unknown transport state")]
pub struct ParseTransportStateError;

impl std::str::FromStr for TransportState {
    type Err = ParseTransportStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLAYING" => Ok(Self::Playing),
            "PAUSED_PLAYBACK" | "PAUSED" => Ok(Self::Paused),
            "STOPPED" => Ok(Self::Stopped),
            "TRANSITIONING" => Ok(Self::Transitioning),
            _ => Err(ParseTransportStateError),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Media / Position
// ─────────────────────────────────────────────────────────────────────────────

/// Source currently loaded into a speaker's AVTransport (`GetMediaInfo`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaInfo {
    /// `CurrentURI`: the transport source (queue, stream, line-in, TV).
    pub current_uri: String,
    /// `CurrentURIMetaData`: DIDL-Lite describing the source, may be empty.
    pub current_uri_metadata: String,
}

impl MediaInfo {
    /// Returns true if the speaker is playing from its own queue.
    #[must_use]
    pub fn is_queue(&self) -> bool {
        self.current_uri.starts_with(QUEUE_URI_PREFIX)
    }

    /// Returns true if the speaker's source is its TV/HDMI input.
    #[must_use]
    pub fn is_tv_input(&self) -> bool {
        self.current_uri.starts_with(TV_INPUT_URI_PREFIX)
    }
}

/// Position within the current source (`GetPositionInfo`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionInfo {
    /// 1-based track number within the queue (0 when not applicable).
    pub track: u32,
    /// URI of the current track.
    pub track_uri: String,
    /// Elapsed time in `H:MM:SS` format, as reported.
    pub rel_time: String,
    /// Track duration in `H:MM:SS` format, as reported.
    pub track_duration: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Zone Groups
// ─────────────────────────────────────────────────────────────────────────────

/// A speaker within a Sonos zone group.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ZoneGroupMember {
    /// Unique identifier in RINCON_xxxxx format.
    pub uuid: String,
    /// Local IP address of the speaker.
    pub ip: String,
    /// User-configured room name.
    pub zone_name: String,
}

/// A Sonos zone group (speakers playing in sync).
///
/// Each group has a coordinator that owns the transport for the group.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ZoneGroup {
    /// Zone group identifier.
    pub id: String,
    /// UUID of the group coordinator.
    pub coordinator_uuid: String,
    /// All speakers in this group (including the coordinator).
    pub members: Vec<ZoneGroupMember>,
}

impl ZoneGroup {
    /// Returns the coordinator member, if it is present in the member list.
    #[must_use]
    pub fn coordinator(&self) -> Option<&ZoneGroupMember> {
        self.members
            .iter()
            .find(|m| m.uuid == self.coordinator_uuid)
    }

    /// Finds the member reachable at `ip`.
    #[must_use]
    pub fn member_by_ip(&self, ip: &str) -> Option<&ZoneGroupMember> {
        self.members.iter().find(|m| m.ip == ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_state_parses_upnp_values() {
        assert_eq!("PLAYING".parse::<TransportState>().ok(), Some(TransportState::Playing));
        assert_eq!(
            "PAUSED_PLAYBACK".parse::<TransportState>().ok(),
            Some(TransportState::Paused)
        );
        assert_eq!("STOPPED".parse::<TransportState>().ok(), Some(TransportState::Stopped));
        assert!("NO_MEDIA_PRESENT".parse::<TransportState>().is_err());
    }

    #[test]
    fn media_info_classifies_sources() {
        let tv = MediaInfo {
            current_uri: "x-sonos-htastream:RINCON_ABC01400:spdif".into(),
            ..Default::default()
        };
        assert!(tv.is_tv_input());
        assert!(!tv.is_queue());

        let queue = MediaInfo {
            current_uri: "x-rincon-queue:RINCON_ABC01400#0".into(),
            ..Default::default()
        };
        assert!(queue.is_queue());
        assert!(!queue.is_tv_input());
    }

    #[test]
    fn zone_group_finds_coordinator_and_members() {
        let group = ZoneGroup {
            id: "G1".into(),
            coordinator_uuid: "RINCON_B".into(),
            members: vec![
                ZoneGroupMember {
                    uuid: "RINCON_A".into(),
                    ip: "10.0.0.1".into(),
                    zone_name: "Hall".into(),
                },
                ZoneGroupMember {
                    uuid: "RINCON_B".into(),
                    ip: "10.0.0.2".into(),
                    zone_name: "Kitchen".into(),
                },
            ],
        };
        assert_eq!(group.coordinator().map(|m| m.zone_name.as_str()), Some("Kitchen"));
        assert_eq!(group.member_by_ip("10.0.0.1").map(|m| m.uuid.as_str()), Some("RINCON_A"));
        assert!(group.member_by_ip("10.0.0.9").is_none());
    }
}
