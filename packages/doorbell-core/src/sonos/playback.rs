//! Playback control commands for Sonos speakers.
//!
//! Provides play, pause, stop, seek and transport queries via AVTransport
//! SOAP actions, including retry logic for transient SOAP errors.

use reqwest::Client;

use crate::sonos::didl::format_didl_lite;
use crate::sonos::retry::with_retry;
use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapError, SoapRequestBuilder, SoapResult};
use crate::sonos::types::{MediaInfo, PositionInfo, TransportState};
use crate::sonos::utils::extract_xml_text;

/// Seek units understood by the Sonos AVTransport `Seek` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekUnit {
    /// Jump to a 1-based track number in the queue.
    TrackNumber,
    /// Jump to an `H:MM:SS` position in the current track.
    RelativeTime,
}

impl SeekUnit {
    fn as_str(self) -> &'static str {
        match self {
            Self::TrackNumber => "TRACK_NR",
            Self::RelativeTime => "REL_TIME",
        }
    }
}

/// Sets the transport source without starting playback.
///
/// # Arguments
/// * `client` - The HTTP client to use for the request
/// * `ip` - IP address of the Sonos speaker (coordinator for grouped speakers)
/// * `uri` - Source URI (HTTP URL, queue URI, radio URI...)
/// * `metadata` - DIDL-Lite metadata for the source, may be empty
pub async fn set_av_transport_uri(
    client: &Client,
    ip: &str,
    uri: &str,
    metadata: &str,
) -> SoapResult<()> {
    log::debug!("[Sonos] SetAVTransportURI: ip={}, uri={}", ip, uri);

    with_retry("SetAVTransportURI", || {
        SoapRequestBuilder::new(client, ip)
            .service(SonosService::AVTransport)
            .action("SetAVTransportURI")
            .instance_id()
            .arg("CurrentURI", uri)
            .arg("CurrentURIMetaData", metadata)
            .send()
    })
    .await?;

    Ok(())
}

/// Commands a Sonos speaker to play an audio URL, shown with `title`.
///
/// Retries transient SOAP faults (701, 714, 716) with exponential backoff.
pub async fn play_uri(client: &Client, ip: &str, uri: &str, title: &str) -> SoapResult<()> {
    let didl_metadata = format_didl_lite(uri, title);

    log::info!("[Sonos] Playing '{}' on {}: {}", title, ip, uri);

    set_av_transport_uri(client, ip, uri, &didl_metadata).await?;
    play(client, ip).await
}

/// Sends a Play command to start or resume playback of the configured source.
pub async fn play(client: &Client, ip: &str) -> SoapResult<()> {
    log::debug!("[Sonos] Sending Play command to {}", ip);

    with_retry("Play", || {
        SoapRequestBuilder::new(client, ip)
            .service(SonosService::AVTransport)
            .action("Play")
            .instance_id()
            .arg("Speed", "1")
            .send()
    })
    .await?;

    Ok(())
}

/// Pauses playback on a Sonos speaker.
///
/// Fault 701 ("transition not available") means the speaker is not playing
/// anything pausable and is treated as success.
pub async fn pause(client: &Client, ip: &str) -> SoapResult<()> {
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("Pause")
        .instance_id()
        .send()
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) if e.upnp_code() == Some(701) => {
            log::debug!("[Sonos] Pause: {} has nothing to pause (ignoring 701)", ip);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Stops playback on a Sonos speaker.
///
/// Fault 701 means the speaker is already stopped and is treated as success.
pub async fn stop(client: &Client, ip: &str) -> SoapResult<()> {
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("Stop")
        .instance_id()
        .send()
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) if e.upnp_code() == Some(701) => {
            log::debug!("[Sonos] Stop: {} may already be stopped (ignoring 701)", ip);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Seeks within the current source.
///
/// # Arguments
/// * `unit` - Whether `target` is a track number or an `H:MM:SS` position
/// * `target` - The seek target
pub async fn seek(client: &Client, ip: &str, unit: SeekUnit, target: &str) -> SoapResult<()> {
    log::debug!("[Sonos] Seek {} {} on {}", unit.as_str(), target, ip);

    with_retry("Seek", || {
        SoapRequestBuilder::new(client, ip)
            .service(SonosService::AVTransport)
            .action("Seek")
            .instance_id()
            .arg("Unit", unit.as_str())
            .arg("Target", target)
            .send()
    })
    .await?;

    Ok(())
}

/// Gets the current transport state (playing, paused, stopped...).
pub async fn get_transport_state(client: &Client, ip: &str) -> SoapResult<TransportState> {
    let response = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("GetTransportInfo")
        .instance_id()
        .send()
        .await?;

    parse_transport_state(&response)
}

pub(crate) fn parse_transport_state(response: &str) -> SoapResult<TransportState> {
    extract_xml_text(response, "CurrentTransportState")
        .ok_or(SoapError::Parse)?
        .parse()
        .map_err(|_| SoapError::Parse)
}

/// Gets the source currently loaded into the transport.
pub async fn get_media_info(client: &Client, ip: &str) -> SoapResult<MediaInfo> {
    let response = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("GetMediaInfo")
        .instance_id()
        .send()
        .await?;

    parse_media_info(&response)
}

pub(crate) fn parse_media_info(response: &str) -> SoapResult<MediaInfo> {
    let current_uri = extract_xml_text(response, "CurrentURI").ok_or(SoapError::Parse)?;
    let current_uri_metadata =
        extract_xml_text(response, "CurrentURIMetaData").unwrap_or_default();

    Ok(MediaInfo {
        current_uri,
        current_uri_metadata,
    })
}

/// Gets the current playback position from a Sonos speaker.
///
/// `RelTime` is in "H:MM:SS" format with second precision.
pub async fn get_position_info(client: &Client, ip: &str) -> SoapResult<PositionInfo> {
    let response = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("GetPositionInfo")
        .instance_id()
        .send()
        .await?;

    Ok(parse_position_info(&response))
}

pub(crate) fn parse_position_info(response: &str) -> PositionInfo {
    PositionInfo {
        track: extract_xml_text(response, "Track")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        track_uri: extract_xml_text(response, "TrackURI").unwrap_or_default(),
        rel_time: extract_xml_text(response, "RelTime").unwrap_or_else(|| "0:00:00".to_string()),
        track_duration: extract_xml_text(response, "TrackDuration").unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(action: &str, body: &str) -> String {
        format!(
            r#"<?xml version="1.0"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><u:{action}Response xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">{body}</u:{action}Response></s:Body></s:Envelope>"#
        )
    }

    #[test]
    fn parses_transport_state() {
        let xml = envelope(
            "GetTransportInfo",
            "<CurrentTransportState>PAUSED_PLAYBACK</CurrentTransportState><CurrentTransportStatus>OK</CurrentTransportStatus><CurrentSpeed>1</CurrentSpeed>",
        );
        assert_eq!(parse_transport_state(&xml).ok(), Some(TransportState::Paused));
    }

    #[test]
    fn unknown_transport_state_is_parse_error() {
        let xml = envelope("GetTransportInfo", "<CurrentTransportState>WEIRD</CurrentTransportState>");
        assert!(matches!(parse_transport_state(&xml), Err(SoapError::Parse)));
    }

    #[test]
    fn parses_media_info_with_escaped_metadata() {
        let xml = envelope(
            "GetMediaInfo",
            "<NrTracks>12</NrTracks><CurrentURI>x-rincon-queue:RINCON_ABC01400#0</CurrentURI><CurrentURIMetaData>&lt;DIDL-Lite&gt;&lt;/DIDL-Lite&gt;</CurrentURIMetaData>",
        );
        let info = parse_media_info(&xml).expect("media info");
        assert_eq!(info.current_uri, "x-rincon-queue:RINCON_ABC01400#0");
        assert_eq!(info.current_uri_metadata, "<DIDL-Lite></DIDL-Lite>");
        assert!(info.is_queue());
    }

    #[test]
    fn parses_media_info_with_empty_source() {
        let xml = envelope("GetMediaInfo", "<NrTracks>0</NrTracks><CurrentURI></CurrentURI><CurrentURIMetaData></CurrentURIMetaData>");
        let info = parse_media_info(&xml).expect("media info");
        assert!(info.current_uri.is_empty());
    }

    #[test]
    fn parses_position_info() {
        let xml = envelope(
            "GetPositionInfo",
            "<Track>3</Track><TrackDuration>0:04:10</TrackDuration><TrackMetaData></TrackMetaData><TrackURI>x-file-cifs://nas/song.mp3</TrackURI><RelTime>0:01:15</RelTime>",
        );
        let info = parse_position_info(&xml);
        assert_eq!(info.track, 3);
        assert_eq!(info.rel_time, "0:01:15");
        assert_eq!(info.track_duration, "0:04:10");
        assert_eq!(info.track_uri, "x-file-cifs://nas/song.mp3");
    }

    #[test]
    fn seek_units_use_upnp_names() {
        assert_eq!(SeekUnit::TrackNumber.as_str(), "TRACK_NR");
        assert_eq!(SeekUnit::RelativeTime.as_str(), "REL_TIME");
    }
}
