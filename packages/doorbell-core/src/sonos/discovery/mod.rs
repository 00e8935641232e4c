//! Sonos speaker discovery.
//!
//! # Pipeline
//!
//! 1. Run SSDP multicast and broadcast searches in parallel
//! 2. Normalize UUIDs and merge duplicates
//! 3. Fetch each responder's device description to learn its room name

pub mod ssdp;
pub mod types;

pub use types::{
    normalize_uuid, DeviceInfo, DiscoveredSpeaker, DiscoveryError, DiscoveryMethod,
    DiscoveryResult, Speaker,
};

use futures::stream::{self, StreamExt};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

use self::ssdp::SsdpConfig;
use crate::sonos::utils::SONOS_PORT;

/// Configuration for the discovery coordinator.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Enable SSDP multicast discovery.
    pub ssdp_multicast_enabled: bool,
    /// Enable SSDP broadcast discovery.
    pub ssdp_broadcast_enabled: bool,
    /// SSDP configuration.
    pub ssdp: SsdpConfig,
    /// Timeout for fetching device descriptions.
    pub description_fetch_timeout: Duration,
    /// Maximum concurrent device description fetches.
    pub max_concurrent_fetches: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            ssdp_multicast_enabled: true,
            ssdp_broadcast_enabled: true,
            ssdp: SsdpConfig::default(),
            description_fetch_timeout: Duration::from_secs(2),
            max_concurrent_fetches: 8,
        }
    }
}

/// Runs the enabled SSDP methods and resolves responders to named speakers.
pub struct DiscoveryCoordinator {
    config: DiscoveryConfig,
    http_client: Client,
}

impl DiscoveryCoordinator {
    /// Creates a new coordinator with the given configuration.
    pub fn new(config: DiscoveryConfig) -> Self {
        let http_client = Client::builder()
            .timeout(config.description_fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!(
                    "[Discovery] Failed to build HTTP client with custom timeout: {}. Using default.",
                    e
                );
                Client::default()
            });

        Self {
            config,
            http_client,
        }
    }

    /// Discovers speakers using all enabled methods in parallel.
    ///
    /// Errors only when no method produced a single responder and at least
    /// one method failed (or none was enabled).
    pub async fn discover_speakers(&self) -> DiscoveryResult<Vec<Speaker>> {
        log::info!(
            "[Discovery] Starting discovery (multicast={}, broadcast={})",
            self.config.ssdp_multicast_enabled,
            self.config.ssdp_broadcast_enabled
        );

        let run = |method: DiscoveryMethod, enabled: bool| async move {
            if enabled {
                Some((method, ssdp::discover(&self.config.ssdp, method).await))
            } else {
                None
            }
        };

        let (multicast, broadcast) = tokio::join!(
            run(DiscoveryMethod::SsdpMulticast, self.config.ssdp_multicast_enabled),
            run(DiscoveryMethod::SsdpBroadcast, self.config.ssdp_broadcast_enabled)
        );

        let mut failures = Vec::new();
        let mut all_discovered = Vec::new();
        for (method, result) in [multicast, broadcast].into_iter().flatten() {
            match result {
                Ok(speakers) => {
                    log::info!("[Discovery] {} found {} speaker(s)", method, speakers.len());
                    all_discovered.extend(speakers);
                }
                Err(e) => {
                    log::warn!("[Discovery] {} failed: {}", method, e);
                    failures.push((method, e.to_string()));
                }
            }
        }

        let none_enabled =
            !self.config.ssdp_multicast_enabled && !self.config.ssdp_broadcast_enabled;
        if all_discovered.is_empty() && (none_enabled || !failures.is_empty()) {
            return Err(DiscoveryError::AllMethodsFailed(failures));
        }

        let merged = merge_discovered(all_discovered);
        log::debug!("[Discovery] {} unique speaker(s) after merge", merged.len());

        Ok(self.fetch_device_descriptions(merged).await)
    }

    /// Fetches device descriptions for all discovered speakers.
    ///
    /// Responders whose description cannot be fetched are dropped, since
    /// without a room name they can never match a zone.
    async fn fetch_device_descriptions(&self, discovered: Vec<DiscoveredSpeaker>) -> Vec<Speaker> {
        let mut speakers: Vec<Speaker> = stream::iter(discovered)
            .map(|speaker| async move {
                let Some(info) = self.fetch_device_info(&speaker).await else {
                    log::debug!(
                        "[Discovery] No device description for {} ({})",
                        speaker.ip,
                        speaker.uuid
                    );
                    return None;
                };
                Some(Speaker {
                    ip: speaker.ip,
                    name: info.room_name,
                    uuid: normalize_uuid(&info.uuid),
                    model_name: info.model_name,
                })
            })
            .buffer_unordered(self.config.max_concurrent_fetches.max(1))
            .filter_map(|speaker| async move { speaker })
            .collect()
            .await;

        speakers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.ip.cmp(&b.ip)));
        speakers
    }

    /// Tries the SSDP LOCATION first, then the standard Sonos port.
    async fn fetch_device_info(&self, speaker: &DiscoveredSpeaker) -> Option<DeviceInfo> {
        if let Some(location) = &speaker.location {
            if let Some(info) = fetch_device_description(&self.http_client, location).await {
                return Some(info);
            }
        }

        let fallback = format!(
            "http://{}:{}/xml/device_description.xml",
            speaker.ip, SONOS_PORT
        );
        if speaker.location.as_deref() == Some(fallback.as_str()) {
            return None;
        }
        fetch_device_description(&self.http_client, &fallback).await
    }
}

/// Merges discovered speakers by normalized UUID, keeping the first IP seen
/// and any LOCATION a later duplicate carries.
fn merge_discovered(discovered: Vec<DiscoveredSpeaker>) -> Vec<DiscoveredSpeaker> {
    let mut by_uuid: HashMap<String, DiscoveredSpeaker> = HashMap::new();

    for speaker in discovered {
        let canonical = normalize_uuid(&speaker.uuid);
        match by_uuid.get_mut(&canonical) {
            Some(existing) => {
                if existing.location.is_none() {
                    existing.location = speaker.location;
                }
            }
            None => {
                by_uuid.insert(
                    canonical.clone(),
                    DiscoveredSpeaker {
                        uuid: canonical,
                        ..speaker
                    },
                );
            }
        }
    }

    let mut speakers: Vec<_> = by_uuid.into_values().collect();
    speakers.sort_by(|a, b| a.uuid.cmp(&b.uuid));
    speakers
}

async fn fetch_device_description(client: &Client, url: &str) -> Option<DeviceInfo> {
    let response = client.get(url).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let body = response.text().await.ok()?;

    parse_device_description(&body)
}

/// Parses a device description document.
///
/// Only the first occurrence of each field is used: the root device comes
/// before its embedded media server/renderer devices. `roomName` is preferred
/// over `friendlyName`, which Sonos formats as `"<ip> - <model>"`.
pub(crate) fn parse_device_description(xml: &str) -> Option<DeviceInfo> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut uuid = None;
    let mut room_name = None;
    let mut friendly_name = None;
    let mut model_name = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let slot = match e.local_name().as_ref() {
                    b"UDN" => Some(&mut uuid),
                    b"roomName" => Some(&mut room_name),
                    b"friendlyName" => Some(&mut friendly_name),
                    b"modelName" => Some(&mut model_name),
                    _ => None,
                };
                if let Some(slot) = slot.filter(|s| s.is_none()) {
                    *slot = reader
                        .read_text(e.name())
                        .ok()
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::trace!("[Discovery] Error parsing device description: {:?}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    Some(DeviceInfo {
        uuid: uuid?,
        room_name: room_name.or(friendly_name)?,
        model_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_device_description_prefers_room_name() {
        let xml = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <device>
    <deviceType>urn:schemas-upnp-org:device:ZonePlayer:1</deviceType>
    <friendlyName>192.168.1.10 - Sonos One</friendlyName>
    <modelName>Sonos One</modelName>
    <UDN>uuid:RINCON_ABC123456789</UDN>
    <roomName>Living Room</roomName>
    <deviceList>
      <device>
        <friendlyName>192.168.1.10 - Sonos One Media Renderer</friendlyName>
        <UDN>uuid:RINCON_ABC123456789_MR</UDN>
      </device>
    </deviceList>
  </device>
</root>"#;

        let info = parse_device_description(xml).expect("should parse");
        assert_eq!(info.uuid, "uuid:RINCON_ABC123456789");
        assert_eq!(info.room_name, "Living Room");
        assert_eq!(info.model_name.as_deref(), Some("Sonos One"));
    }

    #[test]
    fn parse_device_description_falls_back_to_friendly_name() {
        let xml = r#"<root><device><friendlyName>Kitchen</friendlyName><UDN>uuid:RINCON_K</UDN></device></root>"#;
        let info = parse_device_description(xml).expect("should parse");
        assert_eq!(info.room_name, "Kitchen");
        assert!(info.model_name.is_none());
    }

    #[test]
    fn parse_device_description_requires_udn_and_name() {
        assert!(parse_device_description("<root><device><roomName>Den</roomName></device></root>").is_none());
        assert!(parse_device_description("<root><device><UDN>uuid:RINCON_X</UDN></device></root>").is_none());
        assert!(parse_device_description("not xml at all").is_none());
    }

    #[test]
    fn merge_discovered_dedupes_by_normalized_uuid() {
        let merged = merge_discovered(vec![
            DiscoveredSpeaker {
                ip: "192.168.1.10".into(),
                uuid: "RINCON_A".into(),
                location: None,
            },
            DiscoveredSpeaker {
                ip: "192.168.1.10".into(),
                uuid: "uuid:RINCON_A::urn:schemas-upnp-org:device:ZonePlayer:1".into(),
                location: Some("http://192.168.1.10:1400/xml/device_description.xml".into()),
            },
            DiscoveredSpeaker {
                ip: "192.168.1.11".into(),
                uuid: "RINCON_B".into(),
                location: None,
            },
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].uuid, "RINCON_A");
        assert!(merged[0].location.is_some());
        assert_eq!(merged[1].ip, "192.168.1.11");
    }

    #[tokio::test]
    async fn no_enabled_method_is_an_error() {
        let coordinator = DiscoveryCoordinator::new(DiscoveryConfig {
            ssdp_multicast_enabled: false,
            ssdp_broadcast_enabled: false,
            ..DiscoveryConfig::default()
        });

        let result = coordinator.discover_speakers().await;
        assert!(matches!(result, Err(DiscoveryError::AllMethodsFailed(f)) if f.is_empty()));
    }
}
