//! Zone group topology parsing and retrieval.
//!
//! Topology answers the startup question "is the configured speaker allowed
//! to play on its own?": only group coordinators own a transport.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;

use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapRequestBuilder, SoapResult};
use crate::sonos::types::{ZoneGroup, ZoneGroupMember};
use crate::sonos::utils::{extract_ip_from_location, extract_xml_text, get_xml_attr};

/// Parses ZoneGroupState XML into zone groups.
///
/// Zone Bridges (BOOST devices, `IsZoneBridge="1"`) are skipped as they
/// cannot play audio. Home theater satellites are kept as members so that
/// a surround speaker is reported as "not a coordinator" rather than "not
/// in any group". Groups left without members are dropped.
pub fn parse_zone_group_xml(xml: &str) -> Vec<ZoneGroup> {
    let mut groups = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut current: Option<ZoneGroup> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"ZoneGroup" => {
                    current = Some(ZoneGroup {
                        id: get_xml_attr(e, b"ID").unwrap_or_default(),
                        coordinator_uuid: get_xml_attr(e, b"Coordinator").unwrap_or_default(),
                        members: Vec::new(),
                    });
                }
                b"ZoneGroupMember" | b"Satellite" => {
                    let Some(group) = current.as_mut() else {
                        continue;
                    };
                    if get_xml_attr(e, b"IsZoneBridge").as_deref() == Some("1") {
                        continue;
                    }
                    let (Some(uuid), Some(location), Some(zone_name)) = (
                        get_xml_attr(e, b"UUID"),
                        get_xml_attr(e, b"Location"),
                        get_xml_attr(e, b"ZoneName"),
                    ) else {
                        continue;
                    };
                    let Some(ip) = extract_ip_from_location(&location) else {
                        continue;
                    };
                    group.members.push(ZoneGroupMember {
                        uuid,
                        ip,
                        zone_name,
                    });
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"ZoneGroup" => {
                if let Some(group) = current.take() {
                    if !group.members.is_empty() {
                        groups.push(group);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("[Sonos] XML parse error in zone groups: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    groups
}

/// Fetches the current zone groups from a Sonos speaker.
///
/// # Arguments
/// * `client` - The HTTP client to use for the request
/// * `ip` - IP address of any Sonos speaker on the network
pub async fn get_zone_groups(client: &Client, ip: &str) -> SoapResult<Vec<ZoneGroup>> {
    let response = SoapRequestBuilder::new(client, ip)
        .service(SonosService::ZoneGroupTopology)
        .action("GetZoneGroupState")
        .send()
        .await?;

    // ZoneGroupState arrives entity-escaped inside the SOAP body
    let Some(decoded_xml) = extract_xml_text(&response, "ZoneGroupState") else {
        return Ok(vec![]);
    };

    Ok(parse_zone_group_xml(&decoded_xml))
}
