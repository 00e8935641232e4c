//! Shared helpers for the Sonos UPnP layer: XML extraction, URL building
//! and time-string conversion.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// Default Sonos speaker control port.
pub const SONOS_PORT: u16 = 1400;

// ─────────────────────────────────────────────────────────────────────────────
// XML Parsing Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Extracts text content from the first occurrence of an XML element.
///
/// Searches for an element by its local name (ignoring namespace prefixes)
/// and returns its text content with HTML entities decoded. Self-closing
/// elements (`<CurrentURI/>`) yield an empty string.
///
/// # Example
/// ```ignore
/// let xml = r#"<u:CurrentVolume>42</u:CurrentVolume>"#;
/// assert_eq!(extract_xml_text(xml, "CurrentVolume"), Some("42".to_string()));
/// ```
pub fn extract_xml_text(xml: &str, element_name: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let target_bytes = element_name.as_bytes();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == target_bytes => {
                if let Ok(text) = reader.read_text(e.name()) {
                    let decoded = html_escape::decode_html_entities(&text);
                    return Some(decoded.to_string());
                }
            }
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == target_bytes => {
                return Some(String::new());
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    None
}

/// Gets an attribute value from an XML element.
///
/// # Arguments
/// * `elem` - The XML element to search
/// * `attr_name` - The attribute name as bytes (e.g., `b"ZoneName"`)
pub fn get_xml_attr(elem: &BytesStart, attr_name: &[u8]) -> Option<String> {
    elem.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == attr_name)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// Extracts the host portion from a UPnP Location URL.
///
/// # Example
/// ```ignore
/// let ip = extract_ip_from_location("http://192.168.1.100:1400/xml/device_desc.xml");
/// assert_eq!(ip, Some("192.168.1.100".to_string()));
/// ```
pub fn extract_ip_from_location(location: &str) -> Option<String> {
    let stripped = location.strip_prefix("http://")?;
    let host_end = stripped.find(':')?;
    Some(stripped[..host_end].to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// URL Building
// ─────────────────────────────────────────────────────────────────────────────

/// Builds a Sonos speaker URL for the given IP and endpoint.
///
/// # Arguments
/// * `ip` - The speaker's IP address
/// * `endpoint` - The UPnP endpoint path (e.g., "/MediaRenderer/AVTransport/Control")
pub fn build_sonos_url(ip: &str, endpoint: &str) -> String {
    format!("http://{}:{}{}", ip, SONOS_PORT, endpoint)
}

// ─────────────────────────────────────────────────────────────────────────────
// XML Encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Escapes XML special characters for embedding in XML content.
///
/// Used for SOAP arguments and DIDL-Lite metadata values.
///
/// # Example
/// ```ignore
/// assert_eq!(escape_xml("Tom & Jerry"), "Tom &amp; Jerry");
/// ```
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// ─────────────────────────────────────────────────────────────────────────────
// Time Strings
// ─────────────────────────────────────────────────────────────────────────────

/// Parses a UPnP `H:MM:SS` time string into whole seconds.
///
/// Sonos reports `NOT_IMPLEMENTED` for streams and some sources; those
/// (and any other malformed value) yield `None`.
pub fn parse_hms_to_secs(value: &str) -> Option<u64> {
    let mut parts = value.trim().split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    // Fractional seconds ("0:00:05.123") are truncated
    let seconds: u64 = parts.next()?.split('.').next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Formats whole seconds as a UPnP `H:MM:SS` time string.
pub fn format_secs_as_hms(total: u64) -> String {
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
