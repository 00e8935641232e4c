//! DIDL-Lite metadata formatting for Sonos display.
//!
//! Sonos shows the `dc:title` of the metadata passed with
//! `SetAVTransportURI` on its controllers while the item plays.

use crate::protocol_constants::APP_NAME;
use crate::sonos::utils::escape_xml;

/// Returns the MIME type Sonos expects for an audio URL, based on its extension.
pub(crate) fn mime_type_for_uri(uri: &str) -> &'static str {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "m4a" | "aac" => "audio/mp4",
        _ => "audio/mpeg",
    }
}

/// Formats DIDL-Lite metadata XML for a single audio item.
///
/// The item is a plain music track with a fixed creator so the Sonos app
/// attributes it to the doorbell rather than leaving the artist blank.
pub(crate) fn format_didl_lite(uri: &str, title: &str) -> String {
    let mut didl = String::from(
        r#"<DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/" xmlns:r="urn:schemas-rinconnetworks-com:metadata-1-0/" xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/">"#,
    );
    didl.push_str(r#"<item id="R:0/0/0" parentID="R:0/0" restricted="true">"#);
    didl.push_str(&format!("<dc:title>{}</dc:title>", escape_xml(title)));
    didl.push_str(&format!("<dc:creator>{}</dc:creator>", escape_xml(APP_NAME)));
    didl.push_str("<upnp:class>object.item.audioItem.musicTrack</upnp:class>");
    didl.push_str(&format!(
        r#"<res protocolInfo="http-get:*:{}:*">{}</res>"#,
        mime_type_for_uri(uri),
        escape_xml(uri)
    ));
    didl.push_str("</item>");
    didl.push_str("</DIDL-Lite>");

    didl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn didl_contains_escaped_title_and_resource() {
        let didl = format_didl_lite("http://10.0.0.5:8888/ding%20dong.mp3?x=1&y=2", "Door & Bell");
        assert!(didl.contains("<dc:title>Door &amp; Bell</dc:title>"));
        assert!(didl.contains(r#"protocolInfo="http-get:*:audio/mpeg:*""#));
        assert!(didl.contains("ding%20dong.mp3?x=1&amp;y=2</res>"));
        assert!(didl.ends_with("</DIDL-Lite>"));
    }

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(mime_type_for_uri("http://h/a.FLAC"), "audio/flac");
        assert_eq!(mime_type_for_uri("http://h/a.wav"), "audio/wav");
        assert_eq!(mime_type_for_uri("http://h/a.m4a"), "audio/mp4");
        assert_eq!(mime_type_for_uri("http://h/noext"), "audio/mpeg");
    }
}
