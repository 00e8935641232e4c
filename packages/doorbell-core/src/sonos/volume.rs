//! Per-speaker volume and mute control (RenderingControl, Master channel).
//!
//! The doorbell always addresses the one speaker it resolved at startup, so
//! only the speaker-level service is used, never GroupRenderingControl.

use reqwest::Client;

use crate::protocol_constants::MAX_VOLUME;
use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapError, SoapRequestBuilder, SoapResult};
use crate::sonos::utils::extract_xml_text;

fn get_volume_request<'a>(client: &'a Client, ip: &'a str) -> SoapRequestBuilder<'a> {
    SoapRequestBuilder::new(client, ip)
        .service(SonosService::RenderingControl)
        .action("GetVolume")
        .instance_id()
        .master_channel()
}

fn set_volume_request<'a>(client: &'a Client, ip: &'a str, volume: u8) -> SoapRequestBuilder<'a> {
    SoapRequestBuilder::new(client, ip)
        .service(SonosService::RenderingControl)
        .action("SetVolume")
        .instance_id()
        .master_channel()
        .arg("DesiredVolume", volume.min(MAX_VOLUME).to_string())
}

fn get_mute_request<'a>(client: &'a Client, ip: &'a str) -> SoapRequestBuilder<'a> {
    SoapRequestBuilder::new(client, ip)
        .service(SonosService::RenderingControl)
        .action("GetMute")
        .instance_id()
        .master_channel()
}

fn set_mute_request<'a>(client: &'a Client, ip: &'a str, mute: bool) -> SoapRequestBuilder<'a> {
    SoapRequestBuilder::new(client, ip)
        .service(SonosService::RenderingControl)
        .action("SetMute")
        .instance_id()
        .master_channel()
        .arg("DesiredMute", if mute { "1" } else { "0" })
}

/// Gets the volume of a speaker (0-100).
pub async fn get_speaker_volume(client: &Client, speaker_ip: &str) -> SoapResult<u8> {
    let response = get_volume_request(client, speaker_ip).send().await?;

    extract_xml_text(&response, "CurrentVolume")
        .and_then(|v| v.parse().ok())
        .ok_or(SoapError::Parse)
}

/// Sets the volume of a speaker (0-100, values > 100 are clamped).
pub async fn set_speaker_volume(client: &Client, speaker_ip: &str, volume: u8) -> SoapResult<()> {
    log::debug!("[Sonos] SetVolume {} on {}", volume, speaker_ip);
    set_volume_request(client, speaker_ip, volume).send().await?;
    Ok(())
}

/// Gets the mute state of a speaker.
pub async fn get_speaker_mute(client: &Client, speaker_ip: &str) -> SoapResult<bool> {
    let response = get_mute_request(client, speaker_ip).send().await?;

    extract_xml_text(&response, "CurrentMute")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .ok_or(SoapError::Parse)
}

/// Sets the mute state of a speaker.
pub async fn set_speaker_mute(client: &Client, speaker_ip: &str, mute: bool) -> SoapResult<()> {
    set_mute_request(client, speaker_ip, mute).send().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP: &str = "192.168.1.100";

    #[test]
    fn get_volume_targets_master_channel() {
        let client = Client::new();
        let (service, action, args) = get_volume_request(&client, IP)
            .into_parts()
            .expect("should build request");

        assert_eq!(service, SonosService::RenderingControl);
        assert_eq!(action, "GetVolume");
        assert_eq!(
            args,
            vec![
                ("InstanceID", "0".to_string()),
                ("Channel", "Master".to_string())
            ]
        );
    }

    #[test]
    fn set_volume_clamps_to_100() {
        let client = Client::new();
        let (_, action, args) = set_volume_request(&client, IP, 150)
            .into_parts()
            .expect("should build request");

        assert_eq!(action, "SetVolume");
        assert_eq!(args[2], ("DesiredVolume", "100".to_string()));
    }

    #[test]
    fn set_volume_passes_value_through() {
        let client = Client::new();
        let (_, _, args) = set_volume_request(&client, IP, 40)
            .into_parts()
            .expect("should build request");

        assert_eq!(args[2], ("DesiredVolume", "40".to_string()));
    }

    #[test]
    fn mute_requests_encode_booleans_as_digits() {
        let client = Client::new();
        let (_, action, args) = get_mute_request(&client, IP)
            .into_parts()
            .expect("should build request");
        assert_eq!(action, "GetMute");
        assert_eq!(args.len(), 2);

        let (_, _, on) = set_mute_request(&client, IP, true)
            .into_parts()
            .expect("should build request");
        let (_, _, off) = set_mute_request(&client, IP, false)
            .into_parts()
            .expect("should build request");
        assert_eq!(on[2], ("DesiredMute", "1".to_string()));
        assert_eq!(off[2], ("DesiredMute", "0".to_string()));
    }
}
