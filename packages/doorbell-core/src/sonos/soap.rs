//! SOAP transport for the speaker commands of a ring cycle.
//!
//! Every command the doorbell sends (snapshot queries, pause, volume, play,
//! restore) is one POST of a single-line envelope to the speaker's control
//! port. The command wrappers live in `playback.rs`, `volume.rs` and
//! `zone_groups.rs`; this module only builds envelopes and classifies faults.

use std::time::{Duration, Instant};

use reqwest::Client;
use thiserror::Error;

use super::services::SonosService;
use super::utils::{build_sonos_url, escape_xml, extract_xml_text};
use crate::protocol_constants::SOAP_TIMEOUT_SECS;

/// A speaker command that did not go through.
#[derive(Debug, Error)]
pub enum SoapError {
    /// The speaker could not be reached or timed out.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status with no fault in the body.
    #[error("HTTP error {0}: {1}")]
    HttpStatus(u16, String),

    /// The speaker refused the command; the message ends with
    /// `(UPnP error N)` when the fault carried a code.
    #[error("SOAP fault: {0}")]
    Fault(String),

    /// A reply arrived but lacked the expected value.
    #[error("Failed to parse SOAP response")]
    Parse,
}

/// Result of one speaker command.
pub type SoapResult<T> = Result<T, SoapError>;

/// Fault codes a speaker returns while its transport is switching sources.
///
/// 701 is "transition not available", 714 an illegal seek target while the
/// queue is still loading, 716 a resource the speaker has not set up yet.
const TRANSIENT_FAULT_CODES: [u16; 3] = [701, 714, 716];

impl SoapError {
    /// UPnP error code of a fault, if the speaker sent one.
    #[must_use]
    pub fn upnp_code(&self) -> Option<u16> {
        let SoapError::Fault(msg) = self else {
            return None;
        };
        let code = msg.rsplit_once("(UPnP error ")?.1.strip_suffix(')')?;
        code.trim().parse().ok()
    }

    /// Whether the same command is worth sending again shortly: a
    /// source-switching fault or a request timeout.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            SoapError::Fault(msg) => {
                self.upnp_code()
                    .is_some_and(|code| TRANSIENT_FAULT_CODES.contains(&code))
                    || msg.to_lowercase().contains("transition")
            }
            SoapError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Builds the envelope for `action` on `service`.
///
/// The envelope is a single line: Sonos rejects XML with whitespace before
/// the root element.
pub(crate) fn build_envelope(service: &str, action: &str, args: &[(&str, &str)]) -> String {
    let mut body = format!(
        r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{} xmlns:u="{}">"#,
        action, service
    );
    for (k, v) in args {
        body.push_str(&format!("<{k}>{}</{k}>", escape_xml(v)));
    }
    body.push_str(&format!(r#"</u:{}></s:Body></s:Envelope>"#, action));
    body
}

/// POSTs one command to the speaker at `ip` and returns the reply body.
async fn post_action(
    client: &Client,
    ip: &str,
    service: SonosService,
    action: &str,
    args: &[(&str, &str)],
) -> SoapResult<String> {
    let url = build_sonos_url(ip, service.control_path());
    let body = build_envelope(service.urn(), action, args);
    log::trace!("[SOAP] {} {} body: {}", ip, action, body);

    let started = Instant::now();
    let res = client
        .post(&url)
        .header("Content-Type", "text/xml; charset=\"utf-8\"")
        .header("SOAPAction", format!("\"{}#{}\"", service.urn(), action))
        .body(body)
        .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
        .send()
        .await;
    log::debug!(
        "[SOAP] {} {}.{} took {:?}: {:?}",
        ip,
        service.name(),
        action,
        started.elapsed(),
        res.as_ref().map(|r| r.status())
    );

    let res = res?;
    let status = res.status();
    let text = res.text().await?;

    // Faults come with a 500 status; report the fault, not the status
    if text.contains("<s:Fault>") || text.contains("<soap:Fault>") {
        return Err(SoapError::Fault(fault_message(&text)));
    }
    if !status.is_success() {
        return Err(SoapError::HttpStatus(status.as_u16(), text));
    }
    Ok(text)
}

/// Readable fault text, suffixed with the UPnP error code when present.
fn fault_message(xml: &str) -> String {
    let fault = extract_xml_text(xml, "faultstring").unwrap_or_else(|| "Unknown SOAP fault".into());
    match extract_xml_text(xml, "errorCode") {
        Some(code) => format!("{} (UPnP error {})", fault, code.trim()),
        None => fault,
    }
}

/// One speaker command under construction.
///
/// ```ignore
/// SoapRequestBuilder::new(&client, "192.168.1.100")
///     .service(SonosService::RenderingControl)
///     .action("SetVolume")
///     .instance_id()
///     .master_channel()
///     .arg("DesiredVolume", "40")
///     .send()
///     .await?;
/// ```
pub struct SoapRequestBuilder<'a> {
    client: &'a Client,
    ip: &'a str,
    service: Option<SonosService>,
    action: Option<&'a str>,
    args: Vec<(&'a str, String)>,
}

impl<'a> SoapRequestBuilder<'a> {
    /// Starts a command for the speaker at `ip`.
    #[must_use]
    pub fn new(client: &'a Client, ip: &'a str) -> Self {
        Self {
            client,
            ip,
            service: None,
            action: None,
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn service(mut self, service: SonosService) -> Self {
        self.service = Some(service);
        self
    }

    #[must_use]
    pub fn action(mut self, action: &'a str) -> Self {
        self.action = Some(action);
        self
    }

    /// Appends an argument; the envelope keeps insertion order.
    #[must_use]
    pub fn arg(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.args.push((key, value.into()));
        self
    }

    /// `InstanceID=0`, required by AVTransport and RenderingControl.
    #[must_use]
    pub fn instance_id(self) -> Self {
        self.arg("InstanceID", "0")
    }

    /// `Channel=Master`, the whole-speaker volume and mute channel.
    #[must_use]
    pub fn master_channel(self) -> Self {
        self.arg("Channel", "Master")
    }

    /// Sends the command and returns the reply body.
    ///
    /// # Errors
    /// Fails without a request when the service or action is missing.
    pub async fn send(self) -> SoapResult<String> {
        let (Some(service), Some(action)) = (self.service, self.action) else {
            return Err(SoapError::Fault("request is missing service or action".into()));
        };
        let args: Vec<(&str, &str)> = self.args.iter().map(|(k, v)| (*k, v.as_str())).collect();
        post_action(self.client, self.ip, service, action, &args).await
    }

    /// Returns the request parts without sending.
    #[cfg(test)]
    pub fn into_parts(self) -> Option<(SonosService, &'a str, Vec<(&'a str, String)>)> {
        Some((self.service?, self.action?, self.args))
    }
}
