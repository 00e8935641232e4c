//! SSDP-based Sonos speaker discovery.
//!
//! Supports both multicast (239.255.255.250) and broadcast discovery for
//! networks where multicast is filtered. Each interface gets its own socket
//! which is used for send AND receive, since devices reply unicast to the
//! sending port.

use local_ip_address::list_afinet_netifas;
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};

use super::types::{is_virtual_interface, DiscoveredSpeaker, DiscoveryError, DiscoveryMethod};

/// Standard SSDP multicast address and port (protocol specification).
const MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// Limited broadcast address for fallback.
const LIMITED_BROADCAST_ADDR: &str = "255.255.255.255:1900";

/// SSDP search target for Sonos ZonePlayer devices.
const SONOS_SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";

/// Builds the M-SEARCH message.
///
/// HOST always carries the multicast address, even when sent via broadcast.
fn build_msearch_message(mx: u64) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: 239.255.255.250:1900\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\r\n",
        mx, SONOS_SEARCH_TARGET
    )
}

/// Configuration for SSDP discovery.
#[derive(Debug, Clone)]
pub struct SsdpConfig {
    /// Number of M-SEARCH packets to send.
    pub send_count: u64,
    /// Delay between M-SEARCH retries.
    pub retry_delay: Duration,
    /// Total discovery window.
    pub discovery_timeout: Duration,
    /// MX value (max response delay in seconds).
    pub mx_value: u64,
}

impl Default for SsdpConfig {
    fn default() -> Self {
        Self {
            send_count: 3,
            retry_delay: Duration::from_millis(800),
            discovery_timeout: Duration::from_secs(5),
            mx_value: 1,
        }
    }
}

/// A usable IPv4 interface.
#[derive(Debug, Clone)]
struct InterfaceInfo {
    name: String,
    ip: Ipv4Addr,
}

impl InterfaceInfo {
    /// Directed broadcast address, assuming a /24 network.
    fn directed_broadcast(&self) -> Ipv4Addr {
        let [a, b, c, _] = self.ip.octets();
        Ipv4Addr::new(a, b, c, 255)
    }
}

/// Lists non-virtual, non-loopback IPv4 interfaces.
fn usable_interfaces() -> Vec<InterfaceInfo> {
    list_afinet_netifas()
        .unwrap_or_else(|e| {
            log::warn!("[Discovery] Failed to list network interfaces: {}", e);
            Vec::new()
        })
        .into_iter()
        .filter_map(|(name, addr)| match addr {
            IpAddr::V4(ip) if !ip.is_loopback() && !is_virtual_interface(&name) => {
                Some(InterfaceInfo { name, ip })
            }
            _ => None,
        })
        .collect()
}

/// Creates a non-blocking UDP socket bound to an interface address.
fn create_socket(iface_ip: Ipv4Addr, enable_broadcast: bool) -> Result<UdpSocket, DiscoveryError> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(DiscoveryError::SocketBind)?;

    if let Err(e) = socket.set_reuse_address(true) {
        log::warn!("[Discovery] Failed to set SO_REUSEADDR on {}: {}", iface_ip, e);
    }
    // UPnP 1.0 recommends a TTL of 4 for SSDP multicast
    if let Err(e) = socket.set_multicast_ttl_v4(4) {
        log::warn!("[Discovery] Failed to set multicast TTL on {}: {}", iface_ip, e);
    }
    if enable_broadcast {
        if let Err(e) = socket.set_broadcast(true) {
            log::warn!("[Discovery] Failed to set SO_BROADCAST on {}: {}", iface_ip, e);
        }
    }

    socket
        .set_nonblocking(true)
        .map_err(DiscoveryError::SocketBind)?;
    socket
        .bind(&SocketAddr::new(IpAddr::V4(iface_ip), 0).into())
        .map_err(DiscoveryError::SocketBind)?;

    UdpSocket::from_std(socket.into()).map_err(DiscoveryError::SocketBind)
}

/// Returns the value of an HTTP-style header (case-insensitive name).
fn header_value<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    response.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim())
    })
}

/// Parses an SSDP response and extracts speaker info.
///
/// Returns None unless the USN carries a Sonos `RINCON_` UUID.
fn parse_ssdp_response(response: &str, src_ip: &str) -> Option<DiscoveredSpeaker> {
    let usn = header_value(response, "usn")?;
    let uuid_start = usn.to_ascii_lowercase().find("uuid:")? + "uuid:".len();
    let uuid = usn[uuid_start..].split("::").next()?.to_string();

    // Sonos UUIDs are always uppercase RINCON_
    if !uuid.starts_with("RINCON_") {
        return None;
    }

    Some(DiscoveredSpeaker {
        ip: src_ip.to_string(),
        uuid,
        location: header_value(response, "location").map(str::to_string),
    })
}

/// Discovers Sonos speakers on all usable interfaces with one SSDP method.
///
/// Multicast sends to 239.255.255.250:1900; broadcast sends to the
/// interface's directed broadcast and to 255.255.255.255.
pub async fn discover(
    config: &SsdpConfig,
    method: DiscoveryMethod,
) -> Result<Vec<DiscoveredSpeaker>, DiscoveryError> {
    let use_broadcast = method == DiscoveryMethod::SsdpBroadcast;
    let interfaces = usable_interfaces();
    if interfaces.is_empty() {
        return Err(DiscoveryError::NoInterfaces);
    }

    let mut sockets: Vec<(InterfaceInfo, UdpSocket)> = Vec::new();
    for iface in interfaces {
        match create_socket(iface.ip, use_broadcast) {
            Ok(socket) => sockets.push((iface, socket)),
            Err(e) => log::warn!(
                "[Discovery] No socket for {} ({}): {}",
                iface.name,
                iface.ip,
                e
            ),
        }
    }
    if sockets.is_empty() {
        return Err(DiscoveryError::NoInterfaces);
    }

    log::debug!(
        "[{}] Searching on {} interface(s) ({} sends, {}ms apart)",
        method,
        sockets.len(),
        config.send_count,
        config.retry_delay.as_millis()
    );

    let msg = build_msearch_message(config.mx_value);
    let deadline = Instant::now() + config.discovery_timeout;

    let per_interface = sockets.iter().map(|(iface, socket)| {
        let targets: Vec<String> = if use_broadcast {
            vec![
                format!("{}:1900", iface.directed_broadcast()),
                LIMITED_BROADCAST_ADDR.to_string(),
            ]
        } else {
            vec![MULTICAST_ADDR.to_string()]
        };
        let msg = msg.as_bytes();

        let send = async move {
            for i in 0..config.send_count {
                if i > 0 {
                    tokio::time::sleep(config.retry_delay).await;
                }
                for target in &targets {
                    if let Err(e) = socket.send_to(msg, target.as_str()).await {
                        log::warn!("[{}] M-SEARCH on {} to {} failed: {}", method, iface.name, target, e);
                    }
                }
            }
        };

        let recv = async move {
            let mut found = Vec::new();
            let mut buf = [0u8; 2048];
            loop {
                match timeout_at(deadline, socket.recv_from(&mut buf)).await {
                    Ok(Ok((len, src))) => {
                        let response = String::from_utf8_lossy(&buf[..len]);
                        if let Some(speaker) = parse_ssdp_response(&response, &src.ip().to_string()) {
                            log::debug!("[{}] Response from {} ({}) via {}", method, speaker.ip, speaker.uuid, iface.name);
                            found.push(speaker);
                        }
                    }
                    Ok(Err(e)) => {
                        log::warn!("[{}] Receive error on {}: {}", method, iface.name, e);
                    }
                    Err(_) => break,
                }
            }
            found
        };

        async move { tokio::join!(send, recv).1 }
    });

    let mut discovered: Vec<DiscoveredSpeaker> = futures::future::join_all(per_interface)
        .await
        .into_iter()
        .flatten()
        .collect();

    let mut seen = HashSet::new();
    discovered.retain(|s| seen.insert(s.uuid.clone()));
    discovered.sort_by(|a, b| a.uuid.cmp(&b.uuid));

    log::debug!("[{}] {} unique speaker(s) responded", method, discovered.len());

    Ok(discovered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msearch_message_targets_zone_players() {
        let msg = build_msearch_message(1);
        assert!(msg.starts_with("M-SEARCH * HTTP/1.1\r\n"));
        assert!(msg.contains("HOST: 239.255.255.250:1900"));
        assert!(msg.contains("MX: 1"));
        assert!(msg.contains("ST: urn:schemas-upnp-org:device:ZonePlayer:1"));
        assert!(msg.ends_with("\r\n\r\n"));
    }

    #[test]
    fn parses_sonos_response() {
        let response = "HTTP/1.1 200 OK\r\n\
CACHE-CONTROL: max-age=1800\r\n\
LOCATION: http://192.168.1.10:1400/xml/device_description.xml\r\n\
SERVER: Linux UPnP/1.0 Sonos/63.2-88230\r\n\
USN: uuid:RINCON_ABC12345678901400::urn:schemas-upnp-org:device:ZonePlayer:1\r\n\r\n";

        let speaker = parse_ssdp_response(response, "192.168.1.10").expect("sonos response");
        assert_eq!(speaker.ip, "192.168.1.10");
        assert_eq!(speaker.uuid, "RINCON_ABC12345678901400");
        assert_eq!(
            speaker.location.as_deref(),
            Some("http://192.168.1.10:1400/xml/device_description.xml")
        );
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let response = "HTTP/1.1 200 OK\r\n\
location: http://192.168.1.10:1400/xml/device_description.xml\r\n\
usn: UUID:RINCON_ABC12345678901400::urn:schemas-upnp-org:device:ZonePlayer:1\r\n\r\n";

        let speaker = parse_ssdp_response(response, "192.168.1.10").expect("sonos response");
        assert_eq!(speaker.uuid, "RINCON_ABC12345678901400");
        assert!(speaker.location.is_some());
    }

    #[test]
    fn non_sonos_responses_are_ignored() {
        let response = "HTTP/1.1 200 OK\r\n\
LOCATION: http://192.168.1.20:80/description.xml\r\n\
USN: uuid:some-other-device\r\n\r\n";
        assert!(parse_ssdp_response(response, "192.168.1.20").is_none());
        assert!(parse_ssdp_response("garbage", "192.168.1.20").is_none());
    }

    #[test]
    fn directed_broadcast_assumes_slash_24() {
        let iface = InterfaceInfo {
            name: "eth0".into(),
            ip: Ipv4Addr::new(192, 168, 7, 42),
        };
        assert_eq!(iface.directed_broadcast(), Ipv4Addr::new(192, 168, 7, 255));
    }
}
