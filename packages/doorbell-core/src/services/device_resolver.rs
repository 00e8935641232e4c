//! Zone-name to speaker resolution.
//!
//! Live SSDP discovery is authoritative; a per-zone address file written on
//! every successful discovery is the fallback when the network is quiet.

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::protocol_constants::ADDRESS_CACHE_SUFFIX;
use crate::sonos::soap::SoapError;
use crate::sonos::traits::{SonosDiscovery, SonosTopology};

/// Startup failures that stop the doorbell before it serves anything.
#[derive(Debug, Error)]
pub enum UsageError {
    /// Neither discovery nor the address cache know the zone.
    #[error("Could not find a Sonos zone named '{zone}'. Found: {}", format_names(.seen))]
    NotFound { zone: String, seen: Vec<String> },

    /// The speaker belongs to a group it does not coordinate.
    #[error("'{zone}' is not a group coordinator; use '{coordinator}' instead")]
    NotCoordinator { zone: String, coordinator: String },

    /// The speaker is missing from every zone group.
    #[error("'{zone}' is not part of any zone group")]
    NoGroup { zone: String },

    /// The speaker's group names no reachable coordinator.
    #[error("The group of '{zone}' has no coordinator")]
    NoCoordinator { zone: String },

    /// The zone topology could not be queried.
    #[error("Cannot query zone groups of '{zone}': {source}")]
    TopologyUnavailable {
        zone: String,
        #[source]
        source: SoapError,
    },
}

impl UsageError {
    /// Process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NotFound { .. } | Self::TopologyUnavailable { .. } => 1,
            Self::NotCoordinator { .. } | Self::NoGroup { .. } | Self::NoCoordinator { .. } => 2,
        }
    }
}

fn format_names(names: &[String]) -> String {
    if names.is_empty() {
        "no speakers".to_string()
    } else {
        names.join(", ")
    }
}

/// The speaker the doorbell rings on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerHandle {
    pub ip: Ipv4Addr,
    /// Zone (room) name.
    pub name: String,
    /// Speaker UUID; unknown when resolved from the address cache.
    pub uuid: Option<String>,
}

impl SpeakerHandle {
    #[must_use]
    pub fn ip_string(&self) -> String {
        self.ip.to_string()
    }
}

impl fmt::Display for SpeakerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.ip)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Address store
// ─────────────────────────────────────────────────────────────────────────────

/// Last known address per zone.
pub trait AddressStore: Send + Sync {
    /// Returns the stored address, or None if absent or unreadable.
    fn get(&self, zone: &str) -> Option<Ipv4Addr>;

    /// Stores (overwrites) the address of `zone`.
    fn put(&self, zone: &str, ip: Ipv4Addr) -> std::io::Result<()>;
}

/// Stores each zone's address in `<dir>/<zone>_ip.txt`.
#[derive(Debug, Clone)]
pub struct FileAddressStore {
    dir: PathBuf,
}

impl FileAddressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the cache file for `zone`.
    #[must_use]
    pub fn path_for(&self, zone: &str) -> PathBuf {
        self.dir.join(format!("{}{}", zone, ADDRESS_CACHE_SUFFIX))
    }
}

/// Extracts the first dotted-quad IPv4 address from `line`.
fn first_ipv4(line: &str) -> Option<Ipv4Addr> {
    line.split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter(|token| !token.is_empty())
        .find_map(|token| {
            token
                .split('.')
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .windows(4)
                .find_map(|quad| quad.join(".").parse().ok())
        })
}

impl AddressStore for FileAddressStore {
    fn get(&self, zone: &str) -> Option<Ipv4Addr> {
        let path = self.path_for(zone);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                log::debug!("[Resolver] No address cache at {}: {}", path.display(), e);
                return None;
            }
        };
        let ip = contents.lines().next().and_then(first_ipv4);
        if ip.is_none() {
            log::warn!("[Resolver] Address cache {} holds no IPv4 address", path.display());
        }
        ip
    }

    fn put(&self, zone: &str, ip: Ipv4Addr) -> std::io::Result<()> {
        std::fs::write(self.path_for(zone), ip.to_string())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryAddressStore {
    entries: Mutex<HashMap<String, Ipv4Addr>>,
}

impl MemoryAddressStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AddressStore for MemoryAddressStore {
    fn get(&self, zone: &str) -> Option<Ipv4Addr> {
        self.entries.lock().get(zone).copied()
    }

    fn put(&self, zone: &str, ip: Ipv4Addr) -> std::io::Result<()> {
        self.entries.lock().insert(zone.to_string(), ip);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

/// Maps a zone name to a speaker, discovery first, cache second.
pub struct DeviceResolver {
    discovery: Arc<dyn SonosDiscovery>,
    store: Arc<dyn AddressStore>,
}

impl DeviceResolver {
    pub fn new(discovery: Arc<dyn SonosDiscovery>, store: Arc<dyn AddressStore>) -> Self {
        Self { discovery, store }
    }

    /// Convenience constructor with a file store rooted at `cache_dir`.
    pub fn with_cache_dir(discovery: Arc<dyn SonosDiscovery>, cache_dir: &Path) -> Self {
        Self::new(discovery, Arc::new(FileAddressStore::new(cache_dir)))
    }

    /// Resolves `zone` to a speaker.
    ///
    /// An exact room-name match from discovery wins and refreshes the cache.
    /// Otherwise the cached address is used as-is, without a reachability
    /// check.
    pub async fn resolve(&self, zone: &str) -> Result<SpeakerHandle, UsageError> {
        log::info!("[Resolver] Discovering Sonos speakers for zone '{}'", zone);

        let speakers = match self.discovery.discover_speakers().await {
            Ok(speakers) => speakers,
            Err(e) => {
                log::warn!("[Resolver] Discovery failed: {}", e);
                Vec::new()
            }
        };

        let hit = speakers
            .iter()
            .find(|s| s.name == zone)
            .and_then(|s| match s.ip.parse::<Ipv4Addr>() {
                Ok(ip) => Some((s, ip)),
                Err(_) => {
                    log::warn!("[Resolver] Ignoring {} with non-IPv4 address {}", s.name, s.ip);
                    None
                }
            });

        if let Some((speaker, ip)) = hit {
            log::info!("[Resolver] Found zone '{}' at {}", zone, ip);
            if let Err(e) = self.store.put(zone, ip) {
                log::warn!("[Resolver] Failed to cache address of '{}': {}", zone, e);
            }
            return Ok(SpeakerHandle {
                ip,
                name: speaker.name.clone(),
                uuid: Some(speaker.uuid.clone()),
            });
        }

        if let Some(ip) = self.store.get(zone) {
            log::info!(
                "[Resolver] Zone '{}' not discovered, using cached address {}",
                zone,
                ip
            );
            return Ok(SpeakerHandle {
                ip,
                name: zone.to_string(),
                uuid: None,
            });
        }

        Err(UsageError::NotFound {
            zone: zone.to_string(),
            seen: speakers.into_iter().map(|s| s.name).collect(),
        })
    }
}

/// Verifies that `handle` coordinates its zone group.
///
/// Members of a group are rejected rather than redirected to their
/// coordinator, since the doorbell would otherwise hijack the whole group.
pub async fn check_coordinator(
    topology: &dyn SonosTopology,
    handle: &SpeakerHandle,
) -> Result<(), UsageError> {
    let ip = handle.ip_string();
    let groups = topology
        .get_zone_groups(&ip)
        .await
        .map_err(|source| UsageError::TopologyUnavailable {
            zone: handle.name.clone(),
            source,
        })?;

    let (group, member) = groups
        .iter()
        .find_map(|g| g.member_by_ip(&ip).map(|m| (g, m)))
        .ok_or_else(|| UsageError::NoGroup {
            zone: handle.name.clone(),
        })?;

    let coordinator = group.coordinator().ok_or_else(|| UsageError::NoCoordinator {
        zone: handle.name.clone(),
    })?;

    if coordinator.uuid != member.uuid {
        return Err(UsageError::NotCoordinator {
            zone: handle.name.clone(),
            coordinator: coordinator.zone_name.clone(),
        });
    }

    log::debug!("[Resolver] {} coordinates group {}", handle, group.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonos::test_fixtures::{group, speaker, MockSonos, TEST_IP, TEST_UUID};
    use std::sync::atomic::Ordering;

    fn handle(name: &str, ip: &str) -> SpeakerHandle {
        SpeakerHandle {
            ip: ip.parse().expect("ip"),
            name: name.into(),
            uuid: None,
        }
    }

    #[test]
    fn first_ipv4_takes_first_dotted_quad() {
        assert_eq!(first_ipv4("192.168.1.20"), Some(Ipv4Addr::new(192, 168, 1, 20)));
        assert_eq!(
            first_ipv4("ip=10.0.0.7 (kitchen) 10.0.0.8"),
            Some(Ipv4Addr::new(10, 0, 0, 7))
        );
        assert_eq!(first_ipv4("v1.2.3.4.5"), Some(Ipv4Addr::new(1, 2, 3, 4)));
        assert_eq!(first_ipv4("999.1.1.1"), None);
        assert_eq!(first_ipv4("garbage"), None);
    }

    #[test]
    fn file_store_round_trips_and_reads_first_line_only() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileAddressStore::new(dir.path());
        assert!(store.get("Kitchen").is_none());

        store.put("Kitchen", Ipv4Addr::new(192, 168, 1, 50)).expect("put");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Kitchen_ip.txt")).expect("read"),
            "192.168.1.50"
        );
        assert_eq!(store.get("Kitchen"), Some(Ipv4Addr::new(192, 168, 1, 50)));

        std::fs::write(store.path_for("Den"), "\n10.0.0.1\n").expect("write");
        assert!(store.get("Den").is_none());
    }

    #[tokio::test]
    async fn discovery_hit_refreshes_cache() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mock = Arc::new(
            MockSonos::standalone()
                .with_speakers(Some(vec![speaker("Den", "192.168.1.9"), speaker("Kitchen", TEST_IP)])),
        );
        std::fs::write(dir.path().join("Kitchen_ip.txt"), "10.0.0.1").expect("stale cache");

        let resolver = DeviceResolver::with_cache_dir(mock.clone(), dir.path());
        let found = resolver.resolve("Kitchen").await.expect("resolve");

        assert_eq!(found.ip_string(), TEST_IP);
        assert_eq!(found.uuid.as_deref(), Some("RINCON_KITCHEN"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Kitchen_ip.txt")).expect("read"),
            TEST_IP
        );
    }

    #[tokio::test]
    async fn room_names_match_exactly() {
        let mock = Arc::new(
            MockSonos::standalone().with_speakers(Some(vec![speaker("kitchen", TEST_IP)])),
        );
        let resolver = DeviceResolver::new(mock, Arc::new(MemoryAddressStore::new()));

        let err = resolver.resolve("Kitchen").await.expect_err("case differs");
        assert!(matches!(err, UsageError::NotFound { ref seen, .. } if seen == &["kitchen"]));
    }

    #[tokio::test]
    async fn falls_back_to_cache_once_when_discovery_fails() {
        let mock = Arc::new(MockSonos::standalone().with_speakers(None));
        let store = Arc::new(MemoryAddressStore::new());
        store.put("Kitchen", Ipv4Addr::new(192, 168, 1, 77)).expect("put");

        let resolver = DeviceResolver::new(mock.clone(), store);
        let found = resolver.resolve("Kitchen").await.expect("cached");

        assert_eq!(found, handle("Kitchen", "192.168.1.77"));
        assert_eq!(mock.discover_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_zone_lists_seen_speakers() {
        let mock = Arc::new(MockSonos::standalone().with_speakers(Some(vec![
            speaker("Den", "192.168.1.9"),
            speaker("Office", "192.168.1.10"),
        ])));
        let resolver = DeviceResolver::new(mock, Arc::new(MemoryAddressStore::new()));

        let err = resolver.resolve("Garage").await.expect_err("not found");
        assert_eq!(err.exit_code(), 1);
        assert_eq!(
            err.to_string(),
            "Could not find a Sonos zone named 'Garage'. Found: Den, Office"
        );
    }

    #[tokio::test]
    async fn standalone_speaker_is_coordinator() {
        let mock = MockSonos::standalone();
        check_coordinator(&mock, &handle("Kitchen", TEST_IP))
            .await
            .expect("coordinator");
    }

    #[tokio::test]
    async fn group_member_names_the_coordinator() {
        let mock = MockSonos::standalone().with_groups(vec![group(
            "RINCON_LIVING",
            &[
                ("RINCON_LIVING", "192.168.1.2", "Living Room"),
                (TEST_UUID, TEST_IP, "Kitchen"),
            ],
        )]);

        let err = check_coordinator(&mock, &handle("Kitchen", TEST_IP))
            .await
            .expect_err("member");
        assert_eq!(err.exit_code(), 2);
        assert!(matches!(
            err,
            UsageError::NotCoordinator { ref coordinator, .. } if coordinator == "Living Room"
        ));
    }

    #[tokio::test]
    async fn missing_group_or_coordinator_is_rejected() {
        let ungrouped = MockSonos::standalone().with_groups(Vec::new());
        let err = check_coordinator(&ungrouped, &handle("Kitchen", TEST_IP))
            .await
            .expect_err("no group");
        assert!(matches!(err, UsageError::NoGroup { .. }));

        let headless = MockSonos::standalone()
            .with_groups(vec![group("RINCON_GONE", &[(TEST_UUID, TEST_IP, "Kitchen")])]);
        let err = check_coordinator(&headless, &handle("Kitchen", TEST_IP))
            .await
            .expect_err("no coordinator");
        assert!(matches!(err, UsageError::NoCoordinator { .. }));
        assert_eq!(err.exit_code(), 2);
    }
}
