//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together. Startup runs in two steps:
//!
//! 1. [`bootstrap_services`] builds the shared HTTP client, the Sonos client
//!    and the ringtone catalog.
//! 2. [`BootstrappedServices::resolve_device`] finds and validates the target
//!    speaker, after which [`BootstrappedServices::into_app_state`] produces
//!    the state the HTTP server runs on.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::api::AppState;
use crate::catalog::{Catalog, CatalogError};
use crate::context::NetworkContext;
use crate::protocol_constants::SOAP_TIMEOUT_SECS;
use crate::runtime::TokioSpawner;
use crate::services::{
    check_coordinator, DeviceResolver, DoorbellOrchestrator, SpeakerHandle, UsageError,
};
use crate::sonos::{SonosClientImpl, SonosDiscovery};
use crate::state::Config;

/// Errors that prevent the services from being built.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Sonos client for discovery and speaker control.
    pub sonos: Arc<SonosClientImpl>,
    /// Ringtones found under the music directory.
    pub catalog: Arc<Catalog>,
    /// Network configuration (port, advertise IP).
    pub network: NetworkContext,
    /// Task spawner for ring cycles.
    pub spawner: TokioSpawner,
    config: Arc<Config>,
}

impl BootstrappedServices {
    /// Finds the speaker for `zone` and checks that it coordinates its group.
    ///
    /// The address of a discovered speaker is cached in `cache_dir`.
    pub async fn resolve_device(
        &self,
        zone: &str,
        cache_dir: &Path,
    ) -> Result<SpeakerHandle, UsageError> {
        let resolver = DeviceResolver::with_cache_dir(
            Arc::clone(&self.sonos) as Arc<dyn SonosDiscovery>,
            cache_dir,
        );
        let device = resolver.resolve(zone).await?;
        check_coordinator(self.sonos.as_ref(), &device).await?;
        log::info!("[Bootstrap] Ringing on {}", device);
        Ok(device)
    }

    /// Builds the HTTP server state for ringing on `device`.
    pub fn into_app_state(self, device: SpeakerHandle) -> AppState {
        let orchestrator = Arc::new(DoorbellOrchestrator::new(
            self.sonos,
            self.network.url_builder(),
        ));
        AppState {
            catalog: self.catalog,
            orchestrator,
            device: Arc::new(device),
            network: self.network,
            config: self.config,
            spawner: self.spawner,
        }
    }
}

/// Creates the shared HTTP client for all Sonos communication.
///
/// Using a shared client enables connection pooling across SOAP calls.
fn create_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
        .build()
}

/// Bootstraps all application services with their dependencies.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the music directory
/// cannot be read or the HTTP client cannot be created.
pub fn bootstrap_services(
    config: Config,
    music_dir: &Path,
    network: NetworkContext,
) -> Result<BootstrappedServices, BootstrapError> {
    config.validate().map_err(BootstrapError::Config)?;

    let catalog = Arc::new(Catalog::load(music_dir)?);
    log::info!("[Bootstrap] {} ringtone(s) available", catalog.len());

    let http_client = create_http_client()?;
    let sonos = Arc::new(SonosClientImpl::with_discovery_config(
        http_client,
        config.discovery_config(),
    ));

    Ok(BootstrappedServices {
        sonos,
        catalog,
        network,
        spawner: TokioSpawner::current(),
        config: Arc::new(config),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_client_has_timeout() {
        let client = create_http_client().expect("client");
        assert!(client.get("http://example.com").build().is_ok());
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_config() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config {
            default_volume: 120,
            ..Config::default()
        };
        let result = bootstrap_services(config, dir.path(), NetworkContext::for_test());
        assert!(matches!(result, Err(BootstrapError::Config(_))));
    }

    #[tokio::test]
    async fn bootstrap_fails_on_missing_music_dir() {
        let result = bootstrap_services(
            Config::default(),
            Path::new("/nonexistent/music"),
            NetworkContext::for_test(),
        );
        assert!(matches!(result, Err(BootstrapError::Catalog(_))));
    }

    #[tokio::test]
    async fn bootstrap_builds_app_state() {
        let dir = tempfile::tempdir().expect("temp dir");
        let services = bootstrap_services(Config::default(), dir.path(), NetworkContext::for_test())
            .expect("bootstrap");
        assert!(services.catalog.is_empty());

        let state = services.into_app_state(SpeakerHandle {
            ip: "192.168.1.50".parse().expect("ip"),
            name: "Kitchen".into(),
            uuid: None,
        });
        assert!(!state.orchestrator.is_ringing());
        assert_eq!(state.device.name, "Kitchen");
    }
}
