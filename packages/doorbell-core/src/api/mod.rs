//! HTTP API layer.
//!
//! This module contains thin handlers that delegate to services.
//! It provides the router construction and server startup functionality.

use std::future::Future;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::catalog::Catalog;
use crate::context::NetworkContext;
use crate::protocol_constants::BIND_RETRY_DELAY_SECS;
use crate::runtime::TokioSpawner;
use crate::services::{DoorbellOrchestrator, SpeakerHandle};
use crate::state::Config;

pub mod http;
pub mod response;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind or serve on the TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// The port stayed in use through every bind attempt.
    #[error("Port {port} still in use after {attempts} attempt(s)")]
    PortInUse { port: u16, attempts: u32 },
}

/// Shared application state for the API layer.
///
/// This is a thin wrapper that holds references to services.
/// All business logic lives in the services themselves.
#[derive(Clone)]
pub struct AppState {
    /// Ringtones, read-only after startup.
    pub catalog: Arc<Catalog>,
    /// Owns the Idle/Ringing state and drives ring cycles.
    pub orchestrator: Arc<DoorbellOrchestrator>,
    /// The speaker every ring targets.
    pub device: Arc<SpeakerHandle>,
    /// Network configuration (port, advertise IP).
    pub network: NetworkContext,
    /// Application configuration.
    pub config: Arc<Config>,
    /// Runs ring cycles detached from their request.
    pub spawner: TokioSpawner,
}

/// Binds `0.0.0.0:port`, retrying up to `retries` more times while the port
/// is in use.
pub async fn bind_with_retry(
    port: u16,
    retries: u32,
    delay: Duration,
) -> Result<TcpListener, ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let mut attempt = 0;
    loop {
        attempt += 1;
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                if attempt > retries {
                    return Err(ServerError::PortInUse {
                        port,
                        attempts: attempt,
                    });
                }
                log::warn!(
                    "[Server] Port {} in use, retrying in {}s ({}/{})",
                    port,
                    delay.as_secs(),
                    attempt,
                    retries
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Starts the HTTP server and runs it until `shutdown` resolves.
pub async fn start_server<F>(state: AppState, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let port = state.network.port();
    let listener = bind_with_retry(
        port,
        state.config.bind_retries,
        Duration::from_secs(BIND_RETRY_DELAY_SECS),
    )
    .await?;

    log::info!(
        "[Server] Listening on http://0.0.0.0:{} (speakers fetch from {})",
        port,
        state.network.url_builder().base_url()
    );
    let app = http::create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    log::info!("[Server] Listener closed");
    Ok(())
}
