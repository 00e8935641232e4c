//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to services for business logic.

use std::num::IntErrorKind;

use axum::{
    extract::State,
    http::Uri,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::response::ring_accepted;
use crate::api::AppState;
use crate::catalog::{AudioEntry, Catalog};
use crate::error::{DoorbellError, DoorbellResult, TriggerError};
use crate::protocol_constants::{MAX_VOLUME, TRIGGER_PATH};
use crate::runtime::TaskSpawner;
use crate::services::RingOutcome;

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

/// Trigger query string; unknown parameters are ignored.
#[derive(Debug, Default, PartialEq)]
struct TriggerQuery {
    ringtone: Option<String>,
    volume: Option<String>,
}

impl TriggerQuery {
    /// Decodes the query, keeping the first value of a repeated parameter.
    fn parse(query: Option<&str>) -> Self {
        let mut parsed = Self::default();
        let Some(query) = query else {
            return parsed;
        };
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "ringtone" => &mut parsed.ringtone,
                "volume" => &mut parsed.volume,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        parsed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router: the trigger route plus static files from the
/// catalog root for every other path.
pub fn create_router(state: AppState) -> Router {
    let static_files = ServeDir::new(state.catalog.root());
    Router::new()
        .route(TRIGGER_PATH, get(handle_trigger))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Trigger
// ─────────────────────────────────────────────────────────────────────────────

/// Parses the `volume` parameter, clamping integers into `0..=MAX_VOLUME`.
///
/// Absent or non-numeric values fall back to `default`.
fn parse_volume(raw: Option<&str>, default: u8) -> u8 {
    let Some(raw) = raw.map(str::trim) else {
        return default;
    };
    match raw.parse::<i64>() {
        Ok(value) => value.clamp(0, i64::from(MAX_VOLUME)) as u8,
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => MAX_VOLUME,
            IntErrorKind::NegOverflow => 0,
            _ => default,
        },
    }
}

/// Picks the requested ringtone, or a random one when none was named.
fn resolve_ringtone<'a>(
    catalog: &'a Catalog,
    requested: Option<&str>,
) -> Result<&'a AudioEntry, TriggerError> {
    match requested.filter(|name| !name.is_empty()) {
        Some(name) => catalog.find(name).ok_or_else(|| TriggerError::RingtoneNotFound {
            known: catalog
                .display_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }),
        None => catalog.choose_random(),
    }
}

/// Short request id for correlating the acknowledgement with ring logs.
fn new_request_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

async fn handle_trigger(State(state): State<AppState>, uri: Uri) -> Response {
    match accept_trigger(&state, &uri) {
        Ok(response) => response,
        Err(e) => {
            log::info!("[Server] Trigger rejected ({}): {}", e.code(), e);
            e.into_response()
        }
    }
}

fn accept_trigger(state: &AppState, uri: &Uri) -> DoorbellResult<Response> {
    // The guard moves into the ring task; early returns below release it
    let guard = state
        .orchestrator
        .try_begin()
        .ok_or(DoorbellError::RingInProgress)?;

    let query = TriggerQuery::parse(uri.query());

    let entry = resolve_ringtone(&state.catalog, query.ringtone.as_deref())?.clone();
    let volume = parse_volume(query.volume.as_deref(), state.config.default_volume);
    let request_id = new_request_id();

    log::info!(
        "[Server] Doorbell pressed (request_id:{}): '{}' at volume {}",
        request_id,
        entry.display_name,
        volume
    );

    let orchestrator = state.orchestrator.clone();
    let device = state.device.clone();
    let id = request_id.clone();
    state.spawner.spawn("ring", async move {
        match orchestrator.ring_with_guard(guard, &entry, volume, &device).await {
            RingOutcome::Completed => log::info!("[Doorbell] request_id:{} completed", id),
            RingOutcome::Skipped => log::info!("[Doorbell] request_id:{} skipped", id),
            RingOutcome::Busy => log::info!("[Doorbell] request_id:{} dropped, busy", id),
            RingOutcome::Failed(e) => {
                log::warn!("[Doorbell] request_id:{} failed ({}): {}", id, e.code(), e)
            }
        }
    });

    Ok(ring_accepted(&request_id))
}
