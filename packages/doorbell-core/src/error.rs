//! Centralized error types for the doorbell core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for the small HTML bodies doorbell clients expect

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::response::html_response;
use crate::sonos::discovery::DiscoveryError;
use crate::sonos::soap::SoapError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::SocketBind(_) => "socket_bind_failed",
            Self::NoInterfaces => "no_network_interfaces",
            Self::AllMethodsFailed(_) => "all_discovery_methods_failed",
        }
    }
}

impl ErrorCode for SoapError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_, _) => "http_error_status",
            Self::Fault(_) => "soap_fault",
            Self::Parse => "soap_parse_error",
        }
    }
}

/// Reasons a trigger request cannot be turned into a ring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    /// A ringtone was requested by name and no catalog entry matches.
    ///
    /// Carries every known display name for the diagnostic body.
    #[error("Ringtone not found")]
    RingtoneNotFound { known: Vec<String> },

    /// No ringtone was requested and the catalog is empty.
    #[error("No ringtones available")]
    NoRingtonesAvailable,
}

/// Application-wide error type for the doorbell.
#[derive(Debug, Error)]
pub enum DoorbellError {
    /// The trigger request could not be resolved to a ringtone.
    #[error(transparent)]
    Trigger(#[from] TriggerError),

    /// A ring is already in progress.
    #[error("Doorbell already playing")]
    RingInProgress,

    /// A command to the speaker failed.
    #[error("Remote control failed: {0}")]
    Soap(#[from] SoapError),
}

impl DoorbellError {
    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Trigger(TriggerError::RingtoneNotFound { .. }) => "ringtone_not_found",
            Self::Trigger(TriggerError::NoRingtonesAvailable) => "no_ringtones_available",
            Self::RingInProgress => "ring_in_progress",
            Self::Soap(e) => e.code(),
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Trigger(TriggerError::RingtoneNotFound { .. }) => StatusCode::NOT_FOUND,
            Self::RingInProgress => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable body text (HTML fragment, names escaped).
    ///
    /// Remote-control failures are reported generically.
    fn body(&self) -> String {
        match self {
            Self::Trigger(TriggerError::RingtoneNotFound { known }) => {
                let items: String = known
                    .iter()
                    .map(|name| format!("<li>{}</li>", html_escape::encode_text(name)))
                    .collect();
                format!("Ringtone not found<br/><ul>{}</ul>", items)
            }
            Self::Soap(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

// Re-export Result type aliases from their defining modules
pub use crate::sonos::discovery::DiscoveryResult;
pub use crate::sonos::soap::SoapResult;

/// Convenient Result alias for application-wide operations.
pub type DoorbellResult<T> = Result<T, DoorbellError>;

impl IntoResponse for DoorbellError {
    fn into_response(self) -> Response {
        html_response(self.status_code(), &self.body())
    }
}
