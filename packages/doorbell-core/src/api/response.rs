//! Response helpers for the trigger endpoint.
//!
//! Doorbell clients (home automation buttons, scripts) read the status line
//! and a tiny HTML body of the form `<body>{code} - {message}</body>`.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// Renders `message` as `<body>{code} - {message}</body>` with `text/html`.
///
/// `message` is inserted verbatim; callers escape anything user-provided.
pub fn html_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        format!("<body>{} - {}</body>", status.as_u16(), message),
    )
        .into_response()
}

/// Acknowledges an accepted trigger.
pub fn ring_accepted(request_id: &str) -> Response {
    html_response(
        StatusCode::OK,
        &format!("Doorbell received (request_id:{})", request_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_response_sets_status_and_content_type() {
        let response = html_response(StatusCode::TOO_MANY_REQUESTS, "Doorbell already playing");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
    }
}
