//! Wire error types and response handling

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
    response::IntoResponse,
};
use std::fmt;

/// Protocol-level failures of a wire request
///
/// Recoverable conditions (bad signature, unknown action or listener) never
/// become a `WireError`; they are absorbed inside the registry.
#[derive(Debug)]
pub enum WireError {
    /// Unreadable body, bad JSON, missing `name`/`state`
    BadRequest(String),
    /// Unknown component type
    NotFound(String),
    /// Anything but POST
    MethodNotAllowed(String),
    /// A hook or handler failed or panicked
    Internal(String),
}

impl WireError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::MethodNotAllowed(msg)
            | Self::Internal(msg) => msg,
        }
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.status(), self.message())
    }
}

impl std::error::Error for WireError {}

impl IntoResponse for WireError {
    fn into_response(self) -> Response<Body> {
        let status = self.status();

        // Client mistakes are not server faults; keep them out of the error log
        match &self {
            Self::BadRequest(msg) | Self::MethodNotAllowed(msg) => {
                tracing::debug!("Wire request rejected: {} - {}", status, msg)
            }
            Self::NotFound(msg) => tracing::info!("Wire request rejected: {} - {}", status, msg),
            Self::Internal(msg) => tracing::error!("Wire error: {} - {}", status, msg),
        }

        let mut builder = Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8");
        if let Self::MethodNotAllowed(_) = self {
            builder = builder.header(header::ALLOW, "POST");
        }

        let message = match self {
            Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::MethodNotAllowed(msg)
            | Self::Internal(msg) => msg,
        };

        builder
            .body(Body::from(message))
            .unwrap_or_else(|_| Response::new(Body::from("Internal error building error response")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            WireError::BadRequest(String::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WireError::NotFound(String::new()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WireError::MethodNotAllowed(String::new()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            WireError::Internal(String::new()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_method_not_allowed_advertises_post() {
        let response = WireError::MethodNotAllowed("GET".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "POST");
    }
}
