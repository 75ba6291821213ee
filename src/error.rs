use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// `axum`-compatible error handler.
///
/// Carries the HTTP status to surface and the full `anyhow` context chain
/// for the log. The taxonomy used throughout the API:
/// validation -> 400, conflict -> 400, not found -> 404, forbidden -> 403,
/// unauthorized -> 401, anything unexpected -> 500.
#[derive(Error)]
pub struct Error {
    status: StatusCode,
    err: anyhow::Error,
}

impl Error {
    pub fn with_status(status: StatusCode, err: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            err: err.into(),
        }
    }

    /// Malformed or illegal input.
    pub fn validation(err: impl Into<anyhow::Error>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, err)
    }

    /// Date-range overlap or duplicate resource. The source system maps
    /// conflicts to 400 rather than 409; that mapping is kept.
    pub fn conflict(err: impl Into<anyhow::Error>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, err)
    }

    pub fn not_found(err: impl Into<anyhow::Error>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, err)
    }

    /// Role or ownership violation.
    pub fn forbidden(err: impl Into<anyhow::Error>) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, err)
    }

    pub fn unauthorized(err: impl Into<anyhow::Error>) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            err,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?}", self.status, self.err)
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.err.fmt(f)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        error!("{:?}", self.err);

        // N.B: Forward out the error message to the requester if this is a debug build.
        // This is insecure for production builds, so we'll return an empty body if this
        // is a release build.
        if cfg!(debug_assertions) {
            let body = serde_json::json!({ "error": format!("{:?}", self.err) });
            Response::builder()
                .status(self.status)
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(Body::new(body.to_string()))
                .unwrap()
        } else {
            Response::builder()
                .status(self.status)
                .body(Body::empty())
                .unwrap()
        }
    }
}
