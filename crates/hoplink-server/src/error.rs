//! HTTP error type and axum `IntoResponse` implementation.

use axum::{
  Json,
  extract::rejection::QueryRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by a handler. The response body is always
/// `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum Error {
  #[error("bad request: {0}")]
  BadRequest(String),

  /// Missing or mismatched API key. Deliberately carries no detail.
  #[error("forbidden")]
  Forbidden,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A query string that does not deserialise (a repeated field, say) gets the
/// same JSON body as any other 400.
impl From<QueryRejection> for Error {
  fn from(rejection: QueryRejection) -> Self {
    Error::BadRequest(rejection.body_text())
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      Error::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
      Error::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
      Error::NotFound(m) => (StatusCode::NOT_FOUND, m),
      Error::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
