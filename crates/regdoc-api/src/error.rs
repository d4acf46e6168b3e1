//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use regdoc_core::Error;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Domain(#[from] Error),

  /// `If-Match` named a representation other than the current one.
  #[error("precondition failed: {0}")]
  PreconditionFailed(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
      ApiError::Domain(e) => match e {
        Error::Validation(_) | Error::MissingSummary | Error::MissingActor => {
          StatusCode::UNPROCESSABLE_ENTITY
        }
        Error::DuplicateReferenceCode(_)
        | Error::SelfParent(_)
        | Error::Cycle { .. }
        | Error::DepthExceeded(_)
        | Error::StaleVersion { .. }
        | Error::Archived(_) => StatusCode::CONFLICT,
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
