//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use lore_core::StoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a backend error onto a status: domain rejections keep their meaning,
  /// everything else is a 500.
  pub fn from_store<E: StoreError>(err: E) -> Self {
    match err.domain() {
      Some(lore_core::Error::Validation(m)) => Self::BadRequest(m.clone()),
      Some(lore_core::Error::PermissionDenied(m)) => Self::Forbidden(m.clone()),
      Some(e @ lore_core::Error::NotFound { .. }) => Self::NotFound(e.to_string()),
      Some(lore_core::Error::Conflict(m)) => Self::Conflict(m.clone()),
      None => Self::Store(Box::new(err)),
    }
  }
}

impl From<lore_core::Error> for ApiError {
  fn from(err: lore_core::Error) -> Self { Self::from_store(err) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };

    let mut res = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"lore\""),
      );
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  #[test]
  fn domain_errors_keep_their_status() {
    let cases = [
      (lore_core::Error::validation("bad"), StatusCode::BAD_REQUEST),
      (lore_core::Error::denied("no"), StatusCode::FORBIDDEN),
      (lore_core::Error::not_found("article", Uuid::nil()), StatusCode::NOT_FOUND),
      (lore_core::Error::Conflict("race".into()), StatusCode::CONFLICT),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }

  #[test]
  fn unauthorized_carries_challenge() {
    let res = ApiError::Unauthorized.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
  }
}
