//! Error types for `lore-core`.

use thiserror::Error;
use uuid::Uuid;

/// A domain-level failure. Every variant is recoverable by the caller
/// correcting its input or retrying.
#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("permission denied: {0}")]
  PermissionDenied(String),

  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: Uuid },

  #[error("conflict: {0}")]
  Conflict(String),
}

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }

  pub fn denied(msg: impl Into<String>) -> Self {
    Self::PermissionDenied(msg.into())
  }

  pub fn not_found(entity: &'static str, id: Uuid) -> Self {
    Self::NotFound { entity, id }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Implemented by storage backend errors so that higher layers can tell a
/// domain rejection apart from an infrastructure failure without knowing the
/// concrete backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The domain error wrapped by this backend error, if there is one.
  fn domain(&self) -> Option<&Error>;
}

impl StoreError for Error {
  fn domain(&self) -> Option<&Error> { Some(self) }
}
