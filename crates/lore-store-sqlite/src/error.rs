//! Error type for `lore-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] lore_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column held a value the domain types cannot represent.
  #[error("decode error: {0}")]
  Decode(String),
}

impl Error {
  /// The constraint message of a SQLite constraint violation, if this is one.
  fn constraint_message(&self) -> Option<&str> {
    let err = match self {
      Self::Sqlite(e) => e,
      Self::Database(tokio_rusqlite::Error::Rusqlite(e)) => e,
      _ => return None,
    };
    match err {
      rusqlite::Error::SqliteFailure(f, msg)
        if f.code == ErrorCode::ConstraintViolation =>
      {
        Some(msg.as_deref().unwrap_or(""))
      }
      _ => None,
    }
  }

  pub(crate) fn is_constraint_violation(&self) -> bool {
    self.constraint_message().is_some()
  }

  /// Two writers assigned the same version number to one article.
  pub(crate) fn is_version_conflict(&self) -> bool {
    self
      .constraint_message()
      .is_some_and(|m| m.contains("article_versions.version_number"))
  }
}

impl lore_core::StoreError for Error {
  fn domain(&self) -> Option<&lore_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
