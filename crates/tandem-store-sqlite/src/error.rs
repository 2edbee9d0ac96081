//! Error type for `tandem-store-sqlite`.
//!
//! Domain errors raised inside a transaction closure travel out through
//! `tokio_rusqlite::Error::Other` and are unwrapped back into their typed
//! form by the `From` conversion below.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(tandem_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("column decode error: {0}")]
  Decode(String),
}

impl From<tandem_core::Error> for Error {
  fn from(e: tandem_core::Error) -> Self { Self::Core(e) }
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Other(boxed) => {
        let boxed = match boxed.downcast::<Error>() {
          Ok(own) => return *own,
          Err(other) => other,
        };
        match boxed.downcast::<tandem_core::Error>() {
          Ok(core) => Error::Core(*core),
          Err(other) => Error::Database(tokio_rusqlite::Error::Other(other)),
        }
      }
      other => Error::Database(other),
    }
  }
}

/// The orchestrator and API layers speak the core taxonomy; anything that
/// is not already a core error is surfaced as a transient storage failure.
impl From<Error> for tandem_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      other => tandem_core::Error::Storage(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
