//! Error types for the store, the upstream client and the project directory.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failures of the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
  #[error("Failed to open store at {}: {source}", path.display())]
  Open {
    path: PathBuf,
    #[source]
    source: rusqlite::Error,
  },

  #[error("Failed to create store directory: {0}")]
  Io(#[from] std::io::Error),

  #[error("Store operation failed: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("Store is closed")]
  Closed,

  #[error("Lock poisoned: {0}")]
  Poisoned(String),

  #[error("Failed to decode record {key}: {source}")]
  Record {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("Record {key} has unsupported schema version {version}")]
  UnsupportedVersion { key: String, version: u32 },
}

/// Failures talking to the repository hosting API.
#[derive(Error, Debug)]
pub enum UpstreamError {
  #[error("GitHub API error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Authentication failed: invalid or expired token")]
  Unauthorized,

  #[error("Resource not found: {0}")]
  NotFound(String),

  #[error("Rate limit exceeded, resets at {reset_at}")]
  RateLimited { reset_at: String },

  #[error("HTTP {status}: {body}")]
  Status { status: StatusCode, body: String },

  #[error("JSON parsing error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Invalid header value: {0}")]
  Header(#[from] reqwest::header::InvalidHeaderValue),
}

/// Failures adding a project to the directory.
#[derive(Error, Debug)]
pub enum DirectoryError {
  #[error("Invalid repository spec {0:?}: expected owner/repo or repo")]
  InvalidSpec(String),

  #[error("The project already exists: {0}")]
  Duplicate(String),

  #[error("Repository not found: {0}")]
  NotFound(String),

  #[error(transparent)]
  Upstream(UpstreamError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

impl From<UpstreamError> for DirectoryError {
  fn from(err: UpstreamError) -> Self {
    match err {
      UpstreamError::NotFound(what) => DirectoryError::NotFound(what),
      other => DirectoryError::Upstream(other),
    }
  }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
