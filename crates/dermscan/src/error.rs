//! Error taxonomy for the scan lifecycle
//!
//! Every failure is reported to the immediate caller. None of these are fatal
//! to the application; the CLI renders them as a notification and exits.

use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the remote inference/annotation service
#[derive(Error, Debug)]
pub enum ServiceError {
  #[error("request failed: {message}")]
  Transport { message: String },

  #[error("server rejected the request with status {status}")]
  Rejected { status: u16, detail: Option<String> },

  #[error("could not decode server response: {message}")]
  Decode { message: String },
}

impl ServiceError {
  pub fn transport(message: impl Into<String>) -> Self {
    Self::Transport { message: message.into() }
  }

  pub fn rejected(status: u16, detail: Option<String>) -> Self {
    Self::Rejected { status, detail }
  }

  pub fn decode(message: impl Into<String>) -> Self {
    Self::Decode { message: message.into() }
  }

  /// The server-provided detail when there is one, else this error's own message
  pub fn detail_or_message(&self) -> String {
    match self {
      Self::Rejected { detail: Some(detail), .. } => detail.clone(),
      other => other.to_string(),
    }
  }
}

/// Failures between picking an image and holding a persisted `ScanRecord`
#[derive(Error, Debug)]
pub enum UploadError {
  #[error("failed to stage image {}: {message}", path.display())]
  Staging { path: PathBuf, message: String },

  #[error("cannot determine an image type for {}", path.display())]
  UnsupportedImage { path: PathBuf },

  #[error("inference request failed: {0}")]
  Service(#[from] ServiceError),

  #[error("inference service returned an unusable result: {message}")]
  InvalidResponse { message: String },

  #[error("scan result could not be saved: {0}")]
  Persist(#[from] StoreError),
}

impl UploadError {
  pub fn staging(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
    Self::Staging { path: path.into(), message: message.into() }
  }

  pub fn unsupported_image(path: impl Into<PathBuf>) -> Self {
    Self::UnsupportedImage { path: path.into() }
  }

  pub fn invalid_response(message: impl Into<String>) -> Self {
    Self::InvalidResponse { message: message.into() }
  }
}

/// Failures of the persisted scan history
#[derive(Error, Debug)]
pub enum StoreError {
  #[error("scan history at {} is corrupt: {message}", path.display())]
  Corrupt { path: PathBuf, message: String },

  #[error("scan {scan_id} not found")]
  NotFound { scan_id: String },

  #[error("scan {scan_id} already exists")]
  Duplicate { scan_id: String },

  #[error("scan history I/O failed at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to encode scan history: {message}")]
  Encode { message: String },
}

impl StoreError {
  pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
    Self::Corrupt { path: path.into(), message: message.into() }
  }

  pub fn not_found(scan_id: impl Into<String>) -> Self {
    Self::NotFound { scan_id: scan_id.into() }
  }

  pub fn duplicate(scan_id: impl Into<String>) -> Self {
    Self::Duplicate { scan_id: scan_id.into() }
  }

  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io { path: path.into(), source }
  }

  pub fn is_corrupt(&self) -> bool {
    matches!(self, Self::Corrupt { .. })
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound { .. })
  }
}

/// Failures applying a confirmed diagnosis to a stored scan
#[derive(Error, Debug)]
pub enum ReconciliationError {
  #[error("invalid annotation: {message}")]
  InvalidInput { message: String },

  #[error("scan {scan_id} is not in the local history")]
  UnknownScan { scan_id: String },

  #[error("server did not accept the result for scan {scan_id}: {detail}")]
  Remote { scan_id: String, detail: String },

  /// The server accepted the annotation but the local history could not be updated
  #[error("server accepted the result for scan {scan_id} but the local history was not updated: {cause}")]
  Partial {
    scan_id: String,
    #[source]
    cause: StoreError,
  },

  #[error(transparent)]
  Store(#[from] StoreError),
}

impl ReconciliationError {
  pub fn invalid_input(message: impl Into<String>) -> Self {
    Self::InvalidInput { message: message.into() }
  }

  pub fn unknown_scan(scan_id: impl Into<String>) -> Self {
    Self::UnknownScan { scan_id: scan_id.into() }
  }

  pub fn remote(scan_id: impl Into<String>, detail: impl Into<String>) -> Self {
    Self::Remote { scan_id: scan_id.into(), detail: detail.into() }
  }

  pub fn partial(scan_id: impl Into<String>, cause: StoreError) -> Self {
    Self::Partial { scan_id: scan_id.into(), cause }
  }

  /// True when the server and the local history now disagree
  pub fn is_partial(&self) -> bool {
    matches!(self, Self::Partial { .. })
  }
}

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("could not find home directory")]
  NoHomeDir,

  #[error("invalid server url '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  #[error("failed to read config {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config {}: {message}", path.display())]
  Parse { path: PathBuf, message: String },
}
