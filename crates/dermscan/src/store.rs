//! Persisted scan history
//!
//! The history is one JSON document holding every `ScanRecord` in insertion
//! order. Every mutation is a whole-document read-modify-write, so all
//! operations go through a single async mutex that is held for the full cycle,
//! including the write. A mutation is applied to a working copy, persisted,
//! and only then committed to memory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::record::{Annotation, ScanRecord};

struct StoreInner {
  path: PathBuf,
  /// `None` until first read, and again after a failed read
  records: Option<Vec<ScanRecord>>,
}

/// Result of `ScanStore::load_or_empty`
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedHistory {
  pub records: Vec<ScanRecord>,
  /// The document was unreadable and an empty history stands in for it
  pub recovered_from_corrupt: bool,
}

/// Handle to the scan history; clones share the same state and lock
#[derive(Clone)]
pub struct ScanStore {
  path: PathBuf,
  inner: Arc<Mutex<StoreInner>>,
}

// Document I/O
// ============

async fn read_document(path: &Path) -> Result<Vec<ScanRecord>, StoreError> {
  match tokio::fs::read(path).await {
    Ok(bytes) => {
      serde_json::from_slice(&bytes).map_err(|e| StoreError::corrupt(path, e.to_string()))
    }
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
    Err(e) => Err(StoreError::io(path, e)),
  }
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
  let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
  path.with_file_name(format!("{file_name}{suffix}"))
}

/// Write the whole document to a temp file and rename it into place
async fn write_document(path: &Path, records: &[ScanRecord]) -> Result<(), StoreError> {
  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent).await.map_err(|e| StoreError::io(parent, e))?;
  }

  let json = serde_json::to_vec_pretty(records)
    .map_err(|e| StoreError::Encode { message: e.to_string() })?;

  let tmp_path = sibling_path(path, ".tmp");
  tokio::fs::write(&tmp_path, json).await.map_err(|e| StoreError::io(&tmp_path, e))?;
  tokio::fs::rename(&tmp_path, path).await.map_err(|e| StoreError::io(path, e))?;
  Ok(())
}

impl StoreInner {
  async fn ensure_loaded(&mut self) -> Result<&mut Vec<ScanRecord>, StoreError> {
    let records = match self.records.take() {
      Some(records) => records,
      None => read_document(&self.path).await?,
    };
    Ok(self.records.insert(records))
  }

  /// Records to mutate; a corrupt document is set aside and history restarts empty
  async fn working_copy(&mut self) -> Result<Vec<ScanRecord>, StoreError> {
    let loaded = self.ensure_loaded().await.map(|records| records.clone());
    match loaded {
      Ok(records) => Ok(records),
      Err(StoreError::Corrupt { message, .. }) => {
        self.quarantine(&message).await?;
        Ok(Vec::new())
      }
      Err(e) => Err(e),
    }
  }

  async fn quarantine(&mut self, reason: &str) -> Result<(), StoreError> {
    let suffix = format!(".corrupt-{}-{}", chrono::Utc::now().timestamp(), Uuid::new_v4().simple());
    let target = sibling_path(&self.path, &suffix);
    tokio::fs::rename(&self.path, &target).await.map_err(|e| StoreError::io(&self.path, e))?;

    tracing::warn!(
      path = %self.path.display(),
      moved_to = %target.display(),
      reason,
      "scan history was corrupt; starting a fresh history"
    );
    self.records = None;
    Ok(())
  }

  async fn commit(&mut self, records: Vec<ScanRecord>) -> Result<(), StoreError> {
    write_document(&self.path, &records).await?;
    self.records = Some(records);
    Ok(())
  }
}

impl ScanStore {
  /// Open the history at `path`; nothing is read until first use
  pub fn open(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let inner = StoreInner { path: path.clone(), records: None };
    Self { path, inner: Arc::new(Mutex::new(inner)) }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Re-read the persisted document
  ///
  /// Returns an empty history when no document exists yet, and
  /// `StoreError::Corrupt` when the document cannot be parsed.
  pub async fn load(&self) -> Result<Vec<ScanRecord>, StoreError> {
    let mut inner = self.inner.lock().await;
    inner.records = None;
    Ok(inner.ensure_loaded().await?.clone())
  }

  /// `load`, degrading a corrupt document to an empty history
  ///
  /// I/O failures other than corruption are still returned.
  pub async fn load_or_empty(&self) -> Result<LoadedHistory, StoreError> {
    match self.load().await {
      Ok(records) => Ok(LoadedHistory { records, recovered_from_corrupt: false }),
      Err(e) if e.is_corrupt() => {
        tracing::warn!(error = %e, "ignoring corrupt scan history");
        Ok(LoadedHistory { records: Vec::new(), recovered_from_corrupt: true })
      }
      Err(e) => Err(e),
    }
  }

  pub async fn get(&self, scan_id: &str) -> Result<Option<ScanRecord>, StoreError> {
    let mut inner = self.inner.lock().await;
    let records = inner.ensure_loaded().await?;
    Ok(records.iter().find(|r| r.scan_id == scan_id).cloned())
  }

  pub async fn len(&self) -> Result<usize, StoreError> {
    let mut inner = self.inner.lock().await;
    Ok(inner.ensure_loaded().await?.len())
  }

  pub async fn is_empty(&self) -> Result<bool, StoreError> {
    Ok(self.len().await? == 0)
  }

  /// Add a record at the end of the history and persist the whole document
  pub async fn append(&self, record: ScanRecord) -> Result<(), StoreError> {
    let mut inner = self.inner.lock().await;
    let mut records = inner.working_copy().await?;

    if records.iter().any(|r| r.scan_id == record.scan_id) {
      return Err(StoreError::duplicate(record.scan_id));
    }

    let scan_id = record.scan_id.clone();
    records.push(record);
    inner.commit(records).await?;

    tracing::debug!(scan_id = %scan_id, "appended scan record");
    Ok(())
  }

  /// Change the annotation of one record and persist the whole document
  ///
  /// Only the annotation is handed to `mutator`, so no other field can change.
  pub async fn patch<F>(&self, scan_id: &str, mutator: F) -> Result<ScanRecord, StoreError>
  where
    F: FnOnce(&mut Annotation) + Send,
  {
    let mut inner = self.inner.lock().await;
    let mut records = inner.working_copy().await?;

    let record = records
      .iter_mut()
      .find(|r| r.scan_id == scan_id)
      .ok_or_else(|| StoreError::not_found(scan_id))?;
    mutator(&mut record.actual_result);
    let updated = record.clone();

    inner.commit(records).await?;

    tracing::debug!(scan_id, annotated = updated.is_annotated(), "patched scan record");
    Ok(updated)
  }
}
