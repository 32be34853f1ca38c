//! Image -> inference request -> persisted `ScanRecord`

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::UploadError;
use crate::record::ScanRecord;
use crate::service::{QuickScanResponse, ScanService};
use crate::staging::{self, StagedImage};
use crate::store::ScanStore;

pub struct UploadPipeline {
  service: Arc<dyn ScanService>,
  store: ScanStore,
  staging_dir: PathBuf,
}

impl UploadPipeline {
  pub fn new(service: Arc<dyn ScanService>, store: ScanStore, staging_dir: impl Into<PathBuf>) -> Self {
    Self { service, store, staging_dir: staging_dir.into() }
  }

  /// Stage `image`, send it for inference once, and append the result to the history
  ///
  /// The returned record is already persisted. On any failure nothing is
  /// appended. There is no retry.
  pub async fn submit(&self, image: &Path) -> Result<ScanRecord, UploadError> {
    let staged = staging::stage(image, &self.staging_dir).await?;
    let outcome = self.request(&staged).await;
    staged.discard().await;

    let response = outcome?;
    let artifact_url = self.service.artifact_url(&response.explainability_image_path);
    let record = record_from_response(response, artifact_url, Utc::now())?;

    self.store.append(record.clone()).await?;

    tracing::info!(
      scan_id = %record.scan_id,
      top_label = record.top_prediction().map(|p| p.label.as_str()).unwrap_or("N/A"),
      "scan recorded"
    );
    Ok(record)
  }

  async fn request(&self, staged: &StagedImage) -> Result<QuickScanResponse, UploadError> {
    let upload = staged.read_upload().await?;
    Ok(self.service.quick_scan(upload).await?)
  }
}

/// Build the record for a successful inference response
pub fn record_from_response(
  response: QuickScanResponse,
  explainability_image: String,
  captured_at: DateTime<Utc>,
) -> Result<ScanRecord, UploadError> {
  if response.id.trim().is_empty() {
    return Err(UploadError::invalid_response("empty scan id"));
  }
  if response.result.is_empty() {
    return Err(UploadError::invalid_response("no predictions returned"));
  }
  if let Some(bad) = response.result.iter().find(|p| !(0.0..=1.0).contains(&p.score)) {
    return Err(UploadError::invalid_response(format!(
      "score {} for '{}' is outside [0, 1]",
      bad.score, bad.label
    )));
  }

  Ok(ScanRecord::new(response.id, response.result, explainability_image, captured_at))
}
