//! Two-phase annotation of stored scans
//!
//! The server is the system of record: the annotation is sent there first and
//! only a confirmed annotation reaches the local history.

use std::sync::Arc;

use crate::error::ReconciliationError;
use crate::record::{Annotation, ScanRecord};
use crate::service::ScanService;
use crate::store::ScanStore;

pub struct ReconciliationService {
  service: Arc<dyn ScanService>,
  store: ScanStore,
}

impl ReconciliationService {
  pub fn new(service: Arc<dyn ScanService>, store: ScanStore) -> Self {
    Self { service, store }
  }

  /// Attach a confirmed diagnosis to `scan_id`, remotely and then locally
  ///
  /// A result that is empty after trimming is rejected; otherwise the value is
  /// sent and stored exactly as given.
  pub async fn annotate(
    &self,
    scan_id: &str,
    actual_result: &str,
  ) -> Result<ScanRecord, ReconciliationError> {
    if actual_result.trim().is_empty() {
      return Err(ReconciliationError::invalid_input("result must not be empty"));
    }
    if scan_id.trim().is_empty() {
      return Err(ReconciliationError::invalid_input("scan id is missing"));
    }
    if self.store.get(scan_id).await?.is_none() {
      return Err(ReconciliationError::unknown_scan(scan_id));
    }

    let acknowledgement = self.service.update_result(scan_id, actual_result).await.map_err(|e| {
      tracing::warn!(scan_id, error = %e, "server rejected annotation");
      ReconciliationError::remote(scan_id, e.detail_or_message())
    })?;
    tracing::debug!(scan_id, response = %acknowledgement, "server accepted annotation");

    let annotation = Annotation::Annotated(actual_result.to_string());
    let updated = self
      .store
      .patch(scan_id, move |current| *current = annotation)
      .await
      .map_err(|cause| {
        tracing::error!(scan_id, error = %cause, "annotation confirmed remotely but not stored locally");
        ReconciliationError::partial(scan_id, cause)
      })?;

    tracing::info!(scan_id, actual_result, "scan annotated");
    Ok(updated)
  }
}
