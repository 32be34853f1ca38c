#![allow(dead_code)]

use async_trait::async_trait;
use dermscan::record::Prediction;
use dermscan::service::{ImageUpload, QuickScanResponse, ScanService};
use dermscan::ServiceError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Mock scan service for testing pipeline and reconciliation behavior
pub struct MockScanService {
  pub fixed_id: Option<String>,
  pub predictions: Vec<Prediction>,
  pub fail_scans: bool,
  pub update_rejection: Option<(u16, Option<String>)>,
  pub unreachable: bool,
  pub uploads: Mutex<Vec<ImageUpload>>,
  pub updates: Mutex<Vec<(String, String)>>,
  pub scan_calls: AtomicU32,
  pub update_calls: AtomicU32,
  after_update: Option<Box<dyn Fn() + Send + Sync>>,
  next_id: AtomicU32,
}

impl Default for MockScanService {
  fn default() -> Self {
    Self::new()
  }
}

impl MockScanService {
  pub fn new() -> Self {
    Self {
      fixed_id: None,
      predictions: vec![
        Prediction::new("Melanocytic nevus", 0.91),
        Prediction::new("Benign keratosis", 0.06),
      ],
      fail_scans: false,
      update_rejection: None,
      unreachable: false,
      uploads: Mutex::new(Vec::new()),
      updates: Mutex::new(Vec::new()),
      scan_calls: AtomicU32::new(0),
      update_calls: AtomicU32::new(0),
      after_update: None,
      next_id: AtomicU32::new(1),
    }
  }

  pub fn with_id(mut self, id: &str) -> Self {
    self.fixed_id = Some(id.to_string());
    self
  }

  pub fn with_predictions(mut self, predictions: Vec<Prediction>) -> Self {
    self.predictions = predictions;
    self
  }

  pub fn failing_scans(mut self) -> Self {
    self.fail_scans = true;
    self
  }

  pub fn rejecting_updates(mut self, status: u16, detail: Option<&str>) -> Self {
    self.update_rejection = Some((status, detail.map(|d| d.to_string())));
    self
  }

  pub fn unreachable(mut self) -> Self {
    self.unreachable = true;
    self
  }

  /// Run `hook` after an update is accepted, before the caller sees the response
  pub fn with_after_update(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
    self.after_update = Some(Box::new(hook));
    self
  }

  pub fn scan_call_count(&self) -> u32 {
    self.scan_calls.load(Ordering::SeqCst)
  }

  pub fn update_call_count(&self) -> u32 {
    self.update_calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ScanService for MockScanService {
  async fn quick_scan(&self, upload: ImageUpload) -> Result<QuickScanResponse, ServiceError> {
    self.scan_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_scans || self.unreachable {
      return Err(ServiceError::transport("connection refused"));
    }

    self.uploads.lock().unwrap().push(upload);
    let id = match &self.fixed_id {
      Some(id) => id.clone(),
      None => self.next_id.fetch_add(1, Ordering::SeqCst).to_string(),
    };

    Ok(QuickScanResponse {
      id,
      result: self.predictions.clone(),
      explainability_image_path: "static/explain.png".to_string(),
    })
  }

  async fn update_result(
    &self,
    scan_id: &str,
    actual_result: &str,
  ) -> Result<serde_json::Value, ServiceError> {
    self.update_calls.fetch_add(1, Ordering::SeqCst);
    if self.unreachable {
      return Err(ServiceError::transport("connection refused"));
    }
    if let Some((status, detail)) = &self.update_rejection {
      return Err(ServiceError::rejected(*status, detail.clone()));
    }

    self.updates.lock().unwrap().push((scan_id.to_string(), actual_result.to_string()));
    if let Some(hook) = &self.after_update {
      hook();
    }
    Ok(serde_json::json!({ "id": scan_id, "actual_result": actual_result }))
  }

  fn artifact_url(&self, path: &str) -> String {
    format!("http://mock.local/{path}")
  }
}
