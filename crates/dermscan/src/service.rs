//! Client for the remote inference and annotation endpoints
//!
//! `ScanService` is the seam the upload pipeline and reconciliation service
//! talk through, so they can run against the real HTTP service or a test double.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::config::Settings;
use crate::error::ServiceError;
use crate::record::Prediction;

/// A staged image ready to be sent as a single multipart file field
#[derive(Debug, Clone)]
pub struct ImageUpload {
  pub file_name: String,
  pub mime_type: String,
  pub bytes: Vec<u8>,
}

/// Body of a successful `/quick-scan/` response
#[derive(Debug, Clone, Deserialize)]
pub struct QuickScanResponse {
  /// Service-assigned id; numeric ids are kept in their string form
  #[serde(deserialize_with = "id_as_string")]
  pub id: String,
  pub result: Vec<Prediction>,
  pub explainability_image_path: String,
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  match serde_json::Value::deserialize(deserializer)? {
    serde_json::Value::String(id) => Ok(id),
    serde_json::Value::Number(id) => Ok(id.to_string()),
    other => Err(serde::de::Error::custom(format!("expected string or number id, got {other}"))),
  }
}

#[async_trait]
pub trait ScanService: Send + Sync {
  /// Submit one image for inference
  async fn quick_scan(&self, upload: ImageUpload) -> Result<QuickScanResponse, ServiceError>;

  /// Set the confirmed result for a scan on the server
  async fn update_result(
    &self,
    scan_id: &str,
    actual_result: &str,
  ) -> Result<serde_json::Value, ServiceError>;

  /// Resolve an artifact path from a scan response against the service location
  fn artifact_url(&self, path: &str) -> String;
}

/// HTTP implementation of `ScanService`
pub struct HttpScanService {
  client: Client,
  base_url: Url,
  base: String,
  timeout_secs: u64,
}

impl HttpScanService {
  pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ServiceError> {
    let base = base_url.trim_end_matches('/').to_string();
    let parsed = Url::parse(&base)
      .map_err(|e| ServiceError::transport(format!("invalid server url '{base_url}': {e}")))?;

    let client = Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .build()
      .map_err(|e| ServiceError::transport(format!("failed to create HTTP client: {e}")))?;

    Ok(Self { client, base_url: parsed, base, timeout_secs })
  }

  pub fn from_settings(settings: &Settings) -> Result<Self, ServiceError> {
    Self::new(&settings.server_url, settings.timeout_secs)
  }

  /// Build `{base}/{segments..}/`, percent-encoding each segment
  fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| ServiceError::transport(format!("server url {} cannot be a base", self.base)))?
      .pop_if_empty()
      .extend(segments)
      .push("");
    Ok(url)
  }

  async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ServiceError> {
    let response = timeout(Duration::from_secs(self.timeout_secs), request.send())
      .await
      .map_err(|_| {
        ServiceError::transport(format!("request timed out after {}s", self.timeout_secs))
      })?
      .map_err(|e| ServiceError::transport(e.to_string()))?;

    if response.status().is_success() {
      return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::rejected(status, extract_detail(&body)))
  }
}

/// Pull the `detail` field out of an error body, if the body is JSON and has one
fn extract_detail(body: &str) -> Option<String> {
  let value: serde_json::Value = serde_json::from_str(body).ok()?;
  match value.get("detail")? {
    serde_json::Value::String(detail) => Some(detail.clone()),
    serde_json::Value::Null => None,
    other => Some(other.to_string()),
  }
}

#[async_trait]
impl ScanService for HttpScanService {
  async fn quick_scan(&self, upload: ImageUpload) -> Result<QuickScanResponse, ServiceError> {
    let url = self.endpoint(&["quick-scan"])?;
    tracing::debug!(%url, file = %upload.file_name, bytes = upload.bytes.len(), "submitting image");

    let part = Part::bytes(upload.bytes)
      .file_name(upload.file_name)
      .mime_str(&upload.mime_type)
      .map_err(|e| ServiceError::transport(format!("invalid mime type: {e}")))?;
    let form = Form::new().part("file", part);

    let response = self.send(self.client.post(url).multipart(form)).await?;
    response.json::<QuickScanResponse>().await.map_err(|e| ServiceError::decode(e.to_string()))
  }

  async fn update_result(
    &self,
    scan_id: &str,
    actual_result: &str,
  ) -> Result<serde_json::Value, ServiceError> {
    let url = self.endpoint(&["update-result", scan_id])?;
    tracing::debug!(%url, scan_id, "updating actual result");

    let form = Form::new().text("actual_result", actual_result.to_string());
    let response = self.send(self.client.put(url).multipart(form)).await?;

    let body = response.text().await.map_err(|e| ServiceError::decode(e.to_string()))?;
    Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)))
  }

  fn artifact_url(&self, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
      return path.to_string();
    }
    format!("{}/{}", self.base, path.trim_start_matches('/'))
  }
}
