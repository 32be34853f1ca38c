//! Staging of picked images
//!
//! A picked image reference is not guaranteed to stay valid while a request is
//! in flight, so it is copied into the staging directory first and the upload
//! reads from that copy.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::UploadError;
use crate::service::ImageUpload;

/// A private copy of an image, valid until `discard`
#[derive(Debug)]
pub struct StagedImage {
  pub path: PathBuf,
  /// Original file name, sent as the multipart filename
  pub file_name: String,
  pub mime_type: String,
}

/// Copy `source` into `staging_dir` under a unique name
pub async fn stage(source: &Path, staging_dir: &Path) -> Result<StagedImage, UploadError> {
  let file_name = source
    .file_name()
    .and_then(|name| name.to_str())
    .ok_or_else(|| UploadError::unsupported_image(source))?
    .to_string();
  let mime_type = mime_type_for(source).ok_or_else(|| UploadError::unsupported_image(source))?;

  tokio::fs::create_dir_all(staging_dir)
    .await
    .map_err(|e| UploadError::staging(source, format!("cannot create staging directory: {e}")))?;

  let path = staging_dir.join(format!("{}-{}", Uuid::new_v4(), file_name));
  tokio::fs::copy(source, &path).await.map_err(|e| UploadError::staging(source, e.to_string()))?;

  tracing::debug!(source = %source.display(), staged = %path.display(), "staged image");
  Ok(StagedImage { path, file_name, mime_type })
}

/// `image/<ext>` from the file extension
///
/// `None` without an extension, or when the extension is not plain ASCII
/// alphanumerics and so cannot form a valid MIME subtype.
pub fn mime_type_for(path: &Path) -> Option<String> {
  let ext = path.extension()?.to_str()?.to_ascii_lowercase();
  if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
    return None;
  }
  match ext.as_str() {
    "" => None,
    "jpg" => Some("image/jpeg".to_string()),
    "tif" => Some("image/tiff".to_string()),
    other => Some(format!("image/{other}")),
  }
}

impl StagedImage {
  pub async fn read_upload(&self) -> Result<ImageUpload, UploadError> {
    let bytes = tokio::fs::read(&self.path)
      .await
      .map_err(|e| UploadError::staging(&self.path, e.to_string()))?;

    Ok(ImageUpload { file_name: self.file_name.clone(), mime_type: self.mime_type.clone(), bytes })
  }

  /// Remove the staged copy; failures are only logged
  pub async fn discard(self) {
    if let Err(e) = tokio::fs::remove_file(&self.path).await {
      tracing::warn!(path = %self.path.display(), error = %e, "failed to remove staged image");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  #[test]
  fn test_mime_type_for_extensions() {
    assert_eq!(mime_type_for(Path::new("a/photo.JPG")).as_deref(), Some("image/jpeg"));
    assert_eq!(mime_type_for(Path::new("photo.png")).as_deref(), Some("image/png"));
    assert_eq!(mime_type_for(Path::new("photo.heic")).as_deref(), Some("image/heic"));
    assert_eq!(mime_type_for(Path::new("photo")), None);
    assert_eq!(mime_type_for(Path::new("photo.")), None);
  }

  #[test]
  fn test_mime_type_for_rejects_malformed_extensions() {
    assert_eq!(mime_type_for(Path::new("photo.jp g")), None);
    assert_eq!(mime_type_for(Path::new("photo.png(1)")), None);
    assert_eq!(mime_type_for(Path::new("photo.jpg;x")), None);
  }

  #[tokio::test]
  async fn test_stage_copies_into_staging_dir() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("lesion.png");
    fs::write(&source, b"pixels").unwrap();
    let staging_dir = temp_dir.path().join("cache");

    let staged = stage(&source, &staging_dir).await.unwrap();

    assert!(staged.path.starts_with(&staging_dir));
    assert!(staged.path.to_string_lossy().ends_with("-lesion.png"));
    assert_eq!(staged.file_name, "lesion.png");
    assert_eq!(staged.mime_type, "image/png");

    // The staged copy survives the original going away
    fs::remove_file(&source).unwrap();
    let upload = staged.read_upload().await.unwrap();
    assert_eq!(upload.bytes, b"pixels");
  }

  #[tokio::test]
  async fn test_stage_uses_unique_names() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("lesion.png");
    fs::write(&source, b"pixels").unwrap();
    let staging_dir = temp_dir.path().join("cache");

    let first = stage(&source, &staging_dir).await.unwrap();
    let second = stage(&source, &staging_dir).await.unwrap();
    assert_ne!(first.path, second.path);
  }

  #[tokio::test]
  async fn test_stage_missing_source_fails() {
    let temp_dir = TempDir::new().unwrap();
    let result = stage(&temp_dir.path().join("missing.jpg"), temp_dir.path()).await;
    assert!(matches!(result, Err(UploadError::Staging { .. })));
  }

  #[tokio::test]
  async fn test_stage_without_extension_fails() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("lesion");
    fs::write(&source, b"pixels").unwrap();

    let result = stage(&source, temp_dir.path()).await;
    assert!(matches!(result, Err(UploadError::UnsupportedImage { .. })));
  }

  #[tokio::test]
  async fn test_stage_with_malformed_extension_fails_before_copy() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("lesion.png (copy)");
    fs::write(&source, b"pixels").unwrap();
    let staging_dir = temp_dir.path().join("cache");

    let result = stage(&source, &staging_dir).await;

    assert!(matches!(result, Err(UploadError::UnsupportedImage { .. })));
    assert!(!staging_dir.exists());
  }

  #[tokio::test]
  async fn test_discard_removes_staged_copy() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("lesion.jpg");
    fs::write(&source, b"pixels").unwrap();

    let staged = stage(&source, &temp_dir.path().join("cache")).await.unwrap();
    let path = staged.path.clone();
    staged.discard().await;

    assert!(!path.exists());
    assert!(source.exists());
  }
}
