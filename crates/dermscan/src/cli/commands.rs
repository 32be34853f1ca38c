use anyhow::{anyhow, Context, Result};
use colored::*;
use std::path::Path;
use std::sync::Arc;

use crate::cli::display::{display_history_entry, display_result};
use crate::config::Settings;
use crate::reconcile::ReconciliationService;
use crate::service::{HttpScanService, ScanService};
use crate::store::ScanStore;
use crate::upload::UploadPipeline;

/// Everything a command needs, wired from resolved settings
pub struct App {
  pub settings: Settings,
  pub store: ScanStore,
  pub service: Arc<dyn ScanService>,
}

impl App {
  pub fn from_settings(settings: Settings) -> Result<Self> {
    let service =
      HttpScanService::from_settings(&settings).context("failed to set up scan service client")?;
    Ok(Self::with_service(settings, Arc::new(service)))
  }

  pub fn with_service(settings: Settings, service: Arc<dyn ScanService>) -> Self {
    let store = ScanStore::open(settings.store_path());
    Self { settings, store, service }
  }

  pub fn upload_pipeline(&self) -> UploadPipeline {
    UploadPipeline::new(self.service.clone(), self.store.clone(), self.settings.staging_dir())
  }

  pub fn reconciliation(&self) -> ReconciliationService {
    ReconciliationService::new(self.service.clone(), self.store.clone())
  }
}

/// Submit an image and show the stored result
pub async fn scan(app: &App, image: &Path) -> Result<()> {
  println!("{} Uploading {}...", "⇡".cyan(), image.display());

  let record = app.upload_pipeline().submit(image).await.context("Upload failed")?;

  println!("{} Saved scan {}", "✓".green(), record.scan_id.yellow());
  println!();
  display_result(&record);
  Ok(())
}

/// List the scan history in insertion order
pub async fn history(app: &App, details: bool) -> Result<()> {
  let history = app.store.load_or_empty().await.context("Failed to load scan history")?;
  if history.recovered_from_corrupt {
    println!("{} Scan history could not be read; showing an empty history.", "⚠".yellow());
  }
  let records = history.records;

  println!("{}", "Scan History".blue().bold());
  println!();

  if records.is_empty() {
    println!("No scans available.");
    return Ok(());
  }

  for record in &records {
    display_history_entry(record, details);
  }
  Ok(())
}

/// Show one stored scan
pub async fn show(app: &App, scan_id: &str) -> Result<()> {
  let record = app
    .store
    .get(scan_id)
    .await
    .context("Failed to load scan history")?
    .ok_or_else(|| anyhow!("Scan {} not found", scan_id))?;

  display_result(&record);
  Ok(())
}

/// Record a confirmed diagnosis for a scan
pub async fn annotate(app: &App, scan_id: &str, actual_result: &str) -> Result<()> {
  match app.reconciliation().annotate(scan_id, actual_result).await {
    Ok(record) => {
      println!("{} Updated scan {}", "✓".green(), record.scan_id.yellow());
      println!();
      display_result(&record);
      Ok(())
    }
    Err(e) if e.is_partial() => {
      println!(
        "{} The server recorded the result but the local history is out of date.",
        "⚠".yellow()
      );
      Err(e).context("Error updating scan result")
    }
    Err(e) => Err(e).context("Error updating scan result"),
  }
}
