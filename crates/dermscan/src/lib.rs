//! Dermscan - skin lesion scan client
//!
//! Submits lesion photos to a remote inference service and keeps a durable,
//! locally persisted history of scan results that can later be annotated with
//! a confirmed diagnosis and reconciled back to the server.

pub mod cli;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod record;
pub mod service;
pub mod staging;
pub mod store;
pub mod upload;

pub use config::Settings;
pub use error::{ConfigError, ReconciliationError, ServiceError, StoreError, UploadError};
pub use reconcile::ReconciliationService;
pub use record::{Annotation, Prediction, ScanRecord};
pub use service::{HttpScanService, QuickScanResponse, ScanService};
pub use store::ScanStore;
pub use upload::UploadPipeline;
