use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ranked class from the inference service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
  pub label: String,
  /// Confidence in [0, 1]
  pub score: f64,
}

impl Prediction {
  pub fn new(label: impl Into<String>, score: f64) -> Self {
    Self { label: label.into(), score }
  }
}

/// Ground-truth outcome attached to a scan after the fact
///
/// Persisted as `null` or a string so the history document keeps its
/// `actualResult` shape.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Annotation {
  #[default]
  Unannotated,
  Annotated(String),
}

impl Annotation {
  pub fn as_deref(&self) -> Option<&str> {
    match self {
      Annotation::Unannotated => None,
      Annotation::Annotated(result) => Some(result.as_str()),
    }
  }

  pub fn is_annotated(&self) -> bool {
    matches!(self, Annotation::Annotated(_))
  }
}

impl From<Option<String>> for Annotation {
  fn from(value: Option<String>) -> Self {
    value.map_or(Annotation::Unannotated, Annotation::Annotated)
  }
}

impl From<Annotation> for Option<String> {
  fn from(value: Annotation) -> Self {
    match value {
      Annotation::Unannotated => None,
      Annotation::Annotated(result) => Some(result),
    }
  }
}

/// A completed inference result plus its optional confirmed diagnosis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
  /// Assigned by the inference service, never reassigned
  pub scan_id: String,

  /// Server-ranked predictions, most confident first by convention
  #[serde(rename = "result")]
  pub predictions: Vec<Prediction>,

  /// Absolute URL of the explainability overlay; not checked for reachability
  pub explainability_image: String,

  /// Local wall-clock time of the successful upload
  #[serde(rename = "date")]
  pub captured_at: DateTime<Utc>,

  #[serde(default)]
  pub actual_result: Annotation,
}

impl ScanRecord {
  pub fn new(
    scan_id: String,
    predictions: Vec<Prediction>,
    explainability_image: String,
    captured_at: DateTime<Utc>,
  ) -> Self {
    Self {
      scan_id,
      predictions,
      explainability_image,
      captured_at,
      actual_result: Annotation::Unannotated,
    }
  }

  /// The server's first-ranked prediction, if any
  pub fn top_prediction(&self) -> Option<&Prediction> {
    self.predictions.first()
  }

  pub fn is_annotated(&self) -> bool {
    self.actual_result.is_annotated()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn sample_record() -> ScanRecord {
    ScanRecord::new(
      "42".to_string(),
      vec![Prediction::new("Melanocytic nevus", 0.91), Prediction::new("Melanoma", 0.06)],
      "http://127.0.0.1:8000/static/42.png".to_string(),
      DateTime::parse_from_rfc3339("2024-03-01T10:15:00Z").unwrap().with_timezone(&Utc),
    )
  }

  #[test]
  fn test_record_serializes_to_history_document_shape() {
    let value = serde_json::to_value(sample_record()).unwrap();

    assert_eq!(value["scanId"], "42");
    assert_eq!(value["result"][0]["label"], "Melanocytic nevus");
    assert_eq!(value["explainabilityImage"], "http://127.0.0.1:8000/static/42.png");
    assert_eq!(value["date"], "2024-03-01T10:15:00Z");
    assert!(value["actualResult"].is_null());
  }

  #[test]
  fn test_annotated_record_persists_plain_string() {
    let mut record = sample_record();
    record.actual_result = Annotation::Annotated("benign".to_string());

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["actualResult"], "benign");
  }

  #[test]
  fn test_missing_actual_result_reads_as_unannotated() {
    let value = json!({
      "scanId": "7",
      "result": [{"label": "Benign keratosis", "score": 0.5}],
      "explainabilityImage": "http://host/x.png",
      "date": "2024-03-01T10:15:00Z"
    });

    let record: ScanRecord = serde_json::from_value(value).unwrap();
    assert_eq!(record.actual_result, Annotation::Unannotated);
    assert_eq!(record.top_prediction().unwrap().label, "Benign keratosis");
  }

  #[test]
  fn test_annotation_option_conversions() {
    assert_eq!(Annotation::from(None), Annotation::Unannotated);
    assert_eq!(
      Annotation::from(Some("malignant".to_string())).as_deref(),
      Some("malignant")
    );
    assert!(!Annotation::Unannotated.is_annotated());
  }
}
