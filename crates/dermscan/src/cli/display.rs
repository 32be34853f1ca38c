//! Display formatting utilities for CLI output

use chrono::Local;
use colored::*;

use crate::record::{Prediction, ScanRecord};

const CHART_WIDTH: usize = 30;
const CHART_LABEL_CHARS: usize = 10;

/// Guidance shown next to the top prediction
pub fn urgency_for(label: Option<&str>) -> &'static str {
  match label {
    Some("Melanocytic nevus") => "Low urgency, no immediate action required.",
    Some("Benign keratosis") => "Low urgency, benign skin condition.",
    _ => "Urgency may vary. Consult a doctor.",
  }
}

/// Shorten chart labels to 10 characters plus an ellipsis
pub fn truncate_label(label: &str) -> String {
  if label.chars().count() > CHART_LABEL_CHARS {
    format!("{}...", label.chars().take(CHART_LABEL_CHARS).collect::<String>())
  } else {
    label.to_string()
  }
}

/// One text bar per prediction, scores shown as percentages
pub fn render_score_chart(predictions: &[Prediction]) -> Vec<String> {
  predictions
    .iter()
    .map(|p| {
      let percent = p.score * 100.0;
      let filled = (p.score.clamp(0.0, 1.0) * CHART_WIDTH as f64).round() as usize;
      format!("{:<13} {:>5.1}% {}", truncate_label(&p.label), percent, "█".repeat(filled))
    })
    .collect()
}

/// Capture date in the local timezone
pub fn format_date(record: &ScanRecord) -> String {
  record.captured_at.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

pub fn top_label(record: &ScanRecord) -> &str {
  record.top_prediction().map(|p| p.label.as_str()).unwrap_or("N/A")
}

pub fn doctors_result(record: &ScanRecord) -> &str {
  record.actual_result.as_deref().unwrap_or("Not updated")
}

/// Full result view, shown right after a scan or via `show`
pub fn display_result(record: &ScanRecord) {
  let label = top_label(record);
  println!("{} {}", "Result:".bold(), label.yellow().bold());
  println!("Definition: {}", urgency_for(record.top_prediction().map(|p| p.label.as_str())));
  println!("Scan ID: {}", record.scan_id.cyan());
  println!("Explainability: {}", record.explainability_image);
  println!();

  for line in render_score_chart(&record.predictions) {
    println!("  {line}");
  }
  println!();
  println!("Doctor's Result: {}", doctors_result(record));
}

/// One entry of the history list
pub fn display_history_entry(record: &ScanRecord, details: bool) {
  println!("Scan ID: {}", record.scan_id.cyan());
  println!("Result: {}", top_label(record));
  println!("Date: {}", format_date(record));

  let doctors = doctors_result(record);
  if record.is_annotated() {
    println!("Doctor's Result: {}", doctors.green());
  } else {
    println!("Doctor's Result: {}", doctors.dimmed());
  }

  if details {
    for line in render_score_chart(&record.predictions) {
      println!("  {line}");
    }
  }
  println!();
}
