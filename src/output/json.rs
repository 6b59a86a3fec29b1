//! JSON serialization for calibration reports.

use crate::result::CalibrationReport;

/// Serialize a report to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for a report).
pub fn to_json(report: &CalibrationReport) -> Result<String, serde_json::Error> {
    serde_json::to_string(report)
}

/// Serialize a report to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for a report).
pub fn to_json_pretty(report: &CalibrationReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
