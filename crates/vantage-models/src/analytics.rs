//! Analytics summary model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Aggregate answer for an analytics query.
///
/// All three fields are always present, even over an empty detection set
/// (`total_people = 0`, `avg_dwell_time = 0`, `peak_minute = null`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalyticsSummary {
    /// Count of distinct track ids in the queried set
    pub total_people: u64,
    /// Mean of per-track dwell times in seconds, rounded to 2 decimals
    pub avg_dwell_time: f64,
    /// Minute bucket with the most detections; lowest bucket wins ties
    pub peak_minute: Option<i64>,
}

impl AnalyticsSummary {
    /// Summary over an empty detection set.
    pub fn empty() -> Self {
        Self {
            total_people: 0,
            avg_dwell_time: 0.0,
            peak_minute: None,
        }
    }
}
