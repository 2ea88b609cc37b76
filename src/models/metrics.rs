//! Frontend metrics payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot returned by `GET /api/metrics`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub page_views: u64,
    pub api_calls: u64,
    pub errors: u64,
    pub last_updated: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

/// Body of `POST /api/metrics`.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricUpdate {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_increment")]
    pub value: u64,
}

fn default_increment() -> u64 {
    1
}
