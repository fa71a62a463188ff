use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoRequest {
    pub message: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Unary echo responses carry a microsecond timestamp; history entries
/// use seconds. Both shapes come from the wire contract and must not drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoResponse {
    pub message: String,
    pub original_message: String,
    pub timestamp: i64,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsView {
    pub total_requests: u64,
    pub average_processing_time_ms: f64,
    pub uptime_seconds: i64,
    #[serde(default)]
    pub request_counts_by_hour: HashMap<String, u64>,
    #[serde(default)]
    pub recent_messages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub original_message: String,
    pub processed_message: String,
    pub timestamp: i64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub messages: Vec<HistoryEntry>,
    pub total_count: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServingStatus {
    Serving,
    NotServing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: ServingStatus,
    pub message: String,
    #[serde(default)]
    pub details: HashMap<String, String>,
}
