use serde::{ Serialize, Deserialize };
use serde_json::{ Map, Value };

use super::chat::RequestPayload;

/// User feedback on an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Up,
    Down,
    Unsure,
}

/// One chat turn as persisted to the daily log file. `rating` is always
/// null here; rating events get their own line instead of editing this one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub timestamp: String,
    pub endpoint_url: String,
    pub model_version: String,
    pub latency_ms: f64,
    pub token_usage: Map<String, Value>,
    pub payload: RequestPayload,
    pub answer: String,
    pub rating: Option<Rating>,
}

/// One rating event, referencing the turn it applies to by index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RatingRecord {
    pub timestamp: String,
    pub rating: Rating,
    pub turn_index: usize,
}

/// Anything the writer can append as one JSON line.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum LogRecord {
    Interaction(InteractionRecord),
    Rating(RatingRecord),
}
