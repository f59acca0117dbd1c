use serde::{ Serialize, Deserialize };
use serde_json::{ Map, Value };

/// One completed exchange in a conversation. The caller owns the
/// conversation; the relay only reads it and returns an extended copy.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub user: String,
    pub assistant: String,
}

/// Flattened, scrubbed form of a conversation turn as it travels to the
/// backend inside the request payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

/// Outbound body for a backend inference call. `query` and `history` are
/// already scrubbed when this is constructed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestPayload {
    pub user_id: String,
    pub timestamp: String,
    pub query: String,
    pub history: Vec<HistoryMessage>,
    pub timeseries: Map<String, Value>,
}

/// Backend response fields. Everything is optional; the relay supplies
/// defaults for anything missing.
#[derive(Debug, Deserialize)]
pub struct BackendResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<Map<String, Value>>,
}

/// Parse a side-channel JSON blob (e.g. an uploaded time-series file)
/// into the payload mapping. A parse failure does not fail the turn; it
/// is recorded inside the mapping instead.
pub fn timeseries_from_str(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Map<String, Value>>(raw) {
        Ok(map) => map,
        Err(e) => {
            let mut map = Map::new();
            map.insert("_error".into(), Value::String(format!("Failed to parse JSON: {}", e)));
            map
        }
    }
}
