use chrono::Utc;
use log::{ debug, warn };
use reqwest::Client as HttpClient;
use serde_json::{ Map, Value };
use std::sync::Arc;
use std::time::{ Duration, Instant };
use uuid::Uuid;

use crate::endpoints::EndpointRegistry;
use crate::error::RelayError;
use crate::models::chat::{ BackendResponse, ConversationTurn, HistoryMessage, RequestPayload };
use crate::redact::scrub;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Everything the chat handler needs after one relay call: the
/// display-facing answer, the extended conversation, and the metadata
/// that goes into the interaction record.
#[derive(Debug)]
pub struct RelayOutcome {
    pub answer: String,
    pub history: Vec<ConversationTurn>,
    pub model_version: String,
    pub usage: Map<String, Value>,
    pub latency_ms: f64,
    pub timestamp: String,
    pub endpoint_url: String,
    pub payload: RequestPayload,
}

/// Forwards one user turn to a chosen backend and normalizes the result.
/// Stateless apart from the shared HTTP client; persistence belongs to
/// the caller.
pub struct Relay {
    http: HttpClient,
    registry: Arc<EndpointRegistry>,
}

impl Relay {
    pub fn new(registry: Arc<EndpointRegistry>) -> Result<Self, RelayError> {
        Self::with_timeout(registry, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        registry: Arc<EndpointRegistry>,
        timeout: Duration
    ) -> Result<Self, RelayError> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, registry })
    }

    /// Send one user turn. Backend failures never surface as an `Err`;
    /// they become the answer text of a degraded turn, so the returned
    /// history is always exactly one turn longer than the input. The only
    /// error is an unregistered endpoint name, which the UI should never
    /// produce.
    pub async fn send(
        &self,
        user_input: &str,
        history: &[ConversationTurn],
        endpoint_name: &str,
        timeseries: Map<String, Value>
    ) -> Result<RelayOutcome, RelayError> {
        let endpoint_url = self.registry
            .url(endpoint_name)
            .ok_or_else(|| RelayError::UnknownEndpoint(endpoint_name.to_string()))?
            .to_string();

        let timestamp = Utc::now().to_rfc3339();
        let user_id = Uuid::new_v4().to_string()[..8].to_string();

        let mut formatted_history = Vec::new();
        for turn in history {
            if !turn.user.is_empty() {
                formatted_history.push(HistoryMessage {
                    role: "user".into(),
                    content: scrub(&turn.user),
                });
            }
            if !turn.assistant.is_empty() {
                formatted_history.push(HistoryMessage {
                    role: "assistant".into(),
                    content: scrub(&turn.assistant),
                });
            }
        }

        let payload = RequestPayload {
            user_id,
            timestamp: timestamp.clone(),
            query: scrub(user_input),
            history: formatted_history,
            timeseries,
        };

        debug!("Relaying turn {} to {}", payload.user_id, endpoint_url);
        let start = Instant::now();
        let (answer, model_version, usage) = match self.post(&endpoint_url, &payload).await {
            Ok(resp) => (
                resp.answer.unwrap_or_default(),
                resp.model.unwrap_or_else(|| "unknown".into()),
                resp.usage.unwrap_or_default(),
            ),
            Err(e) => {
                warn!("Backend call to {} failed: {}", endpoint_url, e);
                (format!("Error contacting backend: {}", e), "error".into(), Map::new())
            }
        };
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut updated = history.to_vec();
        updated.push(ConversationTurn {
            user: user_input.to_string(),
            assistant: answer.clone(),
        });

        Ok(RelayOutcome {
            answer,
            history: updated,
            model_version,
            usage,
            latency_ms,
            timestamp,
            endpoint_url,
            payload,
        })
    }

    async fn post(
        &self,
        url: &str,
        payload: &RequestPayload
    ) -> Result<BackendResponse, RelayError> {
        let resp = self.http
            .post(url)
            .json(payload)
            .send().await
            .map_err(|e| RelayError::Backend(e.to_string()))?;
        resp
            .json::<BackendResponse>().await
            .map_err(|e| RelayError::Backend(e.to_string()))
    }
}
