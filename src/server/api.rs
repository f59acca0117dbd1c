use axum::{
    routing::{get, post},
    Router,
    extract::State,
    response::IntoResponse,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use log::{ info, error };
use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };

use crate::endpoints::EndpointRegistry;
use crate::error::RelayError;
use crate::logging::LogWriter;
use crate::models::chat::{ timeseries_from_str, ConversationTurn };
use crate::models::log::{ InteractionRecord, LogRecord, Rating, RatingRecord };
use crate::relay::Relay;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<EndpointRegistry>,
    pub relay: Arc<Relay>,
    pub writer: Arc<LogWriter>,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    /// Defaults to the registry's default endpoint when omitted.
    pub endpoint: Option<String>,
    /// Side-channel data forwarded verbatim to the backend. Accepts an
    /// object, or a raw string that is parsed leniently.
    pub timeseries: Option<Value>,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
    history: Vec<ConversationTurn>,
    model_version: String,
    usage: Map<String, Value>,
    latency_ms: f64,
    turn_index: usize,
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub rating: Rating,
    pub turn_index: usize,
}

#[derive(Serialize)]
struct RateResponse {
    ok: bool,
}

#[derive(Serialize)]
struct EndpointsResponse {
    endpoints: Vec<String>,
    default: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/endpoints", get(endpoints_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/rate", post(rate_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    addr: &str,
    registry: Arc<EndpointRegistry>,
    relay: Arc<Relay>,
    writer: Arc<LogWriter>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = addr.parse::<SocketAddr>()?;
    let app = router(AppState { registry, relay, writer });

    info!("Starting chat API server on: http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

async fn endpoints_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(EndpointsResponse {
        endpoints: state.registry.names(),
        default: state.registry.default_name().to_string(),
    })
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>
) -> impl IntoResponse {
    let endpoint = req.endpoint.unwrap_or_else(|| state.registry.default_name().to_string());
    let timeseries = timeseries_map(req.timeseries);

    let outcome = match state.relay.send(&req.message, &req.history, &endpoint, timeseries).await {
        Ok(outcome) => outcome,
        Err(e @ RelayError::UnknownEndpoint(_)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse { success: false, message: e.to_string() }),
            ).into_response();
        }
        Err(e) => {
            error!("Relay failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { success: false, message: e.to_string() }),
            ).into_response();
        }
    };

    // send, then log; the record is on disk before the answer goes out
    let record = LogRecord::Interaction(InteractionRecord {
        timestamp: outcome.timestamp.clone(),
        endpoint_url: outcome.endpoint_url.clone(),
        model_version: outcome.model_version.clone(),
        latency_ms: outcome.latency_ms,
        token_usage: outcome.usage.clone(),
        payload: outcome.payload.clone(),
        answer: outcome.answer.clone(),
        rating: None,
    });
    if let Err(e) = state.writer.append(&record).await {
        error!("Failed to write interaction log: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { success: false, message: "Failed to write interaction log".into() }),
        ).into_response();
    }

    let turn_index = outcome.history.len() - 1;
    Json(ChatResponse {
        answer: outcome.answer,
        history: outcome.history,
        model_version: outcome.model_version,
        usage: outcome.usage,
        latency_ms: outcome.latency_ms,
        turn_index,
    }).into_response()
}

async fn rate_handler(
    State(state): State<AppState>,
    Json(req): Json<RateRequest>
) -> impl IntoResponse {
    let record = LogRecord::Rating(RatingRecord {
        timestamp: Utc::now().to_rfc3339(),
        rating: req.rating,
        turn_index: req.turn_index,
    });
    if let Err(e) = state.writer.append(&record).await {
        error!("Failed to write rating log: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { success: false, message: "Failed to write rating log".into() }),
        ).into_response();
    }
    Json(RateResponse { ok: true }).into_response()
}

fn timeseries_map(value: Option<Value>) -> Map<String, Value> {
    match value {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(Value::String(raw)) => timeseries_from_str(&raw),
        Some(other) => {
            let mut map = Map::new();
            map.insert(
                "_error".into(),
                Value::String(format!("Expected a JSON object, got: {}", other)),
            );
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::EndpointSpec;
    use crate::logging::NoopLogSink;
    use axum::body::{ to_bytes, Body };
    use axum::http::Request;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn mock_backend(body: Value) -> String {
        let app = Router::new().route(
            "/infer",
            post(move |Json(_req): Json<Value>| {
                let body = body.clone();
                async move { Json(body) }
            })
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/infer", addr)
    }

    fn temp_log_dir() -> PathBuf {
        std::env::temp_dir().join(format!("chat-relay-api-test-{}", Uuid::new_v4()))
    }

    async fn test_state(env_var: &str, backend_body: Value) -> (AppState, PathBuf) {
        let url = mock_backend(backend_body).await;
        std::env::set_var(env_var, &url);
        let registry = Arc::new(
            EndpointRegistry::from_specs(
                &[EndpointSpec { name: "Primary".into(), env: env_var.into() }]
            ).unwrap()
        );
        let relay = Arc::new(
            Relay::with_timeout(registry.clone(), Duration::from_secs(5)).unwrap()
        );
        let dir = temp_log_dir();
        let writer = Arc::new(LogWriter::new(&dir, Arc::new(NoopLogSink)).unwrap());
        let day_file = writer.day_file();
        (AppState { registry, relay, writer }, day_file)
    }

    async fn post_json(app: Router, path: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(path)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap()
            ).await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, parsed)
    }

    #[tokio::test]
    async fn chat_advances_history_and_logs_the_turn() {
        let (state, day_file) = test_state(
            "CR_TEST_API_CHAT",
            json!({"answer": "hi", "model": "v1", "usage": {"tokens": 3}})
        ).await;
        let app = router(state);

        let (status, body) = post_json(app, "/api/chat", json!({"message": "hello"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "hi");
        assert_eq!(body["model_version"], "v1");
        assert_eq!(body["turn_index"], 0);
        assert_eq!(body["history"].as_array().unwrap().len(), 1);

        let logged = std::fs::read_to_string(day_file).unwrap();
        let record: Value = serde_json::from_str(logged.lines().next().unwrap()).unwrap();
        assert_eq!(record["answer"], "hi");
        assert_eq!(record["model_version"], "v1");
        assert_eq!(record["rating"], Value::Null);
        assert_eq!(record["token_usage"]["tokens"], 3);
    }

    #[tokio::test]
    async fn backend_failure_still_logs_a_degraded_turn() {
        std::env::set_var("CR_TEST_API_DOWN", "http://127.0.0.1:9/infer");
        let registry = Arc::new(
            EndpointRegistry::from_specs(
                &[EndpointSpec { name: "Primary".into(), env: "CR_TEST_API_DOWN".into() }]
            ).unwrap()
        );
        let relay = Arc::new(
            Relay::with_timeout(registry.clone(), Duration::from_millis(500)).unwrap()
        );
        let dir = temp_log_dir();
        let writer = Arc::new(LogWriter::new(&dir, Arc::new(NoopLogSink)).unwrap());
        let day_file = writer.day_file();
        let app = router(AppState { registry, relay, writer });

        let (status, body) = post_json(app, "/api/chat", json!({"message": "hello"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model_version"], "error");
        assert!(body["answer"].as_str().unwrap().contains("Error contacting backend"));
        assert_eq!(body["history"].as_array().unwrap().len(), 1);

        let logged = std::fs::read_to_string(day_file).unwrap();
        let record: Value = serde_json::from_str(logged.lines().next().unwrap()).unwrap();
        assert_eq!(record["model_version"], "error");
        assert!(record["answer"].as_str().unwrap().contains("Error contacting backend"));
        assert!(record["token_usage"].as_object().unwrap().is_empty());
        assert_eq!(record["rating"], Value::Null);
    }

    #[tokio::test]
    async fn unknown_endpoint_is_a_bad_request() {
        let (state, day_file) = test_state("CR_TEST_API_UNKNOWN", json!({})).await;
        let app = router(state);

        let (status, body) = post_json(
            app,
            "/api/chat",
            json!({"message": "hello", "endpoint": "Nope"})
        ).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(!day_file.exists());
    }

    #[tokio::test]
    async fn repeated_ratings_append_independent_lines() {
        let (state, day_file) = test_state("CR_TEST_API_RATE", json!({})).await;
        let app = router(state);

        let body = json!({"rating": "down", "turn_index": 4});
        let (status, resp) = post_json(app.clone(), "/api/rate", body.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["ok"], true);
        let (status, _) = post_json(app, "/api/rate", body).await;
        assert_eq!(status, StatusCode::OK);

        let logged = std::fs::read_to_string(day_file).unwrap();
        let lines: Vec<&str> = logged.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let record: Value = serde_json::from_str(line).unwrap();
            assert_eq!(record["rating"], "down");
            assert_eq!(record["turn_index"], 4);
        }
    }

    #[tokio::test]
    async fn endpoints_lists_names_and_default() {
        let (state, _) = test_state("CR_TEST_API_LIST", json!({})).await;
        let app = router(state);

        let response = app
            .oneshot(Request::builder().uri("/api/endpoints").body(Body::empty()).unwrap()).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["endpoints"], json!(["Primary"]));
        assert_eq!(body["default"], "Primary");
    }

    #[test]
    fn timeseries_accepts_object_string_and_garbage() {
        let map = timeseries_map(Some(json!({"a": 1})));
        assert_eq!(map.get("a"), Some(&json!(1)));

        let map = timeseries_map(Some(Value::String("{\"b\": 2}".into())));
        assert_eq!(map.get("b"), Some(&json!(2)));

        let map = timeseries_map(Some(json!([1, 2])));
        assert!(map.contains_key("_error"));

        assert!(timeseries_map(None).is_empty());
    }
}
