use async_trait::async_trait;
use chrono::Utc;
use log::{ error, info };
use reqwest::{ Client as HttpClient, StatusCode };
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::cli::Args;
use crate::error::RelayError;
use crate::models::log::LogRecord;

/// Optional remote mirror for log records. Modeled as a capability so
/// the writer never branches on whether mirroring is configured.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// One-time setup at process start. "Already exists" responses from
    /// the remote side are success.
    async fn setup(&self) -> Result<(), RelayError>;

    /// Mirror one record, timestamped in epoch milliseconds.
    async fn emit(&self, message: &str, timestamp_ms: i64) -> Result<(), RelayError>;
}

pub struct NoopLogSink;

#[async_trait]
impl LogSink for NoopLogSink {
    async fn setup(&self) -> Result<(), RelayError> {
        Ok(())
    }

    async fn emit(&self, _message: &str, _timestamp_ms: i64) -> Result<(), RelayError> {
        Ok(())
    }
}

#[derive(Serialize)]
struct SinkEvent<'a> {
    timestamp: i64,
    message: &'a str,
}

/// HTTP-backed log sink. The group is a long-lived container configured
/// by name; the stream is named after the UTC date the process started.
pub struct HttpLogSink {
    http: HttpClient,
    base_url: String,
    group: String,
    stream: String,
}

impl HttpLogSink {
    pub fn new(base_url: String, group: String) -> Self {
        Self {
            http: HttpClient::new(),
            base_url,
            group,
            stream: Utc::now().format("%Y-%m-%d").to_string(),
        }
    }

    async fn create(&self, url: &str) -> Result<(), RelayError> {
        let resp = self.http
            .put(url)
            .send().await
            .map_err(|e| RelayError::Sink(e.to_string()))?;
        // CONFLICT means the group/stream already exists, which is fine
        if resp.status().is_success() || resp.status() == StatusCode::CONFLICT {
            Ok(())
        } else {
            Err(RelayError::Sink(format!("{} returned {}", url, resp.status())))
        }
    }
}

#[async_trait]
impl LogSink for HttpLogSink {
    async fn setup(&self) -> Result<(), RelayError> {
        self.create(&format!("{}/groups/{}", self.base_url, self.group)).await?;
        self.create(
            &format!("{}/groups/{}/streams/{}", self.base_url, self.group, self.stream)
        ).await?;
        info!("Remote log sink ready: group={} stream={}", self.group, self.stream);
        Ok(())
    }

    async fn emit(&self, message: &str, timestamp_ms: i64) -> Result<(), RelayError> {
        let url = format!(
            "{}/groups/{}/streams/{}/events",
            self.base_url,
            self.group,
            self.stream
        );
        let events = [SinkEvent { timestamp: timestamp_ms, message }];
        let resp = self.http
            .post(&url)
            .json(&events)
            .send().await
            .map_err(|e| RelayError::Sink(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(RelayError::Sink(format!("sink returned {}", resp.status())))
        }
    }
}

/// Build the sink the writer will mirror to, based on configuration.
/// Setup failures are reported but never fatal; local files stay
/// authoritative.
pub async fn create_log_sink(args: &Args) -> Arc<dyn LogSink> {
    match (&args.log_sink_url, &args.log_sink_group) {
        (Some(url), Some(group)) => {
            let sink = HttpLogSink::new(url.clone(), group.clone());
            if let Err(e) = sink.setup().await {
                error!("Remote log sink setup failed: {}", e);
            }
            Arc::new(sink)
        }
        _ => Arc::new(NoopLogSink),
    }
}

/// Appends one JSON line per record to a daily file, mirroring each
/// record to the sink. Appends are serialized; each call is a complete
/// flushed write.
pub struct LogWriter {
    log_dir: PathBuf,
    sink: Arc<dyn LogSink>,
    write_lock: Mutex<()>,
}

impl LogWriter {
    pub fn new(
        log_dir: impl Into<PathBuf>,
        sink: Arc<dyn LogSink>
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let log_dir = log_dir.into();
        std::fs::create_dir_all(&log_dir)?;
        Ok(Self { log_dir, sink, write_lock: Mutex::new(()) })
    }

    /// Path of the daily file records are currently landing in.
    pub fn day_file(&self) -> PathBuf {
        let day = Utc::now().format("%Y-%m-%d");
        self.log_dir.join(format!("{}.jsonl", day))
    }

    pub async fn append(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let line = serde_json::to_string(record)?;

        {
            let _guard = self.write_lock.lock().await;
            let mut file = tokio::fs::OpenOptions
                ::new()
                .create(true)
                .append(true)
                .open(self.day_file()).await?;
            file.write_all(line.as_bytes()).await?;
            file.write_all(b"\n").await?;
            file.flush().await?;
        }

        // local write is authoritative; a sink failure is reported, not raised
        if let Err(e) = self.sink.emit(&line, Utc::now().timestamp_millis()).await {
            error!("Remote log sink write failed: {}", e);
        }

        Ok(())
    }
}
