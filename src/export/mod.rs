use chrono::{ Duration, NaiveDate, Utc };
use log::info;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::path::{ Path, PathBuf };

use crate::error::RelayError;

pub const SPLIT: &str = "train";

/// Client for the remote dataset hub the daily logs are shipped to.
pub struct HubClient {
    http: HttpClient,
    base_url: String,
    dataset: String,
    token: String,
}

impl HubClient {
    pub fn new(base_url: String, dataset: String, token: String) -> Self {
        Self { http: HttpClient::new(), base_url, dataset, token }
    }

    /// Upload one JSON-Lines blob as the `train` split of the dataset,
    /// marked private. Re-uploading the same day overwrites the split.
    pub async fn push(&self, body: String) -> Result<(), RelayError> {
        let url = format!("{}/api/datasets/{}/upload", self.base_url, self.dataset);
        let resp = self.http
            .put(&url)
            .query(&[("split", SPLIT), ("private", "true")])
            .bearer_auth(&self.token)
            .header("content-type", "application/jsonl")
            .body(body)
            .send().await
            .map_err(|e| RelayError::Export(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(RelayError::Export(format!("hub returned {}", resp.status())))
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// No file existed for the target date. Success, not failure.
    NoLogs,
    Uploaded {
        records: usize,
    },
}

pub fn yesterday_utc() -> NaiveDate {
    Utc::now().date_naive() - Duration::days(1)
}

pub fn day_file(log_dir: &Path, day: NaiveDate) -> PathBuf {
    log_dir.join(format!("{}.jsonl", day.format("%Y-%m-%d")))
}

/// Ship one day's log file to the hub. Every line must parse as a JSON
/// record; the file is produced by this system only, so a malformed line
/// means something else went wrong.
pub async fn export_day(
    log_dir: &Path,
    day: NaiveDate,
    hub: &HubClient
) -> Result<ExportOutcome, RelayError> {
    let path = day_file(log_dir, day);
    if !path.exists() {
        info!("No logs for {}", day);
        return Ok(ExportOutcome::NoLogs);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| {
        RelayError::Export(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let mut records = 0;
    for (idx, line) in contents.lines().enumerate() {
        serde_json::from_str::<Value>(line).map_err(|e| {
            RelayError::Export(format!("Malformed record at {}:{}: {}", path.display(), idx + 1, e))
        })?;
        records += 1;
    }

    info!("Uploading {} record(s) from {} as split '{}'", records, path.display(), SPLIT);
    hub.push(contents).await?;
    Ok(ExportOutcome::Uploaded { records })
}
