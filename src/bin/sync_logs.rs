use chat_relay::error::RelayError;
use chat_relay::export::{ self, ExportOutcome, HubClient };
use clap::Parser;
use dotenv::dotenv;
use log::info;
use std::error::Error;
use std::path::PathBuf;

/// Scheduled job: upload yesterday's interaction log to the dataset hub.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the daily JSON-Lines interaction logs.
    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    log_dir: String,

    /// Base URL of the dataset hub.
    #[arg(long, env = "HUB_URL")]
    hub_url: Option<String>,

    /// Dataset repository to push the split to.
    #[arg(long, env = "HUB_DATASET_NAME")]
    dataset: Option<String>,

    /// Access token for the dataset hub.
    #[arg(long, env = "HUB_TOKEN")]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let log_dir = PathBuf::from(&args.log_dir);
    let day = export::yesterday_utc();

    // hub credentials are only needed when there is something to upload
    if !export::day_file(&log_dir, day).exists() {
        info!("No logs for {}", day);
        return Ok(());
    }

    let (hub_url, dataset, token) = match (args.hub_url, args.dataset, args.token) {
        (Some(url), Some(dataset), Some(token)) => (url, dataset, token),
        _ => {
            return Err(
                Box::new(
                    RelayError::Export(
                        "HUB_URL, HUB_DATASET_NAME and HUB_TOKEN must be set".into()
                    )
                ) as Box<dyn Error + Send + Sync>
            );
        }
    };

    let hub = HubClient::new(hub_url, dataset, token);
    match export::export_day(&log_dir, day, &hub).await? {
        ExportOutcome::NoLogs => info!("No logs for {}", day),
        ExportOutcome::Uploaded { records } => {
            info!("Uploaded {} record(s) for {}", records, day);
        }
    }

    Ok(())
}
