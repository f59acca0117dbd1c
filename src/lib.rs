pub mod cli;
pub mod endpoints;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod redact;
pub mod relay;
pub mod server;

use cli::Args;
use endpoints::EndpointRegistry;
use log::info;
use logging::LogWriter;
use relay::Relay;
use server::Server;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Endpoints Path: {}", args.endpoints_path);
    info!("Log Directory: {}", args.log_dir);
    info!("Relay Timeout: {}s", args.relay_timeout_secs);
    info!("Remote Log Sink: {}", match (&args.log_sink_url, &args.log_sink_group) {
        (Some(url), Some(group)) => format!("{} (group: {})", url, group),
        _ => "disabled".to_string(),
    });
    info!("-------------------------");

    // the only fatal error class; everything past startup degrades instead
    let registry = Arc::new(EndpointRegistry::load(&args.endpoints_path)?);

    let sink = logging::create_log_sink(&args).await;
    let writer = Arc::new(LogWriter::new(&args.log_dir, sink)?);
    let relay = Arc::new(
        Relay::with_timeout(registry.clone(), Duration::from_secs(args.relay_timeout_secs))?
    );

    let server = Server::new(args.server_addr.clone(), registry, relay, writer);
    server.run().await?;

    Ok(())
}
