use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the endpoints configuration file ({"endpoints": [{"name", "env"}, ...]}).
    #[arg(long, env = "ENDPOINTS_PATH", default_value = "endpoints.json")]
    pub endpoints_path: String,

    /// Directory for the daily JSON-Lines interaction logs.
    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    pub log_dir: String,

    /// Host address and port for the chat API server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Timeout in seconds for a single backend relay call. No retries are performed.
    #[arg(long, env = "RELAY_TIMEOUT_SECS", default_value = "60")]
    pub relay_timeout_secs: u64,

    /// Base URL of the remote log sink. Mirroring is enabled only when both
    /// this and the sink group are set.
    #[arg(long, env = "LOG_SINK_URL")]
    pub log_sink_url: Option<String>,

    /// Group name at the remote log sink to mirror records into.
    #[arg(long, env = "LOG_SINK_GROUP")]
    pub log_sink_group: Option<String>,
}
