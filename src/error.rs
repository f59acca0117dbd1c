use thiserror::Error;

/// Failure classes of the relay pipeline. Only `Config` is allowed to
/// terminate the process, and only at startup.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Log sink error: {0}")]
    Sink(String),

    #[error("Export error: {0}")]
    Export(String),
}
