pub mod api;

use std::error::Error;
use std::sync::Arc;

use crate::endpoints::EndpointRegistry;
use crate::logging::LogWriter;
use crate::relay::Relay;

pub struct Server {
    addr: String,
    registry: Arc<EndpointRegistry>,
    relay: Arc<Relay>,
    writer: Arc<LogWriter>,
}

impl Server {
    pub fn new(
        addr: String,
        registry: Arc<EndpointRegistry>,
        relay: Arc<Relay>,
        writer: Arc<LogWriter>
    ) -> Self {
        Self { addr, registry, relay, writer }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(
            &self.addr,
            self.registry.clone(),
            self.relay.clone(),
            self.writer.clone()
        ).await
    }
}
