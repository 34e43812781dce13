//! HTTP surface for the transcript engine
//!
//! Answers the extension's transcript message over HTTP.

use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::service::TranscriptService;

pub mod handlers;
pub mod models;
pub mod server;

/// API server wrapping a transcript service
pub struct ApiServer {
    service: Arc<TranscriptService>,
    config: Arc<Config>,
    port: u16,
}

impl ApiServer {
    pub fn new(service: Arc<TranscriptService>, config: Arc<Config>, port: u16) -> Self {
        Self { service, config, port }
    }

    /// Start the API server in the background
    pub fn start_background(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.start().await })
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting API server on port {}", self.port);
        server::start_http_server(self.service, self.config, self.port).await
    }
}
