//! HTTP transport with Streamable HTTP support for the MCP server.

use crate::error::{DbError, DbResult};
use crate::mcp::UserDbService;
use crate::repository::UserRepository;
use crate::transport::{Transport, wait_for_signal};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Time allowed for open streams to finish after a shutdown signal.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport serving one MCP endpoint with per-session services.
pub struct HttpTransport {
    repository: Arc<UserRepository>,
    host: String,
    port: u16,
    /// MCP endpoint path
    endpoint: String,
}

impl HttpTransport {
    pub fn new(
        repository: Arc<UserRepository>,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn router(&self) -> axum::Router {
        let repository = self.repository.clone();
        let service = StreamableHttpService::new(
            move || Ok(UserDbService::new(repository.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service rejects "/", so the root endpoint uses the fallback.
        if self.endpoint == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(&self.endpoint, service)
        }
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!(addr = %bind_addr, "Starting MCP server with HTTP transport");

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Check that the port is available",
            )
        })?;
        info!(endpoint = %self.endpoint, "MCP endpoint ready");

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let notify = shutdown_notify.clone();
        let shutdown_signal = async move {
            wait_for_signal().await;
            notify.notify_one();
        };

        let server = axum::serve(listener, self.router()).with_graceful_shutdown(shutdown_signal);

        // Streaming responses can hold the server open, so shutdown is bounded.
        let outcome = tokio::select! {
            result = server => result.map_err(|e| {
                error!(error = %e, "HTTP server error");
                DbError::internal(format!("HTTP server error: {}", e))
            }),
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)"
                );
                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => Ok(()),
        };

        info!("Closing database connections");
        self.repository.close().await;
        if outcome.is_ok() {
            info!("HTTP server stopped");
        }
        outcome
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
