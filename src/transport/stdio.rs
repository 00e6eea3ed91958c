//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.

use crate::error::{DbError, DbResult};
use crate::mcp::UserDbService;
use crate::repository::UserRepository;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// Reads JSON-RPC messages from stdin and writes responses to stdout.
pub struct StdioTransport {
    repository: Arc<UserRepository>,
}

impl StdioTransport {
    pub fn new(repository: Arc<UserRepository>) -> Self {
        Self { repository }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = UserDbService::new(self.repository.clone());
        let running_service = service
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                if let Err(e) = result {
                    warn!(error = %e, "Stdio transport error");
                    self.repository.close().await;
                    return Err(DbError::internal(format!("Stdio transport error: {}", e)));
                }
                info!("Stdio transport completed normally");
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing database connections");
        self.repository.close().await;

        if shutdown_requested {
            // A blocking stdin read cannot be interrupted by select!.
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolOptions;
    use crate::models::ConnectionConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stdio_transport_creation() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("stdio.db").display());
        let config = ConnectionConfig::new(url, None, PoolOptions::default()).unwrap();
        let repository = UserRepository::connect(config, Duration::from_secs(5))
            .await
            .unwrap();
        let transport = StdioTransport::new(Arc::new(repository));
        assert_eq!(transport.name(), "stdio");
    }
}
