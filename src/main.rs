//! User DB MCP Server - Main entry point.
//!
//! Connects to one SQL database and serves the user-record tools over stdio
//! or Streamable HTTP.

use user_db_mcp_server::config::{Config, TransportMode};
use user_db_mcp_server::repository::UserRepository;
use user_db_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber. Logs always go to stderr so the stdio
/// transport keeps stdout for protocol messages.
fn init_tracing(config: &Config) {
    if !config.enable_logs {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();
    init_tracing(&config);

    info!(
        transport = %config.transport,
        "Starting User DB MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db_config = config.parse_database()?;
    let conn_config = db_config.to_connection_config()?;

    let repository =
        UserRepository::connect(conn_config, config.query_timeout_duration()).await?;
    if config.init_schema {
        repository.init_schema().await?;
    }
    let repository = Arc::new(repository);

    let result = match config.transport {
        TransportMode::Stdio => StdioTransport::new(repository).run().await,
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(
                repository,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
