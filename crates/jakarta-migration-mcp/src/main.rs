use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use jakarta_http_mcp_server::{HttpMcpServer, HttpServerConfig};
use jakarta_mcp_server::config::{ServerConfig, Transport};
use jakarta_mcp_server::stdio;
use jakarta_migration_mcp::bootstrap;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TransportArg {
    Stdio,
    Sse,
    StreamableHttp,
}

impl From<TransportArg> for Transport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Stdio => Transport::Stdio,
            TransportArg::Sse => Transport::Sse,
            TransportArg::StreamableHttp => Transport::StreamableHttp,
        }
    }
}

/// Jakarta EE migration tools over the Model Context Protocol.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured transport
    #[arg(short, long, value_enum)]
    transport: Option<TransportArg>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Stdout belongs to the protocol on the stdio transport; every
    // diagnostic goes to stderr on all transports.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read config file {}", path.display()))?;
            ServerConfig::from_toml_str(&text)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => ServerConfig::default(),
    };
    if let Some(transport) = cli.transport {
        config.transport = transport.into();
    }

    let server = bootstrap(&config).await?;

    match config.transport {
        Transport::Stdio => {
            info!("serving MCP over stdio");
            stdio::run(server.dispatcher).await?;
        }
        Transport::Sse => {
            let http_config = HttpServerConfig {
                bind_address: ([0, 0, 0, 0], config.sse.port).into(),
                sse_path: Some(config.sse.path.clone()),
                streamable_path: None,
                ..HttpServerConfig::default()
            };
            HttpMcpServer::new(http_config, server.dispatcher, server.server_info)
                .run()
                .await?;
        }
        Transport::StreamableHttp => {
            let http_config = HttpServerConfig {
                bind_address: ([0, 0, 0, 0], config.streamable.port).into(),
                sse_path: None,
                streamable_path: Some(config.streamable.path.clone()),
                ..HttpServerConfig::default()
            };
            HttpMcpServer::new(http_config, server.dispatcher, server.server_info)
                .run()
                .await?;
        }
    }
    Ok(())
}
