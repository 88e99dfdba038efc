//! Pipedrive MCP Server Binary
//!
//! ## Usage
//!
//! ```bash
//! # Streamable HTTP on 0.0.0.0:8080/mcp, settings from pdops.toml
//! PDOPS_PIPEDRIVE_API_TOKEN=... PDOPS_PIPEDRIVE_DOMAIN=acme.pipedrive.com pdops-mcp
//!
//! # Stdio transport for local agents
//! pdops-mcp --transport stdio --config config/pdops.toml
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use pdops_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat, TransportKind};
use pdops_mcp::PipedriveMcpServer;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "pdops-mcp", version, about = "Pipedrive tools over the Model Context Protocol")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transport to serve: http or stdio
    #[arg(long)]
    transport: Option<TransportKind>,

    /// Port for the http transport
    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn load_options(self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config,
            overrides: ConfigOverrides {
                transport: self.transport,
                port: self.port,
                log_level: self.log_level,
                ..ConfigOverrides::default()
            },
        }
    }
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;
    use LogFormat::*;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(log_level);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config and initialize logging before any other operations
    let config = AppConfig::load(cli.load_options())?;
    init_logging(&config);

    info!(
        event_name = "system.mcp.bootstrap",
        correlation_id = "bootstrap",
        transport = ?config.server.transport,
        "starting pdops-mcp"
    );

    let server = PipedriveMcpServer::from_config(&config)?;
    match config.server.transport {
        TransportKind::Stdio => server.run_stdio().await?,
        TransportKind::Http => server.run_http(&config.server, &config.pipedrive.base_url).await?,
    }

    Ok(())
}
