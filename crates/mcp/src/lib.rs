//! Pipedrive MCP (Model Context Protocol) Server
//!
//! Exposes three tools to AI agents: deal creation with get-or-create
//! resolution of the linked organization and person, and plain person and
//! organization creation.
//!
//! ## Architecture
//!
//! - `PipedriveMcpServer`: tool router and protocol handler
//! - `tools`: tool input schemas and their mapping onto core requests
//! - `health`: `/health` endpoint mounted next to the HTTP transport
//!
//! ## Example Usage
//!
//! ```no_run
//! use pdops_core::config::{AppConfig, LoadOptions};
//! use pdops_mcp::PipedriveMcpServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load(LoadOptions::default())?;
//!     let server = PipedriveMcpServer::from_config(&config)?;
//!     server.run_stdio().await?;
//!     Ok(())
//! }
//! ```

pub mod health;
mod server;
mod tools;

pub use server::PipedriveMcpServer;
pub use tools::*;

use pdops_core::config::ConfigError;
use thiserror::Error;

/// Errors raised while starting or running the tool server
#[derive(Error, Debug)]
pub enum McpError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("pipedrive client setup failed: {0}")]
    ClientSetup(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mcp service error: {0}")]
    Service(String),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;
