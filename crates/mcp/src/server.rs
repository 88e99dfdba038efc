//! MCP Server Implementation
//!
//! Routes tool calls onto the core orchestrator and serves them over stdio or
//! streamable HTTP.

use std::sync::Arc;
use std::time::Duration;

use pdops_core::config::{AppConfig, ServerConfig};
use pdops_core::pipedrive::records::{create_organization, create_person, into_tool_value};
use pdops_core::{
    CrmTransport, DealOrchestrator, DealRequest, NewOrganization, NewPerson, PipedriveClient,
    ReconcileOptions, Reconciler,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router,
    transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
    },
    ErrorData, ServerHandler, ServiceExt,
};
use serde_json::{json, Value};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::health::{self, HealthState};
use crate::tools::{
    AddDealInput, AddOrganizationInput, AddPersonInput, ADD_DEAL_TOOL, ADD_ORGANIZATION_TOOL,
    ADD_PERSON_TOOL,
};
use crate::{McpError, McpResult};

type SharedTransport = Arc<dyn CrmTransport>;

/// Main MCP server for Pipedrive
#[derive(Clone)]
pub struct PipedriveMcpServer {
    orchestrator: Arc<DealOrchestrator<SharedTransport>>,
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for PipedriveMcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipedriveMcpServer").finish_non_exhaustive()
    }
}

#[tool_router]
impl PipedriveMcpServer {
    /// Create a server over any transport; `domain` is the company host used
    /// in deal links.
    pub fn new(transport: SharedTransport, options: ReconcileOptions, domain: impl Into<String>) -> Self {
        let reconciler = Reconciler::new(transport, options);
        Self {
            orchestrator: Arc::new(DealOrchestrator::new(reconciler, domain)),
            tool_router: Self::tool_router(),
        }
    }

    /// Create a server talking to the Pipedrive API described by `config`.
    pub fn from_config(config: &AppConfig) -> McpResult<Self> {
        let client = PipedriveClient::new(&config.pipedrive)?;
        info!(
            event_name = "system.mcp.client_ready",
            correlation_id = "bootstrap",
            base_url = client.base_url(),
            "pipedrive client initialized"
        );
        Ok(Self::new(Arc::new(client), ReconcileOptions::from(config), config.pipedrive.domain.clone()))
    }

    #[tool(
        name = "add_pipedrive_deal",
        description = "Create a deal. A given org_id or person_id is linked directly. Otherwise the \
                       organization and contact person are looked up by exact match (tax id or \
                       email first, then name) and created when missing."
    )]
    async fn add_pipedrive_deal(
        &self,
        Parameters(input): Parameters<AddDealInput>,
    ) -> Result<CallToolResult, ErrorData> {
        let value = self.add_deal(input).instrument(tool_span(ADD_DEAL_TOOL)).await;
        tool_result(&value)
    }

    #[tool(
        name = "add_pipedrive_person",
        description = "Create a person. Emails and phones are stored as work entries; the first \
                       of each is primary. Does not check for duplicates."
    )]
    async fn add_pipedrive_person(
        &self,
        Parameters(input): Parameters<AddPersonInput>,
    ) -> Result<CallToolResult, ErrorData> {
        let value = self.add_person(input).instrument(tool_span(ADD_PERSON_TOOL)).await;
        tool_result(&value)
    }

    #[tool(
        name = "add_pipedrive_organization",
        description = "Create an organization with optional owner, address and visibility. Does \
                       not check for duplicates."
    )]
    async fn add_pipedrive_organization(
        &self,
        Parameters(input): Parameters<AddOrganizationInput>,
    ) -> Result<CallToolResult, ErrorData> {
        let value = self.add_organization(input).instrument(tool_span(ADD_ORGANIZATION_TOOL)).await;
        tool_result(&value)
    }
}

impl PipedriveMcpServer {
    /// Runs the deal workflow and returns the JSON object handed to the agent.
    pub async fn add_deal(&self, input: AddDealInput) -> Value {
        info!(event_name = "tool.deal.called", title = %input.title, "add_pipedrive_deal called");
        let outcome = self.orchestrator.create_deal(DealRequest::from(input)).await;
        outcome.into_value()
    }

    pub async fn add_person(&self, input: AddPersonInput) -> Value {
        info!(event_name = "tool.person.called", name = %input.name, "add_pipedrive_person called");
        let person = NewPerson::from(input);
        into_tool_value(create_person(self.transport(), &person).await)
    }

    pub async fn add_organization(&self, input: AddOrganizationInput) -> Value {
        info!(
            event_name = "tool.organization.called",
            name = %input.name,
            "add_pipedrive_organization called"
        );
        let organization = match NewOrganization::try_from(input) {
            Ok(organization) => organization,
            Err(error) => {
                warn!(event_name = "tool.organization.rejected", error = %error, "invalid visibility");
                return json!({ "error": error.to_string(), "success": false });
            }
        };
        into_tool_value(create_organization(self.transport(), &organization).await)
    }

    fn transport(&self) -> &SharedTransport {
        self.orchestrator.reconciler().transport()
    }

    /// Run the server with stdio transport
    pub async fn run_stdio(self) -> McpResult<()> {
        info!(event_name = "system.mcp.start", transport = "stdio", "starting MCP server");

        let service = self
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|error| McpError::Service(error.to_string()))?;
        service.waiting().await?;

        info!(event_name = "system.mcp.stopped", transport = "stdio", "MCP server shutdown complete");
        Ok(())
    }

    /// Serve streamable HTTP at `config.path` with `/health` alongside, until
    /// Ctrl-C.
    pub async fn run_http(self, config: &ServerConfig, pipedrive_base_url: &str) -> McpResult<()> {
        let server = self;
        let mcp_service = StreamableHttpService::new(
            move || Ok(server.clone()),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig::default(),
        );
        let app = axum::Router::new()
            .nest_service(&config.path, mcp_service)
            .merge(health::router(HealthState::new(pipedrive_base_url)));

        let address = format!("{}:{}", config.bind_address, config.port);
        let listener = tokio::net::TcpListener::bind(&address).await?;
        info!(
            event_name = "system.mcp.start",
            transport = "http",
            bind_address = %address,
            path = %config.path,
            "starting MCP server"
        );

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let serving = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tokio::signal::ctrl_c().await?;
        info!(event_name = "system.mcp.stopping", correlation_id = "shutdown", "shutdown requested");
        let _ = shutdown_tx.send(());

        let grace = Duration::from_secs(config.graceful_shutdown_secs);
        match tokio::time::timeout(grace, serving).await {
            Ok(joined) => joined??,
            Err(_) => warn!(
                event_name = "system.mcp.shutdown_timeout",
                grace_secs = config.graceful_shutdown_secs,
                "open sessions did not close in time"
            ),
        }

        info!(event_name = "system.mcp.stopped", transport = "http", "MCP server shutdown complete");
        Ok(())
    }
}

#[tool_handler]
impl ServerHandler for PipedriveMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "pdops-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Pipedrive MCP Server - create deals, people and organizations in Pipedrive. \
                 add_pipedrive_deal reuses existing records found by exact match."
                    .to_string(),
            ),
        }
    }
}

fn tool_span(tool: &'static str) -> tracing::Span {
    let correlation_id = Uuid::new_v4();
    info_span!("tool_call", tool, correlation_id = %correlation_id)
}

/// Failures are reported inside the JSON object through `success: false`.
fn tool_result(value: &Value) -> Result<CallToolResult, ErrorData> {
    let text = serde_json::to_string(value)
        .map_err(|error| ErrorData::internal_error(error.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}
