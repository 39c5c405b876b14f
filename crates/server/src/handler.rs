//! MCP server handler: exposes the SonarCloud tool catalogue over rmcp.

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Implementation, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use sonar_mcp_tools::Dispatcher;

const INSTRUCTIONS: &str = "Tools for SonarCloud code quality data. \
Use search_projects to discover project keys, then search_issues, get_measures, \
get_quality_gate_status or get_raw_source for a project. Failed calls return text starting \
with \"Error: \"; re-invoke with corrected arguments if needed.";

#[derive(Clone)]
pub struct SonarMcpServer {
    dispatcher: Dispatcher,
}

impl SonarMcpServer {
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

impl ServerHandler for SonarMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "sonar-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.dispatcher.list_tools(),
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let envelope = self
            .dispatcher
            .dispatch(&request.name, request.arguments)
            .await;
        Ok(envelope.into_call_tool_result())
    }
}
