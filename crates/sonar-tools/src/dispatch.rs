//! Tool dispatch: name + arguments in, [`ResultEnvelope`] out.
//!
//! Every failure (unknown tool, bad arguments, missing credentials, upstream error) is turned
//! into an envelope whose text starts with `"Error: "`. Nothing propagates to the transport.

use crate::config::SonarConfig;
use crate::error::{Result, SonarToolsError};
use crate::gateway::{HttpGateway, Upstream};
use crate::registry::ToolRegistry;
use crate::request::build_request;
use crate::shaping::ToolOutput;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const ERROR_PREFIX: &str = "Error: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub text: String,
}

/// The one result shape for success and failure alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEnvelope {
    pub content: Vec<TextContent>,
}

impl ResultEnvelope {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![TextContent {
                kind: ContentKind::Text,
                text: text.into(),
            }],
        }
    }

    #[must_use]
    pub fn error(err: &SonarToolsError) -> Self {
        Self::text(format!("{ERROR_PREFIX}{err}"))
    }

    /// Text of the first content item (empty if there is none).
    #[must_use]
    pub fn first_text(&self) -> &str {
        self.content.first().map_or("", |c| c.text.as_str())
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.first_text().starts_with(ERROR_PREFIX)
    }

    /// Convert for the MCP transport. `isError` is left unset; failures are marked by text only.
    #[must_use]
    pub fn into_call_tool_result(self) -> CallToolResult {
        CallToolResult {
            content: self
                .content
                .into_iter()
                .map(|c| Content::text(c.text))
                .collect(),
            structured_content: None,
            is_error: None,
            meta: None,
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    config: Arc<SonarConfig>,
    registry: ToolRegistry,
    upstream: Arc<dyn Upstream>,
}

impl Dispatcher {
    /// Dispatcher over the built-in catalogue and an arbitrary upstream.
    ///
    /// The instance is immutable and safe to share across tasks.
    #[must_use]
    pub fn new(config: Arc<SonarConfig>, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                config,
                registry: ToolRegistry::builtin(),
                upstream,
            }),
        }
    }

    /// Dispatcher calling SonarCloud over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn connect(config: SonarConfig) -> Result<Self> {
        let config = Arc::new(config);
        let gateway = HttpGateway::new(Arc::clone(&config))?;
        Ok(Self::new(config, Arc::new(gateway)))
    }

    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.inner.registry
    }

    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.inner.registry.list_tools()
    }

    /// Execute one tool call. Never fails; errors come back as an error envelope.
    pub async fn dispatch(&self, name: &str, arguments: Option<JsonObject>) -> ResultEnvelope {
        let arguments = arguments.unwrap_or_default();
        info!(tool = %name, "tool call");
        match self.try_dispatch(name, &arguments).await {
            Ok(output) => ResultEnvelope::text(output.render()),
            Err(err) => {
                warn!(tool = %name, error = %err, "tool call failed");
                ResultEnvelope::error(&err)
            }
        }
    }

    async fn try_dispatch(&self, name: &str, arguments: &JsonObject) -> Result<ToolOutput> {
        let inner = &self.inner;
        let tool = inner
            .registry
            .get(name)
            .ok_or_else(|| SonarToolsError::UnknownTool {
                name: name.to_string(),
            })?;

        let fields = inner.config.missing_fields();
        if !fields.is_empty() {
            return Err(SonarToolsError::ConfigurationMissing { fields });
        }

        let request = build_request(tool, arguments, inner.config.organization.as_deref())?;
        let body = inner.upstream.get(&request, tool.response).await?;
        Ok((tool.shape)(&request, body))
    }
}
