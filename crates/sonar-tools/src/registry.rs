//! The static tool catalogue.
//!
//! Every tool is one [`ToolDescriptor`]: its argument schema (which also drives request
//! building), its endpoint, and the shaper applied to the upstream body.

use crate::shaping::{self, Shaper};
use rmcp::model::{JsonObject, Tool};
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Boolean,
    /// Sent comma-joined.
    StringList,
    /// Capped at [`crate::request::MAX_PAGE_SIZE`].
    PageSize,
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Int(i64),
    List(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    /// Argument name as the caller sees it.
    pub name: &'static str,
    /// Query parameter name upstream.
    pub upstream: &'static str,
    pub ty: ParamType,
    pub required: bool,
    pub default: Option<DefaultValue>,
    pub description: &'static str,
}

impl ParamSpec {
    const fn new(
        name: &'static str,
        upstream: &'static str,
        ty: ParamType,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            upstream,
            ty,
            required: false,
            default: None,
            description,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    fn schema(&self) -> Value {
        let mut schema = match self.ty {
            ParamType::String => json!({ "type": "string" }),
            ParamType::Integer => json!({ "type": "integer" }),
            ParamType::Boolean => json!({ "type": "boolean" }),
            ParamType::StringList => json!({ "type": "array", "items": { "type": "string" } }),
            ParamType::PageSize => json!({
                "type": "integer",
                "minimum": 1,
                "maximum": crate::request::MAX_PAGE_SIZE,
            }),
            ParamType::Enum(values) => json!({ "type": "string", "enum": values }),
        };
        schema["description"] = json!(self.description);
        match self.default {
            Some(DefaultValue::Int(n)) => schema["default"] = json!(n),
            Some(DefaultValue::List(items)) => schema["default"] = json!(items),
            None => {}
        }
        schema
    }
}

const fn string(name: &'static str, upstream: &'static str, desc: &'static str) -> ParamSpec {
    ParamSpec::new(name, upstream, ParamType::String, desc)
}

const fn list(name: &'static str, upstream: &'static str, desc: &'static str) -> ParamSpec {
    ParamSpec::new(name, upstream, ParamType::StringList, desc)
}

const fn boolean(name: &'static str, upstream: &'static str, desc: &'static str) -> ParamSpec {
    ParamSpec::new(name, upstream, ParamType::Boolean, desc)
}

const PAGE: ParamSpec = ParamSpec::new("page", "p", ParamType::Integer, "1-based page number");

const fn page_size(default: i64) -> ParamSpec {
    ParamSpec::new(
        "pageSize",
        "ps",
        ParamType::PageSize,
        "Results per page (max 500)",
    )
    .with_default(DefaultValue::Int(default))
}

const BRANCH: ParamSpec = string("branch", "branch", "Branch name");
const PULL_REQUEST: ParamSpec = string("pullRequest", "pullRequest", "Pull request id");

/// Whether a tool changes server-side state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Read,
    Mutation,
}

/// How the upstream body is decoded before shaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Json,
    /// Keep the body as a string even if it parses as JSON.
    Text,
}

pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// Path below `{baseUrl}/api`.
    pub endpoint: &'static str,
    pub params: &'static [ParamSpec],
    pub kind: ToolKind,
    pub response: ResponseMode,
    pub shape: Shaper,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    /// JSON Schema for the tool's arguments, as published for discovery.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required: Vec<&str> = Vec::new();
        for param in self.params {
            properties.insert(param.name.to_string(), param.schema());
            if param.required {
                required.push(param.name);
            }
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    #[must_use]
    pub fn to_tool(&self) -> Tool {
        let schema_obj = self
            .input_schema()
            .as_object()
            .cloned()
            .unwrap_or_else(JsonObject::new);
        let mut tool = Tool::new(self.name, self.description, Arc::new(schema_obj));
        tool.annotations = Some(crate::semantics::annotations_for_kind(self.kind));
        tool
    }
}

/// Default `metricKeys` for `get_measures`.
pub const DEFAULT_METRICS: &[&str] = &[
    "ncloc",
    "bugs",
    "vulnerabilities",
    "code_smells",
    "security_hotspots",
    "coverage",
    "duplicated_lines_density",
    "reliability_rating",
    "security_rating",
    "sqale_rating",
];

pub const TRANSITIONS: &[&str] = &[
    "confirm",
    "unconfirm",
    "reopen",
    "resolve",
    "falsepositive",
    "wontfix",
    "close",
    "accept",
];

static TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "search_issues",
        description: "Search issues (bugs, vulnerabilities, code smells) in the organization",
        endpoint: "/issues/search",
        params: &[
            string("projectKey", "componentKeys", "Project key to restrict the search to"),
            BRANCH,
            PULL_REQUEST,
            list("types", "types", "Issue types, e.g. BUG, VULNERABILITY, CODE_SMELL"),
            list("severities", "severities", "Severities, e.g. BLOCKER, CRITICAL, MAJOR"),
            list("statuses", "statuses", "Statuses, e.g. OPEN, CONFIRMED, RESOLVED"),
            list("resolutions", "resolutions", "Resolutions, e.g. FIXED, WONTFIX"),
            boolean("resolved", "resolved", "Only resolved (true) or unresolved (false) issues"),
            list("tags", "tags", "Issue tags"),
            list("rules", "rules", "Rule keys"),
            list("languages", "languages", "Language keys"),
            list("assignees", "assignees", "Assignee logins"),
            string("author", "author", "SCM author"),
            string("createdAfter", "createdAfter", "Created on or after (YYYY-MM-DD)"),
            string("createdBefore", "createdBefore", "Created before (YYYY-MM-DD)"),
            string("createdInLast", "createdInLast", "Created in the last period, e.g. 1m2w"),
            string("sort", "s", "Sort field"),
            boolean("ascending", "asc", "Ascending sort"),
            list("facets", "facets", "Facets to compute"),
            PAGE,
            page_size(100),
        ],
        kind: ToolKind::Read,
        response: ResponseMode::Json,
        shape: shaping::issues,
    },
    ToolDescriptor {
        name: "change_issue_status",
        description: "Apply a workflow transition to an issue (confirm, resolve, wontfix, ...)",
        endpoint: "/issues/do_transition",
        params: &[
            string("key", "issue", "Issue key").required(),
            ParamSpec::new(
                "transition",
                "transition",
                ParamType::Enum(TRANSITIONS),
                "Transition to apply",
            )
            .required(),
        ],
        kind: ToolKind::Mutation,
        response: ResponseMode::Json,
        shape: shaping::transition,
    },
    ToolDescriptor {
        name: "get_measures",
        description: "Get metric measures for a component and its children",
        endpoint: "/measures/component_tree",
        params: &[
            string("component", "component", "Component (project) key").required(),
            list("metricKeys", "metricKeys", "Metric keys")
                .with_default(DefaultValue::List(DEFAULT_METRICS)),
            BRANCH,
            PULL_REQUEST,
            ParamSpec::new(
                "strategy",
                "strategy",
                ParamType::Enum(&["all", "children", "leaves"]),
                "Tree traversal strategy",
            ),
            list("qualifiers", "qualifiers", "Component qualifiers, e.g. FIL, DIR"),
            PAGE,
            page_size(100),
        ],
        kind: ToolKind::Read,
        response: ResponseMode::Json,
        shape: shaping::measures,
    },
    ToolDescriptor {
        name: "search_projects",
        description: "List projects in the organization",
        endpoint: "/projects/search",
        params: &[
            string("query", "q", "Filter on project key or name"),
            list("projects", "projects", "Project keys"),
            PAGE,
            page_size(100),
        ],
        kind: ToolKind::Read,
        response: ResponseMode::Json,
        shape: shaping::projects,
    },
    ToolDescriptor {
        name: "list_pull_requests",
        description: "List pull requests analyzed for a project",
        endpoint: "/project_pull_requests/list",
        params: &[string("project", "project", "Project key").required()],
        kind: ToolKind::Read,
        response: ResponseMode::Json,
        shape: shaping::pull_requests,
    },
    ToolDescriptor {
        name: "list_languages",
        description: "List supported programming languages",
        endpoint: "/languages/list",
        params: &[string("query", "q", "Filter on language key or name")],
        kind: ToolKind::Read,
        response: ResponseMode::Json,
        shape: shaping::languages,
    },
    ToolDescriptor {
        name: "search_metrics",
        description: "List available metrics",
        endpoint: "/metrics/search",
        params: &[PAGE, page_size(100)],
        kind: ToolKind::Read,
        response: ResponseMode::Json,
        shape: shaping::metrics,
    },
    ToolDescriptor {
        name: "get_quality_gate_status",
        description: "Get the quality gate status of a project",
        endpoint: "/qualitygates/project_status",
        params: &[
            string("projectKey", "projectKey", "Project key").required(),
            BRANCH,
            PULL_REQUEST,
        ],
        kind: ToolKind::Read,
        response: ResponseMode::Json,
        shape: shaping::quality_gate_status,
    },
    ToolDescriptor {
        name: "list_quality_gates",
        description: "List quality gates of the organization",
        endpoint: "/qualitygates/list",
        params: &[],
        kind: ToolKind::Read,
        response: ResponseMode::Json,
        shape: shaping::quality_gates,
    },
    ToolDescriptor {
        name: "show_rule",
        description: "Show a coding rule",
        endpoint: "/rules/show",
        params: &[
            string("key", "key", "Rule key, e.g. java:S1144").required(),
            boolean("actives", "actives", "Include active quality profiles"),
        ],
        kind: ToolKind::Read,
        response: ResponseMode::Json,
        shape: shaping::rule,
    },
    ToolDescriptor {
        name: "list_rule_repositories",
        description: "List rule repositories",
        endpoint: "/rules/repositories",
        params: &[
            string("language", "language", "Language key"),
            string("query", "q", "Filter on repository key or name"),
        ],
        kind: ToolKind::Read,
        response: ResponseMode::Json,
        shape: shaping::repositories,
    },
    ToolDescriptor {
        name: "get_raw_source",
        description: "Get the raw source code of a file",
        endpoint: "/sources/raw",
        params: &[
            string("key", "key", "File key, e.g. my_project:src/foo/Bar.java").required(),
            BRANCH,
            PULL_REQUEST,
        ],
        kind: ToolKind::Read,
        response: ResponseMode::Text,
        shape: shaping::raw_source,
    },
];

/// Read-only view over the catalogue.
#[derive(Debug, Clone, Copy)]
pub struct ToolRegistry {
    tools: &'static [ToolDescriptor],
}

impl ToolRegistry {
    #[must_use]
    pub fn builtin() -> Self {
        Self { tools: TOOLS }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'static ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    #[must_use]
    pub fn descriptors(&self) -> &'static [ToolDescriptor] {
        self.tools
    }

    /// The catalogue as MCP `Tool`s, in declaration order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDescriptor::to_tool).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tool_names_are_unique() {
        let registry = ToolRegistry::builtin();
        let mut seen = HashSet::new();
        for tool in registry.descriptors() {
            assert!(seen.insert(tool.name), "duplicate tool {}", tool.name);
        }
        assert_eq!(seen.len(), 12);
    }

    #[test]
    fn every_endpoint_is_distinct_and_rooted() {
        let registry = ToolRegistry::builtin();
        let endpoints: HashSet<&str> = registry.descriptors().iter().map(|t| t.endpoint).collect();
        assert_eq!(endpoints.len(), registry.descriptors().len());
        assert!(endpoints.iter().all(|e| e.starts_with('/')));
    }

    #[test]
    fn no_tool_accepts_an_organization_argument() {
        for tool in ToolRegistry::builtin().descriptors() {
            assert!(
                tool.params
                    .iter()
                    .all(|p| p.name != "organization" && p.upstream != "organization"),
                "{} exposes organization",
                tool.name
            );
        }
    }

    #[test]
    fn schema_lists_required_fields_and_defaults() {
        let tool = ToolRegistry::builtin().get("get_measures").expect("tool");
        let schema = tool.input_schema();
        assert_eq!(schema["required"], json!(["component"]));
        assert_eq!(schema["properties"]["pageSize"]["default"], json!(100));
        assert_eq!(schema["properties"]["pageSize"]["maximum"], json!(500));
        assert_eq!(
            schema["properties"]["metricKeys"]["default"],
            json!(DEFAULT_METRICS)
        );
    }

    #[test]
    fn schema_omits_required_when_nothing_is_required() {
        let tool = ToolRegistry::builtin().get("list_quality_gates").expect("tool");
        let schema = tool.input_schema();
        assert!(schema.get("required").is_none());
        assert_eq!(schema["type"], "object");
    }

    #[test]
    fn list_tools_publishes_every_descriptor_with_annotations() {
        let tools = ToolRegistry::builtin().list_tools();
        assert_eq!(tools.len(), 12);
        let transition = tools
            .iter()
            .find(|t| t.name == "change_issue_status")
            .expect("listed");
        let annotations = transition.annotations.as_ref().expect("annotations");
        assert_eq!(annotations.read_only_hint, Some(false));
        let required = transition
            .input_schema
            .get("required")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        assert!(required.contains(&json!("key")));
        assert!(required.contains(&json!("transition")));
    }
}
