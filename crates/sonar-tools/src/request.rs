//! Building upstream requests from tool arguments.
//!
//! Each tool's argument schema ([`ParamSpec`]s) drives the mapping: which argument goes to which
//! query parameter, how it is coerced, and which defaults apply.

use crate::error::{Result, SonarToolsError};
use crate::registry::{DefaultValue, ParamSpec, ParamType, ToolDescriptor};
use rmcp::model::JsonObject;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Upper bound SonarCloud accepts for `ps`.
pub const MAX_PAGE_SIZE: i64 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

impl QueryValue {
    /// Render for the query string; lists are comma-joined.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Int(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::List(items) => items.join(","),
        }
    }
}

/// One outgoing call: endpoint below `/api` plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub endpoint_path: &'static str,
    pub query: BTreeMap<String, QueryValue>,
}

impl UpstreamRequest {
    #[must_use]
    pub fn new(endpoint_path: &'static str) -> Self {
        Self {
            endpoint_path,
            query: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: QueryValue) {
        self.query.insert(key.into(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.query.get(key)
    }

    /// The `ps` value actually sent, if any.
    #[must_use]
    pub fn page_size(&self) -> Option<i64> {
        match self.query.get("ps") {
            Some(QueryValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// Query pairs in a stable order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .iter()
            .map(|(k, v)| (k.clone(), v.to_query_string()))
            .collect()
    }
}

/// Map `arguments` onto `tool`'s endpoint, then layer in `organization`.
///
/// # Errors
///
/// Returns [`SonarToolsError::InvalidArgument`] if a required argument is missing or an argument
/// has the wrong type.
pub fn build_request(
    tool: &ToolDescriptor,
    arguments: &JsonObject,
    organization: Option<&str>,
) -> Result<UpstreamRequest> {
    let missing: Vec<&str> = tool
        .params
        .iter()
        .filter(|p| p.required && lookup(arguments, p).is_none_or(is_blank))
        .map(|p| p.name)
        .collect();
    if !missing.is_empty() {
        return Err(SonarToolsError::missing_argument(&missing.join(", ")));
    }

    let mut request = UpstreamRequest::new(tool.endpoint);
    for param in tool.params {
        let value = match lookup(arguments, param) {
            Some(raw) => coerce(param, raw)?,
            None => default_for(param),
        };
        if let Some(value) = value {
            request.insert(param.upstream, value);
        }
    }

    for key in arguments.keys() {
        if !tool.params.iter().any(|p| p.name == key) {
            debug!(tool = %tool.name, argument = %key, "ignoring undeclared argument");
        }
    }

    // Last, so a caller-supplied `organization` can never win.
    if let Some(org) = organization.filter(|o| !o.is_empty()) {
        request.insert("organization", QueryValue::Str(org.to_string()));
    }

    Ok(request)
}

fn lookup<'a>(arguments: &'a JsonObject, param: &ParamSpec) -> Option<&'a Value> {
    arguments.get(param.name).filter(|v| !v.is_null())
}

fn is_blank(value: &Value) -> bool {
    value.as_str().is_some_and(|s| s.trim().is_empty())
}

fn default_for(param: &ParamSpec) -> Option<QueryValue> {
    match param.default? {
        DefaultValue::Int(n) => Some(QueryValue::Int(clamp_page_size(param, n))),
        DefaultValue::List(items) => Some(QueryValue::List(
            items.iter().map(|s| (*s).to_string()).collect(),
        )),
    }
}

fn clamp_page_size(param: &ParamSpec, n: i64) -> i64 {
    if matches!(param.ty, ParamType::PageSize) {
        n.min(MAX_PAGE_SIZE)
    } else {
        n
    }
}

fn coerce(param: &ParamSpec, raw: &Value) -> Result<Option<QueryValue>> {
    let name = param.name;
    match param.ty {
        ParamType::String => match raw {
            Value::String(s) => Ok(Some(QueryValue::Str(s.clone()))),
            Value::Number(n) => Ok(Some(QueryValue::Str(n.to_string()))),
            _ => Err(SonarToolsError::invalid_argument(name, "a string")),
        },
        ParamType::Integer => as_integer(raw)
            .map(|n| Some(QueryValue::Int(n)))
            .ok_or_else(|| SonarToolsError::invalid_argument(name, "an integer")),
        ParamType::PageSize => {
            let n = as_integer(raw)
                .filter(|n| *n >= 1)
                .ok_or_else(|| SonarToolsError::invalid_argument(name, "a positive integer"))?;
            Ok(Some(QueryValue::Int(n.min(MAX_PAGE_SIZE))))
        }
        ParamType::Boolean => match raw {
            Value::Bool(b) => Ok(Some(QueryValue::Bool(*b))),
            Value::String(s) if s == "true" || s == "false" => {
                Ok(Some(QueryValue::Bool(s == "true")))
            }
            _ => Err(SonarToolsError::invalid_argument(name, "a boolean")),
        },
        ParamType::StringList => {
            let items = as_string_list(raw)
                .ok_or_else(|| SonarToolsError::invalid_argument(name, "a list of strings"))?;
            if items.is_empty() {
                Ok(default_for(param))
            } else {
                Ok(Some(QueryValue::List(items)))
            }
        }
        ParamType::Enum(allowed) => match raw {
            Value::String(s) if allowed.contains(&s.as_str()) => {
                Ok(Some(QueryValue::Str(s.clone())))
            }
            _ => Err(SonarToolsError::invalid_argument(
                name,
                &format!("one of {}", allowed.join(", ")),
            )),
        },
    }
}

fn as_integer(raw: &Value) -> Option<i64> {
    match raw {
        // `1e4` and `100.0` are integers to JSON Schema; huge values saturate.
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_string_list(raw: &Value) -> Option<Vec<String>> {
    match raw {
        Value::String(s) => Some(
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}
