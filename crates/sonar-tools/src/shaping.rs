//! Per-tool response shaping.
//!
//! A shaper picks the part of the upstream body the caller cares about and adds derived
//! summary fields. Shapers never fail: missing lists become `[]`, missing objects `null`, missing
//! counters `0`.

use crate::request::UpstreamRequest;
use serde_json::{Map, Value, json};

/// What a tool returns before it is put into the envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Rendered as pretty-printed JSON.
    Json(Value),
    /// Rendered verbatim.
    Text(String),
}

impl ToolOutput {
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Json(v) => serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
            Self::Text(s) => s.clone(),
        }
    }
}

pub type Shaper = fn(&UpstreamRequest, Value) -> ToolOutput;

fn list_field(body: &Value, key: &str) -> Value {
    body.get(key)
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or_else(|| json!([]))
}

fn field(body: &Value, key: &str) -> Value {
    body.get(key).cloned().unwrap_or(Value::Null)
}

fn paging_number(body: &Value, key: &str) -> u64 {
    body.get("paging")
        .and_then(|p| p.get(key))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// Keep only `keys` from the body.
fn select(body: &Value, keys: &[&str]) -> ToolOutput {
    let mut out = Map::new();
    for key in keys {
        out.insert((*key).to_string(), field(body, key));
    }
    ToolOutput::Json(Value::Object(out))
}

pub(crate) fn issues(request: &UpstreamRequest, body: Value) -> ToolOutput {
    let total = body
        .get("paging")
        .and_then(|p| p.get("total"))
        .or_else(|| body.get("total"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let page_size = request
        .page_size()
        .and_then(|n| u64::try_from(n).ok())
        .filter(|n| *n > 0)
        .or_else(|| Some(paging_number(&body, "pageSize")).filter(|n| *n > 0));
    let page = body
        .get("paging")
        .and_then(|p| p.get("pageIndex"))
        .or_else(|| body.get("p"))
        .and_then(Value::as_u64)
        .unwrap_or(1);
    let pages = page_size.map_or(0, |ps| total.div_ceil(ps));

    let mut out = json!({
        "total": total,
        "page": page,
        "pageSize": page_size.unwrap_or(0),
        "pages": pages,
        "issues": list_field(&body, "issues"),
        "components": list_field(&body, "components"),
    });
    for key in ["facets", "effortTotal", "debtTotal"] {
        if let Some(v) = body.get(key) {
            out[key] = v.clone();
        }
    }
    ToolOutput::Json(out)
}

pub(crate) fn measures(_request: &UpstreamRequest, body: Value) -> ToolOutput {
    let mut out = json!({
        "total": paging_number(&body, "total"),
        "baseComponent": field(&body, "baseComponent"),
        "components": list_field(&body, "components"),
    });
    if let Some(metrics) = body.get("metrics") {
        out["metrics"] = metrics.clone();
    }
    ToolOutput::Json(out)
}

fn paged_list(body: &Value, key: &str) -> ToolOutput {
    let mut out = Map::new();
    out.insert("total".to_string(), json!(paging_number(body, "total")));
    out.insert("page".to_string(), json!(paging_number(body, "pageIndex")));
    out.insert("pageSize".to_string(), json!(paging_number(body, "pageSize")));
    out.insert(key.to_string(), list_field(body, key));
    ToolOutput::Json(Value::Object(out))
}

pub(crate) fn projects(_request: &UpstreamRequest, body: Value) -> ToolOutput {
    paged_list(&body, "components")
}

pub(crate) fn metrics(_request: &UpstreamRequest, body: Value) -> ToolOutput {
    // metrics/search reports paging at the top level rather than under `paging`.
    if body.get("paging").is_none() && body.get("total").is_some() {
        let wrapped = json!({
            "metrics": field(&body, "metrics"),
            "paging": {
                "total": field(&body, "total"),
                "pageIndex": field(&body, "p"),
                "pageSize": field(&body, "ps"),
            },
        });
        return paged_list(&wrapped, "metrics");
    }
    paged_list(&body, "metrics")
}

pub(crate) fn quality_gate_status(_request: &UpstreamRequest, body: Value) -> ToolOutput {
    select(&body, &["projectStatus"])
}

pub(crate) fn quality_gates(_request: &UpstreamRequest, body: Value) -> ToolOutput {
    select(&body, &["qualitygates", "default"])
}

pub(crate) fn rule(_request: &UpstreamRequest, body: Value) -> ToolOutput {
    if body.get("actives").is_some() {
        select(&body, &["rule", "actives"])
    } else {
        select(&body, &["rule"])
    }
}

pub(crate) fn languages(_request: &UpstreamRequest, body: Value) -> ToolOutput {
    select(&body, &["languages"])
}

pub(crate) fn repositories(_request: &UpstreamRequest, body: Value) -> ToolOutput {
    select(&body, &["repositories"])
}

pub(crate) fn pull_requests(_request: &UpstreamRequest, body: Value) -> ToolOutput {
    select(&body, &["pullRequests"])
}

pub(crate) fn raw_source(_request: &UpstreamRequest, body: Value) -> ToolOutput {
    match body {
        Value::String(s) => ToolOutput::Text(s),
        other => ToolOutput::Json(other),
    }
}

pub(crate) fn transition(_request: &UpstreamRequest, body: Value) -> ToolOutput {
    let issue = field(&body, "issue");
    let transitions = issue
        .get("transitions")
        .or_else(|| body.get("transitions"))
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or_else(|| json!([]));
    ToolOutput::Json(json!({
        "success": true,
        "issue": issue,
        "transitions": transitions,
    }))
}
