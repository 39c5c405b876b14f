//! MCP tool annotations for SonarCloud tools.
//!
//! Every call is a GET upstream, so the hints come from what the tool does rather than the HTTP
//! method.

use crate::registry::ToolKind;
use rmcp::model::ToolAnnotations;

/// Generate MCP tool annotations for a tool kind.
///
/// `openWorldHint` is always `true`: every tool talks to SonarCloud.
#[must_use]
pub fn annotations_for_kind(kind: ToolKind) -> ToolAnnotations {
    let open_world_hint = Some(true);

    match kind {
        ToolKind::Read => ToolAnnotations {
            title: None,
            read_only_hint: Some(true),
            destructive_hint: Some(false),
            idempotent_hint: Some(true),
            open_world_hint,
        },
        // Re-applying a transition to an issue already in the target state is rejected
        // upstream, which leaves the issue unchanged.
        ToolKind::Mutation => ToolAnnotations {
            title: None,
            read_only_hint: Some(false),
            destructive_hint: Some(false),
            idempotent_hint: Some(true),
            open_world_hint,
        },
    }
}
