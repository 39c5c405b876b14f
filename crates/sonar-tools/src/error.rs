//! Error types for SonarCloud tool dispatch.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum SonarToolsError {
    /// Required connection settings could not be resolved from any source.
    #[error(
        "missing required configuration: {}. Pass --token/--organization or set SONARCLOUD_TOKEN/SONARCLOUD_ORGANIZATION",
        .fields.join(", ")
    )]
    ConfigurationMissing { fields: Vec<&'static str> },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("{0}")]
    InvalidArgument(String),

    /// The upstream answered with a non-2xx status.
    #[error("SonarCloud API returned {status}: {message}")]
    UpstreamHttp { status: u16, message: String },

    /// No response at all (DNS, connect, timeout, truncated body).
    #[error("Request to SonarCloud failed: {message}")]
    Transport { message: String },
}

pub type Result<T> = std::result::Result<T, SonarToolsError>;

impl SonarToolsError {
    pub(crate) fn missing_argument(name: &str) -> Self {
        Self::InvalidArgument(format!("Missing required argument: {name}"))
    }

    pub(crate) fn invalid_argument(name: &str, expected: &str) -> Self {
        Self::InvalidArgument(format!("Invalid argument '{name}': expected {expected}"))
    }
}

impl From<reqwest::Error> for SonarToolsError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport {
            message: sanitize_reqwest_error(&value),
        }
    }
}

#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    // Best-effort: drop credentials + query + fragment.
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_missing_names_every_field() {
        let err = SonarToolsError::ConfigurationMissing {
            fields: vec!["token", "organization"],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("missing required configuration: token, organization"));
    }

    #[test]
    fn redact_url_drops_query_and_credentials() {
        let url = Url::parse("https://user:pw@sonarcloud.io/api/issues/search?organization=acme")
            .expect("url");
        assert_eq!(redact_url(&url), "https://sonarcloud.io/api/issues/search");
    }
}
