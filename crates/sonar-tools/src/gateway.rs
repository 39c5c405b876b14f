//! The single authenticated call to the SonarCloud Web API.
//!
//! One request per invocation: no retries, no backoff, no timeout beyond the client's default.

use crate::config::SonarConfig;
use crate::error::{Result, SonarToolsError, sanitize_reqwest_error};
use crate::registry::ResponseMode;
use crate::request::UpstreamRequest;
use async_trait::async_trait;
use base64::Engine as _;
use mime::Mime;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// Anything that can answer an [`UpstreamRequest`].
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Perform the call and return the decoded body.
    async fn get(&self, request: &UpstreamRequest, mode: ResponseMode) -> Result<Value>;
}

#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    config: Arc<SonarConfig>,
    authorization: String,
}

impl HttpGateway {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: Arc<SonarConfig>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("sonar-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let authorization = basic_authorization(&config.token);
        Ok(Self {
            client,
            config,
            authorization,
        })
    }

    fn url_for(&self, request: &UpstreamRequest) -> Result<Url> {
        let raw = format!("{}/api{}", self.config.base_url, request.endpoint_path);
        let mut url = Url::parse(&raw).map_err(|e| SonarToolsError::Transport {
            message: format!("invalid URL '{raw}': {e}"),
        })?;
        let pairs = request.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }
}

/// `Basic base64(token + ":")`; SonarCloud takes the token as username with an empty password.
#[must_use]
pub fn basic_authorization(token: &str) -> String {
    let credential = base64::engine::general_purpose::STANDARD.encode(format!("{token}:"));
    format!("Basic {credential}")
}

#[async_trait]
impl Upstream for HttpGateway {
    async fn get(&self, request: &UpstreamRequest, mode: ResponseMode) -> Result<Value> {
        let url = self.url_for(request)?;
        let started = Instant::now();

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, &self.authorization)
            .send()
            .await
            .inspect_err(|e| {
                warn!(endpoint = %request.endpoint_path, error = %sanitize_reqwest_error(e), "upstream request failed");
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let status_error = response
            .error_for_status_ref()
            .err()
            .map(|e| sanitize_reqwest_error(&e));
        let bytes = response.bytes().await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        debug!(
            endpoint = %request.endpoint_path,
            status = status.as_u16(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "upstream responded"
        );

        if !status.is_success() {
            let message = upstream_error_message(&text)
                .or(status_error)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown")
                        .to_string()
                });
            return Err(SonarToolsError::UpstreamHttp {
                status: status.as_u16(),
                message,
            });
        }

        Ok(decode_body(text, content_type.as_deref(), mode))
    }
}

/// First `errors[].msg` of a SonarCloud error body.
fn upstream_error_message(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    v.get("errors")?
        .as_array()?
        .first()?
        .get("msg")?
        .as_str()
        .map(str::to_string)
}

fn is_non_json_text(content_type: Option<&str>) -> bool {
    let Some(ct) = content_type else {
        return false;
    };
    let Ok(m) = ct.parse::<Mime>() else {
        return false;
    };
    m.type_() == mime::TEXT && m.subtype() != mime::JSON
}

fn decode_body(text: String, content_type: Option<&str>, mode: ResponseMode) -> Value {
    match mode {
        ResponseMode::Text => Value::String(text),
        ResponseMode::Json if is_non_json_text(content_type) => Value::String(text),
        ResponseMode::Json => serde_json::from_str(&text).unwrap_or_else(|_| json!(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::QueryValue;
    use sonar_mcp_test_support::{MockResponse, MockSonar};

    fn gateway_for(base_url: &str) -> HttpGateway {
        let cfg = SonarConfig::new("squ_secret", Some("acme".to_string()), base_url);
        HttpGateway::new(Arc::new(cfg)).expect("client")
    }

    #[test]
    fn basic_authorization_encodes_token_with_empty_password() {
        let expected = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode("squ_secret:")
        );
        assert_eq!(basic_authorization("squ_secret"), expected);
    }

    #[tokio::test]
    async fn get_sends_auth_path_and_query() {
        let mock = MockSonar::json(200, json!({"languages": []}))
            .await
            .expect("mock");
        let gateway = gateway_for(mock.base_url());

        let mut req = UpstreamRequest::new("/issues/search");
        req.insert("organization", QueryValue::Str("acme".to_string()));
        req.insert(
            "severities",
            QueryValue::List(vec!["BLOCKER".to_string(), "MAJOR".to_string()]),
        );
        let body = gateway.get(&req, ResponseMode::Json).await.expect("ok");
        assert_eq!(body, json!({"languages": []}));

        let seen = mock.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, "GET");
        assert_eq!(seen[0].path, "/api/issues/search");
        assert_eq!(seen[0].param("organization"), Some("acme"));
        assert_eq!(seen[0].param("severities"), Some("BLOCKER,MAJOR"));
        assert_eq!(
            seen[0].authorization.as_deref(),
            Some(basic_authorization("squ_secret").as_str())
        );
    }

    #[tokio::test]
    async fn non_2xx_surfaces_first_upstream_error() {
        let mock = MockSonar::json(
            404,
            json!({"errors": [{"msg": "Component key 'nope' not found"}, {"msg": "second"}]}),
        )
        .await
        .expect("mock");
        let gateway = gateway_for(mock.base_url());

        let err = gateway
            .get(&UpstreamRequest::new("/measures/component_tree"), ResponseMode::Json)
            .await
            .unwrap_err();
        match err {
            SonarToolsError::UpstreamHttp { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Component key 'nope' not found");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(mock.request_count(), 1, "no retry");
    }

    #[tokio::test]
    async fn non_2xx_without_error_body_uses_transport_text() {
        let mock = MockSonar::start(|_| MockResponse::text(401, "")).await.expect("mock");
        let gateway = gateway_for(mock.base_url());

        let mut req = UpstreamRequest::new("/languages/list");
        req.insert("organization", QueryValue::Str("acme".to_string()));
        let err = gateway.get(&req, ResponseMode::Json).await.unwrap_err();
        assert_eq!(mock.requests()[0].param("organization"), Some("acme"));
        let msg = err.to_string();
        assert!(msg.contains("401"), "{msg}");
        assert!(!msg.contains("organization="), "query must be redacted: {msg}");
    }

    #[tokio::test]
    async fn connection_failure_is_a_transport_error() {
        let gateway = gateway_for("http://127.0.0.1:1");
        let err = gateway
            .get(&UpstreamRequest::new("/languages/list"), ResponseMode::Json)
            .await
            .unwrap_err();
        assert!(matches!(err, SonarToolsError::Transport { .. }), "{err}");
    }

    #[tokio::test]
    async fn text_mode_keeps_json_looking_bodies_as_strings() {
        let src = "{\"looks\": \"like json\"}\n";
        let mock = MockSonar::start(move |_| MockResponse::text(200, src))
            .await
            .expect("mock");
        let gateway = gateway_for(mock.base_url());

        let body = gateway
            .get(&UpstreamRequest::new("/sources/raw"), ResponseMode::Text)
            .await
            .expect("ok");
        assert_eq!(body, Value::String(src.to_string()));
    }

    #[test]
    fn decode_body_respects_content_type() {
        assert_eq!(
            decode_body("{\"a\":1}".to_string(), Some("application/json"), ResponseMode::Json),
            json!({"a": 1})
        );
        assert_eq!(
            decode_body("{\"a\":1}".to_string(), Some("text/plain"), ResponseMode::Json),
            json!("{\"a\":1}")
        );
        assert_eq!(
            decode_body("not json".to_string(), None, ResponseMode::Json),
            json!("not json")
        );
    }
}
