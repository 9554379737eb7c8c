//! Request transport: one HTTP POST per message.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::{McpError, Result};
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Message};

/// Default request timeout.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Header that carries credentials derived from `*_API_KEY` values.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Header a server may use to bind later requests to one session.
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

const API_KEY_SUFFIXES: [&str; 2] = ["_API_KEY", "_APIKEY"];

/// Configuration for HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Endpoint URL of the MCP server.
    pub url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Headers sent with every request.
    pub headers: Vec<(String, String)>,
}

impl HttpTransportConfig {
    /// Create a new HTTP transport config with the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: HTTP_TIMEOUT,
            headers: Vec::new(),
        }
    }

    /// Create a config whose headers are derived from auxiliary key/value data.
    pub fn from_aux(url: impl Into<String>, aux: &BTreeMap<String, String>) -> Self {
        Self {
            headers: headers_from_aux(aux),
            ..Self::new(url)
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// Map auxiliary key/value data onto HTTP headers.
///
/// - keys ending in `_API_KEY` or `_APIKEY` become [`API_KEY_HEADER`]
/// - a key named `AUTHORIZATION` becomes `Authorization`
/// - keys that already look like header names (`X-Tenant`) pass through
/// - anything else has no HTTP equivalent and is dropped
///
/// Matching is case-insensitive. When several keys map to the same header
/// the last key in sorted order wins and the collision is logged.
pub fn headers_from_aux(aux: &BTreeMap<String, String>) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::new();
    for (key, value) in aux {
        let upper = key.to_ascii_uppercase();
        let name = if API_KEY_SUFFIXES.iter().any(|suffix| upper.ends_with(suffix)) {
            API_KEY_HEADER
        } else if upper == "AUTHORIZATION" {
            "Authorization"
        } else if looks_like_header(key) {
            key.as_str()
        } else {
            tracing::debug!(key = %key, "no HTTP header mapping for value, ignoring");
            continue;
        };

        match headers.iter_mut().find(|(h, _)| h.eq_ignore_ascii_case(name)) {
            Some(existing) => {
                tracing::warn!(header = %name, key = %key, "header already derived from another key, overwriting");
                existing.1 = value.clone();
            }
            None => headers.push((name.to_string(), value.clone())),
        }
    }
    headers
}

fn looks_like_header(key: &str) -> bool {
    key.contains('-') && HeaderName::from_bytes(key.as_bytes()).is_ok()
}

/// Transport that POSTs each message to a fixed endpoint.
///
/// Sending a request and receiving its reply are one call: the response
/// body is the reply. Notifications are POSTed the same way and whatever
/// comes back is discarded; servers are not obliged to skip the reply.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    url: Url,
    headers: HeaderMap,
    session_id: Option<String>,
}

impl HttpTransport {
    /// Validate the endpoint and build the HTTP client.
    ///
    /// No network traffic happens until the first message.
    pub fn connect(config: HttpTransportConfig) -> Result<Self> {
        let url = Url::parse(&config.url)
            .map_err(|e| McpError::InvalidUrl(format!("'{}': {}", config.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(McpError::InvalidUrl(format!(
                "'{}': scheme must be http or https",
                config.url
            )));
        }

        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| McpError::transport(format!("invalid header name '{}': {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| McpError::transport(format!("invalid value for header '{}': {}", key, e)))?;
            if headers.insert(name.clone(), value).is_some() {
                tracing::warn!(header = %name, "header given more than once, keeping the last value");
            }
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| McpError::transport(format!("failed to build HTTP client: {}", e)))?;

        tracing::info!(
            url = %url,
            timeout_secs = config.timeout.as_secs(),
            headers = ?headers.keys().map(|k| k.as_str()).collect::<Vec<_>>(),
            "created HTTP transport"
        );

        Ok(Self {
            client,
            url,
            headers,
            session_id: None,
        })
    }

    /// Endpoint URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Headers attached to every POST.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Session id assigned by the server, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// POST a request and decode the reply from the response body.
    pub fn request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        let body = Message::Request(request.clone()).to_json()?;
        let response = self.post(body)?;
        self.remember_session(&response);

        let event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let text = response
            .text()
            .map_err(|e| McpError::transport(format!("failed to read response body: {}", e)))?;

        tracing::trace!(json = %text, "received MCP HTTP response");

        if text.trim().is_empty() {
            return Err(McpError::protocol("empty response body"));
        }
        if event_stream {
            return parse_event_stream(&text)
                .ok_or_else(|| McpError::protocol("event stream carried no JSON-RPC response"));
        }
        serde_json::from_str(&text)
            .map_err(|e| McpError::protocol(format!("invalid JSON response: {}", e)))
    }

    /// POST a notification and discard the reply.
    ///
    /// A failed POST is logged, not returned: nothing waits on a
    /// notification, and a broken endpoint surfaces on the next request.
    pub fn notify(&mut self, notification: &JsonRpcNotification) -> Result<()> {
        let body = Message::Notification(notification.clone()).to_json()?;
        match self.post(body) {
            Ok(response) => {
                self.remember_session(&response);
                tracing::trace!(status = %response.status(), "notification acknowledged");
            }
            Err(e) => {
                tracing::warn!(method = %notification.method, error = %e, "notification POST failed");
            }
        }
        Ok(())
    }

    fn post(&self, body: String) -> Result<Response> {
        tracing::trace!(url = %self.url, json = %body, "sending MCP HTTP request");

        let mut req = self
            .client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .body(body);
        if let Some(session_id) = &self.session_id {
            req = req.header(SESSION_HEADER, session_id);
        }

        let response = req.send().map_err(|e| {
            if e.is_timeout() {
                McpError::Timeout
            } else {
                McpError::transport(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(McpError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn remember_session(&mut self, response: &Response) {
        let Some(id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        else {
            return;
        };
        if self.session_id.as_deref() != Some(id) {
            tracing::debug!(session_id = %id, "server assigned MCP session");
            self.session_id = Some(id.to_string());
        }
    }
}

/// Pick the first JSON-RPC response out of a `text/event-stream` body.
fn parse_event_stream(body: &str) -> Option<JsonRpcResponse> {
    let mut data = String::new();
    for line in body.lines().chain(std::iter::once("")) {
        if line.is_empty() {
            if !data.is_empty() {
                if let Ok(response) = serde_json::from_str::<JsonRpcResponse>(&data) {
                    if response.result.is_some() || response.error.is_some() {
                        return Some(response);
                    }
                }
                data.clear();
            }
        } else if let Some(payload) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(payload.strip_prefix(' ').unwrap_or(payload));
        }
    }
    None
}
