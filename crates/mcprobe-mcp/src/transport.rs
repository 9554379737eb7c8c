//! Transport layer for MCP communication.
//!
//! Local servers are spawned as child processes and spoken to with
//! newline-delimited JSON over stdio. Remote servers are reached with one
//! HTTP POST per message. Both sit behind [`McpTransport`] so the session
//! engine never needs to know which one it is driving.

mod http;
mod stdio;

use std::collections::BTreeMap;

pub use http::{
    API_KEY_HEADER, HTTP_TIMEOUT, HttpTransport, HttpTransportConfig, SESSION_HEADER,
    headers_from_aux,
};
pub use stdio::StdioTransport;

use crate::correlator::Correlation;
use crate::error::{McpError, Result};
use crate::lifecycle::ProcessHandle;
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Message};

/// Transport for communicating with an MCP server.
pub enum McpTransport {
    /// Child process over stdin/stdout.
    Stdio(StdioTransport),
    /// HTTP POST per message.
    Http(HttpTransport),
}

impl std::fmt::Debug for McpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio(t) => f
                .debug_struct("Stdio")
                .field("pid", &t.process().pid())
                .field("command", &t.process().command())
                .finish(),
            Self::Http(t) => f.debug_struct("Http").field("url", &t.url().as_str()).finish(),
        }
    }
}

impl McpTransport {
    /// Open a transport to `address`.
    ///
    /// An `http://` or `https://` address selects the HTTP transport and
    /// `aux` is mapped onto request headers. Anything else is treated as a
    /// command line to spawn, with `aux` merged into the child environment.
    pub fn open(address: &str, aux: &BTreeMap<String, String>) -> Result<Self> {
        let address = address.trim();
        if is_http_address(address) {
            Self::connect_http(HttpTransportConfig::from_aux(address, aux))
        } else {
            Self::spawn_stdio(address, aux)
        }
    }

    /// Create a new HTTP transport.
    pub fn connect_http(config: HttpTransportConfig) -> Result<Self> {
        HttpTransport::connect(config).map(Self::Http)
    }

    /// Spawn a new stdio transport from a shell-style command line.
    pub fn spawn_stdio(command_line: &str, env: &BTreeMap<String, String>) -> Result<Self> {
        StdioTransport::spawn(command_line, env).map(Self::Stdio)
    }

    /// How replies on this transport are paired with requests.
    pub fn correlation(&self) -> Correlation {
        match self {
            Self::Stdio(_) => Correlation::Positional,
            Self::Http(_) => Correlation::Implicit,
        }
    }

    /// Send a JSON-RPC request and wait for the reply.
    ///
    /// On the stdio transport a closed stream or blank line becomes
    /// [`McpError::ConnectionClosed`].
    pub fn send_request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        match self {
            Self::Stdio(t) => {
                t.send(&Message::Request(request.clone()))?;
                t.receive()?.ok_or(McpError::ConnectionClosed)
            }
            Self::Http(t) => t.request(request),
        }
    }

    /// Send a JSON-RPC notification (no response expected).
    pub fn send_notification(&mut self, notification: &JsonRpcNotification) -> Result<()> {
        match self {
            Self::Stdio(t) => t.send(&Message::Notification(notification.clone())),
            Self::Http(t) => t.notify(notification),
        }
    }

    /// Release the transport. Never fails.
    pub fn close(&mut self) {
        match self {
            Self::Stdio(t) => t.close(),
            Self::Http(t) => tracing::debug!(url = %t.url(), "closed HTTP transport"),
        }
    }

    /// Server process handle, for the stdio transport.
    pub fn process(&self) -> Option<&ProcessHandle> {
        match self {
            Self::Stdio(t) => Some(t.process()),
            Self::Http(_) => None,
        }
    }

    /// Recent server stderr output; always empty over HTTP.
    pub fn stderr_lines(&self) -> Vec<String> {
        match self {
            Self::Stdio(t) => t.stderr_lines(),
            Self::Http(_) => Vec::new(),
        }
    }

    /// Check if the transport is still connected.
    ///
    /// HTTP is stateless and always reports connected.
    pub fn is_connected(&self) -> bool {
        match self {
            Self::Stdio(t) => t.process().is_running(),
            Self::Http(_) => true,
        }
    }

    /// Check if this is an HTTP transport.
    pub fn is_http(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    /// Check if this is a stdio transport.
    pub fn is_stdio(&self) -> bool {
        matches!(self, Self::Stdio(_))
    }
}

/// Whether `address` names an HTTP endpoint rather than a command.
pub fn is_http_address(address: &str) -> bool {
    let lower = address.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
