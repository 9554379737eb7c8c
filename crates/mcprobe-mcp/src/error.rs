//! Error types for MCP sessions.

use thiserror::Error;

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Error type for MCP operations.
///
/// Variants fall into four families: transport failures (the channel to the
/// server is unusable), protocol failures (a reply could not be understood),
/// initialization failures (the handshake did not complete) and server
/// errors (the server answered a request with a JSON-RPC error object).
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to spawn the MCP server process.
    #[error("failed to spawn MCP server: {0}")]
    SpawnFailed(String),

    /// The server command line could not be split into words.
    #[error("invalid server command: {0}")]
    InvalidCommand(String),

    /// The server address is not an absolute HTTP(S) URL.
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    /// Failed to communicate with the MCP server.
    #[error("transport error: {0}")]
    Transport(String),

    /// The HTTP endpoint answered with a non-success status.
    #[error("HTTP error {status}: {body}")]
    HttpStatus {
        /// Status code returned by the endpoint.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Timeout waiting for an HTTP response.
    #[error("timeout waiting for response")]
    Timeout,

    /// IO error on the server's standard streams.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server closed its output stream or sent an empty line.
    #[error("connection closed")]
    ConnectionClosed,

    /// A reply could not be decoded or lacked an expected field.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A stream reply carried an id other than the one just sent.
    #[error("reply id mismatch: expected {expected}, got {actual}")]
    IdMismatch {
        /// Id of the outstanding request.
        expected: u64,
        /// Id found in the reply, rendered for display.
        actual: String,
    },

    /// The initialize handshake failed.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Server returned an error response.
    #[error("server error {code}: {message}")]
    ServerError {
        /// Error code from the server.
        code: i64,
        /// Error message from the server.
        message: String,
        /// Optional additional data.
        data: Option<serde_json::Value>,
    },

    /// An operation was attempted in a session state that does not allow it.
    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// Display form of the current state.
        state: String,
    },
}

impl McpError {
    /// Create a spawn failed error.
    pub fn spawn_failed(msg: impl Into<String>) -> Self {
        Self::SpawnFailed(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a server error from an error response.
    pub fn server_error(
        code: i64,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self::ServerError {
            code,
            message: message.into(),
            data,
        }
    }

    /// Whether this error means the channel to the server failed.
    ///
    /// Transport failures end the session; protocol and server errors only
    /// fail the exchange that produced them.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::SpawnFailed(_)
                | Self::InvalidCommand(_)
                | Self::InvalidUrl(_)
                | Self::Transport(_)
                | Self::HttpStatus { .. }
                | Self::Timeout
                | Self::Io(_)
                | Self::ConnectionClosed
        )
    }

    /// Whether the channel itself is gone: the server process closed its
    /// output or a pipe broke.
    ///
    /// Other transport errors, such as a non-2xx reply, a timeout or a
    /// refused connection, belong to a single HTTP exchange; the next POST
    /// may still succeed.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ConnectionClosed)
    }

    /// Whether this error is a protocol-level decoding failure.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::IdMismatch { .. })
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = McpError::spawn_failed("command not found");
        assert!(err.to_string().contains("spawn"));
        assert!(err.to_string().contains("command not found"));

        let err = McpError::server_error(-32600, "Invalid Request", None);
        assert!(err.to_string().contains("-32600"));
        assert!(err.to_string().contains("Invalid Request"));

        let err = McpError::IdMismatch {
            expected: 3,
            actual: "7".to_string(),
        };
        assert_eq!(err.to_string(), "reply id mismatch: expected 3, got 7");
    }

    #[test]
    fn test_json_error_becomes_protocol_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let mcp_err: McpError = json_err.into();
        assert!(matches!(mcp_err, McpError::Protocol(_)));
        assert!(mcp_err.is_protocol());
        assert!(!mcp_err.is_transport());
    }

    #[test]
    fn test_io_error_is_transport() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let mcp_err: McpError = io_err.into();
        assert!(matches!(mcp_err, McpError::Io(_)));
        assert!(mcp_err.is_transport());
    }

    #[test]
    fn test_classification() {
        assert!(McpError::HttpStatus {
            status: 500,
            body: String::new()
        }
        .is_transport());
        assert!(McpError::ConnectionClosed.is_transport());
        assert!(!McpError::server_error(-1, "boom", None).is_transport());
        assert!(!McpError::Initialization("no result".into()).is_transport());
    }

    #[test]
    fn test_connection_lost_is_narrower_than_transport() {
        assert!(McpError::ConnectionClosed.is_connection_lost());
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        assert!(McpError::from(io_err).is_connection_lost());

        let status = McpError::HttpStatus {
            status: 503,
            body: "busy".to_string(),
        };
        assert!(status.is_transport());
        assert!(!status.is_connection_lost());
        assert!(!McpError::Timeout.is_connection_lost());
        assert!(!McpError::transport("connection refused").is_connection_lost());
        assert!(!McpError::server_error(-1, "boom", None).is_connection_lost());
    }
}
