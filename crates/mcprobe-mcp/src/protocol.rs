//! JSON-RPC 2.0 protocol types for MCP.
//!
//! MCP messages are JSON-RPC 2.0 objects, written one per line on the stream
//! transport or sent as whole HTTP bodies on the request transport.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{McpError, Result};

/// JSON-RPC version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version sent on every `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Client name reported in `clientInfo`.
pub const CLIENT_NAME: &str = "mcprobe";

/// Method names used by the session engine.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const RESOURCES_LIST: &str = "resources/list";
    pub const PROMPTS_LIST: &str = "prompts/list";
    pub const TOOLS_CALL: &str = "tools/call";
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON-RPC Base Types
// ─────────────────────────────────────────────────────────────────────────────

/// A JSON-RPC request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request ID for correlating responses.
    pub id: u64,
    /// Method name to call.
    pub method: String,
    /// Method parameters (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC notification (no id, no response expected).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Method name.
    pub method: String,
    /// Method parameters (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a new notification.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC response.
///
/// `id` is optional because servers answer unparsable requests with a null
/// id. Both `result` and `error` are optional on the wire; a well-formed
/// reply carries exactly one of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    #[serde(default)]
    pub jsonrpc: String,
    /// Request ID this response is for.
    #[serde(default)]
    pub id: Option<u64>,
    /// Result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a successful response.
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Check if this is an error response.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Get the result payload.
    ///
    /// An error object becomes [`McpError::ServerError`]; a reply with
    /// neither field becomes a protocol error.
    pub fn into_result(self) -> Result<Value> {
        if let Some(error) = self.error {
            return Err(McpError::server_error(error.code, error.message, error.data));
        }
        self.result
            .ok_or_else(|| McpError::protocol("reply has neither result nor error"))
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
    /// Optional additional data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// Standard JSON-RPC error codes
impl JsonRpcError {
    /// Invalid Request - Not a valid Request object.
    pub const INVALID_REQUEST: i64 = -32600;
    /// Method not found.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid params.
    pub const INVALID_PARAMS: i64 = -32602;
}

/// Any message that crosses the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A request expecting exactly one reply.
    Request(JsonRpcRequest),
    /// A notification; never answered.
    Notification(JsonRpcNotification),
    /// A reply to a request.
    Response(JsonRpcResponse),
}

impl Message {
    /// Serialize to single-line JSON.
    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            Self::Request(req) => serde_json::to_string(req)?,
            Self::Notification(note) => serde_json::to_string(note)?,
            Self::Response(resp) => serde_json::to_string(resp)?,
        };
        Ok(json)
    }

    /// Method name, if this is a request or notification.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(req) => Some(&req.method),
            Self::Notification(note) => Some(&note.method),
            Self::Response(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MCP Protocol Types
// ─────────────────────────────────────────────────────────────────────────────

/// Client capabilities sent during initialization.
///
/// Serializes as `{"tools": {}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientCapabilities {
    /// Tools capability (always an empty object).
    pub tools: Map<String, Value>,
}

/// Client info sent during initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: CLIENT_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version.
    pub protocol_version: String,
    /// Client capabilities.
    pub capabilities: ClientCapabilities,
    /// Client info.
    pub client_info: ClientInfo,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo::default(),
        }
    }
}

/// Server info returned during initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    #[serde(default)]
    pub version: String,
}

/// Result of the initialize request.
///
/// Every field is optional: any `result` object completes the handshake.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol version chosen by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    /// Server capabilities, kept raw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Value>,
    /// Server info.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_info: Option<ServerInfo>,
    /// Free-form usage instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// A tool definition from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    /// Tool name (unique identifier).
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl ToolInfo {
    /// Names of the schema's properties, required ones first.
    ///
    /// Returns `(name, description, required)` triples.
    pub fn parameters(&self) -> Vec<(String, Option<String>, bool)> {
        let Some(schema) = self.input_schema.as_ref() else {
            return Vec::new();
        };
        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return Vec::new();
        };
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let describe = |name: &str| {
            properties
                .get(name)
                .and_then(|p| p.get("description"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let mut params: Vec<_> = required
            .iter()
            .map(|name| (name.to_string(), describe(name), true))
            .collect();
        params.extend(
            properties
                .keys()
                .filter(|name| !required.contains(&name.as_str()))
                .map(|name| (name.clone(), describe(name), false)),
        );
        params
    }
}

/// Result of the tools/list request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// List of available tools.
    pub tools: Vec<ToolInfo>,
}

/// A resource descriptor from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    /// Resource URI.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Result of the resources/list request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResourcesResult {
    /// List of available resources.
    pub resources: Vec<ResourceInfo>,
}

/// An argument accepted by a prompt template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the argument must be supplied.
    #[serde(default)]
    pub required: bool,
}

/// A prompt descriptor from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptInfo {
    /// Prompt name.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Template arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<PromptArgument>,
}

/// Result of the prompts/list request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPromptsResult {
    /// List of available prompts.
    pub prompts: Vec<PromptInfo>,
}

/// A tool to invoke: its name and argument mapping.
///
/// Serializes directly as the `tools/call` params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments to pass to the tool.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolSpec {
    /// Create a tool spec with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
        }
    }

    /// Add an argument.
    pub fn with_argument(mut self, key: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }
}

/// Content item in a tool result.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    /// Text content.
    Text(String),
    /// Image content, decoded from base64.
    Image {
        /// Raw image bytes.
        data: Vec<u8>,
        /// MIME type of the image.
        mime_type: String,
    },
    /// Resource reference.
    Resource {
        /// Resource URI.
        uri: String,
    },
    /// Any item this client does not understand, kept verbatim.
    Unknown(Value),
}

impl ContentItem {
    /// Decode one entry of a `content` array.
    ///
    /// Never fails: anything unrecognised, including images whose data is
    /// not valid base64, is kept as [`ContentItem::Unknown`].
    pub fn from_value(raw: Value) -> Self {
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match kind.as_str() {
            "text" => {
                let text = raw.get("text").and_then(Value::as_str).unwrap_or_default();
                Self::Text(text.to_string())
            }
            "image" => {
                let decoded = raw
                    .get("data")
                    .and_then(Value::as_str)
                    .and_then(|data| BASE64.decode(data).ok());
                match decoded {
                    Some(data) => Self::Image {
                        data,
                        mime_type: raw
                            .get("mimeType")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown")
                            .to_string(),
                    },
                    None => Self::Unknown(raw),
                }
            }
            "resource" => {
                let uri = raw
                    .get("resource")
                    .and_then(|r| r.get("uri"))
                    .or_else(|| raw.get("uri"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                match uri {
                    Some(uri) => Self::Resource { uri },
                    None => Self::Unknown(raw),
                }
            }
            _ => Self::Unknown(raw),
        }
    }

    /// Encode back into the wire shape.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(text) => json!({ "type": "text", "text": text }),
            Self::Image { data, mime_type } => json!({
                "type": "image",
                "data": BASE64.encode(data),
                "mimeType": mime_type,
            }),
            Self::Resource { uri } => json!({ "type": "resource", "resource": { "uri": uri } }),
            Self::Unknown(raw) => raw.clone(),
        }
    }

    /// Short label for the item kind.
    pub fn kind(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::Image { .. } => "image",
            Self::Resource { .. } => "resource",
            Self::Unknown(raw) => raw.get("type").and_then(Value::as_str).unwrap_or("unknown"),
        }
    }
}

/// Result of the tools/call request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolResult {
    /// Whether the tool reported a failure.
    pub is_error: bool,
    /// Content returned by the tool, in order.
    pub content: Vec<ContentItem>,
}

impl ToolResult {
    /// Decode the `result` payload of a `tools/call` reply.
    pub fn from_value(result: Value) -> Result<Self> {
        let Value::Object(mut fields) = result else {
            return Err(McpError::protocol("tools/call result is not an object"));
        };

        let is_error = match fields.remove("isError") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => flag,
            Some(other) => {
                return Err(McpError::protocol(format!(
                    "tools/call isError is not a boolean: {}",
                    other
                )));
            }
        };

        let content = match fields.remove("content") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.into_iter().map(ContentItem::from_value).collect(),
            Some(_) => return Err(McpError::protocol("tools/call content is not an array")),
        };

        Ok(Self { is_error, content })
    }

    /// Encode back into the wire shape.
    pub fn to_value(&self) -> Value {
        json!({
            "isError": self.is_error,
            "content": self.content.iter().map(ContentItem::to_value).collect::<Vec<_>>(),
        })
    }

    /// Get the text content from the result.
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|c| match c {
                ContentItem::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = JsonRpcRequest::new(1, "initialize", Some(json!({"test": true})));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"initialize\""));
    }

    #[test]
    fn test_notification_has_no_id() {
        let note = JsonRpcNotification::new(methods::INITIALIZED, None);
        let json = Message::Notification(note).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#
        );
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{"jsonrpc":"2.0","id":1,"result":{"value":42}}"#;
        let resp: JsonRpcResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.id, Some(1));
        assert_eq!(resp.into_result().unwrap(), json!({"value": 42}));
    }

    #[test]
    fn test_error_response() {
        let json =
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32600,"message":"Invalid Request"}}"#;
        let resp: JsonRpcResponse = serde_json::from_str(json).unwrap();
        assert!(resp.is_error());
        assert_eq!(resp.id, None);
        match resp.into_result() {
            Err(McpError::ServerError { code, .. }) => {
                assert_eq!(code, JsonRpcError::INVALID_REQUEST)
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[test]
    fn test_response_without_result_or_error() {
        let resp: JsonRpcResponse = serde_json::from_str(r#"{"jsonrpc":"2.0","id":4}"#).unwrap();
        assert!(matches!(resp.into_result(), Err(McpError::Protocol(_))));
    }

    #[test]
    fn test_initialize_params() {
        let params = serde_json::to_value(InitializeParams::default()).unwrap();
        assert_eq!(params["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(params["capabilities"], json!({"tools": {}}));
        assert_eq!(params["clientInfo"]["name"], CLIENT_NAME);
    }

    #[test]
    fn test_initialize_result_is_lenient() {
        let result: InitializeResult = serde_json::from_value(json!({})).unwrap();
        assert!(result.server_info.is_none());

        let result: InitializeResult = serde_json::from_value(json!({
            "protocolVersion": "2025-06-18",
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "echo-server", "version": "0.1.0"}
        }))
        .unwrap();
        assert_eq!(result.server_info.unwrap().name, "echo-server");
    }

    #[test]
    fn test_tool_info_parameters_required_first() {
        let tool: ToolInfo = serde_json::from_value(json!({
            "name": "geocode",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "region": {"type": "string"},
                    "address": {"type": "string", "description": "Street address"}
                },
                "required": ["address"]
            }
        }))
        .unwrap();

        let params = tool.parameters();
        assert_eq!(params.len(), 2);
        assert_eq!(
            params[0],
            ("address".to_string(), Some("Street address".to_string()), true)
        );
        assert_eq!(params[1], ("region".to_string(), None, false));
    }

    #[test]
    fn test_tool_spec_serializes_as_call_params() {
        let spec = ToolSpec::new("add")
            .with_argument("a", json!(2))
            .with_argument("b", json!(3));
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({"name": "add", "arguments": {"a": 2, "b": 3}})
        );

        let parsed: ToolSpec = serde_json::from_str(r#"{"name":"ping"}"#).unwrap();
        assert!(parsed.arguments.is_empty());
    }

    #[test]
    fn test_content_items() {
        let items = [
            json!({"type": "text", "text": "5"}),
            json!({"type": "image", "data": "aGk=", "mimeType": "image/png"}),
            json!({"type": "resource", "resource": {"uri": "file:///tmp/a.txt", "text": "a"}}),
            json!({"type": "image", "data": "%%%"}),
            json!({"type": "audio", "data": "..."}),
        ];
        let decoded: Vec<_> = items.into_iter().map(ContentItem::from_value).collect();

        assert_eq!(decoded[0], ContentItem::Text("5".into()));
        assert_eq!(
            decoded[1],
            ContentItem::Image {
                data: b"hi".to_vec(),
                mime_type: "image/png".into()
            }
        );
        assert_eq!(
            decoded[2],
            ContentItem::Resource {
                uri: "file:///tmp/a.txt".into()
            }
        );
        assert!(matches!(decoded[3], ContentItem::Unknown(_)));
        assert_eq!(decoded[4].kind(), "audio");
    }

    #[test]
    fn test_tool_result() {
        let result = ToolResult::from_value(json!({
            "content": [{"type": "text", "text": "5"}],
            "isError": false
        }))
        .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.text(), Some("5".to_string()));

        let result = ToolResult::from_value(json!({"isError": true})).unwrap();
        assert!(result.is_error);
        assert!(result.content.is_empty());
        assert_eq!(result.text(), None);
    }

    #[test]
    fn test_tool_result_rejects_malformed_payloads() {
        assert!(ToolResult::from_value(json!("nope")).is_err());
        assert!(ToolResult::from_value(json!({"content": "text"})).is_err());
        assert!(ToolResult::from_value(json!({"isError": "yes"})).is_err());
    }
}
