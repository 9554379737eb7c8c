//! MCP (Model Context Protocol) session engine for mcprobe.
//!
//! This crate drives a single MCP server through the handshake, capability
//! discovery and tool invocation, over either a spawned child process or
//! an HTTP endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Session                                                    │
//! │  - initialize → notifications/initialized                   │
//! │  - tools/list, resources/list, prompts/list                 │
//! │  - tools/call, one at a time                                │
//! └─────────────────────────────────────────────────────────────┘
//!              │                                  │
//!              ▼                                  ▼
//! ┌───────────────────────────┐   ┌─────────────────────────────┐
//! │  Correlator               │   │  McpTransport               │
//! │  - ids from 1, one        │   │  - Stdio: newline JSON      │
//! │    outstanding request    │   │  - Http: one POST / message │
//! └───────────────────────────┘   └─────────────────────────────┘
//!                                                 │
//!                                                 ▼
//!                                 ┌─────────────────────────────┐
//!                                 │  ProcessHandle              │
//!                                 │  - SIGTERM, grace, kill     │
//!                                 └─────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::collections::BTreeMap;
//! use mcprobe_mcp::{McpTransport, SessionPlan, ToolSpec, run_session};
//! use serde_json::json;
//!
//! let transport = McpTransport::open("python calculator.py", &BTreeMap::new())?;
//! let plan = SessionPlan {
//!     tools: vec![ToolSpec::new("add").with_argument("a", json!(2)).with_argument("b", json!(3))],
//!     ..Default::default()
//! };
//! let outcome = run_session(transport, plan, &mut ());
//! for call in &outcome.invocations {
//!     println!("{}: {:?}", call.spec.name, call.result);
//! }
//! ```
//!
//! # Wire format
//!
//! Over stdio every message is one line of JSON:
//!
//! ```text
//! {"jsonrpc":"2.0","id":1,"method":"initialize","params":{...}}\n
//! ```
//!
//! Over HTTP every message is the body of its own POST and the reply is the
//! response body.

pub mod correlator;
pub mod error;
pub mod lifecycle;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-export main types
pub use correlator::{Correlation, Correlator};
pub use error::{McpError, Result};
pub use lifecycle::{ProcessHandle, TERMINATION_GRACE};
pub use protocol::{
    ContentItem, InitializeParams, InitializeResult, JsonRpcError, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION, Message, PromptInfo, ResourceInfo,
    ServerInfo, ToolInfo, ToolResult, ToolSpec,
};
pub use session::{
    Direction, Discovery, Invocation, Listing, MessageTap, Session, SessionOutcome, SessionPlan,
    SessionReporter, SessionState, run_session,
};
pub use transport::{HttpTransportConfig, McpTransport, is_http_address};
