//! Session engine: handshake, discovery and tool invocation.
//!
//! A [`Session`] owns one transport and one correlator and walks the state
//! machine
//!
//! ```text
//! Created → Initializing → Initialized → [Discovering →] Ready → Closed
//!                 └──────────────┴──────────────┴─────────→ Failed
//! ```
//!
//! Every exchange is a blocking request/reply pair; the engine never has two
//! requests in flight. Any failure during the handshake, and a lost
//! connection at any point, move the session to `Failed`. After the
//! handshake, protocol errors, server errors and failed HTTP exchanges
//! (non-2xx status, timeout) fail only the exchange that produced them.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::correlator::Correlator;
use crate::error::{McpError, Result};
use crate::protocol::{
    InitializeParams, InitializeResult, JsonRpcNotification, JsonRpcResponse, ListPromptsResult,
    ListResourcesResult, ListToolsResult, Message, PromptInfo, ResourceInfo, ToolInfo, ToolResult,
    ToolSpec, methods,
};
use crate::transport::McpTransport;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport open, nothing sent.
    Created,
    /// `initialize` sent, awaiting the reply.
    Initializing,
    /// Handshake complete.
    Initialized,
    /// Listing tools, resources and prompts.
    Discovering,
    /// Ready to invoke tools.
    Ready,
    /// Finished cleanly.
    Closed,
    /// Aborted by a handshake or transport failure.
    Failed,
}

impl SessionState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Initializing => "initializing",
            Self::Initialized => "initialized",
            Self::Discovering => "discovering",
            Self::Ready => "ready",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Direction of a message relative to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client to server.
    Outbound,
    /// Server to client.
    Inbound,
}

/// Observer for every protocol message a session sends or receives.
pub trait MessageTap: Send {
    /// Called once per message, in wire order.
    fn observe(&mut self, direction: Direction, message: &Message);
}

impl<F> MessageTap for F
where
    F: FnMut(Direction, &Message) + Send,
{
    fn observe(&mut self, direction: Direction, message: &Message) {
        self(direction, message)
    }
}

/// Outcome of one capability listing. Listings fail independently.
pub type Listing<T> = std::result::Result<Vec<T>, McpError>;

/// Capabilities advertised by the server.
#[derive(Debug)]
pub struct Discovery {
    /// Result of `tools/list`.
    pub tools: Listing<ToolInfo>,
    /// Result of `resources/list`.
    pub resources: Listing<ResourceInfo>,
    /// Result of `prompts/list`.
    pub prompts: Listing<PromptInfo>,
}

impl Discovery {
    /// Number of tools discovered; zero if the listing failed.
    pub fn tool_count(&self) -> usize {
        self.tools.as_ref().map_or(0, Vec::len)
    }
}

/// An MCP session over a single transport.
pub struct Session {
    transport: McpTransport,
    correlator: Correlator,
    state: SessionState,
    server: Option<InitializeResult>,
    tap: Option<Box<dyn MessageTap>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport)
            .field("correlator", &self.correlator)
            .field("state", &self.state)
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session over an open transport.
    pub fn new(transport: McpTransport) -> Self {
        Self {
            transport,
            correlator: Correlator::new(),
            state: SessionState::Created,
            server: None,
            tap: None,
        }
    }

    /// Attach an observer that sees every message sent and received.
    pub fn with_tap(mut self, tap: impl MessageTap + 'static) -> Self {
        self.tap = Some(Box::new(tap));
        self
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The underlying transport.
    pub fn transport(&self) -> &McpTransport {
        &self.transport
    }

    /// Server's `initialize` result, once the handshake succeeded.
    pub fn server(&self) -> Option<&InitializeResult> {
        self.server.as_ref()
    }

    /// Number of requests sent so far.
    pub fn requests_sent(&self) -> u64 {
        self.correlator.issued()
    }

    /// Perform the handshake: `initialize`, then `notifications/initialized`.
    ///
    /// Any failure leaves the session `Failed`; nothing further is sent.
    pub fn initialize(&mut self) -> Result<&InitializeResult> {
        self.require(&[SessionState::Created], "initialize")?;
        self.state = SessionState::Initializing;

        let result = match self.handshake() {
            Ok(result) => result,
            Err(e) => return Err(self.fail(e)),
        };

        tracing::info!(
            server = result.server_info.as_ref().map_or("unknown", |s| s.name.as_str()),
            version = result.server_info.as_ref().map_or("", |s| s.version.as_str()),
            protocol = result.protocol_version.as_deref().unwrap_or("unspecified"),
            "MCP server initialized"
        );

        let notification = JsonRpcNotification::new(methods::INITIALIZED, None);
        self.observe(Direction::Outbound, || {
            Message::Notification(notification.clone())
        });
        if let Err(e) = self.transport.send_notification(&notification) {
            return Err(self.fail(e));
        }

        self.state = SessionState::Initialized;
        Ok(&*self.server.insert(result))
    }

    fn handshake(&mut self) -> Result<InitializeResult> {
        let params = serde_json::to_value(InitializeParams::default())?;
        let response = self.request(methods::INITIALIZE, Some(params))?;

        if let Some(error) = response.error {
            return Err(McpError::Initialization(format!(
                "server rejected initialize: {} (code {})",
                error.message, error.code
            )));
        }
        let result = response
            .result
            .ok_or_else(|| McpError::Initialization("initialize reply has no result".to_string()))?;
        serde_json::from_value(result)
            .map_err(|e| McpError::Initialization(format!("malformed initialize result: {}", e)))
    }

    /// List tools, resources and prompts, in that order.
    ///
    /// A failed listing is recorded in the returned [`Discovery`] and the
    /// next one is still attempted. Only a lost connection aborts the
    /// session.
    pub fn discover(&mut self) -> Result<Discovery> {
        self.require(&[SessionState::Initialized], "discover capabilities")?;
        self.state = SessionState::Discovering;

        let tools = self.listing(methods::TOOLS_LIST, |r: ListToolsResult| r.tools)?;
        let resources =
            self.listing(methods::RESOURCES_LIST, |r: ListResourcesResult| r.resources)?;
        let prompts = self.listing(methods::PROMPTS_LIST, |r: ListPromptsResult| r.prompts)?;

        let discovery = Discovery {
            tools,
            resources,
            prompts,
        };
        tracing::debug!(
            tools = discovery.tool_count(),
            resources = discovery.resources.as_ref().map_or(0, Vec::len),
            prompts = discovery.prompts.as_ref().map_or(0, Vec::len),
            "discovered MCP capabilities"
        );

        self.state = SessionState::Ready;
        Ok(discovery)
    }

    /// Move to `Ready` without discovering.
    pub fn ready(&mut self) -> Result<()> {
        self.require(
            &[SessionState::Initialized, SessionState::Ready],
            "become ready",
        )?;
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Call one tool and decode its result.
    ///
    /// A JSON-RPC error reply is [`McpError::ServerError`]; a result with
    /// `isError: true` is returned as a [`ToolResult`] with `is_error` set.
    /// Only a lost connection fails the session.
    pub fn invoke(&mut self, spec: &ToolSpec) -> Result<ToolResult> {
        self.require(&[SessionState::Ready], "invoke a tool")?;

        let outcome = serde_json::to_value(spec)
            .map_err(McpError::from)
            .and_then(|params| self.request(methods::TOOLS_CALL, Some(params)))
            .and_then(JsonRpcResponse::into_result)
            .and_then(ToolResult::from_value);

        match outcome {
            Ok(result) => {
                if result.is_error {
                    tracing::warn!(tool = %spec.name, "tool call returned error");
                } else {
                    tracing::debug!(tool = %spec.name, items = result.content.len(), "tool call succeeded");
                }
                Ok(result)
            }
            Err(e) if e.is_connection_lost() => Err(self.fail(e)),
            Err(e) => {
                tracing::warn!(tool = %spec.name, error = %e, "tool call failed");
                Err(e)
            }
        }
    }

    /// Release the transport. Idempotent and infallible.
    ///
    /// A failed session stays `Failed`; anything else becomes `Closed`.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.transport.close();
        if self.state != SessionState::Failed {
            self.state = SessionState::Closed;
        }
        tracing::debug!(state = %self.state, requests = self.correlator.issued(), "session closed");
    }

    /// Drive a whole session according to `plan`, then close it.
    pub fn run(mut self, plan: SessionPlan, reporter: &mut dyn SessionReporter) -> SessionOutcome {
        let mut outcome = SessionOutcome {
            state: SessionState::Created,
            server: None,
            discovery: None,
            invocations: Vec::new(),
            error: None,
            stderr: Vec::new(),
            reached_ready: false,
        };

        let result = self.drive(plan, reporter, &mut outcome);
        self.close();
        outcome.state = self.state;

        if let Err(e) = result {
            outcome.stderr = self.transport.stderr_lines();
            tracing::error!(state = %self.state, error = %e, "MCP session failed");
            reporter.failed(&e, &outcome.stderr);
            outcome.error = Some(e);
        }
        outcome
    }

    fn drive(
        &mut self,
        plan: SessionPlan,
        reporter: &mut dyn SessionReporter,
        outcome: &mut SessionOutcome,
    ) -> Result<()> {
        let server = self.initialize()?.clone();
        reporter.initialized(&server);
        outcome.server = Some(server);

        let discovers = plan.discovers();
        let SessionPlan {
            mut tools,
            list_only,
            interactive,
        } = plan;

        if discovers {
            let discovery = self.discover()?;
            reporter.discovered(&discovery);
            if interactive && !list_only {
                tools = match &discovery.tools {
                    Ok(catalog) if !catalog.is_empty() => reporter.select_tools(catalog),
                    Ok(_) => {
                        tracing::info!("server advertises no tools, nothing to select");
                        Vec::new()
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "tool catalog unavailable, skipping selection");
                        Vec::new()
                    }
                };
            }
            outcome.discovery = Some(discovery);
        } else {
            self.ready()?;
        }
        outcome.reached_ready = true;

        if list_only {
            return Ok(());
        }

        for spec in tools {
            reporter.tool_started(&spec);
            let result = self.invoke(&spec);
            reporter.tool_finished(&spec, &result);
            match result {
                Err(e) if e.is_connection_lost() => return Err(e),
                result => outcome.invocations.push(Invocation { spec, result }),
            }
        }
        Ok(())
    }

    fn listing<T: DeserializeOwned, U>(
        &mut self,
        method: &'static str,
        items: impl FnOnce(T) -> Vec<U>,
    ) -> Result<Listing<U>> {
        match self.list::<T>(method) {
            Ok(list) => Ok(Ok(items(list))),
            Err(e) if e.is_connection_lost() => Err(self.fail(e)),
            Err(e) => {
                tracing::warn!(method, error = %e, "capability listing failed");
                Ok(Err(e))
            }
        }
    }

    fn list<T: DeserializeOwned>(&mut self, method: &str) -> Result<T> {
        let result = self.request(method, None)?.into_result()?;
        serde_json::from_value(result)
            .map_err(|e| McpError::protocol(format!("malformed {} result: {}", method, e)))
    }

    /// One request/reply exchange through the correlator.
    fn request(&mut self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse> {
        let request = self.correlator.issue(method, params)?;
        tracing::debug!(id = request.id, method, "sending MCP request");
        self.observe(Direction::Outbound, || Message::Request(request.clone()));

        let response = match self.transport.send_request(&request) {
            Ok(response) => response,
            Err(e) => {
                self.correlator.abandon();
                return Err(e);
            }
        };

        self.observe(Direction::Inbound, || Message::Response(response.clone()));
        self.correlator
            .settle(response, self.transport.correlation())
    }

    fn observe(&mut self, direction: Direction, message: impl FnOnce() -> Message) {
        if let Some(tap) = self.tap.as_mut() {
            tap.observe(direction, &message());
        }
    }

    fn require(&self, allowed: &[SessionState], operation: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(McpError::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    fn fail(&mut self, error: McpError) -> McpError {
        tracing::debug!(from = %self.state, error = %error, "session failed");
        self.state = SessionState::Failed;
        error
    }
}

/// What a session should do after the handshake.
#[derive(Debug, Clone, Default)]
pub struct SessionPlan {
    /// Tools to invoke, in order.
    pub tools: Vec<ToolSpec>,
    /// Discover capabilities and stop.
    pub list_only: bool,
    /// Let the reporter choose tools from the discovered catalog.
    pub interactive: bool,
}

impl SessionPlan {
    /// Whether the plan needs a discovery pass.
    ///
    /// With no tools queued the session runs in discovery mode.
    pub fn discovers(&self) -> bool {
        self.list_only || self.interactive || self.tools.is_empty()
    }
}

/// Receives session progress as it happens.
///
/// Every method has a no-op default.
pub trait SessionReporter {
    /// The handshake completed.
    fn initialized(&mut self, _server: &InitializeResult) {}

    /// Discovery completed.
    fn discovered(&mut self, _discovery: &Discovery) {}

    /// Choose tools to invoke from a non-empty catalog.
    fn select_tools(&mut self, _catalog: &[ToolInfo]) -> Vec<ToolSpec> {
        Vec::new()
    }

    /// A tool call is about to be sent.
    fn tool_started(&mut self, _spec: &ToolSpec) {}

    /// A tool call finished, successfully or not.
    fn tool_finished(&mut self, _spec: &ToolSpec, _result: &Result<ToolResult>) {}

    /// The session aborted. `stderr` holds recent server error output.
    fn failed(&mut self, _error: &McpError, _stderr: &[String]) {}
}

/// A reporter that ignores everything.
impl SessionReporter for () {}

/// One completed tool call.
#[derive(Debug)]
pub struct Invocation {
    /// The call as requested.
    pub spec: ToolSpec,
    /// Decoded result or the error for this call.
    pub result: Result<ToolResult>,
}

/// Everything a finished session produced.
#[derive(Debug)]
pub struct SessionOutcome {
    /// Final state: `Closed` or `Failed`.
    pub state: SessionState,
    /// Server's `initialize` result.
    pub server: Option<InitializeResult>,
    /// Discovery results, if discovery ran.
    pub discovery: Option<Discovery>,
    /// Completed tool calls, in order.
    pub invocations: Vec<Invocation>,
    /// Error that aborted the session.
    pub error: Option<McpError>,
    /// Server stderr captured when the session aborted.
    pub stderr: Vec<String>,
    reached_ready: bool,
}

impl SessionOutcome {
    /// Whether the session got as far as `Ready`.
    ///
    /// Later transport failures do not change this.
    pub fn reached_ready(&self) -> bool {
        self.reached_ready
    }

    /// Whether the handshake succeeded.
    pub fn initialized(&self) -> bool {
        self.server.is_some()
    }
}

/// Run a session over `transport` and close it, whatever happens.
pub fn run_session(
    transport: McpTransport,
    plan: SessionPlan,
    reporter: &mut dyn SessionReporter,
) -> SessionOutcome {
    Session::new(transport).run(plan, reporter)
}
