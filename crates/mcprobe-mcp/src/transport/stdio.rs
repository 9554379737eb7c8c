//! Stream transport: a spawned server speaking newline-delimited JSON.

use std::collections::{BTreeMap, VecDeque};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::process::{ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{McpError, Result};
use crate::lifecycle::{ProcessHandle, TERMINATION_GRACE};
use crate::protocol::{JsonRpcResponse, Message};

/// Number of server stderr lines kept for diagnostics.
const STDERR_TAIL_LINES: usize = 200;

/// Transport over a child process's standard streams.
///
/// Each outbound message is one line of JSON on the child's stdin, flushed
/// immediately. Each reply is the next line on its stdout. The child
/// handles one message at a time, so replies arrive in request order.
pub struct StdioTransport {
    process: ProcessHandle,
    stdin: Option<BufWriter<ChildStdin>>,
    stdout: BufReader<ChildStdout>,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    line: String,
}

impl StdioTransport {
    /// Spawn a server from a shell-style command line.
    ///
    /// `env` is layered over the current environment.
    pub fn spawn(command_line: &str, env: &BTreeMap<String, String>) -> Result<Self> {
        let words = shlex::split(command_line).ok_or_else(|| {
            McpError::InvalidCommand(format!("unbalanced quoting in '{}'", command_line))
        })?;
        let (program, args) = words
            .split_first()
            .ok_or_else(|| McpError::InvalidCommand("empty command".to_string()))?;
        Self::spawn_program(program, args, env)
    }

    /// Spawn a server from an already split program and arguments.
    pub fn spawn_program(
        program: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| McpError::spawn_failed(format!("failed to spawn '{}': {}", program, e)))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let display = std::iter::once(program)
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        let process = ProcessHandle::new(child, display);

        let (Some(stdin), Some(stdout), Some(stderr)) = (stdin, stdout, stderr) else {
            process.terminate(TERMINATION_GRACE);
            return Err(McpError::spawn_failed("failed to capture server stdio"));
        };

        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        if let Err(e) = drain_stderr(stderr, Arc::clone(&stderr_tail), process.pid()) {
            process.terminate(TERMINATION_GRACE);
            return Err(McpError::spawn_failed(format!(
                "failed to start stderr reader: {}",
                e
            )));
        }

        tracing::info!(
            pid = process.pid(),
            command = %process.command(),
            env_keys = ?env.keys().collect::<Vec<_>>(),
            "spawned MCP server"
        );

        Ok(Self {
            process,
            stdin: Some(BufWriter::new(stdin)),
            stdout: BufReader::new(stdout),
            stderr_tail,
            line: String::with_capacity(4096),
        })
    }

    /// Write one message as a single JSON line and flush.
    pub fn send(&mut self, message: &Message) -> Result<()> {
        let json = message.to_json()?;
        let stdin = self.stdin.as_mut().ok_or(McpError::ConnectionClosed)?;

        stdin.write_all(json.as_bytes())?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;

        tracing::trace!(pid = self.process.pid(), json = %json, "sent MCP message");
        Ok(())
    }

    /// Block until the next line of output.
    ///
    /// Returns `None` when the stream has closed or the line is blank.
    /// A line that is not a JSON-RPC response is a protocol error.
    pub fn receive(&mut self) -> Result<Option<JsonRpcResponse>> {
        self.line.clear();
        let bytes_read = self.stdout.read_line(&mut self.line)?;
        let trimmed = self.line.trim();

        if bytes_read == 0 || trimmed.is_empty() {
            let eof = bytes_read == 0;
            tracing::debug!(pid = self.process.pid(), eof, "no reply from MCP server");
            return Ok(None);
        }

        tracing::trace!(pid = self.process.pid(), json = %trimmed, "received MCP message");

        serde_json::from_str(trimmed).map(Some).map_err(|e| {
            McpError::protocol(format!("invalid JSON from server: {}: {}", e, trimmed))
        })
    }

    /// Handle to the server process.
    pub fn process(&self) -> &ProcessHandle {
        &self.process
    }

    /// Most recent lines the server wrote to stderr.
    pub fn stderr_lines(&self) -> Vec<String> {
        self.stderr_tail.lock().iter().cloned().collect()
    }

    /// Close stdin and stop the server.
    pub fn close(&mut self) {
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.flush();
        }
        self.process.terminate(TERMINATION_GRACE);
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read the server's stderr on a background thread.
///
/// Lines are logged and the most recent ones kept; stderr output is never
/// treated as an error.
fn drain_stderr(
    stderr: ChildStderr,
    tail: Arc<Mutex<VecDeque<String>>>,
    pid: u32,
) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name(format!("mcp-stderr-{}", pid))
        .spawn(move || {
            for line in BufReader::new(stderr).lines() {
                let Ok(line) = line else { break };
                tracing::debug!(pid, line = %line, "MCP server stderr");
                let mut tail = tail.lock();
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        })
        .map(|_| ())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::protocol::{JsonRpcNotification, JsonRpcRequest};
    use std::time::{Duration, Instant};

    fn no_env() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    #[test]
    fn test_spawn_nonexistent_command() {
        let result = StdioTransport::spawn("nonexistent-mcp-server-12345 --flag", &no_env());
        match result {
            Ok(_) => panic!("Expected spawn to fail"),
            Err(err) => assert!(matches!(err, McpError::SpawnFailed(_))),
        }
    }

    #[test]
    fn test_spawn_invalid_command_syntax() {
        let result = StdioTransport::spawn("server --name 'unterminated", &no_env());
        assert!(matches!(result, Err(McpError::InvalidCommand(_))));

        let result = StdioTransport::spawn("   ", &no_env());
        assert!(matches!(result, Err(McpError::InvalidCommand(_))));
    }

    #[test]
    fn test_cat_echoes_lines() {
        let mut transport = StdioTransport::spawn("cat", &no_env()).expect("cat should spawn");

        let request = JsonRpcRequest::new(1, "tools/list", None);
        transport.send(&Message::Request(request)).unwrap();

        // cat echoes the request back; it parses as a response with id 1 and no result
        let echoed = transport.receive().unwrap().expect("a line");
        assert_eq!(echoed.id, Some(1));
        assert!(echoed.result.is_none());

        transport.close();
        assert!(!transport.process().is_running());
    }

    #[test]
    fn test_notification_is_one_line() {
        let mut transport = StdioTransport::spawn("cat", &no_env()).unwrap();
        let note = JsonRpcNotification::new("notifications/initialized", None);
        transport.send(&Message::Notification(note)).unwrap();

        let mut line = String::new();
        transport.stdout.read_line(&mut line).unwrap();
        assert_eq!(
            line,
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n"
        );
        transport.close();
    }

    #[test]
    fn test_invalid_json_is_protocol_error() {
        let mut transport =
            StdioTransport::spawn("sh -c 'echo \"not json\"; sleep 5'", &no_env()).unwrap();
        let err = transport.receive().unwrap_err();
        assert!(err.is_protocol(), "unexpected error: {err}");
        transport.close();
    }

    #[test]
    fn test_eof_yields_none() {
        let mut transport = StdioTransport::spawn("true", &no_env()).unwrap();
        assert!(transport.receive().unwrap().is_none());
        transport.close();
    }

    #[test]
    fn test_env_is_passed_to_child() {
        let mut env = BTreeMap::new();
        env.insert("MCPROBE_TEST_VALUE".to_string(), "42".to_string());
        let mut transport = StdioTransport::spawn(
            r#"sh -c 'echo "{\"jsonrpc\":\"2.0\",\"id\":$MCPROBE_TEST_VALUE,\"result\":{}}"'"#,
            &env,
        )
        .unwrap();

        let reply = transport.receive().unwrap().expect("a reply");
        assert_eq!(reply.id, Some(42));
        transport.close();
    }

    #[test]
    fn test_stderr_is_captured() {
        let mut transport =
            StdioTransport::spawn("sh -c 'echo boom >&2; sleep 5'", &no_env()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while transport.stderr_lines().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(transport.stderr_lines(), vec!["boom".to_string()]);
        transport.close();
    }

    #[test]
    fn test_send_after_close_fails() {
        let mut transport = StdioTransport::spawn("cat", &no_env()).unwrap();
        transport.close();
        let request = JsonRpcRequest::new(1, "tools/list", None);
        assert!(matches!(
            transport.send(&Message::Request(request)),
            Err(McpError::ConnectionClosed)
        ));
    }
}
