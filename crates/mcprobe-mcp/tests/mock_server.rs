//! Mock MCP server for integration testing.
//!
//! Speaks newline-delimited JSON-RPC on stdin/stdout and answers
//! initialize, tools/list, resources/list, prompts/list and tools/call.
//!
//! Usage:
//!   mock-mcp-server [--fail-initialize] [--no-tools] [--garbage-on METHOD]
//!                   [--crash-on TOOL] [--exit-on METHOD] [--ignore-term]
//!                   [--log-to-stderr]
//!                   [--record PATH]
//!
//! Options:
//!   --fail-initialize   Answer initialize with neither result nor error
//!   --no-tools          Advertise an empty tool list
//!   --garbage-on M      Answer method M with a line that is not JSON
//!   --crash-on TOOL     Exit with code 1 when TOOL is called
//!   --exit-on METHOD    Exit with code 1 when METHOD is requested
//!   --ignore-term       Ignore SIGTERM so only a kill stops the server
//!   --log-to-stderr     Write a line to stderr for every message received
//!   --record PATH       Append every received line to PATH

use std::env;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};

use mcprobe_mcp::{JsonRpcError, JsonRpcResponse};
use serde_json::{Value, json};

/// Server configuration parsed from command line.
#[derive(Default)]
struct ServerConfig {
    fail_initialize: bool,
    no_tools: bool,
    garbage_on: Option<String>,
    crash_on: Option<String>,
    exit_on: Option<String>,
    ignore_term: bool,
    log_to_stderr: bool,
    record: Option<String>,
}

impl ServerConfig {
    fn from_args() -> Self {
        let mut config = Self::default();
        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--fail-initialize" => config.fail_initialize = true,
                "--no-tools" => config.no_tools = true,
                "--garbage-on" => config.garbage_on = args.next(),
                "--crash-on" => config.crash_on = args.next(),
                "--exit-on" => config.exit_on = args.next(),
                "--ignore-term" => config.ignore_term = true,
                "--log-to-stderr" => config.log_to_stderr = true,
                "--record" => config.record = args.next(),
                _ => {}
            }
        }
        config
    }
}

fn main() {
    let config = ServerConfig::from_args();

    #[cfg(unix)]
    if config.ignore_term {
        // SAFETY: installing SIG_IGN for SIGTERM has no preconditions.
        unsafe {
            libc::signal(libc::SIGTERM, libc::SIG_IGN);
        }
    }

    let mut record = config.record.as_ref().map(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap()
    });

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    for line in BufReader::new(stdin.lock()).lines() {
        let Ok(line) = line else { return };
        if line.trim().is_empty() {
            continue;
        }

        if let Some(file) = record.as_mut() {
            writeln!(file, "{}", line).unwrap();
            file.flush().unwrap();
        }
        if config.log_to_stderr {
            eprintln!("mock-mcp-server received: {}", line);
        }

        let message: Value = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(_) => continue,
        };
        let method = message.get("method").and_then(Value::as_str).unwrap_or("");

        // Notifications carry no id and get no reply
        let Some(id) = message.get("id").cloned() else {
            continue;
        };

        if config.exit_on.as_deref() == Some(method) {
            eprintln!("mock-mcp-server exiting on {}", method);
            std::process::exit(1);
        }

        if config.garbage_on.as_deref() == Some(method) {
            writeln!(stdout, "this is not json").unwrap();
            stdout.flush().unwrap();
            continue;
        }

        let reply = handle_request(&id, method, message.get("params"), &config);
        writeln!(stdout, "{}", reply).unwrap();
        stdout.flush().unwrap();
    }
}

fn handle_request(id: &Value, method: &str, params: Option<&Value>, config: &ServerConfig) -> Value {
    let result = match method {
        "initialize" if config.fail_initialize => {
            return json!({ "jsonrpc": "2.0", "id": id });
        }
        "initialize" => json!({
            "protocolVersion": "2025-06-18",
            "capabilities": { "tools": {}, "resources": {}, "prompts": {} },
            "serverInfo": { "name": "mock-mcp-server", "version": "1.0.0" }
        }),
        "tools/list" if config.no_tools => json!({ "tools": [] }),
        "tools/list" => json!({
            "tools": [
                {
                    "name": "echo",
                    "description": "Echo back the input",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string", "description": "Text to echo" }
                        },
                        "required": ["message"]
                    }
                },
                {
                    "name": "add",
                    "description": "Add two numbers",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "a": { "type": "number" },
                            "b": { "type": "number" }
                        },
                        "required": ["a", "b"]
                    }
                },
                {
                    "name": "logo",
                    "description": "Return a tiny image",
                    "inputSchema": { "type": "object", "properties": {} }
                },
                {
                    "name": "crash",
                    "description": "Crashes the server (for testing)",
                    "inputSchema": { "type": "object", "properties": {} }
                }
            ]
        }),
        "resources/list" => json!({
            "resources": [
                { "uri": "file:///readme.md", "name": "readme", "mimeType": "text/markdown" }
            ]
        }),
        "prompts/list" => json!({
            "prompts": [
                {
                    "name": "greet",
                    "description": "Say hello",
                    "arguments": [ { "name": "who", "required": true } ]
                }
            ]
        }),
        "tools/call" => {
            let tool = params
                .and_then(|p| p.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("");
            let args = params
                .and_then(|p| p.get("arguments"))
                .cloned()
                .unwrap_or(json!({}));

            if config.crash_on.as_deref() == Some(tool) || tool == "crash" {
                std::process::exit(1);
            }

            match tool {
                "echo" => {
                    let message = args.get("message").and_then(Value::as_str).unwrap_or("");
                    json!({ "content": [ { "type": "text", "text": message } ], "isError": false })
                }
                "add" => {
                    let a = args.get("a").and_then(Value::as_f64).unwrap_or(0.0);
                    let b = args.get("b").and_then(Value::as_f64).unwrap_or(0.0);
                    json!({ "content": [ { "type": "text", "text": format!("{}", a + b) } ], "isError": false })
                }
                "logo" => json!({
                    "content": [ { "type": "image", "data": "iVBORw==", "mimeType": "image/png" } ]
                }),
                _ => {
                    return json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": { "code": JsonRpcError::INVALID_PARAMS, "message": format!("Unknown tool: {}", tool) }
                    });
                }
            }
        }
        _ => {
            return json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": JsonRpcError::METHOD_NOT_FOUND, "message": format!("Method not found: {}", method) }
            });
        }
    };

    match id.as_u64() {
        Some(id) => json!(JsonRpcResponse::success(id, result)),
        None => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
    }
}
