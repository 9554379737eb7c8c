//! Console reporting of session progress.

use console::style;

use mcprobe_mcp::{
    Direction, Discovery, InitializeResult, McpError, Message, MessageTap, Result, SessionReporter,
    ToolInfo, ToolResult, ToolSpec,
};

use crate::interactive::ToolPicker;
use crate::render;

/// Prints session progress as styled text.
///
/// In JSON mode nothing is printed while the session runs; the caller emits
/// the whole outcome at the end.
pub struct ConsoleReporter {
    json: bool,
    interactive: bool,
    picker: Option<ToolPicker>,
    executing: bool,
}

impl ConsoleReporter {
    pub fn new(json: bool, interactive: bool) -> Self {
        Self {
            json,
            interactive,
            picker: None,
            executing: false,
        }
    }
}

impl SessionReporter for ConsoleReporter {
    fn initialized(&mut self, server: &InitializeResult) {
        if self.json {
            return;
        }
        println!("{} MCP server initialized successfully", style("✓").green());
        if let Some(info) = &server.server_info {
            println!(
                "  {}",
                style(format!("{} {}", info.name, info.version)).dim()
            );
        }
    }

    fn discovered(&mut self, discovery: &Discovery) {
        if self.json {
            return;
        }
        println!();
        println!("🔍 Discovering server capabilities...");
        println!("{}", render::discovery(discovery, self.interactive));
    }

    fn select_tools(&mut self, catalog: &[ToolInfo]) -> Vec<ToolSpec> {
        if self.picker.is_none() {
            match ToolPicker::new(self.json) {
                Ok(picker) => self.picker = Some(picker),
                Err(e) => {
                    tracing::warn!(error = %e, "interactive selection unavailable");
                    return Vec::new();
                }
            }
        }
        match self.picker.as_mut() {
            Some(picker) => picker.pick(catalog),
            None => Vec::new(),
        }
    }

    fn tool_started(&mut self, spec: &ToolSpec) {
        if self.json {
            return;
        }
        if !self.executing {
            self.executing = true;
            println!();
            println!("🔧 Executing requested tools...");
        }
        println!();
        println!("📋 Testing tool: {}", style(&spec.name).cyan());
    }

    fn tool_finished(&mut self, spec: &ToolSpec, result: &Result<ToolResult>) {
        if self.json {
            return;
        }
        let title = format!("Tool: {}", spec.name);
        match result {
            Ok(result) => println!("{}", render::tool_result(&title, result)),
            Err(e) => println!("{}", render::tool_error(&title, e)),
        }
        println!();
    }

    fn failed(&mut self, error: &McpError, stderr: &[String]) {
        if self.json {
            return;
        }
        let headline = match error {
            McpError::Initialization(_) => "✗ Failed to initialize MCP server".to_string(),
            other => format!("✗ Session failed: {}", other),
        };
        println!("{}", style(headline).red());
        if matches!(error, McpError::Initialization(_)) {
            println!("  {}", style(error).dim());
        }
        if !stderr.is_empty() {
            println!("Error output:");
            for line in stderr {
                println!("  {}", line);
            }
        }
    }
}

/// Echoes every protocol message to stderr.
pub struct ConsoleTap;

impl MessageTap for ConsoleTap {
    fn observe(&mut self, direction: Direction, message: &Message) {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::debug!(error = %e, "failed to serialize message for display");
                return;
            }
        };
        match direction {
            Direction::Outbound => eprintln!("{} {}", style("→").blue(), style(json).dim()),
            Direction::Inbound => eprintln!("{} {}", style("←").green(), style(json).dim()),
        }
    }
}
