//! Human and JSON rendering of session results.

use console::style;
use serde::Serialize;
use serde_json::{Value, json};

use mcprobe_config::ProbeConfig;
use mcprobe_mcp::{ContentItem, Discovery, Listing, McpError, SessionOutcome, ToolResult};

/// Render one tool result: a status line, then each content item.
pub fn tool_result(title: &str, result: &ToolResult) -> String {
    let mut out = Vec::new();
    let status = if result.is_error {
        style(format!("✗ {}:", title)).red()
    } else {
        style(format!("✓ {}:", title)).green()
    };
    out.push(status.to_string());

    if result.content.is_empty() {
        out.push(format!("  {}", style("No content in response").dim()));
    }

    for (i, item) in result.content.iter().enumerate() {
        let n = i + 1;
        match item {
            ContentItem::Text(text) => {
                out.push(format!("  {}", style(format!("Content {} (text):", n)).cyan()));
                match serde_json::from_str::<Value>(text) {
                    Ok(parsed) => out.push(pretty_json(&parsed)),
                    Err(_) => out.extend(text_lines(text).map(|line| format!("    {}", line))),
                }
            }
            ContentItem::Image { data, mime_type } => {
                out.push(format!("  {}", style(format!("Content {} (image):", n)).yellow()));
                out.push(format!(
                    "    Image data available (type: {}, {} bytes)",
                    mime_type,
                    data.len()
                ));
            }
            ContentItem::Resource { uri } => {
                out.push(format!("  {}", style(format!("Content {} (resource):", n)).blue()));
                out.push(format!("    Resource: {}", uri));
            }
            ContentItem::Unknown(raw) => {
                let kind = raw.get("type").and_then(Value::as_str).unwrap_or("unknown");
                out.push(format!(
                    "  {}",
                    style(format!("Content {} (type: {}):", n, kind)).white()
                ));
                out.push(format!("    {}", raw));
            }
        }
    }
    out.join("\n")
}

/// Render a failed tool call.
pub fn tool_error(title: &str, error: &McpError) -> String {
    style(format!("✗ {}: {}", title, error)).red().to_string()
}

/// Text with escaped newlines and quotes expanded, blank lines dropped.
fn text_lines(text: &str) -> impl Iterator<Item = String> {
    text.replace("\\n", "\n")
        .replace("\\\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>()
        .into_iter()
}

/// Pretty-print JSON with four-space indentation.
fn pretty_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    match value.serialize(&mut serializer) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => value.to_string(),
    }
}

/// Render discovery results.
///
/// With `hide_tools` the tool list is left to the interactive menu.
pub fn discovery(discovery: &Discovery, hide_tools: bool) -> String {
    let mut out = Vec::new();

    match &discovery.tools {
        Ok(_) if hide_tools => {}
        Ok(tools) if tools.is_empty() => out.push(ok("No tools available")),
        Ok(tools) => {
            out.push(ok("Available tools:"));
            for tool in tools {
                out.push(format!(
                    "  • {}: {}",
                    style(&tool.name).cyan(),
                    style(
                        tool.description
                            .as_deref()
                            .unwrap_or("No description available")
                    )
                    .magenta()
                ));
            }
        }
        Err(e) => out.push(failed("tools", e)),
    }

    out.push(names_line(
        "resources",
        &discovery.resources,
        |r| r.name.as_str(),
    ));
    out.push(names_line("prompts", &discovery.prompts, |p| p.name.as_str()));
    out.join("\n")
}

fn names_line<T>(kind: &str, listing: &Listing<T>, name: impl Fn(&T) -> &str) -> String {
    match listing {
        Ok(items) if items.is_empty() => ok(&format!("No {} available", kind)),
        Ok(items) => ok(&format!(
            "Available {}: {}",
            kind,
            items.iter().map(name).collect::<Vec<_>>().join(", ")
        )),
        Err(e) => failed(kind, e),
    }
}

fn ok(text: &str) -> String {
    format!("{} {}", style("✓").green(), text)
}

fn failed(kind: &str, error: &McpError) -> String {
    style(format!("✗ Failed to list {}: {}", kind, error))
        .red()
        .to_string()
}

/// The whole session as one JSON document.
pub fn outcome_json(config: &ProbeConfig, outcome: &SessionOutcome) -> Value {
    let discovery = outcome.discovery.as_ref().map(|d| {
        json!({
            "tools": listing_json(&d.tools),
            "resources": listing_json(&d.resources),
            "prompts": listing_json(&d.prompts),
        })
    });

    let invocations: Vec<Value> = outcome
        .invocations
        .iter()
        .map(|call| {
            let mut entry = json!({
                "name": call.spec.name,
                "arguments": call.spec.arguments,
            });
            match &call.result {
                Ok(result) => entry["result"] = result.to_value(),
                Err(e) => entry["error"] = json!(e.to_string()),
            }
            entry
        })
        .collect();

    json!({
        "server": config.server,
        "env": config.env_keys(),
        "state": outcome.state.to_string(),
        "initialize": outcome.server,
        "discovery": discovery,
        "invocations": invocations,
        "error": outcome.error.as_ref().map(ToString::to_string),
        "stderr": outcome.stderr,
    })
}

fn listing_json<T: Serialize>(listing: &Listing<T>) -> Value {
    match listing {
        Ok(items) => json!(items),
        Err(e) => json!({ "error": e.to_string() }),
    }
}
