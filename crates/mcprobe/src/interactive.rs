//! Interactive tool selection.
//!
//! Shows the discovered catalog as a numbered menu, reads a selection such
//! as `1,3,5-7` or `all`, then asks for each selected tool's arguments as a
//! JSON object.

use anyhow::Result;
use console::{Term, style};
use rustyline::config::Behavior;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use serde_json::{Map, Value};

use mcprobe_mcp::{ToolInfo, ToolSpec};

/// Why a selection line was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// Not numbers, ranges or `all`.
    Invalid(String),
    /// Parsed, but every index was out of range.
    NoneInRange,
}

/// Parse a selection line into zero-based catalog indexes.
///
/// Numbers are 1-based; ranges are inclusive. Indexes outside the catalog
/// are dropped. An empty line selects nothing.
pub fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>, SelectionError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if input.eq_ignore_ascii_case("all") {
        return Ok((0..count).collect());
    }

    let number = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| SelectionError::Invalid(s.trim().to_string()))
    };

    let mut indexes = Vec::new();
    for part in input.split(',').map(str::trim) {
        match part.split_once('-') {
            // clamp before expanding
            Some((start, end)) => {
                let (start, end) = (number(start)?.max(1), number(end)?.min(count));
                indexes.extend((start..=end).map(|n| n - 1));
            }
            None => {
                let n = number(part)?;
                if (1..=count).contains(&n) {
                    indexes.push(n - 1);
                }
            }
        }
    }

    if indexes.is_empty() {
        return Err(SelectionError::NoneInRange);
    }
    Ok(indexes)
}

/// Parse an arguments line. Empty means no arguments.
pub fn parse_arguments(input: &str) -> Result<Map<String, Value>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(input) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("arguments must be a JSON object".to_string()),
        Err(e) => Err(format!("Invalid JSON: {}", e)),
    }
}

/// Terminal menu for picking tools.
pub struct ToolPicker {
    editor: Editor<(), DefaultHistory>,
    term: Term,
}

impl ToolPicker {
    /// Create a picker reading from the terminal.
    ///
    /// With `to_stderr` the menu goes to stderr and prompts to the
    /// controlling terminal, so stdout carries only the report.
    pub fn new(to_stderr: bool) -> Result<Self> {
        let mut config = Config::builder().auto_add_history(true);
        if to_stderr {
            config = config.behavior(Behavior::PreferTerm);
        }
        Ok(Self {
            editor: Editor::with_config(config.build())?,
            term: if to_stderr { Term::stderr() } else { Term::stdout() },
        })
    }

    /// Run the menu. Ctrl+C or Ctrl+D selects nothing.
    pub fn pick(&mut self, catalog: &[ToolInfo]) -> Vec<ToolSpec> {
        self.print_menu(catalog);

        let indexes = loop {
            let Some(line) = self.read_line("Tools to run > ") else {
                return Vec::new();
            };
            match parse_selection(&line, catalog.len()) {
                Ok(indexes) if indexes.is_empty() => {
                    self.say("No tools selected.");
                    return Vec::new();
                }
                Ok(indexes) => break indexes,
                Err(SelectionError::NoneInRange) => {
                    self.say("No valid tools selected. Please try again.");
                }
                Err(SelectionError::Invalid(_)) => {
                    self.say("Invalid selection. Please use numbers, ranges (1-3), or 'all'.");
                }
            }
        };

        let mut selected = Vec::with_capacity(indexes.len());
        for index in indexes {
            let tool = &catalog[index];
            let Some(arguments) = self.configure(tool) else {
                return selected;
            };
            selected.push(ToolSpec {
                name: tool.name.clone(),
                arguments,
            });
        }
        selected
    }

    fn configure(&mut self, tool: &ToolInfo) -> Option<Map<String, Value>> {
        self.say("");
        self.say(&format!("Configure tool: {}", style(&tool.name).cyan()));

        let params = tool.parameters();
        let (required, optional): (Vec<_>, Vec<_>) =
            params.iter().partition(|(_, _, required)| *required);
        for (title, group) in [("Required parameters:", required), ("Optional parameters:", optional)] {
            if group.is_empty() {
                continue;
            }
            self.say(title);
            for (name, description, _) in group {
                self.say(&format!(
                    "  • {}: {}",
                    name,
                    description.as_deref().unwrap_or("No description")
                ));
            }
        }

        self.say("");
        self.say("Enter arguments as JSON (or press ENTER for empty arguments):");
        self.say(&style(r#"Example: {"query": "Golden Gate Bridge"}"#).dim().to_string());

        loop {
            let line = self.read_line("> ")?;
            match parse_arguments(&line) {
                Ok(arguments) => return Some(arguments),
                Err(message) => self.say(&format!("{}. Please try again:", message)),
            }
        }
    }

    fn read_line(&mut self, prompt: &str) -> Option<String> {
        match self.editor.readline(prompt) {
            Ok(line) => Some(line),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                self.say("No tools selected.");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read from terminal");
                None
            }
        }
    }

    fn print_menu(&self, catalog: &[ToolInfo]) {
        self.say("");
        self.say(&style("Interactive Tool Selection").bold().to_string());
        self.say(&"=".repeat(50));
        for (i, tool) in catalog.iter().enumerate() {
            self.say(&format!("{:2}. {}", i + 1, style(&tool.name).cyan()));
            self.say(&format!(
                "    {}",
                style(tool.description.as_deref().unwrap_or("No description")).dim()
            ));
        }
        self.say("");
        self.say("Select tools by entering numbers (e.g., '1,3,5' or '1-3' or 'all'):");
        self.say("Press ENTER with no input to skip tool execution");
    }

    fn say(&self, line: &str) {
        if let Err(e) = self.term.write_line(line) {
            tracing::debug!(error = %e, "failed to write menu line");
        }
    }
}
