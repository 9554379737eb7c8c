//! Configuration types.
//!
//! A config file (JSON, or TOML by extension):
//! ```json
//! {
//!   "server": "npx -y @modelcontextprotocol/server-google-maps",
//!   "env": { "GOOGLE_MAPS_API_KEY": "..." },
//!   "tools": [ { "name": "maps_geocode", "arguments": { "address": "Oslo" } } ],
//!   "options": { "verbose": false, "list_only": false, "interactive": false }
//! }
//! ```

use std::collections::BTreeMap;

use mcprobe_mcp::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contents of a config file.
///
/// Every field is optional; a present field overrides the matching command
/// line input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Server command line or HTTP(S) URL.
    pub server: Option<String>,
    /// Environment for the server. Replaces command line env when present.
    pub env: Option<BTreeMap<String, Value>>,
    /// Tools to invoke. Replaces command line tools when present.
    pub tools: Option<Vec<ToolSpec>>,
    /// Mode switches.
    pub options: FileOptions,
}

/// The `options` table; each set field overrides its flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOptions {
    pub verbose: Option<bool>,
    pub list_only: Option<bool>,
    pub interactive: Option<bool>,
}

/// Mode switches after merging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Options {
    /// Echo every protocol message.
    pub verbose: bool,
    /// Discover capabilities and stop.
    pub list_only: bool,
    /// Pick tools and arguments at the terminal.
    pub interactive: bool,
}

/// Fully merged configuration for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeConfig {
    /// Server command line or HTTP(S) URL.
    pub server: String,
    /// Auxiliary key/value data: child environment or HTTP headers.
    pub env: BTreeMap<String, String>,
    /// Tools to invoke, in order.
    pub tools: Vec<ToolSpec>,
    /// Mode switches.
    pub options: Options,
}

impl ProbeConfig {
    /// Environment keys, for display without leaking values.
    pub fn env_keys(&self) -> Vec<&str> {
        self.env.keys().map(String::as_str).collect()
    }
}
