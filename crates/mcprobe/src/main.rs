//! mcprobe - probe and exercise MCP servers from the command line.
//!
//! Starts a server (a local command or an HTTP endpoint), performs the MCP
//! handshake, lists its capabilities and optionally calls tools.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use mcprobe_config::{CliInputs, ProbeConfig};
use mcprobe_mcp::{McpTransport, Session, SessionOutcome, SessionPlan, TERMINATION_GRACE};

mod interactive;
mod logging;
mod render;
mod reporter;

use reporter::{ConsoleReporter, ConsoleTap};

/// Exit status after Ctrl+C.
const EXIT_INTERRUPTED: u8 = 130;

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// mcprobe - universal MCP client for testing servers
#[derive(Parser, Debug)]
#[command(name = "mcprobe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON, or TOML with a .toml extension)
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Server command line or http(s) URL
    #[arg(long, env = "MCPROBE_SERVER")]
    pub server: Option<String>,

    /// Environment variable as KEY=VALUE or a JSON object (repeatable)
    #[arg(long, value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// File with KEY=VALUE lines
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Tool to call as a JSON object or array (repeatable)
    #[arg(long, value_name = "JSON")]
    pub tool: Vec<String>,

    /// Pick tools to call from the discovered list
    #[arg(short, long)]
    pub interactive: bool,

    /// Only list capabilities, do not call tools
    #[arg(long)]
    pub list_only: bool,

    /// Show every protocol message and debug logs
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the session report as JSON
    #[arg(long)]
    pub json: bool,

    /// Directory for daily rolling JSON logs
    #[arg(long, env = "MCPROBE_LOG_DIR", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    fn inputs(&self) -> CliInputs {
        CliInputs {
            config_file: self.config_file.clone(),
            server: self.server.clone(),
            env: self.env.clone(),
            env_file: self.env_file.clone(),
            tools: self.tool.clone(),
            verbose: self.verbose,
            list_only: self.list_only,
            interactive: self.interactive,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli.inputs().resolve().context("invalid configuration")?;
    let log_guard = logging::init(config.options.verbose, cli.log_dir.as_deref());

    if !cli.json {
        print_header(&config);
    }

    let transport = match McpTransport::open(&config.server, &config.env) {
        Ok(transport) => transport,
        Err(e) => {
            tracing::error!(server = %config.server, error = %e, "failed to open transport");
            eprintln!("{} Failed to start server: {}", style("✗").red(), e);
            return Ok(ExitCode::FAILURE);
        }
    };
    let process = transport.process().cloned();

    let plan = SessionPlan {
        tools: config.tools.clone(),
        list_only: config.options.list_only,
        interactive: config.options.interactive,
    };
    let verbose = config.options.verbose;
    let json = cli.json;

    let session = tokio::task::spawn_blocking(move || {
        let mut session = Session::new(transport);
        if verbose {
            session = session.with_tap(ConsoleTap);
        }
        let mut reporter = ConsoleReporter::new(json, plan.interactive);
        session.run(plan, &mut reporter)
    });

    let outcome = tokio::select! {
        joined = session => joined.context("session thread panicked")?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, stopping server");
            if let Some(process) = &process {
                process.terminate(TERMINATION_GRACE);
            }
            eprintln!();
            eprintln!("⚠️  Interrupted by user");
            // exit skips destructors; flush the log file first
            drop(log_guard);
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    };

    if json {
        let report = render::outcome_json(&config, &outcome);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if outcome.error.is_none() {
        println!();
        println!("{} Session completed successfully", style("✓").green());
    } else {
        println!("{} Session failed", style("✗").red());
    }

    Ok(exit_code(&outcome))
}

/// Failure only when the handshake never succeeded; later errors are reported.
fn exit_code(outcome: &SessionOutcome) -> ExitCode {
    if outcome.initialized() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_header(config: &ProbeConfig) {
    println!("{}", style("🚀 Universal MCP Client").bold());
    println!("📡 Server: {}", config.server);
    if !config.env.is_empty() {
        println!("🔐 Environment variables: {}", config.env_keys().join(", "));
    }
}
