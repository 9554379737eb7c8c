//! Merging command line inputs with a config file.
//!
//! The config file wins:
//! - a non-empty `server` replaces `--server`
//! - `env` replaces everything from `--env` / `--env-file`
//! - `tools` replaces everything from `--tool`
//! - each `options` field replaces its flag

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::parse::{env_value, parse_env_arg, parse_env_file, parse_tool_arg};
use crate::{ConfigError, ConfigFile, Options, ProbeConfig, Result, load_config_file};

/// Raw inputs from the command line.
#[derive(Debug, Clone, Default)]
pub struct CliInputs {
    pub config_file: Option<PathBuf>,
    pub server: Option<String>,
    pub env: Vec<String>,
    pub env_file: Option<PathBuf>,
    pub tools: Vec<String>,
    pub verbose: bool,
    pub list_only: bool,
    pub interactive: bool,
}

impl CliInputs {
    /// Load the config file, if any, and merge.
    pub fn resolve(&self) -> Result<ProbeConfig> {
        let file = self
            .config_file
            .as_deref()
            .map(load_config_file)
            .transpose()?;
        merge(self, file.unwrap_or_default())
    }
}

/// Merge command line inputs with an already loaded config file.
pub fn merge(cli: &CliInputs, file: ConfigFile) -> Result<ProbeConfig> {
    let server = file
        .server
        .filter(|s| !s.trim().is_empty())
        .or_else(|| cli.server.clone().filter(|s| !s.trim().is_empty()))
        .ok_or(ConfigError::MissingServer)?;

    let env = match file.env {
        Some(env) => env.into_iter().map(|(k, v)| (k, env_value(v))).collect(),
        None => cli_env(cli)?,
    };

    let tools = match file.tools {
        Some(tools) => tools,
        None => {
            let mut tools = Vec::new();
            for arg in &cli.tools {
                tools.extend(parse_tool_arg(arg)?);
            }
            tools
        }
    };

    let options = Options {
        verbose: file.options.verbose.unwrap_or(cli.verbose),
        list_only: file.options.list_only.unwrap_or(cli.list_only),
        interactive: file.options.interactive.unwrap_or(cli.interactive),
    };

    Ok(ProbeConfig {
        server,
        env,
        tools,
        options,
    })
}

/// Env file first, then `--env` arguments in order.
fn cli_env(cli: &CliInputs) -> Result<BTreeMap<String, String>> {
    let mut env = match &cli.env_file {
        Some(path) => parse_env_file(path)?,
        None => BTreeMap::new(),
    };
    for arg in &cli.env {
        parse_env_arg(arg, &mut env)?;
    }
    Ok(env)
}
