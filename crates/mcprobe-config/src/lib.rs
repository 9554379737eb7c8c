//! Configuration for mcprobe.
//!
//! Inputs come from two places:
//! - command line flags (`--server`, `--env`, `--env-file`, `--tool`, mode flags)
//! - an optional config file, JSON or TOML, with `server`, `env`, `tools`
//!   and `options`
//!
//! [`merge`] combines them into a [`ProbeConfig`]; the config file takes
//! precedence.

pub mod error;
pub mod loader;
pub mod merge;
pub mod parse;
pub mod types;

pub use error::{ConfigError, Result};
pub use loader::load_config_file;
pub use merge::{CliInputs, merge};
pub use parse::{env_value, parse_env_arg, parse_env_file, parse_tool_arg};
pub use types::*;
