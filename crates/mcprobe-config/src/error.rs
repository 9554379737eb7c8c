//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading and merging configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config or env file.
    #[error("failed to read '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse a JSON config file.
    #[error("invalid JSON in configuration file '{path}': {source}")]
    ParseJson {
        path: String,
        source: serde_json::Error,
    },

    /// Failed to parse a TOML config file.
    #[error("invalid TOML in configuration file '{path}': {source}")]
    ParseToml {
        path: String,
        source: toml::de::Error,
    },

    /// An `--env` argument that is neither `KEY=VALUE` nor a JSON object.
    #[error("invalid environment variable format: {0}")]
    InvalidEnv(String),

    /// A `--tool` argument that is not a valid tool specification.
    #[error("invalid tool specification: {0}")]
    InvalidTool(String),

    /// No server given on the command line or in the config file.
    #[error("server must be specified via --server or config file")]
    MissingServer,
}
