//! Parsing of `--env`, `--env-file` and `--tool` inputs.

use std::collections::BTreeMap;
use std::path::Path;

use mcprobe_mcp::ToolSpec;
use serde_json::Value;

use crate::{ConfigError, Result};

/// Read `KEY=VALUE` lines from an env file.
///
/// Blank lines, `#` comments and lines without `=` are skipped. Keys and
/// values are trimmed; only the first `=` splits.
pub fn parse_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_env_lines(&contents))
}

fn parse_env_lines(contents: &str) -> BTreeMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Parse one `--env` argument into `env`.
///
/// A JSON object contributes all its entries; otherwise the argument must
/// be `KEY=VALUE`.
pub fn parse_env_arg(arg: &str, env: &mut BTreeMap<String, String>) -> Result<()> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(arg) {
        env.extend(map.into_iter().map(|(k, v)| (k, env_value(v))));
        return Ok(());
    }
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidEnv(arg.to_string()))?;
    env.insert(key.trim().to_string(), value.trim().to_string());
    Ok(())
}

/// Render a JSON value as an environment string.
///
/// Strings are taken verbatim, null becomes empty, anything else is its
/// JSON text.
pub fn env_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parse one `--tool` argument: a tool object or an array of them.
pub fn parse_tool_arg(arg: &str) -> Result<Vec<ToolSpec>> {
    let value: Value = serde_json::from_str(arg)
        .map_err(|e| ConfigError::InvalidTool(format!("invalid JSON: {}", e)))?;
    let items = match value {
        Value::Array(items) => items,
        single => vec![single],
    };
    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|e| ConfigError::InvalidTool(e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_env_lines() {
        let env = parse_env_lines(
            "# maps credentials\n\nGOOGLE_MAPS_API_KEY = abc=def \nNOT A PAIR\nREGION=eu\n",
        );
        assert_eq!(env.len(), 2);
        assert_eq!(env["GOOGLE_MAPS_API_KEY"], "abc=def");
        assert_eq!(env["REGION"], "eu");
    }

    #[test]
    fn test_env_file_missing() {
        let err = parse_env_file(Path::new("/nonexistent/.env")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_env_arg_forms() {
        let mut env = BTreeMap::new();
        parse_env_arg("API_KEY=xyz", &mut env).unwrap();
        parse_env_arg(r#"{"DEBUG": true, "PORT": 8080, "NAME": "probe"}"#, &mut env).unwrap();

        assert_eq!(env["API_KEY"], "xyz");
        assert_eq!(env["DEBUG"], "true");
        assert_eq!(env["PORT"], "8080");
        assert_eq!(env["NAME"], "probe");
    }

    #[test]
    fn test_env_arg_invalid() {
        let mut env = BTreeMap::new();
        let err = parse_env_arg("JUST_A_NAME", &mut env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv(_)));

        // a JSON array is not an env mapping and has no '='
        assert!(parse_env_arg("[1,2]", &mut env).is_err());
    }

    #[test]
    fn test_tool_arg_single_and_array() {
        let tools = parse_tool_arg(r#"{"name": "add", "arguments": {"a": 2, "b": 3}}"#).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].arguments["b"], json!(3));

        let tools = parse_tool_arg(r#"[{"name": "echo"}, {"name": "add"}]"#).unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "add"]);
        assert!(tools[0].arguments.is_empty());
    }

    #[test]
    fn test_tool_arg_invalid() {
        assert!(matches!(
            parse_tool_arg("{name: add}"),
            Err(ConfigError::InvalidTool(_))
        ));
        assert!(matches!(
            parse_tool_arg(r#"{"arguments": {}}"#),
            Err(ConfigError::InvalidTool(_))
        ));
        assert!(matches!(
            parse_tool_arg(r#"{"name": 7}"#),
            Err(ConfigError::InvalidTool(_))
        ));
    }
}
