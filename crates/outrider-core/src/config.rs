//! Host configuration discovery and parsing.
//!
//! Locates the Claude Desktop configuration at the platform-conventional
//! path and turns its `mcpServers` mapping into launch descriptors. Server
//! order follows the configuration file, so scan output and reports stay
//! stable across runs.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use outrider_model::Server;

use crate::error::{OutriderError, Result};

/// One `mcpServers` entry. Every field is optional in the host file.
#[derive(Debug, Deserialize)]
struct ServerEntry {
    #[serde(default)]
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct HostConfig {
    /// Kept as a raw JSON map so configuration order is preserved.
    #[serde(rename = "mcpServers", default)]
    mcp_servers: serde_json::Map<String, serde_json::Value>,
}

/// Platform-conventional location of the Claude Desktop configuration.
///
/// - Windows: `%APPDATA%\Claude\claude_desktop_config.json`
/// - macOS: `~/Library/Application Support/Claude/claude_desktop_config.json`
/// - Linux: `~/.config/Claude/claude_desktop_config.json`
pub fn default_config_path() -> Result<PathBuf> {
    let base = if cfg!(target_os = "windows") {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .or_else(|| home_dir().map(|home| home.join("AppData").join("Roaming")))
    } else if cfg!(target_os = "macos") {
        home_dir().map(|home| home.join("Library").join("Application Support"))
    } else {
        home_dir().map(|home| home.join(".config"))
    };

    let base = base.ok_or(OutriderError::NoHomeDirectory)?;
    Ok(base.join("Claude").join("claude_desktop_config.json"))
}

fn home_dir() -> Option<PathBuf> {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    env::var_os(var).map(PathBuf::from)
}

/// Reads `path` and parses its `mcpServers` mapping into launch descriptors.
///
/// A missing or empty `mcpServers` key yields an empty list, not an error;
/// a missing file or malformed JSON is a typed error.
pub fn load_servers(path: &Path) -> Result<Vec<Server>> {
    if !path.exists() {
        return Err(OutriderError::ConfigNotFound(path.to_path_buf()));
    }

    let raw = fs::read_to_string(path).map_err(|source| OutriderError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let config: HostConfig =
        serde_json::from_str(&raw).map_err(|source| OutriderError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut servers = Vec::with_capacity(config.mcp_servers.len());
    for (name, value) in config.mcp_servers {
        let entry: ServerEntry =
            serde_json::from_value(value).map_err(|source| OutriderError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(
            "configured server {}: {} {}",
            name,
            entry.command,
            entry.args.join(" ")
        );
        servers.push(
            Server::new(name, entry.command)
                .with_args(entry.args)
                .with_env(entry.env),
        );
    }
    Ok(servers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("claude_desktop_config.json");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parses_servers_in_file_order() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{
                "mcpServers": {
                    "zeta": {"command": "npx", "args": ["-y", "zeta-server"]},
                    "alpha": {"command": "python", "args": ["-m", "alpha"]}
                }
            }"#,
        );

        let servers = load_servers(&path).unwrap();
        let names: Vec<&str> = servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(servers[0].command, "npx");
        assert_eq!(servers[0].args, vec!["-y", "zeta-server"]);
    }

    #[test]
    fn test_args_and_env_default_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"mcpServers": {"bare": {"command": "deno"}}}"#);

        let servers = load_servers(&path).unwrap();
        assert_eq!(servers.len(), 1);
        assert!(servers[0].args.is_empty());
        assert!(servers[0].env.is_empty());
    }

    #[test]
    fn test_env_overrides_are_kept() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"mcpServers": {"github": {
                "command": "npx",
                "env": {"GITHUB_TOKEN": "secret"}
            }}}"#,
        );

        let servers = load_servers(&path).unwrap();
        assert_eq!(servers[0].env.get("GITHUB_TOKEN").map(String::as_str), Some("secret"));
    }

    #[test]
    fn test_missing_mcp_servers_key_yields_empty_list() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"globalShortcut": "Ctrl+Space"}"#);
        assert!(load_servers(&path).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_config_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.json");
        let err = load_servers(&path).unwrap_err();
        assert!(matches!(err, OutriderError::ConfigNotFound(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "{ not json");
        let err = load_servers(&path).unwrap_err();
        assert!(matches!(err, OutriderError::ConfigParse { .. }));
    }

    #[test]
    fn test_malformed_entry_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"mcpServers": {"odd": "just a string"}}"#);
        let err = load_servers(&path).unwrap_err();
        assert!(matches!(err, OutriderError::ConfigParse { .. }));
    }

    #[test]
    fn test_default_path_ends_with_claude_config() {
        let path = default_config_path().unwrap();
        assert!(path.ends_with("Claude/claude_desktop_config.json"));
    }
}
