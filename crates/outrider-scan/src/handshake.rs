//! MCP discovery handshake.
//!
//! One [`Handshake`] drives a single scan attempt through the protocol's
//! fixed request sequence, correlating responses by numeric id over the
//! framed stream:
//!
//! ```text
//! Init ──initialize(id=1)──▶ AwaitInitResult ──notifications/initialized──▶
//!      ──tools/list(id=2)──▶ AwaitToolsResult ──▶ Scanned | Failed
//! ```
//!
//! The whole drive runs under the attempt's overall timeout, and the process
//! transport is shut down on every exit path, success or not, exactly once.

use serde_json::{json, Value};
use tokio::time::{sleep, timeout};
use tracing::debug;

use outrider_model::{Server, Tool};

use crate::error::{Result, ScanError};
use crate::framer::{read_messages, Framer};
use crate::options::ScanOptions;
use crate::transport::ProcessTransport;

/// JSON-RPC id used for the `initialize` request.
pub const INIT_REQUEST_ID: i64 = 1;
/// JSON-RPC id used for the `tools/list` request.
pub const TOOLS_REQUEST_ID: i64 = 2;
/// MCP protocol revision this client declares.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const CLIENT_NAME: &str = "mcp-outrider";

/// One scan attempt against one server.
pub struct Handshake<'a> {
    server: &'a Server,
    opts: &'a ScanOptions,
}

impl<'a> Handshake<'a> {
    pub fn new(server: &'a Server, opts: &'a ScanOptions) -> Self {
        Self { server, opts }
    }

    /// Run the full attempt: spawn, handshake, list tools, tear down.
    ///
    /// The handshake itself runs under [`ScanOptions::timeout`]; the
    /// transport is shut down unconditionally afterwards, so a timed-out or
    /// failed attempt never leaks the server process.
    pub async fn run(&self) -> Result<Vec<Tool>> {
        let mut transport =
            ProcessTransport::start(&self.server.command, &self.server.args, &self.server.env)?;

        let outcome = timeout(self.opts.timeout, self.drive(&mut transport)).await;
        transport.shutdown(self.opts.shutdown_grace).await;

        match outcome {
            Ok(result) => result,
            Err(_) => Err(ScanError::Timeout(self.opts.timeout.as_secs())),
        }
    }

    async fn drive(&self, transport: &mut ProcessTransport) -> Result<Vec<Tool>> {
        // Cold-starting servers drop input written before they listen.
        sleep(self.opts.startup_delay_for(&self.server.command)).await;

        let mut framer = Framer::new();

        debug!("[{}] sending initialize", self.server.name);
        transport.write_line(&init_request()).await?;
        let messages = read_messages(transport, &mut framer, self.opts).await?;
        check_init_response(&messages)?;

        debug!("[{}] initialize acknowledged", self.server.name);
        transport.write_line(&initialized_notification()).await?;

        transport.write_line(&list_tools_request()).await?;
        sleep(self.opts.post_list_delay).await;

        let messages = read_messages(transport, &mut framer, self.opts).await?;
        let tools = parse_tools_response(&messages, &self.server.name)?;
        debug!("[{}] discovered {} tools", self.server.name, tools.len());
        Ok(tools)
    }
}

fn init_request() -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "initialize",
        "params": {
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "clientInfo": {
                "name": CLIENT_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        },
        "id": INIT_REQUEST_ID
    })
}

fn initialized_notification() -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    })
}

fn list_tools_request() -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "tools/list",
        "id": TOOLS_REQUEST_ID
    })
}

/// Find the `initialize` response among `messages`.
///
/// Unrelated messages (server notifications, other ids) are skipped; a
/// matching id with an `error` field fails the attempt with the
/// server-reported payload.
fn check_init_response(messages: &[Value]) -> Result<()> {
    for msg in messages {
        if msg.get("id").and_then(Value::as_i64) != Some(INIT_REQUEST_ID) {
            continue;
        }
        if msg.get("result").is_some() {
            return Ok(());
        }
        if let Some(error) = msg.get("error") {
            return Err(ScanError::Init(error.to_string()));
        }
    }
    Err(ScanError::NoInitResponse)
}

/// Tool entry shape on the wire.
#[derive(serde::Deserialize)]
struct ToolEntry {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "inputSchema", default)]
    input_schema: Option<Value>,
}

/// Find the `tools/list` response and map its entries to [`Tool`]s.
///
/// A response whose `result` lacks a `tools` array is skipped (some servers
/// answer unrelated requests in between); only a matching id with an `error`
/// field fails the attempt outright.
fn parse_tools_response(messages: &[Value], server_name: &str) -> Result<Vec<Tool>> {
    for msg in messages {
        if msg.get("id").and_then(Value::as_i64) != Some(TOOLS_REQUEST_ID) {
            continue;
        }
        if let Some(tools) = msg.get("result").and_then(|r| r.get("tools")) {
            let entries: Vec<ToolEntry> = serde_json::from_value(tools.clone())
                .map_err(|e| ScanError::ToolsList(format!("malformed tool entry: {e}")))?;

            return Ok(entries
                .into_iter()
                .map(|entry| {
                    let tool = Tool::new(entry.name, entry.description, server_name);
                    match entry.input_schema {
                        Some(schema) => tool.with_input_schema(schema),
                        None => tool,
                    }
                })
                .collect());
        }
        if let Some(error) = msg.get("error") {
            return Err(ScanError::ToolsList(error.to_string()));
        }
    }
    Err(ScanError::NoToolsResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Request shapes
    // =========================================================================

    #[test]
    fn test_init_request_declares_protocol_and_identity() {
        let request = init_request();
        assert_eq!(request["id"], 1);
        assert_eq!(request["method"], "initialize");
        assert_eq!(request["params"]["protocolVersion"], "2024-11-05");
        assert_eq!(request["params"]["clientInfo"]["name"], "mcp-outrider");
        assert!(request["params"]["capabilities"]["tools"].is_object());
    }

    #[test]
    fn test_initialized_notification_has_no_id() {
        let notification = initialized_notification();
        assert_eq!(notification["method"], "notifications/initialized");
        assert!(notification.get("id").is_none());
    }

    #[test]
    fn test_list_tools_request_uses_id_two() {
        let request = list_tools_request();
        assert_eq!(request["id"], 2);
        assert_eq!(request["method"], "tools/list");
        assert!(request.get("params").is_none());
    }

    // =========================================================================
    // Initialize response handling
    // =========================================================================

    #[test]
    fn test_init_result_accepted() {
        let messages = vec![json!({"jsonrpc": "2.0", "id": 1, "result": {}})];
        assert!(check_init_response(&messages).is_ok());
    }

    #[test]
    fn test_init_skips_unrelated_messages() {
        let messages = vec![
            json!({"jsonrpc": "2.0", "method": "notifications/message", "params": {}}),
            json!({"jsonrpc": "2.0", "id": 9, "result": {}}),
            json!({"jsonrpc": "2.0", "id": 1, "result": {"serverInfo": {}}}),
        ];
        assert!(check_init_response(&messages).is_ok());
    }

    #[test]
    fn test_init_error_carries_payload() {
        let messages = vec![
            json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32600, "message": "unsupported"}}),
        ];
        match check_init_response(&messages) {
            Err(ScanError::Init(payload)) => {
                assert!(payload.contains("-32600"));
                assert!(payload.contains("unsupported"));
            }
            other => panic!("expected InitError, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_init_response() {
        let messages = vec![json!({"jsonrpc": "2.0", "method": "notifications/message"})];
        assert!(matches!(
            check_init_response(&messages),
            Err(ScanError::NoInitResponse)
        ));
        assert!(matches!(
            check_init_response(&[]),
            Err(ScanError::NoInitResponse)
        ));
    }

    // =========================================================================
    // Tools response handling
    // =========================================================================

    #[test]
    fn test_tools_parsed_with_schema_and_defaults() {
        let messages = vec![json!({
            "jsonrpc": "2.0",
            "id": 2,
            "result": {"tools": [
                {"name": "read_file", "description": "Read a file", "inputSchema": {"type": "object"}},
                {"name": "bare_tool"}
            ]}
        })];

        let tools = parse_tools_response(&messages, "filesystem").unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "read_file");
        assert_eq!(tools[0].server_name, "filesystem");
        assert!(tools[0].input_schema.is_some());
        assert_eq!(tools[1].description, "", "missing description defaults to empty");
        assert!(tools[1].input_schema.is_none());
    }

    #[test]
    fn test_empty_tool_array_is_a_successful_scan() {
        let messages = vec![json!({"jsonrpc": "2.0", "id": 2, "result": {"tools": []}})];
        let tools = parse_tools_response(&messages, "s").unwrap();
        assert!(tools.is_empty());
    }

    #[test]
    fn test_tools_error_carries_payload() {
        let messages =
            vec![json!({"jsonrpc": "2.0", "id": 2, "error": {"message": "not supported"}})];
        match parse_tools_response(&messages, "s") {
            Err(ScanError::ToolsList(payload)) => assert!(payload.contains("not supported")),
            other => panic!("expected ToolsListError, got {:?}", other),
        }
    }

    #[test]
    fn test_result_without_tools_key_is_skipped() {
        let messages = vec![
            json!({"jsonrpc": "2.0", "id": 2, "result": {"something": "else"}}),
        ];
        assert!(matches!(
            parse_tools_response(&messages, "s"),
            Err(ScanError::NoToolsResponse)
        ));
    }

    #[test]
    fn test_tool_entry_missing_name_fails_attempt() {
        let messages = vec![json!({
            "jsonrpc": "2.0",
            "id": 2,
            "result": {"tools": [{"description": "nameless"}]}
        })];
        assert!(matches!(
            parse_tools_response(&messages, "s"),
            Err(ScanError::ToolsList(_))
        ));
    }

    #[test]
    fn test_missing_tools_response() {
        assert!(matches!(
            parse_tools_response(&[], "s"),
            Err(ScanError::NoToolsResponse)
        ));
    }
}
