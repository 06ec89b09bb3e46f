//! # Server and Tool Entities
//!
//! Core entities describing what gets scanned: an MCP server process
//! (launch descriptor plus scan outcome) and the tools it declares during
//! the discovery handshake.
//!
//! A [`Server`] starts life as a pure launch descriptor built from host
//! configuration. The scanner annotates it exactly once: the status moves
//! from [`ServerStatus::Unknown`] to either [`ServerStatus::Scanned`] (with
//! the discovered tools) or [`ServerStatus::Error`] (with a message). Both
//! transitions are terminal. Detectors only ever read these types.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Scan outcome for a single server.
///
/// # Variants
///
/// - `Unknown`: not yet scanned (initial state)
/// - `Scanned`: handshake completed, tool list discovered
/// - `Error`: every scan attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// Not yet scanned.
    Unknown,
    /// Handshake completed and tools were listed.
    Scanned,
    /// All scan attempts failed.
    Error,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Unknown => write!(f, "unknown"),
            ServerStatus::Scanned => write!(f, "scanned"),
            ServerStatus::Error => write!(f, "error"),
        }
    }
}

/// One callable operation declared by a server during discovery.
///
/// Tools are immutable after discovery. The `server_name` field is a
/// back-reference to the declaring server, not ownership; a tool's identity
/// throughout the system is the `(server_name, name)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name as declared by the server.
    pub name: String,

    /// Free-text description; may be empty or multi-line.
    #[serde(default)]
    pub description: String,

    /// Name of the server that declared this tool.
    pub server_name: String,

    /// Declared input schema, passed through unvalidated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

impl Tool {
    /// Create a tool owned by `server_name`.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        server_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            server_name: server_name.into(),
            input_schema: None,
        }
    }

    /// Attach the declared input schema.
    pub fn with_input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// The `(server name, tool name)` pair that identifies this tool.
    pub fn identity(&self) -> (&str, &str) {
        (&self.server_name, &self.name)
    }
}

/// An MCP server: launch descriptor plus scan outcome.
///
/// # Fields
///
/// - `name`: unique identity; configuration insertion order is preserved
///   for deterministic output
/// - `command` / `args`: how to launch the server process
/// - `env`: environment overrides merged onto the host environment
/// - `status` / `tools` / `error_message`: filled in by the scanner
///
/// # Example
///
/// ```rust
/// use outrider_model::{Server, ServerStatus, Tool};
///
/// let mut server = Server::new("filesystem", "npx")
///     .with_args(["-y", "@modelcontextprotocol/server-filesystem"]);
/// assert_eq!(server.status, ServerStatus::Unknown);
///
/// let tool = Tool::new("read_file", "Read a file from disk", "filesystem");
/// server.mark_scanned(vec![tool]);
/// assert!(server.is_scanned());
/// assert_eq!(server.tools.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Unique server name from configuration.
    pub name: String,

    /// Executable to launch.
    pub command: String,

    /// Ordered argument list.
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment overrides, merged onto the host environment at launch.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Tools discovered during the handshake; empty unless `Scanned`.
    #[serde(default)]
    pub tools: Vec<Tool>,

    /// Scan outcome.
    pub status: ServerStatus,

    /// Failure message; present iff `status == Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Server {
    /// Create an unscanned server descriptor.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            tools: Vec::new(),
            status: ServerStatus::Unknown,
            error_message: None,
        }
    }

    /// Set the launch arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the environment overrides.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Record a successful scan. Terminal transition.
    pub fn mark_scanned(&mut self, tools: Vec<Tool>) {
        self.status = ServerStatus::Scanned;
        self.tools = tools;
        self.error_message = None;
    }

    /// Record a failed scan. Terminal transition; clears any tools.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = ServerStatus::Error;
        self.tools = Vec::new();
        self.error_message = Some(message.into());
    }

    /// True if the handshake completed and tools were listed.
    pub fn is_scanned(&self) -> bool {
        self.status == ServerStatus::Scanned
    }
}
