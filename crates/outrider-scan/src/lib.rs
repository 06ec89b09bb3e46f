//! # Outrider Scan - MCP Server Discovery
//!
//! Protocol client that discovers what tools a set of MCP (Model Context
//! Protocol) servers declare. Each server is launched as a subprocess and
//! driven through the discovery handshake over newline-delimited JSON-RPC on
//! its standard streams; all servers are scanned concurrently with bounded
//! timeouts, per-server retry, and guaranteed process teardown.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        SERVER SCANNER                          │
//! │        one task per server · retry · fan-out / fan-in          │
//! ├────────────────────────────────────────────────────────────────┤
//! │                     HANDSHAKE STATE MACHINE                    │
//! │   initialize (id=1) → initialized → tools/list (id=2)          │
//! │   per-attempt overall timeout · unconditional shutdown         │
//! ├──────────────────────────┬─────────────────────────────────────┤
//! │      STREAM FRAMER       │         PROCESS TRANSPORT           │
//! │  byte buffer → complete  │   spawn · newline-terminated JSON   │
//! │  JSON values, partial-   │   writes · timeout-bounded chunk    │
//! │  and-concatenation safe  │   reads · EOF → grace → kill        │
//! └──────────────────────────┴─────────────────────────────────────┘
//! ```
//!
//! ## Failure containment
//!
//! A scan attempt can fail at every layer: the executable may not exist, the
//! pipe may break, the server may answer with a protocol error, or it may
//! simply say nothing. Every failure mode is a [`ScanError`] variant that
//! aborts the attempt, and after the retry budget is exhausted the scanner
//! records the failure on the [`Server`](outrider_model::Server) itself
//! rather than returning an error, so a batch scan always yields one
//! annotated result per configured server.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use outrider_model::Server;
//! use outrider_scan::{ScanOptions, ServerScanner};
//!
//! # async fn run() {
//! let scanner = ServerScanner::new(ScanOptions::default());
//! let servers = vec![
//!     Server::new("filesystem", "npx")
//!         .with_args(["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]),
//! ];
//!
//! for server in scanner.scan_all(servers).await {
//!     println!("{}: {} ({} tools)", server.name, server.status, server.tools.len());
//! }
//! # }
//! ```
//!
//! ## References
//!
//! - Model Context Protocol specification (revision `2024-11-05`)
//!   <https://spec.modelcontextprotocol.io/>
//! - JSON-RPC 2.0 specification
//!   <https://www.jsonrpc.org/specification>

pub mod error;
pub mod framer;
pub mod handshake;
pub mod options;
pub mod scanner;
pub mod transport;

pub use error::{Result, ScanError};
pub use framer::Framer;
pub use handshake::Handshake;
pub use options::ScanOptions;
pub use scanner::ServerScanner;
pub use transport::ProcessTransport;
