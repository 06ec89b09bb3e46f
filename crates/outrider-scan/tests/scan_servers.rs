//! End-to-end scans against scripted stdio servers.
//!
//! Each mock server is a small `sh` script speaking newline-delimited
//! JSON-RPC on its standard streams, so these tests exercise the real
//! subprocess path: spawn, handshake, framing, teardown.

#![cfg(unix)]

use std::time::Duration;

use outrider_model::{Server, ServerStatus};
use outrider_scan::{ScanOptions, ServerScanner};

// =============================================================================
// Helpers
// =============================================================================

fn fast_options(retries: u32) -> ScanOptions {
    ScanOptions {
        timeout: Duration::from_secs(5),
        retries,
        retry_backoff: Duration::from_millis(20),
        startup_delay: Duration::from_millis(50),
        npx_startup_delay: Duration::from_millis(50),
        post_list_delay: Duration::from_millis(50),
        read_budget: Duration::from_secs(2),
        per_read_timeout: Duration::from_millis(100),
        ..ScanOptions::default()
    }
}

fn sh_server(name: &str, script: &str) -> Server {
    Server::new(name, "sh").with_args(["-c", script])
}

const WELL_BEHAVED: &str = r#"
while IFS= read -r line; do
  case "$line" in
    *'"method":"initialize"'*)
      printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"mock","version":"0.1.0"}}}' ;;
    *'"method":"tools/list"'*)
      printf '%s\n' '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"read_file","description":"Read a file from disk","inputSchema":{"type":"object"}},{"name":"write_file","description":"Write a file to disk"}]}}' ;;
  esac
done
"#;

const INIT_ERROR: &str = r#"
while IFS= read -r line; do
  case "$line" in
    *'"method":"initialize"'*)
      printf '%s\n' '{"jsonrpc":"2.0","id":1,"error":{"code":-32600,"message":"unsupported protocol"}}' ;;
  esac
done
"#;

const TOOLS_ERROR: &str = r#"
while IFS= read -r line; do
  case "$line" in
    *'"method":"initialize"'*)
      printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{}}' ;;
    *'"method":"tools/list"'*)
      printf '%s\n' '{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"tools not supported"}}' ;;
  esac
done
"#;

/// Responds slowly and splits the tools response across two writes.
const SLOW_AND_SPLIT: &str = r#"
while IFS= read -r line; do
  case "$line" in
    *'"method":"initialize"'*)
      sleep 1
      printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{}}' ;;
    *'"method":"tools/list"'*)
      printf '%s' '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"probe","descr'
      sleep 0.3
      printf '%s\n' 'iption":"Probe the network"}]}}' ;;
  esac
done
"#;

/// Consumes requests and never answers.
const MUTE: &str = "cat > /dev/null";

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_scan_discovers_declared_tools() {
    let scanner = ServerScanner::new(fast_options(0));
    let server = scanner.scan(sh_server("filesystem", WELL_BEHAVED)).await;

    assert_eq!(server.status, ServerStatus::Scanned);
    assert!(server.error_message.is_none());
    assert_eq!(server.tools.len(), 2);

    assert_eq!(server.tools[0].name, "read_file");
    assert_eq!(server.tools[0].description, "Read a file from disk");
    assert_eq!(server.tools[0].server_name, "filesystem");
    assert!(server.tools[0].input_schema.is_some());

    assert_eq!(server.tools[1].name, "write_file");
    assert!(server.tools[1].input_schema.is_none());
}

#[tokio::test]
async fn test_scan_tolerates_slow_and_fragmented_responses() {
    let scanner = ServerScanner::new(fast_options(0));
    let server = scanner.scan(sh_server("slow", SLOW_AND_SPLIT)).await;

    assert_eq!(server.status, ServerStatus::Scanned);
    assert_eq!(server.tools.len(), 1);
    assert_eq!(server.tools[0].name, "probe");
    assert_eq!(server.tools[0].description, "Probe the network");
}

// =============================================================================
// Failure paths
// =============================================================================

#[tokio::test]
async fn test_invalid_command_reports_attempt_count() {
    let scanner = ServerScanner::new(fast_options(2));
    let server = scanner
        .scan(Server::new("ghost", "outrider-no-such-binary"))
        .await;

    assert_eq!(server.status, ServerStatus::Error);
    assert!(server.tools.is_empty());
    let message = server.error_message.unwrap();
    assert!(message.contains("Executable not found"), "{message}");
    assert!(message.contains("(after 3 attempts)"), "{message}");
}

#[tokio::test]
async fn test_init_error_surfaces_server_payload() {
    let scanner = ServerScanner::new(fast_options(1));
    let server = scanner.scan(sh_server("refuser", INIT_ERROR)).await;

    assert_eq!(server.status, ServerStatus::Error);
    let message = server.error_message.unwrap();
    assert!(message.contains("Initialization error"), "{message}");
    assert!(message.contains("-32600"), "{message}");
    assert!(message.contains("(after 2 attempts)"), "{message}");
}

#[tokio::test]
async fn test_tools_error_surfaces_server_payload() {
    let scanner = ServerScanner::new(fast_options(0));
    let server = scanner.scan(sh_server("toolless", TOOLS_ERROR)).await;

    assert_eq!(server.status, ServerStatus::Error);
    let message = server.error_message.unwrap();
    assert!(message.contains("Tools list error"), "{message}");
    assert!(message.contains("tools not supported"), "{message}");
}

#[tokio::test]
async fn test_mute_server_reports_missing_init_response() {
    let scanner = ServerScanner::new(fast_options(0));
    let server = scanner.scan(sh_server("mute", MUTE)).await;

    assert_eq!(server.status, ServerStatus::Error);
    let message = server.error_message.unwrap();
    assert!(
        message.contains("No initialization response received"),
        "{message}"
    );
}

#[tokio::test]
async fn test_overall_timeout_cuts_off_hung_server() {
    let opts = ScanOptions {
        timeout: Duration::from_secs(1),
        read_budget: Duration::from_secs(30),
        ..fast_options(0)
    };
    let scanner = ServerScanner::new(opts);
    let server = scanner.scan(sh_server("hung", MUTE)).await;

    assert_eq!(server.status, ServerStatus::Error);
    let message = server.error_message.unwrap();
    assert!(
        message.contains("Server scan timed out after 1 seconds"),
        "{message}"
    );
}

#[tokio::test]
async fn test_exiting_server_fails_without_hanging() {
    let scanner = ServerScanner::new(fast_options(0));
    let server = scanner.scan(sh_server("flaky", "exit 0")).await;

    // The exact failure depends on whether the write or the read sees the
    // closed pipe first; either way the scan must end in a clean error.
    assert_eq!(server.status, ServerStatus::Error);
    assert!(server.tools.is_empty());
    assert!(server.error_message.is_some());
}

// =============================================================================
// Batch behavior
// =============================================================================

#[tokio::test]
async fn test_scan_all_isolates_failures_and_preserves_order() {
    let scanner = ServerScanner::new(fast_options(0));
    let servers = vec![
        sh_server("healthy", WELL_BEHAVED),
        Server::new("ghost", "outrider-no-such-binary"),
        sh_server("refuser", INIT_ERROR),
    ];

    let scanned = scanner.scan_all(servers).await;

    let names: Vec<_> = scanned.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["healthy", "ghost", "refuser"]);

    assert_eq!(scanned[0].status, ServerStatus::Scanned);
    assert_eq!(scanned[0].tools.len(), 2);

    assert_eq!(scanned[1].status, ServerStatus::Error);
    assert_eq!(scanned[2].status, ServerStatus::Error);
    assert!(scanned[2]
        .error_message
        .as_deref()
        .unwrap()
        .contains("Initialization error"));
}
