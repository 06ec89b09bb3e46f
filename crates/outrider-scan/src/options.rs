//! Scan tuning knobs.
//!
//! Every delay and budget the scanner uses is a named field here rather than
//! an inline literal, so deployments (and tests) can tighten or relax them
//! without touching the protocol code. The defaults are tuned for real MCP
//! servers, including slow `npx` cold starts.

use std::time::Duration;

/// Tuning for the scanner, handshake, and transport.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Overall wall-clock budget for one scan attempt.
    pub timeout: Duration,

    /// Retries after the first failed attempt (total attempts = retries + 1).
    pub retries: u32,

    /// Pause before each retry.
    pub retry_backoff: Duration,

    /// Wait after spawning before the first request is sent.
    pub startup_delay: Duration,

    /// Startup wait for package-runner (`npx`) servers, which may need to
    /// download a package before they can answer.
    pub npx_startup_delay: Duration,

    /// Pause after sending `tools/list` before reading the response.
    pub post_list_delay: Duration,

    /// Ceiling on framed messages read per response phase.
    pub max_messages: usize,

    /// Wall-clock read budget per response phase.
    pub read_budget: Duration,

    /// How long one poll waits for more bytes before giving up quietly.
    pub per_read_timeout: Duration,

    /// Poll chunk size in bytes.
    pub chunk_size: usize,

    /// Grace period between stdin EOF and force-kill at shutdown.
    pub shutdown_grace: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 2,
            retry_backoff: Duration::from_secs(2),
            startup_delay: Duration::from_millis(1500),
            npx_startup_delay: Duration::from_secs(3),
            post_list_delay: Duration::from_millis(500),
            max_messages: 20,
            read_budget: Duration::from_secs(5),
            per_read_timeout: Duration::from_millis(500),
            chunk_size: 1024,
            shutdown_grace: Duration::from_secs(2),
        }
    }
}

impl ScanOptions {
    /// Override the overall per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the retry budget.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Startup delay appropriate for `command`.
    pub(crate) fn startup_delay_for(&self, command: &str) -> Duration {
        if command == "npx" {
            self.npx_startup_delay
        } else {
            self.startup_delay
        }
    }
}
