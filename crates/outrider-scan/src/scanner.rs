//! Concurrent server scanning with retry.
//!
//! The scanner is the crate's public entry point: it owns the retry policy
//! around individual [`Handshake`] attempts and the fan-out across servers.
//! Scan failures are terminal annotations on the returned [`Server`] values,
//! never errors; one misbehaving server must not abort the batch.

use tokio::time::sleep;
use tracing::{debug, info, warn};

use outrider_model::Server;

use crate::handshake::Handshake;
use crate::options::ScanOptions;

/// Scans configured MCP servers and annotates them with discovered tools.
#[derive(Debug, Clone, Default)]
pub struct ServerScanner {
    opts: ScanOptions,
}

impl ServerScanner {
    pub fn new(opts: ScanOptions) -> Self {
        Self { opts }
    }

    /// Scan one server, retrying failed attempts up to the retry budget.
    ///
    /// The first successful attempt returns immediately. After the final
    /// attempt fails, the last error and the attempt count are folded into
    /// the server's terminal `error` status.
    pub async fn scan(&self, mut server: Server) -> Server {
        let attempts = self.opts.retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                debug!(
                    "[{}] retrying scan (attempt {}/{})",
                    server.name, attempt, attempts
                );
                sleep(self.opts.retry_backoff).await;
            }

            match Handshake::new(&server, &self.opts).run().await {
                Ok(tools) => {
                    info!("[{}] scanned, {} tools discovered", server.name, tools.len());
                    server.mark_scanned(tools);
                    return server;
                }
                Err(err) => {
                    debug!("[{}] attempt {} failed: {}", server.name, attempt, err);
                    last_error = err.to_string();
                }
            }
        }

        warn!(
            "[{}] scan failed after {} attempts: {}",
            server.name, attempts, last_error
        );
        server.mark_error(format!("{last_error} (after {attempts} attempts)"));
        server
    }

    /// Scan every server concurrently and collect all results.
    ///
    /// Fan-out/fan-in: each server gets its own task, and the returned list
    /// preserves the input order regardless of completion order. A panicked
    /// scan task degrades to an `error` status on that server alone.
    pub async fn scan_all(&self, servers: Vec<Server>) -> Vec<Server> {
        info!("scanning {} servers", servers.len());

        let mut handles = Vec::with_capacity(servers.len());
        for server in servers {
            let scanner = self.clone();
            let descriptor = server.clone();
            handles.push((
                descriptor,
                tokio::spawn(async move { scanner.scan(server).await }),
            ));
        }

        let mut scanned = Vec::with_capacity(handles.len());
        for (mut descriptor, handle) in handles {
            match handle.await {
                Ok(server) => scanned.push(server),
                Err(err) => {
                    warn!("[{}] scan task aborted: {}", descriptor.name, err);
                    descriptor.mark_error(format!("Scan task aborted: {err}"));
                    scanned.push(descriptor);
                }
            }
        }
        scanned
    }
}
