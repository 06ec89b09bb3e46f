//! # Outrider Domain Model
//!
//! Shared entities for the MCP Outrider workspace: servers, the tools they
//! declare during discovery, and the deviation judgments produced over those
//! tools.
//!
//! ## Lifecycle
//!
//! ```text
//! configuration ──▶ Server (Unknown) ──scanner──▶ Server (Scanned | Error)
//!                                                     │
//!                                                  Tool list
//!                                                     │
//!                                    detectors ──▶ DeviationResult per tool
//! ```
//!
//! Two invariants are enforced at the type level rather than by convention:
//!
//! - A server whose status is not `Scanned` has an empty tool list
//!   ([`Server::mark_error`] clears tools).
//! - `is_deviation` agrees with `confidence` against the decision threshold,
//!   and confidence is clamped to `[0, 1]`
//!   ([`DeviationResult::judged`] derives the flag, never stores it raw).
//!
//! Everything here is serde-serializable; the JSON report and the host
//! configuration loader both speak these shapes directly.

pub mod deviation;
pub mod server;

pub use deviation::{DetectorContribution, DeviationResult, DEVIATION_THRESHOLD};
pub use server::{Server, ServerStatus, Tool};
