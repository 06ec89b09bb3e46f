//! Identifier-aware text normalization.
//!
//! Tool and server names arrive as `snake_case`, `kebab-case`, or
//! `camelCase` identifiers. Embedding them raw makes `readFile` and
//! `read file` look unrelated, so every text is normalized before it
//! reaches an embedder.

use std::sync::OnceLock;

use regex::Regex;

fn camel_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z])([A-Z])").unwrap())
}

/// Normalizes an identifier or free-text snippet for embedding.
///
/// Underscores become spaces, a space is inserted at each
/// lower-to-upper case boundary, and the result is lowercased.
///
/// # Example
/// ```
/// use outrider_detect::textproc::preprocess;
///
/// assert_eq!(preprocess("read_file"), "read file");
/// assert_eq!(preprocess("getUserData"), "get user data");
/// ```
pub fn preprocess(text: &str) -> String {
    let spaced = text.replace('_', " ");
    let split = camel_boundary().replace_all(&spaced, "$1 $2");
    split.to_lowercase()
}
