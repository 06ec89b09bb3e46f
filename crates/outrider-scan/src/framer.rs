//! Incremental JSON framing.
//!
//! Servers write newline-delimited JSON-RPC, but nothing guarantees that the
//! chunks we read line up with message boundaries: one poll may return half a
//! message, or several concatenated ones, or a message plus the start of the
//! next. [`Framer`] buffers raw bytes and peels complete JSON values off the
//! front as they become decodable, never assuming one message per read or per
//! line.

use std::time::Instant;

use serde_json::{Deserializer, Value};

use crate::error::Result;
use crate::options::ScanOptions;
use crate::transport::ProcessTransport;

/// Append-only byte buffer that yields complete JSON values.
#[derive(Debug, Default)]
pub struct Framer {
    buf: Vec<u8>,
}

impl Framer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append raw bytes to the buffer.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Decode every complete JSON value currently buffered, in order.
    ///
    /// Whitespace between values is skipped. An incomplete trailing value
    /// stays buffered until later feeds complete it. Malformed leading bytes
    /// are left in place and stall the stream; the surrounding read loop then
    /// runs out its budget and the handshake reports the missing response.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        let mut consumed = 0;
        {
            let mut stream = Deserializer::from_slice(&self.buf).into_iter::<Value>();
            loop {
                match stream.next() {
                    Some(Ok(value)) => {
                        out.push(value);
                        consumed = stream.byte_offset();
                    }
                    // Incomplete or malformed: stop at the last good offset.
                    Some(Err(_)) => break,
                    None => {
                        consumed = self.buf.len();
                        break;
                    }
                }
            }
        }
        self.buf.drain(..consumed);
        out
    }

    /// True if undecoded non-whitespace bytes are pending.
    pub fn has_partial(&self) -> bool {
        self.buf.iter().any(|b| !b.is_ascii_whitespace())
    }
}

/// Pull framed messages from the transport under a message-count ceiling and
/// a wall-clock budget.
///
/// A quiet poll after at least one message has arrived ends the phase early
/// (the response is normally in hand by then); a quiet poll with nothing yet
/// keeps waiting until the budget expires. Stream closure returns whatever
/// was framed, or propagates [`crate::ScanError::Read`] if nothing was.
pub(crate) async fn read_messages(
    transport: &mut ProcessTransport,
    framer: &mut Framer,
    opts: &ScanOptions,
) -> Result<Vec<Value>> {
    let mut messages = Vec::new();
    let start = Instant::now();

    while messages.len() < opts.max_messages {
        if start.elapsed() > opts.read_budget {
            break;
        }

        match transport
            .read_chunk(opts.chunk_size, opts.per_read_timeout)
            .await
        {
            Ok(chunk) if chunk.is_empty() => {
                if !messages.is_empty() {
                    break;
                }
            }
            Ok(chunk) => {
                framer.feed(&chunk);
                messages.extend(framer.drain());
            }
            Err(err) => {
                if messages.is_empty() {
                    return Err(err);
                }
                break;
            }
        }
    }

    Ok(messages)
}
