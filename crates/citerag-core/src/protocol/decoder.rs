//! Client-side decoder for the streaming wire format

use super::{CitationHeader, METADATA_SEPARATOR};
use crate::error::{CiteRagError, Result};
use crate::query::Citation;

/// Refuse to buffer more than this while waiting for the separator
pub const MAX_HEADER_BYTES: usize = 16 * 1024 * 1024;

/// Something the decoder recovered from the byte stream
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeEvent {
    /// The metadata segment, exactly once, before any text
    Citations {
        /// Header JSON as received
        raw: String,
        citations: Vec<Citation>,
    },
    /// A run of answer text
    Text(String),
}

enum State {
    AwaitingSeparator {
        buf: Vec<u8>,
        /// Bytes of `buf` already searched for the separator
        scanned: usize,
    },
    StreamingText {
        /// Trailing bytes of an incomplete UTF-8 sequence
        carry: Vec<u8>,
    },
}

/// Incremental decoder; feed it transport chunks in arrival order
pub struct StreamDecoder {
    state: State,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self {
            state: State::AwaitingSeparator {
                buf: Vec::new(),
                scanned: 0,
            },
        }
    }

    /// True once the metadata segment has been decoded
    pub fn has_citations(&self) -> bool {
        matches!(self.state, State::StreamingText { .. })
    }

    /// Consume one transport chunk
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<DecodeEvent>> {
        let mut events = Vec::new();

        match &mut self.state {
            State::StreamingText { carry } => {
                if let Some(text) = take_utf8(carry, chunk) {
                    events.push(DecodeEvent::Text(text));
                }
            }
            State::AwaitingSeparator { buf, scanned } => {
                buf.extend_from_slice(chunk);

                // Resume where the last search stopped, backing up far enough
                // to catch a separator split across chunks.
                let from = scanned.saturating_sub(METADATA_SEPARATOR.len() - 1);
                let found = find(&buf[from..], METADATA_SEPARATOR).map(|pos| from + pos);
                *scanned = buf.len();

                let Some(split) = found else {
                    if buf.len() > MAX_HEADER_BYTES {
                        return Err(CiteRagError::Protocol(format!(
                            "no metadata separator within {} bytes",
                            MAX_HEADER_BYTES
                        )));
                    }
                    return Ok(events);
                };

                let header = &buf[..split];
                let parsed: CitationHeader = serde_json::from_slice(header).map_err(|e| {
                    CiteRagError::Protocol(format!("invalid citation metadata: {}", e))
                })?;
                let raw = String::from_utf8_lossy(header).into_owned();
                events.push(DecodeEvent::Citations {
                    raw,
                    citations: parsed.citations,
                });

                let rest = buf[split + METADATA_SEPARATOR.len()..].to_vec();
                let mut carry = Vec::new();
                if let Some(text) = take_utf8(&mut carry, &rest) {
                    events.push(DecodeEvent::Text(text));
                }
                self.state = State::StreamingText { carry };
            }
        }

        Ok(events)
    }

    /// Signal end of stream
    ///
    /// Fails if the metadata segment never completed. Dangling bytes of a
    /// truncated UTF-8 sequence are returned with replacement characters.
    pub fn finish(&mut self) -> Result<Option<DecodeEvent>> {
        match &mut self.state {
            State::AwaitingSeparator { buf, .. } => Err(CiteRagError::Protocol(format!(
                "stream ended after {} bytes without citation metadata",
                buf.len()
            ))),
            State::StreamingText { carry } => {
                if carry.is_empty() {
                    return Ok(None);
                }
                let text = String::from_utf8_lossy(carry).into_owned();
                carry.clear();
                Ok(Some(DecodeEvent::Text(text)))
            }
        }
    }
}

/// Append `bytes` to `carry` and split off the longest valid UTF-8 prefix
fn take_utf8(carry: &mut Vec<u8>, bytes: &[u8]) -> Option<String> {
    carry.extend_from_slice(bytes);
    if carry.is_empty() {
        return None;
    }

    let text = match std::str::from_utf8(carry) {
        Ok(s) => {
            let s = s.to_string();
            carry.clear();
            s
        }
        Err(e) if e.error_len().is_none() => {
            // Incomplete sequence at the end: hold it for the next chunk
            let valid = e.valid_up_to();
            let s = String::from_utf8_lossy(&carry[..valid]).into_owned();
            carry.drain(..valid);
            s
        }
        Err(_) => {
            let s = String::from_utf8_lossy(carry).into_owned();
            carry.clear();
            s
        }
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// A fully decoded response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedResponse {
    pub raw_header: String,
    pub citations: Vec<Citation>,
    /// Text deltas in arrival order
    pub deltas: Vec<String>,
}

impl DecodedResponse {
    pub fn answer(&self) -> String {
        self.deltas.concat()
    }
}

/// Decode a complete response delivered as the given chunks
pub fn decode_chunks<'a, I>(chunks: I) -> Result<DecodedResponse>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut decoder = StreamDecoder::new();
    let mut response = DecodedResponse::default();

    let apply = |event: DecodeEvent, response: &mut DecodedResponse| match event {
        DecodeEvent::Citations { raw, citations } => {
            response.raw_header = raw;
            response.citations = citations;
        }
        DecodeEvent::Text(text) => response.deltas.push(text),
    };

    for chunk in chunks {
        for event in decoder.feed(chunk)? {
            apply(event, &mut response);
        }
    }
    if let Some(event) = decoder.finish()? {
        apply(event, &mut response);
    }

    Ok(response)
}
