//! Streaming wire format
//!
//! One response body carries two payloads back to back:
//!
//! ```text
//! {"citations":[...]}\n__METADATA_END__\n<answer text bytes, arbitrarily chunked>
//! ```
//!
//! The header is compact JSON produced by `serde_json`, which escapes every
//! line feed inside strings, so a raw `\n` byte (and therefore the separator)
//! can never occur inside it. Everything after the separator is UTF-8 answer
//! text in generation order.

mod decoder;

pub use decoder::{decode_chunks, DecodeEvent, DecodedResponse, StreamDecoder};

use crate::error::Result;
use crate::llm::DeltaStream;
use crate::query::Citation;
use futures::future::ready;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

/// Marks the end of the JSON metadata segment
pub const METADATA_SEPARATOR: &[u8] = b"\n__METADATA_END__\n";

/// Content type used for the streamed body
pub const STREAM_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// The metadata segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationHeader {
    pub citations: Vec<Citation>,
}

/// Serialize the metadata segment including the trailing separator
pub fn encode_header(citations: &[Citation]) -> Result<Vec<u8>> {
    #[derive(Serialize)]
    struct HeaderRef<'a> {
        citations: &'a [Citation],
    }

    let mut out = serde_json::to_vec(&HeaderRef { citations })?;
    out.extend_from_slice(METADATA_SEPARATOR);
    Ok(out)
}

/// Multiplex citations and answer deltas onto one byte stream
///
/// The header is emitted exactly once, first, even for an empty citation
/// list. Each delta is forwarded as its own frame as soon as it arrives. A
/// generation error ends the stream: the transport has already committed to
/// a plain-text body, so the caller sees an early end rather than an error
/// payload. Dropping the returned stream drops the generation stream with it.
pub fn encode_stream(
    citations: &[Citation],
    deltas: DeltaStream,
) -> Result<BoxStream<'static, Vec<u8>>> {
    let header = encode_header(citations)?;

    let body = deltas
        .take_while(|item| {
            if let Err(e) = item {
                tracing::warn!("Generation stream failed after headers were sent: {}", e);
            }
            ready(item.is_ok())
        })
        .filter_map(|item| {
            ready(match item {
                Ok(text) if !text.is_empty() => Some(text.into_bytes()),
                _ => None,
            })
        });

    Ok(stream::once(ready(header)).chain(body).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;

    fn citation(id: usize, text: &str) -> Citation {
        Citation {
            id,
            text: text.to_string(),
            source: "notes.txt".to_string(),
            score: 0.75,
        }
    }

    #[test]
    fn test_header_for_empty_citations() {
        let header = encode_header(&[]).unwrap();
        assert_eq!(header, b"{\"citations\":[]}\n__METADATA_END__\n".to_vec());
    }

    #[test]
    fn test_separator_cannot_appear_in_header() {
        let header = encode_header(&[citation(1, "line one\n__METADATA_END__\nline two")]).unwrap();
        let json = &header[..header.len() - METADATA_SEPARATOR.len()];
        assert!(!json.contains(&b'\n'));
        assert!(header.ends_with(METADATA_SEPARATOR));
    }

    #[tokio::test]
    async fn test_encode_stream_header_first_then_each_delta() {
        let deltas = stream::iter(vec![
            Ok::<_, ProviderError>("Hel".to_string()),
            Ok("lo".to_string()),
        ])
        .boxed();
        let frames: Vec<Vec<u8>> = encode_stream(&[citation(1, "x")], deltas)
            .unwrap()
            .collect()
            .await;

        assert_eq!(frames.len(), 3);
        assert!(frames[0].ends_with(METADATA_SEPARATOR));
        assert_eq!(frames[1], b"Hel".to_vec());
        assert_eq!(frames[2], b"lo".to_vec());
    }

    #[tokio::test]
    async fn test_encode_stream_stops_at_first_error() {
        let deltas = stream::iter(vec![
            Ok("partial".to_string()),
            Err(ProviderError::timeout("generation", "idle")),
            Ok("never sent".to_string()),
        ])
        .boxed();
        let frames: Vec<Vec<u8>> = encode_stream(&[], deltas).unwrap().collect().await;

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], b"partial".to_vec());
    }
}
