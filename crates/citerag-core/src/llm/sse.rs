//! Server-sent event framing for streamed chat completions
//!
//! Providers deliver `data: <json>` lines separated by blank lines. Transport
//! chunks can end anywhere, including inside a line or a UTF-8 sequence, so
//! bytes are accumulated until a full line is available.

/// Incremental SSE decoder yielding the `data` payload of each event
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
}

/// Sentinel sent by OpenAI-compatible providers after the last delta
pub const DONE_SENTINEL: &str = "[DONE]";

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a transport chunk and collect every event it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.buf[consumed..].iter().position(|&b| b == b'\n') {
            let end = consumed + offset;
            let mut line = &self.buf[consumed..end];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            let line = String::from_utf8_lossy(line).into_owned();
            consumed = end + 1;

            if let Some(event) = self.handle_line(&line) {
                events.push(event);
            }
        }
        self.buf.drain(..consumed);

        events
    }

    /// Flush a trailing event that was not followed by a blank line
    pub fn finish(&mut self) -> Option<String> {
        if !self.buf.is_empty() {
            let line = String::from_utf8_lossy(&self.buf).trim_end().to_string();
            self.buf.clear();
            if let Some(event) = self.handle_line(&line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn handle_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        // `event:`, `id:` and `retry:` fields carry nothing we use
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"a\":1}\n\n");
        assert_eq!(events, vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"con").is_empty());
        assert!(decoder.push(b"tent\":\"hi\"}\r").is_empty());
        assert!(decoder.push(b"\n").is_empty());
        let events = decoder.push(b"\r\ndata: [DONE]\n\n");
        assert_eq!(
            events,
            vec!["{\"content\":\"hi\"}".to_string(), DONE_SENTINEL.to_string()]
        );
    }

    #[test]
    fn test_comments_and_other_fields_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keep-alive\n\nevent: message\nid: 7\ndata: x\n\n");
        assert_eq!(events, vec!["x".to_string()]);
    }

    #[test]
    fn test_multibyte_split() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: héllo\n\n".as_bytes();
        let (a, b) = bytes.split_at(8);
        assert!(decoder.push(a).is_empty());
        assert_eq!(decoder.push(b), vec!["héllo".to_string()]);
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some("tail".to_string()));
        assert_eq!(decoder.finish(), None);
    }
}
