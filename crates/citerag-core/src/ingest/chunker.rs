//! Fixed-size sliding-window text splitting

/// One window of a source document
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub text: String,
    /// Byte offset of the window in the source text
    pub position: usize,
}

impl TextChunk {
    /// Rough token count, one token per four characters
    pub fn token_estimate(&self) -> usize {
        token_estimate(&self.text)
    }
}

pub fn token_estimate(text: &str) -> usize {
    (text.chars().count() as f64 / 4.0).round() as usize
}

/// Find a valid char boundary at or before the given byte index
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Find a valid char boundary at or after the given byte index
fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Split `content` into windows of at most `size` bytes overlapping by `overlap`
///
/// A window prefers to end on a natural break (paragraph, sentence, line,
/// word) found in its last 30%. Whitespace-only windows are dropped.
pub fn chunk_text(content: &str, size: usize, overlap: usize) -> Vec<TextChunk> {
    let size = size.max(1);
    let overlap = overlap.min(size - 1);

    if content.trim().is_empty() {
        return Vec::new();
    }
    if content.len() <= size {
        return vec![TextChunk {
            text: content.to_string(),
            position: 0,
        }];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < content.len() {
        let raw_end = (start + size).min(content.len());
        let mut end = floor_char_boundary(content, raw_end);
        if end <= start {
            // Window narrower than one character
            end = ceil_char_boundary(content, start + 1);
        }
        let mut chunk_end = end;

        if end < content.len() {
            let search_start = ceil_char_boundary(content, start + (size * 70 / 100));

            if search_start < end {
                let region = &content[search_start..end];

                if let Some(pos) = region.rfind("\n\n") {
                    chunk_end = search_start + pos + 2;
                } else if let Some(pos) = region.rfind(". ") {
                    chunk_end = search_start + pos + 2;
                } else if let Some(pos) = region.rfind('\n') {
                    chunk_end = search_start + pos + 1;
                } else if let Some(pos) = region.rfind(' ') {
                    chunk_end = search_start + pos + 1;
                }
            }
        }

        let text = &content[start..chunk_end];
        if !text.trim().is_empty() {
            chunks.push(TextChunk {
                text: text.to_string(),
                position: start,
            });
        }

        if chunk_end >= content.len() {
            break;
        }

        // Always advance, even when the overlap would reach back past `start`
        let next = ceil_char_boundary(content, chunk_end.saturating_sub(overlap));
        start = if next > start { next } else { chunk_end };
    }

    chunks
}
