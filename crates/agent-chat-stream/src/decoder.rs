//! Splits a chunked byte stream into complete text lines.
//!
//! The only state is the unterminated tail of the previous chunk, passed in
//! and returned explicitly as a [`LineBuffer`] value.

/// Pending bytes after the last newline seen so far.
///
/// Stored as bytes so a UTF-8 sequence split across chunks is decoded only
/// once it is whole. `\n` never occurs inside a multi-byte sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Whether there is no carried-over fragment.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Length of the carried-over fragment in bytes.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Consumes the buffer at end of stream and returns the unterminated
    /// fragment, if any.
    pub fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        Some(decode_line(&self.pending))
    }
}

/// Result of decoding one chunk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedChunk {
    /// Complete lines, in order, without their terminators.
    pub lines: Vec<String>,
    /// Carry-over for the next call.
    pub pending: LineBuffer,
}

/// Decodes `chunk` on top of the carry-over `pending`.
pub fn decode_chunk(pending: LineBuffer, chunk: &[u8]) -> DecodedChunk {
    let mut buf = pending.pending;
    // Carried bytes hold no newline, so scanning resumes where they end.
    let mut scan = buf.len();
    buf.extend_from_slice(chunk);

    let mut lines = Vec::new();
    let mut start = 0;
    while let Some(offset) = buf[scan..].iter().position(|b| *b == b'\n') {
        let end = scan + offset;
        lines.push(decode_line(&buf[start..end]));
        start = end + 1;
        scan = start;
    }
    buf.drain(..start);

    DecodedChunk {
        lines,
        pending: LineBuffer { pending: buf },
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
