//! Normalization of source chunks into text.
//!
//! Sources may hand the stream either text or raw bytes. Byte chunks can end
//! in the middle of a multi-byte UTF-8 sequence; [`ChunkDecoder`] holds such a
//! tail back until the next chunk completes it.
use bstr::ByteSlice;
use bytes::Bytes;

/// One fragment produced by a [`ChunkSource`](crate::ChunkSource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Already decoded text.
    Text(String),
    /// UTF-8 encoded bytes, possibly split inside a character.
    Bytes(Bytes),
}

impl From<&str> for Chunk {
    fn from(s: &str) -> Self {
        Chunk::Text(s.to_string())
    }
}

impl From<String> for Chunk {
    fn from(s: String) -> Self {
        Chunk::Text(s)
    }
}

impl From<Bytes> for Chunk {
    fn from(b: Bytes) -> Self {
        Chunk::Bytes(b)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(b: Vec<u8>) -> Self {
        Chunk::Bytes(Bytes::from(b))
    }
}

impl From<&'static [u8]> for Chunk {
    fn from(b: &'static [u8]) -> Self {
        Chunk::Bytes(Bytes::from_static(b))
    }
}

/// Streaming UTF-8 decoder.
///
/// Invalid sequences decode to U+FFFD. A sequence that is merely cut short is
/// held back until more bytes arrive, or until [`finish`](Self::finish)
/// reports it as U+FFFD.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    /// Creates a decoder with nothing held back.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a chunk to text, going through the byte decoder when needed.
    pub fn normalize(&mut self, chunk: Chunk) -> String {
        match chunk {
            Chunk::Text(text) if self.pending.is_empty() => text,
            Chunk::Text(text) => {
                let mut out = self.finish();
                out.push_str(&text);
                out
            }
            Chunk::Bytes(bytes) => self.decode(&bytes),
        }
    }

    /// Decodes as much of `bytes` as forms complete characters.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let joined;
        let input: &[u8] = if self.pending.is_empty() {
            bytes
        } else {
            let mut buf = core::mem::take(&mut self.pending);
            buf.extend_from_slice(bytes);
            joined = buf;
            &joined
        };

        let mut out = String::with_capacity(input.len());
        for chunk in ByteSlice::utf8_chunks(input) {
            out.push_str(chunk.valid());
            if chunk.incomplete() {
                self.pending.extend_from_slice(chunk.invalid());
            } else if !chunk.invalid().is_empty() {
                out.push(char::REPLACEMENT_CHARACTER);
            }
        }
        out
    }

    /// Flushes a held-back partial sequence as U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }

    /// Returns `true` if part of a character is waiting for more bytes.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Split `payload` into approximately equal-sized chunks without
/// breaking UTF-8 code points.
///
/// # Panics
///
/// Panics if `parts` is zero.
#[doc(hidden)]
#[must_use]
pub fn produce_chunks(payload: &str, parts: usize) -> Vec<&str> {
    assert!(parts > 0);
    let len = payload.len();
    let chunk_size = len.div_ceil(parts).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < len {
        let mut end = core::cmp::min(start + chunk_size, len);
        while end < len && !payload.is_char_boundary(end) {
            end += 1;
        }
        chunks.push(&payload[start..end]);
        start = end;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn decode_split(bytes: &[u8], at: &[usize]) -> String {
        let mut decoder = ChunkDecoder::new();
        let mut out = String::new();
        let mut start = 0;
        for &end in at {
            out.push_str(&decoder.decode(&bytes[start..end]));
            start = end;
        }
        out.push_str(&decoder.decode(&bytes[start..]));
        out.push_str(&decoder.finish());
        out
    }

    #[test]
    fn multibyte_character_split_at_every_byte() {
        let text = "a€😀b";
        let bytes = text.as_bytes();
        for i in 0..=bytes.len() {
            for j in i..=bytes.len() {
                assert_eq!(decode_split(bytes, &[i, j]), text, "split at {i}, {j}");
            }
        }
    }

    #[test]
    fn incomplete_tail_is_held_back() {
        let mut decoder = ChunkDecoder::new();
        assert_eq!(decoder.decode(b"x\xE2\x82"), "x");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(b"\xACy"), "€y");
        assert!(!decoder.has_pending());
    }

    #[rstest]
    #[case(b"a\xFFb", "a\u{FFFD}b")]
    #[case(b"\xC3(", "\u{FFFD}(")]
    #[case(b"ok\xE2\x82", "ok\u{FFFD}")]
    #[case(b"\xF0\x9F\x98", "\u{FFFD}")]
    fn invalid_and_truncated_input_becomes_replacement(#[case] bytes: &[u8], #[case] expected: &str) {
        let mut decoder = ChunkDecoder::new();
        let mut out = decoder.decode(bytes);
        out.push_str(&decoder.finish());
        assert_eq!(out, expected);
    }

    #[test]
    fn text_after_pending_bytes_flushes_replacement() {
        let mut decoder = ChunkDecoder::new();
        assert_eq!(decoder.normalize(Chunk::from(vec![b'1', 0xE2])), "1");
        assert_eq!(decoder.normalize(Chunk::from("2")), "\u{FFFD}2");
        assert_eq!(decoder.normalize(Chunk::from(&b"3"[..])), "3");
    }

    #[test]
    fn produce_chunks_respects_char_boundaries() {
        let payload = "ab€€cd";
        let chunks = produce_chunks(payload, 4);
        assert_eq!(chunks.concat(), payload);
        assert!(chunks.iter().all(|c| !c.is_empty()));
        assert_eq!(produce_chunks("", 3), Vec::<&str>::new());
    }
}
