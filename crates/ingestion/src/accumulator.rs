//! EOT-delimited frame accumulation
//!
//! Bytes arrive in arbitrary chunks. Everything up to and including an EOT is
//! one transmission; bytes after it start the next one.

use bytes::BytesMut;
use contracts::EOT;

/// A frame cut from the byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Text with invalid UTF-8 sequences removed
    pub text: String,
    /// Number of bytes dropped during decoding
    pub dropped_bytes: usize,
}

/// Buffers listener input until an EOT arrives
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    buf: BytesMut,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every frame it completes, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<DecodedFrame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == EOT) {
            let raw = self.buf.split_to(pos + 1);
            frames.push(decode_permissive(&raw));
        }
        frames
    }

    /// Bytes waiting for an EOT
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drop the unterminated tail, returning its length
    pub fn discard(&mut self) -> usize {
        let len = self.buf.len();
        self.buf.clear();
        len
    }
}

/// Decode as UTF-8, skipping invalid sequences instead of replacing them
fn decode_permissive(raw: &[u8]) -> DecodedFrame {
    let mut text = String::with_capacity(raw.len());
    let mut dropped_bytes = 0;
    for chunk in raw.utf8_chunks() {
        text.push_str(chunk.valid());
        dropped_bytes += chunk.invalid().len();
    }
    DecodedFrame {
        text,
        dropped_bytes,
    }
}
