//! Overlapping fixed-size windows over long documents.
//!
//! The extractive model only sees a bounded context, so long documents are
//! scanned window by window. Window `i` starts at character `i * (size - overlap)`
//! and holds at most `size` characters; the overlap keeps an answer that
//! straddles one boundary whole in the neighbouring window.

use anyhow::{ensure, Result};

/// A window into the source text. Offsets are in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        ensure!(size > 0, "chunk size must be positive");
        ensure!(
            overlap < size,
            "overlap ({}) must be smaller than chunk size ({})",
            overlap,
            size
        );
        Ok(Self { size, overlap })
    }

    pub fn stride(&self) -> usize {
        self.size - self.overlap
    }

    /// Lazily walk `text`. Call again for a fresh pass.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            size: self.size,
            stride: self.stride(),
            index: 0,
            char_pos: 0,
            byte_pos: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    size: usize,
    stride: usize,
    index: usize,
    char_pos: usize,
    byte_pos: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.byte_pos >= self.text.len() {
            return None;
        }

        let rest = &self.text[self.byte_pos..];
        let (end_byte, taken) = advance(rest, self.size);
        let chunk = Chunk {
            index: self.index,
            start: self.char_pos,
            end: self.char_pos + taken,
            text: &rest[..end_byte],
        };

        let (stride_byte, _) = advance(rest, self.stride);
        self.byte_pos += stride_byte;
        self.char_pos += self.stride;
        self.index += 1;
        Some(chunk)
    }
}

/// Byte offset after `n` chars of `s` (clamped to the end), and how many
/// chars that actually covers.
fn advance(s: &str, n: usize) -> (usize, usize) {
    match s.char_indices().nth(n) {
        Some((byte, _)) => (byte, n),
        None => (s.len(), s.chars().count()),
    }
}
