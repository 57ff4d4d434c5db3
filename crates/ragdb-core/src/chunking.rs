//! Recursive character splitter.
//!
//! Text is split on the coarsest separator present (`"\n\n"`, then `"\n"`,
//! then `" "`, then single characters); pieces that are still too long are
//! split again with the finer separators. Neighbouring pieces are then merged
//! back into chunks of at most `chunk_size` characters, each chunk carrying up
//! to `chunk_overlap` characters of trailing context from the previous one.
//! Lengths are counted in `char`s, never bytes.
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP: usize = 120;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self { Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP } }
}

/// A chunk plus its character offsets in the text it was cut from, when the
/// chunk occurs there verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub span: Option<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: ChunkingConfig,
}

impl TextSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::invalid("chunk size", "0"));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(Error::invalid(
                "chunk overlap",
                format!("{} (must be smaller than chunk size {})", config.chunk_overlap, config.chunk_size),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig { self.config }

    pub fn split(&self, text: &str) -> Vec<String> { self.split_recursive(text, &SEPARATORS) }

    /// Like [`split`](Self::split) but also locates each chunk in `text`.
    pub fn split_located(&self, text: &str) -> Vec<Chunk> {
        let mut search_from = 0usize;
        self.split(text)
            .into_iter()
            .map(|chunk| {
                let span = text[search_from..].find(chunk.as_str()).map(|rel| {
                    let start_byte = search_from + rel;
                    // Overlapping chunks start after the previous chunk's start.
                    search_from = next_char_boundary(text, start_byte);
                    let start = text[..start_byte].chars().count();
                    (start, start + char_len(&chunk))
                });
                Chunk { text: chunk, span }
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators.iter().position(|sep| sep.is_empty() || text.contains(*sep)).unwrap_or(separators.len() - 1);
        let separator = separators[position];
        let finer = &separators[position + 1..];

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.config.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }
        chunks
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let ChunkingConfig { chunk_size, chunk_overlap } = self.config;
        let sep_len = char_len(separator);
        let joiner = |current: &VecDeque<&str>| if current.is_empty() { 0 } else { sep_len };

        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;
        for piece in pieces {
            let len = char_len(piece);
            if total + len + joiner(&current) > chunk_size && !current.is_empty() {
                push_joined(&mut chunks, &current, separator);
                while total > chunk_overlap || (total > 0 && total + len + joiner(&current) > chunk_size) {
                    let had_more = current.len() > 1;
                    let Some(first) = current.pop_front() else { break };
                    total -= char_len(first) + if had_more { sep_len } else { 0 };
                }
            }
            current.push_back(piece);
            total += len + if current.len() > 1 { sep_len } else { 0 };
        }
        push_joined(&mut chunks, &current, separator);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, current: &VecDeque<&str>, separator: &str) {
    let joined = current.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize { s.chars().count() }

fn next_char_boundary(text: &str, byte: usize) -> usize {
    text[byte..].chars().next().map_or(text.len(), |c| byte + c.len_utf8())
}
