//! Merging timestamped segments into readable chunks
//!
//! Segments arrive at whatever granularity the source produced, from a word
//! to a paragraph. The chunker folds them into chunks bounded by:
//! - the end of the input
//! - a time gap larger than `max_time_gap_seconds` since the chunk started
//! - accumulated size above `soft_char_limit`, split at the last sentence
//!   terminator of the segment that crossed it, or unconditionally at
//!   `hard_char_limit`

use crate::config::ChunkingConfig;
use crate::extraction::TranscriptSegment;
use crate::text::collapse_newlines;
use serde::{Deserialize, Serialize};

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// A chunk of transcript text and the second it starts at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedChunk {
    pub start: u64,
    pub text: String,
}

/// Tail of a split segment, carried into the next chunk
struct Fragment {
    start: u64,
    text: String,
}

/// Per-run accumulation state
#[derive(Default)]
struct OpenChunk {
    start: Option<u64>,
    texts: Vec<String>,
    char_count: usize,
}

impl OpenChunk {
    fn push(&mut self, start: u64, text: &str) {
        self.start.get_or_insert(start);
        self.char_count += text.chars().count();
        self.texts.push(text.to_string());
    }

    fn elapsed(&self, at: u64) -> u64 {
        at.saturating_sub(self.start.unwrap_or(at))
    }

    fn replace_last(&mut self, text: &str) {
        if let Some(last) = self.texts.last_mut() {
            *last = text.to_string();
        }
    }

    fn finish(&mut self) -> ProcessedChunk {
        let chunk = std::mem::take(self);
        ProcessedChunk {
            start: chunk.start.unwrap_or_default(),
            text: collapse_newlines(&chunk.texts.join(" ")),
        }
    }
}

/// Deterministic segment-to-chunk folding
#[derive(Debug, Clone, Copy, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Fold ordered segments into chunks. Segments with blank text are skipped.
    pub fn chunk(&self, segments: &[TranscriptSegment]) -> Vec<ProcessedChunk> {
        let segments: Vec<&TranscriptSegment> = segments.iter().filter(|s| !s.text.trim().is_empty()).collect();

        let mut chunks = Vec::new();
        let mut open = OpenChunk::default();
        let mut pending: Option<Fragment> = None;

        for (index, segment) in segments.iter().enumerate() {
            if let Some(fragment) = pending.take() {
                open.push(fragment.start, &fragment.text);
            }

            open.push(segment.start, &segment.text);

            if index + 1 == segments.len() {
                chunks.push(open.finish());
                continue;
            }

            if open.elapsed(segment.start) > self.config.max_time_gap_seconds {
                chunks.push(open.finish());
                continue;
            }

            if open.char_count <= self.config.soft_char_limit {
                continue;
            }

            if open.char_count >= self.config.hard_char_limit {
                chunks.push(open.finish());
                continue;
            }

            // Over the soft limit: close at the segment's last sentence end, if it has one
            if let Some((head, tail)) = split_after_last_sentence(&segment.text) {
                if !tail.is_empty() {
                    open.replace_last(head);
                    pending = Some(Fragment {
                        start: segment.start,
                        text: tail.to_string(),
                    });
                }
                chunks.push(open.finish());
            }
        }

        chunks
    }
}

/// Split after the last terminator; the tail is trimmed and may be empty
fn split_after_last_sentence(text: &str) -> Option<(&str, &str)> {
    let index = text.rfind(SENTENCE_TERMINATORS)?;
    let (head, tail) = text.split_at(index + 1);
    Some((head, tail.trim()))
}
