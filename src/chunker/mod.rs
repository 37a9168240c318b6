
use serde::{Deserialize, Serialize};

/// How far back (and forward) from the proposed cut point to look for a
/// paragraph break. Heuristic; small enough that chunk sizes stay near the
/// target, large enough to catch most paragraph ends.
const PARAGRAPH_WINDOW: usize = 100;
/// How far past the proposed cut point a sentence end may still be used.
const SENTENCE_LOOKAHEAD: usize = 50;

/// Configuration for text chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in bytes
    pub chunk_size: usize,
    /// Overlap in bytes between adjacent chunks
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Split text into overlapping chunks, preferring paragraph and sentence
/// boundaries near the target size.
///
/// Walks the text with a start cursor. Each chunk ends `chunk_size` bytes past
/// its start, snapped backward to the nearest paragraph break (`\n\n`) within
/// [`PARAGRAPH_WINDOW`] of the cut point, or failing that to just after the
/// nearest sentence end (`. `) up to [`SENTENCE_LOOKAHEAD`] past it. The next
/// chunk starts `overlap` bytes before the previous end.
///
/// Chunks are emitted even when empty or whitespace-only; filtering is the
/// caller's responsibility. Requires `chunk_size > overlap`.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let ChunkingConfig {
        chunk_size,
        overlap,
    } = *config;
    debug_assert!(chunk_size > overlap, "chunk_size must exceed overlap");

    let len = text.len();
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let proposed = floor_char_boundary(text, (start + chunk_size).min(len));
        let mut end = proposed;

        if end < len {
            if let Some(break_pos) = find_paragraph_break(text, end) {
                end = break_pos;
            } else if let Some(sentence_end) = find_sentence_end(text, end) {
                end = sentence_end;
            }
            // A snap that lands at or before the start would produce an empty
            // chunk and stall the cursor; fall back to the fixed window.
            if end <= start {
                end = proposed;
            }
        }

        chunks.push(text.get(start..end).unwrap_or_default().to_string());

        if end >= len {
            break;
        }

        let next_start = floor_char_boundary(text, end.saturating_sub(overlap));
        if next_start <= start {
            break;
        }
        start = next_start;
    }

    chunks
}

/// Find the nearest paragraph break within `PARAGRAPH_WINDOW` of `end`,
/// searching backward from the far edge of the window.
fn find_paragraph_break(text: &str, end: usize) -> Option<usize> {
    let lo = floor_char_boundary(text, end.saturating_sub(PARAGRAPH_WINDOW));
    let hi = floor_char_boundary(text, (end + PARAGRAPH_WINDOW).min(text.len()));
    text.get(lo..hi)?.rfind("\n\n").map(|pos| lo + pos)
}

/// Find the nearest sentence terminator in `[end - PARAGRAPH_WINDOW,
/// end + SENTENCE_LOOKAHEAD]`, returning the position just after the period.
fn find_sentence_end(text: &str, end: usize) -> Option<usize> {
    let lo = floor_char_boundary(text, end.saturating_sub(PARAGRAPH_WINDOW));
    let hi = floor_char_boundary(text, (end + SENTENCE_LOOKAHEAD).min(text.len()));
    text.get(lo..hi)?.rfind(". ").map(|pos| lo + pos + 1)
}

/// Largest byte index `<= index` that lands on a UTF-8 char boundary.
fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut index = index;
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
