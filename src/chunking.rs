// src/chunking.rs

use tracing::{debug, warn};

use crate::heuristics::split_sentences;
use crate::heuristics::text::truncate_chars;

/// Greedy packer: appends pieces to the current chunk while it stays within
/// `budget` characters.
struct Packer {
    budget: usize,
    chunks: Vec<String>,
    current: String,
    current_chars: usize,
}

impl Packer {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            chunks: Vec::new(),
            current: String::new(),
            current_chars: 0,
        }
    }

    fn flush(&mut self) {
        if !self.current.trim().is_empty() {
            self.chunks.push(std::mem::take(&mut self.current));
        }
        self.current.clear();
        self.current_chars = 0;
    }

    /// Append `piece` joined by `sep`; pieces must already fit the budget.
    fn push(&mut self, piece: &str, sep: &str) {
        let len = piece.chars().count();
        let extra = if self.current.is_empty() { 0 } else { sep.chars().count() };
        if self.current_chars + extra + len > self.budget {
            self.flush();
        }
        if !self.current.is_empty() {
            self.current.push_str(sep);
            self.current_chars += sep.chars().count();
        }
        self.current.push_str(piece);
        self.current_chars += len;
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}

fn hard_slices(text: &str, budget: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let head = truncate_chars(rest, budget);
        out.push(head);
        rest = &rest[head.len()..];
    }
    out
}

/// Split `text` into chunks of at most `budget` characters, preferring
/// paragraph breaks, then sentence breaks, then raw character slices.
/// Chunks past `max_chunks` are dropped.
pub fn chunk_text(text: &str, budget: usize, max_chunks: usize) -> Vec<String> {
    let budget = budget.max(1);
    if text.chars().count() <= budget {
        return vec![text.to_string()];
    }

    let mut packer = Packer::new(budget);
    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if para.chars().count() <= budget {
            packer.push(para, "\n\n");
            continue;
        }
        for sentence in split_sentences(para) {
            if sentence.chars().count() <= budget {
                packer.push(&sentence, " ");
            } else {
                for slice in hard_slices(&sentence, budget) {
                    packer.push(slice, "");
                }
            }
        }
    }

    let mut chunks = packer.finish();
    debug!(chunks = chunks.len(), budget, "Chunked oversized text");
    if chunks.len() > max_chunks {
        let dropped: usize = chunks[max_chunks..].iter().map(|c| c.chars().count()).sum();
        warn!(
            kept = max_chunks,
            dropped_chunks = chunks.len() - max_chunks,
            dropped_chars = dropped,
            "Chunk cap reached, trailing text dropped"
        );
        chunks.truncate(max_chunks);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(chunk_text("Total AED 500.", 100, 4), vec!["Total AED 500."]);
    }

    #[test]
    fn test_paragraphs_packed_within_budget() {
        let text = "First paragraph here.\n\nSecond one.\n\nThird paragraph is here.";
        let chunks = chunk_text(text, 40, 10);
        assert_eq!(
            chunks,
            vec!["First paragraph here.\n\nSecond one.", "Third paragraph is here."]
        );
    }

    #[test]
    fn test_long_paragraph_splits_on_sentences_then_chars() {
        let long_word = "x".repeat(25);
        let text = format!("Alpha beta gamma. Delta epsilon zeta. {long_word}");
        let chunks = chunk_text(&text, 20, 10);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20), "{chunks:?}");
        assert_eq!(chunks[0], "Alpha beta gamma.");
        // the over-long sentence is sliced on characters, keeping its space
        assert_eq!(chunks[1], "Delta epsilon zeta. ");
        assert_eq!(chunks.concat().matches('x').count(), 25);
    }

    #[test]
    fn test_chunk_cap_drops_tail() {
        let text = (0..10)
            .map(|i| format!("Paragraph number {i} with some text."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_text(&text, 40, 3);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].starts_with("Paragraph number 0"));
    }

    #[test]
    fn test_multibyte_hard_slices() {
        let text = "د".repeat(50);
        let chunks = chunk_text(&text, 16, 10);
        assert!(chunks.iter().all(|c| c.chars().count() <= 16));
        assert_eq!(chunks.iter().map(|c| c.chars().count()).sum::<usize>(), 50);
    }
}
