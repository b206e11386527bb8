//! Sentence-aware text chunking for bounding model input.

use std::sync::LazyLock;

use regex::Regex;

/// Characters per chunk fed to the model.
pub const MODEL_CHUNK_CHARS: usize = 12_000;

/// Only this many leading chunks of a document reach the model.
pub const MODEL_CHUNK_LIMIT: usize = 3;

static SENTENCE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

/// Split `text` into chunks of at most `max_chunk_chars` characters.
///
/// Text that already fits is returned as a single chunk untouched. Otherwise
/// the text is split on runs of `.`, `!` and `?`, empty sentences are
/// dropped and the remaining ones are packed greedily, each terminated by
/// `". "`. A sentence longer than the limit becomes its own oversized chunk.
pub fn chunk_text(text: &str, max_chunk_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chunk_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in SENTENCE_BOUNDARY.split(text) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let sentence_len = sentence.chars().count();

        if current_len + sentence_len + 2 > max_chunk_chars && !current.is_empty() {
            chunks.push(current.trim().to_string());
            current.clear();
            current_len = 0;
        }

        current.push_str(sentence);
        current.push_str(". ");
        current_len += sentence_len + 2;
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

/// The bounded slice of a document the model sees: the first
/// [`MODEL_CHUNK_LIMIT`] chunks joined by blank lines.
pub fn model_input(text: &str) -> String {
    chunk_text(text, MODEL_CHUNK_CHARS)
        .into_iter()
        .take(MODEL_CHUNK_LIMIT)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_single_untouched_chunk() {
        let text = "Revenue grew! Margins held?  ";
        assert_eq!(chunk_text(text, 100), vec![text.to_string()]);
    }

    #[test]
    fn chunks_respect_limit() {
        let text = "Revenue increased by ten percent. ".repeat(200);
        let chunks = chunk_text(&text, 500);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 500, "chunk of {} chars", chunk.chars().count());
        }
    }

    #[test]
    fn every_sentence_survives_in_order() {
        let sentences: Vec<String> = (0..50).map(|i| format!("Sentence number {i} is here")).collect();
        let text = sentences.join("! ") + "?";
        let chunks = chunk_text(&text, 120);

        let rejoined = chunks.join(" ");
        let recovered: Vec<&str> = rejoined
            .split(". ")
            .map(|s| s.trim_end_matches('.'))
            .filter(|s| !s.is_empty())
            .collect();
        assert_eq!(recovered, sentences.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn oversized_sentence_is_kept_whole() {
        let long = "x".repeat(300);
        let text = format!("Short one. {long}. Another short one.");
        let chunks = chunk_text(&text, 100);
        assert!(chunks.iter().any(|c| c.contains(&long)));
        assert!(chunks.iter().filter(|c| c.chars().count() > 100).count() == 1);
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        let text = "Umsatz stieg um fünf Prozent. ".repeat(4);
        let limit = text.chars().count();
        assert_eq!(chunk_text(&text, limit).len(), 1);
    }

    #[test]
    fn model_input_keeps_only_first_three_chunks() {
        let sentence = format!("{}. ", "a".repeat(11_990));
        let text = sentence.repeat(5);
        let input = model_input(&text);
        assert_eq!(input.split("\n\n").count(), MODEL_CHUNK_LIMIT);
    }
}
