//! Post hoc word ceiling for the spoken answer.

use porter_core::text::{sentence_boundaries, word_spans};

/// Cut `text` to at most `limit` words.
///
/// Prefers the last sentence boundary inside the limit (a terminator run
/// followed by whitespace, so "91.5" is never split); without one, cuts right
/// after the `limit`-th word (keeping punctuation glued to it). Returns the
/// text and whether it was shortened.
pub fn enforce_word_limit(text: &str, limit: usize) -> (String, bool) {
    let spans = word_spans(text);
    if spans.len() <= limit {
        return (text.to_string(), false);
    }
    if limit == 0 {
        return (String::new(), true);
    }

    let (_, last_end) = spans[limit - 1];
    let word_end = extend_over_punctuation(text, last_end);

    let cut = sentence_boundaries(text, true)
        .into_iter()
        .take_while(|&end| end <= word_end)
        .last()
        .unwrap_or(word_end);

    let truncated = text[..cut].trim_end().to_string();
    tracing::warn!(
        words = spans.len(),
        limit,
        kept_bytes = truncated.len(),
        "Response exceeded word ceiling, truncated"
    );
    (truncated, true)
}

fn extend_over_punctuation(text: &str, from: usize) -> usize {
    text[from..]
        .char_indices()
        .find(|(_, c)| c.is_whitespace() || c.is_alphanumeric())
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}
