//! Sentence boundaries and word counting across the supported scripts.

/// Latin, CJK, Arabic and Devanagari sentence terminators.
pub const SENTENCE_TERMINATORS: [char; 8] = ['.', '!', '?', '。', '！', '？', '؟', '।'];

/// Devanagari double danda, also a terminator.
const DOUBLE_DANDA: char = '॥';

pub fn is_sentence_terminator(c: char) -> bool {
    SENTENCE_TERMINATORS.contains(&c) || c == DOUBLE_DANDA
}

/// Byte offsets just past each sentence boundary in `text`.
///
/// A boundary is a run of terminators followed by whitespace or by the end of
/// `text`. When `text` is a prefix of a longer stream, pass
/// `at_end_of_input = false` so a trailing terminator is not yet treated as a
/// boundary (the next fragment may continue it, as in "3." + "14").
pub fn sentence_boundaries(text: &str, at_end_of_input: bool) -> Vec<usize> {
    let mut boundaries = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !is_sentence_terminator(c) {
            continue;
        }
        // Swallow the rest of a terminator run ("?!", "...").
        while let Some(&(_, next)) = chars.peek() {
            if is_sentence_terminator(next) {
                chars.next();
            } else {
                break;
            }
        }
        match chars.peek() {
            Some(&(idx, next)) if next.is_whitespace() => boundaries.push(idx),
            None if at_end_of_input => boundaries.push(text.len()),
            _ => {}
        }
    }
    boundaries
}

/// Han ideographs, each counted as one word.
fn is_ideograph(c: char) -> bool {
    matches!(c, '\u{4e00}'..='\u{9fff}' | '\u{3400}'..='\u{4dbf}' | '\u{f900}'..='\u{faff}')
}

/// Byte spans of the words in `text`.
///
/// Words are whitespace-separated runs that contain at least one letter or
/// digit; every Han ideograph is a word of its own.
pub fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut run: Option<(usize, bool)> = None;

    let close = |spans: &mut Vec<(usize, usize)>, run: &mut Option<(usize, bool)>, end: usize| {
        if let Some((start, true)) = run.take() {
            spans.push((start, end));
        }
    };

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            close(&mut spans, &mut run, i);
        } else if is_ideograph(c) {
            close(&mut spans, &mut run, i);
            spans.push((i, i + c.len_utf8()));
        } else {
            let entry = run.get_or_insert((i, false));
            entry.1 |= c.is_alphanumeric();
        }
    }
    close(&mut spans, &mut run, text.len());
    spans
}

pub fn word_count(text: &str) -> usize {
    word_spans(text).len()
}
