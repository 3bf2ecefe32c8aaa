//! Incremental sentence segmentation of a live token stream.

use porter_core::text::sentence_boundaries;

/// Accumulates text fragments and releases complete sentences.
///
/// A sentence ends at a terminator run followed by whitespace. Abbreviations
/// are not special-cased, so "Dr. Tan" splits after "Dr.".
#[derive(Debug, Default)]
pub struct SentenceSegmenter {
    buffer: String,
}

impl SentenceSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment; returns every sentence completed by it, in order.
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        self.buffer.push_str(fragment);

        let boundaries = sentence_boundaries(&self.buffer, false);
        let Some(&last) = boundaries.last() else {
            return Vec::new();
        };

        let mut sentences = Vec::with_capacity(boundaries.len());
        let mut start = 0;
        for end in boundaries {
            let sentence = self.buffer[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = end;
        }

        self.buffer = self.buffer[last..].trim_start().to_string();
        sentences
    }

    /// End of stream: the remaining text, if any, is the final sentence.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = rest.trim();
        (!rest.is_empty()).then(|| rest.to_string())
    }

    /// Text held back waiting for a boundary.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(fragments: &[&str]) -> Vec<String> {
        let mut segmenter = SentenceSegmenter::new();
        let mut out: Vec<String> = fragments.iter().flat_map(|f| segmenter.push(f)).collect();
        out.extend(segmenter.finish());
        out
    }

    #[test]
    fn test_sentences_split_across_fragments() {
        let out = segment(&["Berth 7 is ", "busy. The queue", " is short! Any ", "questions?"]);
        assert_eq!(
            out,
            vec!["Berth 7 is busy.", "The queue is short!", "Any questions?"]
        );
    }

    #[test]
    fn test_each_sentence_is_its_own_unit() {
        let mut segmenter = SentenceSegmenter::new();
        let out = segmenter.push("One. Two. Three");
        assert_eq!(out, vec!["One.", "Two."]);
        assert_eq!(segmenter.pending(), "Three");
    }

    #[test]
    fn test_decimal_split_across_fragments() {
        let out = segment(&["Utilization is 91", ".", "5 percent. Done"]);
        assert_eq!(out, vec!["Utilization is 91.5 percent.", "Done"]);
    }

    #[test]
    fn test_trailing_text_flushed_without_terminator() {
        let mut segmenter = SentenceSegmenter::new();
        assert!(segmenter.push("no terminator here").is_empty());
        assert_eq!(segmenter.finish().as_deref(), Some("no terminator here"));
        assert_eq!(segmenter.finish(), None);
    }

    #[test]
    fn test_non_latin_scripts() {
        let out = segment(&["港口很忙。 ", "船很多。"]);
        assert_eq!(out, vec!["港口很忙。", "船很多。"]);

        let out = segment(&["هل الميناء مزدحم؟ ", "نعم"]);
        assert_eq!(out, vec!["هل الميناء مزدحم؟", "نعم"]);

        let out = segment(&["बंदरगाह व्यस्त है। ", "ठीक॥"]);
        assert_eq!(out, vec!["बंदरगाह व्यस्त है।", "ठीक॥"]);
    }

    #[test]
    fn test_whitespace_only_stream() {
        assert!(segment(&["   ", "\n"]).is_empty());
    }
}
