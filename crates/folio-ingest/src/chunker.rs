//! Word-window chunker with sentence-aware cut extension.

use crate::error::IngestError;
use crate::types::ChunkSpan;

/// How many words past the target boundary a cut may slide to reach the end
/// of a sentence.
const SENTENCE_LOOKAHEAD_WORDS: usize = 20;

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub target_size_words: usize,
    pub overlap_words: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_size_words: 250,
            overlap_words: 50,
        }
    }
}

impl ChunkerConfig {
    /// # Errors
    ///
    /// Returns `IngestError::Config` unless `0 < overlap_words < target_size_words`.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.target_size_words == 0 {
            return Err(IngestError::Config(
                "target_size_words must be positive".into(),
            ));
        }
        if self.overlap_words == 0 {
            return Err(IngestError::Config("overlap_words must be positive".into()));
        }
        if self.overlap_words >= self.target_size_words {
            return Err(IngestError::Config(format!(
                "overlap_words ({}) must be smaller than target_size_words ({})",
                self.overlap_words, self.target_size_words
            )));
        }
        Ok(())
    }
}

/// Split `text` into overlapping word-window spans.
///
/// Lazy and restartable: the returned iterator borrows `text` and can be
/// cloned to replay from the start. Whitespace-only input yields an empty
/// sequence.
///
/// # Errors
///
/// Returns `IngestError::Config` if the config fails validation.
pub fn chunk<'a>(text: &'a str, config: &ChunkerConfig) -> Result<Chunks<'a>, IngestError> {
    config.validate()?;
    Ok(Chunks {
        words: text.split_whitespace().collect(),
        target: config.target_size_words,
        overlap: config.overlap_words,
        start: 0,
        index: 0,
    })
}

#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    words: Vec<&'a str>,
    target: usize,
    overlap: usize,
    start: usize,
    index: usize,
}

impl Iterator for Chunks<'_> {
    type Item = ChunkSpan;

    fn next(&mut self) -> Option<ChunkSpan> {
        if self.start >= self.words.len() {
            return None;
        }

        let mut end = (self.start + self.target).min(self.words.len());
        // A cut mid-sentence slides forward to the nearest sentence end
        // within the lookahead window; otherwise it stays at the word boundary.
        if end < self.words.len() && !ends_sentence(self.words[end - 1]) {
            let horizon = (end + SENTENCE_LOOKAHEAD_WORDS).min(self.words.len());
            if let Some(pos) = (end..horizon).find(|&i| ends_sentence(self.words[i])) {
                end = pos + 1;
            }
        }

        let span = ChunkSpan {
            index: self.index,
            text: self.words[self.start..end].join(" "),
            word_count: end - self.start,
            overlap_start: if self.index == 0 { 0 } else { self.overlap },
        };

        self.index += 1;
        self.start = if end >= self.words.len() {
            self.words.len()
        } else {
            end - self.overlap
        };
        Some(span)
    }
}

fn ends_sentence(word: &str) -> bool {
    word.trim_end_matches(['"', '\'', ')', ']', '\u{201d}', '\u{2019}'])
        .ends_with(['.', '!', '?'])
}

/// Collapse runs of spaces and tabs, strip control characters, preserve
/// newlines. Runs before metadata extraction and chunking.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        match ch {
            '\n' => {
                while out.ends_with(' ') {
                    out.pop();
                }
                out.push('\n');
                pending_space = false;
            }
            ' ' | '\t' => pending_space = true,
            c if c.is_control() => {}
            c => {
                if pending_space && !out.is_empty() && !out.ends_with('\n') {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn empty_input_yields_nothing() {
        let spans: Vec<_> = chunk("", &ChunkerConfig::default()).unwrap().collect();
        assert!(spans.is_empty());
    }

    #[test]
    fn whitespace_only_yields_nothing() {
        let spans: Vec<_> = chunk("  \n\t  ", &ChunkerConfig::default())
            .unwrap()
            .collect();
        assert!(spans.is_empty());
    }

    #[test]
    fn short_input_single_span() {
        let spans: Vec<_> = chunk("just a few words here", &ChunkerConfig::default())
            .unwrap()
            .collect();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].index, 0);
        assert_eq!(spans[0].word_count, 5);
        assert_eq!(spans[0].overlap_start, 0);
    }

    #[test]
    fn six_hundred_twenty_words_at_default_config() {
        let text = words(620);
        let spans: Vec<_> = chunk(&text, &ChunkerConfig::default()).unwrap().collect();
        assert_eq!(spans.len(), 3);

        assert_eq!(spans[0].word_count, 250);
        assert!(spans[0].text.starts_with("w0 "));
        assert!(spans[0].text.ends_with(" w249"));

        assert_eq!(spans[1].word_count, 250);
        assert!(spans[1].text.starts_with("w200 "));
        assert!(spans[1].text.ends_with(" w449"));
        assert_eq!(spans[1].overlap_start, 50);

        assert_eq!(spans[2].word_count, 220);
        assert!(spans[2].text.starts_with("w400 "));
        assert!(spans[2].text.ends_with(" w619"));
    }

    #[test]
    fn cut_extends_to_sentence_end() {
        let config = ChunkerConfig {
            target_size_words: 5,
            overlap_words: 1,
        };
        let spans: Vec<_> = chunk("one two three four five six ends. seven eight", &config)
            .unwrap()
            .collect();
        assert_eq!(spans[0].text, "one two three four five six ends.");
        assert_eq!(spans[0].word_count, 7);
        assert_eq!(spans[1].text, "ends. seven eight");
    }

    #[test]
    fn cut_on_sentence_boundary_not_extended() {
        let config = ChunkerConfig {
            target_size_words: 3,
            overlap_words: 1,
        };
        let spans: Vec<_> = chunk("one two three. four five", &config).unwrap().collect();
        assert_eq!(spans[0].text, "one two three.");
    }

    #[test]
    fn no_sentence_end_in_lookahead_cuts_at_boundary() {
        let config = ChunkerConfig {
            target_size_words: 5,
            overlap_words: 1,
        };
        let text = words(40);
        let spans: Vec<_> = chunk(&text, &config).unwrap().collect();
        assert_eq!(spans[0].word_count, 5);
    }

    #[test]
    fn closing_quote_counts_as_sentence_end() {
        assert!(ends_sentence("done.\""));
        assert!(ends_sentence("done.)"));
        assert!(!ends_sentence("done,"));
    }

    #[test]
    fn restartable_via_clone() {
        let text = words(600);
        let chunks = chunk(&text, &ChunkerConfig::default()).unwrap();
        let first: Vec<_> = chunks.clone().collect();
        let second: Vec<_> = chunks.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn overlap_must_be_smaller_than_target() {
        let config = ChunkerConfig {
            target_size_words: 50,
            overlap_words: 50,
        };
        assert!(matches!(chunk("text", &config), Err(IngestError::Config(_))));
    }

    #[test]
    fn zero_target_rejected() {
        let config = ChunkerConfig {
            target_size_words: 0,
            overlap_words: 0,
        };
        assert!(matches!(chunk("text", &config), Err(IngestError::Config(_))));
    }

    #[test]
    fn clean_text_collapses_spaces_and_tabs() {
        assert_eq!(clean_text("a  b\t\tc"), "a b c");
    }

    #[test]
    fn clean_text_preserves_newlines() {
        assert_eq!(clean_text("a  \nb"), "a\nb");
        assert_eq!(clean_text("a\r\nb"), "a\nb");
    }

    #[test]
    fn clean_text_strips_control_chars() {
        assert_eq!(clean_text("a\u{0}b\u{7}c"), "abc");
    }

    mod proptest_chunker {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_panics(
                text in "\\PC{0,2000}",
                target in 1usize..300,
                overlap in 0usize..100,
            ) {
                let config = ChunkerConfig {
                    target_size_words: target,
                    overlap_words: overlap,
                };
                if let Ok(chunks) = chunk(&text, &config) {
                    let _: Vec<_> = chunks.collect();
                }
            }

            #[test]
            fn spans_cover_every_word(
                n in 1usize..800,
                target in 2usize..300,
                overlap in 1usize..100,
            ) {
                prop_assume!(overlap < target);
                let text = words(n);
                let config = ChunkerConfig {
                    target_size_words: target,
                    overlap_words: overlap,
                };
                let spans: Vec<_> = chunk(&text, &config).unwrap().collect();

                prop_assert!(!spans.is_empty());
                // First span starts at word 0; every later span repeats
                // exactly `overlap` words from its predecessor, so the
                // non-overlapping tails concatenate back to the input.
                let mut covered: Vec<&str> = Vec::new();
                for span in &spans {
                    let span_words: Vec<&str> = span.text.split_whitespace().collect();
                    prop_assert_eq!(span_words.len(), span.word_count);
                    covered.extend(&span_words[span.overlap_start..]);
                }
                let expected: Vec<String> = (0..n).map(|i| format!("w{i}")).collect();
                prop_assert_eq!(covered, expected);
            }

            #[test]
            fn consecutive_spans_share_exact_overlap(
                n in 1usize..800,
                target in 2usize..300,
                overlap in 1usize..100,
            ) {
                prop_assume!(overlap < target);
                let text = words(n);
                let config = ChunkerConfig {
                    target_size_words: target,
                    overlap_words: overlap,
                };
                let spans: Vec<_> = chunk(&text, &config).unwrap().collect();

                for pair in spans.windows(2) {
                    let prev: Vec<&str> = pair[0].text.split_whitespace().collect();
                    let next: Vec<&str> = pair[1].text.split_whitespace().collect();
                    prop_assert_eq!(pair[1].overlap_start, overlap);
                    prop_assert_eq!(
                        &prev[prev.len() - overlap..],
                        &next[..overlap]
                    );
                }
            }

            #[test]
            fn indices_sequential(
                n in 1usize..800,
                target in 2usize..300,
            ) {
                let text = words(n);
                let config = ChunkerConfig {
                    target_size_words: target,
                    overlap_words: 1,
                };
                let spans: Vec<_> = chunk(&text, &config).unwrap().collect();
                for (i, span) in spans.iter().enumerate() {
                    prop_assert_eq!(span.index, i);
                }
            }

            #[test]
            fn idempotent(text in "[a-z.! ]{0,1500}") {
                let config = ChunkerConfig::default();
                let a: Vec<_> = chunk(&text, &config).unwrap().collect();
                let b: Vec<_> = chunk(&text, &config).unwrap().collect();
                prop_assert_eq!(a, b);
            }
        }
    }
}
