use proptest::prelude::*;
use treegpt_text_chunker::{chunk_text, TokenCounter, WhitespaceTokenCounter};

/// Rough subword counter: one token per started group of four characters per word.
fn subword_count(text: &str) -> usize {
    text.split_whitespace()
        .map(|word| word.chars().count().div_ceil(4))
        .sum()
}

proptest! {
    #[test]
    fn proptest_chunking_is_restartable(text in "[a-z ]{0,200}", max in 1usize..20) {
        let first = chunk_text(&text, max, &WhitespaceTokenCounter).unwrap();
        let second = chunk_text(&text, max, &WhitespaceTokenCounter).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn proptest_chunks_preserve_words(text in "[a-z\\n\\t ]{0,200}", max in 1usize..20) {
        let chunks = chunk_text(&text, max, &subword_count).unwrap();
        let original: Vec<&str> = text.split_whitespace().collect();
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        prop_assert_eq!(original.is_empty(), chunks.is_empty());
        prop_assert_eq!(rejoined, original);
    }

    #[test]
    fn proptest_boundary_within_one_word(text in "[a-z ]{1,300}", max in 1usize..12) {
        let counter = &subword_count;
        let chunks = chunk_text(&text, max, counter).unwrap();
        for (idx, chunk) in chunks.iter().enumerate() {
            let words: Vec<&str> = chunk.split_whitespace().collect();
            let without_last = words[..words.len() - 1].join(" ");
            // Dropping the last word always brings the chunk under the limit.
            prop_assert!(counter.count_tokens(&without_last).unwrap() < max);
            // Every chunk except the trailing one reached the limit.
            if idx + 1 < chunks.len() {
                prop_assert!(counter.count_tokens(chunk).unwrap() >= max);
            }
        }
    }
}
