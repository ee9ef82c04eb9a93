//! Text analysis for the keyword index.
//!
//! One standard analyzer: Unicode word segmentation, lowercased. Byte
//! offsets are kept on every token so the highlighter can map matches
//! back into the original text.

use unicode_segmentation::UnicodeSegmentation;

/// A token produced by [`tokenize`], with its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lowercased token text.
    pub text: String,
    /// Byte offset of the token start in the source text.
    pub start: usize,
    /// Byte offset one past the token end.
    pub end: usize,
}

/// Split text into lowercased word tokens with byte offsets.
pub fn tokenize(text: &str) -> Vec<Token> {
    text.unicode_word_indices()
        .map(|(start, word)| Token {
            text: word.to_lowercase(),
            start,
            end: start + word.len(),
        })
        .collect()
}

/// Split text into lowercased terms, discarding offsets.
pub fn terms(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases() {
        let tokens = tokenize("Rust Programming");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["rust", "programming"]);
    }

    #[test]
    fn test_tokenize_offsets_map_back() {
        let text = "find the needle here";
        let tokens = tokenize(text);
        let needle = tokens.iter().find(|t| t.text == "needle").unwrap();
        assert_eq!(&text[needle.start..needle.end], "needle");
    }

    #[test]
    fn test_punctuation_is_not_a_token() {
        assert_eq!(terms("well, actually!"), vec!["well", "actually"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(tokenize("").is_empty());
        assert!(terms("   ").is_empty());
    }
}
