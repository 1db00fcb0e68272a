use regex::Regex;
use std::sync::LazyLock;

use crate::constants::{MIN_CONTENT_TOKEN_LEN, MIN_KEYWORD_LEN, STOP_WORDS};

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

/// Split text into lowercase word tokens on non-word boundaries.
/// No stemming, no stop-word removal.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    NON_WORD
        .split(&lower)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tokens that take part in content similarity: longer than 3 chars.
pub fn content_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() > MIN_CONTENT_TOKEN_LEN)
        .collect()
}

/// Tokens eligible as keywords: at least 3 chars and not a stop word.
pub fn keyword_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() >= MIN_KEYWORD_LEN && !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokenize() {
        assert_eq!(tokenize("Hello, world!"), vec!["hello", "world"]);
    }

    #[test]
    fn test_apostrophe_splits() {
        assert_eq!(tokenize("Don't stop"), vec!["don", "t", "stop"]);
    }

    #[test]
    fn test_underscore_and_digits_are_word_chars() {
        assert_eq!(tokenize("snake_case v2 42"), vec!["snake_case", "v2", "42"]);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  \t\n ").is_empty());
        assert!(tokenize("!!! ???").is_empty());
    }

    #[test]
    fn test_content_tokens_length_rule() {
        assert_eq!(
            content_tokens("The cat sat upon a warm mat"),
            vec!["upon", "warm"]
        );
    }

    #[test]
    fn test_content_tokens_count_chars_not_bytes() {
        assert_eq!(content_tokens("été café"), vec!["café"]);
    }

    #[test]
    fn test_keyword_tokens_drop_stop_words() {
        assert_eq!(
            keyword_tokens("this fox and that dog went there"),
            vec!["fox", "dog", "went"]
        );
    }
}
