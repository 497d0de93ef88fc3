use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\p{L}\p{N}\s]+").expect("valid punctuation pattern");

    pub static ref STOPWORDS: HashSet<&'static str> = [
        "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be",
        "been", "being", "between", "both", "but", "by", "can", "compared", "could", "did",
        "do", "does", "during", "each", "for", "from", "had", "has", "have", "how", "if",
        "in", "into", "is", "it", "its", "may", "more", "most", "of", "on", "or", "other",
        "our", "over", "such", "than", "that", "the", "their", "them", "then", "there",
        "these", "they", "this", "those", "through", "to", "under", "using", "various",
        "was", "we", "were", "what", "when", "where", "which", "while", "who", "will",
        "with", "within", "without", "study", "studied",
    ]
    .into_iter()
    .collect();
}


#[inline]
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}


#[inline]
pub fn safe_truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Lower-cases, replaces punctuation with spaces and collapses whitespace.
pub fn normalize_label(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}


pub fn tokenize(text: &str) -> Vec<String> {
    normalize_label(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}


#[inline]
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}


pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Keeps at most `max_words` whitespace-separated words.
pub fn cap_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}
