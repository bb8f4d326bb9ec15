//! Simple text statistics carried on every signature.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Maximum number of keywords kept in [`TextFeatures::top_keywords`].
pub const MAX_KEYWORDS: usize = 10;

/// Keywords shorter than this (in characters) are ignored.
pub const MIN_KEYWORD_CHARS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFeatures {
    /// Length of the raw text in characters.
    pub length: u64,
    pub word_count: u64,
    pub avg_word_length: f64,
    pub unique_words: u64,
    /// Most frequent words of at least four characters, most frequent first,
    /// ties broken alphabetically.
    pub top_keywords: Vec<String>,
}

/// Split text into lower-cased alphanumeric words. Apostrophes stay inside words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

impl TextFeatures {
    pub fn from_text(text: &str, words: &[String]) -> Self {
        let word_count = words.len();
        let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
        let avg_word_length = if word_count == 0 {
            0.0
        } else {
            total_chars as f64 / word_count as f64
        };
        let unique_words = words.iter().collect::<BTreeSet<_>>().len();

        Self {
            length: text.chars().count() as u64,
            word_count: word_count as u64,
            avg_word_length,
            unique_words: unique_words as u64,
            top_keywords: top_keywords(words),
        }
    }
}

fn top_keywords(words: &[String]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for word in words {
        if word.chars().count() >= MIN_KEYWORD_CHARS {
            *counts.entry(word.as_str()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    // BTreeMap order is alphabetical, and the sort is stable
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(w, _)| w.to_string())
        .collect()
}
