//! N-gram generation for fuzzy full-text search.
//!
//! Text is normalized (lowercased, compatibility-decomposed, diacritics dropped) and split
//! into words on every non-alphanumeric character. Depending on [`NgramMode`], the words
//! themselves and/or their character windows become n-grams:
//!
//! - "Café Münster" with `Characters`, 3..=3 → `caf`, `afe`, `mun`, `uns`, `nst`, ...
//! - "Café Münster" with `Words`, 3..=5 → `cafe` (`munster` is longer than 5)
//!
//! Because separators are never part of a word, quotes, semicolons and hyphens cannot
//! appear in any emitted n-gram.

use crate::config::NgramDefaults;
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Which n-grams to emit for each word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NgramMode {
    /// Whole words whose length is within bounds.
    Words,
    /// Character windows inside each word.
    Characters,
    /// Union of `Words` and `Characters`.
    All,
}

impl NgramMode {
    fn emits_words(self) -> bool {
        matches!(self, NgramMode::Words | NgramMode::All)
    }

    fn emits_characters(self) -> bool {
        matches!(self, NgramMode::Characters | NgramMode::All)
    }
}

/// Plain form of [`NgramConfig`] used for (de)serialization before validation.
///
/// Keys are camelCase like the documents it is embedded in; snake_case is still read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NgramConfigRepr {
    pub mode: NgramMode,
    #[serde(alias = "min_length")]
    pub min_length: usize,
    #[serde(alias = "max_length")]
    pub max_length: usize,
}

/// Immutable n-gram configuration of one record type.
///
/// Lengths are counted in characters after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "NgramConfigRepr", into = "NgramConfigRepr")]
pub struct NgramConfig {
    mode: NgramMode,
    min_length: usize,
    max_length: usize,
}

impl NgramConfig {
    pub const DEFAULT: NgramConfig = NgramConfig {
        mode: NgramMode::All,
        min_length: NgramDefaults::MIN_LENGTH,
        max_length: NgramDefaults::MAX_LENGTH,
    };

    /// Const constructor for static record configuration; invalid bounds fail at compile
    /// time when used in a const context.
    pub const fn of(mode: NgramMode, min_length: usize, max_length: usize) -> Self {
        assert!(min_length >= 1, "minimum n-gram length must be at least 1");
        assert!(min_length <= max_length, "minimum n-gram length exceeds maximum");
        assert!(
            max_length <= NgramDefaults::MAX_LENGTH_LIMIT,
            "maximum n-gram length exceeds the limit"
        );
        Self {
            mode,
            min_length,
            max_length,
        }
    }

    /// Create a validated configuration.
    pub fn new(mode: NgramMode, min_length: usize, max_length: usize) -> Result<Self> {
        if min_length == 0 {
            return Err(SearchError::config("minimum n-gram length must be at least 1"));
        }
        if min_length > max_length {
            return Err(SearchError::config(format!(
                "minimum n-gram length {} exceeds maximum {}",
                min_length, max_length
            )));
        }
        if max_length > NgramDefaults::MAX_LENGTH_LIMIT {
            return Err(SearchError::config(format!(
                "maximum n-gram length {} exceeds the limit of {}",
                max_length,
                NgramDefaults::MAX_LENGTH_LIMIT
            )));
        }
        Ok(Self {
            mode,
            min_length,
            max_length,
        })
    }

    pub fn mode(&self) -> NgramMode {
        self.mode
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Generate n-grams of `text` with this configuration.
    pub fn generate(&self, text: &str) -> NgramSet {
        generate(text, self)
    }
}

impl Default for NgramConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<NgramConfigRepr> for NgramConfig {
    type Error = SearchError;

    fn try_from(repr: NgramConfigRepr) -> Result<Self> {
        NgramConfig::new(repr.mode, repr.min_length, repr.max_length)
    }
}

impl From<NgramConfig> for NgramConfigRepr {
    fn from(config: NgramConfig) -> Self {
        NgramConfigRepr {
            mode: config.mode,
            min_length: config.min_length,
            max_length: config.max_length,
        }
    }
}

/// De-duplicated n-grams in first-occurrence order.
///
/// Iteration order is reproducible for equal inputs, which keeps blob truncation
/// deterministic. Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct NgramSet {
    ordered: Vec<String>,
    seen: HashSet<String>,
}

impl NgramSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an n-gram; returns false if it was already present.
    pub fn insert(&mut self, ngram: String) -> bool {
        if self.seen.contains(&ngram) {
            return false;
        }
        self.seen.insert(ngram.clone());
        self.ordered.push(ngram);
        true
    }

    pub fn contains(&self, ngram: &str) -> bool {
        self.seen.contains(ngram)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.ordered.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ordered
    }

    pub fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

impl PartialEq for NgramSet {
    fn eq(&self, other: &Self) -> bool {
        self.seen == other.seen
    }
}

impl Eq for NgramSet {}

impl<'a> IntoIterator for &'a NgramSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ordered.iter()
    }
}

impl FromIterator<String> for NgramSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = NgramSet::new();
        for ngram in iter {
            set.insert(ngram);
        }
        set
    }
}

/// Normalize text for n-gram extraction.
///
/// Lowercases, decomposes (NFKD), drops combining marks and turns every
/// non-alphanumeric character into a space.
pub fn normalize(text: &str) -> String {
    let lowered: String = text.chars().flat_map(char::to_lowercase).collect();
    lowered
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}

/// Generate the n-grams of `text`.
///
/// Blank input yields an empty set. Words are visited in text order; for each word the
/// whole word comes first (when the mode emits words), then its windows by ascending
/// length and position.
pub fn generate(text: &str, config: &NgramConfig) -> NgramSet {
    let mut ngrams = NgramSet::new();
    if text.trim().is_empty() {
        return ngrams;
    }

    let normalized = normalize(text);
    for word in normalized.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        let word_len = chars.len();

        if config.mode.emits_words()
            && word_len >= config.min_length
            && word_len <= config.max_length
        {
            ngrams.insert(word.to_string());
        }

        if config.mode.emits_characters() {
            let longest = config.max_length.min(word_len);
            for n in config.min_length..=longest {
                for window in chars.windows(n) {
                    ngrams.insert(window.iter().collect());
                }
            }
        }
    }

    ngrams
}
