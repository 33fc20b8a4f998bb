//! BIP-39 Wordlists
//!
//! A `Wordlist` is an immutable view over one of the 2048-word lists
//! compiled into the `bip39` crate. It is created once from configuration
//! and handed to whoever needs word lookups; nothing reads it as ambient
//! global state.

use bip39::Language;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

use crate::error::{ImportError, ImportResult};

/// Minimum number of typed characters before the word helper is offered
pub const MIN_LETTERS_TO_SHOW_WORD_SELECTOR: usize = 2;

/// Upper bound on helper suggestions for a single prefix
pub const MAX_SUGGESTIONS: usize = 8;

/// Wordlist languages selectable in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WordlistLanguage {
    #[default]
    English,
    SimplifiedChinese,
    TraditionalChinese,
    Czech,
    French,
    Italian,
    Japanese,
    Korean,
    Spanish,
}

impl WordlistLanguage {
    pub fn to_bip39(self) -> Language {
        match self {
            WordlistLanguage::English => Language::English,
            WordlistLanguage::SimplifiedChinese => Language::SimplifiedChinese,
            WordlistLanguage::TraditionalChinese => Language::TraditionalChinese,
            WordlistLanguage::Czech => Language::Czech,
            WordlistLanguage::French => Language::French,
            WordlistLanguage::Italian => Language::Italian,
            WordlistLanguage::Japanese => Language::Japanese,
            WordlistLanguage::Korean => Language::Korean,
            WordlistLanguage::Spanish => Language::Spanish,
        }
    }
}

impl FromStr for WordlistLanguage {
    type Err = ImportError;

    fn from_str(s: &str) -> ImportResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "english" | "en" => Ok(WordlistLanguage::English),
            "simplified-chinese" | "zh-hans" => Ok(WordlistLanguage::SimplifiedChinese),
            "traditional-chinese" | "zh-hant" => Ok(WordlistLanguage::TraditionalChinese),
            "czech" | "cs" => Ok(WordlistLanguage::Czech),
            "french" | "fr" => Ok(WordlistLanguage::French),
            "italian" | "it" => Ok(WordlistLanguage::Italian),
            "japanese" | "ja" => Ok(WordlistLanguage::Japanese),
            "korean" | "ko" => Ok(WordlistLanguage::Korean),
            "spanish" | "es" => Ok(WordlistLanguage::Spanish),
            other => Err(ImportError::invalid_config(format!("Unsupported wordlist language '{}'", other))),
        }
    }
}

impl fmt::Display for WordlistLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Read-only wordlist for one language
#[derive(Clone, Copy)]
pub struct Wordlist {
    language: WordlistLanguage,
    words: &'static [&'static str; 2048],
}

impl fmt::Debug for Wordlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wordlist").field("language", &self.language).finish()
    }
}

impl Wordlist {
    pub fn new(language: WordlistLanguage) -> Self {
        Self {
            language,
            words: language.to_bip39().word_list(),
        }
    }

    pub fn english() -> Self {
        Self::new(WordlistLanguage::English)
    }

    pub fn language(&self) -> WordlistLanguage {
        self.language
    }

    /// All 2048 words in list order
    pub fn all(&self) -> &'static [&'static str; 2048] {
        self.words
    }

    /// Membership test for an exact (already trimmed) word
    pub fn contains(&self, word: &str) -> bool {
        if word.is_empty() {
            return false;
        }
        self.index_of(word).is_some()
    }

    /// Position of a word in the list, i.e. its 11-bit value
    pub fn index_of(&self, word: &str) -> Option<usize> {
        let normalized = normalize(word);
        self.words
            .iter()
            .position(|w| *w == word || *w == normalized.as_str())
    }

    /// Words starting with `prefix`, in list order, capped at `MAX_SUGGESTIONS`
    pub fn words_by_prefix(&self, prefix: &str) -> Vec<&'static str> {
        let normalized = normalize(prefix.trim());
        if normalized.is_empty() {
            return Vec::new();
        }
        self.words
            .iter()
            .filter(|w| w.starts_with(normalized.as_str()))
            .take(MAX_SUGGESTIONS)
            .copied()
            .collect()
    }
}

impl Default for Wordlist {
    fn default() -> Self {
        Self::english()
    }
}

/// Whether the word helper should be offered for the given input
pub fn should_show_word_selector(text: &str, slot_valid: bool) -> bool {
    !slot_valid && text.chars().count() >= MIN_LETTERS_TO_SHOW_WORD_SELECTOR
}

fn normalize(word: &str) -> String {
    word.nfkd().collect()
}
