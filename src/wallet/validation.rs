//! Mnemonic Checksum Validation
//!
//! Full-phrase revalidation for the import screen. The result is advisory:
//! a failed check disables confirmation, it never raises an error.

use bip39::Mnemonic;
use serde::{Deserialize, Serialize};

use crate::types::SeedWordCount;

use super::wordlist::Wordlist;

/// Why a phrase failed validation, first problem wins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhraseIssue {
    UnsupportedLength { count: usize },
    EmptySlots { slots: Vec<usize> },
    UnknownWords { slots: Vec<usize> },
    BadChecksum,
}

/// Pure BIP-39 checksum validator bound to one wordlist
#[derive(Debug, Clone, Copy)]
pub struct ChecksumValidator {
    wordlist: Wordlist,
}

impl ChecksumValidator {
    pub fn new(wordlist: Wordlist) -> Self {
        Self { wordlist }
    }

    pub fn wordlist(&self) -> &Wordlist {
        &self.wordlist
    }

    /// Revalidate the whole phrase.
    ///
    /// The passphrase is accepted for call-site symmetry with fingerprint
    /// derivation; it takes no part in the checksum.
    pub fn revalidate<S: AsRef<str>>(&self, words: &[S], _passphrase: &str) -> bool {
        self.is_valid_mnemonic(words)
    }

    /// Complete phrase in this validator's language with a matching checksum
    pub fn is_valid_mnemonic<S: AsRef<str>>(&self, words: &[S]) -> bool {
        self.diagnose(words).is_none()
    }

    /// `None` when the phrase is complete and passes the checksum
    pub fn diagnose<S: AsRef<str>>(&self, words: &[S]) -> Option<PhraseIssue> {
        if SeedWordCount::try_from(words.len()).is_err() {
            return Some(PhraseIssue::UnsupportedLength { count: words.len() });
        }

        let empty: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| w.as_ref().trim().is_empty())
            .map(|(i, _)| i)
            .collect();
        if !empty.is_empty() {
            return Some(PhraseIssue::EmptySlots { slots: empty });
        }

        let unknown: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| !self.wordlist.contains(w.as_ref().trim()))
            .map(|(i, _)| i)
            .collect();
        if !unknown.is_empty() {
            return Some(PhraseIssue::UnknownWords { slots: unknown });
        }

        let phrase = join_words(words);
        match Mnemonic::parse_in(self.wordlist.language().to_bip39(), phrase.as_str()) {
            Ok(_) => None,
            Err(_) => Some(PhraseIssue::BadChecksum),
        }
    }
}

/// Join trimmed slot values with single spaces
pub fn join_words<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(|w| w.as_ref().trim())
        .collect::<Vec<_>>()
        .join(" ")
}
