//! Import State Machine
//!
//! The import screen modelled as a pure transition function:
//!
//! ```text
//! PhraseState × ImportEvent → (PhraseState, Vec<ImportCommand>)
//! ```
//!
//! `apply_event` never performs I/O. Fingerprint derivation is returned as
//! a command tagged with the generation of the revalidation that requested
//! it; a `FingerprintDerived` event whose generation is not the latest is
//! dropped.
//!
//! Revalidation always runs against the phrase *after* the triggering
//! mutation has been applied.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::ImportResult;
use crate::types::SeedWordCount;
use crate::wallet::{should_show_word_selector, ChecksumValidator, SecretWords, Wordlist};
use crate::{log_debug, log_warn};

use super::slot::{WordSlot, WordSlotStore};

/// Active slot and word-helper visibility
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct FocusState {
    pub slot: usize,
    /// Raw text of the active input
    pub text: String,
    pub helper_visible: bool,
}

impl fmt::Debug for FocusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusState")
            .field("slot", &self.slot)
            .field("text_len", &self.text.chars().count())
            .field("helper_visible", &self.helper_visible)
            .finish()
    }
}

/// Everything the import screen knows about the phrase being entered
#[derive(Clone, PartialEq)]
pub struct PhraseState {
    pub words: WordSlotStore,
    pub passphrase: Zeroizing<String>,
    pub checksum_valid: bool,
    /// Master fingerprint of the latest valid phrase, once derived
    pub fingerprint: Option<String>,
    pub fingerprint_error: Option<String>,
    pub focus: FocusState,
    /// Tag of the most recent revalidation
    pub generation: u64,
}

impl fmt::Debug for PhraseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhraseState")
            .field("words", &self.words)
            .field("passphrase", &if self.passphrase.is_empty() { "[EMPTY]" } else { "[REDACTED]" })
            .field("checksum_valid", &self.checksum_valid)
            .field("fingerprint", &self.fingerprint)
            .field("fingerprint_error", &self.fingerprint_error)
            .field("focus", &self.focus)
            .field("generation", &self.generation)
            .finish()
    }
}

impl PhraseState {
    pub fn new(word_count: SeedWordCount) -> Self {
        Self {
            words: WordSlotStore::new(word_count),
            passphrase: Zeroizing::new(String::new()),
            checksum_valid: false,
            fingerprint: None,
            fingerprint_error: None,
            focus: FocusState::default(),
            generation: 0,
        }
    }

    /// Fresh state of the same size; the generation keeps counting so
    /// results requested before the reset stay stale
    pub fn reset(&self) -> Self {
        let mut fresh = Self::new(
            SeedWordCount::try_from(self.words.len()).unwrap_or(SeedWordCount::Words12),
        );
        fresh.generation = self.generation + 1;
        fresh
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn slot(&self, index: usize) -> Option<&WordSlot> {
        self.words.get(index)
    }

    /// Confirm is enabled only for a checksum-valid phrase
    pub fn can_confirm(&self) -> bool {
        self.checksum_valid
    }

    /// Completion candidates for the focused input while the helper is shown
    pub fn suggestions(&self, wordlist: &Wordlist) -> Vec<&'static str> {
        if !self.focus.helper_visible {
            return Vec::new();
        }
        wordlist.words_by_prefix(&self.focus.text)
    }

    /// Word values handed to wallet construction
    pub fn mnemonic_words(&self) -> SecretWords {
        self.words.values()
    }
}

/// Input to the state machine
#[derive(Clone, PartialEq)]
pub enum ImportEvent {
    WordTextChanged { slot: usize, text: String },
    WordEndEditing { slot: usize, text: String },
    WordFocused { slot: usize, text: String },
    WordSelectedFromHelper { word: String },
    PassphraseChanged { passphrase: String },
    FingerprintDerived { generation: u64, result: ImportResult<String> },
}

impl ImportEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ImportEvent::WordTextChanged { .. } => "word_text_changed",
            ImportEvent::WordEndEditing { .. } => "word_end_editing",
            ImportEvent::WordFocused { .. } => "word_focused",
            ImportEvent::WordSelectedFromHelper { .. } => "word_selected_from_helper",
            ImportEvent::PassphraseChanged { .. } => "passphrase_changed",
            ImportEvent::FingerprintDerived { .. } => "fingerprint_derived",
        }
    }
}

impl fmt::Debug for ImportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportEvent::WordTextChanged { slot, .. }
            | ImportEvent::WordEndEditing { slot, .. }
            | ImportEvent::WordFocused { slot, .. } => write!(f, "{}(slot={})", self.name(), slot),
            ImportEvent::FingerprintDerived { generation, result } => {
                write!(f, "{}(generation={}, ok={})", self.name(), generation, result.is_ok())
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// Side effect requested by a transition
pub enum ImportCommand {
    DeriveFingerprint {
        generation: u64,
        words: SecretWords,
        passphrase: Zeroizing<String>,
    },
}

impl fmt::Debug for ImportCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportCommand::DeriveFingerprint { generation, words, .. } => f
                .debug_struct("DeriveFingerprint")
                .field("generation", generation)
                .field("words", &words.len())
                .finish_non_exhaustive(),
        }
    }
}

/// Apply one event to the state
pub fn apply_event(
    state: &PhraseState,
    event: ImportEvent,
    validator: &ChecksumValidator,
) -> (PhraseState, Vec<ImportCommand>) {
    let mut next = state.clone();
    let mut commands = Vec::new();
    let wordlist = validator.wordlist();

    match event {
        ImportEvent::WordTextChanged { slot, text } => {
            let Some(updated) = next.words.set_text(slot, &text, wordlist) else {
                return ignore_slot(state, slot);
            };
            if !updated.valid {
                next.focus.helper_visible = should_show_word_selector(&updated.value, false);
            }
            next.focus.text = text;
            revalidate(&mut next, validator, &mut commands);
        }

        ImportEvent::WordEndEditing { slot, text } => {
            if next.words.end_editing(slot, &text, wordlist).is_none() {
                return ignore_slot(state, slot);
            }
            next.focus.text = text;
        }

        ImportEvent::WordFocused { slot, text } => {
            let Some(current) = next.words.get(slot) else {
                return ignore_slot(state, slot);
            };
            next.focus.helper_visible = should_show_word_selector(&text, current.valid);
            next.focus.slot = slot;
            next.focus.text = text;
        }

        ImportEvent::WordSelectedFromHelper { word } => {
            let slot = next.focus.slot;
            let Some(updated) = next.words.set_text(slot, &word, wordlist) else {
                return ignore_slot(state, slot);
            };
            if updated.valid {
                next.focus.helper_visible = false;
            }
            next.focus.text = word;
            revalidate(&mut next, validator, &mut commands);
        }

        ImportEvent::PassphraseChanged { passphrase } => {
            next.passphrase = Zeroizing::new(passphrase);
            revalidate(&mut next, validator, &mut commands);
        }

        ImportEvent::FingerprintDerived { generation, result } => {
            if generation != next.generation || !next.checksum_valid {
                log_debug!("import", "stale fingerprint dropped",
                    generation = generation,
                    latest = next.generation
                );
                return (next, commands);
            }
            match result {
                Ok(fingerprint) => {
                    next.fingerprint = Some(fingerprint);
                    next.fingerprint_error = None;
                }
                Err(e) => {
                    log_warn!("import", "fingerprint derivation failed",
                        generation = generation,
                        code = format!("{:?}", e.code)
                    );
                    next.fingerprint = None;
                    next.fingerprint_error = Some(e.message);
                }
            }
        }
    }

    (next, commands)
}

fn ignore_slot(state: &PhraseState, slot: usize) -> (PhraseState, Vec<ImportCommand>) {
    log_warn!("import", "event for unknown slot ignored",
        slot = slot,
        word_count = state.word_count()
    );
    (state.clone(), Vec::new())
}

fn revalidate(state: &mut PhraseState, validator: &ChecksumValidator, commands: &mut Vec<ImportCommand>) {
    let words = state.words.values();

    state.generation += 1;
    state.fingerprint = None;
    state.fingerprint_error = None;
    state.checksum_valid = validator.revalidate(words.as_slice(), state.passphrase.as_str());

    if state.checksum_valid && state.words.all_filled() {
        log_debug!("import", "checksum valid", generation = state.generation);
        commands.push(ImportCommand::DeriveFingerprint {
            generation: state.generation,
            words,
            passphrase: state.passphrase.clone(),
        });
    }
}
