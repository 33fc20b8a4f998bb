//! Word Slot Store
//!
//! Ordered per-word input state. The number of slots is fixed when the
//! store is created; slot values are zeroized on drop.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::types::SeedWordCount;
use crate::wallet::{SecretWords, Wordlist};

/// Input state of one word position
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct WordSlot {
    #[zeroize(skip)]
    pub index: usize,
    pub value: String,
    pub valid: bool,
    pub dirty: bool,
}

impl fmt::Debug for WordSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordSlot")
            .field("index", &self.index)
            .field("value", &if self.value.is_empty() { "" } else { "[REDACTED]" })
            .field("valid", &self.valid)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl WordSlot {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            value: String::new(),
            valid: false,
            dirty: false,
        }
    }

    /// Rendered in error state: touched and not a list word
    pub fn shows_error(&self) -> bool {
        self.dirty && !self.valid
    }

    fn assign(&mut self, text: &str, wordlist: &Wordlist) {
        self.value.zeroize();
        self.value = text.trim().to_string();
        self.valid = wordlist.contains(&self.value);
    }
}

/// Fixed-length collection of word slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSlotStore {
    slots: Vec<WordSlot>,
}

impl WordSlotStore {
    pub fn new(word_count: SeedWordCount) -> Self {
        Self {
            slots: (0..word_count.count()).map(WordSlot::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WordSlot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[WordSlot] {
        &self.slots
    }

    /// Keystroke: trim, store and re-check membership
    pub fn set_text(&mut self, index: usize, text: &str, wordlist: &Wordlist) -> Option<&WordSlot> {
        let slot = self.slots.get_mut(index)?;
        slot.assign(text, wordlist);
        Some(slot)
    }

    /// Blur: like `set_text`, and marks the slot dirty on non-empty input
    pub fn end_editing(&mut self, index: usize, final_text: &str, wordlist: &Wordlist) -> Option<&WordSlot> {
        let slot = self.slots.get_mut(index)?;
        slot.assign(final_text, wordlist);
        slot.dirty |= !final_text.is_empty();
        Some(slot)
    }

    /// Current values in slot order, empty strings for unfilled slots
    pub fn values(&self) -> SecretWords {
        Zeroizing::new(self.slots.iter().map(|s| s.value.clone()).collect())
    }

    pub fn all_filled(&self) -> bool {
        self.slots.iter().all(|s| !s.value.is_empty())
    }
}
