//! Seed Import Core
//!
//! Headless core of the "import existing seed" flow of a Bitcoin wallet.
//!
//! # Architecture
//!
//! This crate provides:
//! - **import**: Word slots, the pure `apply_event` state machine, and the
//!   async `ImportSession` that drives derivation and confirmation
//! - **wallet**: Wordlists, BIP-39 checksum, account paths, BIP-32
//!   derivation, output descriptors, wallet construction
//! - **services**: Esplora sync and account persistence
//! - **utils**: Redacting logger, settings, HTTP helpers
//!
//! # Security
//!
//! This crate uses `zeroize` to clear seed words, passphrases and seeds
//! from memory. Log fields named after secrets are redacted automatically.
//!
//! # Example
//!
//! ```rust,ignore
//! use seed_import::{ImportServices, ImportSession, ImportSettings, EsploraSyncer};
//!
//! let settings = ImportSettings::default();
//! let syncer = Arc::new(EsploraSyncer::from_settings(&settings)?);
//! let mut session = ImportSession::new(settings.clone(), ImportServices::standard(&settings, syncer))?;
//!
//! for (i, word) in phrase.split_whitespace().enumerate() {
//!     session.on_word_text_changed(i, word)?;
//! }
//! session.settle().await?;
//! println!("fingerprint: {:?}", session.state().fingerprint);
//! session.confirm_import().await?;
//! ```

pub mod error;
pub mod import;
pub mod services;
pub mod types;
pub mod utils;
pub mod wallet;

pub use error::{ErrorCode, ImportError, ImportResult};
pub use types::*;

pub use import::{
    apply_event, ConfirmFlow, ConfirmPhase, ConfirmStatus, ImportCommand, ImportEvent, ImportServices,
    ImportSession, PhraseState, WordSlot, WordSlotStore,
};
pub use services::{AccountStore, EsploraSyncer, InMemoryAccountStore, JsonFileAccountStore, WalletSyncer};
pub use utils::settings::ImportSettings;
pub use wallet::{
    ChecksumValidator, FingerprintDeriver, WalletLoader, Wordlist, WordlistLanguage,
};
