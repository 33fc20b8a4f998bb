//! Wallet Module
//!
//! Wordlists, checksum validation, account paths, key derivation,
//! output descriptors and wallet construction.

mod derivation;
mod derivation_path;
pub mod descriptor;
mod loader;
mod validation;
mod wordlist;

pub use derivation::*;
pub use derivation_path::*;
pub use descriptor::{account_descriptor, descriptor_address, parse_descriptor, AccountDescriptor};
pub use loader::*;
pub use validation::*;
pub use wordlist::*;
