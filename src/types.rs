//! Shared types for the seed import core
//!
//! Data structures that cross module boundaries are defined here
//! for consistent serialization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ImportError, ImportResult};

// =============================================================================
// Phrase Shape
// =============================================================================

/// Number of words in a BIP-39 recovery phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum SeedWordCount {
    Words12,
    Words15,
    Words18,
    Words21,
    Words24,
}

impl SeedWordCount {
    pub const ALL: [SeedWordCount; 5] = [
        SeedWordCount::Words12,
        SeedWordCount::Words15,
        SeedWordCount::Words18,
        SeedWordCount::Words21,
        SeedWordCount::Words24,
    ];

    pub fn count(&self) -> usize {
        match self {
            SeedWordCount::Words12 => 12,
            SeedWordCount::Words15 => 15,
            SeedWordCount::Words18 => 18,
            SeedWordCount::Words21 => 21,
            SeedWordCount::Words24 => 24,
        }
    }
}

impl TryFrom<usize> for SeedWordCount {
    type Error = ImportError;

    fn try_from(value: usize) -> ImportResult<Self> {
        match value {
            12 => Ok(SeedWordCount::Words12),
            15 => Ok(SeedWordCount::Words15),
            18 => Ok(SeedWordCount::Words18),
            21 => Ok(SeedWordCount::Words21),
            24 => Ok(SeedWordCount::Words24),
            other => Err(ImportError::invalid_config(format!(
                "Unsupported word count {}. Expected 12, 15, 18, 21 or 24",
                other
            ))),
        }
    }
}

impl From<SeedWordCount> for usize {
    fn from(value: SeedWordCount) -> Self {
        value.count()
    }
}

impl fmt::Display for SeedWordCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count())
    }
}

// =============================================================================
// Network / Script
// =============================================================================

/// Bitcoin network the imported account lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WalletNetwork {
    #[default]
    Bitcoin,
    Testnet,
    Signet,
    Regtest,
}

impl WalletNetwork {
    pub fn is_mainnet(&self) -> bool {
        matches!(self, WalletNetwork::Bitcoin)
    }

    /// SLIP-0044 coin type used in the account path
    pub fn coin_type(&self) -> u32 {
        if self.is_mainnet() {
            0
        } else {
            1
        }
    }

    pub fn to_bitcoin(self) -> bitcoin::Network {
        match self {
            WalletNetwork::Bitcoin => bitcoin::Network::Bitcoin,
            WalletNetwork::Testnet => bitcoin::Network::Testnet,
            WalletNetwork::Signet => bitcoin::Network::Signet,
            WalletNetwork::Regtest => bitcoin::Network::Regtest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WalletNetwork::Bitcoin => "bitcoin",
            WalletNetwork::Testnet => "testnet",
            WalletNetwork::Signet => "signet",
            WalletNetwork::Regtest => "regtest",
        }
    }
}

impl FromStr for WalletNetwork {
    type Err = ImportError;

    fn from_str(s: &str) -> ImportResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "mainnet" => Ok(WalletNetwork::Bitcoin),
            "testnet" => Ok(WalletNetwork::Testnet),
            "signet" => Ok(WalletNetwork::Signet),
            "regtest" => Ok(WalletNetwork::Regtest),
            other => Err(ImportError::invalid_config(format!("Unknown network '{}'", other))),
        }
    }
}

impl fmt::Display for WalletNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output script family of the imported account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ScriptVersion {
    #[serde(rename = "P2PKH")]
    P2pkh,
    #[serde(rename = "P2SH-P2WPKH")]
    P2shP2wpkh,
    #[default]
    #[serde(rename = "P2WPKH")]
    P2wpkh,
    #[serde(rename = "P2TR")]
    P2tr,
}

impl ScriptVersion {
    pub const ALL: [ScriptVersion; 4] = [
        ScriptVersion::P2pkh,
        ScriptVersion::P2shP2wpkh,
        ScriptVersion::P2wpkh,
        ScriptVersion::P2tr,
    ];

    /// BIP-43 purpose field for the standard path of this script
    pub fn purpose(&self) -> u32 {
        match self {
            ScriptVersion::P2pkh => 44,
            ScriptVersion::P2shP2wpkh => 49,
            ScriptVersion::P2wpkh => 84,
            ScriptVersion::P2tr => 86,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptVersion::P2pkh => "P2PKH",
            ScriptVersion::P2shP2wpkh => "P2SH-P2WPKH",
            ScriptVersion::P2wpkh => "P2WPKH",
            ScriptVersion::P2tr => "P2TR",
        }
    }

    /// Human readable name shown next to the script code
    pub fn display_name(&self) -> &'static str {
        match self {
            ScriptVersion::P2pkh => "Legacy",
            ScriptVersion::P2shP2wpkh => "Nested SegWit",
            ScriptVersion::P2wpkh => "Native SegWit",
            ScriptVersion::P2tr => "Taproot",
        }
    }
}

impl FromStr for ScriptVersion {
    type Err = ImportError;

    fn from_str(s: &str) -> ImportResult<Self> {
        match s.trim().to_ascii_uppercase().replace('_', "-").as_str() {
            "P2PKH" | "LEGACY" => Ok(ScriptVersion::P2pkh),
            "P2SH-P2WPKH" | "P2SH" | "NESTED" => Ok(ScriptVersion::P2shP2wpkh),
            "P2WPKH" | "SEGWIT" => Ok(ScriptVersion::P2wpkh),
            "P2TR" | "TAPROOT" => Ok(ScriptVersion::P2tr),
            other => Err(ImportError::invalid_config(format!("Unknown script version '{}'", other))),
        }
    }
}

impl fmt::Display for ScriptVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Wallet / Account
// =============================================================================

/// Handle to a constructed (not yet synced) wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletHandle {
    pub network: WalletNetwork,
    pub script_version: ScriptVersion,
    /// Master key fingerprint, 8 lowercase hex chars
    pub fingerprint: String,
    pub derivation_path: String,
    pub account_xpub: String,
    /// Receive chain descriptor (`/0/*`) with checksum
    pub external_descriptor: String,
    /// Change chain descriptor (`/1/*`) with checksum
    pub internal_descriptor: String,
}

/// Account fields known before sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDraft {
    pub name: String,
    pub network: WalletNetwork,
    pub script_version: ScriptVersion,
    pub fingerprint: String,
    pub derivation_path: String,
}

impl AccountDraft {
    pub fn from_handle(name: impl Into<String>, handle: &WalletHandle) -> Self {
        Self {
            name: name.into(),
            network: handle.network,
            script_version: handle.script_version,
            fingerprint: handle.fingerprint.clone(),
            derivation_path: handle.derivation_path.clone(),
        }
    }

    /// Stable identifier of the account this draft will become
    pub fn account_id(&self) -> String {
        format!("{}/{}/{}", self.network, self.fingerprint, self.derivation_path)
    }
}

/// Sync-derived totals of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountSummary {
    pub number_of_utxos: u64,
    /// Confirmed plus unconfirmed balance in satoshis
    pub balance: u64,
    /// Addresses with on-chain history found during the scan
    pub used_addresses: u32,
}

/// A synced account ready for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub network: WalletNetwork,
    pub script_version: ScriptVersion,
    pub fingerprint: String,
    pub derivation_path: String,
    pub external_descriptor: String,
    pub internal_descriptor: String,
    pub summary: AccountSummary,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Account {
    pub fn from_sync(draft: &AccountDraft, handle: &WalletHandle, summary: AccountSummary) -> Self {
        Self {
            id: draft.account_id(),
            name: draft.name.clone(),
            network: draft.network,
            script_version: draft.script_version,
            fingerprint: draft.fingerprint.clone(),
            derivation_path: draft.derivation_path.clone(),
            external_descriptor: handle.external_descriptor.clone(),
            internal_descriptor: handle.internal_descriptor.clone(),
            summary,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Where the screen navigates once the flow ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationTarget {
    Root,
}
