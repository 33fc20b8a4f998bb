//! Import Settings
//!
//! Everything the import flow needs to know before the first keystroke:
//! phrase length and language, target network, script version, account
//! path, and where to sync and persist the resulting account.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::error::{ImportError, ImportResult};
use crate::types::{ScriptVersion, SeedWordCount, WalletNetwork};
use crate::wallet::{standard_account_path, validate_account_path, Wordlist, WordlistLanguage};

/// Default number of unused addresses scanned past the last used one
pub const DEFAULT_GAP_LIMIT: u32 = 20;

/// Largest gap limit accepted from configuration
pub const MAX_GAP_LIMIT: u32 = 1000;

/// Default per-request timeout for the sync backend
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration of one import session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Display name of the account being imported
    pub name: String,
    pub word_count: SeedWordCount,
    pub language: WordlistLanguage,
    pub network: WalletNetwork,
    pub script_version: ScriptVersion,
    pub account_index: u32,
    /// Explicit account path, overrides the standard path when set
    pub derivation_path: Option<String>,
    /// Esplora REST base URL
    pub esplora_url: String,
    pub gap_limit: u32,
    pub request_timeout_secs: u64,
    /// JSON account store location, in-memory when unset
    pub account_store_path: Option<PathBuf>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self::for_network(WalletNetwork::Bitcoin)
    }
}

impl ImportSettings {
    /// Preset for a network with its public Esplora endpoint
    pub fn for_network(network: WalletNetwork) -> Self {
        Self {
            name: "Imported account".to_string(),
            word_count: SeedWordCount::Words12,
            language: WordlistLanguage::English,
            network,
            script_version: ScriptVersion::P2wpkh,
            account_index: 0,
            derivation_path: None,
            esplora_url: default_esplora_url(network).to_string(),
            gap_limit: DEFAULT_GAP_LIMIT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            account_store_path: None,
        }
    }

    pub fn from_json_str(json: &str) -> ImportResult<Self> {
        serde_json::from_str(json).map_err(|e| ImportError::invalid_config(format!("Invalid settings: {}", e)))
    }

    pub fn from_json_file(path: &Path) -> ImportResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ImportError::invalid_config(format!("Cannot read settings file: {}", e))
                .with_details(path.display().to_string())
        })?;
        Self::from_json_str(&contents)
    }

    /// Account path used for derivation
    pub fn derivation_path(&self) -> String {
        match &self.derivation_path {
            Some(path) => path.trim().to_string(),
            None => standard_account_path(self.script_version, self.network, self.account_index),
        }
    }

    pub fn wordlist(&self) -> Wordlist {
        Wordlist::new(self.language)
    }

    /// Validate the settings, returning non-fatal warnings
    pub fn validate(&self) -> ImportResult<Vec<String>> {
        let mut warnings = Vec::new();

        if self.name.trim().is_empty() {
            return Err(ImportError::invalid_config("Account name cannot be empty"));
        }

        let path = self.derivation_path();
        let path_check = validate_account_path(&path, self.script_version, self.network);
        if !path_check.is_valid {
            return Err(ImportError::invalid_path(format!(
                "Invalid derivation path '{}': {}",
                path,
                path_check.errors.join("; ")
            )));
        }
        warnings.extend(path_check.warnings);

        let url = Url::parse(&self.esplora_url)?;
        match url.scheme() {
            "https" => {}
            "http" => {
                let local = match url.host() {
                    Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
                    Some(Host::Ipv4(ip)) => ip.is_loopback(),
                    Some(Host::Ipv6(ip)) => ip.is_loopback(),
                    None => false,
                };
                if self.network.is_mainnet() && !local {
                    warnings.push("Esplora endpoint does not use TLS".to_string());
                }
            }
            other => {
                return Err(ImportError::invalid_config(format!(
                    "Unsupported Esplora URL scheme '{}'",
                    other
                )))
            }
        }

        if self.gap_limit == 0 || self.gap_limit > MAX_GAP_LIMIT {
            return Err(ImportError::invalid_config(format!(
                "Gap limit must be between 1 and {}",
                MAX_GAP_LIMIT
            )));
        }
        if self.gap_limit > 100 {
            warnings.push(format!("Gap limit {} will make sync slow", self.gap_limit));
        }

        if self.request_timeout_secs == 0 {
            return Err(ImportError::invalid_config("Request timeout must be positive"));
        }

        Ok(warnings)
    }
}

/// Public Esplora endpoint for a network
pub fn default_esplora_url(network: WalletNetwork) -> &'static str {
    match network {
        WalletNetwork::Bitcoin => "https://mempool.space/api",
        WalletNetwork::Testnet => "https://mempool.space/testnet/api",
        WalletNetwork::Signet => "https://mempool.space/signet/api",
        WalletNetwork::Regtest => "http://127.0.0.1:3002",
    }
}
