//! Account Derivation Path Validation
//!
//! Validates the BIP-32 account path chosen during account setup against
//! the selected script version and network:
//! - Correct format and syntax
//! - Account-level depth (`m/purpose'/coin'/account'`)
//! - Warnings for non-standard but usable paths

use bitcoin::bip32;

use crate::error::{ImportError, ImportResult};
use crate::types::{ScriptVersion, WalletNetwork};

/// Hardened offset for BIP-32 derivation
pub const HARDENED: u32 = 0x80000000;

/// Highest account index considered ordinary
pub const MAX_ORDINARY_ACCOUNT: u32 = 100;

/// Parsed account path
#[derive(Debug, Clone, PartialEq)]
pub struct AccountPath {
    pub components: Vec<PathComponent>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathComponent {
    pub index: u32,
    pub hardened: bool,
}

impl PathComponent {
    pub fn new(index: u32, hardened: bool) -> Self {
        Self { index, hardened }
    }

    pub fn full_index(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED
        } else {
            self.index
        }
    }
}

impl std::fmt::Display for PathComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

impl AccountPath {
    pub fn purpose(&self) -> Option<u32> {
        self.components.first().map(|c| c.index)
    }

    pub fn coin_type(&self) -> Option<u32> {
        self.components.get(1).map(|c| c.index)
    }

    pub fn account(&self) -> Option<u32> {
        self.components.get(2).map(|c| c.index)
    }

    /// Convert to the `bitcoin` crate representation
    pub fn to_bip32(&self) -> bip32::DerivationPath {
        self.components
            .iter()
            .map(|c| bip32::ChildNumber::from(c.full_index()))
            .collect::<Vec<_>>()
            .into()
    }
}

impl std::fmt::Display for AccountPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m")?;
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

/// Derivation path validation result
#[derive(Debug, Clone)]
pub struct PathValidation {
    pub is_valid: bool,
    pub path: Option<AccountPath>,
    pub normalized: Option<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Parse and validate an account path for a script version and network
pub fn validate_account_path(path: &str, script: ScriptVersion, network: WalletNetwork) -> PathValidation {
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    let parsed = match parse_path(path) {
        Ok(p) => p,
        Err(e) => {
            return PathValidation {
                is_valid: false,
                path: None,
                normalized: None,
                warnings: vec![],
                errors: vec![e],
            };
        }
    };

    if parsed.components.len() != 3 {
        errors.push(format!(
            "Account path must have exactly 3 levels (purpose/coin/account), got {}",
            parsed.components.len()
        ));
    }

    if let Some(purpose) = parsed.purpose() {
        if purpose != script.purpose() {
            warnings.push(format!(
                "Purpose {}' is not standard for {} (expected {}')",
                purpose,
                script,
                script.purpose()
            ));
        }
    }

    if let Some(coin_type) = parsed.coin_type() {
        let expected = network.coin_type();
        if coin_type != expected {
            if network.is_mainnet() && coin_type == 1 {
                errors.push("Using testnet coin type on mainnet - funds may be lost!".to_string());
            } else if !network.is_mainnet() && coin_type == 0 {
                warnings.push(format!("Using mainnet coin type on {}", network));
            } else {
                errors.push(format!(
                    "Coin type {} is not a Bitcoin coin type (expected {})",
                    coin_type, expected
                ));
            }
        }
    }

    if let Some(account) = parsed.account() {
        if account > MAX_ORDINARY_ACCOUNT {
            warnings.push(format!("Unusual account number: {}. Most wallets use 0", account));
        }
    }

    if parsed.components.iter().any(|c| !c.hardened) {
        warnings.push("Purpose, coin type, and account should be hardened (')".to_string());
    }

    let normalized = parsed.to_string();

    PathValidation {
        is_valid: errors.is_empty(),
        path: Some(parsed),
        normalized: Some(normalized),
        warnings,
        errors,
    }
}

fn parse_path(path: &str) -> Result<AccountPath, String> {
    let trimmed = path.trim();

    if !trimmed.starts_with("m/") && !trimmed.starts_with("M/") {
        return Err("Derivation path must start with 'm/'".to_string());
    }

    let path_part = &trimmed[2..];
    if path_part.is_empty() {
        return Err("Empty derivation path".to_string());
    }

    let components = path_part
        .split('/')
        .map(parse_component)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AccountPath { components })
}

fn parse_component(s: &str) -> Result<PathComponent, String> {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return Err("Empty path component".to_string());
    }

    let (number_str, hardened) = match trimmed.strip_suffix(['\'', 'h', 'H']) {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };

    let index: u32 = number_str
        .parse()
        .map_err(|e| format!("Invalid path component '{}': {}", s, e))?;

    if index >= HARDENED {
        return Err(format!("Path component {} exceeds maximum value", index));
    }

    Ok(PathComponent::new(index, hardened))
}

/// Standard account path for a script version on a network
pub fn standard_account_path(script: ScriptVersion, network: WalletNetwork, account: u32) -> String {
    format!("m/{}'/{}'/{}'", script.purpose(), network.coin_type(), account)
}

/// Require a valid account path
pub fn require_valid_path(path: &str, script: ScriptVersion, network: WalletNetwork) -> ImportResult<AccountPath> {
    let validation = validate_account_path(path, script, network);

    if !validation.is_valid {
        let errors = validation.errors.join("; ");
        return Err(ImportError::invalid_path(format!(
            "Invalid derivation path '{}': {}",
            path, errors
        )));
    }

    validation
        .path
        .ok_or_else(|| ImportError::internal("Path validation succeeded but path is None"))
}
