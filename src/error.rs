//! Unified error types for the seed import core
//!
//! Advisory validation state (invalid words, bad checksum) never flows
//! through here. These errors come from configuration, derivation and the
//! external services driven by the confirmation flow.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all import operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ImportError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, msg)
    }

    pub fn invalid_mnemonic(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidMnemonic, msg)
    }

    pub fn checksum_invalid() -> Self {
        Self::new(
            ErrorCode::ChecksumInvalid,
            "Import is disabled until the phrase passes checksum validation",
        )
    }

    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidDerivationPath, msg)
    }

    pub fn wallet_construction(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::WalletConstructionFailed, msg)
    }

    pub fn sync_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SyncFailed, msg)
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::PersistenceFailed, msg)
    }

    pub fn account_exists(id: impl Into<String>) -> Self {
        Self::new(ErrorCode::AccountExists, format!("Account {} already exists", id.into()))
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, msg)
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, msg)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "Import session was disposed")
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// Whether the confirmation flow may offer a retry for this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::NetworkError
                | ErrorCode::Timeout
                | ErrorCode::SyncFailed
                | ErrorCode::PersistenceFailed
                | ErrorCode::WalletConstructionFailed
        )
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ImportError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors
    InvalidInput,
    InvalidConfig,
    InvalidMnemonic,
    ChecksumInvalid,
    InvalidDerivationPath,

    // Derivation
    CryptoError,

    // Confirmation flow
    WalletConstructionFailed,
    SyncFailed,
    PersistenceFailed,
    AccountExists,

    // Network errors
    NetworkError,
    Timeout,

    // Parse errors
    ParseError,
    JsonError,

    // Lifecycle
    Cancelled,

    // Internal
    Internal,
}

/// Result type alias for import operations
pub type ImportResult<T> = Result<T, ImportError>;

// Conversions from common error types

impl From<serde_json::Error> for ImportError {
    fn from(e: serde_json::Error) -> Self {
        ImportError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<miniscript::Error> for ImportError {
    fn from(e: miniscript::Error) -> Self {
        ImportError::new(ErrorCode::ParseError, format!("Descriptor error: {}", e))
    }
}

impl From<std::io::Error> for ImportError {
    fn from(e: std::io::Error) -> Self {
        ImportError::new(ErrorCode::PersistenceFailed, e.to_string())
    }
}

impl From<reqwest::Error> for ImportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ImportError::new(ErrorCode::Timeout, "Request timed out")
        } else if e.is_connect() {
            ImportError::new(ErrorCode::NetworkError, "Connection failed")
        } else {
            ImportError::new(ErrorCode::NetworkError, e.to_string())
        }
    }
}

impl From<url::ParseError> for ImportError {
    fn from(e: url::ParseError) -> Self {
        ImportError::new(ErrorCode::InvalidConfig, format!("Invalid URL: {}", e))
    }
}

impl From<bitcoin::bip32::Error> for ImportError {
    fn from(e: bitcoin::bip32::Error) -> Self {
        ImportError::new(ErrorCode::CryptoError, format!("BIP32 error: {}", e))
    }
}

impl From<bip39::Error> for ImportError {
    fn from(e: bip39::Error) -> Self {
        ImportError::new(ErrorCode::InvalidMnemonic, format!("BIP39 error: {}", e))
    }
}

impl From<tokio::task::JoinError> for ImportError {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_cancelled() {
            ImportError::cancelled()
        } else {
            ImportError::internal(format!("Background task failed: {}", e))
        }
    }
}
