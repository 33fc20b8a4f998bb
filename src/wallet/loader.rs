//! Wallet Construction
//!
//! Turns a checksum-valid phrase into a wallet handle (account xpub plus
//! receive and change descriptors), and derives the master fingerprint
//! shown while the user is still editing.
//!
//! SECURITY: Words and passphrase are moved into `Zeroizing` buffers before
//! they cross onto a blocking task.

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::error::{ErrorCode, ImportError, ImportResult};
use crate::types::{ScriptVersion, WalletHandle, WalletNetwork};
use crate::utils::settings::ImportSettings;
use crate::{log_debug, log_info};

use super::derivation::{derive_account, master_fingerprint, EXTERNAL_CHAIN, INTERNAL_CHAIN};
use super::derivation_path::require_valid_path;
use super::descriptor::account_descriptor;
use super::wordlist::WordlistLanguage;

/// Phrase words owned for the duration of a background job
pub type SecretWords = Zeroizing<Vec<String>>;

/// Derives the master fingerprint of a valid phrase
#[async_trait]
pub trait FingerprintDeriver: Send + Sync {
    async fn derive_fingerprint(&self, words: SecretWords, passphrase: Zeroizing<String>) -> ImportResult<String>;
}

/// Builds a wallet handle from a valid phrase
#[async_trait]
pub trait WalletLoader: Send + Sync {
    async fn load(
        &self,
        words: SecretWords,
        passphrase: Zeroizing<String>,
        settings: &ImportSettings,
    ) -> ImportResult<WalletHandle>;
}

/// BIP-32 fingerprint derivation on a blocking task
#[derive(Debug, Clone)]
pub struct Bip32FingerprintDeriver {
    language: WordlistLanguage,
    network: WalletNetwork,
    script_version: ScriptVersion,
    derivation_path: String,
}

impl Bip32FingerprintDeriver {
    pub fn new(settings: &ImportSettings) -> Self {
        Self {
            language: settings.language,
            network: settings.network,
            script_version: settings.script_version,
            derivation_path: settings.derivation_path(),
        }
    }
}

#[async_trait]
impl FingerprintDeriver for Bip32FingerprintDeriver {
    async fn derive_fingerprint(&self, words: SecretWords, passphrase: Zeroizing<String>) -> ImportResult<String> {
        // unsupported paths fail before any key material is derived
        require_valid_path(&self.derivation_path, self.script_version, self.network)?;

        let language = self.language;
        let fingerprint = tokio::task::spawn_blocking(move || {
            master_fingerprint(words.as_slice(), passphrase.as_str(), language)
        })
        .await??;

        log_debug!("wallet", "fingerprint derived", fingerprint = fingerprint);
        Ok(fingerprint)
    }
}

/// Single-key BIP-32 account loader
#[derive(Debug, Clone, Copy, Default)]
pub struct Bip32WalletLoader;

impl Bip32WalletLoader {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous construction, also used by the offline CLI path
    pub fn build_handle<S: AsRef<str>>(
        words: &[S],
        passphrase: &str,
        settings: &ImportSettings,
    ) -> ImportResult<WalletHandle> {
        let path_str = settings.derivation_path();
        let path = require_valid_path(&path_str, settings.script_version, settings.network)?;
        let keys = derive_account(words, passphrase, settings.language, settings.network, &path)?;

        let descriptor = |chain: u32| {
            account_descriptor(settings.script_version, keys.fingerprint, &path, &keys.xpub, chain)
                .map(|d| d.to_string())
                .map_err(|e| ImportError::wallet_construction(e.message))
        };

        Ok(WalletHandle {
            network: settings.network,
            script_version: settings.script_version,
            fingerprint: keys.fingerprint.to_string(),
            derivation_path: path.to_string(),
            account_xpub: keys.xpub.to_string(),
            external_descriptor: descriptor(EXTERNAL_CHAIN)?,
            internal_descriptor: descriptor(INTERNAL_CHAIN)?,
        })
    }
}

#[async_trait]
impl WalletLoader for Bip32WalletLoader {
    async fn load(
        &self,
        words: SecretWords,
        passphrase: Zeroizing<String>,
        settings: &ImportSettings,
    ) -> ImportResult<WalletHandle> {
        let settings = settings.clone();
        let handle = tokio::task::spawn_blocking(move || {
            Self::build_handle(words.as_slice(), passphrase.as_str(), &settings)
        })
        .await?
        .map_err(|e| match e.code {
            ErrorCode::InvalidDerivationPath | ErrorCode::InvalidMnemonic => e,
            code => ImportError::wallet_construction(e.message).with_details(format!("{:?}", code)),
        })?;

        log_info!("wallet", "wallet constructed",
            fingerprint = handle.fingerprint,
            path = handle.derivation_path,
            descriptor = handle.external_descriptor
        );
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn secret_words() -> SecretWords {
        Zeroizing::new(ABANDON_ABOUT.split_whitespace().map(String::from).collect())
    }

    #[tokio::test]
    async fn test_fingerprint_deriver() {
        let deriver = Bip32FingerprintDeriver::new(&ImportSettings::default());
        let fp = deriver
            .derive_fingerprint(secret_words(), Zeroizing::new(String::new()))
            .await
            .unwrap();
        assert_eq!(fp, "73c5da0a");
    }

    #[tokio::test]
    async fn test_fingerprint_deriver_rejects_bad_path() {
        let mut settings = ImportSettings::default();
        settings.derivation_path = Some("m/84'/60'/0'".to_string());
        let deriver = Bip32FingerprintDeriver::new(&settings);
        let err = deriver
            .derive_fingerprint(secret_words(), Zeroizing::new(String::new()))
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidDerivationPath);
    }

    #[tokio::test]
    async fn test_loader_builds_descriptors() {
        let settings = ImportSettings::default();
        let handle = Bip32WalletLoader::new()
            .load(secret_words(), Zeroizing::new(String::new()), &settings)
            .await
            .unwrap();

        assert_eq!(handle.fingerprint, "73c5da0a");
        assert_eq!(handle.derivation_path, "m/84'/0'/0'");
        assert!(handle.account_xpub.starts_with("xpub"));
        assert!(handle.external_descriptor.starts_with("wpkh([73c5da0a/84'/0'/0']"));
        assert!(handle.internal_descriptor.contains("/1/*)#"));
    }

    #[tokio::test]
    async fn test_loader_taproot() {
        let mut settings = ImportSettings::default();
        settings.script_version = ScriptVersion::P2tr;
        let handle = Bip32WalletLoader::new()
            .load(secret_words(), Zeroizing::new(String::new()), &settings)
            .await
            .unwrap();
        assert!(handle.external_descriptor.starts_with("tr([73c5da0a/86'/0'/0']"));
    }

    #[test]
    fn test_build_handle_rejects_bad_checksum() {
        let words = vec!["abandon"; 12];
        let err = Bip32WalletLoader::build_handle(&words, "", &ImportSettings::default()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidMnemonic);
    }
}
