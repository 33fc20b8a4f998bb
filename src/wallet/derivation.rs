//! Key Derivation
//!
//! Seed, master fingerprint and account key derivation for an imported
//! phrase, plus address derivation for the four supported script versions.
//!
//! SECURITY: Seeds are wrapped in `Zeroizing` and cleared on drop.

use bip39::Mnemonic;
use bitcoin::bip32::{ChildNumber, Fingerprint, Xpriv, Xpub};
use bitcoin::key::CompressedPublicKey;
use bitcoin::secp256k1::Secp256k1;
use bitcoin::Address;
use zeroize::Zeroizing;

use crate::error::{ImportError, ImportResult};
use crate::types::{ScriptVersion, WalletNetwork};

use super::derivation_path::AccountPath;
use super::validation::join_words;
use super::wordlist::WordlistLanguage;

/// Receive (external) chain index
pub const EXTERNAL_CHAIN: u32 = 0;
/// Change (internal) chain index
pub const INTERNAL_CHAIN: u32 = 1;

/// Public account material derived from a phrase
#[derive(Debug, Clone, PartialEq)]
pub struct AccountKeys {
    pub fingerprint: Fingerprint,
    pub path: AccountPath,
    pub xpub: Xpub,
}

/// Parse the slot values into a checked mnemonic
pub fn parse_mnemonic<S: AsRef<str>>(words: &[S], language: WordlistLanguage) -> ImportResult<Mnemonic> {
    if words.iter().any(|w| w.as_ref().trim().is_empty()) {
        return Err(ImportError::invalid_mnemonic("Phrase has empty word slots"));
    }
    let phrase = join_words(words);
    Mnemonic::parse_in(language.to_bip39(), phrase.as_str())
        .map_err(|e| ImportError::invalid_mnemonic(format!("Invalid mnemonic: {}", e)))
}

/// BIP-39 seed for the phrase and passphrase
pub fn seed_from_words<S: AsRef<str>>(
    words: &[S],
    passphrase: &str,
    language: WordlistLanguage,
) -> ImportResult<Zeroizing<[u8; 64]>> {
    let mnemonic = parse_mnemonic(words, language)?;
    Ok(Zeroizing::new(mnemonic.to_seed(passphrase)))
}

fn master_key(seed: &[u8], network: WalletNetwork) -> ImportResult<Xpriv> {
    Ok(Xpriv::new_master(network.to_bitcoin(), seed)?)
}

/// Master key fingerprint as 8 lowercase hex characters
pub fn master_fingerprint<S: AsRef<str>>(
    words: &[S],
    passphrase: &str,
    language: WordlistLanguage,
) -> ImportResult<String> {
    let seed = seed_from_words(words, passphrase, language)?;
    // the fingerprint does not depend on the network
    let master = master_key(seed.as_ref(), WalletNetwork::Bitcoin)?;
    let secp = Secp256k1::new();
    Ok(master.fingerprint(&secp).to_string())
}

/// Derive the account xpub at `path` together with the master fingerprint
pub fn derive_account<S: AsRef<str>>(
    words: &[S],
    passphrase: &str,
    language: WordlistLanguage,
    network: WalletNetwork,
    path: &AccountPath,
) -> ImportResult<AccountKeys> {
    let seed = seed_from_words(words, passphrase, language)?;
    let secp = Secp256k1::new();
    let master = master_key(seed.as_ref(), network)?;
    let account = master.derive_priv(&secp, &path.to_bip32())?;

    Ok(AccountKeys {
        fingerprint: master.fingerprint(&secp),
        path: path.clone(),
        xpub: Xpub::from_priv(&secp, &account),
    })
}

/// Derive the address at `chain/index` below an account xpub
pub fn derive_address(
    xpub: &Xpub,
    script: ScriptVersion,
    network: WalletNetwork,
    chain: u32,
    index: u32,
) -> ImportResult<Address> {
    let secp = Secp256k1::verification_only();
    let children = [
        ChildNumber::from_normal_idx(chain)?,
        ChildNumber::from_normal_idx(index)?,
    ];
    let child = xpub.derive_pub(&secp, &children)?;
    let compressed = CompressedPublicKey(child.public_key);
    let btc_network = network.to_bitcoin();

    let address = match script {
        ScriptVersion::P2pkh => Address::p2pkh(compressed.pubkey_hash(), btc_network),
        ScriptVersion::P2shP2wpkh => Address::p2shwpkh(&compressed, btc_network),
        ScriptVersion::P2wpkh => Address::p2wpkh(&compressed, btc_network),
        ScriptVersion::P2tr => {
            let (internal_key, _parity) = child.public_key.x_only_public_key();
            Address::p2tr(&secp, internal_key, None, btc_network)
        }
    };

    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::derivation_path::require_valid_path;
    use crate::wallet::derivation_path::standard_account_path;

    const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn words() -> Vec<String> {
        ABANDON_ABOUT.split_whitespace().map(String::from).collect()
    }

    fn first_address(script: ScriptVersion) -> String {
        let path_str = standard_account_path(script, WalletNetwork::Bitcoin, 0);
        let path = require_valid_path(&path_str, script, WalletNetwork::Bitcoin).unwrap();
        let keys = derive_account(&words(), "", WordlistLanguage::English, WalletNetwork::Bitcoin, &path).unwrap();
        derive_address(&keys.xpub, script, WalletNetwork::Bitcoin, EXTERNAL_CHAIN, 0)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_reference_fingerprint() {
        let fp = master_fingerprint(&words(), "", WordlistLanguage::English).unwrap();
        assert_eq!(fp, "73c5da0a");
    }

    #[test]
    fn test_passphrase_changes_fingerprint() {
        let plain = master_fingerprint(&words(), "", WordlistLanguage::English).unwrap();
        let with_pass = master_fingerprint(&words(), "TREZOR", WordlistLanguage::English).unwrap();
        assert_ne!(plain, with_pass);
        assert_eq!(with_pass.len(), 8);
    }

    #[test]
    fn test_fingerprint_rejects_empty_slot() {
        let mut phrase = words();
        phrase[4] = String::new();
        let err = master_fingerprint(&phrase, "", WordlistLanguage::English).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidMnemonic);
    }

    #[test]
    fn test_reference_addresses() {
        assert_eq!(first_address(ScriptVersion::P2pkh), "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA");
        assert_eq!(first_address(ScriptVersion::P2shP2wpkh), "37VucYSaXLCAsxYyAPfbSi9eh4iEcbShgf");
        assert_eq!(first_address(ScriptVersion::P2wpkh), "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
        assert_eq!(
            first_address(ScriptVersion::P2tr),
            "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr"
        );
    }

    #[test]
    fn test_account_keys_carry_fingerprint() {
        let path = require_valid_path("m/84'/0'/0'", ScriptVersion::P2wpkh, WalletNetwork::Bitcoin).unwrap();
        let keys = derive_account(&words(), "", WordlistLanguage::English, WalletNetwork::Bitcoin, &path).unwrap();
        assert_eq!(keys.fingerprint.to_string(), "73c5da0a");
        assert!(keys.xpub.to_string().starts_with("xpub"));
    }

    #[test]
    fn test_testnet_account_uses_tpub() {
        let path = require_valid_path("m/84'/1'/0'", ScriptVersion::P2wpkh, WalletNetwork::Testnet).unwrap();
        let keys = derive_account(&words(), "", WordlistLanguage::English, WalletNetwork::Testnet, &path).unwrap();
        assert!(keys.xpub.to_string().starts_with("tpub"));
        let address = derive_address(&keys.xpub, ScriptVersion::P2wpkh, WalletNetwork::Testnet, EXTERNAL_CHAIN, 0).unwrap();
        assert!(address.to_string().starts_with("tb1q"));
    }
}
