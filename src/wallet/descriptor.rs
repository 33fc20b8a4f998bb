//! Output Descriptors
//!
//! Single-key account descriptors (`pkh`, `sh(wpkh)`, `wpkh`, `tr`) for an
//! imported account. `miniscript` renders them with their `#checksum` and
//! checks the checksum again when a descriptor string is parsed back.

use std::str::FromStr;

use bitcoin::bip32::{ChildNumber, DerivationPath, Fingerprint, Xpub};
use bitcoin::Address;
use miniscript::descriptor::{Descriptor, DescriptorPublicKey, DescriptorXKey, Wildcard};

use crate::error::{ImportError, ImportResult};
use crate::types::{ScriptVersion, WalletNetwork};

use super::derivation_path::AccountPath;

/// Ranged descriptor over one chain of an account
pub type AccountDescriptor = Descriptor<DescriptorPublicKey>;

/// `[fingerprint/account path]xpub/chain/*`
pub fn account_key(
    fingerprint: Fingerprint,
    path: &AccountPath,
    xpub: &Xpub,
    chain: u32,
) -> ImportResult<DescriptorPublicKey> {
    let chain = ChildNumber::from_normal_idx(chain)?;
    Ok(DescriptorPublicKey::XPub(DescriptorXKey {
        origin: Some((fingerprint, path.to_bip32())),
        xkey: *xpub,
        derivation_path: DerivationPath::from(vec![chain]),
        wildcard: Wildcard::Unhardened,
    }))
}

/// Descriptor for one chain (0 receive, 1 change) of a single-key account
pub fn account_descriptor(
    script: ScriptVersion,
    fingerprint: Fingerprint,
    path: &AccountPath,
    xpub: &Xpub,
    chain: u32,
) -> ImportResult<AccountDescriptor> {
    let key = account_key(fingerprint, path, xpub, chain)?;
    let descriptor = match script {
        ScriptVersion::P2pkh => Descriptor::new_pkh(key)?,
        ScriptVersion::P2shP2wpkh => Descriptor::new_sh_wpkh(key)?,
        ScriptVersion::P2wpkh => Descriptor::new_wpkh(key)?,
        ScriptVersion::P2tr => Descriptor::new_tr(key, None)?,
    };
    Ok(descriptor)
}

/// Parse a descriptor string; a `#checksum` suffix must match when present
pub fn parse_descriptor(descriptor: &str) -> ImportResult<AccountDescriptor> {
    Ok(AccountDescriptor::from_str(descriptor.trim())?)
}

/// Address at `index` of a ranged descriptor
pub fn descriptor_address(
    descriptor: &AccountDescriptor,
    network: WalletNetwork,
    index: u32,
) -> ImportResult<Address> {
    let definite = descriptor
        .at_derivation_index(index)
        .map_err(|e| ImportError::invalid_path(format!("Cannot derive index {}: {}", index, e)))?;
    Ok(definite.address(network.to_bitcoin())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::wallet::derivation::{derive_account, derive_address, AccountKeys, EXTERNAL_CHAIN, INTERNAL_CHAIN};
    use crate::wallet::derivation_path::{require_valid_path, standard_account_path};
    use crate::wallet::wordlist::WordlistLanguage;

    const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn account(script: ScriptVersion) -> (AccountPath, AccountKeys) {
        let words: Vec<&str> = ABANDON_ABOUT.split_whitespace().collect();
        let path_str = standard_account_path(script, WalletNetwork::Bitcoin, 0);
        let path = require_valid_path(&path_str, script, WalletNetwork::Bitcoin).unwrap();
        let keys = derive_account(&words, "", WordlistLanguage::English, WalletNetwork::Bitcoin, &path).unwrap();
        (path, keys)
    }

    #[test]
    fn test_account_descriptor_shape() {
        let (path, keys) = account(ScriptVersion::P2wpkh);

        let receive = account_descriptor(ScriptVersion::P2wpkh, keys.fingerprint, &path, &keys.xpub, EXTERNAL_CHAIN)
            .unwrap()
            .to_string();
        assert!(receive.starts_with("wpkh([73c5da0a/84'/0'/0']xpub"));
        assert!(receive.contains("/0/*)#"));

        let (path, keys) = account(ScriptVersion::P2shP2wpkh);
        let change = account_descriptor(ScriptVersion::P2shP2wpkh, keys.fingerprint, &path, &keys.xpub, INTERNAL_CHAIN)
            .unwrap()
            .to_string();
        assert!(change.starts_with("sh(wpkh([73c5da0a/49'/0'/0']"));
        assert!(change.contains("/1/*))#"));
    }

    #[test]
    fn test_rendered_descriptor_parses_back() {
        let (path, keys) = account(ScriptVersion::P2tr);
        let descriptor = account_descriptor(ScriptVersion::P2tr, keys.fingerprint, &path, &keys.xpub, EXTERNAL_CHAIN).unwrap();

        let rendered = descriptor.to_string();
        assert!(rendered.starts_with("tr("));
        assert_eq!(parse_descriptor(&rendered).unwrap(), descriptor);

        // without the checksum the body still parses
        let (body, _) = rendered.rsplit_once('#').unwrap();
        assert_eq!(parse_descriptor(body).unwrap(), descriptor);
    }

    #[test]
    fn test_tampered_checksum_is_rejected() {
        let (path, keys) = account(ScriptVersion::P2wpkh);
        let rendered = account_descriptor(ScriptVersion::P2wpkh, keys.fingerprint, &path, &keys.xpub, EXTERNAL_CHAIN)
            .unwrap()
            .to_string();

        let (body, checksum) = rendered.rsplit_once('#').unwrap();
        let flipped = if checksum.starts_with('q') { "p" } else { "q" };
        let tampered = format!("{}#{}{}", body, flipped, &checksum[1..]);

        let err = parse_descriptor(&tampered).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParseError);
    }

    #[test]
    fn test_descriptor_addresses_match_direct_derivation() {
        for script in ScriptVersion::ALL {
            let (path, keys) = account(script);
            let descriptor = account_descriptor(script, keys.fingerprint, &path, &keys.xpub, EXTERNAL_CHAIN).unwrap();
            for index in 0..3 {
                let from_descriptor = descriptor_address(&descriptor, WalletNetwork::Bitcoin, index).unwrap();
                let direct = derive_address(&keys.xpub, script, WalletNetwork::Bitcoin, EXTERNAL_CHAIN, index).unwrap();
                assert_eq!(from_descriptor, direct, "{} index {}", script, index);
            }
        }
    }

    #[test]
    fn test_reference_receive_address() {
        let (path, keys) = account(ScriptVersion::P2wpkh);
        let descriptor = account_descriptor(ScriptVersion::P2wpkh, keys.fingerprint, &path, &keys.xpub, EXTERNAL_CHAIN).unwrap();
        assert_eq!(
            descriptor_address(&descriptor, WalletNetwork::Bitcoin, 0).unwrap().to_string(),
            "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"
        );
    }
}
