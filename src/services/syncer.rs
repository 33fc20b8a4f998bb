//! Wallet Sync
//!
//! Gap-limit scan over the receive and change chains of an account. Each
//! derived address is looked up in an `AddressSource`; the scan on a chain
//! stops once `gap_limit` consecutive addresses have no history.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bitcoin::bip32::Xpub;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{ImportError, ImportResult};
use crate::types::{Account, AccountDraft, AccountSummary, WalletHandle};
use crate::utils::settings::ImportSettings;
use crate::utils::{build_client, extract_domain, get_json, join_url};
use crate::wallet::{derive_address, EXTERNAL_CHAIN, INTERNAL_CHAIN};
use crate::{log_debug, log_info};

/// Turns a constructed wallet into a synced account
#[async_trait]
pub trait WalletSyncer: Send + Sync {
    async fn sync(&self, handle: &WalletHandle, draft: &AccountDraft) -> ImportResult<Account>;
}

/// On-chain activity of one address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressActivity {
    pub tx_count: u64,
    /// Values of unspent outputs, in satoshis
    pub utxo_values: Vec<u64>,
}

impl AddressActivity {
    pub fn is_used(&self) -> bool {
        self.tx_count > 0
    }
}

/// Per-address history lookup
#[async_trait]
pub trait AddressSource: Send + Sync {
    async fn activity(&self, address: &str) -> ImportResult<AddressActivity>;
}

// =============================================================================
// Esplora
// =============================================================================

#[derive(Debug, Deserialize)]
struct EsploraAddress {
    chain_stats: EsploraStats,
    mempool_stats: EsploraStats,
}

#[derive(Debug, Deserialize)]
struct EsploraStats {
    tx_count: u64,
}

#[derive(Debug, Deserialize)]
struct EsploraUtxo {
    value: u64,
}

/// Esplora REST backend (`/address/:a` and `/address/:a/utxo`)
#[derive(Debug, Clone)]
pub struct EsploraClient {
    base_url: String,
    client: Client,
}

impl EsploraClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ImportResult<Self> {
        Ok(Self {
            base_url: base_url.into(),
            client: build_client(timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AddressSource for EsploraClient {
    async fn activity(&self, address: &str) -> ImportResult<AddressActivity> {
        let stats: EsploraAddress = get_json(&self.client, &join_url(&self.base_url, &format!("address/{}", address))).await?;
        let tx_count = stats.chain_stats.tx_count + stats.mempool_stats.tx_count;

        if tx_count == 0 {
            return Ok(AddressActivity::default());
        }

        let utxos: Vec<EsploraUtxo> =
            get_json(&self.client, &join_url(&self.base_url, &format!("address/{}/utxo", address))).await?;

        Ok(AddressActivity {
            tx_count,
            utxo_values: utxos.into_iter().map(|u| u.value).collect(),
        })
    }
}

// =============================================================================
// Gap-limit scan
// =============================================================================

/// Syncer scanning both chains of an account against an address source
#[derive(Debug, Clone)]
pub struct GapLimitSyncer<S> {
    source: S,
    gap_limit: u32,
}

pub type EsploraSyncer = GapLimitSyncer<EsploraClient>;

impl EsploraSyncer {
    pub fn from_settings(settings: &ImportSettings) -> ImportResult<Self> {
        let client = EsploraClient::new(
            settings.esplora_url.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )?;
        Ok(GapLimitSyncer::new(client, settings.gap_limit))
    }
}

impl<S: AddressSource> GapLimitSyncer<S> {
    pub fn new(source: S, gap_limit: u32) -> Self {
        Self {
            source,
            gap_limit: gap_limit.max(1),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    async fn scan_chain(&self, xpub: &Xpub, handle: &WalletHandle, chain: u32) -> ImportResult<AccountSummary> {
        let mut summary = AccountSummary::default();
        let mut gap = 0;
        let mut index = 0;

        while gap < self.gap_limit {
            let address = derive_address(xpub, handle.script_version, handle.network, chain, index)?.to_string();
            let activity = self.source.activity(&address).await.map_err(|e| {
                ImportError::new(e.code, format!("Sync failed: {}", e.message))
                    .with_details(format!("chain {} index {}", chain, index))
            })?;

            if activity.is_used() {
                gap = 0;
                summary.used_addresses += 1;
                summary.number_of_utxos += activity.utxo_values.len() as u64;
                summary.balance += activity.utxo_values.iter().sum::<u64>();
                log_debug!("sync", "address used", address = address, utxos = activity.utxo_values.len());
            } else {
                gap += 1;
            }
            index += 1;
        }

        Ok(summary)
    }
}

#[async_trait]
impl<S: AddressSource> WalletSyncer for GapLimitSyncer<S> {
    async fn sync(&self, handle: &WalletHandle, draft: &AccountDraft) -> ImportResult<Account> {
        let xpub = Xpub::from_str(&handle.account_xpub)?;

        let receive = self.scan_chain(&xpub, handle, EXTERNAL_CHAIN).await?;
        let change = self.scan_chain(&xpub, handle, INTERNAL_CHAIN).await?;

        let summary = AccountSummary {
            number_of_utxos: receive.number_of_utxos + change.number_of_utxos,
            balance: receive.balance + change.balance,
            used_addresses: receive.used_addresses + change.used_addresses,
        };

        log_info!("sync", "account synced",
            fingerprint = handle.fingerprint,
            utxos = summary.number_of_utxos,
            balance = summary.balance
        );
        Ok(Account::from_sync(draft, handle, summary))
    }
}

impl std::fmt::Display for EsploraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "esplora@{}", extract_domain(&self.base_url))
    }
}
