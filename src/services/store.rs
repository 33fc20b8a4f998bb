//! Account Persistence
//!
//! Synced accounts are added once; re-importing the same fingerprint and
//! path on the same network is rejected with `AccountExists`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::error::{ImportError, ImportResult};
use crate::log_info;
use crate::types::Account;

/// Store of imported accounts
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn add_account(&self, account: Account) -> ImportResult<()>;

    async fn accounts(&self) -> ImportResult<Vec<Account>>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<Vec<Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn add_account(&self, account: Account) -> ImportResult<()> {
        let mut accounts = self.accounts.write().await;
        if accounts.iter().any(|a| a.id == account.id) {
            return Err(ImportError::account_exists(account.id));
        }
        accounts.push(account);
        Ok(())
    }

    async fn accounts(&self) -> ImportResult<Vec<Account>> {
        Ok(self.accounts.read().await.clone())
    }
}

const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    accounts: Vec<Account>,
}

/// Accounts kept in a single JSON document, rewritten atomically on add
#[derive(Debug)]
pub struct JsonFileAccountStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileAccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> ImportResult<StoreFile> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreFile {
                    version: STORE_VERSION,
                    accounts: Vec::new(),
                })
            }
            Err(e) => return Err(ImportError::from(e).with_details(self.path.display().to_string())),
        };

        let file: StoreFile = serde_json::from_str(&contents)
            .map_err(|e| ImportError::persistence(format!("Corrupt account store: {}", e)))?;
        if file.version != STORE_VERSION {
            return Err(ImportError::persistence(format!(
                "Unsupported account store version {}",
                file.version
            )));
        }
        Ok(file)
    }

    async fn save(&self, file: &StoreFile) -> ImportResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(file)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for JsonFileAccountStore {
    async fn add_account(&self, account: Account) -> ImportResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut file = self.load().await?;
        if file.accounts.iter().any(|a| a.id == account.id) {
            return Err(ImportError::account_exists(account.id));
        }

        let id = account.id.clone();
        file.accounts.push(account);
        self.save(&file).await?;

        log_info!("store", "account persisted", id = id, total = file.accounts.len());
        Ok(())
    }

    async fn accounts(&self) -> ImportResult<Vec<Account>> {
        Ok(self.load().await?.accounts)
    }
}
