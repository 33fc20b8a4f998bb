//! Confirmation Flow State
//!
//! Tracks the three asynchronous phases of an import (wallet construction,
//! sync, persistence) and the "account added" modal. Completed phase
//! results are kept so a retry resumes at the phase that failed.

use serde::{Deserialize, Serialize};

use crate::types::{Account, AccountSummary, ScriptVersion, WalletHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmPhase {
    LoadingWallet,
    Syncing,
    Persisting,
}

impl std::fmt::Display for ConfirmPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfirmPhase::LoadingWallet => write!(f, "wallet construction"),
            ConfirmPhase::Syncing => write!(f, "sync"),
            ConfirmPhase::Persisting => write!(f, "persistence"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConfirmStatus {
    Idle,
    InProgress { phase: ConfirmPhase },
    Completed,
    Failed { phase: ConfirmPhase, message: String, retryable: bool },
}

/// "Account added" modal contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountAddedModal {
    pub visible: bool,
    pub account_name: String,
    pub fingerprint: Option<String>,
    pub script_version: Option<ScriptVersion>,
    pub derivation_path: Option<String>,
    /// `None` renders as a pending placeholder
    pub summary: Option<AccountSummary>,
}

impl AccountAddedModal {
    /// e.g. "Native SegWit (P2WPKH)"
    pub fn script_label(&self) -> Option<String> {
        self.script_version
            .map(|script| format!("{} ({})", script.display_name(), script))
    }
}

/// Builder state of one confirmation attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmFlow {
    pub status: ConfirmStatus,
    pub loading: bool,
    pub modal: AccountAddedModal,
    pub(crate) handle: Option<WalletHandle>,
    pub(crate) account: Option<Account>,
    pub(crate) persisted: bool,
    /// Phrase generation the attempt was started for
    pub(crate) phrase_generation: Option<u64>,
}

impl Default for ConfirmFlow {
    fn default() -> Self {
        Self {
            status: ConfirmStatus::Idle,
            loading: false,
            modal: AccountAddedModal::default(),
            handle: None,
            account: None,
            persisted: false,
            phrase_generation: None,
        }
    }
}

impl ConfirmFlow {
    pub fn handle(&self) -> Option<&WalletHandle> {
        self.handle.as_ref()
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ConfirmStatus::Failed { .. })
    }

    pub fn status_name(&self) -> &'static str {
        match self.status {
            ConfirmStatus::Idle => "idle",
            ConfirmStatus::InProgress { .. } => "in_progress",
            ConfirmStatus::Completed => "completed",
            ConfirmStatus::Failed { .. } => "failed",
        }
    }

    /// First phase without a result
    pub fn next_phase(&self) -> Option<ConfirmPhase> {
        if self.handle.is_none() {
            Some(ConfirmPhase::LoadingWallet)
        } else if self.account.is_none() {
            Some(ConfirmPhase::Syncing)
        } else if !self.persisted {
            Some(ConfirmPhase::Persisting)
        } else {
            None
        }
    }

    pub(crate) fn begin(&mut self, phase: ConfirmPhase) {
        self.status = ConfirmStatus::InProgress { phase };
        self.loading = true;
    }

    pub(crate) fn fail(&mut self, phase: ConfirmPhase, message: String, retryable: bool) {
        self.status = ConfirmStatus::Failed { phase, message, retryable };
        self.loading = false;
    }

    /// Wallet constructed: the modal opens with pending sync fields
    pub(crate) fn wallet_loaded(&mut self, name: &str, handle: WalletHandle) {
        self.modal = AccountAddedModal {
            visible: true,
            account_name: name.to_string(),
            fingerprint: Some(handle.fingerprint.clone()),
            script_version: Some(handle.script_version),
            derivation_path: Some(handle.derivation_path.clone()),
            summary: None,
        };
        self.handle = Some(handle);
    }

    pub(crate) fn complete(&mut self) {
        self.modal.summary = self.account.as_ref().map(|a| a.summary);
        self.status = ConfirmStatus::Completed;
        self.loading = false;
    }
}
