//! Import Session
//!
//! Async driver around `apply_event`. The session owns the phrase state,
//! runs fingerprint derivations on background tasks, feeds their results
//! back in completion order, and sequences the confirmation phases.
//!
//! Every background task observes the session's `CancellationToken`. After
//! `dispose()` no completion is applied and every entry point returns
//! `Cancelled`.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{ErrorCode, ImportError, ImportResult};
use crate::services::{AccountStore, InMemoryAccountStore, JsonFileAccountStore, WalletSyncer};
use crate::types::{AccountDraft, NavigationTarget};
use crate::utils::settings::ImportSettings;
use crate::wallet::{
    Bip32FingerprintDeriver, Bip32WalletLoader, ChecksumValidator, FingerprintDeriver, WalletLoader, Wordlist,
};
use crate::{log_debug, log_error, log_info, log_warn};

use super::confirm::{ConfirmFlow, ConfirmPhase, ConfirmStatus};
use super::state::{apply_event, ImportCommand, ImportEvent, PhraseState};

/// Collaborators used by a session
#[derive(Clone)]
pub struct ImportServices {
    pub deriver: Arc<dyn FingerprintDeriver>,
    pub loader: Arc<dyn WalletLoader>,
    pub syncer: Arc<dyn WalletSyncer>,
    pub store: Arc<dyn AccountStore>,
}

impl ImportServices {
    /// BIP-32 derivation and construction with the given syncer, and the
    /// account store named by the settings
    pub fn standard(settings: &ImportSettings, syncer: Arc<dyn WalletSyncer>) -> Self {
        let store: Arc<dyn AccountStore> = match &settings.account_store_path {
            Some(path) => Arc::new(JsonFileAccountStore::new(path.clone())),
            None => Arc::new(InMemoryAccountStore::new()),
        };
        Self {
            deriver: Arc::new(Bip32FingerprintDeriver::new(settings)),
            loader: Arc::new(Bip32WalletLoader::new()),
            syncer,
            store,
        }
    }
}

pub struct ImportSession {
    settings: ImportSettings,
    validator: ChecksumValidator,
    state: PhraseState,
    services: ImportServices,
    flow: ConfirmFlow,
    cancel: CancellationToken,
    completions_tx: mpsc::UnboundedSender<ImportEvent>,
    completions_rx: mpsc::UnboundedReceiver<ImportEvent>,
    in_flight: usize,
    derivations_started: u64,
}

impl ImportSession {
    pub fn new(settings: ImportSettings, services: ImportServices) -> ImportResult<Self> {
        for warning in settings.validate()? {
            log_warn!("session", "settings warning", warning = warning);
        }

        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let validator = ChecksumValidator::new(settings.wordlist());

        log_info!("session", "import session started",
            word_count = settings.word_count,
            network = settings.network,
            script = settings.script_version
        );

        Ok(Self {
            state: PhraseState::new(settings.word_count),
            settings,
            validator,
            services,
            flow: ConfirmFlow::default(),
            cancel: CancellationToken::new(),
            completions_tx,
            completions_rx,
            in_flight: 0,
            derivations_started: 0,
        })
    }

    pub fn state(&self) -> &PhraseState {
        &self.state
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    pub fn wordlist(&self) -> &Wordlist {
        self.validator.wordlist()
    }

    pub fn flow(&self) -> &ConfirmFlow {
        &self.flow
    }

    /// Derivation requests issued so far
    pub fn derivations_started(&self) -> u64 {
        self.derivations_started
    }

    /// Derivations whose results have not been applied yet
    pub fn pending_derivations(&self) -> usize {
        self.in_flight
    }

    /// Token cancelled by `dispose`; clone it to cancel from elsewhere
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn suggestions(&self) -> Vec<&'static str> {
        self.state.suggestions(self.validator.wordlist())
    }

    // =========================================================================
    // Input events
    // =========================================================================

    pub fn on_word_text_changed(&mut self, slot: usize, text: &str) -> ImportResult<()> {
        self.dispatch(ImportEvent::WordTextChanged { slot, text: text.to_string() })
    }

    pub fn on_word_end_editing(&mut self, slot: usize, text: &str) -> ImportResult<()> {
        self.dispatch(ImportEvent::WordEndEditing { slot, text: text.to_string() })
    }

    pub fn on_word_focused(&mut self, slot: usize, text: &str) -> ImportResult<()> {
        self.dispatch(ImportEvent::WordFocused { slot, text: text.to_string() })
    }

    pub fn on_word_selected_from_helper(&mut self, word: &str) -> ImportResult<()> {
        self.dispatch(ImportEvent::WordSelectedFromHelper { word: word.to_string() })
    }

    pub fn on_passphrase_changed(&mut self, passphrase: &str) -> ImportResult<()> {
        self.dispatch(ImportEvent::PassphraseChanged { passphrase: passphrase.to_string() })
    }

    /// Apply an event and start the work it requests
    pub fn dispatch(&mut self, event: ImportEvent) -> ImportResult<()> {
        if self.is_disposed() {
            return Err(ImportError::cancelled());
        }

        log_debug!("session", "event", event = event.name());
        let (next, commands) = apply_event(&self.state, event, &self.validator);
        self.state = next;

        // a confirmation belongs to the phrase it started with
        if self.flow.phrase_generation.is_some_and(|g| g != self.state.generation) {
            log_info!("session", "phrase changed, confirmation discarded", status = self.flow.status_name());
            self.flow = ConfirmFlow::default();
        }

        for command in commands {
            self.execute(command)?;
        }
        Ok(())
    }

    fn execute(&mut self, command: ImportCommand) -> ImportResult<()> {
        match command {
            ImportCommand::DeriveFingerprint { generation, words, passphrase } => {
                let runtime = tokio::runtime::Handle::try_current()
                    .map_err(|_| ImportError::internal("Fingerprint derivation needs a tokio runtime"))?;

                let deriver = Arc::clone(&self.services.deriver);
                let tx = self.completions_tx.clone();
                let token = self.cancel.child_token();

                self.in_flight += 1;
                self.derivations_started += 1;
                log_debug!("session", "deriving fingerprint", generation = generation);

                runtime.spawn(async move {
                    let mut derivation =
                        tokio::spawn(async move { deriver.derive_fingerprint(words, passphrase).await });
                    tokio::select! {
                        _ = token.cancelled() => derivation.abort(),
                        joined = &mut derivation => {
                            // a panicking deriver still reports back
                            let result = joined.unwrap_or_else(|e| Err(ImportError::from(e)));
                            let _ = tx.send(ImportEvent::FingerprintDerived { generation, result });
                        }
                    }
                });
                Ok(())
            }
        }
    }

    // =========================================================================
    // Completions
    // =========================================================================

    fn apply_completion(&mut self, event: ImportEvent) {
        self.in_flight = self.in_flight.saturating_sub(1);
        // completions never request further work
        let (next, _) = apply_event(&self.state, event, &self.validator);
        self.state = next;
    }

    /// Apply completions that have already arrived, without waiting
    pub fn poll_completions(&mut self) -> ImportResult<usize> {
        if self.is_disposed() {
            return Err(ImportError::cancelled());
        }
        let mut applied = 0;
        while let Ok(event) = self.completions_rx.try_recv() {
            self.apply_completion(event);
            applied += 1;
        }
        Ok(applied)
    }

    /// Wait for the next completion and apply it
    pub async fn next_completion(&mut self) -> ImportResult<bool> {
        if self.in_flight == 0 {
            return Ok(false);
        }
        let event = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ImportError::cancelled()),
            event = self.completions_rx.recv() => event,
        };
        match event {
            Some(event) => {
                self.apply_completion(event);
                Ok(true)
            }
            None => Err(ImportError::cancelled()),
        }
    }

    /// Wait until every outstanding derivation has been applied
    pub async fn settle(&mut self) -> ImportResult<()> {
        while self.next_completion().await? {}
        Ok(())
    }

    // =========================================================================
    // Confirmation
    // =========================================================================

    /// Construct, sync and persist the account for the current phrase
    pub async fn confirm_import(&mut self) -> ImportResult<()> {
        if self.is_disposed() {
            return Err(ImportError::cancelled());
        }
        if !self.state.can_confirm() {
            return Err(ImportError::checksum_invalid());
        }
        if self.flow.status == ConfirmStatus::Completed {
            return Err(ImportError::invalid_input("Account was already imported"));
        }

        self.flow = ConfirmFlow::default();
        self.flow.phrase_generation = Some(self.state.generation);
        self.run_phases().await
    }

    /// Resume a failed confirmation at the phase that failed
    pub async fn retry(&mut self) -> ImportResult<()> {
        if self.is_disposed() {
            return Err(ImportError::cancelled());
        }
        if !self.state.can_confirm() {
            return Err(ImportError::checksum_invalid());
        }
        if !self.flow.is_failed() || self.flow.phrase_generation != Some(self.state.generation) {
            return Err(ImportError::invalid_input("Nothing to retry"));
        }
        self.run_phases().await
    }

    async fn run_phases(&mut self) -> ImportResult<()> {
        while let Some(phase) = self.flow.next_phase() {
            self.flow.begin(phase);
            log_info!("session", "confirm phase", phase = phase);

            let outcome = self.run_phase(phase).await;
            if let Err(e) = outcome {
                if e.code == ErrorCode::Cancelled {
                    return Err(e);
                }
                log_error!("session", "confirm phase failed", phase = phase, error = e);
                self.flow.fail(phase, e.message.clone(), e.is_retryable());
                return Err(e);
            }
        }

        self.flow.complete();
        log_info!("session", "account imported",
            fingerprint = self.flow.modal.fingerprint.clone().unwrap_or_default()
        );
        Ok(())
    }

    async fn run_phase(&mut self, phase: ConfirmPhase) -> ImportResult<()> {
        let token = self.cancel.clone();
        match phase {
            ConfirmPhase::LoadingWallet => {
                let loader = Arc::clone(&self.services.loader);
                let words = self.state.mnemonic_words();
                let passphrase = self.state.passphrase.clone();
                let handle = cancellable(&token, loader.load(words, passphrase, &self.settings)).await?;
                self.flow.wallet_loaded(&self.settings.name, handle);
            }
            ConfirmPhase::Syncing => {
                let syncer = Arc::clone(&self.services.syncer);
                let handle = self
                    .flow
                    .handle
                    .clone()
                    .ok_or_else(|| ImportError::internal("Sync started without a wallet"))?;
                let draft = AccountDraft::from_handle(self.settings.name.clone(), &handle);
                let account = cancellable(&token, syncer.sync(&handle, &draft)).await?;
                self.flow.account = Some(account);
            }
            ConfirmPhase::Persisting => {
                let store = Arc::clone(&self.services.store);
                let account = self
                    .flow
                    .account
                    .clone()
                    .ok_or_else(|| ImportError::internal("Persist started without an account"))?;
                cancellable(&token, store.add_account(account)).await?;
                self.flow.persisted = true;
            }
        }
        Ok(())
    }

    /// Close the "account added" modal, drop the builder state and leave
    pub fn close_modal(&mut self) -> NavigationTarget {
        self.flow = ConfirmFlow::default();
        self.state = self.state.reset();
        NavigationTarget::Root
    }

    /// Cancel all in-flight work; the session accepts nothing afterwards
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.cancel.cancel();
        self.completions_rx.close();
        self.in_flight = 0;
        log_info!("session", "import session disposed");
    }
}

impl Drop for ImportSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn cancellable<T>(token: &CancellationToken, work: impl Future<Output = ImportResult<T>>) -> ImportResult<T> {
    tokio::select! {
        _ = token.cancelled() => Err(ImportError::cancelled()),
        result = work => result,
    }
}
