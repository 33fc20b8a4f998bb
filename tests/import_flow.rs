use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use seed_import::wallet::{Bip32FingerprintDeriver, Bip32WalletLoader, SecretWords};
use seed_import::{
    Account, AccountDraft, AccountStore, AccountSummary, ConfirmPhase, ConfirmStatus, ErrorCode, FingerprintDeriver,
    ImportError, ImportResult, ImportServices, ImportSession, ImportSettings, InMemoryAccountStore, NavigationTarget,
    ScriptVersion, WalletHandle, WalletLoader, WalletSyncer,
};
use zeroize::Zeroizing;

const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn words() -> Vec<&'static str> {
    ABANDON_ABOUT.split_whitespace().collect()
}

/// Counts calls and delegates to the real deriver
struct CountingDeriver {
    inner: Bip32FingerprintDeriver,
    calls: AtomicU32,
}

#[async_trait]
impl FingerprintDeriver for CountingDeriver {
    async fn derive_fingerprint(&self, words: SecretWords, passphrase: Zeroizing<String>) -> ImportResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.derive_fingerprint(words, passphrase).await
    }
}

/// Older requests finish after newer ones
struct SlowFirstDeriver {
    calls: AtomicU32,
}

#[async_trait]
impl FingerprintDeriver for SlowFirstDeriver {
    async fn derive_fingerprint(&self, _words: SecretWords, passphrase: Zeroizing<String>) -> ImportResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Ok(format!("fp-{}", passphrase.as_str()))
    }
}

struct NeverDeriver;

#[async_trait]
impl FingerprintDeriver for NeverDeriver {
    async fn derive_fingerprint(&self, _words: SecretWords, _passphrase: Zeroizing<String>) -> ImportResult<String> {
        std::future::pending().await
    }
}

struct PanickingDeriver;

#[async_trait]
impl FingerprintDeriver for PanickingDeriver {
    async fn derive_fingerprint(&self, _words: SecretWords, _passphrase: Zeroizing<String>) -> ImportResult<String> {
        panic!("deriver crashed")
    }
}

struct CountingLoader {
    calls: AtomicU32,
}

#[async_trait]
impl WalletLoader for CountingLoader {
    async fn load(
        &self,
        words: SecretWords,
        passphrase: Zeroizing<String>,
        settings: &ImportSettings,
    ) -> ImportResult<WalletHandle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Bip32WalletLoader::new().load(words, passphrase, settings).await
    }
}

/// Fails the first `failures` calls
struct FlakySyncer {
    failures: u32,
    calls: AtomicU32,
}

#[async_trait]
impl WalletSyncer for FlakySyncer {
    async fn sync(&self, handle: &WalletHandle, draft: &AccountDraft) -> ImportResult<Account> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(ImportError::sync_failed("Esplora returned 503"));
        }
        let summary = AccountSummary {
            number_of_utxos: 3,
            balance: 125_000,
            used_addresses: 2,
        };
        Ok(Account::from_sync(draft, handle, summary))
    }
}

struct FailingStore {
    fail: AtomicBool,
    inner: InMemoryAccountStore,
}

#[async_trait]
impl AccountStore for FailingStore {
    async fn add_account(&self, account: Account) -> ImportResult<()> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(ImportError::persistence("disk full"));
        }
        self.inner.add_account(account).await
    }

    async fn accounts(&self) -> ImportResult<Vec<Account>> {
        self.inner.accounts().await
    }
}

struct Harness {
    deriver: Arc<CountingDeriver>,
    loader: Arc<CountingLoader>,
    syncer: Arc<FlakySyncer>,
    store: Arc<FailingStore>,
}

impl Harness {
    fn new(sync_failures: u32, store_fails: bool) -> Self {
        let settings = ImportSettings::default();
        Self {
            deriver: Arc::new(CountingDeriver {
                inner: Bip32FingerprintDeriver::new(&settings),
                calls: AtomicU32::new(0),
            }),
            loader: Arc::new(CountingLoader { calls: AtomicU32::new(0) }),
            syncer: Arc::new(FlakySyncer {
                failures: sync_failures,
                calls: AtomicU32::new(0),
            }),
            store: Arc::new(FailingStore {
                fail: AtomicBool::new(store_fails),
                inner: InMemoryAccountStore::new(),
            }),
        }
    }

    fn session(&self) -> ImportSession {
        let services = ImportServices {
            deriver: self.deriver.clone(),
            loader: self.loader.clone(),
            syncer: self.syncer.clone(),
            store: self.store.clone(),
        };
        ImportSession::new(ImportSettings::default(), services).expect("session")
    }
}

fn session_with_deriver(deriver: Arc<dyn FingerprintDeriver>) -> ImportSession {
    let harness = Harness::new(0, false);
    let services = ImportServices {
        deriver,
        loader: harness.loader.clone(),
        syncer: harness.syncer.clone(),
        store: harness.store.clone(),
    };
    ImportSession::new(ImportSettings::default(), services).expect("session")
}

fn type_phrase(session: &mut ImportSession, words: &[&str]) {
    for (slot, word) in words.iter().enumerate() {
        session.on_word_focused(slot, "").unwrap();
        session.on_word_text_changed(slot, word).unwrap();
        session.on_word_end_editing(slot, word).unwrap();
    }
}

#[tokio::test]
async fn eleven_words_then_twelfth_derives_once() {
    let harness = Harness::new(0, false);
    let mut session = harness.session();
    let words = words();

    type_phrase(&mut session, &words[..11]);
    session.settle().await.unwrap();
    assert!(!session.state().checksum_valid);
    assert!(session.state().fingerprint.is_none());
    assert_eq!(harness.deriver.calls.load(Ordering::SeqCst), 0);

    session.on_word_text_changed(11, "about").unwrap();
    session.settle().await.unwrap();

    assert!(session.state().checksum_valid);
    assert_eq!(session.state().fingerprint.as_deref(), Some("73c5da0a"));
    assert_eq!(harness.deriver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.derivations_started(), 1);
}

#[tokio::test]
async fn passphrase_change_keeps_checksum_and_changes_fingerprint() {
    let harness = Harness::new(0, false);
    let mut session = harness.session();
    type_phrase(&mut session, &words());
    session.settle().await.unwrap();
    let plain = session.state().fingerprint.clone().unwrap();

    session.on_passphrase_changed("TREZOR").unwrap();
    assert!(session.state().fingerprint.is_none());
    session.settle().await.unwrap();

    assert!(session.state().checksum_valid);
    let with_passphrase = session.state().fingerprint.clone().unwrap();
    assert_ne!(plain, with_passphrase);
}

#[tokio::test]
async fn slow_stale_result_does_not_overwrite_newer_one() {
    let deriver = Arc::new(SlowFirstDeriver { calls: AtomicU32::new(0) });
    let mut session = session_with_deriver(deriver.clone());

    type_phrase(&mut session, &words());
    session.on_passphrase_changed("second").unwrap();
    assert_eq!(session.pending_derivations(), 2);

    // the newer result lands first, then the slow stale one
    session.settle().await.unwrap();

    assert_eq!(deriver.calls.load(Ordering::SeqCst), 2);
    assert_eq!(session.state().fingerprint.as_deref(), Some("fp-second"));
}

#[tokio::test]
async fn disposed_session_rejects_events_and_ignores_completions() {
    let mut session = session_with_deriver(Arc::new(NeverDeriver));
    type_phrase(&mut session, &words());
    assert_eq!(session.pending_derivations(), 1);

    let token = session.cancellation_token();
    session.dispose();
    assert!(token.is_cancelled());
    assert!(session.is_disposed());

    let before = session.state().clone();
    let err = session.on_word_text_changed(0, "zoo").unwrap_err();
    assert_eq!(err.code, ErrorCode::Cancelled);
    assert_eq!(session.poll_completions().unwrap_err().code, ErrorCode::Cancelled);
    assert_eq!(session.confirm_import().await.unwrap_err().code, ErrorCode::Cancelled);
    assert_eq!(session.state(), &before);
}

#[tokio::test]
async fn confirm_is_rejected_without_valid_checksum() {
    let harness = Harness::new(0, false);
    let mut session = harness.session();
    type_phrase(&mut session, &vec!["abandon"; 12]);

    assert!(!session.state().can_confirm());
    let err = session.confirm_import().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ChecksumInvalid);
    assert_eq!(harness.loader.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.syncer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.flow().status, ConfirmStatus::Idle);
}

#[tokio::test]
async fn confirm_runs_all_phases_and_persists() {
    let harness = Harness::new(0, false);
    let mut session = harness.session();
    type_phrase(&mut session, &words());
    session.settle().await.unwrap();

    session.confirm_import().await.unwrap();

    let flow = session.flow();
    assert_eq!(flow.status, ConfirmStatus::Completed);
    assert!(!flow.loading);
    assert!(flow.modal.visible);
    assert_eq!(flow.modal.fingerprint.as_deref(), Some("73c5da0a"));
    assert_eq!(flow.modal.script_version, Some(ScriptVersion::P2wpkh));
    assert_eq!(flow.modal.script_label().as_deref(), Some("Native SegWit (P2WPKH)"));
    assert_eq!(flow.modal.derivation_path.as_deref(), Some("m/84'/0'/0'"));
    assert_eq!(flow.modal.summary.map(|s| s.balance), Some(125_000));

    let stored = harness.store.accounts().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, "bitcoin/73c5da0a/m/84'/0'/0'");
    assert_eq!(stored[0].summary.number_of_utxos, 3);
}

#[tokio::test]
async fn sync_failure_is_recoverable_and_retry_reuses_wallet() {
    let harness = Harness::new(1, false);
    let mut session = harness.session();
    type_phrase(&mut session, &words());
    session.settle().await.unwrap();

    let err = session.confirm_import().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::SyncFailed);

    let flow = session.flow();
    assert!(!flow.loading);
    assert!(matches!(
        &flow.status,
        ConfirmStatus::Failed { phase: ConfirmPhase::Syncing, retryable: true, .. }
    ));
    // the modal opened after construction, sync fields still pending
    assert!(flow.modal.visible);
    assert!(flow.modal.summary.is_none());

    session.retry().await.unwrap();
    assert_eq!(session.flow().status, ConfirmStatus::Completed);
    assert_eq!(harness.loader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.syncer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn retry_after_phrase_breaks_checksum_is_rejected() {
    let harness = Harness::new(1, false);
    let mut session = harness.session();
    type_phrase(&mut session, &words());
    session.settle().await.unwrap();
    assert_eq!(session.confirm_import().await.unwrap_err().code, ErrorCode::SyncFailed);

    session.on_word_text_changed(11, "abandon").unwrap();
    assert!(!session.state().checksum_valid);

    let err = session.retry().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ChecksumInvalid);
    assert_eq!(session.flow().status, ConfirmStatus::Idle);
    assert!(!session.flow().modal.visible);
    assert_eq!(harness.syncer.calls.load(Ordering::SeqCst), 1);
    assert!(harness.store.accounts().await.unwrap().is_empty());
}

#[tokio::test]
async fn phrase_change_discards_failed_attempt() {
    let harness = Harness::new(1, false);
    let mut session = harness.session();
    type_phrase(&mut session, &words());
    session.settle().await.unwrap();
    assert!(session.confirm_import().await.is_err());
    assert!(session.flow().handle().is_some());

    // still checksum-valid, but a different wallet
    session.on_passphrase_changed("TREZOR").unwrap();
    session.settle().await.unwrap();
    assert!(session.state().can_confirm());
    assert_eq!(session.flow().status, ConfirmStatus::Idle);
    assert!(session.flow().handle().is_none());
    assert_eq!(session.retry().await.unwrap_err().code, ErrorCode::InvalidInput);

    session.confirm_import().await.unwrap();
    assert_eq!(harness.loader.calls.load(Ordering::SeqCst), 2);
    let stored = harness.store.accounts().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(Some(&stored[0].fingerprint), session.state().fingerprint.as_ref());
    assert_ne!(stored[0].fingerprint, "73c5da0a");
}

#[tokio::test]
async fn panicking_deriver_still_settles() {
    let mut session = session_with_deriver(Arc::new(PanickingDeriver));
    type_phrase(&mut session, &words());
    assert_eq!(session.pending_derivations(), 1);

    tokio::time::timeout(Duration::from_secs(2), session.settle())
        .await
        .expect("settle finishes")
        .unwrap();

    assert_eq!(session.pending_derivations(), 0);
    assert!(session.state().checksum_valid);
    assert!(session.state().fingerprint.is_none());
    assert!(session.state().fingerprint_error.is_some());
}

#[tokio::test]
async fn persistence_failure_retries_only_persistence() {
    let harness = Harness::new(0, true);
    let mut session = harness.session();
    type_phrase(&mut session, &words());
    session.settle().await.unwrap();

    let err = session.confirm_import().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::PersistenceFailed);
    assert!(matches!(
        session.flow().status,
        ConfirmStatus::Failed { phase: ConfirmPhase::Persisting, .. }
    ));

    session.retry().await.unwrap();
    assert_eq!(harness.syncer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.store.accounts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn retry_without_failure_is_rejected() {
    let harness = Harness::new(0, false);
    let mut session = harness.session();
    let err = session.retry().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
}

#[tokio::test]
async fn close_modal_clears_state_and_navigates_home() {
    let harness = Harness::new(0, false);
    let mut session = harness.session();
    type_phrase(&mut session, &words());
    session.settle().await.unwrap();
    session.confirm_import().await.unwrap();

    assert_eq!(session.close_modal(), NavigationTarget::Root);
    assert!(!session.state().checksum_valid);
    assert!(session.state().fingerprint.is_none());
    assert!(session.state().words.slots().iter().all(|s| s.value.is_empty()));
    assert_eq!(session.flow().status, ConfirmStatus::Idle);
    assert!(!session.flow().modal.visible);
}

#[tokio::test]
async fn helper_suggestions_follow_focused_text() {
    let harness = Harness::new(0, false);
    let mut session = harness.session();
    session.on_word_focused(0, "").unwrap();
    session.on_word_text_changed(0, "aba").unwrap();

    assert_eq!(session.suggestions(), vec!["abandon"]);

    session.on_word_selected_from_helper("abandon").unwrap();
    assert!(session.state().slot(0).unwrap().valid);
    assert!(session.suggestions().is_empty());
}
