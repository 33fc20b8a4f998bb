use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use zeroize::Zeroizing;

use seed_import::utils::logging;
use seed_import::wallet::{descriptor_address, parse_descriptor, Bip32WalletLoader, PhraseIssue};
use seed_import::{
    Account, ChecksumValidator, EsploraSyncer, ImportServices, ImportSession, ImportSettings, ScriptVersion,
    SeedWordCount, WalletHandle, WalletNetwork, WordlistLanguage,
};

/// Replay a recovery phrase through the import flow
#[derive(Debug, Parser)]
#[command(name = "seed-import", version, about)]
struct Cli {
    /// Space separated phrase; read from stdin when omitted
    #[arg(long)]
    words: Option<String>,

    /// Optional BIP-39 passphrase
    #[arg(long, default_value = "")]
    passphrase: String,

    /// P2PKH, P2SH-P2WPKH, P2WPKH or P2TR
    #[arg(long)]
    script: Option<ScriptVersion>,

    #[arg(long)]
    network: Option<WalletNetwork>,

    #[arg(long)]
    language: Option<WordlistLanguage>,

    /// Expected phrase length, defaults to the number of words given
    #[arg(long)]
    word_count: Option<usize>,

    #[arg(long)]
    account: Option<u32>,

    /// Explicit account path, e.g. "m/84'/0'/0'"
    #[arg(long)]
    path: Option<String>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    esplora_url: Option<String>,

    /// JSON account store to add the synced account to
    #[arg(long)]
    store: Option<PathBuf>,

    /// JSON settings file, flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit a JSON report
    #[arg(long)]
    json: bool,

    /// Stop after wallet construction, no sync or persistence
    #[arg(long)]
    offline: bool,

    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    word_count: usize,
    checksum_valid: bool,
    issue: Option<PhraseIssue>,
    /// Slots rendered in error after blur
    error_slots: Vec<usize>,
    fingerprint: Option<String>,
    fingerprint_error: Option<String>,
    network: WalletNetwork,
    script_version: ScriptVersion,
    derivation_path: String,
    wallet: Option<WalletHandle>,
    first_address: Option<String>,
    account: Option<Account>,
    status: String,
}

fn settings_from_cli(cli: &Cli, phrase_len: usize) -> anyhow::Result<ImportSettings> {
    let mut settings = match &cli.config {
        Some(path) => ImportSettings::from_json_file(path)?,
        None => ImportSettings::for_network(cli.network.unwrap_or_default()),
    };

    if let Some(network) = cli.network {
        settings.network = network;
    }
    if let Some(script) = cli.script {
        settings.script_version = script;
    }
    if let Some(language) = cli.language {
        settings.language = language;
    }
    if let Some(account) = cli.account {
        settings.account_index = account;
    }
    if let Some(path) = &cli.path {
        settings.derivation_path = Some(path.clone());
    }
    if let Some(name) = &cli.name {
        settings.name = name.clone();
    }
    if let Some(url) = &cli.esplora_url {
        settings.esplora_url = url.clone();
    }
    if let Some(store) = &cli.store {
        settings.account_store_path = Some(store.clone());
    }

    settings.word_count = SeedWordCount::try_from(cli.word_count.unwrap_or(phrase_len))?;
    Ok(settings)
}

fn read_phrase(cli: &Cli) -> anyhow::Result<Zeroizing<String>> {
    if let Some(words) = &cli.words {
        return Ok(Zeroizing::new(words.clone()));
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        bail!("no phrase given: pass --words or pipe the phrase on stdin");
    }
    let mut buffer = Zeroizing::new(String::new());
    stdin.lock().read_to_string(&mut buffer).context("failed to read phrase from stdin")?;
    Ok(buffer)
}

/// Type each word the way a user would: focus, keystrokes, blur
fn replay_words(session: &mut ImportSession, words: &[&str]) -> anyhow::Result<()> {
    for (slot, word) in words.iter().enumerate() {
        session.on_word_focused(slot, "")?;
        let mut typed = String::new();
        for c in word.chars() {
            typed.push(c);
            session.on_word_text_changed(slot, &typed)?;
        }
        session.on_word_end_editing(slot, word)?;
    }
    Ok(())
}

fn first_address(handle: &WalletHandle) -> Option<String> {
    let descriptor = parse_descriptor(&handle.external_descriptor).ok()?;
    descriptor_address(&descriptor, handle.network, 0)
        .ok()
        .map(|a| a.to_string())
}

fn print_report(report: &Report, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("================ Seed Import ================");
    println!("Words:        {}", report.word_count);
    println!(
        "Checksum:     {}",
        if report.checksum_valid { "valid" } else { "invalid" }
    );
    if let Some(issue) = &report.issue {
        println!("Issue:        {:?}", issue);
    }
    if !report.error_slots.is_empty() {
        let slots: Vec<String> = report.error_slots.iter().map(|s| (s + 1).to_string()).collect();
        println!("Bad words:    {}", slots.join(", "));
    }
    if let Some(fp) = &report.fingerprint {
        println!("Fingerprint:  {}", fp);
    }
    if let Some(err) = &report.fingerprint_error {
        println!("Fingerprint:  failed ({})", err);
    }
    println!("Network:      {}", report.network);
    println!(
        "Script:       {} ({})",
        report.script_version.display_name(),
        report.script_version
    );
    println!("Path:         {}", report.derivation_path);
    if let Some(wallet) = &report.wallet {
        println!("Receive:      {}", wallet.external_descriptor);
        println!("Change:       {}", wallet.internal_descriptor);
    }
    if let Some(address) = &report.first_address {
        println!("First address: {}", address);
    }
    if let Some(account) = &report.account {
        println!("UTXOs:        {}", account.summary.number_of_utxos);
        println!("Balance:      {} sats", account.summary.balance);
    }
    println!("=============================================");
    println!("Status: {}", report.status);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.debug {
        logging::enable_debug();
    }

    let phrase = read_phrase(&cli)?;
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let settings = settings_from_cli(&cli, words.len())?;

    if words.len() > settings.word_count.count() {
        bail!(
            "{} words given for a {}-word phrase",
            words.len(),
            settings.word_count
        );
    }

    let syncer = Arc::new(EsploraSyncer::from_settings(&settings)?);
    let services = ImportServices::standard(&settings, syncer);
    let mut session = ImportSession::new(settings.clone(), services)?;

    if !cli.passphrase.is_empty() {
        session.on_passphrase_changed(&cli.passphrase)?;
    }
    replay_words(&mut session, &words)?;
    session.settle().await?;

    let state = session.state();
    let values = state.mnemonic_words();
    let validator = ChecksumValidator::new(settings.wordlist());

    let mut report = Report {
        word_count: state.word_count(),
        checksum_valid: state.checksum_valid,
        issue: validator.diagnose(values.as_slice()),
        error_slots: state
            .words
            .slots()
            .iter()
            .filter(|s| s.shows_error())
            .map(|s| s.index)
            .collect(),
        fingerprint: state.fingerprint.clone(),
        fingerprint_error: state.fingerprint_error.clone(),
        network: settings.network,
        script_version: settings.script_version,
        derivation_path: settings.derivation_path(),
        wallet: None,
        first_address: None,
        account: None,
        status: String::new(),
    };

    if !state.can_confirm() {
        report.status = "phrase failed checksum validation".to_string();
        print_report(&report, cli.json)?;
        bail!("import not possible: {}", report.status);
    }

    if cli.offline {
        let handle = Bip32WalletLoader::build_handle(values.as_slice(), &cli.passphrase, &settings)?;
        report.first_address = first_address(&handle);
        report.wallet = Some(handle);
        report.status = "wallet constructed (offline)".to_string();
        print_report(&report, cli.json)?;
        return Ok(());
    }

    let outcome = session.confirm_import().await;
    let flow = session.flow();
    report.wallet = flow.handle().cloned();
    report.first_address = report.wallet.as_ref().and_then(first_address);
    report.account = flow.account().cloned();

    match outcome {
        Ok(()) => {
            report.status = "account imported".to_string();
            print_report(&report, cli.json)?;
            Ok(())
        }
        Err(e) => {
            report.status = format!("import failed: {}", e);
            print_report(&report, cli.json)?;
            Err(e.into())
        }
    }
}
