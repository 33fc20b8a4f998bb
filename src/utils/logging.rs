//! Structured Logging with Secret Redaction
//!
//! Log lines are `key=value` pairs on stderr. Field values are redacted by
//! key name:
//! - Seed words, passphrases, seeds and private keys are never printed
//! - Extended public keys, descriptors and addresses are shortened
//! - Everything else (fingerprints, counts, generations) is printed as-is

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Global flag to enable/disable debug logging
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn enable_debug() {
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

pub fn disable_debug() {
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Structured log entry
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field, redacted according to its key
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let redacted = redact_for_key(key, &value.to_string());
        self.fields.push((key, redacted));
        self
    }

    /// Render without the timestamp prefix
    pub fn render(&self) -> String {
        let mut line = format!("{} [{}] {}", self.level, self.module, self.message);
        if !self.fields.is_empty() {
            let fields = self
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            line.push_str(" | ");
            line.push_str(&fields);
        }
        line
    }

    pub fn log(self) {
        if self.level == LogLevel::Debug && !is_debug_enabled() {
            return;
        }

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        eprintln!("[{}] {}", timestamp, self.render());
    }
}

const SECRET_KEYS: [&str; 7] = [
    "mnemonic", "phrase", "passphrase", "seed", "xprv", "private", "secret",
];

const SHORTENED_KEYS: [&str; 3] = ["xpub", "descriptor", "address"];

fn redact_for_key(key: &str, value: &str) -> String {
    let key_lower = key.to_lowercase();

    // word lists are reported by size only
    if key_lower == "words" || key_lower == "word" {
        return redact_words(value);
    }

    if SECRET_KEYS.iter().any(|k| key_lower.contains(k)) {
        return redact_value(value);
    }

    if SHORTENED_KEYS.iter().any(|k| key_lower.contains(k)) {
        return shorten(value);
    }

    value.to_string()
}

fn redact_value(value: &str) -> String {
    if value.is_empty() {
        "[EMPTY]".to_string()
    } else {
        "[REDACTED]".to_string()
    }
}

fn redact_words(value: &str) -> String {
    match value.split_whitespace().count() {
        0 => "[EMPTY]".to_string(),
        n => format!("[REDACTED:{}words]", n),
    }
}

/// Keep the first 8 and last 6 chars of long public material
fn shorten(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= 20 {
        return trimmed.to_string();
    }

    let prefix: String = chars[..8].iter().collect();
    let suffix: String = chars[chars.len() - 6..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

#[macro_export]
macro_rules! log_debug {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[macro_export]
macro_rules! log_info {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Info,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Info,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[macro_export]
macro_rules! log_warn {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[macro_export]
macro_rules! log_error {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Error,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Error,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_fields_are_redacted() {
        assert_eq!(redact_for_key("passphrase", "TREZOR"), "[REDACTED]");
        assert_eq!(redact_for_key("passphrase", ""), "[EMPTY]");
        assert_eq!(redact_for_key("master_xprv", "xprv9s21ZrQH143K..."), "[REDACTED]");
    }

    #[test]
    fn test_words_report_count_only() {
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        assert_eq!(redact_for_key("words", phrase), "[REDACTED:12words]");
        assert_eq!(redact_for_key("word", "zoo"), "[REDACTED:1words]");
    }

    #[test]
    fn test_public_material_is_shortened() {
        let xpub = "xpub6CatWdiZiodmUeTDp8LT5or8nmbKNcuyvz7WyksVFkKB4RHwCD3XyuvPEbvqAQY3rAPshWcMLoP2fMFMKHPJ4ZeZXYVUhLv1VMrjPC7PW6V";
        let short = redact_for_key("account_xpub", xpub);
        assert!(short.starts_with("xpub6Cat"));
        assert!(short.ends_with("C7PW6V"));
        assert!(short.contains("..."));
    }

    #[test]
    fn test_plain_fields_pass_through() {
        assert_eq!(redact_for_key("fingerprint", "73c5da0a"), "73c5da0a");
        assert_eq!(redact_for_key("generation", "7"), "7");
    }

    #[test]
    fn test_render() {
        let entry = LogEntry::new(LogLevel::Info, "import", "checksum valid")
            .field("generation", 3)
            .field("passphrase", "hunter2");
        assert_eq!(
            entry.render(),
            "INFO [import] checksum valid | generation=3 passphrase=[REDACTED]"
        );
    }
}
