use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One user's wallet identity and state, as persisted in the record store.
///
/// `alias` is the natural key: unique across all stored wallets, never
/// overwritten once created. Password hashes are PHC strings, never the
/// plaintext. `address` stays empty until derivation succeeds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletRecord {
    pub id: String,
    pub alias: String,
    pub keystore_path: String,
    pub address: String,
    pub keystore_password_hash: String,
    pub key_password_hash: String,
    pub avatar: String,
}

impl WalletRecord {
    pub fn new(alias: &str, keystore_path: &std::path::Path) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            alias: alias.to_owned(),
            keystore_path: keystore_path.to_string_lossy().into_owned(),
            ..Self::default()
        }
    }
}

/// The three transaction bookkeeping files owned by exactly one wallet:
/// most recent tx, the one before it, and an empty template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxFilePaths {
    pub last_tx: PathBuf,
    pub prev_tx: PathBuf,
    pub empty_tx: PathBuf,
}

impl TxFilePaths {
    pub fn all(&self) -> [&std::path::Path; 3] {
        [&self.last_tx, &self.prev_tx, &self.empty_tx]
    }
}

/// Historical transaction. Written elsewhere; the orchestrator only reads
/// these back and surfaces the non-failed ones to the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRecord {
    pub id: i64,
    pub alias: String,
    pub amount: i64,
    pub receiver: String,
    pub failed: bool,
    pub ts: String,
}

pub fn utc_now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
