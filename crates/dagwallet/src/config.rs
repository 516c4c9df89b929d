use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_AVATAR: &str = "faces/face-0.jpg";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Interval between `wallet_keys` pushes to the frontend, in seconds.
    pub key_push_interval_secs: u64,

    /// Avatar image reference stored for freshly created wallets.
    pub default_avatar: String,

    /// Override for the directory holding the transaction bookkeeping files.
    /// Defaults to `<data_dir>/txfiles` when unset.
    pub txfile_dir: Option<PathBuf>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            key_push_interval_secs: 5,
            default_avatar: DEFAULT_AVATAR.to_owned(),
            txfile_dir: None,
        }
    }
}
