use crate::{config::WalletConfig, paths::WalletPaths};
use eyre::Context as _;
use std::{fs, path::PathBuf};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

/// Apply environment variable overrides to the config.
fn apply_env_overrides(cfg: &mut WalletConfig) {
    if let Ok(v) = std::env::var("DAGWALLET_KEY_PUSH_INTERVAL_SECS") {
        if let Ok(n) = v.trim().parse::<u64>() {
            if n > 0 {
                cfg.key_push_interval_secs = n;
            }
        }
    }
    if let Ok(v) = std::env::var("DAGWALLET_TXFILE_DIR") {
        let t = v.trim();
        if !t.is_empty() {
            cfg.txfile_dir = Some(PathBuf::from(t));
        }
    }
}

impl ConfigStore {
    pub fn new(paths: &WalletPaths) -> Self {
        Self {
            path: paths.config_dir.join("config.toml"),
        }
    }

    pub fn load_or_init_default(&self) -> eyre::Result<WalletConfig> {
        if !self.path.exists() {
            let mut cfg = WalletConfig::default();
            apply_env_overrides(&mut cfg);
            self.save(&cfg)?;
            return Ok(cfg);
        }

        let s = fs::read_to_string(&self.path).context("read config.toml")?;
        let mut cfg: WalletConfig = toml::from_str(&s).context("parse config.toml")?;
        apply_env_overrides(&mut cfg);
        Ok(cfg)
    }

    pub fn save(&self, cfg: &WalletConfig) -> eyre::Result<()> {
        if let Some(parent) = self.path.parent() {
            crate::fsutil::ensure_private_dir(parent)?;
        }
        let s = toml::to_string_pretty(cfg).context("serialize config.toml")?;
        crate::fsutil::write_string_atomic_restrictive(
            &self.path,
            &s,
            crate::fsutil::MODE_FILE_PRIVATE,
        )
        .context("write config.toml")?;
        Ok(())
    }
}
