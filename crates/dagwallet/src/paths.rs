use directories::ProjectDirs;
use eyre::ContextCompat as _;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct WalletPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
}

impl WalletPaths {
    pub fn discover() -> eyre::Result<Self> {
        // Test/CI override knobs.
        if let (Ok(data_dir), Ok(config_dir)) = (
            std::env::var("DAGWALLET_DATA_DIR"),
            std::env::var("DAGWALLET_CONFIG_DIR"),
        ) {
            let data_dir = PathBuf::from(data_dir);
            let config_dir = PathBuf::from(config_dir);
            let log_file = data_dir.join("dagwallet.log.jsonl");
            return Ok(Self {
                config_dir,
                data_dir,
                log_file,
            });
        }

        // Default locations:
        // macOS: ~/Library/Application Support/dagwallet
        // Linux: ~/.config/dagwallet
        // Windows: %APPDATA%\\dagwallet
        let proj =
            ProjectDirs::from("", "", "dagwallet").context("failed to resolve project dirs")?;
        let config_dir = proj.config_dir().to_path_buf();
        let data_dir = proj.data_dir().to_path_buf();

        let log_file = data_dir.join("dagwallet.log.jsonl");

        Ok(Self {
            config_dir,
            data_dir,
            log_file,
        })
    }

    /// Directory holding the transaction bookkeeping files unless the config
    /// overrides it.
    pub fn txfile_dir(&self) -> PathBuf {
        self.data_dir.join("txfiles")
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("dagwallet.db")
    }

    pub fn ensure_private_dirs(&self) -> eyre::Result<()> {
        crate::fsutil::ensure_private_dir(&self.config_dir)?;
        crate::fsutil::ensure_private_dir(&self.data_dir)?;
        Ok(())
    }
}
