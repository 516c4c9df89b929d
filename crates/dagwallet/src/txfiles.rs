use crate::wallet::TxFilePaths;
use eyre::Context as _;
use std::path::Path;

/// Fresh bookkeeping file path with the `tx-` name prefix.
pub fn temp_tx_path(dir: &Path) -> std::path::PathBuf {
    crate::fsutil::random_path(dir, "tx-")
}

/// Three fresh bookkeeping paths in `dir`.
pub fn fresh_tx_paths(dir: &Path) -> TxFilePaths {
    TxFilePaths {
        last_tx: temp_tx_path(dir),
        prev_tx: temp_tx_path(dir),
        empty_tx: temp_tx_path(dir),
    }
}

/// Create the three bookkeeping files, each handle released immediately after
/// creation. All-or-nothing: on the first failure any files already created
/// are removed before the error is returned, so a half-initialized Path never
/// reaches the record store.
pub fn create_tx_files(paths: &TxFilePaths) -> eyre::Result<()> {
    let mut created: Vec<&Path> = vec![];
    for p in paths.all() {
        if let Err(e) = crate::fsutil::create_empty_restrictive(p)
            .with_context(|| format!("create tx file {}", p.display()))
        {
            for done in created {
                drop(std::fs::remove_file(done));
            }
            return Err(e);
        }
        created.push(p);
    }
    Ok(())
}
