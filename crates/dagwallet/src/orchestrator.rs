use crate::{
    config::WalletConfig,
    db::Db,
    errors::{MissingField, WalletError},
    keystore::KeystoreAdapter,
    notifier::{spawn_key_pusher, FrontendEvent, KeyPusher, Notifier},
    paths::WalletPaths,
    secrets::{salted_hash, TransientSecrets},
    session::Session,
    txfiles,
    wallet::{TxFilePaths, WalletRecord},
};
use secrecy::{ExposeSecret as _, SecretString};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{error, info, warn};

/// Top-level wallet lifecycle component: composes the validator, hasher,
/// record store, keystore adapter, bookkeeping file manager and notifier into
/// the Create/Import protocols and the post-login initialization protocol.
pub struct WalletOrchestrator {
    db: Db,
    cfg: WalletConfig,
    paths: WalletPaths,
    adapter: Arc<dyn KeystoreAdapter>,
    notifier: Arc<dyn Notifier>,
    pub session: Session,
    /// Currently loaded in-memory wallet.
    wallet: WalletRecord,
    /// In-memory bookkeeping file paths for the loaded wallet.
    tx_paths: TxFilePaths,
    /// In-memory keystore file path for the loaded wallet.
    keystore_file: PathBuf,
    key_pusher: Option<KeyPusher>,
}

impl WalletOrchestrator {
    pub fn new(
        db: Db,
        cfg: WalletConfig,
        paths: WalletPaths,
        adapter: Arc<dyn KeystoreAdapter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            cfg,
            paths,
            adapter,
            notifier,
            session: Session::default(),
            wallet: WalletRecord::default(),
            tx_paths: TxFilePaths::default(),
            keystore_file: PathBuf::new(),
            key_pusher: None,
        }
    }

    pub const fn wallet(&self) -> &WalletRecord {
        &self.wallet
    }

    pub const fn tx_paths(&self) -> &TxFilePaths {
        &self.tx_paths
    }

    fn login_error(&self, msg: &str) {
        self.notifier.emit(FrontendEvent::LoginError(msg.to_owned()));
    }

    fn send_error(&self, msg: String) {
        self.notifier.emit(FrontendEvent::Error(msg));
    }

    fn txfile_dir(&self) -> PathBuf {
        self.cfg
            .txfile_dir
            .clone()
            .unwrap_or_else(|| self.paths.txfile_dir())
    }

    /// First failing check wins; no state is mutated on failure.
    pub fn validate_credentials(
        keystore_path: &Path,
        store_pass: &SecretString,
        key_pass: &SecretString,
        alias: &str,
    ) -> Result<(), MissingField> {
        if keystore_path.as_os_str().is_empty() {
            return Err(MissingField::KeystorePath);
        }
        if store_pass.expose_secret().is_empty() {
            return Err(MissingField::KeystorePassword);
        }
        if key_pass.expose_secret().is_empty() {
            return Err(MissingField::KeyPassword);
        }
        if alias.is_empty() {
            return Err(MissingField::Alias);
        }
        Ok(())
    }

    fn credentials_provided(
        &self,
        keystore_path: &Path,
        store_pass: &SecretString,
        key_pass: &SecretString,
        alias: &str,
    ) -> bool {
        match Self::validate_credentials(keystore_path, store_pass, key_pass, alias) {
            Ok(()) => true,
            Err(f) => {
                // Diagnostics name the missing field only; plaintext passwords
                // never reach logs or the frontend.
                warn!(missing = ?f, "credential validation failed");
                self.login_error(&f.to_string());
                false
            }
        }
    }

    /// Import an existing wallet from a keystore file. Returns `Ok(false)` on
    /// any negative outcome that was surfaced to the user.
    pub async fn import_wallet(
        &mut self,
        keystore_path: &Path,
        store_pass: SecretString,
        key_pass: SecretString,
        alias: &str,
    ) -> eyre::Result<bool> {
        if !self.session.transaction_finished {
            warn!("cannot import wallet while an operation is pending");
            self.login_error(&WalletError::PendingOperation.to_string());
            return Ok(false);
        }
        self.session.transaction_finished = false;
        let res = self
            .import_wallet_inner(keystore_path, store_pass, key_pass, alias)
            .await;
        self.session.transaction_finished = true;
        res
    }

    async fn import_wallet_inner(
        &mut self,
        keystore_path: &Path,
        store_pass: SecretString,
        key_pass: SecretString,
        alias: &str,
    ) -> eyre::Result<bool> {
        if !self.credentials_provided(keystore_path, &store_pass, &key_pass, alias) {
            return Ok(false);
        }

        let secrets = TransientSecrets::new(store_pass, key_pass);
        self.wallet = WalletRecord::new(alias, keystore_path);

        self.wallet.address = match self.adapter.derive_address(&secrets, keystore_path, alias) {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "address derivation failed during import");
                String::new()
            }
        };

        self.session.keystore_access = self.adapter.check_access(&secrets, keystore_path);
        if !self.session.keystore_access {
            info!(alias, "keystore access denied, import aborted");
            return Ok(false);
        }

        // Exactly one of the two branches below runs per invocation. If the
        // existence check itself fails, fail closed: no event, no init.
        let existing = match self.db.find_by_alias(alias).await {
            Ok(e) => e,
            Err(e) => {
                error!(error = %e, alias, "wallet existence check failed");
                return Ok(false);
            }
        };

        match existing {
            None => {
                let ks_hash = match salted_hash(&secrets.store_pass) {
                    Ok(h) => h,
                    Err(e) => {
                        error!(error = %e, "unable to generate keystore password hash");
                        self.login_error(&e.to_string());
                        return Ok(false);
                    }
                };
                let key_hash = match salted_hash(&secrets.key_pass) {
                    Ok(h) => h,
                    Err(e) => {
                        error!(error = %e, "unable to generate key password hash");
                        self.login_error(&e.to_string());
                        return Ok(false);
                    }
                };

                if let Err(e) = self.db.create_wallet(&self.wallet).await {
                    error!(error = %e, alias, "unable to create record for imported wallet");
                    self.login_error(
                        "unable to create database object for the imported wallet; maybe it's already imported? try to login",
                    );
                    return Ok(false);
                }
                if let Err(e) = self
                    .db
                    .update_credentials(
                        alias,
                        &self.wallet.keystore_path,
                        &ks_hash,
                        &key_hash,
                    )
                    .await
                {
                    error!(error = %e, alias, "unable to update record for imported wallet");
                    self.login_error("unable to query database object for the imported wallet");
                    return Ok(false);
                }
                self.wallet.keystore_password_hash = ks_hash;
                self.wallet.key_password_hash = key_hash;
                self.session.new_user = true;
            }
            Some(stored) => {
                // Re-import of a known alias: database state wins over the
                // freshly supplied path and passwords; nothing is re-hashed.
                self.wallet = stored;
                self.session.new_user = false;
            }
        }

        self.session.user_logged_in = false;
        let path = self.wallet.keystore_path.clone();
        self.init_wallet(Path::new(&path)).await;
        Ok(true)
    }

    /// Create a brand-new wallet: persist the record, materialize the
    /// encrypted keystore, derive the address and establish the bookkeeping
    /// files.
    pub async fn create_wallet(
        &mut self,
        keystore_path: &Path,
        store_pass: SecretString,
        key_pass: SecretString,
        alias: &str,
    ) -> eyre::Result<bool> {
        if !self.session.transaction_finished {
            warn!("cannot create wallet while an operation is pending");
            self.login_error(&WalletError::PendingOperation.to_string());
            return Ok(false);
        }
        self.session.transaction_finished = false;
        let res = self
            .create_wallet_inner(keystore_path, store_pass, key_pass, alias)
            .await;
        self.session.transaction_finished = true;
        res
    }

    async fn create_wallet_inner(
        &mut self,
        keystore_path: &Path,
        store_pass: SecretString,
        key_pass: SecretString,
        alias: &str,
    ) -> eyre::Result<bool> {
        // Re-keying flows may omit the alias: fall back to the loaded wallet.
        let alias = if alias.is_empty() {
            self.wallet.alias.clone()
        } else {
            alias.to_owned()
        };

        if !self.credentials_provided(keystore_path, &store_pass, &key_pass, &alias) {
            return Ok(false);
        }

        let secrets = TransientSecrets::new(store_pass, key_pass);

        // Both hashes are independent; either can fail.
        let ks_hash = match salted_hash(&secrets.store_pass) {
            Ok(h) => h,
            Err(e) => {
                error!(error = %e, "unable to generate keystore password hash");
                self.send_error(format!("unable to generate password hash: {e}"));
                return Ok(false);
            }
        };
        let key_hash = match salted_hash(&secrets.key_pass) {
            Ok(h) => h,
            Err(e) => {
                error!(error = %e, "unable to generate key password hash");
                self.send_error(format!("unable to generate password hash: {e}"));
                return Ok(false);
            }
        };

        self.wallet = WalletRecord::new(&alias, keystore_path);
        self.wallet.keystore_password_hash = ks_hash.clone();
        self.wallet.key_password_hash = key_hash.clone();

        if let Err(e) = self.db.create_wallet(&self.wallet).await {
            error!(error = %e, alias, "unable to create record for new wallet");
            self.login_error(&WalletError::AliasTaken(alias.clone()).to_string());
            return Ok(false);
        }

        // Defensive re-write in case of a partial initial write; non-fatal.
        if let Err(e) = self
            .db
            .update_credentials(&alias, &self.wallet.keystore_path, &ks_hash, &key_hash)
            .await
        {
            warn!(error = %e, alias, "post-create credential update failed");
            self.send_error(
                WalletError::Persistence(format!(
                    "unable to update database object for new wallet after creation: {e}"
                ))
                .to_string(),
            );
        }

        if let Err(e) = self.adapter.encrypt_store(&secrets, keystore_path) {
            // The access recheck below fails for an absent store.
            warn!(error = %e, "unable to materialize encrypted keystore");
            self.send_error(format!("unable to create encrypted keystore: {e}"));
        }

        match self.adapter.derive_address(&secrets, keystore_path, &alias) {
            Ok(addr) => {
                self.wallet.address = addr;
                if let Err(e) = self.db.update_address(&alias, &self.wallet.address).await {
                    // Address persistence is non-fatal; the in-memory copy stands.
                    warn!(error = %e, alias, "unable to persist derived address");
                    self.send_error(
                        WalletError::Persistence(format!(
                            "unable to update new wallet with the derived address: {e}"
                        ))
                        .to_string(),
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "address derivation failed during create");
            }
        }

        self.session.keystore_access = self.adapter.check_access(&secrets, keystore_path);
        if !self.session.keystore_access {
            info!(alias, "keystore access denied, create aborted");
            return Ok(false);
        }

        self.tx_paths = txfiles::fresh_tx_paths(&self.txfile_dir());
        if let Err(e) = txfiles::create_tx_files(&self.tx_paths) {
            // Transaction recording cannot function without these files:
            // hard abort. Partial creations were rolled back.
            error!(error = %e, "unable to create tx bookkeeping files, check fs permissions");
            self.send_error(
                WalletError::Filesystem(format!(
                    "unable to create tx files, check fs permissions: {e}"
                ))
                .to_string(),
            );
            return Ok(false);
        }

        if let Err(e) = self.db.upsert_tx_paths(&alias, &self.tx_paths).await {
            warn!(error = %e, alias, "unable to persist tx bookkeeping paths");
            self.send_error(
                WalletError::Persistence(format!(
                    "unable to update the record with tx file paths: {e}"
                ))
                .to_string(),
            );
        }

        self.keystore_file = keystore_path.to_path_buf();
        self.session.user_logged_in = false;
        self.session.first_tx = true;
        self.session.new_user = true;
        self.init_new_wallet().await;
        Ok(true)
    }

    /// Post-login initialization for an already persisted wallet by alias.
    pub async fn login(&mut self, alias: &str) -> eyre::Result<bool> {
        let Some(stored) = self.db.find_by_alias(alias).await? else {
            self.login_error(&WalletError::WalletNotFound(alias.to_owned()).to_string());
            return Ok(false);
        };
        self.wallet = stored;
        let path = self.wallet.keystore_path.clone();
        self.init_wallet(Path::new(&path)).await;
        self.session.user_logged_in = true;
        Ok(true)
    }

    /// Initialization for a freshly created wallet.
    async fn init_new_wallet(&mut self) {
        let avatar = self.cfg.default_avatar.clone();
        self.store_avatar(&avatar).await;

        if !self.session.widgets.pass_keys_to_frontend {
            self.start_key_pusher();
        }
        if !self.session.widgets.dashboard {
            self.start_dashboard_widgets();
        }
        info!(alias = %self.wallet.alias, "a new wallet has been created successfully");
    }

    /// Initialization for an existing wallet: reload the bookkeeping paths
    /// and push the stored history to the frontend.
    async fn init_wallet(&mut self, keystore_path: &Path) {
        self.keystore_file = keystore_path.to_path_buf();

        self.init_tx_file_paths().await;
        self.init_tx_from_db().await;

        if !self.session.widgets.dashboard {
            self.start_dashboard_widgets();
        }
        if !self.session.widgets.pass_keys_to_frontend {
            self.start_key_pusher();
        }
        info!(alias = %self.wallet.alias, "user has logged into the wallet");
    }

    async fn init_tx_file_paths(&mut self) {
        match self.db.tx_paths_for(&self.wallet.alias).await {
            Ok(Some(p)) => self.tx_paths = p,
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "unable to initialize tx file paths");
                self.send_error(format!("unable to initialize tx file paths: {e}"));
            }
        }
    }

    async fn init_tx_from_db(&mut self) {
        let txs = match self.db.list_txs(&self.wallet.alias).await {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "unable to initialize historic transactions");
                self.send_error(format!("unable to initialize historic transactions: {e}"));
                return;
            }
        };
        for tx in txs {
            if !tx.failed {
                self.notifier.emit(FrontendEvent::NewTransaction(tx));
            }
        }
    }

    /// Persist the avatar image reference on the wallet record.
    pub async fn store_avatar(&mut self, avatar: &str) {
        self.wallet.avatar = avatar.to_owned();
        if let Err(e) = self.db.update_avatar(&self.wallet.alias, avatar).await {
            warn!(error = %e, "unable to store avatar reference");
            self.send_error(
                WalletError::Persistence(format!("unable to store avatar reference: {e}"))
                    .to_string(),
            );
        }
    }

    /// Start the periodic `wallet_keys` push if both the keystore path and
    /// the derived address are known. One instance per process: the init
    /// protocols check the widget flag before calling.
    fn start_key_pusher(&mut self) {
        if self.keystore_file.as_os_str().is_empty() && self.wallet.keystore_path.is_empty() {
            self.session.widgets.pass_keys_to_frontend = false;
            return;
        }
        if self.wallet.address.is_empty() {
            self.session.widgets.pass_keys_to_frontend = false;
            return;
        }
        let interval = Duration::from_secs(self.cfg.key_push_interval_secs);
        self.key_pusher = Some(spawn_key_pusher(
            Arc::clone(&self.notifier),
            self.wallet.address.clone(),
            interval,
        ));
        self.session.widgets.pass_keys_to_frontend = true;
    }

    /// Dashboard pollers live outside the core; here we only record that the
    /// widget set is up so it is never started twice.
    fn start_dashboard_widgets(&mut self) {
        info!("starting dashboard widgets");
        self.session.widgets.dashboard = true;
    }

    /// Stop background tasks tied to this orchestrator.
    pub async fn shutdown(&mut self) {
        if let Some(pusher) = self.key_pusher.take() {
            pusher.stop().await;
        }
        self.session.widgets.pass_keys_to_frontend = false;
    }

    #[cfg(test)]
    pub(crate) const fn db(&self) -> &Db {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::LocalKeystore;
    use crate::notifier::testing::RecordingNotifier;
    use crate::wallet::utc_now_iso;
    use eyre::Context as _;

    fn sp(s: &str) -> SecretString {
        SecretString::new(s.to_owned().into())
    }

    async fn orchestrator(
        td: &tempfile::TempDir,
    ) -> eyre::Result<(WalletOrchestrator, Arc<RecordingNotifier>)> {
        let paths = WalletPaths {
            config_dir: td.path().join("cfg"),
            data_dir: td.path().join("data"),
            log_file: td.path().join("data").join("dagwallet.log.jsonl"),
        };
        paths.ensure_private_dirs().context("ensure private dirs")?;
        let db = Db::open(&paths.db_path()).await.context("open db")?;
        let notifier = Arc::new(RecordingNotifier::default());
        let orch = WalletOrchestrator::new(
            db,
            WalletConfig::default(),
            paths,
            Arc::new(LocalKeystore),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        );
        Ok((orch, notifier))
    }

    fn login_errors(n: &RecordingNotifier) -> Vec<String> {
        n.events()
            .into_iter()
            .filter_map(|e| match e {
                FrontendEvent::LoginError(m) => Some(m),
                FrontendEvent::NewTransaction(_)
                | FrontendEvent::WalletKeys(_)
                | FrontendEvent::Error(_) => None,
            })
            .collect()
    }

    #[test]
    fn validator_reports_first_missing_field() {
        let full = (
            Path::new("ks.dat"),
            sp("sp1"),
            sp("kp1"),
            "alice".to_owned(),
        );
        assert_eq!(
            WalletOrchestrator::validate_credentials(Path::new(""), &full.1, &full.2, &full.3),
            Err(MissingField::KeystorePath)
        );
        assert_eq!(
            WalletOrchestrator::validate_credentials(full.0, &sp(""), &full.2, &full.3),
            Err(MissingField::KeystorePassword)
        );
        assert_eq!(
            WalletOrchestrator::validate_credentials(full.0, &full.1, &sp(""), &full.3),
            Err(MissingField::KeyPassword)
        );
        assert_eq!(
            WalletOrchestrator::validate_credentials(full.0, &full.1, &full.2, ""),
            Err(MissingField::Alias)
        );
        assert_eq!(
            WalletOrchestrator::validate_credentials(full.0, &full.1, &full.2, &full.3),
            Ok(())
        );
        // Empty path and empty alias together: the path wins.
        assert_eq!(
            WalletOrchestrator::validate_credentials(Path::new(""), &full.1, &full.2, ""),
            Err(MissingField::KeystorePath)
        );
    }

    #[tokio::test]
    async fn create_happy_path_persists_record_and_bookkeeping_files() -> eyre::Result<()> {
        let td = tempfile::tempdir().context("create tempdir")?;
        let (mut orch, _n) = orchestrator(&td).await?;
        let ks = td.path().join("ks.dat");

        let ok = orch.create_wallet(&ks, sp("sp1"), sp("kp1"), "alice").await?;
        assert!(ok);

        let stored = orch
            .db()
            .find_by_alias("alice")
            .await?
            .ok_or_else(|| eyre::eyre!("missing alice"))?;
        assert!(stored.address.starts_with("DAG"));
        assert!(stored.keystore_password_hash.starts_with("$argon2id$"));
        assert!(stored.key_password_hash.starts_with("$argon2id$"));
        assert_ne!(stored.keystore_password_hash, stored.key_password_hash);
        assert_eq!(stored.avatar, crate::config::DEFAULT_AVATAR);

        // Exactly three files at the recorded paths.
        let persisted = orch
            .db()
            .tx_paths_for("alice")
            .await?
            .ok_or_else(|| eyre::eyre!("missing tx paths"))?;
        assert_eq!(&persisted, orch.tx_paths());
        for p in persisted.all() {
            assert!(p.exists(), "missing {}", p.display());
        }

        assert!(orch.session.new_user);
        assert!(orch.session.first_tx);
        assert!(!orch.session.user_logged_in);
        assert!(orch.session.keystore_access);

        orch.shutdown().await;
        Ok(())
    }

    #[tokio::test]
    async fn create_with_missing_password_fails_before_any_state() -> eyre::Result<()> {
        let td = tempfile::tempdir().context("create tempdir")?;
        let (mut orch, n) = orchestrator(&td).await?;
        let ks = td.path().join("ks.dat");

        let ok = orch.create_wallet(&ks, sp(""), sp("kp1"), "alice").await?;
        assert!(!ok);
        assert!(orch.db().find_by_alias("alice").await?.is_none());
        assert!(!ks.exists());
        assert_eq!(
            login_errors(&n),
            vec!["please provide a keystore password".to_owned()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn create_duplicate_alias_fails_without_touching_first_record() -> eyre::Result<()> {
        let td = tempfile::tempdir().context("create tempdir")?;
        let (mut orch, n) = orchestrator(&td).await?;
        let ks1 = td.path().join("ks1.dat");
        let ks2 = td.path().join("ks2.dat");

        assert!(orch.create_wallet(&ks1, sp("sp1"), sp("kp1"), "alice").await?);
        let first = orch
            .db()
            .find_by_alias("alice")
            .await?
            .ok_or_else(|| eyre::eyre!("missing alice"))?;

        let ok = orch.create_wallet(&ks2, sp("sp2"), sp("kp2"), "alice").await?;
        assert!(!ok);
        assert!(login_errors(&n)
            .iter()
            .any(|m| m.contains("alias already exists")));

        let after = orch
            .db()
            .find_by_alias("alice")
            .await?
            .ok_or_else(|| eyre::eyre!("missing alice"))?;
        assert_eq!(after.keystore_path, first.keystore_path);
        assert_eq!(after.keystore_password_hash, first.keystore_password_hash);
        assert_eq!(after.key_password_hash, first.key_password_hash);

        orch.shutdown().await;
        Ok(())
    }

    #[tokio::test]
    async fn import_first_time_creates_record_with_hashes() -> eyre::Result<()> {
        let td = tempfile::tempdir().context("create tempdir")?;
        let (mut orch, _n) = orchestrator(&td).await?;
        let ks = td.path().join("ks.dat");

        // Existing keystore produced elsewhere.
        let adapter = LocalKeystore;
        adapter.encrypt_store(&TransientSecrets::new(sp("sp1"), sp("kp1")), &ks)?;

        let ok = orch.import_wallet(&ks, sp("sp1"), sp("kp1"), "dave").await?;
        assert!(ok);
        assert!(orch.session.new_user);
        assert!(!orch.session.user_logged_in);

        let stored = orch
            .db()
            .find_by_alias("dave")
            .await?
            .ok_or_else(|| eyre::eyre!("missing dave"))?;
        assert!(stored.keystore_password_hash.starts_with("$argon2id$"));
        assert!(stored.key_password_hash.starts_with("$argon2id$"));
        assert_eq!(stored.keystore_path, ks.to_string_lossy());
        assert!(orch.wallet().address.starts_with("DAG"));

        orch.shutdown().await;
        Ok(())
    }

    #[tokio::test]
    async fn import_of_known_alias_reuses_stored_record() -> eyre::Result<()> {
        let td = tempfile::tempdir().context("create tempdir")?;
        let (mut orch, _n) = orchestrator(&td).await?;
        let ks1 = td.path().join("ks1.dat");
        let ks2 = td.path().join("ks2.dat");

        let adapter = LocalKeystore;
        adapter.encrypt_store(&TransientSecrets::new(sp("sp1"), sp("kp1")), &ks1)?;
        assert!(orch.import_wallet(&ks1, sp("sp1"), sp("kp1"), "erin").await?);
        let first = orch
            .db()
            .find_by_alias("erin")
            .await?
            .ok_or_else(|| eyre::eyre!("missing erin"))?;
        orch.shutdown().await;

        // Re-import under the same alias with a different keystore: stored
        // path and hashes win; nothing is re-hashed.
        adapter.encrypt_store(&TransientSecrets::new(sp("sp9"), sp("kp9")), &ks2)?;
        assert!(orch.import_wallet(&ks2, sp("sp9"), sp("kp9"), "erin").await?);
        assert!(!orch.session.new_user);
        assert_eq!(orch.wallet().keystore_path, ks1.to_string_lossy());

        let after = orch
            .db()
            .find_by_alias("erin")
            .await?
            .ok_or_else(|| eyre::eyre!("missing erin"))?;
        assert_eq!(after.keystore_path, first.keystore_path);
        assert_eq!(after.keystore_password_hash, first.keystore_password_hash);
        assert_eq!(after.key_password_hash, first.key_password_hash);

        orch.shutdown().await;
        Ok(())
    }

    #[tokio::test]
    async fn import_with_denied_access_persists_nothing() -> eyre::Result<()> {
        let td = tempfile::tempdir().context("create tempdir")?;
        let (mut orch, _n) = orchestrator(&td).await?;
        let ks = td.path().join("ks.dat");

        let adapter = LocalKeystore;
        adapter.encrypt_store(&TransientSecrets::new(sp("sp1"), sp("kp1")), &ks)?;

        let ok = orch.import_wallet(&ks, sp("wrong"), sp("kp1"), "mallory").await?;
        assert!(!ok);
        assert!(!orch.session.keystore_access);
        assert!(orch.db().find_by_alias("mallory").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn pending_operation_gates_create_and_import() -> eyre::Result<()> {
        let td = tempfile::tempdir().context("create tempdir")?;
        let (mut orch, n) = orchestrator(&td).await?;
        let ks = td.path().join("ks.dat");

        orch.session.transaction_finished = false;
        assert!(!orch.create_wallet(&ks, sp("sp1"), sp("kp1"), "alice").await?);
        assert!(!orch.import_wallet(&ks, sp("sp1"), sp("kp1"), "alice").await?);
        assert_eq!(login_errors(&n).len(), 2);
        assert!(orch.db().find_by_alias("alice").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn login_replays_non_failed_history_in_stored_order() -> eyre::Result<()> {
        let td = tempfile::tempdir().context("create tempdir")?;
        let (mut orch, n) = orchestrator(&td).await?;
        let ks = td.path().join("ks.dat");

        assert!(orch.create_wallet(&ks, sp("sp1"), sp("kp1"), "alice").await?);
        let created_paths = orch.tx_paths().clone();
        orch.shutdown().await;

        orch.db().insert_tx("alice", 10, "DAGaaa", false, &utc_now_iso()).await?;
        orch.db().insert_tx("alice", 20, "DAGbbb", true, &utc_now_iso()).await?;
        orch.db().insert_tx("alice", 30, "DAGccc", false, &utc_now_iso()).await?;

        assert!(orch.login("alice").await?);
        assert!(orch.session.user_logged_in);
        // Round-trip: the same Path values most recently persisted.
        assert_eq!(orch.tx_paths(), &created_paths);

        let replayed: Vec<i64> = n
            .events()
            .into_iter()
            .filter_map(|e| match e {
                FrontendEvent::NewTransaction(tx) => Some(tx.amount),
                FrontendEvent::WalletKeys(_)
                | FrontendEvent::LoginError(_)
                | FrontendEvent::Error(_) => None,
            })
            .collect();
        assert_eq!(replayed, vec![10, 30]);

        orch.shutdown().await;
        Ok(())
    }

    #[tokio::test]
    async fn key_pusher_is_not_started_twice() -> eyre::Result<()> {
        let td = tempfile::tempdir().context("create tempdir")?;
        let (mut orch, _n) = orchestrator(&td).await?;
        let ks = td.path().join("ks.dat");

        assert!(orch.create_wallet(&ks, sp("sp1"), sp("kp1"), "alice").await?);
        assert!(orch.session.widgets.pass_keys_to_frontend);

        // A later login must observe the running widget and leave it alone.
        assert!(orch.login("alice").await?);
        assert!(orch.session.widgets.pass_keys_to_frontend);

        orch.shutdown().await;
        assert!(!orch.session.widgets.pass_keys_to_frontend);
        Ok(())
    }

    #[tokio::test]
    async fn login_with_unknown_alias_fails_with_login_error() -> eyre::Result<()> {
        let td = tempfile::tempdir().context("create tempdir")?;
        let (mut orch, n) = orchestrator(&td).await?;

        assert!(!orch.login("ghost").await?);
        assert!(login_errors(&n)
            .iter()
            .any(|m| m.contains("wallet not found")));
        Ok(())
    }
}
