use crate::wallet::{TxFilePaths, TxRecord, WalletRecord};
use eyre::Context as _;
use std::path::{Path, PathBuf};

// Local, embedded record store (Turso, pure Rust).
//
// Holds the Wallet entity plus its owned Path and TXHistory associations.
// The alias is the natural key: a UNIQUE constraint guarantees a record,
// once created, is never duplicated — a second create with the same alias
// fails at the store rather than overwriting.

pub struct Db {
    // Keep the database handle alive for the lifetime of the connection.
    _db: turso::Database,
    conn: turso::Connection,
}

// `turso::Database` / `turso::Connection` may not implement `Debug`. We only need a
// debuggable handle for state struct derives, not to print internals.
impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").finish_non_exhaustive()
    }
}

impl Db {
    pub async fn open(db_path: &Path) -> eyre::Result<Self> {
        if let Some(parent) = db_path.parent() {
            crate::fsutil::ensure_private_dir(parent)?;
        }
        let p_s = db_path.to_string_lossy();

        let db = turso::Builder::new_local(p_s.as_ref())
            .build()
            .await
            .context("open turso local db")?;
        let conn = db.connect().context("connect turso db")?;

        let this = Self { _db: db, conn };
        this.init().await?;
        Ok(this)
    }

    async fn init(&self) -> eyre::Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS wallets (\
                  id TEXT NOT NULL,\
                  alias TEXT PRIMARY KEY,\
                  keystore_path TEXT NOT NULL,\
                  address TEXT NOT NULL DEFAULT '',\
                  keystore_password_hash TEXT NOT NULL DEFAULT '',\
                  key_password_hash TEXT NOT NULL DEFAULT '',\
                  avatar TEXT NOT NULL DEFAULT ''\
                )",
                (),
            )
            .await
            .context("create wallets")?;

        // 1:1 Path sub-entity: the three bookkeeping file paths.
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS wallet_paths (\
                  alias TEXT PRIMARY KEY,\
                  last_tx TEXT NOT NULL,\
                  prev_tx TEXT NOT NULL,\
                  empty_tx TEXT NOT NULL\
                )",
                (),
            )
            .await
            .context("create wallet_paths")?;

        // 1:many TXHistory. Insertion order is the stored order (tx_id).
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS wallet_txs (\
                  tx_id INTEGER PRIMARY KEY AUTOINCREMENT,\
                  alias TEXT NOT NULL,\
                  amount INTEGER NOT NULL,\
                  receiver TEXT NOT NULL,\
                  failed INTEGER NOT NULL,\
                  ts TEXT NOT NULL\
                )",
                (),
            )
            .await
            .context("create wallet_txs")?;

        Ok(())
    }

    /// Insert a brand-new wallet record. Fails (rather than overwrites) when
    /// the alias is already taken.
    pub async fn create_wallet(&self, w: &WalletRecord) -> eyre::Result<()> {
        self.conn
            .execute(
                "INSERT INTO wallets \
                   (id, alias, keystore_path, address, keystore_password_hash, key_password_hash, avatar) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                (
                    w.id.as_str(),
                    w.alias.as_str(),
                    w.keystore_path.as_str(),
                    w.address.as_str(),
                    w.keystore_password_hash.as_str(),
                    w.key_password_hash.as_str(),
                    w.avatar.as_str(),
                ),
            )
            .await
            .context("insert wallets")?;
        Ok(())
    }

    pub async fn find_by_alias(&self, alias: &str) -> eyre::Result<Option<WalletRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, alias, keystore_path, address, keystore_password_hash, \
                        key_password_hash, avatar \
                 FROM wallets WHERE alias = ?",
                (alias,),
            )
            .await
            .context("query wallets")?;

        let Some(row) = rows.next().await.context("next row")? else {
            return Ok(None);
        };

        Ok(Some(WalletRecord {
            id: row.get(0).context("row.id")?,
            alias: row.get(1).context("row.alias")?,
            keystore_path: row.get(2).context("row.keystore_path")?,
            address: row.get(3).context("row.address")?,
            keystore_password_hash: row.get(4).context("row.keystore_password_hash")?,
            key_password_hash: row.get(5).context("row.key_password_hash")?,
            avatar: row.get(6).context("row.avatar")?,
        }))
    }

    pub async fn update_credentials(
        &self,
        alias: &str,
        keystore_path: &str,
        keystore_password_hash: &str,
        key_password_hash: &str,
    ) -> eyre::Result<()> {
        self.conn
            .execute(
                "UPDATE wallets SET keystore_path = ?, keystore_password_hash = ?, \
                 key_password_hash = ? WHERE alias = ?",
                (keystore_path, keystore_password_hash, key_password_hash, alias),
            )
            .await
            .context("update wallets credentials")?;
        Ok(())
    }

    pub async fn update_address(&self, alias: &str, address: &str) -> eyre::Result<()> {
        self.conn
            .execute(
                "UPDATE wallets SET address = ? WHERE alias = ?",
                (address, alias),
            )
            .await
            .context("update wallets address")?;
        Ok(())
    }

    pub async fn update_avatar(&self, alias: &str, avatar: &str) -> eyre::Result<()> {
        self.conn
            .execute(
                "UPDATE wallets SET avatar = ? WHERE alias = ?",
                (avatar, alias),
            )
            .await
            .context("update wallets avatar")?;
        Ok(())
    }

    pub async fn upsert_tx_paths(&self, alias: &str, p: &TxFilePaths) -> eyre::Result<()> {
        self.conn
            .execute(
                "INSERT INTO wallet_paths (alias, last_tx, prev_tx, empty_tx) \
                 VALUES (?, ?, ?, ?) \
                 ON CONFLICT(alias) DO UPDATE SET \
                   last_tx=excluded.last_tx, \
                   prev_tx=excluded.prev_tx, \
                   empty_tx=excluded.empty_tx",
                (
                    alias,
                    p.last_tx.to_string_lossy().as_ref(),
                    p.prev_tx.to_string_lossy().as_ref(),
                    p.empty_tx.to_string_lossy().as_ref(),
                ),
            )
            .await
            .context("upsert wallet_paths")?;
        Ok(())
    }

    pub async fn tx_paths_for(&self, alias: &str) -> eyre::Result<Option<TxFilePaths>> {
        let mut rows = self
            .conn
            .query(
                "SELECT last_tx, prev_tx, empty_tx FROM wallet_paths WHERE alias = ?",
                (alias,),
            )
            .await
            .context("query wallet_paths")?;

        let Some(row) = rows.next().await.context("next row")? else {
            return Ok(None);
        };

        let last_tx: String = row.get(0).context("row.last_tx")?;
        let prev_tx: String = row.get(1).context("row.prev_tx")?;
        let empty_tx: String = row.get(2).context("row.empty_tx")?;
        Ok(Some(TxFilePaths {
            last_tx: PathBuf::from(last_tx),
            prev_tx: PathBuf::from(prev_tx),
            empty_tx: PathBuf::from(empty_tx),
        }))
    }

    pub async fn insert_tx(
        &self,
        alias: &str,
        amount: i64,
        receiver: &str,
        failed: bool,
        ts: &str,
    ) -> eyre::Result<()> {
        self.conn
            .execute(
                "INSERT INTO wallet_txs (alias, amount, receiver, failed, ts) \
                 VALUES (?, ?, ?, ?, ?)",
                (alias, amount, receiver, i64::from(failed), ts),
            )
            .await
            .context("insert wallet_txs")?;
        Ok(())
    }

    /// Full history for one alias, in stored (insertion) order.
    pub async fn list_txs(&self, alias: &str) -> eyre::Result<Vec<TxRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT tx_id, alias, amount, receiver, failed, ts \
                 FROM wallet_txs WHERE alias = ? ORDER BY tx_id ASC",
                (alias,),
            )
            .await
            .context("query wallet_txs")?;

        let mut out: Vec<TxRecord> = vec![];
        while let Some(row) = rows.next().await.context("next row")? {
            let failed: i64 = row.get(4).context("row.failed")?;
            out.push(TxRecord {
                id: row.get(0).context("row.tx_id")?,
                alias: row.get(1).context("row.alias")?,
                amount: row.get(2).context("row.amount")?,
                receiver: row.get(3).context("row.receiver")?,
                failed: failed != 0,
                ts: row.get(5).context("row.ts")?,
            });
        }
        Ok(out)
    }
}
