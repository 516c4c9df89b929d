use clap::{Parser, Subcommand};
use eyre::Context as _;
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

mod config;
mod db;
mod errors;
mod fsutil;
mod keystore;
mod notifier;
mod orchestrator;
mod paths;
mod secrets;
mod session;
mod store;
mod txfiles;
mod wallet;

#[derive(Parser, Debug)]
#[command(name = "dagwallet", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new wallet: persists the record, materializes the encrypted
    /// keystore and establishes the transaction bookkeeping files.
    ///
    /// Both passwords are prompted for; they are never accepted via argv.
    Create {
        /// Target path for the encrypted keystore file.
        #[arg(long)]
        keystore: PathBuf,
        /// Unique wallet alias.
        #[arg(long)]
        alias: String,
    },

    /// Import an existing wallet from a keystore file.
    Import {
        /// Path to the existing encrypted keystore file.
        #[arg(long)]
        keystore: PathBuf,
        /// Unique wallet alias.
        #[arg(long)]
        alias: String,
    },

    /// Initialize an already imported wallet and replay its history.
    Login {
        #[arg(long)]
        alias: String,
    },

    /// Append a bookkeeping entry to a wallet's local transaction history.
    /// Non-failed entries are replayed to the frontend on the next login.
    RecordTx {
        #[arg(long)]
        alias: String,
        #[arg(long)]
        amount: i64,
        #[arg(long)]
        receiver: String,
        /// Mark the entry as failed; failed entries are kept but not replayed.
        #[arg(long)]
        failed: bool,
    },

    /// Print resolved paths (useful for debugging).
    Paths,
}

fn init_logging(paths: &paths::WalletPaths) -> tracing_appender::non_blocking::WorkerGuard {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let file_name = paths
        .log_file
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("dagwallet.log.jsonl");
    let file_appender = tracing_appender::rolling::never(&paths.data_dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_filter(env_filter.clone());
    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn prompt_passwords() -> eyre::Result<(SecretString, SecretString)> {
    let store_pass = rpassword::prompt_password("Keystore password: ")
        .context("read keystore password")?;
    let key_pass = rpassword::prompt_password("Key password: ").context("read key password")?;
    Ok((
        SecretString::new(store_pass.into()),
        SecretString::new(key_pass.into()),
    ))
}

async fn build_orchestrator(
    paths: &paths::WalletPaths,
) -> eyre::Result<(
    orchestrator::WalletOrchestrator,
    tokio::sync::mpsc::UnboundedReceiver<notifier::FrontendEvent>,
)> {
    paths.ensure_private_dirs()?;
    let cfg = store::ConfigStore::new(paths).load_or_init_default()?;
    let db = db::Db::open(&paths.db_path()).await?;
    let (bridge, rx) = notifier::ChannelNotifier::new();
    let orch = orchestrator::WalletOrchestrator::new(
        db,
        cfg,
        paths.clone(),
        Arc::new(keystore::LocalKeystore),
        Arc::new(bridge),
    );
    Ok((orch, rx))
}

/// Drain events the protocols pushed at the frontend bridge and print them as
/// JSON lines, the shape a GUI shell would consume.
fn drain_events(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<notifier::FrontendEvent>,
) -> eyre::Result<()> {
    use std::io::Write as _;
    let mut out = std::io::stdout().lock();
    while let Ok(ev) = rx.try_recv() {
        let s = serde_json::to_string(&ev).context("serialize event")?;
        writeln!(out, "{s}").context("write event")?;
    }
    Ok(())
}

/// One machine-readable result line per command, after the drained events.
fn print_status(orch: &orchestrator::WalletOrchestrator, ok: bool) -> eyre::Result<()> {
    use std::io::Write as _;
    let s = serde_json::to_string(&serde_json::json!({
        "ok": ok,
        "ts": wallet::utc_now_iso(),
        "alias": orch.wallet().alias,
        "address": orch.wallet().address,
        "new_user": orch.session.new_user,
        "first_tx": orch.session.first_tx,
        "user_logged_in": orch.session.user_logged_in,
        "keystore_access": orch.session.keystore_access,
        "tx_files": orch.tx_paths(),
    }))
    .context("serialize status")?;
    writeln!(std::io::stdout().lock(), "{s}").context("write status")?;
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let paths = paths::WalletPaths::discover()?;
    std::fs::create_dir_all(&paths.data_dir).context("create data dir")?;
    let _log_guard = init_logging(&paths);

    match cli.cmd {
        Command::Create { keystore, alias } => {
            let (mut orch, mut rx) = build_orchestrator(&paths).await?;
            let (store_pass, key_pass) = prompt_passwords()?;
            let ok = orch
                .create_wallet(&keystore, store_pass, key_pass, &alias)
                .await
                .context("create wallet failed")?;
            orch.shutdown().await;
            drain_events(&mut rx)?;
            print_status(&orch, ok)?;
            if !ok {
                eyre::bail!("wallet creation failed");
            }
            Ok(())
        }
        Command::Import { keystore, alias } => {
            let (mut orch, mut rx) = build_orchestrator(&paths).await?;
            let (store_pass, key_pass) = prompt_passwords()?;
            let ok = orch
                .import_wallet(&keystore, store_pass, key_pass, &alias)
                .await
                .context("import wallet failed")?;
            orch.shutdown().await;
            drain_events(&mut rx)?;
            print_status(&orch, ok)?;
            if !ok {
                eyre::bail!("wallet import failed");
            }
            Ok(())
        }
        Command::Login { alias } => {
            let (mut orch, mut rx) = build_orchestrator(&paths).await?;
            let ok = orch.login(&alias).await.context("login failed")?;
            orch.shutdown().await;
            drain_events(&mut rx)?;
            print_status(&orch, ok)?;
            if !ok {
                eyre::bail!("login failed");
            }
            Ok(())
        }
        Command::RecordTx {
            alias,
            amount,
            receiver,
            failed,
        } => {
            paths.ensure_private_dirs()?;
            let db = db::Db::open(&paths.db_path()).await?;
            db.insert_tx(&alias, amount, &receiver, failed, &wallet::utc_now_iso())
                .await
                .context("record transaction")?;
            Ok(())
        }
        Command::Paths => {
            use std::io::Write as _;
            let s = serde_json::to_string(&serde_json::json!({
              "config_dir": paths.config_dir,
              "data_dir": paths.data_dir,
              "log_file": paths.log_file,
            }))
            .context("serialize paths")?;
            writeln!(std::io::stdout().lock(), "{s}").context("write paths")?;
            Ok(())
        }
    }
}
