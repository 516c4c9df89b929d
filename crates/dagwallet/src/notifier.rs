use crate::wallet::TxRecord;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Events pushed to the frontend bridge. `LoginError` is the credential/flow
/// error channel; `Error` is the generic persistence/filesystem channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum FrontendEvent {
    NewTransaction(TxRecord),
    WalletKeys(String),
    LoginError(String),
    Error(String),
}

pub trait Notifier: Send + Sync {
    fn emit(&self, event: FrontendEvent);
}

/// mpsc-backed bridge: the frontend drains the receiving end.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<FrontendEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FrontendEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn emit(&self, event: FrontendEvent) {
        // A departed frontend is not a wallet failure.
        drop(self.tx.send(event));
    }
}

/// Handle to the running periodic key-push task. Dropping the handle leaves
/// the task running for the process lifetime; `stop` shuts it down.
pub struct KeyPusher {
    shutdown: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl KeyPusher {
    pub async fn stop(self) {
        drop(self.shutdown.send(true));
        drop(self.handle.await);
    }
}

/// Emit the wallet address on the `wallet_keys` channel every `interval`
/// until the shutdown signal fires. Callers must check the session widget
/// flag first: one instance per process.
pub fn spawn_key_pusher(
    notifier: Arc<dyn Notifier>,
    address: String,
    interval: Duration,
) -> KeyPusher {
    let (shutdown, mut rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    notifier.emit(FrontendEvent::WalletKeys(address.clone()));
                }
                res = rx.changed() => {
                    if res.is_err() || *rx.borrow() {
                        break;
                    }
                }
            }
        }
    });
    KeyPusher { shutdown, handle }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{FrontendEvent, Notifier};
    use std::sync::Mutex;

    /// Records every emitted event, for protocol assertions.
    #[derive(Default)]
    pub struct RecordingNotifier {
        events: Mutex<Vec<FrontendEvent>>,
    }

    impl RecordingNotifier {
        pub fn events(&self) -> Vec<FrontendEvent> {
            self.events.lock().map(|g| g.clone()).unwrap_or_default()
        }
    }

    impl Notifier for RecordingNotifier {
        fn emit(&self, event: FrontendEvent) {
            if let Ok(mut g) = self.events.lock() {
                g.push(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn key_pusher_emits_periodically_and_stops_on_signal() -> eyre::Result<()> {
        let (notifier, mut rx) = ChannelNotifier::new();
        let started = Instant::now();
        let pusher = spawn_key_pusher(
            Arc::new(notifier),
            "DAGabc".to_owned(),
            Duration::from_millis(30),
        );

        let mut stamps = vec![];
        for _ in 0_usize..3_usize {
            let ev = rx
                .recv()
                .await
                .ok_or_else(|| eyre::eyre!("channel closed early"))?;
            match ev {
                FrontendEvent::WalletKeys(addr) => assert_eq!(addr, "DAGabc"),
                other @ (FrontendEvent::NewTransaction(_)
                | FrontendEvent::LoginError(_)
                | FrontendEvent::Error(_)) => {
                    eyre::bail!("unexpected event: {other:?}")
                }
            }
            stamps.push(started.elapsed());
        }
        // Three ticks at a 30ms cadence (first fires immediately).
        let Some(last) = stamps.last() else {
            eyre::bail!("no stamps recorded");
        };
        assert!(*last >= Duration::from_millis(50), "ticks too fast: {stamps:?}");

        pusher.stop().await;
        // Drain anything emitted before the stop landed, then expect silence.
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(rx.try_recv().is_err());
        Ok(())
    }
}
