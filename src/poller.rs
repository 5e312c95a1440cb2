//! Polling Refresh Loop
//!
//! Runs a [`Refresh`] target on a fixed interval and whenever an external
//! push notification arrives. Every cycle is its own task, so a slow
//! response never delays the next tick; overlapping cycles simply race and
//! the last one to render wins.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::client::ClientError;

/// A page section that can reload itself from the backend
#[async_trait]
pub trait Refresh: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Fetch and re-render. On error the previous view must stay untouched.
    async fn refresh(&self) -> Result<(), ClientError>;
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Interval,
    Push,
}

/// Handle to a running refresh loop
pub struct Poller {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl Poller {
    /// Start refreshing `target` every `interval`. The first cycle runs
    /// immediately. `push` delivers external change notifications that
    /// trigger an extra cycle.
    pub fn spawn<R: Refresh>(
        target: Arc<R>,
        interval: Duration,
        push: Option<mpsc::Receiver<()>>,
    ) -> Self {
        let name = target.name();
        tracing::info!(
            target_name = name,
            interval_ms = interval.as_millis() as u64,
            push = push.is_some(),
            "Starting refresh loop"
        );

        let handle = tokio::spawn(async move {
            let mut push = push;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let trigger = tokio::select! {
                    _ = ticker.tick() => Trigger::Interval,
                    delivered = next_push(&mut push) => {
                        if !delivered {
                            tracing::debug!(target_name = name, "Push channel closed");
                            push = None;
                            continue;
                        }
                        Trigger::Push
                    }
                };

                tokio::spawn(run_cycle(Arc::clone(&target), trigger));
            }
        });

        Self { name, handle }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stop scheduling new cycles. Cycles already running finish on their own.
    pub fn stop(&self) {
        tracing::debug!(target_name = self.name, "Stopping refresh loop");
        self.handle.abort();
    }
}

async fn next_push(push: &mut Option<mpsc::Receiver<()>>) -> bool {
    match push {
        Some(rx) => rx.recv().await.is_some(),
        None => std::future::pending().await,
    }
}

async fn run_cycle<R: Refresh>(target: Arc<R>, trigger: Trigger) {
    let started = std::time::Instant::now();
    match target.refresh().await {
        Ok(()) => tracing::debug!(
            target_name = target.name(),
            ?trigger,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Refresh complete"
        ),
        Err(e) => tracing::warn!(
            target_name = target.name(),
            ?trigger,
            error = %e,
            "Refresh failed, keeping previous view"
        ),
    }
}

/// Sending half of a push channel. Notifications coalesce: while one is
/// still pending, further ones are dropped.
#[derive(Debug, Clone)]
pub struct PushNotifier {
    tx: mpsc::Sender<()>,
}

impl PushNotifier {
    pub fn channel() -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    /// Returns `false` once the refresh loop has gone away
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}
