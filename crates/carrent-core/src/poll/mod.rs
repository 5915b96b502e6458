//! Cancellable background refreshes.
//!
//! A [`PollHandle`] owns a repeating timer; stopping or dropping it cancels
//! the timer. Each tick runs as its own task, so a fetch already in flight
//! when the timer is stopped still completes and applies its result.
//! [`AccountPoller`] restarts the timer whenever the active account changes.

pub mod gps;
pub mod notifications;

pub use gps::GpsTracker;
pub use notifications::{FeedState, NotificationFeed};

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Handle to a repeating background task. Dropping it stops the timer.
#[must_use = "dropping the handle stops the poller"]
#[derive(Debug)]
pub struct PollHandle {
    timer: JoinHandle<()>,
}

impl PollHandle {
    /// Run `tick` now and then every `period` until stopped.
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let timer = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tokio::spawn(tick());
            }
        });
        Self { timer }
    }

    pub fn stop(self) {}

    pub fn is_running(&self) -> bool {
        !self.timer.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

type Starter = Box<dyn Fn(&str) -> PollHandle + Send + Sync>;

/// Poller bound to the currently connected account.
///
/// Switching accounts stops the old timer before starting a new one;
/// clearing the account stops polling altogether.
pub struct AccountPoller {
    start: Starter,
    current: Option<(String, PollHandle)>,
}

impl AccountPoller {
    pub fn new(start: impl Fn(&str) -> PollHandle + Send + Sync + 'static) -> Self {
        Self {
            start: Box::new(start),
            current: None,
        }
    }

    pub fn set_account(&mut self, account: Option<&str>) {
        let unchanged = matches!(
            (account, &self.current),
            (Some(next), Some((active, _))) if next == active
        );
        if unchanged {
            return;
        }

        // Stop the old timer before the new one fires its first tick
        if let Some((previous, _)) = self.current.take() {
            debug!(account = %previous, "Account poller stopped");
        }
        if let Some(next) = account {
            debug!(account = %next, "Starting account poller");
            self.current = Some((next.to_string(), (self.start)(next)));
        }
    }

    pub fn account(&self) -> Option<&str> {
        self.current.as_ref().map(|(account, _)| account.as_str())
    }
}

impl std::fmt::Debug for AccountPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountPoller")
            .field("account", &self.account())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn counting(counter: &Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<()> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_immediately_then_every_period() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let handle = PollHandle::spawn(Duration::from_secs(30), counting(&ticks));

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(handle.is_running());

        handle.stop();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_tick_survives_stop() {
        let applied = Arc::new(AtomicUsize::new(0));
        let slot = Arc::clone(&applied);
        let handle = PollHandle::spawn(Duration::from_secs(30), move || {
            let slot = Arc::clone(&slot);
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                slot.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(applied.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_account_poller_restarts_on_change() {
        let started = Arc::new(Mutex::new(Vec::<String>::new()));
        let ticks = Arc::new(AtomicUsize::new(0));

        let log = Arc::clone(&started);
        let counter = Arc::clone(&ticks);
        let mut poller = AccountPoller::new(move |account| {
            log.lock().expect("lock").push(account.to_string());
            PollHandle::spawn(Duration::from_secs(30), counting(&counter))
        });

        poller.set_account(Some("0xa"));
        poller.set_account(Some("0xa"));
        assert_eq!(poller.account(), Some("0xa"));
        tokio::time::sleep(Duration::from_secs(1)).await;

        poller.set_account(Some("0xb"));
        assert_eq!(*started.lock().expect("lock"), vec!["0xa", "0xb"]);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        poller.set_account(None);
        assert!(poller.account().is_none());
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }
}
