use std::sync::Mutex;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::settings::{MAX_REFRESH_INTERVAL_SECS, MIN_REFRESH_INTERVAL_SECS};

/// Periodic queue refresh. One loop at a time; starting again replaces the
/// running loop.
#[derive(Debug, Default)]
pub struct AutoRefresh {
    running: Mutex<Option<CancellationToken>>,
}

impl AutoRefresh {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(period)` for intervals within `5..=300` seconds.
    pub fn period_for(interval_secs: u32) -> Option<Duration> {
        (MIN_REFRESH_INTERVAL_SECS..=MAX_REFRESH_INTERVAL_SECS)
            .contains(&interval_secs)
            .then(|| Duration::from_secs(u64::from(interval_secs)))
    }

    /// Call `tick` every `interval_secs`, first after one full period, until
    /// it returns `false` or [`stop`](Self::stop) is called.
    ///
    /// Returns `false` without starting when the interval is out of range.
    pub fn start<F>(&self, interval_secs: u32, mut tick: F) -> bool
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let Some(period) = Self::period_for(interval_secs) else {
            tracing::warn!(interval_secs, "auto-refresh interval out of range; not starting");
            self.stop();
            return false;
        };

        let cancel = CancellationToken::new();
        if let Some(previous) = self.lock().replace(cancel.clone()) {
            previous.cancel();
        }
        tracing::info!(interval_secs, "auto-refresh started");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    _ = ticker.tick() => {
                        if !tick() {
                            tracing::info!("auto-refresh stopped");
                            cancel.cancel();
                            return;
                        }
                    }
                }
            }
        });
        true
    }

    pub fn stop(&self) {
        if let Some(cancel) = self.lock().take() {
            cancel.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|cancel| !cancel.is_cancelled())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.stop();
    }
}
