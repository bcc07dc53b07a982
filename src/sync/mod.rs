//! Sequencing of user commands with the queue refreshes that reveal their
//! effect.
//!
//! Every mutating action follows the same pattern: dispatch the call, apply
//! any optimistic local update, fetch again once the call returns, and fetch
//! once more after a settle delay. Fetch results overwrite the displayed
//! snapshot, so whichever lands last wins.

mod auto_refresh;
mod dispatch;

pub use auto_refresh::AutoRefresh;
pub use dispatch::Dispatcher;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::auth::TokenStore;
use crate::config::{SettingsStore, SrConfig};
use crate::error::SrError;
use crate::events::{EventBus, SrEvent};
use crate::queue::{QueueClient, QueueControl};

/// Drives [`QueueClient`] off the caller's task.
///
/// All methods return immediately; the returned handles may be awaited but
/// nothing requires it. Cloning is cheap and clones share the worker pool.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    client: QueueClient,
    tokens: Arc<TokenStore>,
    settings: Arc<dyn SettingsStore>,
    dispatcher: Dispatcher,
    auto_refresh: AutoRefresh,
    refetch_delay: Duration,
    toggle_refetch_delay: Duration,
}

impl SyncCoordinator {
    pub fn new(
        client: QueueClient,
        tokens: Arc<TokenStore>,
        settings: Arc<dyn SettingsStore>,
        config: &SrConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                tokens,
                settings,
                dispatcher: Dispatcher::new(config.max_in_flight()),
                auto_refresh: AutoRefresh::new(),
                refetch_delay: config.refetch_delay(),
                toggle_refetch_delay: config.toggle_refetch_delay(),
            }),
        }
    }

    pub fn client(&self) -> &QueueClient {
        &self.inner.client
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Fetch the queue now. `None` when an already waiting fetch absorbed it.
    pub fn refresh(&self) -> Option<JoinHandle<()>> {
        let client = self.inner.client.clone();
        self.inner.dispatcher.spawn_fetch(async move {
            client.fetch_queue().await;
        })
    }

    pub fn play(&self) -> JoinHandle<Option<()>> {
        self.control(QueueControl::Play)
    }

    pub fn pause(&self) -> JoinHandle<Option<()>> {
        self.control(QueueControl::Pause)
    }

    pub fn skip(&self) -> JoinHandle<Option<()>> {
        self.control(QueueControl::Skip)
    }

    fn control(&self, action: QueueControl) -> JoinHandle<Option<()>> {
        let client = self.inner.client.clone();
        self.run_then_refresh(self.inner.refetch_delay, async move {
            client.control(action).await;
        })
    }

    pub fn delete_song(&self, id: impl Into<String>) -> JoinHandle<Option<()>> {
        let client = self.inner.client.clone();
        let id = id.into();
        self.run_then_refresh(self.inner.refetch_delay, async move {
            client.delete_song(&id).await;
        })
    }

    pub fn promote_song(&self, id: impl Into<String>) -> JoinHandle<Option<()>> {
        let client = self.inner.client.clone();
        let id = id.into();
        self.run_then_refresh(self.inner.refetch_delay, async move {
            client.promote_song(&id).await;
        })
    }

    /// Flip the requests-enabled flag.
    ///
    /// The new value is published at once. The delayed fetch waits longer
    /// than for other commands.
    pub fn set_requests_enabled(&self, enabled: bool) -> JoinHandle<Option<()>> {
        self.inner
            .client
            .events()
            .publish(SrEvent::RequestsEnabled(enabled));
        let client = self.inner.client.clone();
        self.run_then_refresh(self.inner.toggle_refetch_delay, async move {
            client.set_requests_enabled(enabled).await;
        })
    }

    /// Submit a song request; refreshes only when it was accepted.
    pub fn add_song(&self, query: impl Into<String>) -> JoinHandle<Option<Result<String, SrError>>> {
        let this = self.clone();
        let query = query.into();
        self.inner.dispatcher.spawn(async move {
            let result = this.inner.client.add_song(&query).await;
            if result.is_ok() {
                this.refresh();
                this.schedule_refresh(this.inner.refetch_delay);
            }
            result
        })
    }

    /// Post-sign-in work: fetch the user's name, remember it, and load the
    /// queue once it is known. Starts auto-refresh when enabled.
    pub fn on_authenticated(&self) -> JoinHandle<Option<String>> {
        let this = self.clone();
        let handle = self.inner.dispatcher.spawn(async move {
            let name = this.inner.client.fetch_user_info().await;
            if name.is_empty() {
                tracing::warn!("signed in but no user name came back");
                return name;
            }
            if let Err(e) = this.inner.settings.set_user_name(&name) {
                tracing::warn!(error = %e, "failed to store user name");
            }
            this.refresh();
            name
        });
        self.apply_settings();
        handle
    }

    /// Post-sign-out work: stop background refreshes.
    pub fn on_signed_out(&self) {
        self.inner.auto_refresh.stop();
    }

    /// Start or stop auto-refresh to match the stored settings.
    pub fn apply_settings(&self) -> bool {
        let settings = self.inner.settings.get();
        if !settings.auto_refresh_enabled {
            self.inner.auto_refresh.stop();
            return false;
        }
        self.start_auto_refresh(settings.auto_refresh_interval_secs)
    }

    /// Fetch every `interval_secs` while a token is held. Refuses intervals
    /// outside `5..=300` and stops by itself after sign-out.
    pub fn start_auto_refresh(&self, interval_secs: u32) -> bool {
        if !self.inner.tokens.has_token() {
            tracing::debug!("not signed in; auto-refresh not started");
            self.inner.auto_refresh.stop();
            return false;
        }
        let this = Arc::downgrade(&self.inner);
        self.inner.auto_refresh.start(interval_secs, move || {
            let Some(inner) = this.upgrade() else {
                return false;
            };
            if !inner.tokens.has_token() {
                tracing::info!("signed out; stopping auto-refresh");
                return false;
            }
            let client = inner.client.clone();
            inner.dispatcher.spawn_fetch(async move {
                client.fetch_queue().await;
            });
            true
        })
    }

    pub fn stop_auto_refresh(&self) {
        self.inner.auto_refresh.stop();
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.inner.auto_refresh.is_running()
    }

    /// React to session events on `events`: sign-in runs
    /// [`on_authenticated`](Self::on_authenticated), expiry runs
    /// [`on_signed_out`](Self::on_signed_out). Abort the handle to stop
    /// listening.
    pub fn follow_session(&self, events: &EventBus) -> JoinHandle<()> {
        let mut rx = events.subscribe();
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(SrEvent::AuthCompleted { success: true }) => {
                        this.on_authenticated();
                    }
                    Ok(SrEvent::SessionExpired) => this.on_signed_out(),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "session listener lagged");
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        })
    }

    /// Stop auto-refresh and refuse further work.
    pub fn shutdown(&self) {
        self.inner.auto_refresh.stop();
        self.inner.dispatcher.close();
    }

    fn schedule_refresh(&self, delay: Duration) {
        let client = self.inner.client.clone();
        self.inner.dispatcher.schedule_fetch(delay, async move {
            client.fetch_queue().await;
        });
    }

    fn run_then_refresh<F>(&self, delay: Duration, command: F) -> JoinHandle<Option<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.schedule_refresh(delay);
        let this = self.clone();
        self.inner.dispatcher.spawn(async move {
            command.await;
            this.refresh();
        })
    }
}
