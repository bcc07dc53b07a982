//! Bounded background execution for queue work.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Runs queue work on the tokio runtime with at most `max_in_flight` units
/// executing at once. Excess work waits for a permit in FIFO order.
///
/// Fetches get two extra guards against rapid clicking:
/// - at most one fetch waits for a permit; further requests join it
///   ([`spawn_fetch`](Self::spawn_fetch) returns `None`)
/// - at most one delayed fetch is scheduled, at the latest deadline asked for
#[derive(Clone)]
pub struct Dispatcher {
    permits: Arc<Semaphore>,
    max_in_flight: usize,
    fetch_waiting: Arc<AtomicBool>,
    delayed: Arc<Mutex<DelayedFetch>>,
}

#[derive(Default)]
struct DelayedFetch {
    generation: u64,
    deadline: Option<Instant>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("max_in_flight", &self.max_in_flight)
            .field("available", &self.permits.available_permits())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            fetch_waiting: Arc::new(AtomicBool::new(false)),
            delayed: Arc::new(Mutex::new(DelayedFetch::default())),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `work` once a permit is free. Resolves to `None` if the dispatcher
    /// was closed before the work started.
    pub fn spawn<F, T>(&self, work: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.ok()?;
            Some(work.await)
        })
    }

    /// Run a queue fetch unless another one is already waiting to start.
    pub fn spawn_fetch<F>(&self, fetch: F) -> Option<JoinHandle<()>>
    where
        F: Future + Send + 'static,
    {
        if self.fetch_waiting.swap(true, Ordering::AcqRel) {
            tracing::trace!("fetch coalesced into a waiting one");
            return None;
        }
        let permits = Arc::clone(&self.permits);
        let waiting = Arc::clone(&self.fetch_waiting);
        Some(tokio::spawn(async move {
            let permit = permits.acquire_owned().await;
            waiting.store(false, Ordering::Release);
            let Ok(_permit) = permit else {
                return;
            };
            fetch.await;
        }))
    }

    /// Run a fetch after `delay`. A pending delayed fetch with a later or
    /// equal deadline absorbs this one; an earlier one is superseded.
    pub fn schedule_fetch<F>(&self, delay: Duration, fetch: F)
    where
        F: Future + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let generation = {
            let mut delayed = self.lock_delayed();
            if delayed.deadline.is_some_and(|pending| pending >= deadline) {
                return;
            }
            delayed.generation += 1;
            delayed.deadline = Some(deadline);
            delayed.generation
        };

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            {
                let mut delayed = this.lock_delayed();
                if delayed.generation != generation {
                    return;
                }
                delayed.deadline = None;
            }
            if this.permits.is_closed() {
                return;
            }
            this.spawn_fetch(fetch);
        });
    }

    /// Stop accepting work. Waiting units are dropped; running ones finish.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    fn lock_delayed(&self) -> std::sync::MutexGuard<'_, DelayedFetch> {
        self.delayed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
