//! Resilient realtime subscription for one feed filter.
//!
//! [`ResilientSubscription::mount`] spawns one task that owns the change
//! channel:
//!
//! 1. Fetch the filtered collection (retried with linear backoff).
//! 2. Open a change channel for the same filter.
//! 3. On every change, re-fetch and reconcile. Changes that queued up while
//!    a refresh was running are folded into it.
//! 4. When the channel errors, times out or closes, recreate it with the
//!    same bounded backoff. A successful reconnect resets the attempt count
//!    and re-fetches to catch up. Once retries are exhausted the feed stays
//!    [`SubscriptionStatus::Unsubscribed`] until it is mounted again.
//!
//! The cache is owned by the subscription and never shared with another
//! one. Closing cancels the task and waits for it, so the channel is gone
//! before a replacement opens; results that arrive after cancellation are
//! discarded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use touchline_core::feed::{FeedFilter, SyncRow};
use touchline_core::types::{RowId, Timestamp};

use crate::backend::{ChangeChannel, ChannelSignal, FeedSource, RowWriter};
use crate::command::RowCommand;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::reconcile::{reconcile, LocalRow};
use crate::retry::{retry_delay, retry_with_backoff, with_timeout, RetryOutcome};

/// How long [`ResilientSubscription::close`] waits for the task to exit.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of the change channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Unsubscribed,
    Subscribing,
    Subscribed,
    /// The channel failed; `attempt` counts consecutive recreation attempts.
    Erroring { attempt: u32 },
}

#[derive(Debug)]
struct FeedCache<R> {
    rows: Vec<LocalRow<R>>,
    loading: bool,
    last_synced_at: Option<Timestamp>,
}

struct Shared<R> {
    filter: FeedFilter,
    config: SyncConfig,
    cache: RwLock<FeedCache<R>>,
    status: watch::Sender<SubscriptionStatus>,
    /// Bumped whenever the cache changes.
    revision: watch::Sender<u64>,
    cancel: CancellationToken,
}

/// A mounted feed: its cache, channel status and worker task.
pub struct ResilientSubscription<R: SyncRow> {
    shared: Arc<Shared<R>>,
    task: Option<JoinHandle<()>>,
}

impl<R: SyncRow> ResilientSubscription<R> {
    /// Start fetching and watching `filter`. Must be called within a tokio
    /// runtime.
    pub fn mount(source: Arc<dyn FeedSource<R>>, filter: FeedFilter, config: SyncConfig) -> Self {
        let (status, _) = watch::channel(SubscriptionStatus::Subscribing);
        let (revision, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            filter,
            config,
            cache: RwLock::new(FeedCache {
                rows: Vec::new(),
                loading: true,
                last_synced_at: None,
            }),
            status,
            revision,
            cancel: CancellationToken::new(),
        });

        tracing::info!(%filter, "Mounting feed");
        let task = tokio::spawn(Arc::clone(&shared).run(source));

        Self {
            shared,
            task: Some(task),
        }
    }

    pub fn filter(&self) -> FeedFilter {
        self.shared.filter
    }

    pub fn status(&self) -> SubscriptionStatus {
        *self.shared.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<SubscriptionStatus> {
        self.shared.status.subscribe()
    }

    /// Receiver that is notified whenever the cached rows change.
    pub fn watch_revision(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Snapshot of the cached rows.
    pub async fn rows(&self) -> Vec<LocalRow<R>> {
        self.shared.cache.read().await.rows.clone()
    }

    /// True until the first fetch settles.
    pub async fn is_loading(&self) -> bool {
        self.shared.cache.read().await.loading
    }

    pub async fn last_synced_at(&self) -> Option<Timestamp> {
        self.shared.cache.read().await.last_synced_at
    }

    /// Set the client-only `editing` flag of a row. Returns `false` if the
    /// row is not cached.
    pub async fn set_editing(&self, id: RowId, editing: bool) -> bool {
        let mut cache = self.shared.cache.write().await;
        let Some(local) = cache.rows.iter_mut().find(|l| l.id() == id) else {
            return false;
        };
        local.flags.editing = editing;
        drop(cache);
        self.shared.bump_revision();
        true
    }

    /// Apply `command` optimistically, then write it through `writer`.
    ///
    /// On failure the local change is rolled back and the error returned.
    /// Writes are not retried.
    pub async fn execute(
        &self,
        writer: &dyn RowWriter<R>,
        command: RowCommand<R>,
    ) -> Result<(), SyncError> {
        let applied = {
            let mut cache = self.shared.cache.write().await;
            command.apply_local(&mut cache.rows)?
        };
        self.shared.bump_revision();

        let id = command.row_id();
        let operation = command.operation();
        let result = command.send(writer, self.shared.config.write_timeout).await;

        let mut cache = self.shared.cache.write().await;
        match result {
            Ok(stored) => {
                applied.confirm(&mut cache.rows, stored);
                drop(cache);
                self.shared.bump_revision();
                tracing::debug!(filter = %self.shared.filter, operation, row_id = %id, "Write confirmed");
                Ok(())
            }
            Err(e) => {
                applied.revert(&mut cache.rows);
                drop(cache);
                self.shared.bump_revision();
                tracing::warn!(
                    filter = %self.shared.filter,
                    operation,
                    row_id = %id,
                    error = %e,
                    "Write failed, rolled back",
                );
                Err(e)
            }
        }
    }

    /// Whether the worker has exited (after giving up or being closed).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Tear the subscription down and wait for its channel to close.
    pub async fn close(mut self) {
        self.shared.cancel.cancel();
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, &mut task).await.is_err() {
                tracing::warn!(filter = %self.shared.filter, "Feed task did not stop in time, aborting");
                task.abort();
            }
        }
        self.shared.set_status(SubscriptionStatus::Unsubscribed);
        tracing::info!(filter = %self.shared.filter, "Feed closed");
    }
}

impl<R: SyncRow> Drop for ResilientSubscription<R> {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

impl<R: SyncRow> Shared<R> {
    async fn run(self: Arc<Self>, source: Arc<dyn FeedSource<R>>) {
        self.refresh(source.as_ref()).await;
        self.channel_loop(source.as_ref()).await;
        self.set_status(SubscriptionStatus::Unsubscribed);
    }

    /// Fetch the filtered collection and reconcile it into the cache.
    async fn refresh(&self, source: &dyn FeedSource<R>) {
        let filter = &self.filter;
        let read_timeout = self.config.read_timeout;
        let outcome = retry_with_backoff("fetch", &self.config, &self.cancel, move || {
            with_timeout("fetch", read_timeout, source.fetch(filter))
        })
        .await;

        match outcome {
            RetryOutcome::Succeeded(fresh) => self.apply_fetch(fresh).await,
            RetryOutcome::Exhausted(e) => {
                tracing::warn!(%filter, error = %e, "Refresh abandoned, keeping cached rows");
                self.finish_loading().await;
            }
            RetryOutcome::Cancelled => {}
        }
    }

    async fn apply_fetch(&self, fresh: Vec<R>) {
        if self.cancel.is_cancelled() {
            return;
        }
        let mut cache = self.cache.write().await;
        cache.rows = reconcile(&cache.rows, fresh);
        cache.loading = false;
        cache.last_synced_at = Some(chrono::Utc::now());
        let count = cache.rows.len();
        drop(cache);

        self.bump_revision();
        tracing::debug!(filter = %self.filter, count, "Feed refreshed");
    }

    async fn finish_loading(&self) {
        let mut cache = self.cache.write().await;
        if cache.loading {
            cache.loading = false;
            drop(cache);
            self.bump_revision();
        }
    }

    /// Keep a change channel open, recreating it on failure.
    async fn channel_loop(&self, source: &dyn FeedSource<R>) {
        let mut attempt = 0u32;
        let mut reconnecting = false;

        loop {
            let opened = tokio::select! {
                _ = self.cancel.cancelled() => return,
                opened = with_timeout("subscribe", self.config.read_timeout, source.subscribe(&self.filter)) => opened,
            };

            let reason = match opened {
                Ok(mut channel) => {
                    attempt = 0;
                    self.set_status(SubscriptionStatus::Subscribed);
                    tracing::info!(filter = %self.filter, reconnecting, "Change channel open");

                    if reconnecting {
                        // Changes made while the channel was down were missed.
                        self.refresh(source).await;
                    }
                    reconnecting = true;

                    match self.pump(source, &mut channel).await {
                        Some(signal) => format!("{signal:?}"),
                        None => return,
                    }
                }
                Err(e) => e.to_string(),
            };

            if attempt >= self.config.max_retries {
                tracing::error!(
                    filter = %self.filter,
                    attempts = attempt,
                    reason = %reason,
                    "Change channel retries exhausted, feed unsubscribed",
                );
                return;
            }

            attempt += 1;
            self.set_status(SubscriptionStatus::Erroring { attempt });
            let delay = retry_delay(attempt, &self.config);
            tracing::warn!(
                filter = %self.filter,
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason = %reason,
                "Change channel failed, resubscribing",
            );

            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Refresh on every change until the channel ends.
    ///
    /// Returns the terminal signal, or `None` when cancelled.
    async fn pump(
        &self,
        source: &dyn FeedSource<R>,
        channel: &mut ChangeChannel,
    ) -> Option<ChannelSignal> {
        loop {
            let signal = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                signal = channel.next() => signal,
            };

            let kind = match signal {
                ChannelSignal::Changed(kind) => kind,
                terminal => return Some(terminal),
            };

            let mut coalesced = 0u32;
            let mut terminal = None;
            while let Some(queued) = channel.try_next() {
                if queued.is_terminal() {
                    terminal = Some(queued);
                    break;
                }
                coalesced += 1;
            }

            tracing::debug!(filter = %self.filter, ?kind, coalesced, "Change received, refreshing");
            self.refresh(source).await;

            if terminal.is_some() {
                return terminal;
            }
        }
    }

    fn set_status(&self, status: SubscriptionStatus) {
        self.status.send_replace(status);
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|r| *r += 1);
    }
}
