//! In-process store implementing the backend traits.
//!
//! [`MemoryTable`] keeps rows in a vector, publishes every write on a
//! [`ChangeBus`] and serves change channels by forwarding matching bus
//! events. Faults can be injected to exercise the retry paths.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use touchline_core::feed::{FeedFilter, SyncRow};
use touchline_core::types::RowId;
use touchline_events::{ChangeBus, ChangeEvent, ChangeKind};

use crate::backend::{ChangeChannel, ChannelSignal, FeedSource, FileStore, RowWriter};
use crate::error::BackendError;

/// Buffered signals per change channel.
const CHANNEL_CAPACITY: usize = 64;

/// Failures to inject into the next calls.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Number of upcoming fetches that fail.
    pub failing_fetches: u32,
    /// Number of upcoming subscribes that fail.
    pub failing_subscribes: u32,
    /// Number of upcoming writes that fail.
    pub failing_writes: u32,
    /// Added latency for every fetch.
    pub fetch_delay: Option<Duration>,
    /// Added latency for every write.
    pub write_delay: Option<Duration>,
}

/// When each read call was made, for asserting backoff timing.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    pub fetches: Vec<Instant>,
    pub subscribes: Vec<Instant>,
}

/// One table of rows of type `R`.
pub struct MemoryTable<R> {
    rows: Mutex<Vec<R>>,
    bus: Arc<ChangeBus>,
    faults: Mutex<Faults>,
    channels: Mutex<Vec<mpsc::Sender<ChannelSignal>>>,
    calls: Mutex<CallLog>,
}

impl<R: SyncRow + Serialize> MemoryTable<R> {
    /// A table publishing on `bus`. Tables sharing a bus see each other's
    /// events but only forward those of their own table.
    pub fn new(bus: Arc<ChangeBus>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            bus,
            faults: Mutex::new(Faults::default()),
            channels: Mutex::new(Vec::new()),
            calls: Mutex::new(CallLog::default()),
        }
    }

    /// Load rows without publishing change events.
    pub async fn seed(&self, rows: impl IntoIterator<Item = R>) {
        self.rows.lock().await.extend(rows);
    }

    pub async fn snapshot(&self) -> Vec<R> {
        self.rows.lock().await.clone()
    }

    pub async fn set_faults(&self, faults: Faults) {
        *self.faults.lock().await = faults;
    }

    pub async fn call_log(&self) -> CallLog {
        self.calls.lock().await.clone()
    }

    /// Number of change channels whose consumer is still attached.
    pub async fn live_channel_count(&self) -> usize {
        let mut channels = self.channels.lock().await;
        channels.retain(|tx| !tx.is_closed());
        channels.len()
    }

    /// Deliver `signal` to every live change channel, as if the store had
    /// reported it. Used to simulate channel errors, timeouts and closes.
    pub async fn inject_signal(&self, signal: ChannelSignal) {
        let channels = self.channels.lock().await.clone();
        tracing::debug!(table = R::TABLE, ?signal, channels = channels.len(), "Injecting channel signal");
        for tx in channels {
            // A consumer that went away in the meantime is fine.
            let _ = tx.send(signal.clone()).await;
        }
    }

    fn publish(&self, kind: ChangeKind, row: &R) {
        let mut event = ChangeEvent::new(R::TABLE, kind, row.row_id(), row.scope());
        if kind != ChangeKind::Delete {
            match serde_json::to_value(row) {
                Ok(record) => event = event.with_record(record),
                Err(e) => tracing::warn!(table = R::TABLE, error = %e, "Could not serialize change record"),
            }
        }
        self.bus.publish(event);
    }

    async fn take_write_fault(&self) -> Result<(), BackendError> {
        let delay = {
            let mut faults = self.faults.lock().await;
            if faults.failing_writes > 0 {
                faults.failing_writes -= 1;
                return Err(BackendError::Request("injected write failure".into()));
            }
            faults.write_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

impl<R: SyncRow + Serialize> Default for MemoryTable<R> {
    fn default() -> Self {
        Self::new(Arc::new(ChangeBus::default()))
    }
}

#[async_trait]
impl<R: SyncRow + Serialize> FeedSource<R> for MemoryTable<R> {
    async fn fetch(&self, filter: &FeedFilter) -> Result<Vec<R>, BackendError> {
        self.calls.lock().await.fetches.push(Instant::now());

        let delay = {
            let mut faults = self.faults.lock().await;
            if faults.failing_fetches > 0 {
                faults.failing_fetches -= 1;
                return Err(BackendError::Request("injected fetch failure".into()));
            }
            faults.fetch_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if filter.feed.table() != R::TABLE {
            return Err(BackendError::Rejected(format!(
                "Feed {} is not served by table {}",
                filter.feed,
                R::TABLE
            )));
        }

        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|row| filter.scope.matches(&row.scope()))
            .cloned()
            .collect())
    }

    async fn subscribe(&self, filter: &FeedFilter) -> Result<ChangeChannel, BackendError> {
        self.calls.lock().await.subscribes.push(Instant::now());

        {
            let mut faults = self.faults.lock().await;
            if faults.failing_subscribes > 0 {
                faults.failing_subscribes -= 1;
                return Err(BackendError::Request("injected subscribe failure".into()));
            }
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let guard = CancellationToken::new();

        let mut channels = self.channels.lock().await;
        channels.retain(|tx| !tx.is_closed());
        channels.push(tx.clone());
        drop(channels);

        tokio::spawn(forward_changes(self.bus.subscribe(), tx, guard.clone(), *filter));
        Ok(ChangeChannel::new(rx, guard))
    }
}

/// Forward bus events matching `filter` until the channel is dropped.
async fn forward_changes(
    mut events: broadcast::Receiver<ChangeEvent>,
    tx: mpsc::Sender<ChannelSignal>,
    guard: CancellationToken,
    filter: FeedFilter,
) {
    loop {
        let received = tokio::select! {
            _ = guard.cancelled() => break,
            received = events.recv() => received,
        };

        let signal = match received {
            Ok(event) if event.matches(&filter) => ChannelSignal::Changed(event.kind),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Something changed; the consumer re-fetches anyway.
                tracing::debug!(%filter, skipped, "Change forwarder lagged");
                ChannelSignal::Changed(ChangeKind::Update)
            }
            Err(broadcast::error::RecvError::Closed) => ChannelSignal::Closed,
        };

        let terminal = signal.is_terminal();
        if tx.send(signal).await.is_err() || terminal {
            break;
        }
    }
    tracing::trace!(%filter, "Change forwarder stopped");
}

#[async_trait]
impl<R: SyncRow + Serialize> RowWriter<R> for MemoryTable<R> {
    async fn insert(&self, row: R) -> Result<R, BackendError> {
        self.take_write_fault().await?;
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|r| r.row_id() == row.row_id()) {
            return Err(BackendError::Rejected(format!(
                "Duplicate key {} in {}",
                row.row_id(),
                R::TABLE
            )));
        }
        rows.push(row.clone());
        drop(rows);

        self.publish(ChangeKind::Insert, &row);
        Ok(row)
    }

    async fn update(&self, id: RowId, patch: R::Patch) -> Result<R, BackendError> {
        self.take_write_fault().await?;
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|r| r.row_id() == id)
            .ok_or(BackendError::NotFound(id))?;
        row.apply_patch(&patch);
        let stored = row.clone();
        drop(rows);

        self.publish(ChangeKind::Update, &stored);
        Ok(stored)
    }

    async fn delete(&self, id: RowId) -> Result<(), BackendError> {
        self.take_write_fault().await?;
        let mut rows = self.rows.lock().await;
        let index = rows
            .iter()
            .position(|r| r.row_id() == id)
            .ok_or(BackendError::NotFound(id))?;
        let removed = rows.remove(index);
        drop(rows);

        self.publish(ChangeKind::Delete, &removed);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Object store keeping uploads in memory.
#[derive(Default)]
pub struct MemoryFileStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(path).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, BackendError> {
        let mut objects = self.objects.lock().await;
        if objects.contains_key(path) {
            return Err(BackendError::Rejected(format!("Object {path} already exists")));
        }
        objects.insert(path.to_string(), bytes);
        Ok(path.to_string())
    }
}
