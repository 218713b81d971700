//! Seams between the sync layer and the external store.
//!
//! A store provides three capabilities: reading a filtered collection and
//! watching it for changes ([`FeedSource`]), writing rows ([`RowWriter`]) and
//! storing uploaded files ([`FileStore`]). The sync layer never assumes
//! anything about the transport behind them.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use touchline_core::feed::{FeedFilter, SyncRow};
use touchline_core::types::RowId;
use touchline_events::ChangeKind;

use crate::error::BackendError;

// ---------------------------------------------------------------------------
// Change channel
// ---------------------------------------------------------------------------

/// What a change channel reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSignal {
    /// A row matching the filter changed. Carries no usable payload: the
    /// consumer re-fetches.
    Changed(ChangeKind),
    /// The channel failed and must be recreated.
    Errored(String),
    /// The store stopped acknowledging the channel.
    TimedOut,
    /// The channel was closed from the store's side.
    Closed,
}

impl ChannelSignal {
    /// Whether this signal ends the channel.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Changed(_))
    }
}

/// A live subscription to one filter.
///
/// Dropping the channel unsubscribes: the `guard` token is cancelled, which
/// the store side watches to stop forwarding.
pub struct ChangeChannel {
    rx: mpsc::Receiver<ChannelSignal>,
    _guard: DropGuard,
}

impl ChangeChannel {
    pub fn new(rx: mpsc::Receiver<ChannelSignal>, guard: CancellationToken) -> Self {
        Self {
            rx,
            _guard: guard.drop_guard(),
        }
    }

    /// Wait for the next signal. A sender that went away reads as `Closed`.
    pub async fn next(&mut self) -> ChannelSignal {
        self.rx.recv().await.unwrap_or(ChannelSignal::Closed)
    }

    /// Take an already-queued signal without waiting.
    pub fn try_next(&mut self) -> Option<ChannelSignal> {
        match self.rx.try_recv() {
            Ok(signal) => Some(signal),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => Some(ChannelSignal::Closed),
        }
    }
}

// ---------------------------------------------------------------------------
// Store traits
// ---------------------------------------------------------------------------

/// Read side of a feed.
#[async_trait]
pub trait FeedSource<R: SyncRow>: Send + Sync {
    /// The whole filtered collection, in the store's order.
    async fn fetch(&self, filter: &FeedFilter) -> Result<Vec<R>, BackendError>;

    /// Open a change channel for `filter`.
    async fn subscribe(&self, filter: &FeedFilter) -> Result<ChangeChannel, BackendError>;
}

/// Write side of a feed. Every call returns the row as stored.
#[async_trait]
pub trait RowWriter<R: SyncRow>: Send + Sync {
    async fn insert(&self, row: R) -> Result<R, BackendError>;

    async fn update(&self, id: RowId, patch: R::Patch) -> Result<R, BackendError>;

    async fn delete(&self, id: RowId) -> Result<(), BackendError>;
}

/// Object storage for uploaded images.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store `bytes` under `path` and return the path as stored.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_sender_reads_as_closed() {
        let (tx, rx) = mpsc::channel(4);
        let mut channel = ChangeChannel::new(rx, CancellationToken::new());
        tx.send(ChannelSignal::Changed(ChangeKind::Insert)).await.unwrap();
        drop(tx);

        assert_eq!(channel.next().await, ChannelSignal::Changed(ChangeKind::Insert));
        assert_eq!(channel.next().await, ChannelSignal::Closed);
        assert_eq!(channel.try_next(), Some(ChannelSignal::Closed));
    }

    #[test]
    fn try_next_on_empty_channel() {
        let (_tx, rx) = mpsc::channel(4);
        let mut channel = ChangeChannel::new(rx, CancellationToken::new());
        assert_eq!(channel.try_next(), None);
    }

    #[test]
    fn dropping_channel_cancels_guard() {
        let (_tx, rx) = mpsc::channel::<ChannelSignal>(1);
        let token = CancellationToken::new();
        let channel = ChangeChannel::new(rx, token.clone());
        assert!(!token.is_cancelled());
        drop(channel);
        assert!(token.is_cancelled());
    }

    #[test]
    fn only_changes_keep_the_channel_open() {
        assert!(!ChannelSignal::Changed(ChangeKind::Delete).is_terminal());
        assert!(ChannelSignal::Errored("boom".into()).is_terminal());
        assert!(ChannelSignal::TimedOut.is_terminal());
        assert!(ChannelSignal::Closed.is_terminal());
    }
}
