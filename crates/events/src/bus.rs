//! In-process change bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`ChangeBus`] fans every row-level [`ChangeEvent`] out to all current
//! subscribers. The writing store and the change channels watching it hold
//! the same `Arc<ChangeBus>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use touchline_core::feed::{FeedFilter, RowScope};
use touchline_core::types::RowId;

// ---------------------------------------------------------------------------
// ChangeEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row-level change.
///
/// Subscribers must not rely on anything beyond "a row of this table in this
/// scope changed": consumers always re-fetch rather than patch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Table the row lives in, e.g. `"rules"`.
    pub table: String,

    pub kind: ChangeKind,

    pub row_id: RowId,

    /// Club/team the row belongs to, used for filter matching.
    pub scope: RowScope,

    /// Optional snapshot of the new row (absent for deletes).
    pub record: Option<serde_json::Value>,

    /// When the change was published (UTC).
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: impl Into<String>, kind: ChangeKind, row_id: RowId, scope: RowScope) -> Self {
        Self {
            table: table.into(),
            kind,
            row_id,
            scope,
            record: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a snapshot of the changed row.
    pub fn with_record(mut self, record: serde_json::Value) -> Self {
        self.record = Some(record);
        self
    }

    /// Whether the change concerns a subscription with `filter`.
    pub fn matches(&self, filter: &FeedFilter) -> bool {
        filter.matches(&self.table, &self.scope)
    }
}

// ---------------------------------------------------------------------------
// ChangeBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out change bus.
///
/// ```rust
/// use touchline_events::{ChangeBus, ChangeEvent, ChangeKind};
/// use touchline_core::feed::RowScope;
///
/// let bus = ChangeBus::default();
/// let mut rx = bus.subscribe();
///
/// let scope = RowScope { club_id: uuid::Uuid::nil(), team_id: None };
/// bus.publish(ChangeEvent::new("rules", ChangeKind::Insert, uuid::Uuid::nil(), scope));
/// ```
pub struct ChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a change to all current subscribers.
    ///
    /// Without subscribers the event is dropped.
    pub fn publish(&self, event: ChangeEvent) {
        tracing::trace!(table = %event.table, kind = ?event.kind, row_id = %event.row_id, "Publishing change");
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
