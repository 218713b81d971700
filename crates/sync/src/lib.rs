//! Realtime sync discipline for Touchline feeds.
//!
//! A view mounts a [`ResilientSubscription`] for a [`FeedFilter`]: the
//! subscription fetches the filtered collection, opens a change channel
//! for the same filter, re-fetches on every change and reconciles the
//! result with client-only row flags. Failed fetches and broken channels
//! are retried with bounded linear backoff ([`retry`]). User edits go
//! through optimistic [`RowCommand`]s that roll back on failure.
//!
//! The store is reached only through the traits in [`backend`];
//! [`memory`] provides an in-process implementation.
//!
//! [`FeedFilter`]: touchline_core::feed::FeedFilter

pub mod backend;
pub mod command;
pub mod config;
pub mod error;
pub mod media;
pub mod memory;
pub mod reconcile;
pub mod retry;
pub mod slot;
pub mod subscription;

pub use backend::{ChangeChannel, ChannelSignal, FeedSource, FileStore, RowWriter};
pub use command::RowCommand;
pub use config::SyncConfig;
pub use error::{BackendError, SyncError};
pub use memory::{CallLog, Faults, MemoryFileStore, MemoryTable};
pub use reconcile::{LocalRow, RowFlags};
pub use slot::FeedSlot;
pub use subscription::{ResilientSubscription, SubscriptionStatus};
