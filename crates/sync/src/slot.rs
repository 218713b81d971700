//! A view's handle on one feed: at most one live subscription at a time.

use std::sync::Arc;

use touchline_core::feed::{FeedFilter, SyncRow};

use crate::backend::{FeedSource, RowWriter};
use crate::command::RowCommand;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::subscription::{ResilientSubscription, SubscriptionStatus};

pub struct FeedSlot<R: SyncRow> {
    source: Arc<dyn FeedSource<R>>,
    config: SyncConfig,
    current: Option<ResilientSubscription<R>>,
}

impl<R: SyncRow> FeedSlot<R> {
    pub fn new(source: Arc<dyn FeedSource<R>>, config: SyncConfig) -> Self {
        Self {
            source,
            config,
            current: None,
        }
    }

    /// Subscribe to `filter`.
    ///
    /// A live subscription to the same filter is kept. Anything else
    /// (another filter, or a subscription that gave up) is closed first,
    /// and its channel is gone before the new one opens.
    pub async fn mount(&mut self, filter: FeedFilter) {
        let live = matches!(
            &self.current,
            Some(current) if current.filter() == filter
                && current.status() != SubscriptionStatus::Unsubscribed
                && !current.is_finished()
        );
        if live {
            return;
        }

        self.unmount().await;
        self.current = Some(ResilientSubscription::mount(
            Arc::clone(&self.source),
            filter,
            self.config.clone(),
        ));
    }

    pub async fn unmount(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.close().await;
        }
    }

    pub fn current(&self) -> Option<&ResilientSubscription<R>> {
        self.current.as_ref()
    }

    /// Run a command against the mounted subscription.
    pub async fn run_command(
        &self,
        writer: &dyn RowWriter<R>,
        command: RowCommand<R>,
    ) -> Result<(), SyncError> {
        let current = self.current.as_ref().ok_or(SyncError::NotMounted)?;
        current.execute(writer, command).await
    }
}
