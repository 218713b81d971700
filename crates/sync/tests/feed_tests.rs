//! Integration tests for feed subscriptions against the in-memory store.
//!
//! Time is paused in every test, so backoff delays are asserted exactly.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use tokio::time::Instant;
use touchline_core::feed::FeedFilter;
use touchline_core::models::{Rule, RuleCategory, RulePatch};
use touchline_core::types::RowId;
use touchline_sync::{
    ChannelSignal, FeedSlot, Faults, MemoryTable, ResilientSubscription, RowCommand,
    RowWriter, SubscriptionStatus, SyncConfig, SyncError,
};
use uuid::Uuid;

fn club_rule(club: RowId, content: &str) -> Rule {
    Rule::new(club, None, RuleCategory::General, content)
}

async fn wait_for_status(
    sub: &ResilientSubscription<Rule>,
    predicate: impl FnMut(&SubscriptionStatus) -> bool,
) {
    sub.watch_status()
        .wait_for(predicate)
        .await
        .expect("status sender lives as long as the subscription");
}

fn secs_since(start: Instant, calls: &[Instant]) -> Vec<u64> {
    calls.iter().map(|t| (*t - start).as_secs()).collect()
}

// ---------------------------------------------------------------------------
// Test: channel failures
// ---------------------------------------------------------------------------

/// A channel error followed by failing resubscribes retries after 1 s, 2 s
/// and 3 s, then leaves the feed unsubscribed.
#[tokio::test(start_paused = true)]
async fn channel_error_retries_three_times_then_unsubscribes() {
    let club = Uuid::new_v4();
    let table = Arc::new(MemoryTable::<Rule>::default());
    let sub = ResilientSubscription::mount(table.clone(), FeedFilter::club_rules(club), SyncConfig::default());
    wait_for_status(&sub, |s| *s == SubscriptionStatus::Subscribed).await;

    table
        .set_faults(Faults {
            failing_subscribes: 10,
            ..Default::default()
        })
        .await;
    let failed_at = Instant::now();
    table.inject_signal(ChannelSignal::Errored("CHANNEL_ERROR".into())).await;

    wait_for_status(&sub, |s| *s == SubscriptionStatus::Unsubscribed).await;

    let log = table.call_log().await;
    assert_eq!(log.subscribes.len(), 4);
    assert_eq!(secs_since(failed_at, &log.subscribes[1..]), vec![1, 3, 6]);
    assert!(sub.is_finished());
}

/// A successful reconnect re-fetches, picking up changes missed while the
/// channel was down, and resets the attempt counter.
#[tokio::test(start_paused = true)]
async fn reconnect_refreshes_and_resets_attempts() {
    let club = Uuid::new_v4();
    let table = Arc::new(MemoryTable::<Rule>::default());
    table.seed([club_rule(club, "Warm up together")]).await;
    let sub = ResilientSubscription::mount(table.clone(), FeedFilter::club_rules(club), SyncConfig::default());
    wait_for_status(&sub, |s| *s == SubscriptionStatus::Subscribed).await;

    table
        .set_faults(Faults {
            failing_subscribes: 1,
            ..Default::default()
        })
        .await;
    let first_failure = Instant::now();
    table.inject_signal(ChannelSignal::TimedOut).await;
    wait_for_status(&sub, |s| matches!(s, SubscriptionStatus::Erroring { .. })).await;

    // Written while no channel is open: no notification reaches the feed.
    table.insert(club_rule(club, "Phones off in the changing room")).await.unwrap();
    let mut revision = sub.watch_revision();
    revision.borrow_and_update();

    wait_for_status(&sub, |s| *s == SubscriptionStatus::Subscribed).await;
    revision.changed().await.unwrap();
    assert_eq!(sub.rows().await.len(), 2);

    let log = table.call_log().await;
    assert_eq!(secs_since(first_failure, &log.subscribes[1..]), vec![1, 3]);

    let second_failure = Instant::now();
    table.inject_signal(ChannelSignal::Closed).await;
    wait_for_status(&sub, |s| *s == SubscriptionStatus::Erroring { attempt: 1 }).await;
    wait_for_status(&sub, |s| *s == SubscriptionStatus::Subscribed).await;

    let log = table.call_log().await;
    let last = *log.subscribes.last().unwrap();
    assert_eq!((last - second_failure).as_secs(), 1);
    sub.close().await;
}

// ---------------------------------------------------------------------------
// Test: refresh retries
// ---------------------------------------------------------------------------

/// A refresh that keeps failing is retried after 1 s and 2 s and then
/// succeeds.
#[tokio::test(start_paused = true)]
async fn failed_refresh_is_retried_with_backoff() {
    let club = Uuid::new_v4();
    let table = Arc::new(MemoryTable::<Rule>::default());
    let sub = ResilientSubscription::mount(table.clone(), FeedFilter::club_rules(club), SyncConfig::default());
    wait_for_status(&sub, |s| *s == SubscriptionStatus::Subscribed).await;

    table
        .set_faults(Faults {
            failing_fetches: 2,
            ..Default::default()
        })
        .await;
    let mut revision = sub.watch_revision();
    revision.borrow_and_update();
    let changed_at = Instant::now();
    table.insert(club_rule(club, "Hydrate at every break")).await.unwrap();

    revision.changed().await.unwrap();
    assert_eq!(sub.rows().await.len(), 1);

    let log = table.call_log().await;
    assert_eq!(secs_since(changed_at, &log.fetches[1..]), vec![0, 1, 3]);
    sub.close().await;
}

/// Fetches slower than the read timeout are abandoned after the retries;
/// the feed stops loading and still opens its channel.
#[tokio::test(start_paused = true)]
async fn slow_initial_fetch_times_out() {
    let club = Uuid::new_v4();
    let table = Arc::new(MemoryTable::<Rule>::default());
    table.seed([club_rule(club, "unreachable")]).await;
    table
        .set_faults(Faults {
            fetch_delay: Some(Duration::from_secs(30)),
            ..Default::default()
        })
        .await;

    let start = Instant::now();
    let sub = ResilientSubscription::mount(table.clone(), FeedFilter::club_rules(club), SyncConfig::default());
    wait_for_status(&sub, |s| *s == SubscriptionStatus::Subscribed).await;

    let log = table.call_log().await;
    // 5 s timeout per attempt plus 1 s, 2 s, 3 s of backoff.
    assert_eq!(secs_since(start, &log.fetches), vec![0, 6, 13, 21]);
    assert!(!sub.is_loading().await);
    assert!(sub.rows().await.is_empty());
    sub.close().await;
}

/// Changes that pile up while a refresh runs are folded into few fetches.
#[tokio::test(start_paused = true)]
async fn queued_changes_are_coalesced() {
    let club = Uuid::new_v4();
    let table = Arc::new(MemoryTable::<Rule>::default());
    let sub = ResilientSubscription::mount(table.clone(), FeedFilter::club_rules(club), SyncConfig::default());
    wait_for_status(&sub, |s| *s == SubscriptionStatus::Subscribed).await;

    table
        .set_faults(Faults {
            fetch_delay: Some(Duration::from_secs(1)),
            ..Default::default()
        })
        .await;
    for i in 0..4 {
        table.insert(club_rule(club, &format!("rule {i}"))).await.unwrap();
    }

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(sub.rows().await.len(), 4);
    let refreshes = table.call_log().await.fetches.len() - 1;
    assert!(refreshes < 4, "expected coalesced refreshes, got {refreshes}");
    sub.close().await;
}

/// A fetch still in flight when the feed is closed never touches the cache.
#[tokio::test(start_paused = true)]
async fn refresh_in_flight_at_close_is_discarded() {
    let club = Uuid::new_v4();
    let table = Arc::new(MemoryTable::<Rule>::default());
    table.seed([club_rule(club, "Arrive 30 minutes early")]).await;
    table
        .set_faults(Faults {
            fetch_delay: Some(Duration::from_secs(2)),
            ..Default::default()
        })
        .await;

    let sub = ResilientSubscription::mount(table.clone(), FeedFilter::club_rules(club), SyncConfig::default());
    let revision = sub.watch_revision();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(table.call_log().await.fetches.len(), 1);

    sub.close().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(*revision.borrow(), 0);
    assert_eq!(table.call_log().await.fetches.len(), 1);
    assert_eq!(table.live_channel_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: remounting
// ---------------------------------------------------------------------------

/// A slot whose subscription gave up opens a fresh one on remount.
#[tokio::test(start_paused = true)]
async fn remount_after_giving_up_resubscribes() {
    let club = Uuid::new_v4();
    let filter = FeedFilter::club_rules(club);
    let table = Arc::new(MemoryTable::<Rule>::default());
    let mut slot = FeedSlot::new(table.clone(), SyncConfig::default());
    slot.mount(filter).await;

    let sub = slot.current().unwrap();
    wait_for_status(sub, |s| *s == SubscriptionStatus::Subscribed).await;
    table
        .set_faults(Faults {
            failing_subscribes: 3,
            ..Default::default()
        })
        .await;
    table.inject_signal(ChannelSignal::Errored("CHANNEL_ERROR".into())).await;
    wait_for_status(sub, |s| *s == SubscriptionStatus::Unsubscribed).await;

    table.insert(club_rule(club, "Missed while unsubscribed")).await.unwrap();
    slot.mount(filter).await;
    let sub = slot.current().unwrap();
    wait_for_status(sub, |s| *s == SubscriptionStatus::Subscribed).await;

    assert_eq!(sub.rows().await.len(), 1);
    assert_eq!(table.live_channel_count().await, 1);
    assert_eq!(table.call_log().await.subscribes.len(), 5);
}

// ---------------------------------------------------------------------------
// Test: optimistic commands
// ---------------------------------------------------------------------------

/// A write slower than the write timeout fails with `Timeout` and the
/// optimistic edit is rolled back.
#[tokio::test(start_paused = true)]
async fn slow_write_times_out_and_rolls_back() {
    let club = Uuid::new_v4();
    let rule = club_rule(club, "Captain leads the warm-up");
    let table = Arc::new(MemoryTable::<Rule>::default());
    table.seed([rule.clone()]).await;
    let mut slot = FeedSlot::new(table.clone(), SyncConfig::default());
    slot.mount(FeedFilter::club_rules(club)).await;
    wait_for_status(slot.current().unwrap(), |s| *s == SubscriptionStatus::Subscribed).await;

    table
        .set_faults(Faults {
            write_delay: Some(Duration::from_secs(15)),
            ..Default::default()
        })
        .await;
    let cmd = RowCommand::Update {
        id: rule.id,
        patch: RulePatch::content("Coach leads the warm-up"),
    };
    let result = slot.run_command(&*table, cmd).await;

    assert_matches!(result, Err(SyncError::Timeout { operation: "update", .. }));
    let rows = slot.current().unwrap().rows().await;
    assert_eq!(rows[0].row.content, "Captain leads the warm-up");
    assert!(!rows[0].flags.pending);
}

/// When a write fails after a refresh brought in another client's newer
/// version of the row, the newer version stays instead of the pre-edit one.
#[tokio::test(start_paused = true)]
async fn failed_write_keeps_newer_server_row() {
    let club = Uuid::new_v4();
    let rule = club_rule(club, "A");
    let table = Arc::new(MemoryTable::<Rule>::default());
    table.seed([rule.clone()]).await;
    let sub = ResilientSubscription::mount(table.clone(), FeedFilter::club_rules(club), SyncConfig::default());
    wait_for_status(&sub, |s| *s == SubscriptionStatus::Subscribed).await;

    table
        .set_faults(Faults {
            write_delay: Some(Duration::from_secs(15)),
            ..Default::default()
        })
        .await;
    let slow_edit = sub.execute(
        &*table,
        RowCommand::Update {
            id: rule.id,
            patch: RulePatch::content("B"),
        },
    );
    let other_client = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        table.set_faults(Faults::default()).await;
        table.update(rule.id, RulePatch::content("C")).await.unwrap();
    };
    let (result, ()) = tokio::join!(slow_edit, other_client);

    assert_matches!(result, Err(SyncError::Timeout { operation: "update", .. }));
    let rows = sub.rows().await;
    assert_eq!(rows[0].row.content, "C");
    assert!(!rows[0].flags.pending);
    assert_eq!(table.snapshot().await[0].content, "C");
    sub.close().await;
}

/// A confirmed insert shows up once, with the pending flag cleared.
#[tokio::test(start_paused = true)]
async fn confirmed_insert_is_not_duplicated_by_refresh() {
    let club = Uuid::new_v4();
    let table = Arc::new(MemoryTable::<Rule>::default());
    let mut slot = FeedSlot::new(table.clone(), SyncConfig::default());
    slot.mount(FeedFilter::club_rules(club)).await;
    let sub = slot.current().unwrap();
    wait_for_status(sub, |s| *s == SubscriptionStatus::Subscribed).await;

    let rule = club_rule(club, "Clean boots on match day");
    slot.run_command(&*table, RowCommand::Insert(rule.clone())).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let rows = sub.rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id(), rule.id);
    assert!(!rows[0].flags.pending);

    assert_eq!(table.snapshot().await.len(), 1);
}
