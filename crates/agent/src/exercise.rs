//! The agent's scripted coaching session.
//!
//! Seeds a club, mounts the club-rules, team-rules and methodology feeds,
//! applies a handful of optimistic edits (one of them made to fail), draws
//! a tactical zone through the zone editor and uploads a club logo. Then it
//! logs every feed change until `shutdown` fires.

use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use touchline_core::coords::{CanvasSize, PixelPoint};
use touchline_core::feed::{FeedFilter, SyncRow};
use touchline_core::media::MediaKind;
use touchline_core::models::{
    MethodologyPatch, Rule, RuleCategory, RulePatch, TrainingMethodology,
};
use touchline_core::zone::{generate_unique_zone_id, next_zone_color, PitchZone, ZoneRect};
use touchline_core::zone_editor::{GestureOutcome, ZoneEditor};
use touchline_events::ChangeBus;
use touchline_sync::media::upload_image;
use touchline_sync::{
    FeedSlot, Faults, LocalRow, MemoryFileStore, MemoryTable, ResilientSubscription, RowCommand,
    SubscriptionStatus,
};

use crate::config::AgentConfig;

/// Canvas the zone editor is driven on, in pixels.
const CANVAS_PX: f64 = 800.0;

/// What the feeds showed when the agent stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub club_rules: usize,
    pub team_rules: usize,
    pub zones: usize,
    pub rejected_writes: usize,
    pub logo_path: String,
}

pub async fn run(config: &AgentConfig, shutdown: CancellationToken) -> anyhow::Result<Summary> {
    let bus = Arc::new(ChangeBus::default());
    let rules = Arc::new(MemoryTable::<Rule>::new(Arc::clone(&bus)));
    let methodologies = Arc::new(MemoryTable::<TrainingMethodology>::new(Arc::clone(&bus)));
    let files = MemoryFileStore::new();

    seed(config, &rules, &methodologies).await;

    let mut club_rules = FeedSlot::new(rules.clone(), config.sync.clone());
    let mut team_rules = FeedSlot::new(rules.clone(), config.sync.clone());
    let mut methodology = FeedSlot::new(methodologies.clone(), config.sync.clone());
    club_rules.mount(FeedFilter::club_rules(config.club_id)).await;
    team_rules.mount(FeedFilter::team_rules(config.team_id)).await;
    methodology.mount(FeedFilter::team_methodology(config.team_id)).await;

    let club_sub = mounted(&club_rules)?;
    let team_sub = mounted(&team_rules)?;
    let methodology_sub = mounted(&methodology)?;
    await_subscribed(club_sub).await?;
    await_subscribed(team_sub).await?;
    await_subscribed(methodology_sub).await?;

    // ---- rules ----

    let scanning = Rule::new(
        config.club_id,
        Some(config.team_id),
        RuleCategory::Attacking,
        "Scan before receiving",
    );
    let scanning_id = scanning.id;
    team_rules
        .run_command(&*rules, RowCommand::Insert(scanning))
        .await
        .context("inserting team rule")?;

    if let Some(first) = club_sub.rows().await.first() {
        let id = first.id();
        club_sub.set_editing(id, true).await;
        club_rules
            .run_command(
                &*rules,
                RowCommand::Update {
                    id,
                    patch: RulePatch::content("Arrive 20 minutes before kickoff"),
                },
            )
            .await
            .context("editing club rule")?;
        club_sub.set_editing(id, false).await;
    }

    // A delete the store refuses is rolled back locally.
    let mut rejected_writes = 0;
    rules
        .set_faults(Faults {
            failing_writes: 1,
            ..Default::default()
        })
        .await;
    if let Err(e) = team_rules
        .run_command(&*rules, RowCommand::Delete(scanning_id))
        .await
    {
        rejected_writes += 1;
        tracing::warn!(error = %e, "Delete rejected, team rule restored");
    }

    // ---- zones ----

    if let Some(plan) = methodology_sub.rows().await.first() {
        let zones = draw_pressing_zone(plan.row.zones.clone())?;
        methodology
            .run_command(
                &*methodologies,
                RowCommand::Update {
                    id: plan.id(),
                    patch: MethodologyPatch::zones(&zones),
                },
            )
            .await
            .context("saving zones")?;
    }

    // ---- media ----

    let logo_path = upload_image(
        &files,
        MediaKind::ClubLogo,
        config.club_id,
        "crest.png",
        vec![0x89, b'P', b'N', b'G'],
        &config.sync,
    )
    .await
    .context("uploading club logo")?;

    // ---- watch ----

    let mut club_rev = club_sub.watch_revision();
    let mut team_rev = team_sub.watch_revision();
    let mut methodology_rev = methodology_sub.watch_revision();
    log_rules("club_rules", &club_sub.rows().await);
    log_rules("team_rules", &team_sub.rows().await);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            Ok(()) = club_rev.changed() => log_rules("club_rules", &club_sub.rows().await),
            Ok(()) = team_rev.changed() => log_rules("team_rules", &team_sub.rows().await),
            Ok(()) = methodology_rev.changed() => {
                for plan in methodology_sub.rows().await {
                    tracing::info!(feed = "methodology", title = %plan.row.title, zones = plan.row.zones.len(), "Feed updated");
                }
            }
        }
    }

    let summary = Summary {
        club_rules: club_sub.rows().await.len(),
        team_rules: team_sub.rows().await.len(),
        zones: methodology_sub
            .rows()
            .await
            .iter()
            .map(|plan| plan.row.zones.len())
            .sum(),
        rejected_writes,
        logo_path,
    };

    club_rules.unmount().await;
    team_rules.unmount().await;
    methodology.unmount().await;
    Ok(summary)
}

async fn seed(
    config: &AgentConfig,
    rules: &MemoryTable<Rule>,
    methodologies: &MemoryTable<TrainingMethodology>,
) {
    let club = config.club_id;
    let team = config.team_id;
    rules
        .seed([
            Rule::new(club, None, RuleCategory::General, "Arrive 15 minutes before kickoff"),
            Rule::new(club, None, RuleCategory::General, "Respect officials and opponents"),
            Rule::new(club, Some(team), RuleCategory::Defending, "Press as a unit after losing the ball"),
        ])
        .await;

    let mut plan = TrainingMethodology::new(club, Some(team), "Build-up play");
    let defensive_third = PitchZone::new(
        generate_unique_zone_id(&plan.zones),
        ZoneRect::new(0.0, 70.0, 100.0, 30.0),
        "Defensive third",
        next_zone_color(&plan.zones),
    );
    plan.zones.push(defensive_third);
    methodologies.seed([plan]).await;
}

fn mounted<R: SyncRow>(slot: &FeedSlot<R>) -> anyhow::Result<&ResilientSubscription<R>> {
    slot.current().context("feed slot has no subscription")
}

async fn await_subscribed<R: SyncRow>(sub: &ResilientSubscription<R>) -> anyhow::Result<()> {
    let mut status = sub.watch_status();
    let settled = *status
        .wait_for(|s| matches!(s, SubscriptionStatus::Subscribed | SubscriptionStatus::Unsubscribed))
        .await
        .context("subscription dropped")?;
    if settled != SubscriptionStatus::Subscribed {
        bail!("feed {} could not subscribe", sub.filter());
    }
    Ok(())
}

/// Drag out a new zone on the editor canvas and name it, returning the
/// zone array the editor emitted.
fn draw_pressing_zone(zones: Vec<PitchZone>) -> anyhow::Result<Vec<PitchZone>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let canvas = CanvasSize::new(CANVAS_PX, CANVAS_PX)?;
    let mut editor = ZoneEditor::new(zones, canvas, false).with_on_change(move |zones| {
        let _ = tx.send(zones.to_vec());
    });

    editor.pointer_down(PixelPoint::new(100.0, 100.0));
    editor.pointer_move(PixelPoint::new(300.0, 250.0));
    let id = match editor.pointer_up(PixelPoint::new(300.0, 250.0)) {
        GestureOutcome::ZoneCreated { id } => id,
        other => bail!("zone was not created: {other:?}"),
    };

    editor.edit_form(|form| {
        form.title = "Pressing trap".into();
        form.description = "Force play wide, then close the touchline".into();
    });
    editor.save()?;
    tracing::info!(zone_id = %id, "Zone drawn");

    let mut latest = None;
    while let Ok(zones) = rx.try_recv() {
        latest = Some(zones);
    }
    latest.context("zone editor emitted no changes")
}

fn log_rules(feed: &'static str, rows: &[LocalRow<Rule>]) {
    let contents: Vec<&str> = rows.iter().map(|l| l.row.content.as_str()).collect();
    tracing::info!(feed, count = rows.len(), rules = ?contents, "Feed updated");
}
