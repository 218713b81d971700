//! Integration tests for the agent's scripted session.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use touchline_agent::config::AgentConfig;
use touchline_agent::exercise::{self, Summary};
use touchline_sync::SyncConfig;

fn config() -> AgentConfig {
    AgentConfig {
        club_id: uuid::Uuid::new_v4(),
        team_id: uuid::Uuid::new_v4(),
        run_for: None,
        sync: SyncConfig::default(),
    }
}

/// The session applies its edits, keeps the rejected delete rolled back and
/// reports the final feed contents once shut down.
#[tokio::test(start_paused = true)]
async fn session_reports_final_feeds() {
    let config = config();
    let shutdown = CancellationToken::new();

    let stopper = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        stopper.cancel();
    });

    let summary = exercise::run(&config, shutdown).await.unwrap();

    assert_eq!(
        summary,
        Summary {
            club_rules: 2,
            team_rules: 2,
            zones: 2,
            rejected_writes: 1,
            logo_path: summary.logo_path.clone(),
        }
    );
    assert!(summary
        .logo_path
        .starts_with(&format!("club-logos/{}/", config.club_id)));
}

/// Shutting down before anything changes still returns a summary.
#[tokio::test(start_paused = true)]
async fn immediate_shutdown_still_summarizes() {
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let summary = exercise::run(&config(), shutdown).await.unwrap();
    assert_eq!(summary.club_rules, 2);
}
