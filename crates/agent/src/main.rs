//! `touchline-agent` -- exercises the realtime sync discipline end to end.
//!
//! Runs a scripted coaching session against the in-memory store and logs
//! every feed change until Ctrl-C or until `AGENT_RUN_SECS` elapse.
//!
//! # Environment variables
//!
//! | Variable                | Required | Default | Description                          |
//! |-------------------------|----------|---------|--------------------------------------|
//! | `CLUB_ID`               | no       | random  | Club whose feeds are mounted         |
//! | `TEAM_ID`               | no       | random  | Team whose feeds are mounted         |
//! | `AGENT_RUN_SECS`        | no       | --      | Stop after this many seconds         |
//! | `SYNC_READ_TIMEOUT_MS`  | no       | `5000`  | Timeout for fetches and subscribes   |
//! | `SYNC_WRITE_TIMEOUT_MS` | no       | `10000` | Timeout for writes and uploads       |
//! | `SYNC_RETRY_BASE_MS`    | no       | `1000`  | Linear backoff base delay            |
//! | `SYNC_MAX_RETRIES`      | no       | `3`     | Retries before giving up             |

use tokio_util::sync::CancellationToken;
use touchline_agent::config::AgentConfig;
use touchline_agent::exercise;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "touchline_agent=info,touchline_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %format!("{e:#}"), "Invalid agent configuration");
        std::process::exit(1);
    });

    tracing::info!(
        club_id = %config.club_id,
        team_id = %config.team_id,
        run_secs = config.run_for.map(|d| d.as_secs()),
        "Starting touchline-agent",
    );

    let shutdown = CancellationToken::new();

    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down");
        }
        on_signal.cancel();
    });

    if let Some(run_for) = config.run_for {
        let on_timer = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(run_for).await;
            tracing::info!(secs = run_for.as_secs(), "Run time elapsed, shutting down");
            on_timer.cancel();
        });
    }

    match exercise::run(&config, shutdown).await {
        Ok(summary) => tracing::info!(
            club_rules = summary.club_rules,
            team_rules = summary.team_rules,
            zones = summary.zones,
            rejected_writes = summary.rejected_writes,
            logo = %summary.logo_path,
            "Session finished",
        ),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Session failed");
            std::process::exit(1);
        }
    }
}
