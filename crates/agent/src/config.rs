use std::time::Duration;

use anyhow::{bail, Context};
use touchline_core::types::RowId;
use touchline_sync::SyncConfig;

/// Agent settings.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub club_id: RowId,
    pub team_id: RowId,
    /// Stop after this long; `None` runs until Ctrl-C.
    pub run_for: Option<Duration>,
    pub sync: SyncConfig,
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var          | Default             |
    /// |------------------|---------------------|
    /// | `CLUB_ID`        | random UUID         |
    /// | `TEAM_ID`        | random UUID         |
    /// | `AGENT_RUN_SECS` | unset (until Ctrl-C)|
    ///
    /// Sync timeouts and retries come from [`SyncConfig::from_env`].
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), SyncConfig::from_env())
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        sync: SyncConfig,
    ) -> anyhow::Result<Self> {
        let run_for = match lookup("AGENT_RUN_SECS") {
            None => None,
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("AGENT_RUN_SECS must be a whole number, got '{raw}'"))?;
                if secs == 0 {
                    bail!("AGENT_RUN_SECS must be greater than zero");
                }
                Some(Duration::from_secs(secs))
            }
        };

        Ok(Self {
            club_id: id_or_random(&lookup, "CLUB_ID")?,
            team_id: id_or_random(&lookup, "TEAM_ID")?,
            run_for,
            sync,
        })
    }
}

fn id_or_random(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<RowId> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a UUID, got '{raw}'")),
        None => {
            let id = uuid::Uuid::new_v4();
            tracing::info!(key, %id, "No id configured, using a random one");
            Ok(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<AgentConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AgentConfig::from_lookup(move |key: &str| map.get(key).cloned(), SyncConfig::default())
    }

    #[test]
    fn ids_are_parsed() {
        let club = uuid::Uuid::new_v4();
        let club_str = club.to_string();
        let config = load(&[("CLUB_ID", club_str.as_str()), ("AGENT_RUN_SECS", "30")]).unwrap();
        assert_eq!(config.club_id, club);
        assert_eq!(config.run_for, Some(Duration::from_secs(30)));
    }

    #[test]
    fn missing_values_use_defaults() {
        let config = load(&[]).unwrap();
        assert_ne!(config.club_id, config.team_id);
        assert_eq!(config.run_for, None);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(load(&[("TEAM_ID", "team-7")]).is_err());
        assert!(load(&[("AGENT_RUN_SECS", "soon")]).is_err());
        assert!(load(&[("AGENT_RUN_SECS", "0")]).is_err());
    }
}
