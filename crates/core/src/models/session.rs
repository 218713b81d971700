//! Training sessions.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::feed::{RowScope, SyncRow};
use crate::types::{RowId, Timestamp};

/// Longest session that can be scheduled, in minutes.
pub const MAX_SESSION_MINUTES: u32 = 300;

/// A row from the `sessions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    pub id: RowId,
    pub club_id: RowId,
    pub team_id: RowId,
    pub title: String,
    pub starts_at: Timestamp,
    pub duration_minutes: u32,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TrainingSession {
    pub fn new(
        club_id: RowId,
        team_id: RowId,
        title: impl Into<String>,
        starts_at: Timestamp,
        duration_minutes: u32,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::now_v7(),
            club_id,
            team_id,
            title: title.into(),
            starts_at,
            duration_minutes,
            location: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn ends_at(&self) -> Timestamp {
        self.starts_at + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// Partial update of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPatch {
    pub title: Option<String>,
    pub starts_at: Option<Timestamp>,
    pub duration_minutes: Option<u32>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl SyncRow for TrainingSession {
    type Patch = SessionPatch;

    const TABLE: &'static str = "sessions";

    fn row_id(&self) -> RowId {
        self.id
    }

    fn scope(&self) -> RowScope {
        RowScope {
            club_id: self.club_id,
            team_id: Some(self.team_id),
        }
    }

    fn apply_patch(&mut self, patch: &SessionPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(starts_at) = patch.starts_at {
            self.starts_at = starts_at;
        }
        if let Some(duration) = patch.duration_minutes {
            self.duration_minutes = duration;
        }
        if let Some(location) = &patch.location {
            self.location = Some(location.clone());
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
        self.updated_at = chrono::Utc::now();
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::Validation(
                "Session title must not be empty".to_string(),
            ));
        }
        validate_duration(self.duration_minutes)
    }
}

/// Validate a session duration: `1..=MAX_SESSION_MINUTES`.
pub fn validate_duration(minutes: u32) -> Result<(), CoreError> {
    if minutes == 0 || minutes > MAX_SESSION_MINUTES {
        return Err(CoreError::Validation(format!(
            "Session duration must be between 1 and {MAX_SESSION_MINUTES} minutes, got {minutes}"
        )));
    }
    Ok(())
}
