//! Realtime feeds: which collection a view subscribes to and how rows are
//! matched against a subscription filter.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::RowId;

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// A server-side collection that views can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    ClubRules,
    TeamRules,
    TrainingMethodology,
    Sessions,
}

impl Feed {
    /// Name of the backing table.
    pub fn table(self) -> &'static str {
        match self {
            Self::ClubRules | Self::TeamRules => "rules",
            Self::TrainingMethodology => "training_methodology",
            Self::Sessions => "sessions",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClubRules => "club_rules",
            Self::TeamRules => "team_rules",
            Self::TrainingMethodology => "training_methodology",
            Self::Sessions => "sessions",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Scopes
// ---------------------------------------------------------------------------

/// Where a row lives: its club and, for team-owned rows, its team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowScope {
    pub club_id: RowId,
    pub team_id: Option<RowId>,
}

/// The filter half of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Scope {
    /// Rows where `team_id = T`.
    Team(RowId),
    /// Rows where `club_id = C` and `team_id` is null.
    ClubWide(RowId),
    /// Every row of club `C`, team-owned or not.
    Club(RowId),
}

impl Scope {
    pub fn matches(&self, row: &RowScope) -> bool {
        match *self {
            Self::Team(team_id) => row.team_id == Some(team_id),
            Self::ClubWide(club_id) => row.club_id == club_id && row.team_id.is_none(),
            Self::Club(club_id) => row.club_id == club_id,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Team(id) => write!(f, "team_id=eq.{id}"),
            Self::ClubWide(id) => write!(f, "club_id=eq.{id}&team_id=is.null"),
            Self::Club(id) => write!(f, "club_id=eq.{id}"),
        }
    }
}

/// A feed narrowed to a scope; the identity of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedFilter {
    pub feed: Feed,
    pub scope: Scope,
}

impl FeedFilter {
    pub fn new(feed: Feed, scope: Scope) -> Self {
        Self { feed, scope }
    }

    pub fn club_rules(club_id: RowId) -> Self {
        Self::new(Feed::ClubRules, Scope::ClubWide(club_id))
    }

    pub fn team_rules(team_id: RowId) -> Self {
        Self::new(Feed::TeamRules, Scope::Team(team_id))
    }

    pub fn team_methodology(team_id: RowId) -> Self {
        Self::new(Feed::TrainingMethodology, Scope::Team(team_id))
    }

    pub fn team_sessions(team_id: RowId) -> Self {
        Self::new(Feed::Sessions, Scope::Team(team_id))
    }

    /// Whether a change to a row of `table` in `scope` concerns this filter.
    pub fn matches(&self, table: &str, scope: &RowScope) -> bool {
        self.feed.table() == table && self.scope.matches(scope)
    }
}

impl fmt::Display for FeedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}?{}", self.feed, self.scope)
    }
}

// ---------------------------------------------------------------------------
// SyncRow
// ---------------------------------------------------------------------------

/// A row that can be carried by a realtime feed.
pub trait SyncRow: Clone + PartialEq + Send + Sync + 'static {
    /// Partial update accepted by the row writer.
    type Patch: Clone + Send + Sync + 'static;

    /// Name of the table the row lives in.
    const TABLE: &'static str;

    fn row_id(&self) -> RowId;

    fn scope(&self) -> RowScope;

    /// Apply a patch in place.
    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Check the row before it is written.
    fn validate(&self) -> Result<(), CoreError>;
}
