//! Club and team rules.
//!
//! Club rules and team rules share the `rules` table: a rule without a
//! `team_id` applies club-wide.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::feed::{RowScope, SyncRow};
use crate::types::{RowId, Timestamp};

/// Maximum length of a rule's text.
pub const MAX_RULE_CONTENT_LENGTH: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Attacking,
    Defending,
    Transition,
    SetPieces,
    General,
}

/// A row from the `rules` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RowId,
    pub club_id: RowId,
    pub team_id: Option<RowId>,
    pub category: RuleCategory,
    pub content: String,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Rule {
    /// A new rule with a fresh time-ordered id.
    pub fn new(
        club_id: RowId,
        team_id: Option<RowId>,
        category: RuleCategory,
        content: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::now_v7(),
            club_id,
            team_id,
            category,
            content: content.into(),
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_club_wide(&self) -> bool {
        self.team_id.is_none()
    }
}

/// Partial update of a rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulePatch {
    pub category: Option<RuleCategory>,
    pub content: Option<String>,
    pub sort_order: Option<i32>,
}

impl RulePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }
}

impl SyncRow for Rule {
    type Patch = RulePatch;

    const TABLE: &'static str = "rules";

    fn row_id(&self) -> RowId {
        self.id
    }

    fn scope(&self) -> RowScope {
        RowScope {
            club_id: self.club_id,
            team_id: self.team_id,
        }
    }

    fn apply_patch(&mut self, patch: &RulePatch) {
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(sort_order) = patch.sort_order {
            self.sort_order = sort_order;
        }
        self.updated_at = chrono::Utc::now();
    }

    fn validate(&self) -> Result<(), CoreError> {
        validate_rule_content(&self.content)
    }
}

/// Validate rule text: non-empty after trimming and within length limits.
pub fn validate_rule_content(content: &str) -> Result<(), CoreError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Rule content must not be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_RULE_CONTENT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Rule content exceeds maximum length of {MAX_RULE_CONTENT_LENGTH} characters"
        )));
    }
    Ok(())
}
