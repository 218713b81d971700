//! Individual Development Plans (IDPs).
//!
//! An IDP is a per-player ranked list of development-focus attributes,
//! capped at [`MAX_FOCUS_ATTRIBUTES`]. Ranks are always `1..=len`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{RowId, Timestamp};

/// Maximum number of focus attributes in one plan.
pub const MAX_FOCUS_ATTRIBUTES: usize = 3;

/// Maximum length of a focus attribute name.
pub const MAX_ATTRIBUTE_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusAttribute {
    pub attribute: String,
    pub rank: u8,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevelopmentPlan {
    pub id: RowId,
    pub player_id: RowId,
    #[serde(default)]
    pub focus: Vec<FocusAttribute>,
    pub updated_at: Timestamp,
}

impl DevelopmentPlan {
    pub fn new(id: RowId, player_id: RowId) -> Self {
        Self {
            id,
            player_id,
            focus: Vec::new(),
            updated_at: chrono::Utc::now(),
        }
    }

    /// Append a focus attribute at the lowest rank.
    pub fn add_focus(&mut self, attribute: &str, notes: &str) -> Result<(), CoreError> {
        let attribute = validate_attribute_name(attribute)?;
        if self.focus.len() >= MAX_FOCUS_ATTRIBUTES {
            return Err(CoreError::Validation(format!(
                "A development plan holds at most {MAX_FOCUS_ATTRIBUTES} focus attributes"
            )));
        }
        if self.position_of(&attribute).is_some() {
            return Err(CoreError::Conflict(format!(
                "'{attribute}' is already a focus attribute"
            )));
        }
        self.focus.push(FocusAttribute {
            attribute,
            rank: 0,
            notes: notes.to_string(),
        });
        self.rerank();
        Ok(())
    }

    /// Remove a focus attribute; the remaining ones close the gap.
    pub fn remove_focus(&mut self, attribute: &str) -> Result<FocusAttribute, CoreError> {
        let index = self.require(attribute)?;
        let removed = self.focus.remove(index);
        self.rerank();
        Ok(removed)
    }

    /// Move a focus attribute to `rank` (1-based), shifting the others.
    pub fn move_focus(&mut self, attribute: &str, rank: u8) -> Result<(), CoreError> {
        if rank == 0 || usize::from(rank) > self.focus.len() {
            return Err(CoreError::Validation(format!(
                "Rank must be between 1 and {}, got {rank}",
                self.focus.len()
            )));
        }
        let index = self.require(attribute)?;
        let entry = self.focus.remove(index);
        self.focus.insert(usize::from(rank) - 1, entry);
        self.rerank();
        Ok(())
    }

    /// Check a plan loaded from storage.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.focus.len() > MAX_FOCUS_ATTRIBUTES {
            return Err(CoreError::Validation(format!(
                "Plan has {} focus attributes, maximum is {MAX_FOCUS_ATTRIBUTES}",
                self.focus.len()
            )));
        }
        for (i, entry) in self.focus.iter().enumerate() {
            if usize::from(entry.rank) != i + 1 {
                return Err(CoreError::Validation(format!(
                    "Focus attribute '{}' has rank {}, expected {}",
                    entry.attribute,
                    entry.rank,
                    i + 1
                )));
            }
        }
        Ok(())
    }

    fn position_of(&self, attribute: &str) -> Option<usize> {
        self.focus
            .iter()
            .position(|f| f.attribute.eq_ignore_ascii_case(attribute.trim()))
    }

    fn require(&self, attribute: &str) -> Result<usize, CoreError> {
        self.position_of(attribute).ok_or_else(|| CoreError::NotFound {
            entity: "focus_attribute",
            id: attribute.to_string(),
        })
    }

    fn rerank(&mut self) {
        for (i, entry) in self.focus.iter_mut().enumerate() {
            entry.rank = i as u8 + 1;
        }
        self.updated_at = chrono::Utc::now();
    }
}

fn validate_attribute_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Focus attribute must not be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_ATTRIBUTE_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Focus attribute exceeds maximum length of {MAX_ATTRIBUTE_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}
