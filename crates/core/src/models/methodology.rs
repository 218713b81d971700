//! Training methodology configuration: tactical zones, positional
//! profile and equipment for a club or team.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::feed::{RowScope, SyncRow};
use crate::payload::{EquipmentList, PositionalProfile};
use crate::types::{RowId, Timestamp};
use crate::zone::{validate_zone_collection, PitchZone};

/// A row from the `training_methodology` table.
///
/// `positional_profile` and `equipment` accept every stored shape and are
/// migrated to the current one on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMethodology {
    pub id: RowId,
    pub club_id: RowId,
    pub team_id: Option<RowId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub zones: Vec<PitchZone>,
    #[serde(default)]
    pub positional_profile: PositionalProfile,
    #[serde(default)]
    pub equipment: EquipmentList,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TrainingMethodology {
    pub fn new(club_id: RowId, team_id: Option<RowId>, title: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::now_v7(),
            club_id,
            team_id,
            title: title.into(),
            description: String::new(),
            zones: Vec::new(),
            positional_profile: PositionalProfile::default(),
            equipment: EquipmentList::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a methodology row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodologyPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub zones: Option<Vec<PitchZone>>,
    pub positional_profile: Option<PositionalProfile>,
    pub equipment: Option<EquipmentList>,
}

impl MethodologyPatch {
    /// Patch carrying a zone array emitted by the zone editor.
    pub fn zones(zones: &[PitchZone]) -> Self {
        Self {
            zones: Some(zones.to_vec()),
            ..Default::default()
        }
    }
}

impl SyncRow for TrainingMethodology {
    type Patch = MethodologyPatch;

    const TABLE: &'static str = "training_methodology";

    fn row_id(&self) -> RowId {
        self.id
    }

    fn scope(&self) -> RowScope {
        RowScope {
            club_id: self.club_id,
            team_id: self.team_id,
        }
    }

    fn apply_patch(&mut self, patch: &MethodologyPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(zones) = &patch.zones {
            self.zones = zones.clone();
        }
        if let Some(profile) = &patch.positional_profile {
            self.positional_profile = profile.clone();
        }
        if let Some(equipment) = &patch.equipment {
            self.equipment = equipment.clone();
        }
        self.updated_at = chrono::Utc::now();
    }

    /// Title must be set and the zones must satisfy the collection invariants.
    fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::Validation(
                "Methodology title must not be empty".to_string(),
            ));
        }
        validate_zone_collection(&self.zones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::{ZoneRect, ZONE_COLORS};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn legacy_row_is_migrated_on_load() {
        let id = Uuid::new_v4();
        let club = Uuid::new_v4();
        let row: TrainingMethodology = serde_json::from_value(json!({
            "id": id,
            "club_id": club,
            "team_id": null,
            "title": "4-3-3 build-up",
            "positional_profile": ["Passing", "Composure"],
            "equipment": "cones, bibs",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(row.positional_profile.names().collect::<Vec<_>>(), vec!["Passing", "Composure"]);
        assert_eq!(row.equipment.items(), &["cones", "bibs"]);
        assert!(row.zones.is_empty());

        let stored = serde_json::to_value(&row).unwrap();
        assert_eq!(stored["positional_profile"]["version"], 2);
        assert_eq!(stored["equipment"], json!(["cones", "bibs"]));
    }

    #[test]
    fn overlapping_zones_fail_validation() {
        let mut row = TrainingMethodology::new(Uuid::new_v4(), None, "Pressing");
        row.zones = vec![
            PitchZone::new("a", ZoneRect::new(0.0, 0.0, 30.0, 30.0), "A", ZONE_COLORS[0]),
            PitchZone::new("b", ZoneRect::new(20.0, 20.0, 30.0, 30.0), "B", ZONE_COLORS[1]),
        ];
        assert!(row.validate().is_err());
    }

    #[test]
    fn zones_patch_replaces_array() {
        let mut row = TrainingMethodology::new(Uuid::new_v4(), None, "Pressing");
        let zones = vec![PitchZone::new("a", ZoneRect::new(0.0, 0.0, 30.0, 30.0), "A", ZONE_COLORS[0])];
        row.apply_patch(&MethodologyPatch::zones(&zones));
        assert_eq!(row.zones, zones);
        assert!(row.validate().is_ok());
    }
}
