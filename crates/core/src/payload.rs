//! Versioned JSON payloads stored inside methodology rows.
//!
//! Older rows store positional profiles as a bare array of attribute names
//! and equipment as one comma-separated string. The wire shapes are modelled
//! as untagged sum types and migrated once, at deserialization, into the
//! current in-memory types. Serialization always writes the current shape.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Current positional-profile format version.
pub const PROFILE_VERSION: u8 = 2;

// ---------------------------------------------------------------------------
// Positional profile
// ---------------------------------------------------------------------------

/// One attribute of a positional profile with its rank (1 = highest).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributePriority {
    pub name: String,
    pub priority: u32,
}

/// The stored v2 object shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileV2 {
    #[serde(default = "current_profile_version")]
    pub version: u8,
    #[serde(default)]
    pub attributes: Vec<AttributePriority>,
}

fn current_profile_version() -> u8 {
    PROFILE_VERSION
}

/// Every shape a positional profile has been stored in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionalProfilePayload {
    V2(ProfileV2),
    /// v1: attribute names, ranked by array order.
    V1(Vec<String>),
    Empty,
}

/// Ranked attributes of a positional profile, always in current form:
/// unique trimmed names, priorities `1..=len` in order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "PositionalProfilePayload", into = "ProfileV2")]
pub struct PositionalProfile {
    attributes: Vec<AttributePriority>,
}

impl PositionalProfile {
    /// Build a profile from names in rank order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() && !seen.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                seen.push(name.to_string());
            }
        }
        let attributes = seen
            .into_iter()
            .enumerate()
            .map(|(i, name)| AttributePriority {
                name,
                priority: i as u32 + 1,
            })
            .collect();
        Self { attributes }
    }

    /// Parse any stored shape from a JSON value.
    pub fn from_json(value: serde_json::Value) -> Result<Self, CoreError> {
        serde_json::from_value(value)
            .map_err(|e| CoreError::Validation(format!("Invalid positional profile: {e}")))
    }

    pub fn attributes(&self) -> &[AttributePriority] {
        &self.attributes
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl From<PositionalProfilePayload> for PositionalProfile {
    fn from(payload: PositionalProfilePayload) -> Self {
        match payload {
            PositionalProfilePayload::V1(names) => Self::from_names(names),
            PositionalProfilePayload::V2(mut v2) => {
                // Stable sort keeps stored order among equal priorities.
                v2.attributes.sort_by_key(|a| a.priority);
                Self::from_names(v2.attributes.into_iter().map(|a| a.name))
            }
            PositionalProfilePayload::Empty => Self::default(),
        }
    }
}

impl From<PositionalProfile> for ProfileV2 {
    fn from(profile: PositionalProfile) -> Self {
        Self {
            version: PROFILE_VERSION,
            attributes: profile.attributes,
        }
    }
}

// ---------------------------------------------------------------------------
// Equipment
// ---------------------------------------------------------------------------

/// Every shape an equipment list has been stored in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EquipmentPayload {
    List(Vec<String>),
    /// Legacy: `"cones, bibs, balls"`.
    Legacy(String),
    Empty,
}

/// Equipment needed for a training methodology.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "EquipmentPayload", into = "Vec<String>")]
pub struct EquipmentList(Vec<String>);

impl EquipmentList {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list: Vec<String> = Vec::new();
        for item in items {
            let item = item.as_ref().trim();
            if !item.is_empty() && !list.iter().any(|s| s == item) {
                list.push(item.to_string());
            }
        }
        Self(list)
    }

    pub fn items(&self) -> &[String] {
        &self.0
    }
}

impl From<EquipmentPayload> for EquipmentList {
    fn from(payload: EquipmentPayload) -> Self {
        match payload {
            EquipmentPayload::List(items) => Self::new(items),
            EquipmentPayload::Legacy(joined) => Self::new(joined.split(',')),
            EquipmentPayload::Empty => Self::default(),
        }
    }
}

impl From<EquipmentList> for Vec<String> {
    fn from(list: EquipmentList) -> Self {
        list.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn v1_array_migrates_to_ranked_profile() {
        let profile: PositionalProfile =
            serde_json::from_value(json!(["Passing", " Vision ", "", "passing", "Pace"])).unwrap();
        let names: Vec<_> = profile.names().collect();
        assert_eq!(names, vec!["Passing", "Vision", "Pace"]);
        let priorities: Vec<_> = profile.attributes().iter().map(|a| a.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3]);
    }

    #[test]
    fn v2_object_is_sorted_and_renumbered() {
        let profile: PositionalProfile = serde_json::from_value(json!({
            "version": 2,
            "attributes": [
                {"name": "Pace", "priority": 7},
                {"name": "Tackling", "priority": 2}
            ]
        }))
        .unwrap();
        assert_eq!(
            profile.attributes(),
            &[
                AttributePriority { name: "Tackling".into(), priority: 1 },
                AttributePriority { name: "Pace".into(), priority: 2 },
            ]
        );
    }

    #[test]
    fn profile_serializes_as_v2() {
        let profile = PositionalProfile::from_names(["Heading"]);
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(
            value,
            json!({"version": 2, "attributes": [{"name": "Heading", "priority": 1}]})
        );
    }

    #[test]
    fn null_profile_is_empty() {
        let profile: PositionalProfile = serde_json::from_value(json!(null)).unwrap();
        assert!(profile.is_empty());
    }

    #[test]
    fn invalid_profile_shape_rejected() {
        let err = PositionalProfile::from_json(json!(42)).unwrap_err();
        assert!(err.to_string().contains("Invalid positional profile"));
    }

    #[test]
    fn legacy_equipment_string_is_split() {
        let list: EquipmentList = serde_json::from_value(json!("cones, bibs,, balls ,cones")).unwrap();
        assert_eq!(list.items(), &["cones", "bibs", "balls"]);
    }

    #[test]
    fn equipment_serializes_as_array() {
        let list = EquipmentList::new(["goals", "mannequins"]);
        assert_eq!(serde_json::to_value(&list).unwrap(), json!(["goals", "mannequins"]));
    }
}
