//! Pitch zone geometry engine.
//!
//! Zones are axis-aligned rectangles stored in percentage space (0-100 on
//! both axes) so they are independent of the canvas resolution. This module
//! provides the overlap test, placement validation, palette assignment and
//! id generation used by the zone editor and by methodology validation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::coords::PercentPoint;
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Extent of the pitch on either axis, in percent.
pub const PITCH_EXTENT: f64 = 100.0;

/// Minimum width and height of an interactively drawn zone, in percent.
pub const MIN_ZONE_SIZE_PERCENT: f64 = 5.0;

/// Maximum length of a zone title.
pub const MAX_ZONE_TITLE_LENGTH: usize = 80;

/// Maximum length of a zone description.
pub const MAX_ZONE_DESCRIPTION_LENGTH: usize = 1000;

// `validator` length bounds are u64; aliases of the usize limits above.
const MAX_ZONE_TITLE_LENGTH_U64: u64 = MAX_ZONE_TITLE_LENGTH as u64;
const MAX_ZONE_DESCRIPTION_LENGTH_U64: u64 = MAX_ZONE_DESCRIPTION_LENGTH as u64;

/// The fixed zone palette, in assignment order.
pub const ZONE_COLORS: [&str; 8] = [
    "rgba(239, 68, 68, 0.35)",
    "rgba(59, 130, 246, 0.35)",
    "rgba(34, 197, 94, 0.35)",
    "rgba(234, 179, 8, 0.35)",
    "rgba(168, 85, 247, 0.35)",
    "rgba(249, 115, 22, 0.35)",
    "rgba(236, 72, 153, 0.35)",
    "rgba(20, 184, 166, 0.35)",
];

const ZONE_ID_PREFIX: &str = "zone";

/// Length of the random part of a generated zone id.
const ZONE_ID_SUFFIX_LEN: usize = 9;

// ---------------------------------------------------------------------------
// ZoneRect
// ---------------------------------------------------------------------------

/// A bare rectangle in percentage space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ZoneRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build the rectangle spanned by two drag corners.
    ///
    /// Both corners are clamped to the pitch first, so the result always
    /// has non-negative extents and lies inside the pitch whichever
    /// direction the pointer was dragged.
    pub fn from_corners(a: PercentPoint, b: PercentPoint) -> Self {
        let a = a.clamped();
        let b = b.clamped();
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Axis-aligned overlap test. Rectangles that only share an edge do
    /// not overlap.
    pub fn overlaps(&self, other: &ZoneRect) -> bool {
        let separated = self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y;
        !separated
    }

    /// Whether a point lies inside the rectangle (edges inclusive).
    pub fn contains(&self, point: PercentPoint) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Whether both extents reach [`MIN_ZONE_SIZE_PERCENT`].
    pub fn meets_minimum_size(&self) -> bool {
        self.width >= MIN_ZONE_SIZE_PERCENT && self.height >= MIN_ZONE_SIZE_PERCENT
    }

    /// Move the rectangle so that its top-left corner is `(x, y)`, clamped
    /// to `[0, 100 - width] x [0, 100 - height]`.
    pub fn moved_to(&self, x: f64, y: f64) -> Self {
        let max_x = (PITCH_EXTENT - self.width).max(0.0);
        let max_y = (PITCH_EXTENT - self.height).max(0.0);
        Self {
            x: x.clamp(0.0, max_x),
            y: y.clamp(0.0, max_y),
            ..*self
        }
    }

    /// Whether the rectangle lies fully inside the pitch.
    pub fn within_pitch(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= PITCH_EXTENT
            && self.bottom() <= PITCH_EXTENT
    }
}

// ---------------------------------------------------------------------------
// PitchZone
// ---------------------------------------------------------------------------

/// A coach-authored rectangular region of interest on a pitch diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchZone {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub color: String,
}

impl PitchZone {
    /// Create a zone occupying `rect`.
    pub fn new(id: impl Into<String>, rect: ZoneRect, title: impl Into<String>, color: &str) -> Self {
        Self {
            id: id.into(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            title: title.into(),
            description: String::new(),
            color: color.to_string(),
        }
    }

    pub fn rect(&self) -> ZoneRect {
        ZoneRect::new(self.x, self.y, self.width, self.height)
    }

    /// Set the position from a rectangle, keeping identity and metadata.
    pub fn set_position(&mut self, rect: ZoneRect) {
        self.x = rect.x;
        self.y = rect.y;
    }
}

/// Whether two zones overlap. Zones sharing an edge exactly do not.
pub fn zones_overlap(a: &PitchZone, b: &PitchZone) -> bool {
    a.rect().overlaps(&b.rect())
}

/// Whether `rect` can be placed among `existing` without overlapping any
/// zone other than the one identified by `ignore_id`.
pub fn can_place_rect(rect: &ZoneRect, ignore_id: Option<&str>, existing: &[PitchZone]) -> bool {
    existing
        .iter()
        .filter(|zone| ignore_id != Some(zone.id.as_str()))
        .all(|zone| !rect.overlaps(&zone.rect()))
}

/// Whether `candidate` overlaps no zone in `existing`, ignoring a zone that
/// shares its id (so a zone never conflicts with its own previous state).
pub fn can_place_zone(candidate: &PitchZone, existing: &[PitchZone]) -> bool {
    can_place_rect(&candidate.rect(), Some(&candidate.id), existing)
}

/// Pick the color for a new zone.
///
/// Returns the first palette color not used by `existing`. When all eight
/// are taken it wraps to `ZONE_COLORS[existing.len() % 8]`, so colors repeat
/// once more than eight zones coexist.
pub fn next_zone_color(existing: &[PitchZone]) -> &'static str {
    ZONE_COLORS
        .iter()
        .find(|color| !existing.iter().any(|zone| zone.color == **color))
        .copied()
        .unwrap_or(ZONE_COLORS[existing.len() % ZONE_COLORS.len()])
}

/// Whether a color string belongs to the zone palette.
pub fn is_palette_color(color: &str) -> bool {
    ZONE_COLORS.contains(&color)
}

/// Generate a zone id: `zone-<unix millis>-<9 random chars>`.
///
/// Unique with overwhelming probability but not guaranteed; use
/// [`generate_unique_zone_id`] when a collection is at hand.
pub fn generate_zone_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(ZONE_ID_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{ZONE_ID_PREFIX}-{millis}-{suffix}")
}

/// Generate a zone id that does not collide with any id in `existing`.
pub fn generate_unique_zone_id(existing: &[PitchZone]) -> String {
    loop {
        let id = generate_zone_id();
        if !existing.iter().any(|zone| zone.id == id) {
            return id;
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a single stored zone: finite coordinates, positive extents,
/// inside the pitch, non-empty title.
pub fn validate_zone(zone: &PitchZone) -> Result<(), CoreError> {
    let rect = zone.rect();
    let finite = [rect.x, rect.y, rect.width, rect.height]
        .iter()
        .all(|v| v.is_finite());
    if !finite {
        return Err(CoreError::Validation(format!(
            "Zone '{}' has non-finite coordinates",
            zone.id
        )));
    }
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Err(CoreError::Validation(format!(
            "Zone '{}' must have a positive width and height",
            zone.id
        )));
    }
    if !rect.within_pitch() {
        return Err(CoreError::Validation(format!(
            "Zone '{}' extends outside the pitch",
            zone.id
        )));
    }
    if zone.title.trim().is_empty() {
        return Err(CoreError::Validation(format!(
            "Zone '{}' must have a title",
            zone.id
        )));
    }
    Ok(())
}

/// Validate a whole zone collection: every zone valid, ids unique, no
/// two zones overlapping.
pub fn validate_zone_collection(zones: &[PitchZone]) -> Result<(), CoreError> {
    for (i, zone) in zones.iter().enumerate() {
        validate_zone(zone)?;
        for other in &zones[i + 1..] {
            if zone.id == other.id {
                return Err(CoreError::Conflict(format!(
                    "Duplicate zone id '{}'",
                    zone.id
                )));
            }
            if zones_overlap(zone, other) {
                return Err(CoreError::Conflict(format!(
                    "Zones '{}' and '{}' overlap",
                    zone.id, other.id
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Edit form
// ---------------------------------------------------------------------------

/// Editable metadata of a zone, as shown in the edit modal.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ZoneForm {
    #[validate(length(min = 1, max = MAX_ZONE_TITLE_LENGTH_U64))]
    pub title: String,
    #[validate(length(max = MAX_ZONE_DESCRIPTION_LENGTH_U64))]
    pub description: String,
    pub color: String,
}

impl ZoneForm {
    pub fn from_zone(zone: &PitchZone) -> Self {
        Self {
            title: zone.title.clone(),
            description: zone.description.clone(),
            color: zone.color.clone(),
        }
    }

    /// Check the form before it is applied to a zone.
    pub fn check(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::Validation("Zone title must not be empty".into()));
        }
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        if !is_palette_color(&self.color) {
            return Err(CoreError::Validation(format!(
                "Color '{}' is not part of the zone palette",
                self.color
            )));
        }
        Ok(())
    }

    /// Write the form's values into `zone` (title trimmed).
    pub fn apply_to(&self, zone: &mut PitchZone) {
        zone.title = self.title.trim().to_string();
        zone.description = self.description.clone();
        zone.color = self.color.clone();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
