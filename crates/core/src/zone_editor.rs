//! Gesture state machine of the pitch-zone drawing surface.
//!
//! [`ZoneEditor`] owns the zone collection shown on the canvas and turns
//! pointer gestures into validated mutations:
//!
//! - pointer-down on empty canvas starts drawing a candidate rectangle;
//! - pointer-up commits it if it is large enough and overlaps nothing;
//! - pointer-down on a zone either drags it (clamped, overlap-checked) or,
//!   released without moving, opens the edit modal for it;
//! - the modal saves metadata, deletes after a second confirmation, or
//!   cancels without touching the zone.
//!
//! The editor never persists anything. Every accepted change hands the
//! full zone array to the `on_change` callback; the owner persists it.

use crate::coords::{CanvasSize, PercentPoint, PixelPoint};
use crate::error::CoreError;
use crate::zone::{
    can_place_rect, generate_unique_zone_id, next_zone_color, PitchZone, ZoneForm, ZoneRect,
};

/// Callback receiving the full zone array after every accepted change.
pub type ZonesChanged = Box<dyn FnMut(&[PitchZone]) + Send>;

/// Externally visible editor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Idle,
    Drawing,
    ZoneSelected,
    EditingModalOpen,
}

/// Why a drawn candidate was not committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    TooSmall,
    Overlaps,
    Cancelled,
}

/// What a pointer gesture resulted in.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// Nothing happened (read-only mode, modal open, no active gesture).
    Ignored,
    DrawingStarted,
    CandidateUpdated { valid: bool },
    DrawingDiscarded(DiscardReason),
    /// A new zone was committed and the modal opened for it.
    ZoneCreated { id: String },
    ZonePressed { id: String },
    ZoneMoved { id: String },
    /// The requested position was rejected; the zone kept its last valid
    /// position.
    MoveRejected { id: String },
    ModalOpened { id: String },
}

/// Live preview of the rectangle being drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawingPreview {
    pub rect: ZoneRect,
    pub valid: bool,
}

/// Read-only tooltip content for a hovered zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTooltip {
    pub title: String,
    pub description: String,
}

/// Result of activating the modal's delete button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// First activation: confirmation armed, nothing deleted.
    Armed,
    Deleted,
}

/// State of the edit modal.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneModal {
    pub zone_id: String,
    pub form: ZoneForm,
    /// Whether the modal was opened right after drawing the zone.
    pub is_new: bool,
    delete_armed: bool,
}

impl ZoneModal {
    fn open(zone: &PitchZone, is_new: bool) -> Self {
        Self {
            zone_id: zone.id.clone(),
            form: ZoneForm::from_zone(zone),
            is_new,
            delete_armed: false,
        }
    }

    /// Save is disabled while the title is blank.
    pub fn can_save(&self) -> bool {
        !self.form.title.trim().is_empty()
    }

    pub fn delete_armed(&self) -> bool {
        self.delete_armed
    }
}

enum Gesture {
    None,
    Drawing {
        start: PercentPoint,
        rect: ZoneRect,
        valid: bool,
    },
    Pressing {
        zone_id: String,
        grab: PercentPoint,
        origin: ZoneRect,
        last_valid: ZoneRect,
        moved: bool,
    },
}

/// Interactive editor over one zone collection.
pub struct ZoneEditor {
    zones: Vec<PitchZone>,
    canvas: CanvasSize,
    read_only: bool,
    gesture: Gesture,
    modal: Option<ZoneModal>,
    on_change: Option<ZonesChanged>,
}

impl ZoneEditor {
    pub fn new(zones: Vec<PitchZone>, canvas: CanvasSize, read_only: bool) -> Self {
        Self {
            zones,
            canvas,
            read_only,
            gesture: Gesture::None,
            modal: None,
            on_change: None,
        }
    }

    /// Register the callback that receives the zone array on every change.
    pub fn with_on_change(mut self, on_change: impl FnMut(&[PitchZone]) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(on_change));
        self
    }

    pub fn zones(&self) -> &[PitchZone] {
        &self.zones
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn modal(&self) -> Option<&ZoneModal> {
        self.modal.as_ref()
    }

    pub fn state(&self) -> EditorState {
        if self.modal.is_some() {
            return EditorState::EditingModalOpen;
        }
        match self.gesture {
            Gesture::None => EditorState::Idle,
            Gesture::Drawing { .. } => EditorState::Drawing,
            Gesture::Pressing { .. } => EditorState::ZoneSelected,
        }
    }

    /// The candidate rectangle while drawing, with its validity indicator.
    pub fn drawing_preview(&self) -> Option<DrawingPreview> {
        match self.gesture {
            Gesture::Drawing { rect, valid, .. } => Some(DrawingPreview { rect, valid }),
            _ => None,
        }
    }

    /// The canvas was resized; stored zones are unaffected.
    pub fn set_canvas_size(&mut self, canvas: CanvasSize) {
        self.canvas = canvas;
    }

    /// Replace the collection with a server-side version.
    ///
    /// Any gesture in progress is abandoned. The modal stays open only if
    /// its zone still exists.
    pub fn replace_zones(&mut self, zones: Vec<PitchZone>) {
        self.zones = zones;
        self.gesture = Gesture::None;
        if let Some(modal) = &self.modal {
            if !self.zones.iter().any(|z| z.id == modal.zone_id) {
                self.modal = None;
            }
        }
    }

    // ---- pointer gestures ----

    pub fn pointer_down(&mut self, at: PixelPoint) -> GestureOutcome {
        if self.read_only || self.modal.is_some() {
            return GestureOutcome::Ignored;
        }
        let point = self.canvas.pixel_to_percent(at);

        // Later zones render on top, so hit-test from the end.
        if let Some(zone) = self.zones.iter().rev().find(|z| z.rect().contains(point)) {
            let id = zone.id.clone();
            let origin = zone.rect();
            self.gesture = Gesture::Pressing {
                zone_id: id.clone(),
                grab: point,
                origin,
                last_valid: origin,
                moved: false,
            };
            return GestureOutcome::ZonePressed { id };
        }

        let start = point.clamped();
        let rect = ZoneRect::from_corners(start, start);
        self.gesture = Gesture::Drawing {
            start,
            rect,
            valid: can_place_rect(&rect, None, &self.zones),
        };
        GestureOutcome::DrawingStarted
    }

    pub fn pointer_move(&mut self, at: PixelPoint) -> GestureOutcome {
        let point = self.canvas.pixel_to_percent(at);
        match &mut self.gesture {
            Gesture::None => GestureOutcome::Ignored,
            Gesture::Drawing { start, rect, valid } => {
                *rect = ZoneRect::from_corners(*start, point);
                *valid = can_place_rect(rect, None, &self.zones);
                GestureOutcome::CandidateUpdated { valid: *valid }
            }
            Gesture::Pressing {
                zone_id,
                grab,
                origin,
                last_valid,
                moved,
            } => {
                // Pointer-move at the press position is still a click.
                if !*moved && point == *grab {
                    return GestureOutcome::Ignored;
                }
                *moved = true;
                let target =
                    origin.moved_to(origin.x + (point.x - grab.x), origin.y + (point.y - grab.y));
                let id = zone_id.clone();
                if can_place_rect(&target, Some(&id), &self.zones) {
                    *last_valid = target;
                    if let Some(zone) = self.zones.iter_mut().find(|z| z.id == id) {
                        zone.set_position(target);
                    }
                    GestureOutcome::ZoneMoved { id }
                } else {
                    GestureOutcome::MoveRejected { id }
                }
            }
        }
    }

    pub fn pointer_up(&mut self, at: PixelPoint) -> GestureOutcome {
        let point = self.canvas.pixel_to_percent(at);
        match std::mem::replace(&mut self.gesture, Gesture::None) {
            Gesture::None => GestureOutcome::Ignored,
            Gesture::Drawing { start, .. } => self.finish_drawing(ZoneRect::from_corners(start, point)),
            Gesture::Pressing {
                zone_id,
                origin,
                last_valid,
                moved,
                ..
            } => {
                if !moved {
                    return self.open_modal(&zone_id, false);
                }
                if last_valid != origin {
                    self.emit();
                    GestureOutcome::ZoneMoved { id: zone_id }
                } else {
                    GestureOutcome::MoveRejected { id: zone_id }
                }
            }
        }
    }

    /// Abort the current gesture (pointer left the canvas, escape key).
    /// A drag in progress snaps back to where it started.
    pub fn cancel_gesture(&mut self) -> GestureOutcome {
        match std::mem::replace(&mut self.gesture, Gesture::None) {
            Gesture::None => GestureOutcome::Ignored,
            Gesture::Drawing { .. } => GestureOutcome::DrawingDiscarded(DiscardReason::Cancelled),
            Gesture::Pressing {
                zone_id, origin, ..
            } => {
                if let Some(zone) = self.zones.iter_mut().find(|z| z.id == zone_id) {
                    zone.set_position(origin);
                }
                GestureOutcome::MoveRejected { id: zone_id }
            }
        }
    }

    /// Tooltip for the zone under the pointer, in read-only mode only.
    pub fn hover(&self, at: PixelPoint) -> Option<ZoneTooltip> {
        if !self.read_only {
            return None;
        }
        let point = self.canvas.pixel_to_percent(at);
        self.zones
            .iter()
            .rev()
            .find(|z| z.rect().contains(point))
            .map(|z| ZoneTooltip {
                title: z.title.clone(),
                description: z.description.clone(),
            })
    }

    // ---- modal ----

    /// Edit the modal's form in place. No-op when the modal is closed.
    pub fn edit_form(&mut self, edit: impl FnOnce(&mut ZoneForm)) {
        if let Some(modal) = self.modal.as_mut() {
            edit(&mut modal.form);
        }
    }

    /// Commit the modal's form to its zone and close the modal.
    ///
    /// Fails (leaving the modal open) when the form does not validate,
    /// which is the case whenever Save is shown disabled.
    pub fn save(&mut self) -> Result<(), CoreError> {
        let modal = self
            .modal
            .as_ref()
            .ok_or_else(|| CoreError::Conflict("No zone is being edited".into()))?;
        modal.form.check()?;

        let zone = self
            .zones
            .iter_mut()
            .find(|z| z.id == modal.zone_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "zone",
                id: modal.zone_id.clone(),
            })?;
        modal.form.apply_to(zone);
        self.modal = None;
        self.emit();
        Ok(())
    }

    /// Activate the delete button: the first activation arms the
    /// confirmation, the second deletes the zone and closes the modal.
    pub fn delete(&mut self) -> Option<DeleteOutcome> {
        let modal = self.modal.as_mut()?;
        if !modal.delete_armed {
            modal.delete_armed = true;
            return Some(DeleteOutcome::Armed);
        }
        let id = modal.zone_id.clone();
        self.modal = None;
        self.zones.retain(|z| z.id != id);
        self.emit();
        Some(DeleteOutcome::Deleted)
    }

    /// Close the modal, discarding any edits made in it.
    pub fn cancel(&mut self) {
        self.modal = None;
    }

    // ---- private helpers ----

    fn finish_drawing(&mut self, rect: ZoneRect) -> GestureOutcome {
        if !rect.meets_minimum_size() {
            return GestureOutcome::DrawingDiscarded(DiscardReason::TooSmall);
        }
        if !can_place_rect(&rect, None, &self.zones) {
            return GestureOutcome::DrawingDiscarded(DiscardReason::Overlaps);
        }

        let id = generate_unique_zone_id(&self.zones);
        let color = next_zone_color(&self.zones);
        let title = format!("Zone {}", self.zones.len() + 1);
        self.zones.push(PitchZone::new(id.clone(), rect, title, color));
        self.emit();

        self.open_modal(&id, true);
        GestureOutcome::ZoneCreated { id }
    }

    fn open_modal(&mut self, zone_id: &str, is_new: bool) -> GestureOutcome {
        match self.zones.iter().find(|z| z.id == zone_id) {
            Some(zone) => {
                self.modal = Some(ZoneModal::open(zone, is_new));
                GestureOutcome::ModalOpened {
                    id: zone_id.to_string(),
                }
            }
            None => GestureOutcome::Ignored,
        }
    }

    fn emit(&mut self) {
        if let Some(on_change) = self.on_change.as_mut() {
            on_change(&self.zones);
        }
    }
}
