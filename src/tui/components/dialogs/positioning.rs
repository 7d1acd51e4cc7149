//! Dialog placement and pointer dragging

use super::layer::{DialogLayer, LayerHit};
use super::types::{DialogId, Position, Size};
use tracing::debug;

/// Size assumed for a dialog until its content reports one
pub const FALLBACK_DIALOG_SIZE: Size = Size::new(60, 16);

/// Default placement: centered horizontally, top edge at one third of the
/// free vertical space, clamped to the viewport.
pub fn compute_initial_position(dialog: Size, viewport: Size) -> Position {
    let free_width = viewport.width.saturating_sub(dialog.width) as i32;
    let free_height = viewport.height.saturating_sub(dialog.height) as i32;
    clamp_to_viewport(Position::new(free_width / 2, free_height / 3), dialog, viewport)
}

/// Keep the whole dialog inside the viewport. A dialog larger than the
/// viewport is pinned to the origin on that axis.
pub fn clamp_to_viewport(position: Position, dialog: Size, viewport: Size) -> Position {
    let max_x = viewport.width.saturating_sub(dialog.width) as i32;
    let max_y = viewport.height.saturating_sub(dialog.height) as i32;
    Position::new(position.x.clamp(0, max_x), position.y.clamp(0, max_y))
}

/// Placement policy shared by every record in a registry
#[derive(Debug, Clone)]
pub struct PositioningEngine {
    fallback_size: Size,
    cascade_step: i32,
    cascade_slots: usize,
}

impl PositioningEngine {
    pub fn new(fallback_size: Size, cascade_step: u16) -> Self {
        Self {
            fallback_size,
            cascade_step: cascade_step as i32,
            cascade_slots: 6,
        }
    }

    pub fn fallback_size(&self) -> Size {
        self.fallback_size
    }

    /// Initial placement shifted by the cascade slot so stacked dialogs
    /// stay distinguishable.
    pub fn place(&self, dialog: Size, viewport: Size, slot: usize) -> Position {
        let step = (slot % self.cascade_slots) as i32 * self.cascade_step;
        let base = compute_initial_position(dialog, viewport);
        clamp_to_viewport(base.offset(step * 2, step), dialog, viewport)
    }
}

impl Default for PositioningEngine {
    fn default() -> Self {
        Self::new(FALLBACK_DIALOG_SIZE, 1)
    }
}

/// One drag gesture in progress
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub id: DialogId,
    pub pointer_start: (u16, u16),
    pub position_start: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Drag state machine. While dragging it holds the pointer capture, which
/// makes the host route every mouse event here regardless of hit region.
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dragging(&self) -> Option<&DialogId> {
        match &self.state {
            DragState::Dragging(session) => Some(&session.id),
            DragState::Idle => None,
        }
    }

    pub fn has_pointer_capture(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Start a drag if the pointer went down on the layer's header.
    /// Presses on the body or the header buttons never start one.
    pub fn begin(&mut self, layer: &DialogLayer, pointer: (u16, u16), position: Position) -> bool {
        if self.has_pointer_capture() {
            return false;
        }
        if layer.hit(pointer.0, pointer.1) != LayerHit::Header {
            return false;
        }

        debug!(dialog = %layer.dialog_id(), "drag started");
        self.state = DragState::Dragging(DragSession {
            id: layer.dialog_id().clone(),
            pointer_start: pointer,
            position_start: position,
        });
        true
    }

    /// Position for the current pointer, measured from the drag start
    pub fn update(&self, pointer: (u16, u16)) -> Option<(DialogId, Position)> {
        let DragState::Dragging(session) = &self.state else {
            return None;
        };
        let dx = pointer.0 as i32 - session.pointer_start.0 as i32;
        let dy = pointer.1 as i32 - session.pointer_start.1 as i32;
        Some((session.id.clone(), session.position_start.offset(dx, dy)))
    }

    /// Finish the gesture and release the capture
    pub fn end(&mut self) -> Option<DialogId> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging(session) => {
                debug!(dialog = %session.id, "drag finished");
                Some(session.id)
            }
            DragState::Idle => None,
        }
    }

    /// Drop the gesture if it belongs to a dialog that went away
    pub fn cancel_for(&mut self, id: &DialogId) {
        if self.dragging() == Some(id) {
            debug!(dialog = %id, "drag cancelled");
            self.state = DragState::Idle;
        }
    }
}

impl Drop for DragController {
    fn drop(&mut self) {
        self.end();
    }
}
