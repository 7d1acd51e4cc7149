//! Dialog layering system for proper rendering order
//!
//! A layer is the on-screen frame of one open dialog: its clipped area, its
//! header chrome and whether it has focus. Layers are rebuilt from the registry
//! whenever the host needs to paint or hit-test.

use super::types::{DialogId, DialogRecord};
use ratatui::layout::Rect;

/// Width of one header button such as `[x]`
const BUTTON_WIDTH: u16 = 3;

/// Frames narrower than this get no header buttons
const MIN_WIDTH_FOR_BUTTONS: u16 = 12;

/// Region of a layer under a pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerHit {
    /// Header row outside the buttons; starts a drag
    Header,
    Minimize,
    Close,
    /// Border or content
    Body,
    Outside,
}

/// Represents a dialog layer for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct DialogLayer {
    /// Dialog identifier
    dialog_id: DialogId,

    /// Frame area including the border, clipped to the host area
    area: Rect,

    /// Whether this is the topmost open dialog
    is_focused: bool,
}

impl DialogLayer {
    /// Create a new dialog layer
    pub fn new(dialog_id: DialogId, area: Rect, is_focused: bool) -> Self {
        Self {
            dialog_id,
            area,
            is_focused,
        }
    }

    /// Frame for a record placed inside `host`
    pub fn from_record(record: &DialogRecord, host: Rect, is_focused: bool) -> Self {
        let x = host.x.saturating_add(record.position.x.max(0) as u16);
        let y = host.y.saturating_add(record.position.y.max(0) as u16);
        let area = Rect::new(x, y, record.size.width, record.size.height).intersection(host);
        Self::new(record.id.clone(), area, is_focused)
    }

    pub fn dialog_id(&self) -> &DialogId {
        &self.dialog_id
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn is_focused(&self) -> bool {
        self.is_focused
    }

    /// Area inside the border
    pub fn body_area(&self) -> Rect {
        Rect {
            x: self.area.x.saturating_add(1),
            y: self.area.y.saturating_add(1),
            width: self.area.width.saturating_sub(2),
            height: self.area.height.saturating_sub(2),
        }
    }

    pub fn close_button(&self) -> Option<Rect> {
        self.button(1)
    }

    pub fn minimize_button(&self) -> Option<Rect> {
        self.button(2)
    }

    /// Buttons sit right-aligned on the header row, counted from the right
    fn button(&self, index: u16) -> Option<Rect> {
        if self.area.width < MIN_WIDTH_FOR_BUTTONS || self.area.height == 0 {
            return None;
        }
        let x = self.area.right().saturating_sub(1 + BUTTON_WIDTH * index);
        Some(Rect::new(x, self.area.y, BUTTON_WIDTH, 1))
    }

    /// Check if a point is within the dialog area
    pub fn contains_point(&self, x: u16, y: u16) -> bool {
        rect_contains(self.area, x, y)
    }

    pub fn hit(&self, x: u16, y: u16) -> LayerHit {
        if !self.contains_point(x, y) {
            return LayerHit::Outside;
        }
        if y != self.area.y {
            return LayerHit::Body;
        }
        if self.close_button().is_some_and(|r| rect_contains(r, x, y)) {
            return LayerHit::Close;
        }
        if self.minimize_button().is_some_and(|r| rect_contains(r, x, y)) {
            return LayerHit::Minimize;
        }
        LayerHit::Header
    }
}

pub(crate) fn rect_contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x && x < rect.right() && y >= rect.y && y < rect.bottom()
}

/// Open dialog frames in paint order (bottom first)
#[derive(Debug, Default, Clone)]
pub struct LayerStack {
    layers: Vec<DialogLayer>,
}

impl LayerStack {
    /// Build from records already sorted by z-order. Minimized records
    /// have no frame and are skipped.
    pub fn from_records(records: &[DialogRecord], host: Rect) -> Self {
        let topmost = records.iter().filter(|r| r.is_open()).map(|r| r.z_order).max();
        let layers = records
            .iter()
            .filter(|record| record.is_open())
            .map(|record| DialogLayer::from_record(record, host, Some(record.z_order) == topmost))
            .filter(|layer| !layer.area.is_empty())
            .collect();
        Self { layers }
    }

    /// Get all layers in rendering order
    pub fn layers(&self) -> &[DialogLayer] {
        &self.layers
    }

    /// Find the topmost layer at a given point
    pub fn layer_at_point(&self, x: u16, y: u16) -> Option<&DialogLayer> {
        self.layers.iter().rev().find(|layer| layer.contains_point(x, y))
    }
}

/// Where the minimized tray sits inside the host area
pub fn tray_row(host: Rect) -> Option<Rect> {
    if host.height == 0 {
        return None;
    }
    Some(Rect::new(host.x, host.bottom() - 1, host.width, 1))
}

/// Lay out one chip per label left to right, dropping chips that no
/// longer fit on the row.
pub fn tray_chips(row: Rect, widths: &[u16]) -> Vec<Rect> {
    let mut chips = Vec::with_capacity(widths.len());
    let mut x = row.x;
    for &width in widths {
        if x.saturating_add(width) > row.right() {
            break;
        }
        chips.push(Rect::new(x, row.y, width, 1));
        x = x.saturating_add(width + 1);
    }
    chips
}
