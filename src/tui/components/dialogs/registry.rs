//! Dialog registry: the authoritative map of live dialogs.
//!
//! The registry is responsible for:
//! - Keeping at most one record per dialog id
//! - Allocating z-order so exactly one record is topmost
//! - Minimize/restore and focus transitions
//! - Placing new dialogs and re-placing them when the viewport changes
//! - Notifying subscribers synchronously after every mutation
//!
//! It never renders anything and never owns content; the host mounts
//! content from the factory stored next to each record.

use super::positioning::{clamp_to_viewport, PositioningEngine};
use super::types::*;
use chrono::Utc;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

struct Entry {
    record: DialogRecord,
    factory: Arc<dyn ContentFactory>,
    /// Insertion order, used to break z-order ties
    seq: u64,
}

pub struct DialogRegistry {
    entries: HashMap<DialogId, Entry>,
    next_z: u64,
    next_seq: u64,
    engine: PositioningEngine,
    viewport: Size,
    subscribers: Vec<mpsc::UnboundedSender<RegistryEvent>>,
    command_sender: mpsc::UnboundedSender<DialogCommand>,
    command_receiver: mpsc::UnboundedReceiver<DialogCommand>,
}

impl fmt::Debug for DialogRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogRegistry")
            .field("records", &self.list())
            .field("viewport", &self.viewport)
            .finish()
    }
}

impl DialogRegistry {
    pub fn new(engine: PositioningEngine, viewport: Size) -> Self {
        let (command_sender, command_receiver) = mpsc::unbounded_channel();
        Self {
            entries: HashMap::new(),
            next_z: 0,
            next_seq: 0,
            engine,
            viewport,
            subscribers: Vec::new(),
            command_sender,
            command_receiver,
        }
    }

    /// Receive a copy of every change from now on
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<RegistryEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.push(sender);
        receiver
    }

    fn notify(&mut self, event: RegistryEvent) {
        trace!(?event, "registry event");
        self.subscribers.retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    /// Lowest cascade slot not held by a live record
    fn free_slot(&self) -> usize {
        (0..)
            .find(|slot| !self.entries.values().any(|entry| entry.record.slot == *slot))
            .unwrap_or(0)
    }

    fn allocate_z(&mut self) -> u64 {
        self.next_z += 1;
        self.next_z
    }

    /// Command handle bound to `id`, whether or not it is live
    pub fn handle(&self, id: &DialogId) -> DialogHandle {
        DialogHandle::new(id.clone(), self.command_sender.clone())
    }

    /// Open a dialog, or refresh and refocus it if `id` is already live.
    ///
    /// Returns `true` when a new record was created. A live record keeps its
    /// position and draft content; its payload is overwritten and, if `kind`
    /// differs, its kind is switched in place.
    pub fn open(
        &mut self,
        id: impl Into<DialogId>,
        kind: DialogKind,
        payload: DialogPayload,
        factory: Arc<dyn ContentFactory>,
    ) -> bool {
        let id = id.into();

        if let Some(entry) = self.entries.get_mut(&id) {
            let record = &mut entry.record;
            if record.kind != kind {
                debug!(dialog = %id, from = ?record.kind, to = ?kind, "dialog kind changed in place");
                record.kind = kind;
                record.generation += 1;
            }
            record.payload = payload;
            record.revision += 1;
            let was_minimized = record.is_minimized();
            record.status = DialogStatus::Open;
            entry.factory = factory;

            debug!(dialog = %id, "dialog already open, refocusing");
            self.notify(RegistryEvent::Refreshed(id.clone()));
            if was_minimized {
                self.notify(RegistryEvent::Restored(id.clone()));
            }
            self.raise(&id);
            return false;
        }

        let size = self.engine.fallback_size();
        let slot = self.free_slot();
        let position = self.engine.place(size, self.viewport, slot);
        let z_order = self.allocate_z();
        let seq = self.next_seq;
        self.next_seq += 1;

        let record = DialogRecord {
            id: id.clone(),
            kind,
            status: DialogStatus::Open,
            payload,
            position,
            size,
            z_order,
            created_at: Utc::now(),
            generation: 0,
            revision: 0,
            slot,
            measured: false,
            moved: false,
        };
        debug!(dialog = %id, ?kind, z_order, "dialog opened");
        self.entries.insert(id.clone(), Entry { record, factory, seq });
        self.notify(RegistryEvent::Opened(id));
        true
    }

    /// Remove a dialog. Unknown ids are ignored.
    pub fn close(&mut self, id: &DialogId) {
        if self.entries.remove(id).is_none() {
            debug!(dialog = %id, "close ignored, dialog not open");
            return;
        }
        debug!(dialog = %id, "dialog closed");
        self.notify(RegistryEvent::Closed(id.clone()));
    }

    /// Flip between minimized and open, keeping payload and position
    pub fn minimize(&mut self, id: &DialogId, minimized: bool) {
        let Some(entry) = self.entries.get_mut(id) else {
            debug!(dialog = %id, "minimize ignored, dialog not open");
            return;
        };
        let status = if minimized {
            DialogStatus::Minimized
        } else {
            DialogStatus::Open
        };
        if entry.record.status == status {
            return;
        }
        entry.record.status = status;
        debug!(dialog = %id, ?status, "dialog status changed");
        let event = if minimized {
            RegistryEvent::Minimized(id.clone())
        } else {
            RegistryEvent::Restored(id.clone())
        };
        self.notify(event);
    }

    /// Raise an open dialog above every other open dialog. Minimized and
    /// unknown ids are ignored.
    pub fn focus(&mut self, id: &DialogId) {
        match self.entries.get(id).map(|entry| entry.record.status) {
            Some(DialogStatus::Open) => self.raise(id),
            Some(DialogStatus::Minimized) => debug!(dialog = %id, "focus ignored, dialog minimized"),
            None => debug!(dialog = %id, "focus ignored, dialog not open"),
        }
    }

    fn raise(&mut self, id: &DialogId) {
        let Some(current) = self.entries.get(id).map(|entry| entry.record.z_order) else {
            return;
        };
        let above = self
            .entries
            .values()
            .filter(|entry| entry.record.is_open() && entry.record.id != *id)
            .map(|entry| entry.record.z_order)
            .max();
        if above.map_or(true, |z| z < current) {
            return;
        }

        let z_order = self.allocate_z();
        if let Some(entry) = self.entries.get_mut(id) {
            entry.record.z_order = z_order;
        }
        debug!(dialog = %id, z_order, "dialog focused");
        self.notify(RegistryEvent::Focused(id.clone()));
    }

    /// Live and not minimized
    pub fn is_open(&self, id: &DialogId) -> bool {
        self.entries.get(id).is_some_and(|entry| entry.record.is_open())
    }

    pub fn contains(&self, id: &DialogId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &DialogId) -> Option<&DialogRecord> {
        self.entries.get(id).map(|entry| &entry.record)
    }

    pub fn factory(&self, id: &DialogId) -> Option<Arc<dyn ContentFactory>> {
        self.entries.get(id).map(|entry| Arc::clone(&entry.factory))
    }

    /// Records in paint order: ascending z-order, ties by insertion order
    pub fn list(&self) -> Vec<DialogRecord> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|entry| (entry.record.z_order, entry.seq));
        entries.into_iter().map(|entry| entry.record.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The open dialog that receives keyboard input
    pub fn topmost_open(&self) -> Option<DialogId> {
        self.entries
            .values()
            .filter(|entry| entry.record.is_open())
            .max_by_key(|entry| (entry.record.z_order, entry.seq))
            .map(|entry| entry.record.id.clone())
    }

    /// Most recently raised minimized dialog
    pub fn last_minimized(&self) -> Option<DialogId> {
        self.entries
            .values()
            .filter(|entry| entry.record.is_minimized())
            .max_by_key(|entry| (entry.record.z_order, entry.seq))
            .map(|entry| entry.record.id.clone())
    }

    /// Bring the bottom open dialog to the top
    pub fn cycle_focus(&mut self) {
        let bottom = self
            .entries
            .values()
            .filter(|entry| entry.record.is_open())
            .min_by_key(|entry| (entry.record.z_order, entry.seq))
            .map(|entry| entry.record.id.clone());
        if let Some(id) = bottom {
            self.focus(&id);
        }
    }

    /// Store a dragged position. Only `id` is touched.
    pub fn move_to(&mut self, id: &DialogId, position: Position) {
        let viewport = self.viewport;
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        let position = clamp_to_viewport(position, entry.record.size, viewport);
        if entry.record.position == position {
            return;
        }
        entry.record.position = position;
        entry.record.moved = true;
        self.notify(RegistryEvent::Moved(id.clone()));
    }

    /// Pull a dialog back inside the viewport once its drag ends. A resize
    /// during the gesture skips the dragged record, so it may be off-screen.
    pub fn settle_after_drag(&mut self, id: &DialogId) {
        let viewport = self.viewport;
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        let position = clamp_to_viewport(entry.record.position, entry.record.size, viewport);
        if entry.record.position == position {
            return;
        }
        entry.record.position = position;
        debug!(dialog = %id, x = position.x, y = position.y, "dialog settled after drag");
        self.notify(RegistryEvent::Moved(id.clone()));
    }

    /// Replace the fallback size estimate with the content's own size
    pub fn set_measured_size(&mut self, id: &DialogId, size: Size) {
        let viewport = self.viewport;
        let engine = self.engine.clone();
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        let record = &mut entry.record;
        if record.measured && record.size == size {
            return;
        }
        record.size = size;
        record.measured = true;
        record.position = if record.moved {
            clamp_to_viewport(record.position, size, viewport)
        } else {
            engine.place(size, viewport, record.slot)
        };
        debug!(dialog = %id, width = size.width, height = size.height, "dialog measured");
        self.notify(RegistryEvent::Resized(id.clone()));
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Re-place every live dialog for a new viewport, except the one being
    /// dragged, which keeps its position until the gesture ends.
    pub fn set_viewport(&mut self, viewport: Size, dragging: Option<&DialogId>) {
        if self.viewport == viewport {
            return;
        }
        self.viewport = viewport;
        for entry in self.entries.values_mut() {
            if dragging == Some(&entry.record.id) {
                continue;
            }
            let record = &mut entry.record;
            record.position = self.engine.place(record.size, viewport, record.slot);
        }
        debug!(width = viewport.width, height = viewport.height, "viewport changed");
        self.notify(RegistryEvent::ViewportChanged(viewport));
    }

    pub fn apply(&mut self, command: DialogCommand) {
        match command {
            DialogCommand::Close(id) => self.close(&id),
            DialogCommand::Minimize(id, minimized) => self.minimize(&id, minimized),
            DialogCommand::Focus(id) => self.focus(&id),
            DialogCommand::ChangeKind(id, kind) => self.change_kind(&id, kind),
        }
    }

    /// Apply everything content sent through its handles. Returns how many
    /// commands were applied.
    pub fn process_commands(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.command_receiver.try_recv() {
            self.apply(command);
            applied += 1;
        }
        applied
    }

    fn change_kind(&mut self, id: &DialogId, kind: DialogKind) {
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        if entry.record.kind == kind {
            return;
        }
        entry.record.kind = kind;
        entry.record.generation += 1;
        entry.record.status = DialogStatus::Open;
        debug!(dialog = %id, ?kind, "dialog kind changed in place");
        self.notify(RegistryEvent::Refreshed(id.clone()));
        self.raise(id);
    }
}
