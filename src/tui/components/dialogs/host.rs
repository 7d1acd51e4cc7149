//! Dialog host: mounts, paints and routes input to dialog content.
//!
//! The host follows the registry. Each open or minimized record gets exactly
//! one mounted content instance; records that disappear are unmounted on the
//! next sync. Every content instance sits behind its own error boundary so a
//! failing dialog only replaces its own frame with an error panel.

use super::layer::{rect_contains, tray_chips, tray_row, DialogLayer, LayerHit, LayerStack};
use super::positioning::DragController;
use super::registry::DialogRegistry;
use super::types::*;
use crate::tui::{styles::Theme, Frame};
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use futures::FutureExt;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use unicode_width::UnicodeWidthStr;

struct MountedDialog {
    /// `None` when the factory itself failed
    content: Option<Box<dyn DialogContent>>,
    guard: MountGuard,
    generation: u64,
    revision: u64,
    title: String,
    crash: Option<String>,
}

impl MountedDialog {
    fn crash(&mut self, id: &DialogId, error: DialogError) {
        warn!(dialog = %id, "{}", error);
        self.crash = Some(error.to_string());
    }
}

enum Reconcile {
    Mount,
    Remount,
    UpdatePayload,
    Keep,
}

pub struct DialogHost {
    mounted: HashMap<DialogId, MountedDialog>,
    events: mpsc::UnboundedReceiver<RegistryEvent>,
    drag: DragController,
    area: Rect,
}

impl DialogHost {
    /// Create a host subscribed to `registry`
    pub fn new(registry: &mut DialogRegistry) -> Self {
        let viewport = registry.viewport();
        Self {
            mounted: HashMap::new(),
            events: registry.subscribe(),
            drag: DragController::new(),
            area: Rect::new(0, 0, viewport.width, viewport.height.saturating_add(1)),
        }
    }

    /// Part of the host area dialogs may occupy; the last row is the tray
    pub fn dialog_area(area: Rect) -> Rect {
        Rect {
            height: area.height.saturating_sub(1),
            ..area
        }
    }

    /// Adopt a new host area and re-place dialogs for it
    pub fn set_area(&mut self, registry: &mut DialogRegistry, area: Rect) {
        self.area = area;
        let viewport = Size::from(Self::dialog_area(area));
        registry.set_viewport(viewport, self.drag.dragging());
    }

    pub fn is_mounted(&self, id: &DialogId) -> bool {
        self.mounted.contains_key(id)
    }

    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }

    pub fn title(&self, id: &DialogId) -> Option<&str> {
        self.mounted.get(id).map(|mounted| mounted.title.as_str())
    }

    pub fn crash_message(&self, id: &DialogId) -> Option<&str> {
        self.mounted.get(id).and_then(|mounted| mounted.crash.as_deref())
    }

    pub fn has_pointer_capture(&self) -> bool {
        self.drag.has_pointer_capture()
    }

    /// Apply pending content commands and bring mounts in line with the
    /// registry. Returns whether anything changed.
    pub fn sync(&mut self, registry: &mut DialogRegistry) -> bool {
        registry.process_commands();

        let mut changed = false;
        while self.events.try_recv().is_ok() {
            changed = true;
        }
        let stale = self.mounted.keys().any(|id| !registry.contains(id));
        if changed || stale || self.mounted.len() != registry.len() {
            self.reconcile(registry);
        }
        changed
    }

    fn reconcile(&mut self, registry: &mut DialogRegistry) {
        let gone: Vec<DialogId> = self
            .mounted
            .keys()
            .filter(|id| !registry.contains(id))
            .cloned()
            .collect();
        for id in gone {
            self.unmount(&id);
        }

        for record in registry.list() {
            let action = match self.mounted.get(&record.id) {
                None => Reconcile::Mount,
                Some(mounted) if mounted.generation != record.generation => Reconcile::Remount,
                Some(mounted) if mounted.revision != record.revision => Reconcile::UpdatePayload,
                Some(_) => Reconcile::Keep,
            };

            match action {
                Reconcile::Mount => self.mount(registry, &record),
                Reconcile::Remount => {
                    self.unmount(&record.id);
                    self.mount(registry, &record);
                }
                Reconcile::UpdatePayload => self.update_payload(&record),
                Reconcile::Keep => {}
            }
        }

        // Measurement above may have sent more events; they are already
        // reflected in the mounts.
        while self.events.try_recv().is_ok() {}
    }

    fn mount(&mut self, registry: &mut DialogRegistry, record: &DialogRecord) {
        let Some(factory) = registry.factory(&record.id) else {
            return;
        };
        let guard = MountGuard::new();
        let context = DialogContext {
            id: record.id.clone(),
            kind: record.kind,
            payload: record.payload.clone(),
            position: record.position,
            handle: registry.handle(&record.id),
            guard: guard.clone(),
        };

        let mut mounted = MountedDialog {
            content: None,
            guard,
            generation: record.generation,
            revision: record.revision,
            title: record.kind.label().to_string(),
            crash: None,
        };

        match panic::catch_unwind(AssertUnwindSafe(|| factory.create(context))) {
            Ok(Ok(content)) => {
                mounted.title = content.title();
                if let Some(size) = content.preferred_size() {
                    registry.set_measured_size(&record.id, size);
                }
                mounted.content = Some(content);
            }
            Ok(Err(error)) => mounted.crash(&record.id, error),
            Err(payload) => mounted.crash(
                &record.id,
                DialogError::ContentPanicked {
                    id: record.id.clone(),
                    message: panic_message(payload.as_ref()),
                },
            ),
        }

        debug!(dialog = %record.id, generation = record.generation, "dialog content mounted");
        self.mounted.insert(record.id.clone(), mounted);
    }

    fn unmount(&mut self, id: &DialogId) {
        if let Some(mounted) = self.mounted.remove(id) {
            mounted.guard.unmount();
            debug!(dialog = %id, "dialog content unmounted");
        }
        self.drag.cancel_for(id);
    }

    fn update_payload(&mut self, record: &DialogRecord) {
        let Some(mounted) = self.mounted.get_mut(&record.id) else {
            return;
        };
        mounted.revision = record.revision;
        let Some(content) = mounted.content.as_mut() else {
            return;
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            content.update_payload(&record.payload);
            content.title()
        }));
        match outcome {
            Ok(title) => mounted.title = title,
            Err(payload) => mounted.crash(
                &record.id,
                DialogError::ContentPanicked {
                    id: record.id.clone(),
                    message: panic_message(payload.as_ref()),
                },
            ),
        }
    }

    /// Paint open dialogs bottom to top, then the minimized tray
    pub fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme, registry: &DialogRegistry) {
        self.area = area;
        let records = registry.list();
        let stack = LayerStack::from_records(&records, Self::dialog_area(area));

        for layer in stack.layers() {
            self.render_layer(frame, layer, theme);
        }
        self.render_tray(frame, theme, &records);
    }

    fn render_layer(&mut self, frame: &mut Frame, layer: &DialogLayer, theme: &Theme) {
        let area = layer.area();
        let border_style = if layer.is_focused() {
            theme.focused_border_style()
        } else {
            theme.border_style()
        };

        let Some(mounted) = self.mounted.get_mut(layer.dialog_id()) else {
            return;
        };

        frame.render_widget(Clear, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(format!(" {} ", mounted.title))
            .style(theme.base_style());
        frame.render_widget(block, area);

        if let Some(button) = layer.minimize_button() {
            frame.render_widget(Paragraph::new("[_]").style(border_style), button);
        }
        if let Some(button) = layer.close_button() {
            frame.render_widget(Paragraph::new("[x]").style(border_style), button);
        }

        let body = layer.body_area();
        if body.is_empty() {
            return;
        }

        if mounted.crash.is_none() {
            if let Some(content) = mounted.content.as_mut() {
                let outcome =
                    panic::catch_unwind(AssertUnwindSafe(|| content.render(frame, body, theme)));
                if let Err(payload) = outcome {
                    mounted.crash(
                        layer.dialog_id(),
                        DialogError::ContentPanicked {
                            id: layer.dialog_id().clone(),
                            message: panic_message(payload.as_ref()),
                        },
                    );
                }
            }
        }

        if let Some(message) = &mounted.crash {
            frame.render_widget(Clear, body);
            let text = vec![
                Line::from(Span::styled("This dialog stopped working.", theme.error_style())),
                Line::from(""),
                Line::from(message.as_str()),
                Line::from(""),
                Line::from(Span::styled("Esc or [x] closes it.", theme.placeholder_style())),
            ];
            frame.render_widget(
                Paragraph::new(text).wrap(Wrap { trim: true }).style(theme.base_style()),
                body,
            );
        }
    }

    fn tray_layout(&self, records: &[DialogRecord]) -> Vec<(DialogId, Rect, String)> {
        let Some(row) = tray_row(self.area) else {
            return Vec::new();
        };
        let minimized: Vec<(DialogId, String)> = records
            .iter()
            .filter(|record| record.is_minimized())
            .map(|record| {
                let title = self
                    .title(&record.id)
                    .map(str::to_string)
                    .unwrap_or_else(|| record.kind.label().to_string());
                (record.id.clone(), format!(" ▲ {} ", title))
            })
            .collect();
        let widths: Vec<u16> = minimized
            .iter()
            .map(|(_, label)| label.width().min(u16::MAX as usize) as u16)
            .collect();

        tray_chips(row, &widths)
            .into_iter()
            .zip(minimized)
            .map(|(rect, (id, label))| (id, rect, label))
            .collect()
    }

    fn render_tray(&self, frame: &mut Frame, theme: &Theme, records: &[DialogRecord]) {
        for (_, rect, label) in self.tray_layout(records) {
            frame.render_widget(Paragraph::new(label).style(theme.selection_style()), rect);
        }
    }

    /// Route a key to the topmost open dialog. Returns whether a dialog
    /// consumed it.
    pub async fn handle_key_event(&mut self, registry: &mut DialogRegistry, key: KeyEvent) -> bool {
        let Some(id) = registry.topmost_open() else {
            return false;
        };
        let Some(mounted) = self.mounted.get_mut(&id) else {
            return false;
        };

        let content = match (&mounted.crash, mounted.content.as_mut()) {
            (None, Some(content)) => content,
            _ => {
                if key.code == KeyCode::Esc {
                    registry.close(&id);
                }
                return true;
            }
        };

        let outcome = AssertUnwindSafe(content.handle_key_event(key)).catch_unwind().await;
        match outcome {
            Ok(Ok(())) => mounted.title = content.title(),
            Ok(Err(error)) => mounted.crash(
                &id,
                DialogError::ContentFailed {
                    id: id.clone(),
                    message: format!("{:#}", error),
                },
            ),
            Err(payload) => mounted.crash(
                &id,
                DialogError::ContentPanicked {
                    id: id.clone(),
                    message: panic_message(payload.as_ref()),
                },
            ),
        }
        true
    }

    /// Handle pointer input: tray chips, header buttons, drags and clicks
    /// into dialog bodies. Returns whether the event was consumed.
    pub async fn handle_mouse_event(
        &mut self,
        registry: &mut DialogRegistry,
        event: MouseEvent,
    ) -> bool {
        let pointer = (event.column, event.row);

        if self.drag.has_pointer_capture() {
            match event.kind {
                MouseEventKind::Drag(_) | MouseEventKind::Moved => {
                    if let Some((id, position)) = self.drag.update(pointer) {
                        registry.move_to(&id, position);
                    }
                    return true;
                }
                MouseEventKind::Up(_) => {
                    self.finish_drag(registry);
                    return true;
                }
                // The release was lost, e.g. outside the terminal. This press
                // starts a new gesture.
                MouseEventKind::Down(_) => self.finish_drag(registry),
                _ => return true,
            }
        }

        if event.kind != MouseEventKind::Down(MouseButton::Left) {
            return false;
        }

        let records = registry.list();
        if let Some((id, _, _)) = self
            .tray_layout(&records)
            .into_iter()
            .find(|(_, rect, _)| rect_contains(*rect, pointer.0, pointer.1))
        {
            registry.minimize(&id, false);
            registry.focus(&id);
            return true;
        }

        let stack = LayerStack::from_records(&records, Self::dialog_area(self.area));
        let Some(layer) = stack.layer_at_point(pointer.0, pointer.1).cloned() else {
            return false;
        };
        let id = layer.dialog_id().clone();
        registry.focus(&id);

        match layer.hit(pointer.0, pointer.1) {
            LayerHit::Close => registry.close(&id),
            LayerHit::Minimize => registry.minimize(&id, true),
            LayerHit::Header => {
                if let Some(record) = registry.get(&id) {
                    self.drag.begin(&layer, pointer, record.position);
                }
            }
            LayerHit::Body => self.forward_mouse(&id, event).await,
            LayerHit::Outside => {}
        }
        true
    }

    fn finish_drag(&mut self, registry: &mut DialogRegistry) {
        if let Some(id) = self.drag.end() {
            registry.settle_after_drag(&id);
        }
    }

    async fn forward_mouse(&mut self, id: &DialogId, event: MouseEvent) {
        let Some(mounted) = self.mounted.get_mut(id) else {
            return;
        };
        if mounted.crash.is_some() {
            return;
        }
        let Some(content) = mounted.content.as_mut() else {
            return;
        };
        let outcome = AssertUnwindSafe(content.handle_mouse_event(event)).catch_unwind().await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(error)) => mounted.crash(
                id,
                DialogError::ContentFailed {
                    id: id.clone(),
                    message: format!("{:#}", error),
                },
            ),
            Err(payload) => mounted.crash(
                id,
                DialogError::ContentPanicked {
                    id: id.clone(),
                    message: panic_message(payload.as_ref()),
                },
            ),
        }
    }

    /// Periodic updates for every healthy mount, minimized ones included
    pub async fn tick(&mut self) {
        for (id, mounted) in self.mounted.iter_mut() {
            if mounted.crash.is_some() {
                continue;
            }
            let Some(content) = mounted.content.as_mut() else {
                continue;
            };
            let outcome = AssertUnwindSafe(content.tick()).catch_unwind().await;
            match outcome {
                Ok(Ok(())) => mounted.title = content.title(),
                Ok(Err(error)) => mounted.crash(
                    id,
                    DialogError::ContentFailed {
                        id: id.clone(),
                        message: format!("{:#}", error),
                    },
                ),
                Err(payload) => mounted.crash(
                    id,
                    DialogError::ContentPanicked {
                        id: id.clone(),
                        message: panic_message(payload.as_ref()),
                    },
                ),
            }
        }
    }
}

impl Drop for DialogHost {
    fn drop(&mut self) {
        for mounted in self.mounted.values() {
            mounted.guard.unmount();
        }
        self.drag.end();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::components::dialogs::positioning::PositioningEngine;
    use async_trait::async_trait;
    use crossterm::event::KeyModifiers;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records typed characters; the title exposes the draft
    struct Draft {
        text: String,
        payload_updates: usize,
    }

    #[async_trait]
    impl DialogContent for Draft {
        fn title(&self) -> String {
            format!("draft:{}:{}", self.text, self.payload_updates)
        }

        fn preferred_size(&self) -> Option<Size> {
            Some(Size::new(30, 8))
        }

        fn render(&mut self, frame: &mut Frame, area: Rect, _theme: &Theme) {
            frame.render_widget(Paragraph::new(self.text.clone()), area);
        }

        async fn handle_key_event(&mut self, event: KeyEvent) -> anyhow::Result<()> {
            match event.code {
                KeyCode::Char('!') => anyhow::bail!("bad input"),
                KeyCode::Char('?') => panic!("key handler exploded"),
                KeyCode::Char(c) => self.text.push(c),
                _ => {}
            }
            Ok(())
        }

        fn update_payload(&mut self, _payload: &DialogPayload) {
            self.payload_updates += 1;
        }
    }

    struct Exploding;

    #[async_trait]
    impl DialogContent for Exploding {
        fn title(&self) -> String {
            "exploding".to_string()
        }

        fn render(&mut self, _frame: &mut Frame, _area: Rect, _theme: &Theme) {
            panic!("render exploded");
        }

        async fn handle_key_event(&mut self, _event: KeyEvent) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn draft_factory(created: Arc<AtomicUsize>, guards: Arc<Mutex<Vec<MountGuard>>>) -> Arc<dyn ContentFactory> {
        Arc::new(
            move |context: DialogContext| -> Result<Box<dyn DialogContent>, DialogError> {
                created.fetch_add(1, Ordering::SeqCst);
                guards.lock().unwrap().push(context.guard.clone());
                Ok(Box::new(Draft {
                    text: String::new(),
                    payload_updates: 0,
                }))
            },
        )
    }

    fn draft() -> Arc<dyn ContentFactory> {
        draft_factory(Arc::new(AtomicUsize::new(0)), Arc::new(Mutex::new(Vec::new())))
    }

    fn exploding() -> Arc<dyn ContentFactory> {
        fn create(_: DialogContext) -> Result<Box<dyn DialogContent>, DialogError> {
            Ok(Box::new(Exploding))
        }
        Arc::new(create)
    }

    fn payload(title: &str) -> DialogPayload {
        DialogPayload::Generic(GenericPayload {
            title: title.to_string(),
            lead: None,
            data: serde_json::Value::Null,
        })
    }

    fn setup() -> (DialogRegistry, DialogHost) {
        let mut registry = DialogRegistry::new(PositioningEngine::default(), Size::new(80, 23));
        let host = DialogHost::new(&mut registry);
        (registry, host)
    }

    fn id(value: &str) -> DialogId {
        DialogId::from(value)
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn draw(host: &mut DialogHost, registry: &DialogRegistry) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let theme = Theme::default();
        terminal
            .draw(|frame| {
                let area = frame.size();
                host.render(frame, area, &theme, registry);
            })
            .unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    #[tokio::test]
    async fn test_same_kind_dialogs_keep_separate_state() {
        let (mut registry, mut host) = setup();
        registry.open("a", DialogKind::Generic, payload("a"), draft());
        registry.open("b", DialogKind::Generic, payload("b"), draft());
        host.sync(&mut registry);
        assert_eq!(host.mounted_count(), 2);

        host.handle_key_event(&mut registry, key('x')).await;
        registry.focus(&id("a"));
        host.handle_key_event(&mut registry, key('y')).await;

        assert_eq!(host.title(&id("a")), Some("draft:y:0"));
        assert_eq!(host.title(&id("b")), Some("draft:x:0"));
    }

    #[tokio::test]
    async fn test_close_unmounts_and_flips_guard() {
        let (mut registry, mut host) = setup();
        let guards = Arc::new(Mutex::new(Vec::new()));
        registry.open(
            "n",
            DialogKind::NoteAdd,
            payload("n"),
            draft_factory(Arc::new(AtomicUsize::new(0)), guards.clone()),
        );
        host.sync(&mut registry);
        let guard = guards.lock().unwrap()[0].clone();
        assert!(guard.is_mounted());

        registry.handle(&id("n")).close();
        host.sync(&mut registry);

        assert!(!host.is_mounted(&id("n")));
        assert!(!guard.is_mounted());
        assert_eq!(host.mounted_count(), 0);
    }

    #[tokio::test]
    async fn test_measured_size_applied_on_mount() {
        let (mut registry, mut host) = setup();
        registry.open("a", DialogKind::Generic, payload("a"), draft());
        host.sync(&mut registry);
        assert_eq!(registry.get(&id("a")).unwrap().size, Size::new(30, 8));
    }

    #[tokio::test]
    async fn test_render_panic_isolated_to_one_dialog() {
        let (mut registry, mut host) = setup();
        registry.open("ok", DialogKind::Generic, payload("ok"), draft());
        registry.open("boom", DialogKind::Generic, payload("boom"), exploding());
        host.sync(&mut registry);

        let screen = draw(&mut host, &registry);
        assert!(host.crash_message(&id("boom")).is_some());
        assert!(host.crash_message(&id("ok")).is_none());
        assert!(screen.contains("stopped working"));

        registry.focus(&id("ok"));
        let screen = draw(&mut host, &registry);
        assert!(screen.contains("draft:"));

        // The crashed dialog still closes with Esc
        registry.focus(&id("boom"));
        host.handle_key_event(&mut registry, KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE))
            .await;
        host.sync(&mut registry);
        assert!(!registry.contains(&id("boom")));
        assert!(registry.contains(&id("ok")));
    }

    #[tokio::test]
    async fn test_key_handler_failures_are_contained() {
        let (mut registry, mut host) = setup();
        registry.open("a", DialogKind::Generic, payload("a"), draft());
        registry.open("b", DialogKind::Generic, payload("b"), draft());
        host.sync(&mut registry);

        host.handle_key_event(&mut registry, key('?')).await;
        assert!(host.crash_message(&id("b")).is_some());

        registry.focus(&id("a"));
        host.handle_key_event(&mut registry, key('!')).await;
        assert!(host.crash_message(&id("a")).unwrap().contains("bad input"));
    }

    #[tokio::test]
    async fn test_factory_error_marks_dialog_crashed() {
        let (mut registry, mut host) = setup();
        let failing: Arc<dyn ContentFactory> = Arc::new(
            |context: DialogContext| -> Result<Box<dyn DialogContent>, DialogError> {
                Err(DialogError::PayloadMismatch(context.id, context.kind))
            },
        );
        registry.open("bad", DialogKind::TaskEdit, payload("bad"), failing);
        host.sync(&mut registry);

        assert!(host.is_mounted(&id("bad")));
        assert!(host.crash_message(&id("bad")).is_some());
    }

    #[tokio::test]
    async fn test_kind_change_remounts_and_payload_update_does_not() {
        let (mut registry, mut host) = setup();
        let created = Arc::new(AtomicUsize::new(0));
        let guards = Arc::new(Mutex::new(Vec::new()));
        let factory = || draft_factory(created.clone(), guards.clone());

        registry.open("note-1", DialogKind::NoteView, payload("v"), factory());
        host.sync(&mut registry);
        host.handle_key_event(&mut registry, key('k')).await;

        registry.open("note-1", DialogKind::NoteView, payload("v2"), factory());
        host.sync(&mut registry);
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(host.title(&id("note-1")), Some("draft:k:1"));

        registry.open("note-1", DialogKind::NoteEdit, payload("v2"), factory());
        host.sync(&mut registry);
        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(host.title(&id("note-1")), Some("draft::0"));
        assert!(!guards.lock().unwrap()[0].is_mounted());
    }

    #[tokio::test]
    async fn test_minimized_dialog_keeps_draft_and_shows_chip() {
        let (mut registry, mut host) = setup();
        registry.open("a", DialogKind::Generic, payload("a"), draft());
        host.sync(&mut registry);
        host.handle_key_event(&mut registry, key('q')).await;

        registry.minimize(&id("a"), true);
        host.sync(&mut registry);
        let screen = draw(&mut host, &registry);
        let tray = screen.lines().last().unwrap().to_string();
        assert!(tray.contains("draft:q:0"));

        // Clicking the chip restores and focuses the dialog
        assert!(host.handle_mouse_event(&mut registry, mouse(MouseEventKind::Down(MouseButton::Left), 2, 23)).await);
        assert!(registry.is_open(&id("a")));
        assert_eq!(registry.topmost_open(), Some(id("a")));
        assert_eq!(host.title(&id("a")), Some("draft:q:0"));
    }

    #[tokio::test]
    async fn test_header_drag_moves_only_that_dialog() {
        let (mut registry, mut host) = setup();
        registry.open("a", DialogKind::Generic, payload("a"), draft());
        registry.open("b", DialogKind::Generic, payload("b"), draft());
        host.sync(&mut registry);
        host.set_area(&mut registry, Rect::new(0, 0, 80, 24));
        host.sync(&mut registry);

        let b = registry.get(&id("b")).unwrap().clone();
        let a_before = registry.get(&id("a")).unwrap().position;
        let header = (b.position.x as u16 + 3, b.position.y as u16);

        host.handle_mouse_event(&mut registry, mouse(MouseEventKind::Down(MouseButton::Left), header.0, header.1)).await;
        assert!(host.has_pointer_capture());
        host.handle_mouse_event(&mut registry, mouse(MouseEventKind::Drag(MouseButton::Left), header.0 - 4, header.1 + 2)).await;
        host.handle_mouse_event(&mut registry, mouse(MouseEventKind::Up(MouseButton::Left), header.0 - 4, header.1 + 2)).await;

        assert!(!host.has_pointer_capture());
        assert_eq!(registry.get(&id("b")).unwrap().position, b.position.offset(-4, 2));
        assert_eq!(registry.get(&id("a")).unwrap().position, a_before);
    }

    #[tokio::test]
    async fn test_body_press_does_not_start_drag() {
        let (mut registry, mut host) = setup();
        registry.open("a", DialogKind::Generic, payload("a"), draft());
        host.sync(&mut registry);

        let a = registry.get(&id("a")).unwrap().clone();
        let body = (a.position.x as u16 + 3, a.position.y as u16 + 2);
        assert!(host.handle_mouse_event(&mut registry, mouse(MouseEventKind::Down(MouseButton::Left), body.0, body.1)).await);
        assert!(!host.has_pointer_capture());
    }

    #[tokio::test]
    async fn test_closing_dragged_dialog_releases_capture() {
        let (mut registry, mut host) = setup();
        registry.open("a", DialogKind::Generic, payload("a"), draft());
        host.sync(&mut registry);
        let a = registry.get(&id("a")).unwrap().clone();

        host.handle_mouse_event(&mut registry, mouse(MouseEventKind::Down(MouseButton::Left), a.position.x as u16 + 2, a.position.y as u16)).await;
        assert!(host.has_pointer_capture());

        registry.close(&id("a"));
        host.sync(&mut registry);
        assert!(!host.has_pointer_capture());
    }

    #[tokio::test]
    async fn test_header_buttons_minimize_and_close() {
        let (mut registry, mut host) = setup();
        registry.open("a", DialogKind::Generic, payload("a"), draft());
        host.sync(&mut registry);
        let a = registry.get(&id("a")).unwrap().clone();
        let right = a.position.x as u16 + a.size.width;
        let top = a.position.y as u16;

        host.handle_mouse_event(&mut registry, mouse(MouseEventKind::Down(MouseButton::Left), right - 6, top)).await;
        assert!(!registry.is_open(&id("a")));
        assert!(registry.contains(&id("a")));

        registry.minimize(&id("a"), false);
        host.handle_mouse_event(&mut registry, mouse(MouseEventKind::Down(MouseButton::Left), right - 3, top)).await;
        host.sync(&mut registry);
        assert!(!registry.contains(&id("a")));
        assert!(!host.is_mounted(&id("a")));
    }

    #[tokio::test]
    async fn test_resize_during_drag_leaves_dragged_dialog() {
        let (mut registry, mut host) = setup();
        registry.open("a", DialogKind::Generic, payload("a"), draft());
        registry.open("b", DialogKind::Generic, payload("b"), draft());
        host.sync(&mut registry);
        let b = registry.get(&id("b")).unwrap().clone();

        host.handle_mouse_event(&mut registry, mouse(MouseEventKind::Down(MouseButton::Left), b.position.x as u16 + 2, b.position.y as u16)).await;
        host.set_area(&mut registry, Rect::new(0, 0, 40, 16));

        assert_eq!(registry.get(&id("b")).unwrap().position, b.position);
        let a = registry.get(&id("a")).unwrap();
        assert!(a.position.x + a.size.width as i32 <= 40);
        assert!(a.position.y + a.size.height as i32 <= 15);
    }

    #[tokio::test]
    async fn test_release_after_resize_pulls_dragged_dialog_inside() {
        let (mut registry, mut host) = setup();
        registry.open("a", DialogKind::Generic, payload("a"), draft());
        registry.open("b", DialogKind::Generic, payload("b"), draft());
        host.sync(&mut registry);
        let b = registry.get(&id("b")).unwrap().clone();
        let header = (b.position.x as u16 + 2, b.position.y as u16);

        host.handle_mouse_event(&mut registry, mouse(MouseEventKind::Down(MouseButton::Left), header.0, header.1)).await;
        host.set_area(&mut registry, Rect::new(0, 0, 40, 16));
        host.handle_mouse_event(&mut registry, mouse(MouseEventKind::Up(MouseButton::Left), header.0, header.1)).await;

        assert!(!host.has_pointer_capture());
        let b = registry.get(&id("b")).unwrap();
        assert!(b.position.x >= 0 && b.position.y >= 0);
        assert!(b.position.x + b.size.width as i32 <= 40);
        assert!(b.position.y + b.size.height as i32 <= 15);
    }

    #[tokio::test]
    async fn test_press_during_drag_ends_gesture_and_is_handled() {
        let (mut registry, mut host) = setup();
        registry.open("a", DialogKind::Generic, payload("a"), draft());
        host.sync(&mut registry);
        let a = registry.get(&id("a")).unwrap().clone();
        let right = a.position.x as u16 + a.size.width;
        let top = a.position.y as u16;

        host.handle_mouse_event(&mut registry, mouse(MouseEventKind::Down(MouseButton::Left), a.position.x as u16 + 2, top)).await;
        assert!(host.has_pointer_capture());

        // No release arrives; the next press lands on the close button
        assert!(host.handle_mouse_event(&mut registry, mouse(MouseEventKind::Down(MouseButton::Left), right - 3, top)).await);

        assert!(!host.has_pointer_capture());
        assert!(!registry.contains(&id("a")));
    }

    #[tokio::test]
    async fn test_mounted_content_receives_record_position() {
        let (mut registry, mut host) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let capture = {
            let seen = seen.clone();
            move || -> Arc<dyn ContentFactory> {
                let seen = seen.clone();
                Arc::new(
                    move |context: DialogContext| -> Result<Box<dyn DialogContent>, DialogError> {
                        seen.lock().unwrap().push(context.position);
                        Ok(Box::new(Draft {
                            text: String::new(),
                            payload_updates: 0,
                        }))
                    },
                )
            }
        };

        registry.open("a", DialogKind::Generic, payload("a"), capture());
        let placed = registry.get(&id("a")).unwrap().position;
        host.sync(&mut registry);
        assert_eq!(seen.lock().unwrap()[0], placed);

        registry.move_to(&id("a"), Position::new(5, 3));
        registry.open("a", DialogKind::NoteView, payload("a"), capture());
        host.sync(&mut registry);

        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(seen.lock().unwrap()[1], Position::new(5, 3));
        assert_eq!(registry.get(&id("a")).unwrap().position, Position::new(5, 3));
    }

    #[tokio::test]
    async fn test_absent_records_render_nothing() {
        let (mut registry, mut host) = setup();
        registry.open("a", DialogKind::Generic, payload("a"), draft());
        host.sync(&mut registry);
        registry.close(&id("a"));
        host.sync(&mut registry);

        let screen = draw(&mut host, &registry);
        assert!(!screen.contains("draft:"));
    }
}
