//! Note composer, viewer and editor

use super::form::{is_submit, split_status, Field, FieldSet, SubmitState, ValidationError};
use super::{submit, Loadable};
use crate::crm::{DomainEvent, LeadDirectory, LeadRef, Note, NoteId};
use crate::tui::components::dialogs::managers::DialogCallbacks;
use crate::tui::components::dialogs::types::*;
use crate::tui::{styles::Theme, Frame};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};
use std::sync::Arc;

/// Build the content for a note dialog from its kind and payload
pub fn create(
    context: DialogContext,
    directory: Arc<dyn LeadDirectory>,
    callbacks: DialogCallbacks,
) -> Result<Box<dyn DialogContent>, DialogError> {
    let DialogPayload::Note(payload) = &context.payload else {
        return Err(DialogError::PayloadMismatch(context.id.clone(), context.kind));
    };
    let lead = payload.lead.clone();

    match (context.kind, payload.note) {
        (DialogKind::NoteAdd, _) => Ok(Box::new(NoteComposer::new(lead, None, directory, callbacks))),
        (DialogKind::NoteEdit, Some(note)) => Ok(Box::new(NoteComposer::new(
            lead,
            Some(note.id),
            directory,
            callbacks,
        ))),
        (DialogKind::NoteView, Some(note)) => {
            Ok(Box::new(NoteViewer::new(lead, note.id, directory, callbacks)))
        }
        _ => Err(DialogError::PayloadMismatch(context.id.clone(), context.kind)),
    }
}

pub fn validate_note(body: &str) -> Result<String, ValidationError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ValidationError::Required("Note"));
    }
    Ok(body.to_string())
}

/// Writes a new note or rewrites an existing one
pub struct NoteComposer {
    lead: LeadRef,
    note: Option<NoteId>,
    existing: Option<Loadable<Note>>,
    fields: FieldSet,
    state: SubmitState,
    directory: Arc<dyn LeadDirectory>,
    callbacks: DialogCallbacks,
}

impl NoteComposer {
    pub fn new(
        lead: LeadRef,
        note: Option<NoteId>,
        directory: Arc<dyn LeadDirectory>,
        callbacks: DialogCallbacks,
    ) -> Self {
        let existing = note.map(|id| {
            let directory = Arc::clone(&directory);
            Loadable::spawn(callbacks.guard(), async move { directory.note(id).await })
        });
        Self {
            lead,
            note,
            existing,
            fields: FieldSet::new(vec![Field::multiline("Note", "", "What happened?")]),
            state: SubmitState::default(),
            directory,
            callbacks,
        }
    }

    fn refresh(&mut self) {
        self.state.poll();
        if let Some(existing) = self.existing.as_mut() {
            if let Some(note) = existing.poll() {
                if let Some(field) = self.fields.get_mut(0) {
                    field.set_value(&note.body);
                }
            }
        }
    }

    fn submit(&mut self) {
        let body = match validate_note(&self.fields.value(0)) {
            Ok(body) => body,
            Err(error) => {
                self.state.fail(error.to_string());
                return;
            }
        };

        let directory = Arc::clone(&self.directory);
        let lead_id = self.lead.id;
        let existing = self.note;
        submit(&mut self.state, self.callbacks.clone(), async move {
            let note = directory.save_note(lead_id, existing, body).await?;
            Ok(DomainEvent::NoteSaved {
                lead_id: note.lead_id,
                note_id: note.id,
            })
        });
    }
}

#[async_trait]
impl DialogContent for NoteComposer {
    fn title(&self) -> String {
        match self.note {
            Some(id) => format!("Edit note #{} · {}", id, self.lead.name),
            None => format!("New note · {}", self.lead.name),
        }
    }

    fn preferred_size(&self) -> Option<Size> {
        Some(Size::new(56, 14))
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        self.refresh();
        if let Some(existing) = &self.existing {
            if existing.render_pending(frame, area, theme) {
                return;
            }
        }
        let (fields, status) = split_status(area);
        self.fields.render(frame, fields, theme);
        self.state.render(frame, status, theme, "Ctrl-S save · Esc close");
    }

    async fn handle_key_event(&mut self, event: KeyEvent) -> Result<()> {
        self.refresh();
        if self.state.is_pending() || self.existing.as_ref().is_some_and(Loadable::is_loading) {
            return Ok(());
        }
        if event.code == KeyCode::Esc {
            self.callbacks.close();
        } else if is_submit(&event, &self.fields) {
            self.submit();
        } else {
            self.fields.handle_key(event);
        }
        Ok(())
    }

    async fn tick(&mut self) -> Result<()> {
        self.refresh();
        Ok(())
    }
}

/// Read-only note display; `e` switches the same dialog into the editor
pub struct NoteViewer {
    lead: LeadRef,
    note: NoteId,
    loaded: Loadable<Note>,
    scroll: u16,
    directory: Arc<dyn LeadDirectory>,
    callbacks: DialogCallbacks,
}

impl NoteViewer {
    pub fn new(
        lead: LeadRef,
        note: NoteId,
        directory: Arc<dyn LeadDirectory>,
        callbacks: DialogCallbacks,
    ) -> Self {
        let loaded = Self::load(&directory, &callbacks, note);
        Self {
            lead,
            note,
            loaded,
            scroll: 0,
            directory,
            callbacks,
        }
    }

    fn load(directory: &Arc<dyn LeadDirectory>, callbacks: &DialogCallbacks, note: NoteId) -> Loadable<Note> {
        let directory = Arc::clone(directory);
        Loadable::spawn(callbacks.guard(), async move { directory.note(note).await })
    }
}

#[async_trait]
impl DialogContent for NoteViewer {
    fn title(&self) -> String {
        format!("Note #{} · {}", self.note, self.lead.name)
    }

    fn preferred_size(&self) -> Option<Size> {
        Some(Size::new(56, 12))
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        self.loaded.poll();
        if self.loaded.render_pending(frame, area, theme) {
            return;
        }
        let Some(note) = self.loaded.ready() else {
            return;
        };

        let (body, status) = split_status(area);
        let mut lines = vec![Line::from(Span::styled(
            format!("Updated {}", note.updated_at.format("%Y-%m-%d %H:%M")),
            theme.placeholder_style(),
        ))];
        lines.push(Line::from(""));
        lines.extend(note.body.lines().map(|line| Line::from(line.to_string())));

        frame.render_widget(
            Paragraph::new(lines)
                .style(theme.text_style())
                .wrap(Wrap { trim: false })
                .scroll((self.scroll, 0)),
            body,
        );
        frame.render_widget(
            Paragraph::new(Span::styled("e edit · ↑↓ scroll · Esc close", theme.placeholder_style())),
            status,
        );
    }

    async fn handle_key_event(&mut self, event: KeyEvent) -> Result<()> {
        match event.code {
            KeyCode::Char('e') => self.callbacks.change_kind(DialogKind::NoteEdit),
            KeyCode::Esc => self.callbacks.close(),
            KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
            _ => {}
        }
        Ok(())
    }

    fn update_payload(&mut self, payload: &DialogPayload) {
        if let DialogPayload::Note(payload) = payload {
            self.lead = payload.lead.clone();
        }
        // Reopening a viewer shows the latest saved body
        self.loaded = Self::load(&self.directory, &self.callbacks, self.note);
        self.scroll = 0;
    }

    async fn tick(&mut self) -> Result<()> {
        self.loaded.poll();
        Ok(())
    }
}
