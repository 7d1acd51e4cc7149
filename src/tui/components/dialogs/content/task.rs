//! Task editor for new and existing tasks

use super::form::{is_submit, split_status, Field, FieldSet, SubmitState, ValidationError};
use super::{submit, Loadable};
use crate::crm::{DomainEvent, LeadDirectory, LeadRef, Task, TaskDraft, TaskId, TaskPriority};
use crate::tui::components::dialogs::managers::DialogCallbacks;
use crate::tui::components::dialogs::types::*;
use crate::tui::{styles::Theme, Frame};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Rect;
use std::sync::Arc;

pub const DUE_FORMAT: &str = "%Y-%m-%d";

const TITLE: usize = 0;
const DUE: usize = 1;
const PRIORITY: usize = 2;

pub fn create(
    context: DialogContext,
    directory: Arc<dyn LeadDirectory>,
    callbacks: DialogCallbacks,
) -> Result<Box<dyn DialogContent>, DialogError> {
    let DialogPayload::Task(payload) = &context.payload else {
        return Err(DialogError::PayloadMismatch(context.id.clone(), context.kind));
    };

    let task = match (context.kind, payload.task) {
        (DialogKind::TaskAdd, _) => None,
        (DialogKind::TaskEdit, Some(task)) => Some(task.id),
        _ => return Err(DialogError::PayloadMismatch(context.id.clone(), context.kind)),
    };
    Ok(Box::new(TaskEditor::new(payload.lead.clone(), task, directory, callbacks)))
}

/// Turn raw form input into a task draft. An empty due date means none.
pub fn parse_task(title: &str, due: &str, priority: &str) -> Result<TaskDraft, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::Required("Title"));
    }

    let due = due.trim();
    let due = if due.is_empty() {
        None
    } else {
        Some(NaiveDate::parse_from_str(due, DUE_FORMAT).map_err(|_| ValidationError::Format {
            field: "Due",
            expected: "2026-01-31",
        })?)
    };

    let priority = TaskPriority::parse(priority).ok_or(ValidationError::Format {
        field: "Priority",
        expected: "low, normal or high",
    })?;

    Ok(TaskDraft {
        title: title.to_string(),
        due,
        priority,
    })
}

pub struct TaskEditor {
    lead: LeadRef,
    task: Option<TaskId>,
    existing: Option<Loadable<Task>>,
    fields: FieldSet,
    state: SubmitState,
    directory: Arc<dyn LeadDirectory>,
    callbacks: DialogCallbacks,
}

impl TaskEditor {
    pub fn new(
        lead: LeadRef,
        task: Option<TaskId>,
        directory: Arc<dyn LeadDirectory>,
        callbacks: DialogCallbacks,
    ) -> Self {
        let existing = task.map(|id| {
            let directory = Arc::clone(&directory);
            Loadable::spawn(callbacks.guard(), async move { directory.task(id).await })
        });
        Self {
            lead,
            task,
            existing,
            fields: FieldSet::new(vec![
                Field::single("Title", "", "Send contract"),
                Field::single("Due", "", "YYYY-MM-DD (optional)"),
                Field::single("Priority", TaskPriority::default().label(), "low / normal / high"),
            ]),
            state: SubmitState::default(),
            directory,
            callbacks,
        }
    }

    fn refresh(&mut self) {
        self.state.poll();
        let Some(existing) = self.existing.as_mut() else {
            return;
        };
        if let Some(task) = existing.poll() {
            let due = task
                .due
                .map(|due| due.format(DUE_FORMAT).to_string())
                .unwrap_or_default();
            let values = [
                (TITLE, task.title.clone()),
                (DUE, due),
                (PRIORITY, task.priority.label().to_string()),
            ];
            for (index, value) in values {
                if let Some(field) = self.fields.get_mut(index) {
                    field.set_value(&value);
                }
            }
        }
    }

    fn submit(&mut self) {
        let draft = match parse_task(
            &self.fields.value(TITLE),
            &self.fields.value(DUE),
            &self.fields.value(PRIORITY),
        ) {
            Ok(draft) => draft,
            Err(error) => {
                self.state.fail(error.to_string());
                return;
            }
        };

        let directory = Arc::clone(&self.directory);
        let lead_id = self.lead.id;
        let existing = self.task;
        submit(&mut self.state, self.callbacks.clone(), async move {
            let task = directory.save_task(lead_id, existing, draft).await?;
            Ok(DomainEvent::TaskSaved {
                lead_id: task.lead_id,
                task_id: task.id,
            })
        });
    }
}

#[async_trait]
impl DialogContent for TaskEditor {
    fn title(&self) -> String {
        match self.task {
            Some(id) => format!("Edit task #{} · {}", id, self.lead.name),
            None => format!("New task · {}", self.lead.name),
        }
    }

    fn preferred_size(&self) -> Option<Size> {
        Some(Size::new(50, self.fields.height() + 3))
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
        self.state.render(frame, status, theme, "Tab next · Enter save · Esc close");
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
