//! Email composer. Several can be open at once, each with its own draft.

use super::form::{is_submit, split_status, Field, FieldSet, SubmitState, ValidationError};
use super::submit;
use crate::crm::{DomainEvent, EmailDraft, LeadDirectory, LeadRef};
use crate::tui::components::dialogs::managers::DialogCallbacks;
use crate::tui::components::dialogs::types::*;
use crate::tui::{styles::Theme, Frame};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Rect;
use std::sync::Arc;

const TO: usize = 0;
const SUBJECT: usize = 1;
const BODY: usize = 2;

pub fn create(
    context: DialogContext,
    directory: Arc<dyn LeadDirectory>,
    callbacks: DialogCallbacks,
) -> Result<Box<dyn DialogContent>, DialogError> {
    match &context.payload {
        DialogPayload::Generic(payload) => Ok(Box::new(EmailComposer::new(
            payload.title.clone(),
            payload.lead.clone(),
            directory,
            callbacks,
        ))),
        _ => Err(DialogError::PayloadMismatch(context.id.clone(), context.kind)),
    }
}

pub fn parse_email(to: &str, subject: &str, body: &str) -> Result<EmailDraft, ValidationError> {
    let to = to.trim();
    if to.is_empty() {
        return Err(ValidationError::Required("To"));
    }
    let valid_address = to
        .split_once('@')
        .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
    if !valid_address {
        return Err(ValidationError::Format {
            field: "To",
            expected: "name@example.com",
        });
    }

    let subject = subject.trim();
    if subject.is_empty() {
        return Err(ValidationError::Required("Subject"));
    }

    Ok(EmailDraft {
        to: to.to_string(),
        subject: subject.to_string(),
        body: body.trim_end().to_string(),
    })
}

pub struct EmailComposer {
    title: String,
    lead: Option<LeadRef>,
    fields: FieldSet,
    state: SubmitState,
    directory: Arc<dyn LeadDirectory>,
    callbacks: DialogCallbacks,
}

impl EmailComposer {
    pub fn new(
        title: String,
        lead: Option<LeadRef>,
        directory: Arc<dyn LeadDirectory>,
        callbacks: DialogCallbacks,
    ) -> Self {
        let to = lead.as_ref().and_then(|lead| lead.email.clone()).unwrap_or_default();
        let mut fields = FieldSet::new(vec![
            Field::single("To", &to, "name@example.com"),
            Field::single("Subject", "", "Following up"),
            Field::multiline("Body", "", ""),
        ]);
        if !to.is_empty() {
            fields.focus_next();
        }
        Self {
            title,
            lead,
            fields,
            state: SubmitState::default(),
            directory,
            callbacks,
        }
    }

    fn submit(&mut self) {
        let draft = match parse_email(
            &self.fields.value(TO),
            &self.fields.value(SUBJECT),
            &self.fields.get(BODY).map(Field::value).unwrap_or_default(),
        ) {
            Ok(draft) => draft,
            Err(error) => {
                self.state.fail(error.to_string());
                return;
            }
        };

        let directory = Arc::clone(&self.directory);
        let lead_id = self.lead.as_ref().map(|lead| lead.id);
        submit(&mut self.state, self.callbacks.clone(), async move {
            let subject = draft.subject.clone();
            directory.queue_email(lead_id, draft).await?;
            Ok(DomainEvent::EmailQueued { lead_id, subject })
        });
    }
}

#[async_trait]
impl DialogContent for EmailComposer {
    fn title(&self) -> String {
        let subject = self.fields.value(SUBJECT);
        if subject.is_empty() {
            self.title.clone()
        } else {
            format!("{} · {}", self.title, subject)
        }
    }

    fn preferred_size(&self) -> Option<Size> {
        Some(Size::new(64, 18))
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        self.state.poll();
        let (fields, status) = split_status(area);
        self.fields.render(frame, fields, theme);
        self.state.render(frame, status, theme, "Tab next · Ctrl-S send · Esc close");
    }

    async fn handle_key_event(&mut self, event: KeyEvent) -> Result<()> {
        self.state.poll();
        if self.state.is_pending() {
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
        self.state.poll();
        Ok(())
    }
}
