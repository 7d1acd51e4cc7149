//! Meeting scheduler, also used to reschedule an existing meeting

use super::form::{is_submit, split_status, Field, FieldSet, SubmitState, ValidationError};
use super::{submit, Loadable};
use crate::crm::{DomainEvent, LeadDirectory, LeadRef, Meeting, MeetingDraft, MeetingId};
use crate::tui::components::dialogs::managers::DialogCallbacks;
use crate::tui::components::dialogs::types::*;
use crate::tui::{styles::Theme, Frame};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Rect;
use std::sync::Arc;

pub const STARTS_AT_FORMAT: &str = "%Y-%m-%d %H:%M";
const MIN_DURATION: u32 = 5;
const MAX_DURATION: u32 = 480;

const TITLE: usize = 0;
const STARTS_AT: usize = 1;
const DURATION: usize = 2;

pub fn create(
    context: DialogContext,
    directory: Arc<dyn LeadDirectory>,
    callbacks: DialogCallbacks,
) -> Result<Box<dyn DialogContent>, DialogError> {
    let DialogPayload::Meeting(payload) = &context.payload else {
        return Err(DialogError::PayloadMismatch(context.id.clone(), context.kind));
    };

    match (context.kind, payload.meeting) {
        (DialogKind::MeetingSchedule, _) => Ok(Box::new(MeetingScheduler::new(
            payload.lead.clone(),
            None,
            directory,
            callbacks,
        ))),
        (DialogKind::MeetingReschedule, Some(meeting)) => Ok(Box::new(MeetingScheduler::new(
            payload.lead.clone(),
            Some(meeting.id),
            directory,
            callbacks,
        ))),
        _ => Err(DialogError::PayloadMismatch(context.id.clone(), context.kind)),
    }
}

/// Turn raw form input into a meeting draft
pub fn parse_meeting(title: &str, starts_at: &str, duration: &str) -> Result<MeetingDraft, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::Required("Title"));
    }

    let starts_at = starts_at.trim();
    if starts_at.is_empty() {
        return Err(ValidationError::Required("Start"));
    }
    let starts_at = NaiveDateTime::parse_from_str(starts_at, STARTS_AT_FORMAT).map_err(|_| {
        ValidationError::Format {
            field: "Start",
            expected: "2026-01-31 14:30",
        }
    })?;

    let duration = duration.trim();
    let duration_minutes = if duration.is_empty() {
        30
    } else {
        duration.parse::<u32>().map_err(|_| ValidationError::Format {
            field: "Duration",
            expected: "45",
        })?
    };
    if !(MIN_DURATION..=MAX_DURATION).contains(&duration_minutes) {
        return Err(ValidationError::OutOfRange {
            field: "Duration",
            min: MIN_DURATION,
            max: MAX_DURATION,
        });
    }

    Ok(MeetingDraft {
        title: title.to_string(),
        starts_at,
        duration_minutes,
    })
}

pub struct MeetingScheduler {
    lead: LeadRef,
    meeting: Option<MeetingId>,
    existing: Option<Loadable<Meeting>>,
    fields: FieldSet,
    state: SubmitState,
    directory: Arc<dyn LeadDirectory>,
    callbacks: DialogCallbacks,
}

impl MeetingScheduler {
    pub fn new(
        lead: LeadRef,
        meeting: Option<MeetingId>,
        directory: Arc<dyn LeadDirectory>,
        callbacks: DialogCallbacks,
    ) -> Self {
        let existing = meeting.map(|id| {
            let directory = Arc::clone(&directory);
            Loadable::spawn(callbacks.guard(), async move { directory.meeting(id).await })
        });
        let fields = FieldSet::new(vec![
            Field::single("Title", "", "Intro call"),
            Field::single("Start", "", "YYYY-MM-DD HH:MM"),
            Field::single("Duration (min)", "30", "30"),
        ]);
        Self {
            lead,
            meeting,
            existing,
            fields,
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
        if let Some(meeting) = existing.poll() {
            let values = [
                (TITLE, meeting.title.clone()),
                (STARTS_AT, meeting.starts_at.format(STARTS_AT_FORMAT).to_string()),
                (DURATION, meeting.duration_minutes.to_string()),
            ];
            for (index, value) in values {
                if let Some(field) = self.fields.get_mut(index) {
                    field.set_value(&value);
                }
            }
        }
    }

    fn submit(&mut self) {
        let draft = match parse_meeting(
            &self.fields.value(TITLE),
            &self.fields.value(STARTS_AT),
            &self.fields.value(DURATION),
        ) {
            Ok(draft) => draft,
            Err(error) => {
                self.state.fail(error.to_string());
                return;
            }
        };

        let directory = Arc::clone(&self.directory);
        let lead_id = self.lead.id;
        let existing = self.meeting;
        submit(&mut self.state, self.callbacks.clone(), async move {
            let meeting = directory.schedule_meeting(lead_id, existing, draft).await?;
            Ok(DomainEvent::MeetingScheduled {
                lead_id: meeting.lead_id,
                meeting_id: meeting.id,
                starts_at: meeting.starts_at,
            })
        });
    }
}

#[async_trait]
impl DialogContent for MeetingScheduler {
    fn title(&self) -> String {
        match self.meeting {
            Some(id) => format!("Reschedule meeting #{} · {}", id, self.lead.name),
            None => format!("Schedule meeting · {}", self.lead.name),
        }
    }

    fn preferred_size(&self) -> Option<Size> {
        // three bordered inputs, a status row and the frame
        Some(Size::new(52, self.fields.height() + 3))
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

#[cfg(test)]
mod tests {
    use super::super::testing::{key, lead, settle, typed, Harness};
    use super::*;
    use crate::crm::{LeadId, MeetingRef, MemoryDirectory};
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 11, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn payload(lead_id: u64, meeting: Option<MeetingId>) -> DialogPayload {
        DialogPayload::Meeting(MeetingPayload {
            lead: lead(lead_id),
            meeting: meeting.map(|id| MeetingRef { id }),
        })
    }

    #[test]
    fn test_parse_meeting_accepts_valid_input() {
        let draft = parse_meeting(" Demo ", "2026-11-03 09:15", "").unwrap();
        assert_eq!(draft.title, "Demo");
        assert_eq!(draft.starts_at, at(3, 9, 15));
        assert_eq!(draft.duration_minutes, 30);
    }

    #[test]
    fn test_parse_meeting_rejects_bad_input() {
        assert_eq!(
            parse_meeting("", "2026-11-03 09:15", "30"),
            Err(ValidationError::Required("Title"))
        );
        assert!(matches!(
            parse_meeting("Demo", "tomorrow", "30"),
            Err(ValidationError::Format { field: "Start", .. })
        ));
        assert!(matches!(
            parse_meeting("Demo", "2026-11-03 09:15", "ninety"),
            Err(ValidationError::Format { field: "Duration", .. })
        ));
        assert!(matches!(
            parse_meeting("Demo", "2026-11-03 09:15", "600"),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_schedule_emits_meeting_event() {
        let mut harness = Harness::new("meeting-schedule-2", DialogKind::MeetingSchedule, payload(2, None));
        let directory: Arc<dyn LeadDirectory> = Arc::new(MemoryDirectory::fixtures());
        let mut scheduler = create(harness.context.clone(), directory, harness.callbacks.clone()).unwrap();

        for event in typed("Kickoff") {
            scheduler.handle_key_event(event).await.unwrap();
        }
        scheduler.handle_key_event(key(KeyCode::Tab)).await.unwrap();
        for event in typed("2026-11-05 10:00") {
            scheduler.handle_key_event(event).await.unwrap();
        }
        scheduler.handle_key_event(key(KeyCode::Enter)).await.unwrap();

        let event = harness.next_event().await.unwrap();
        assert!(matches!(
            event,
            DomainEvent::MeetingScheduled { lead_id: LeadId(2), starts_at, .. } if starts_at == at(5, 10, 0)
        ));
        assert_eq!(
            harness.next_command().await,
            Some(DialogCommand::Close(DialogId::from("meeting-schedule-2")))
        );
    }

    #[tokio::test]
    async fn test_reschedule_prefills_and_keeps_id() {
        let harness = Harness::new("meeting-107", DialogKind::MeetingReschedule, payload(4, Some(MeetingId(107))));
        let directory: Arc<dyn LeadDirectory> = Arc::new(MemoryDirectory::fixtures());
        let mut scheduler = MeetingScheduler::new(lead(4), Some(MeetingId(107)), directory, harness.callbacks.clone());

        settle(|| {
            scheduler.refresh();
            scheduler.existing.as_ref().is_some_and(|e| !e.is_loading())
        })
        .await;

        assert_eq!(scheduler.fields.value(TITLE), "Proposal walkthrough");
        assert_eq!(scheduler.fields.value(STARTS_AT), "2026-11-03 14:30");
        assert_eq!(scheduler.fields.value(DURATION), "45");
    }
}
