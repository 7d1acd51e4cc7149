use super::{LeadId, MeetingId, NoteId, TaskId};
use chrono::NaiveDateTime;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// Data changes announced by dialogs once a submission succeeds.
///
/// List and timeline views consume these to refresh whatever they cached
/// about the affected lead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    NoteSaved {
        lead_id: LeadId,
        note_id: NoteId,
    },
    MeetingScheduled {
        lead_id: LeadId,
        meeting_id: MeetingId,
        starts_at: NaiveDateTime,
    },
    TaskSaved {
        lead_id: LeadId,
        task_id: TaskId,
    },
    EmailQueued {
        lead_id: Option<LeadId>,
        subject: String,
    },
}

impl DomainEvent {
    pub fn lead_id(&self) -> Option<LeadId> {
        match self {
            Self::NoteSaved { lead_id, .. }
            | Self::MeetingScheduled { lead_id, .. }
            | Self::TaskSaved { lead_id, .. } => Some(*lead_id),
            Self::EmailQueued { lead_id, .. } => *lead_id,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Self::NoteSaved { lead_id, note_id } => {
                format!("Note #{} saved for lead #{}", note_id, lead_id)
            }
            Self::MeetingScheduled { lead_id, starts_at, .. } => format!(
                "Meeting with lead #{} set for {}",
                lead_id,
                starts_at.format("%Y-%m-%d %H:%M")
            ),
            Self::TaskSaved { lead_id, task_id } => {
                format!("Task #{} saved for lead #{}", task_id, lead_id)
            }
            Self::EmailQueued { subject, .. } => format!("Email queued: {}", subject),
        }
    }
}

/// Sending half of the domain event stream
#[derive(Debug, Clone)]
pub struct DomainEvents {
    sender: mpsc::UnboundedSender<DomainEvent>,
}

impl DomainEvents {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: DomainEvent) {
        debug!(?event, "domain event");
        // The receiver only goes away while the app shuts down
        let _ = self.sender.send(event);
    }
}
