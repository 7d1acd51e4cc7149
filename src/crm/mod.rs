//! Lead, note, meeting and task records plus the data collaborators the
//! dialog layer talks to.
//!
//! Nothing in here knows about dialogs. Dialog payloads only carry the
//! reference types (`LeadRef`, `NoteRef`, ...) and content components
//! fetch the current state through a [`LeadDirectory`].

pub mod directory;
pub mod events;

pub use directory::{DirectoryError, LeadDirectory, MemoryDirectory};
pub use events::{DomainEvent, DomainEvents};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(LeadId);
entity_id!(NoteId);
entity_id!(MeetingId);
entity_id!(TaskId);

/// Pipeline stage of a lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStage {
    #[default]
    New,
    Contacted,
    Qualified,
    Proposal,
    Won,
    Lost,
}

impl LeadStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Proposal => "proposal",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub stage: LeadStage,
}

impl Lead {
    pub fn to_ref(&self) -> LeadRef {
        LeadRef {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Reference to a lead carried inside dialog payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRef {
    pub id: LeadId,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRef {
    pub id: NoteId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRef {
    pub id: MeetingId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: TaskId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub lead_id: LeadId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub lead_id: LeadId,
    pub title: String,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl TaskPriority {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Some(Self::Low),
            "" | "normal" | "n" => Some(Self::Normal),
            "high" | "h" => Some(Self::High),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub lead_id: LeadId,
    pub title: String,
    pub due: Option<NaiveDate>,
    pub priority: TaskPriority,
    pub done: bool,
}

/// Validated meeting form input
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingDraft {
    pub title: String,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: u32,
}

/// Validated task form input
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub due: Option<NaiveDate>,
    pub priority: TaskPriority,
}

/// Validated email form input
#[derive(Debug, Clone, PartialEq)]
pub struct EmailDraft {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Notes, meetings and tasks attached to one lead, newest last
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadActivity {
    pub notes: Vec<Note>,
    pub meetings: Vec<Meeting>,
    pub tasks: Vec<Task>,
}

impl LeadActivity {
    pub fn latest_note(&self) -> Option<&Note> {
        self.notes.iter().max_by_key(|note| (note.updated_at, note.id))
    }

    pub fn next_meeting(&self) -> Option<&Meeting> {
        self.meetings.iter().max_by_key(|meeting| (meeting.starts_at, meeting.id))
    }

    pub fn open_task(&self) -> Option<&Task> {
        self.tasks.iter().filter(|task| !task.done).max_by_key(|task| task.id)
    }
}
