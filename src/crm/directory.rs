//! Lead directory: the CRUD collaborator behind the dialogs.
//!
//! The dialog layer only ever sees the [`LeadDirectory`] trait. The one
//! implementation shipped here keeps everything in memory and is seeded
//! either from built-in fixtures or from a JSON file of leads.

use super::{
    EmailDraft, Lead, LeadActivity, LeadId, LeadStage, Meeting, MeetingDraft, MeetingId, Note,
    NoteId, Task, TaskDraft, TaskId,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Lead #{0} not found")]
    LeadNotFound(LeadId),

    #[error("Note #{0} not found")]
    NoteNotFound(NoteId),

    #[error("Meeting #{0} not found")]
    MeetingNotFound(MeetingId),

    #[error("Task #{0} not found")]
    TaskNotFound(TaskId),

    #[error("Failed to read lead file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid lead file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Storage operations the dialogs depend on
#[async_trait]
pub trait LeadDirectory: Send + Sync {
    async fn leads(&self) -> Result<Vec<Lead>, DirectoryError>;

    async fn activity(&self, lead: LeadId) -> Result<LeadActivity, DirectoryError>;

    async fn note(&self, id: NoteId) -> Result<Note, DirectoryError>;

    async fn meeting(&self, id: MeetingId) -> Result<Meeting, DirectoryError>;

    async fn task(&self, id: TaskId) -> Result<Task, DirectoryError>;

    /// Create a note, or replace the body of `existing`
    async fn save_note(
        &self,
        lead: LeadId,
        existing: Option<NoteId>,
        body: String,
    ) -> Result<Note, DirectoryError>;

    /// Create a meeting, or move `existing` to the draft's slot
    async fn schedule_meeting(
        &self,
        lead: LeadId,
        existing: Option<MeetingId>,
        draft: MeetingDraft,
    ) -> Result<Meeting, DirectoryError>;

    async fn save_task(
        &self,
        lead: LeadId,
        existing: Option<TaskId>,
        draft: TaskDraft,
    ) -> Result<Task, DirectoryError>;

    async fn queue_email(&self, lead: Option<LeadId>, draft: EmailDraft)
        -> Result<(), DirectoryError>;
}

#[derive(Debug, Default)]
struct DirectoryState {
    leads: Vec<Lead>,
    notes: HashMap<NoteId, Note>,
    meetings: HashMap<MeetingId, Meeting>,
    tasks: HashMap<TaskId, Task>,
    outbox: Vec<(Option<LeadId>, EmailDraft)>,
    next_id: u64,
}

impl DirectoryState {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn ensure_lead(&self, lead: LeadId) -> Result<(), DirectoryError> {
        if self.leads.iter().any(|l| l.id == lead) {
            Ok(())
        } else {
            Err(DirectoryError::LeadNotFound(lead))
        }
    }
}

/// In-memory directory used for both mock and file-seeded data
pub struct MemoryDirectory {
    state: RwLock<DirectoryState>,
    latency: Duration,
}

impl MemoryDirectory {
    pub fn new(leads: Vec<Lead>) -> Self {
        let next_id = leads.iter().map(|lead| lead.id.0).max().unwrap_or(0) + 100;
        Self {
            state: RwLock::new(DirectoryState {
                leads,
                next_id,
                ..DirectoryState::default()
            }),
            latency: Duration::ZERO,
        }
    }

    /// Simulated round-trip applied to every write
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Built-in sample pipeline
    pub fn fixtures() -> Self {
        let lead = |id: u64, name: &str, company: &str, email: &str, stage: LeadStage| Lead {
            id: LeadId(id),
            name: name.to_string(),
            company: Some(company.to_string()),
            email: Some(email.to_string()),
            stage,
        };

        let mut directory = Self::new(vec![
            lead(1, "Ada Marsh", "Northwind", "ada@northwind.test", LeadStage::Qualified),
            lead(2, "Bo Lindqvist", "Fjord Freight", "bo@fjord.test", LeadStage::Contacted),
            lead(3, "Chidi Okafor", "Lagos Labs", "chidi@lagoslabs.test", LeadStage::New),
            lead(4, "Dana Reyes", "Cactus Cloud", "dana@cactus.test", LeadStage::Proposal),
            lead(5, "Emil Novak", "Brno Bikes", "emil@brnobikes.test", LeadStage::Won),
        ]);

        let state = directory.state.get_mut();
        let now = Utc::now();
        let id = NoteId(state.allocate());
        state.notes.insert(
            id,
            Note {
                id,
                lead_id: LeadId(1),
                body: "Wants a pilot for the Q3 rollout.\nSend pricing sheet.".to_string(),
                created_at: now,
                updated_at: now,
            },
        );
        if let Some(starts_at) =
            NaiveDate::from_ymd_opt(2026, 11, 3).and_then(|day| day.and_hms_opt(14, 30, 0))
        {
            let id = MeetingId(state.allocate());
            state.meetings.insert(
                id,
                Meeting {
                    id,
                    lead_id: LeadId(4),
                    title: "Proposal walkthrough".to_string(),
                    starts_at,
                    duration_minutes: 45,
                },
            );
        }

        directory
    }

    /// Seed from a JSON array of leads
    pub async fn from_file(path: &Path) -> Result<Self, DirectoryError> {
        let content = tokio::fs::read_to_string(path).await?;
        let leads: Vec<Lead> = serde_json::from_str(&content)?;
        info!("Loaded {} leads from {}", leads.len(), path.display());
        Ok(Self::new(leads))
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    pub async fn outbox_len(&self) -> usize {
        self.state.read().await.outbox.len()
    }
}

#[async_trait]
impl LeadDirectory for MemoryDirectory {
    async fn leads(&self) -> Result<Vec<Lead>, DirectoryError> {
        Ok(self.state.read().await.leads.clone())
    }

    async fn activity(&self, lead: LeadId) -> Result<LeadActivity, DirectoryError> {
        let state = self.state.read().await;
        state.ensure_lead(lead)?;

        let mut activity = LeadActivity {
            notes: state.notes.values().filter(|n| n.lead_id == lead).cloned().collect(),
            meetings: state.meetings.values().filter(|m| m.lead_id == lead).cloned().collect(),
            tasks: state.tasks.values().filter(|t| t.lead_id == lead).cloned().collect(),
        };
        activity.notes.sort_by_key(|n| n.id);
        activity.meetings.sort_by_key(|m| m.id);
        activity.tasks.sort_by_key(|t| t.id);
        Ok(activity)
    }

    async fn note(&self, id: NoteId) -> Result<Note, DirectoryError> {
        self.state
            .read()
            .await
            .notes
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::NoteNotFound(id))
    }

    async fn meeting(&self, id: MeetingId) -> Result<Meeting, DirectoryError> {
        self.state
            .read()
            .await
            .meetings
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::MeetingNotFound(id))
    }

    async fn task(&self, id: TaskId) -> Result<Task, DirectoryError> {
        self.state
            .read()
            .await
            .tasks
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::TaskNotFound(id))
    }

    async fn save_note(
        &self,
        lead: LeadId,
        existing: Option<NoteId>,
        body: String,
    ) -> Result<Note, DirectoryError> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        state.ensure_lead(lead)?;
        let now = Utc::now();

        let note = match existing {
            Some(id) => {
                let note = state.notes.get_mut(&id).ok_or(DirectoryError::NoteNotFound(id))?;
                note.body = body;
                note.updated_at = now;
                note.clone()
            }
            None => {
                let id = NoteId(state.allocate());
                let note = Note {
                    id,
                    lead_id: lead,
                    body,
                    created_at: now,
                    updated_at: now,
                };
                state.notes.insert(id, note.clone());
                note
            }
        };
        debug!(note = %note.id, lead = %lead, "note saved");
        Ok(note)
    }

    async fn schedule_meeting(
        &self,
        lead: LeadId,
        existing: Option<MeetingId>,
        draft: MeetingDraft,
    ) -> Result<Meeting, DirectoryError> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        state.ensure_lead(lead)?;

        let id = match existing {
            Some(id) if state.meetings.contains_key(&id) => id,
            Some(id) => return Err(DirectoryError::MeetingNotFound(id)),
            None => MeetingId(state.allocate()),
        };
        let meeting = Meeting {
            id,
            lead_id: lead,
            title: draft.title,
            starts_at: draft.starts_at,
            duration_minutes: draft.duration_minutes,
        };
        state.meetings.insert(id, meeting.clone());
        debug!(meeting = %id, lead = %lead, "meeting scheduled");
        Ok(meeting)
    }

    async fn save_task(
        &self,
        lead: LeadId,
        existing: Option<TaskId>,
        draft: TaskDraft,
    ) -> Result<Task, DirectoryError> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        state.ensure_lead(lead)?;

        let (id, done) = match existing {
            Some(id) => {
                let task = state.tasks.get(&id).ok_or(DirectoryError::TaskNotFound(id))?;
                (id, task.done)
            }
            None => (TaskId(state.allocate()), false),
        };
        let task = Task {
            id,
            lead_id: lead,
            title: draft.title,
            due: draft.due,
            priority: draft.priority,
            done,
        };
        state.tasks.insert(id, task.clone());
        debug!(task = %id, lead = %lead, "task saved");
        Ok(task)
    }

    async fn queue_email(
        &self,
        lead: Option<LeadId>,
        draft: EmailDraft,
    ) -> Result<(), DirectoryError> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        if let Some(lead) = lead {
            state.ensure_lead(lead)?;
        }
        debug!(to = %draft.to, "email queued");
        state.outbox.push((lead, draft));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_fixtures_have_leads_and_activity() {
        let directory = MemoryDirectory::fixtures();
        let leads = directory.leads().await.unwrap();
        assert_eq!(leads.len(), 5);

        let activity = directory.activity(LeadId(1)).await.unwrap();
        assert_eq!(activity.notes.len(), 1);
        assert!(activity.latest_note().is_some());
    }

    #[tokio::test]
    async fn test_save_note_creates_then_updates() {
        let directory = MemoryDirectory::fixtures();
        let created = directory
            .save_note(LeadId(2), None, "first".to_string())
            .await
            .unwrap();
        let updated = directory
            .save_note(LeadId(2), Some(created.id), "second".to_string())
            .await
            .unwrap();

        assert_eq!(created.id, updated.id);
        assert_eq!(directory.note(created.id).await.unwrap().body, "second");
        assert_eq!(directory.activity(LeadId(2)).await.unwrap().notes.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_lead_is_rejected() {
        let directory = MemoryDirectory::fixtures();
        let result = directory.save_note(LeadId(999), None, "x".to_string()).await;
        assert!(matches!(result, Err(DirectoryError::LeadNotFound(LeadId(999)))));
    }

    #[tokio::test]
    async fn test_from_file_reads_lead_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": 7, "name": "Grace Hopper", "email": "grace@navy.test", "stage": "won"}}]"#
        )
        .unwrap();

        let directory = MemoryDirectory::from_file(file.path()).await.unwrap();
        let leads = directory.leads().await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].id, LeadId(7));
        assert_eq!(leads[0].stage, LeadStage::Won);
        assert_eq!(leads[0].company, None);
    }

    #[tokio::test]
    async fn test_from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let result = MemoryDirectory::from_file(file.path()).await;
        assert!(matches!(result, Err(DirectoryError::Parse(_))));
    }
}
