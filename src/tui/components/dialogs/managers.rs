//! Domain bindings on top of the generic registry.
//!
//! Each manager knows how to derive a dialog id and payload for one kind of
//! CRM entity, which content to mount for it, and how a successful
//! submission is announced. Singleton actions use deterministic ids so a
//! second request refocuses the live dialog; stackable dialogs draw ids from
//! the [`IdAllocator`].

use super::content::{email, meeting, note, task};
use super::registry::DialogRegistry;
use super::types::*;
use crate::crm::{
    DomainEvent, DomainEvents, LeadDirectory, LeadId, LeadRef, MeetingId, MeetingRef, NoteId,
    NoteRef, TaskId, TaskRef,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// What content gets back from its manager to report an outcome
#[derive(Debug, Clone)]
pub struct DialogCallbacks {
    handle: DialogHandle,
    guard: MountGuard,
    events: DomainEvents,
}

impl DialogCallbacks {
    pub fn new(context: &DialogContext, events: DomainEvents) -> Self {
        Self {
            handle: context.handle.clone(),
            guard: context.guard.clone(),
            events,
        }
    }

    /// Announce the change, then close the dialog if it is still mounted.
    /// The event goes out even when the dialog is already gone; the data
    /// changed either way.
    pub fn succeed(&self, event: DomainEvent) {
        self.events.emit(event);
        if self.guard.is_mounted() {
            self.handle.close();
        }
    }

    pub fn close(&self) {
        if self.guard.is_mounted() {
            self.handle.close();
        }
    }

    pub fn minimize(&self) {
        if self.guard.is_mounted() {
            self.handle.minimize(true);
        }
    }

    pub fn change_kind(&self, kind: DialogKind) {
        if self.guard.is_mounted() {
            self.handle.change_kind(kind);
        }
    }

    pub fn guard(&self) -> &MountGuard {
        &self.guard
    }
}

/// Source of ids for dialogs that may be open several times at once
#[derive(Debug, Clone, Default)]
pub struct IdAllocator;

impl IdAllocator {
    pub fn new() -> Self {
        Self
    }

    pub fn allocate(&self, prefix: &str) -> DialogId {
        DialogId(format!("{}-{}", prefix, Uuid::new_v4()))
    }
}

pub struct NoteDialogs {
    directory: Arc<dyn LeadDirectory>,
    events: DomainEvents,
}

impl NoteDialogs {
    pub fn new(directory: Arc<dyn LeadDirectory>, events: DomainEvents) -> Self {
        Self { directory, events }
    }

    pub fn add_id(lead: LeadId) -> DialogId {
        DialogId(format!("note-add-{}", lead))
    }

    /// Shared by the viewer and the editor of one note
    pub fn note_id(note: NoteId) -> DialogId {
        DialogId(format!("note-{}", note))
    }

    pub fn open_add_note(&self, registry: &mut DialogRegistry, lead: &LeadRef) -> DialogId {
        let id = Self::add_id(lead.id);
        let payload = DialogPayload::Note(NotePayload {
            lead: lead.clone(),
            note: None,
        });
        registry.open(id.clone(), DialogKind::NoteAdd, payload, self.factory());
        id
    }

    pub fn open_view_note(&self, registry: &mut DialogRegistry, lead: &LeadRef, note: NoteRef) -> DialogId {
        self.open_existing(registry, lead, note, DialogKind::NoteView)
    }

    pub fn open_edit_note(&self, registry: &mut DialogRegistry, lead: &LeadRef, note: NoteRef) -> DialogId {
        self.open_existing(registry, lead, note, DialogKind::NoteEdit)
    }

    fn open_existing(
        &self,
        registry: &mut DialogRegistry,
        lead: &LeadRef,
        note: NoteRef,
        kind: DialogKind,
    ) -> DialogId {
        let id = Self::note_id(note.id);
        let payload = DialogPayload::Note(NotePayload {
            lead: lead.clone(),
            note: Some(note),
        });
        registry.open(id.clone(), kind, payload, self.factory());
        id
    }

    fn factory(&self) -> Arc<dyn ContentFactory> {
        let directory = Arc::clone(&self.directory);
        let events = self.events.clone();
        Arc::new(
            move |context: DialogContext| -> Result<Box<dyn DialogContent>, DialogError> {
                let callbacks = DialogCallbacks::new(&context, events.clone());
                note::create(context, Arc::clone(&directory), callbacks)
            },
        )
    }
}

pub struct MeetingDialogs {
    directory: Arc<dyn LeadDirectory>,
    events: DomainEvents,
}

impl MeetingDialogs {
    pub fn new(directory: Arc<dyn LeadDirectory>, events: DomainEvents) -> Self {
        Self { directory, events }
    }

    pub fn schedule_id(lead: LeadId) -> DialogId {
        DialogId(format!("meeting-schedule-{}", lead))
    }

    pub fn meeting_id(meeting: MeetingId) -> DialogId {
        DialogId(format!("meeting-{}", meeting))
    }

    pub fn open_schedule_meeting(&self, registry: &mut DialogRegistry, lead: &LeadRef) -> DialogId {
        let id = Self::schedule_id(lead.id);
        let payload = DialogPayload::Meeting(MeetingPayload {
            lead: lead.clone(),
            meeting: None,
        });
        registry.open(id.clone(), DialogKind::MeetingSchedule, payload, self.factory());
        id
    }

    pub fn open_reschedule_meeting(
        &self,
        registry: &mut DialogRegistry,
        lead: &LeadRef,
        meeting: MeetingRef,
    ) -> DialogId {
        let id = Self::meeting_id(meeting.id);
        let payload = DialogPayload::Meeting(MeetingPayload {
            lead: lead.clone(),
            meeting: Some(meeting),
        });
        registry.open(id.clone(), DialogKind::MeetingReschedule, payload, self.factory());
        id
    }

    fn factory(&self) -> Arc<dyn ContentFactory> {
        let directory = Arc::clone(&self.directory);
        let events = self.events.clone();
        Arc::new(
            move |context: DialogContext| -> Result<Box<dyn DialogContent>, DialogError> {
                let callbacks = DialogCallbacks::new(&context, events.clone());
                meeting::create(context, Arc::clone(&directory), callbacks)
            },
        )
    }
}

pub struct TaskDialogs {
    directory: Arc<dyn LeadDirectory>,
    events: DomainEvents,
}

impl TaskDialogs {
    pub fn new(directory: Arc<dyn LeadDirectory>, events: DomainEvents) -> Self {
        Self { directory, events }
    }

    pub fn add_id(lead: LeadId) -> DialogId {
        DialogId(format!("task-add-{}", lead))
    }

    pub fn task_id(task: TaskId) -> DialogId {
        DialogId(format!("task-{}", task))
    }

    pub fn open_add_task(&self, registry: &mut DialogRegistry, lead: &LeadRef) -> DialogId {
        let id = Self::add_id(lead.id);
        let payload = DialogPayload::Task(TaskPayload {
            lead: lead.clone(),
            task: None,
        });
        registry.open(id.clone(), DialogKind::TaskAdd, payload, self.factory());
        id
    }

    pub fn open_edit_task(&self, registry: &mut DialogRegistry, lead: &LeadRef, task: TaskRef) -> DialogId {
        let id = Self::task_id(task.id);
        let payload = DialogPayload::Task(TaskPayload {
            lead: lead.clone(),
            task: Some(task),
        });
        registry.open(id.clone(), DialogKind::TaskEdit, payload, self.factory());
        id
    }

    fn factory(&self) -> Arc<dyn ContentFactory> {
        let directory = Arc::clone(&self.directory);
        let events = self.events.clone();
        Arc::new(
            move |context: DialogContext| -> Result<Box<dyn DialogContent>, DialogError> {
                let callbacks = DialogCallbacks::new(&context, events.clone());
                task::create(context, Arc::clone(&directory), callbacks)
            },
        )
    }
}

/// Dialogs that are not tied to a single entity, such as email composers
pub struct GenericDialogs {
    directory: Arc<dyn LeadDirectory>,
    events: DomainEvents,
    ids: IdAllocator,
}

impl GenericDialogs {
    pub fn new(directory: Arc<dyn LeadDirectory>, events: DomainEvents, ids: IdAllocator) -> Self {
        Self {
            directory,
            events,
            ids,
        }
    }

    /// Every call opens a fresh composer
    pub fn open_email_composer(&self, registry: &mut DialogRegistry, lead: Option<&LeadRef>) -> DialogId {
        let id = self.ids.allocate("email");
        let payload = DialogPayload::Generic(GenericPayload {
            title: match lead {
                Some(lead) => format!("Email {}", lead.name),
                None => "Email".to_string(),
            },
            lead: lead.cloned(),
            data: serde_json::json!({ "composer": "email" }),
        });

        let directory = Arc::clone(&self.directory);
        let events = self.events.clone();
        let factory: Arc<dyn ContentFactory> = Arc::new(
            move |context: DialogContext| -> Result<Box<dyn DialogContent>, DialogError> {
                let callbacks = DialogCallbacks::new(&context, events.clone());
                email::create(context, Arc::clone(&directory), callbacks)
            },
        );
        registry.open(id.clone(), DialogKind::Generic, payload, factory);
        info!(dialog = %id, "email composer opened");
        id
    }
}

/// All domain managers, sharing one directory and one event sink
pub struct DialogManagers {
    pub notes: NoteDialogs,
    pub meetings: MeetingDialogs,
    pub tasks: TaskDialogs,
    pub generic: GenericDialogs,
}

impl DialogManagers {
    pub fn new(directory: Arc<dyn LeadDirectory>, events: DomainEvents) -> Self {
        Self {
            notes: NoteDialogs::new(Arc::clone(&directory), events.clone()),
            meetings: MeetingDialogs::new(Arc::clone(&directory), events.clone()),
            tasks: TaskDialogs::new(Arc::clone(&directory), events.clone()),
            generic: GenericDialogs::new(directory, events, IdAllocator::new()),
        }
    }
}
