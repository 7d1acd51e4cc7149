//! Core dialog types and traits
//!
//! This module defines the records kept by the dialog registry, the payloads
//! dialogs carry, and the contract between the host and the content it
//! mounts for each open dialog.

use crate::crm::{LeadRef, MeetingRef, NoteRef, TaskRef};
use crate::tui::{styles::Theme, Frame};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::layout::Rect;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Unique identifier for dialog instances
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DialogId(pub String);

impl DialogId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DialogId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DialogId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&DialogId> for DialogId {
    fn from(id: &DialogId) -> Self {
        id.clone()
    }
}

impl std::fmt::Display for DialogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a dialog is for. View, add and edit are distinct kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogKind {
    NoteAdd,
    NoteView,
    NoteEdit,
    MeetingSchedule,
    MeetingReschedule,
    TaskAdd,
    TaskEdit,
    Generic,
}

impl DialogKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoteAdd => "New note",
            Self::NoteView => "Note",
            Self::NoteEdit => "Edit note",
            Self::MeetingSchedule => "Schedule meeting",
            Self::MeetingReschedule => "Reschedule meeting",
            Self::TaskAdd => "New task",
            Self::TaskEdit => "Edit task",
            Self::Generic => "Dialog",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogStatus {
    Open,
    Minimized,
}

/// Cell offset of a dialog's top-left corner inside the host area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Width and height in cells, used for dialogs and the viewport alike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

impl From<Rect> for Size {
    fn from(rect: Rect) -> Self {
        Self::new(rect.width, rect.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotePayload {
    pub lead: LeadRef,
    pub note: Option<NoteRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingPayload {
    pub lead: LeadRef,
    pub meeting: Option<MeetingRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub lead: LeadRef,
    pub task: Option<TaskRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericPayload {
    pub title: String,
    pub lead: Option<LeadRef>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Domain data attached to a dialog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogPayload {
    Note(NotePayload),
    Meeting(MeetingPayload),
    Task(TaskPayload),
    Generic(GenericPayload),
}

impl DialogPayload {
    pub fn lead(&self) -> Option<&LeadRef> {
        match self {
            Self::Note(p) => Some(&p.lead),
            Self::Meeting(p) => Some(&p.lead),
            Self::Task(p) => Some(&p.lead),
            Self::Generic(p) => p.lead.as_ref(),
        }
    }
}

/// The registry's unit of state for one live dialog
#[derive(Debug, Clone, PartialEq)]
pub struct DialogRecord {
    pub id: DialogId,
    pub kind: DialogKind,
    pub status: DialogStatus,
    pub payload: DialogPayload,
    pub position: Position,
    pub size: Size,
    pub z_order: u64,
    pub created_at: DateTime<Utc>,
    /// Bumped when the kind changes in place; content is remounted
    pub generation: u64,
    /// Bumped whenever the payload is overwritten
    pub revision: u64,
    /// Cascade slot assigned at open time
    pub slot: usize,
    /// Set once the content reported its own size
    pub measured: bool,
    /// Set once the user dragged the dialog
    pub moved: bool,
}

impl DialogRecord {
    pub fn is_open(&self) -> bool {
        self.status == DialogStatus::Open
    }

    pub fn is_minimized(&self) -> bool {
        self.status == DialogStatus::Minimized
    }
}

/// Change notifications sent to registry subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    Opened(DialogId),
    /// `open` was called for a live id
    Refreshed(DialogId),
    Closed(DialogId),
    Minimized(DialogId),
    Restored(DialogId),
    Focused(DialogId),
    Moved(DialogId),
    Resized(DialogId),
    ViewportChanged(Size),
}

/// Requests content components send back to the registry
#[derive(Debug, Clone, PartialEq)]
pub enum DialogCommand {
    Close(DialogId),
    Minimize(DialogId, bool),
    Focus(DialogId),
    /// Switch the dialog to another kind without changing its id
    ChangeKind(DialogId, DialogKind),
}

/// Sender bound to one dialog id
#[derive(Debug, Clone)]
pub struct DialogHandle {
    id: DialogId,
    commands: mpsc::UnboundedSender<DialogCommand>,
}

impl DialogHandle {
    pub fn new(id: DialogId, commands: mpsc::UnboundedSender<DialogCommand>) -> Self {
        Self { id, commands }
    }

    pub fn id(&self) -> &DialogId {
        &self.id
    }

    pub fn close(&self) {
        self.send(DialogCommand::Close(self.id.clone()));
    }

    pub fn minimize(&self, minimized: bool) {
        self.send(DialogCommand::Minimize(self.id.clone(), minimized));
    }

    pub fn focus(&self) {
        self.send(DialogCommand::Focus(self.id.clone()));
    }

    pub fn change_kind(&self, kind: DialogKind) {
        self.send(DialogCommand::ChangeKind(self.id.clone(), kind));
    }

    fn send(&self, command: DialogCommand) {
        // The registry owns the receiver for its whole lifetime
        let _ = self.commands.send(command);
    }
}

/// Tracks whether a particular mount of a dialog is still alive.
///
/// The host flips it on unmount; async work started by the content checks
/// it before touching dialog state.
#[derive(Debug, Clone)]
pub struct MountGuard(Arc<AtomicBool>);

impl MountGuard {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn unmount(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for MountGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a content factory gets when the host mounts a dialog
#[derive(Debug, Clone)]
pub struct DialogContext {
    pub id: DialogId,
    pub kind: DialogKind,
    pub payload: DialogPayload,
    /// Where the frame sat when the content was mounted
    pub position: Position,
    pub handle: DialogHandle,
    pub guard: MountGuard,
}

/// Content mounted inside one dialog frame
#[async_trait]
pub trait DialogContent: Send {
    /// Title shown in the frame header and the minimized tray
    fn title(&self) -> String;

    /// Size the content would like, including the frame border
    fn preferred_size(&self) -> Option<Size> {
        None
    }

    /// Render into the area inside the frame border
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme);

    async fn handle_key_event(&mut self, event: KeyEvent) -> Result<()>;

    async fn handle_mouse_event(&mut self, event: MouseEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    /// Called when `open` overwrote the payload of this live dialog
    fn update_payload(&mut self, payload: &DialogPayload) {
        let _ = payload;
    }

    async fn tick(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Builds the content for a dialog when the host mounts it
pub trait ContentFactory: Send + Sync {
    fn create(&self, context: DialogContext) -> Result<Box<dyn DialogContent>, DialogError>;
}

impl<F> ContentFactory for F
where
    F: Fn(DialogContext) -> Result<Box<dyn DialogContent>, DialogError> + Send + Sync,
{
    fn create(&self, context: DialogContext) -> Result<Box<dyn DialogContent>, DialogError> {
        self(context)
    }
}

/// Dialog-specific error types
#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("Dialog '{0}' cannot show a {1:?} payload")]
    PayloadMismatch(DialogId, DialogKind),

    #[error("Dialog '{id}' content failed: {message}")]
    ContentFailed { id: DialogId, message: String },

    #[error("Dialog '{id}' content panicked: {message}")]
    ContentPanicked { id: DialogId, message: String },
}
