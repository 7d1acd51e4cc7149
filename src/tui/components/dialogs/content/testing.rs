//! Helpers for driving content components without a registry or host

use super::super::managers::DialogCallbacks;
use super::super::types::*;
use crate::crm::{DomainEvent, DomainEvents, LeadId, LeadRef};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

pub struct Harness {
    pub context: DialogContext,
    pub callbacks: DialogCallbacks,
    pub commands: mpsc::UnboundedReceiver<DialogCommand>,
    pub events: mpsc::UnboundedReceiver<DomainEvent>,
}

impl Harness {
    pub fn new(id: &str, kind: DialogKind, payload: DialogPayload) -> Self {
        let (sender, commands) = mpsc::unbounded_channel();
        let (sink, events) = DomainEvents::channel();
        let id = DialogId::from(id);
        let context = DialogContext {
            handle: DialogHandle::new(id.clone(), sender),
            id,
            kind,
            payload,
            position: Position::default(),
            guard: MountGuard::new(),
        };
        let callbacks = DialogCallbacks::new(&context, sink);
        Self {
            context,
            callbacks,
            commands,
            events,
        }
    }

    /// Wait for the next domain event, giving spawned tasks time to run
    pub async fn next_event(&mut self) -> Option<DomainEvent> {
        for _ in 0..100 {
            if let Ok(event) = self.events.try_recv() {
                return Some(event);
            }
            tokio::task::yield_now().await;
        }
        None
    }

    pub async fn next_command(&mut self) -> Option<DialogCommand> {
        for _ in 0..100 {
            if let Ok(command) = self.commands.try_recv() {
                return Some(command);
            }
            tokio::task::yield_now().await;
        }
        None
    }
}

pub fn lead(id: u64) -> LeadRef {
    LeadRef {
        id: LeadId(id),
        name: format!("Lead {}", id),
        email: Some(format!("lead{}@example.test", id)),
    }
}

pub fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

pub fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

pub fn typed(text: &str) -> Vec<KeyEvent> {
    text.chars().map(|c| key(KeyCode::Char(c))).collect()
}

/// Yield until `done` holds or the attempts run out
pub async fn settle<F: FnMut() -> bool>(mut done: F) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
}
