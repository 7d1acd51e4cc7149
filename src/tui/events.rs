use anyhow::Result;
use crossterm::event::{Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseEvent};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Application events
#[derive(Debug, Clone)]
pub enum Event {
    /// Keyboard input event
    Key(KeyEvent),

    /// Mouse input event
    Mouse(MouseEvent),

    /// Terminal resize event
    Resize(u16, u16),

    /// Periodic tick event
    Tick,

    /// Status message event
    StatusMessage(String),

    /// Clear status message event
    ClearStatus,
}

/// Event handler for managing input events
pub struct EventHandler {
    /// Event receiver channel
    receiver: mpsc::UnboundedReceiver<Event>,

    /// Event sender channel
    sender: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a handler without a terminal reader, fed only through `send`
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { receiver, sender }
    }

    /// Create a handler that reads the terminal on a blocking thread and
    /// emits a tick whenever `tick_rate` passes without input
    pub fn with_terminal(tick_rate: Duration) -> Self {
        let handler = Self::new();
        let sender = handler.sender.clone();

        tokio::task::spawn_blocking(move || {
            while !sender.is_closed() {
                let event = match crossterm::event::poll(tick_rate) {
                    Ok(true) => match crossterm::event::read() {
                        Ok(event) => Self::convert_crossterm_event(event),
                        Err(e) => {
                            warn!("Failed to read terminal event: {}", e);
                            None
                        }
                    },
                    Ok(false) => Some(Event::Tick),
                    Err(e) => {
                        warn!("Failed to poll terminal: {}", e);
                        Some(Event::Tick)
                    }
                };
                if let Some(event) = event {
                    if sender.send(event).is_err() {
                        break;
                    }
                }
            }
        });

        handler
    }

    /// Get the next event
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Convert crossterm events to application events
    fn convert_crossterm_event(event: CrosstermEvent) -> Option<Event> {
        match event {
            // Windows reports releases as well
            CrosstermEvent::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                Some(Event::Key(key_event))
            }
            CrosstermEvent::Mouse(mouse_event) => Some(Event::Mouse(mouse_event)),
            CrosstermEvent::Resize(width, height) => Some(Event::Resize(width, height)),
            _ => None,
        }
    }

    /// Send an internal event
    pub fn send(&self, event: Event) -> Result<()> {
        self.sender.send(event)?;
        Ok(())
    }

    /// Get a clone of the sender
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.sender.clone()
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    #[tokio::test]
    async fn test_internal_events_are_delivered_in_order() {
        let mut handler = EventHandler::new();
        handler.send(Event::StatusMessage("saved".to_string())).unwrap();
        handler.sender().send(Event::ClearStatus).unwrap();

        assert!(matches!(handler.next().await, Some(Event::StatusMessage(m)) if m == "saved"));
        assert!(matches!(handler.next().await, Some(Event::ClearStatus)));
    }

    #[test]
    fn test_key_releases_are_dropped() {
        let press = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        let release = KeyEvent {
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
            ..press
        };

        assert!(EventHandler::convert_crossterm_event(CrosstermEvent::Key(press)).is_some());
        assert!(EventHandler::convert_crossterm_event(CrosstermEvent::Key(release)).is_none());
        assert!(matches!(
            EventHandler::convert_crossterm_event(CrosstermEvent::Resize(80, 24)),
            Some(Event::Resize(80, 24))
        ));
    }
}
