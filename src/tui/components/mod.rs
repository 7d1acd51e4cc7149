pub mod dialogs;
pub mod leads;
pub mod timeline;

use crate::tui::{styles::Theme, Frame};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::layout::Rect;

/// Base trait for the panels behind the dialog layer
#[async_trait]
pub trait Component: Send + Sync {
    /// Handle keyboard input
    async fn handle_key_event(&mut self, event: KeyEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    /// Handle mouse input
    async fn handle_mouse_event(&mut self, event: MouseEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    /// Render the component
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme);

    /// Area the component was last rendered into
    fn size(&self) -> Rect;

    fn set_size(&mut self, size: Rect);

    fn has_focus(&self) -> bool {
        false
    }

    fn set_focus(&mut self, focus: bool) {
        let _ = focus;
    }
}

/// Base component state
#[derive(Debug, Clone, Default)]
pub struct ComponentState {
    pub size: Rect,
    pub has_focus: bool,
}

impl ComponentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_focus(mut self, focus: bool) -> Self {
        self.has_focus = focus;
        self
    }
}
