//! Lead list panel

use super::{Component, ComponentState};
use crate::crm::{Lead, LeadId};
use crate::tui::{styles::Theme, Frame};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

pub struct LeadList {
    state: ComponentState,
    leads: Vec<Lead>,
    list_state: ListState,
}

impl LeadList {
    pub fn new() -> Self {
        Self {
            state: ComponentState::new().with_focus(true),
            leads: Vec::new(),
            list_state: ListState::default(),
        }
    }

    /// Replace the leads, keeping the selected lead when it still exists
    pub fn set_leads(&mut self, leads: Vec<Lead>) {
        let selected = self.selected().map(|lead| lead.id);
        self.leads = leads;
        let index = selected
            .and_then(|id| self.leads.iter().position(|lead| lead.id == id))
            .or(if self.leads.is_empty() { None } else { Some(0) });
        self.list_state.select(index);
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn selected(&self) -> Option<&Lead> {
        self.list_state.selected().and_then(|index| self.leads.get(index))
    }

    pub fn selected_id(&self) -> Option<LeadId> {
        self.selected().map(|lead| lead.id)
    }

    pub fn select_next(&mut self) {
        if self.leads.is_empty() {
            return;
        }
        let next = match self.list_state.selected() {
            Some(index) if index + 1 < self.leads.len() => index + 1,
            Some(index) => index,
            None => 0,
        };
        self.list_state.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        if self.leads.is_empty() {
            return;
        }
        let previous = self.list_state.selected().map_or(0, |index| index.saturating_sub(1));
        self.list_state.select(Some(previous));
    }

    fn select_row(&mut self, row: u16) {
        let area = self.state.size;
        if row <= area.y || row + 1 >= area.bottom() {
            return;
        }
        let index = (row - area.y - 1) as usize + self.list_state.offset();
        if index < self.leads.len() {
            self.list_state.select(Some(index));
        }
    }
}

impl Default for LeadList {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Component for LeadList {
    async fn handle_key_event(&mut self, event: KeyEvent) -> Result<()> {
        match event.code {
            KeyCode::Up | KeyCode::Char('k') | KeyCode::PageUp => self.select_previous(),
            KeyCode::Down | KeyCode::Char('j') | KeyCode::PageDown => self.select_next(),
            KeyCode::Home => {
                if !self.leads.is_empty() {
                    self.list_state.select(Some(0));
                }
            }
            KeyCode::End => {
                if !self.leads.is_empty() {
                    self.list_state.select(Some(self.leads.len() - 1));
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn handle_mouse_event(&mut self, event: MouseEvent) -> Result<()> {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => self.select_row(event.row),
            MouseEventKind::ScrollUp => self.select_previous(),
            MouseEventKind::ScrollDown => self.select_next(),
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        self.state.size = area;
        let border_style = if self.state.has_focus {
            theme.focused_border_style()
        } else {
            theme.border_style()
        };

        let items: Vec<ListItem> = self
            .leads
            .iter()
            .map(|lead| {
                let company = lead.company.as_deref().unwrap_or("-");
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<18}", lead.name), theme.text_style()),
                    Span::styled(format!(" {:<14}", company), theme.placeholder_style()),
                    Span::styled(format!(" {}", lead.stage.label()), theme.text_style()),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title(format!(" Leads ({}) ", self.leads.len())),
            )
            .style(theme.base_style())
            .highlight_style(theme.selection_style())
            .highlight_symbol("▶ ");

        frame.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn size(&self) -> Rect {
        self.state.size
    }

    fn set_size(&mut self, size: Rect) {
        self.state.size = size;
    }

    fn has_focus(&self) -> bool {
        self.state.has_focus
    }

    fn set_focus(&mut self, focus: bool) {
        self.state.has_focus = focus;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::LeadStage;
    use crossterm::event::KeyModifiers;

    fn lead(id: u64, name: &str) -> Lead {
        Lead {
            id: LeadId(id),
            name: name.to_string(),
            company: None,
            email: None,
            stage: LeadStage::New,
        }
    }

    #[tokio::test]
    async fn test_navigation_stays_in_bounds() {
        let mut list = LeadList::new();
        list.set_leads(vec![lead(1, "a"), lead(2, "b")]);
        assert_eq!(list.selected_id(), Some(LeadId(1)));

        for _ in 0..3 {
            list.handle_key_event(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE))
                .await
                .unwrap();
        }
        assert_eq!(list.selected_id(), Some(LeadId(2)));

        list.handle_key_event(KeyEvent::new(KeyCode::Home, KeyModifiers::NONE))
            .await
            .unwrap();
        assert_eq!(list.selected_id(), Some(LeadId(1)));
    }

    #[test]
    fn test_reload_keeps_selected_lead() {
        let mut list = LeadList::new();
        list.set_leads(vec![lead(1, "a"), lead(2, "b"), lead(3, "c")]);
        list.select_next();
        list.select_next();

        list.set_leads(vec![lead(3, "c"), lead(1, "a")]);
        assert_eq!(list.selected_id(), Some(LeadId(3)));

        list.set_leads(Vec::new());
        assert_eq!(list.selected(), None);
    }

    #[tokio::test]
    async fn test_click_selects_row() {
        let mut list = LeadList::new();
        list.set_leads(vec![lead(1, "a"), lead(2, "b"), lead(3, "c")]);
        list.set_size(Rect::new(0, 0, 40, 10));

        list.handle_mouse_event(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 5,
            row: 3,
            modifiers: KeyModifiers::NONE,
        })
        .await
        .unwrap();

        assert_eq!(list.selected_id(), Some(LeadId(3)));
    }
}
