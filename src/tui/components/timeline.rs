//! Activity panel: details of the selected lead and a feed of recent
//! changes announced by dialogs.

use super::{Component, ComponentState};
use crate::crm::{DomainEvent, Lead, LeadActivity, LeadId};
use crate::tui::{styles::Theme, Frame};
use chrono::{DateTime, Local};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use std::collections::VecDeque;

/// Entries kept in the feed
const FEED_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub at: DateTime<Local>,
    pub lead_id: Option<LeadId>,
    pub text: String,
}

pub struct ActivityTimeline {
    state: ComponentState,
    feed: VecDeque<TimelineEntry>,
    lead: Option<Lead>,
    activity: Option<LeadActivity>,
}

impl ActivityTimeline {
    pub fn new() -> Self {
        Self {
            state: ComponentState::new(),
            feed: VecDeque::with_capacity(FEED_CAPACITY),
            lead: None,
            activity: None,
        }
    }

    /// Record a domain event at the top of the feed
    pub fn push(&mut self, event: &DomainEvent) {
        if self.feed.len() == FEED_CAPACITY {
            self.feed.pop_back();
        }
        self.feed.push_front(TimelineEntry {
            at: Local::now(),
            lead_id: event.lead_id(),
            text: event.summary(),
        });
    }

    pub fn feed(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.feed.iter()
    }

    /// Show `lead`; activity arrives separately once loaded
    pub fn show_lead(&mut self, lead: Option<Lead>) {
        if self.lead.as_ref().map(|l| l.id) != lead.as_ref().map(|l| l.id) {
            self.activity = None;
        }
        self.lead = lead;
    }

    pub fn set_activity(&mut self, lead_id: LeadId, activity: LeadActivity) {
        if self.lead.as_ref().is_some_and(|lead| lead.id == lead_id) {
            self.activity = Some(activity);
        }
    }

    pub fn activity(&self) -> Option<&LeadActivity> {
        self.activity.as_ref()
    }

    fn detail_lines(&self, theme: &Theme) -> Vec<Line<'static>> {
        let Some(lead) = &self.lead else {
            return vec![Line::from(Span::styled("No lead selected", theme.placeholder_style()))];
        };

        let mut lines = vec![
            Line::from(Span::styled(lead.name.clone(), theme.focused_border_style())),
            Line::from(format!(
                "{} · {} · {}",
                lead.company.as_deref().unwrap_or("-"),
                lead.email.as_deref().unwrap_or("no email"),
                lead.stage.label()
            )),
            Line::from(""),
        ];

        let Some(activity) = &self.activity else {
            lines.push(Line::from(Span::styled("Loading activity…", theme.placeholder_style())));
            return lines;
        };

        lines.push(Line::from(format!(
            "{} notes · {} meetings · {} open tasks",
            activity.notes.len(),
            activity.meetings.len(),
            activity.tasks.iter().filter(|task| !task.done).count()
        )));
        if let Some(note) = activity.latest_note() {
            let first_line = note.body.lines().next().unwrap_or_default().to_string();
            lines.push(Line::from(format!("Latest note: {}", first_line)));
        }
        if let Some(meeting) = activity.next_meeting() {
            lines.push(Line::from(format!(
                "Meeting: {} at {}",
                meeting.title,
                meeting.starts_at.format("%Y-%m-%d %H:%M")
            )));
        }
        if let Some(task) = activity.open_task() {
            let due = task
                .due
                .map(|due| format!(" (due {})", due))
                .unwrap_or_default();
            lines.push(Line::from(format!("Task: {}{}", task.title, due)));
        }
        lines
    }
}

impl Default for ActivityTimeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ActivityTimeline {
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        self.state.size = area;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(9), Constraint::Min(3)])
            .split(area);

        let detail = Paragraph::new(self.detail_lines(theme))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme.border_style())
                    .title(" Lead "),
            )
            .style(theme.base_style())
            .wrap(Wrap { trim: true });
        frame.render_widget(detail, chunks[0]);

        let items: Vec<ListItem> = self
            .feed
            .iter()
            .map(|entry| {
                ListItem::new(Line::from(vec![
                    Span::styled(entry.at.format("%H:%M:%S ").to_string(), theme.placeholder_style()),
                    Span::styled(entry.text.clone(), theme.text_style()),
                ]))
            })
            .collect();
        let feed = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme.border_style())
                    .title(" Activity "),
            )
            .style(theme.base_style());
        frame.render_widget(feed, chunks[1]);
    }

    fn size(&self) -> Rect {
        self.state.size
    }

    fn set_size(&mut self, size: Rect) {
        self.state.size = size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::{LeadStage, TaskId};

    fn lead(id: u64) -> Lead {
        Lead {
            id: LeadId(id),
            name: format!("Lead {}", id),
            company: None,
            email: None,
            stage: LeadStage::New,
        }
    }

    #[test]
    fn test_feed_is_newest_first_and_bounded() {
        let mut timeline = ActivityTimeline::new();
        for task in 0..(FEED_CAPACITY as u64 + 5) {
            timeline.push(&DomainEvent::TaskSaved {
                lead_id: LeadId(1),
                task_id: TaskId(task),
            });
        }

        let entries: Vec<&TimelineEntry> = timeline.feed().collect();
        assert_eq!(entries.len(), FEED_CAPACITY);
        assert!(entries[0].text.starts_with(&format!("Task #{}", FEED_CAPACITY + 4)));
    }

    #[test]
    fn test_activity_for_other_lead_is_ignored() {
        let mut timeline = ActivityTimeline::new();
        timeline.show_lead(Some(lead(1)));
        timeline.set_activity(LeadId(2), LeadActivity::default());
        assert!(timeline.activity().is_none());

        timeline.set_activity(LeadId(1), LeadActivity::default());
        assert!(timeline.activity().is_some());

        timeline.show_lead(Some(lead(2)));
        assert!(timeline.activity().is_none());
    }
}
