use crate::config::Config;
use crate::crm::{DomainEvent, DomainEvents, Lead, LeadActivity, LeadDirectory, LeadId, LeadRef, MeetingRef, NoteRef, TaskRef};
use crate::tui::components::dialogs::content::Loadable;
use crate::tui::components::dialogs::{DialogHost, DialogManagers, DialogRegistry, MountGuard, PositioningEngine, Size};
use crate::tui::components::{leads::LeadList, timeline::ActivityTimeline, Component};
use crate::tui::{
    events::Event,
    keys::{Action, KeyMap},
    styles::Theme,
    Frame,
};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseEvent};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How long a status message stays up
const STATUS_TTL: Duration = Duration::from_secs(4);

/// Main application state and controller
pub struct App {
    /// Whether the application should quit
    pub should_quit: bool,

    /// Current application dimensions
    pub size: Rect,

    /// Key mappings for the application
    pub key_map: KeyMap,

    /// Current theme for styling
    pub theme: Theme,

    /// Status message to display
    pub status_message: Option<String>,
    status_set_at: Option<Instant>,

    /// Show help overlay
    pub show_help: bool,

    config: Config,
    directory: Arc<dyn LeadDirectory>,

    registry: DialogRegistry,
    host: DialogHost,
    host_area: Rect,
    managers: DialogManagers,
    domain_events: mpsc::UnboundedReceiver<DomainEvent>,

    leads: LeadList,
    timeline: ActivityTimeline,
    shown_lead: Option<LeadId>,

    /// Keeps background loads alive for the whole session
    guard: MountGuard,
    leads_load: Option<Loadable<Vec<Lead>>>,
    activity_load: Option<(LeadId, Loadable<LeadActivity>)>,
}

impl App {
    /// Create a new application instance
    pub async fn new(config: Config) -> Result<Self> {
        let directory = config.directory().await?;
        Ok(Self::with_directory(config, directory))
    }

    pub fn with_directory(config: Config, directory: Arc<dyn LeadDirectory>) -> Self {
        let (events, domain_events) = DomainEvents::channel();
        let engine = PositioningEngine::new(
            Size::new(config.default_dialog_width, config.default_dialog_height),
            config.cascade_step,
        );
        let mut registry = DialogRegistry::new(engine, Size::new(80, 23));
        let host = DialogHost::new(&mut registry);
        let managers = DialogManagers::new(Arc::clone(&directory), events);

        let mut app = Self {
            should_quit: false,
            size: Rect::default(),
            key_map: KeyMap::default(),
            theme: Theme::default(),
            status_message: None,
            status_set_at: None,
            show_help: false,
            config,
            directory,
            registry,
            host,
            host_area: Rect::default(),
            managers,
            domain_events,
            leads: LeadList::new(),
            timeline: ActivityTimeline::new(),
            shown_lead: None,
            guard: MountGuard::new(),
            leads_load: None,
            activity_load: None,
        };
        app.reload_leads();
        app
    }

    /// Handle incoming events
    pub async fn handle_event(&mut self, event: Event) -> Result<bool> {
        match event {
            Event::Key(key_event) => self.handle_key_event(key_event).await?,

            Event::Mouse(mouse_event) => {
                if self.config.mouse_enabled {
                    self.handle_mouse_event(mouse_event).await?;
                }
            }

            Event::Resize(width, height) => {
                self.size = Rect::new(0, 0, width, height);
                self.resize_host(Self::main_area(self.size));
            }

            Event::Tick => {
                self.host.tick().await;
                self.poll_background();
                if self
                    .status_set_at
                    .is_some_and(|at| at.elapsed() >= STATUS_TTL)
                {
                    self.clear_status();
                }
            }

            Event::StatusMessage(message) => self.set_status(message),

            Event::ClearStatus => self.clear_status(),
        }

        self.host.sync(&mut self.registry);
        self.poll_background();
        Ok(self.should_quit)
    }

    async fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        if self.show_help && key.code == KeyCode::Esc {
            self.show_help = false;
            return Ok(());
        }

        if let Some(action) = self.key_map.action(&key) {
            self.perform(action);
            return Ok(());
        }

        if self.host.handle_key_event(&mut self.registry, key).await {
            return Ok(());
        }

        self.leads.handle_key_event(key).await?;
        self.on_selection_changed();
        Ok(())
    }

    async fn handle_mouse_event(&mut self, event: MouseEvent) -> Result<()> {
        if self.host.handle_mouse_event(&mut self.registry, event).await {
            return Ok(());
        }

        let area = self.leads.size();
        let inside = event.column >= area.x
            && event.column < area.right()
            && event.row >= area.y
            && event.row < area.bottom();
        if inside {
            self.leads.handle_mouse_event(event).await?;
            self.on_selection_changed();
        }
        Ok(())
    }

    fn perform(&mut self, action: Action) {
        debug!(?action, "key action");
        match action {
            Action::Quit => self.should_quit = true,
            Action::ToggleHelp => self.show_help = !self.show_help,

            Action::AddNote => {
                if let Some(lead) = self.require_lead() {
                    self.managers.notes.open_add_note(&mut self.registry, &lead);
                }
            }
            Action::ScheduleMeeting => {
                if let Some(lead) = self.require_lead() {
                    self.managers.meetings.open_schedule_meeting(&mut self.registry, &lead);
                }
            }
            Action::AddTask => {
                if let Some(lead) = self.require_lead() {
                    self.managers.tasks.open_add_task(&mut self.registry, &lead);
                }
            }
            Action::ComposeEmail => {
                let lead = self.leads.selected().map(Lead::to_ref);
                self.managers
                    .generic
                    .open_email_composer(&mut self.registry, lead.as_ref());
            }

            Action::ViewLatestNote | Action::EditLatestNote => {
                let Some(lead) = self.require_lead() else {
                    return;
                };
                let note = self.timeline.activity().and_then(LeadActivity::latest_note);
                match note {
                    Some(note) => {
                        let note = NoteRef { id: note.id };
                        if action == Action::ViewLatestNote {
                            self.managers.notes.open_view_note(&mut self.registry, &lead, note);
                        } else {
                            self.managers.notes.open_edit_note(&mut self.registry, &lead, note);
                        }
                    }
                    None => self.set_status(format!("No notes for {}", lead.name)),
                }
            }
            Action::RescheduleMeeting => {
                let Some(lead) = self.require_lead() else {
                    return;
                };
                match self.timeline.activity().and_then(LeadActivity::next_meeting) {
                    Some(meeting) => {
                        let meeting = MeetingRef { id: meeting.id };
                        self.managers
                            .meetings
                            .open_reschedule_meeting(&mut self.registry, &lead, meeting);
                    }
                    None => self.set_status(format!("No meetings with {}", lead.name)),
                }
            }
            Action::EditOpenTask => {
                let Some(lead) = self.require_lead() else {
                    return;
                };
                match self.timeline.activity().and_then(LeadActivity::open_task) {
                    Some(task) => {
                        let task = TaskRef { id: task.id };
                        self.managers.tasks.open_edit_task(&mut self.registry, &lead, task);
                    }
                    None => self.set_status(format!("No open tasks for {}", lead.name)),
                }
            }

            Action::CloseDialog => {
                if let Some(id) = self.registry.topmost_open() {
                    self.registry.close(&id);
                }
            }
            Action::MinimizeDialog => {
                if let Some(id) = self.registry.topmost_open() {
                    self.registry.minimize(&id, true);
                }
            }
            Action::RestoreDialog => {
                if let Some(id) = self.registry.last_minimized() {
                    self.registry.minimize(&id, false);
                    self.registry.focus(&id);
                }
            }
            Action::CycleFocus => self.registry.cycle_focus(),

            Action::NextLead => {
                self.leads.select_next();
                self.on_selection_changed();
            }
            Action::PreviousLead => {
                self.leads.select_previous();
                self.on_selection_changed();
            }
        }
    }

    fn require_lead(&mut self) -> Option<LeadRef> {
        let lead = self.leads.selected().map(Lead::to_ref);
        if lead.is_none() {
            self.set_status("Select a lead first".to_string());
        }
        lead
    }

    fn reload_leads(&mut self) {
        let directory = Arc::clone(&self.directory);
        self.leads_load = Some(Loadable::spawn(&self.guard, async move { directory.leads().await }));
    }

    fn load_activity(&mut self, lead_id: LeadId) {
        let directory = Arc::clone(&self.directory);
        let load = Loadable::spawn(&self.guard, async move { directory.activity(lead_id).await });
        self.activity_load = Some((lead_id, load));
    }

    fn on_selection_changed(&mut self) {
        let selected = self.leads.selected().cloned();
        let selected_id = selected.as_ref().map(|lead| lead.id);
        if selected_id == self.shown_lead {
            return;
        }
        self.shown_lead = selected_id;
        self.timeline.show_lead(selected);
        match selected_id {
            Some(lead_id) => self.load_activity(lead_id),
            None => self.activity_load = None,
        }
    }

    /// Pick up finished loads and domain events
    fn poll_background(&mut self) {
        if let Some(load) = self.leads_load.as_mut() {
            if let Some(leads) = load.poll() {
                info!("Loaded {} leads", leads.len());
                let leads = leads.clone();
                self.leads.set_leads(leads);
                self.leads_load = None;
                self.on_selection_changed();
            } else if let Loadable::Failed(message) = load {
                warn!("Failed to load leads: {}", message);
                let message = format!("Could not load leads: {}", message);
                self.leads_load = None;
                self.set_status(message);
            }
        }

        let mut refresh = false;
        while let Ok(event) = self.domain_events.try_recv() {
            self.timeline.push(&event);
            self.set_status(event.summary());
            if event.lead_id().is_some() && event.lead_id() == self.shown_lead {
                refresh = true;
            }
        }
        if refresh {
            if let Some(lead_id) = self.shown_lead {
                self.load_activity(lead_id);
            }
        }

        if let Some((lead_id, load)) = self.activity_load.as_mut() {
            let lead_id = *lead_id;
            if let Some(activity) = load.poll() {
                let activity = activity.clone();
                self.timeline.set_activity(lead_id, activity);
                self.activity_load = None;
            } else if let Loadable::Failed(message) = load {
                let message = format!("Could not load activity: {}", message);
                self.activity_load = None;
                self.set_status(message);
            }
        }
    }

    fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
        self.status_set_at = Some(Instant::now());
    }

    fn clear_status(&mut self) {
        self.status_message = None;
        self.status_set_at = None;
    }

    /// Everything above the status bar
    fn main_area(area: Rect) -> Rect {
        Rect {
            height: area.height.saturating_sub(1),
            ..area
        }
    }

    fn resize_host(&mut self, area: Rect) {
        if area != self.host_area {
            self.host_area = area;
            self.host.set_area(&mut self.registry, area);
        }
    }

    /// Apply pending dialog commands and bring mounts up to date
    pub fn sync(&mut self) {
        self.host.sync(&mut self.registry);
    }

    pub fn registry(&self) -> &DialogRegistry {
        &self.registry
    }

    pub fn host(&self) -> &DialogHost {
        &self.host
    }

    /// Render the application UI
    pub fn render(&mut self, frame: &mut Frame) {
        self.size = frame.size();

        // Create main layout
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // Main content
                Constraint::Length(1), // Status bar
            ])
            .split(frame.size());

        self.resize_host(chunks[0]);
        // The bottom row of the main area is the minimized tray
        let panels = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(DialogHost::dialog_area(chunks[0]));

        self.leads.render(frame, panels[0], &self.theme);
        self.timeline.render(frame, panels[1], &self.theme);
        self.host.render(frame, chunks[0], &self.theme, &self.registry);

        // Render status bar
        self.render_status_bar(frame, chunks[1]);

        // Render help overlay if enabled
        if self.show_help {
            self.render_help_overlay(frame);
        }
    }

    /// Render the status bar
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let status = if let Some(ref message) = self.status_message {
            Line::from(Span::styled(message.clone(), self.theme.success_style()))
        } else {
            let records = self.registry.list();
            let minimized = records.iter().filter(|record| record.is_minimized()).count();
            Line::from(format!(
                "{} open · {} minimized | F2 note  F3 meeting  F4 task  F5 email | Ctrl+G help | Ctrl+C quit",
                records.len() - minimized,
                minimized
            ))
        };

        let status_paragraph = Paragraph::new(status).style(self.theme.status_bar_style());
        frame.render_widget(status_paragraph, area);
    }

    /// Render help overlay
    fn render_help_overlay(&self, frame: &mut Frame) {
        let help_area = centered_rect(60, 70, frame.size());

        let help_text = self.key_map.help_text();
        let help_block = Block::default()
            .borders(Borders::ALL)
            .title("Help")
            .style(self.theme.help_style());

        let help_paragraph = Paragraph::new(help_text)
            .block(help_block)
            .style(self.theme.text_style());

        frame.render_widget(Clear, help_area);
        frame.render_widget(help_paragraph, help_area);
    }
}

/// Create a centered rectangle with given percentage of the screen
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::MemoryDirectory;
    use crate::tui::components::dialogs::DialogId;
    use crossterm::event::KeyModifiers;
    use ratatui::{backend::TestBackend, Terminal};

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    async fn app() -> App {
        let directory: Arc<dyn LeadDirectory> = Arc::new(MemoryDirectory::fixtures());
        let mut app = App::with_directory(Config::default(), directory);
        settle(&mut app, |app| app.timeline.activity().is_some()).await;
        app
    }

    /// Feed ticks until `done` holds
    async fn settle(app: &mut App, mut done: impl FnMut(&App) -> bool) {
        for _ in 0..100 {
            if done(app) {
                return;
            }
            tokio::task::yield_now().await;
            app.handle_event(Event::Tick).await.unwrap();
        }
        panic!("app did not settle");
    }

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    #[tokio::test]
    async fn test_leads_load_and_first_lead_is_shown() {
        let app = app().await;
        assert_eq!(app.leads.leads().len(), 5);
        assert_eq!(app.shown_lead, Some(LeadId(1)));
        assert_eq!(app.timeline.activity().map(|a| a.notes.len()), Some(1));
    }

    #[tokio::test]
    async fn test_dialogs_open_side_by_side_and_close_individually() {
        let mut app = app().await;
        app.handle_event(press(KeyCode::F(2))).await.unwrap();
        app.handle_event(press(KeyCode::F(4))).await.unwrap();

        let note = DialogId::new("note-add-1");
        let task = DialogId::new("task-add-1");
        assert!(app.host().is_mounted(&note));
        assert!(app.host().is_mounted(&task));
        assert_eq!(app.registry().topmost_open(), Some(task.clone()));

        app.handle_event(ctrl('w')).await.unwrap();
        assert!(!app.registry().contains(&task));
        assert!(app.host().is_mounted(&note));
        assert_eq!(app.registry().topmost_open(), Some(note));
    }

    #[tokio::test]
    async fn test_arrow_keys_go_to_dialog_but_page_keys_move_selection() {
        let mut app = app().await;
        app.handle_event(press(KeyCode::Down)).await.unwrap();
        assert_eq!(app.leads.selected_id(), Some(LeadId(2)));

        app.handle_event(press(KeyCode::F(5))).await.unwrap();
        app.handle_event(press(KeyCode::Down)).await.unwrap();
        assert_eq!(app.leads.selected_id(), Some(LeadId(2)));

        app.handle_event(press(KeyCode::PageDown)).await.unwrap();
        assert_eq!(app.leads.selected_id(), Some(LeadId(3)));
    }

    #[tokio::test]
    async fn test_minimize_and_restore() {
        let mut app = app().await;
        app.handle_event(press(KeyCode::F(3))).await.unwrap();
        let id = app.registry().topmost_open().unwrap();

        app.handle_event(ctrl('n')).await.unwrap();
        assert_eq!(app.registry().topmost_open(), None);
        assert!(app.host().is_mounted(&id));

        app.handle_event(ctrl('r')).await.unwrap();
        assert_eq!(app.registry().topmost_open(), Some(id));
    }

    #[tokio::test]
    async fn test_view_latest_note_then_missing_meeting() {
        let mut app = app().await;
        app.handle_event(press(KeyCode::F(6))).await.unwrap();
        assert!(app.registry().contains(&DialogId::new("note-106")));

        app.handle_event(press(KeyCode::F(8))).await.unwrap();
        assert_eq!(app.status_message.as_deref(), Some("No meetings with Ada Marsh"));
    }

    #[tokio::test]
    async fn test_saved_note_reaches_timeline() {
        let mut app = app().await;
        app.handle_event(press(KeyCode::F(2))).await.unwrap();
        for c in "Call back Monday".chars() {
            app.handle_event(press(KeyCode::Char(c))).await.unwrap();
        }
        app.handle_event(ctrl('s')).await.unwrap();

        settle(&mut app, |app| app.timeline.feed().next().is_some()).await;
        let entry = app.timeline.feed().next().unwrap();
        assert_eq!(entry.lead_id, Some(LeadId(1)));
        assert!(entry.text.starts_with("Note #"));

        settle(&mut app, |app| !app.registry().contains(&DialogId::new("note-add-1"))).await;
        settle(&mut app, |app| app.timeline.activity().is_some_and(|a| a.notes.len() == 2)).await;
    }

    #[tokio::test]
    async fn test_render_panels_dialog_and_status_bar() {
        let mut app = app().await;
        app.handle_event(press(KeyCode::F(2))).await.unwrap();

        let mut terminal = Terminal::new(TestBackend::new(120, 32)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();

        let text = screen(&terminal);
        assert!(text.contains("Leads (5)"));
        assert!(text.contains("New note · Ada Marsh"));
        assert!(text.contains("1 open · 0 minimized"));
    }

    #[tokio::test]
    async fn test_help_toggle_and_quit() {
        let mut app = app().await;
        app.handle_event(ctrl('g')).await.unwrap();
        assert!(app.show_help);
        app.handle_event(press(KeyCode::Esc)).await.unwrap();
        assert!(!app.show_help);

        assert!(app.handle_event(ctrl('c')).await.unwrap());
    }
}
