//! Shared form plumbing for dialog contents: labelled text inputs with
//! Tab navigation, plus the state of an in-flight submission.

use crate::tui::{styles::Theme, Frame};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use tokio::sync::oneshot;
use tui_textarea::TextArea;

/// Rows a single-line field takes including its border
const SINGLE_LINE_HEIGHT: u16 = 3;

/// Input rejected before it reached the lead directory
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must look like {expected}")]
    Format {
        field: &'static str,
        expected: &'static str,
    },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
    },
}

pub struct Field {
    label: &'static str,
    placeholder: String,
    input: TextArea<'static>,
    multiline: bool,
}

impl Field {
    pub fn single(label: &'static str, value: &str, placeholder: &str) -> Self {
        Self::build(label, value, placeholder, false)
    }

    pub fn multiline(label: &'static str, value: &str, placeholder: &str) -> Self {
        Self::build(label, value, placeholder, true)
    }

    fn build(label: &'static str, value: &str, placeholder: &str, multiline: bool) -> Self {
        let mut input = if value.is_empty() {
            TextArea::default()
        } else {
            TextArea::new(value.lines().map(str::to_string).collect())
        };
        input.set_placeholder_text(placeholder.to_string());
        input.set_cursor_line_style(Style::default());
        Self {
            label,
            placeholder: placeholder.to_string(),
            input,
            multiline,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn value(&self) -> String {
        self.input.lines().join("\n")
    }

    /// Value with surrounding whitespace removed
    pub fn trimmed(&self) -> String {
        self.value().trim().to_string()
    }

    /// Replace the content, keeping label and placeholder
    pub fn set_value(&mut self, value: &str) {
        let placeholder = std::mem::take(&mut self.placeholder);
        *self = Self::build(self.label, value, &placeholder, self.multiline);
    }

    pub fn is_multiline(&self) -> bool {
        self.multiline
    }

    fn height(&self) -> u16 {
        if self.multiline {
            SINGLE_LINE_HEIGHT + 3
        } else {
            SINGLE_LINE_HEIGHT
        }
    }

    /// Feed a key to the text input. Enter in a single-line field is left
    /// for the form to interpret.
    fn input(&mut self, key: KeyEvent) -> bool {
        if !self.multiline && key.code == KeyCode::Enter {
            return false;
        }
        self.input.input(key)
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme, focused: bool) {
        let border_style = if focused {
            theme.focused_border_style()
        } else {
            theme.border_style()
        };
        self.input.set_block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(self.label),
        );
        self.input.set_style(theme.text_style());
        self.input.set_placeholder_style(theme.placeholder_style());
        if focused {
            self.input
                .set_cursor_style(Style::default().bg(theme.cursor).fg(theme.background));
        } else {
            self.input.set_cursor_style(Style::default());
        }
        frame.render_widget(self.input.widget(), area);
    }
}

/// An ordered set of fields with one focused at a time
pub struct FieldSet {
    fields: Vec<Field>,
    focused: usize,
}

impl FieldSet {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields, focused: 0 }
    }

    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Field> {
        self.fields.get_mut(index)
    }

    /// Trimmed value of the field at `index`, empty if out of range
    pub fn value(&self, index: usize) -> String {
        self.fields.get(index).map(Field::trimmed).unwrap_or_default()
    }

    pub fn focused(&self) -> usize {
        self.focused
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focused = (self.focused + 1) % self.fields.len();
        }
    }

    pub fn focus_previous(&mut self) {
        if !self.fields.is_empty() {
            self.focused = (self.focused + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Rows needed to show every field
    pub fn height(&self) -> u16 {
        self.fields.iter().map(Field::height).sum()
    }

    /// Route a key to the focused field. Tab and BackTab move focus.
    /// Returns whether the key was consumed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Tab => {
                self.focus_next();
                true
            }
            KeyCode::BackTab => {
                self.focus_previous();
                true
            }
            _ => match self.fields.get_mut(self.focused) {
                Some(field) => field.input(key),
                None => false,
            },
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let constraints: Vec<Constraint> = self
            .fields
            .iter()
            .map(|field| {
                if field.multiline {
                    Constraint::Min(field.height())
                } else {
                    Constraint::Length(field.height())
                }
            })
            .collect();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let focused = self.focused;
        for (index, (field, chunk)) in self.fields.iter_mut().zip(chunks.iter()).enumerate() {
            field.render(frame, *chunk, theme, index == focused);
        }
    }
}

/// Whether a key is the form's submit shortcut. Ctrl-S works everywhere;
/// plain Enter only from single-line fields.
pub fn is_submit(key: &KeyEvent, fields: &FieldSet) -> bool {
    if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }
    key.code == KeyCode::Enter
        && key.modifiers.is_empty()
        && fields
            .get(fields.focused())
            .is_some_and(|field| !field.is_multiline())
}

/// Outcome reported back by a submission task
pub type SubmitResult = Result<(), String>;

#[derive(Debug, Default)]
pub enum SubmitState {
    #[default]
    Idle,
    Pending(oneshot::Receiver<SubmitResult>),
    Failed(String),
}

impl SubmitState {
    /// Start waiting on a submission task
    pub fn begin(&mut self) -> oneshot::Sender<SubmitResult> {
        let (sender, receiver) = oneshot::channel();
        *self = Self::Pending(receiver);
        sender
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        *self = Self::Failed(message.into());
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Pick up a finished submission without blocking
    pub fn poll(&mut self) {
        let Self::Pending(receiver) = self else {
            return;
        };
        match receiver.try_recv() {
            Ok(Ok(())) => *self = Self::Idle,
            Ok(Err(message)) => *self = Self::Failed(message),
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                *self = Self::Failed("Submission was interrupted".to_string())
            }
        }
    }

    /// One status line for the bottom of a form
    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme, hint: &str) {
        let line = match self {
            Self::Idle => Line::from(Span::styled(hint.to_string(), theme.placeholder_style())),
            Self::Pending(_) => Line::from(Span::styled("Saving…", theme.text_style())),
            Self::Failed(message) => Line::from(Span::styled(message.clone(), theme.error_style())),
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

/// Split `area` into the field area and a one-row status line
pub fn split_status(area: Rect) -> (Rect, Rect) {
    if area.height < 2 {
        return (area, Rect::new(area.x, area.y, area.width, 0));
    }
    let status = Rect::new(area.x, area.bottom() - 1, area.width, 1);
    let fields = Rect {
        height: area.height - 1,
        ..area
    };
    (fields, status)
}
