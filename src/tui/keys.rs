use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Things a global key binding can ask the app to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    ToggleHelp,
    AddNote,
    ScheduleMeeting,
    AddTask,
    ComposeEmail,
    ViewLatestNote,
    EditLatestNote,
    RescheduleMeeting,
    EditOpenTask,
    CloseDialog,
    MinimizeDialog,
    RestoreDialog,
    CycleFocus,
    NextLead,
    PreviousLead,
}

/// Key binding configuration
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub key: KeyCode,
    pub modifiers: KeyModifiers,
    pub action: Action,
    pub description: String,
}

impl KeyBinding {
    pub fn new(key: KeyCode, modifiers: KeyModifiers, action: Action, description: &str) -> Self {
        Self {
            key,
            modifiers,
            action,
            description: description.to_string(),
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.key == event.code && self.modifiers == event.modifiers
    }

    /// Short human form, e.g. `Ctrl-W` or `F2`
    pub fn label(&self) -> String {
        let key = match self.key {
            KeyCode::F(n) => format!("F{}", n),
            KeyCode::Char(c) => c.to_ascii_uppercase().to_string(),
            KeyCode::PageUp => "PgUp".to_string(),
            KeyCode::PageDown => "PgDn".to_string(),
            other => format!("{:?}", other),
        };
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            format!("Ctrl-{}", key)
        } else {
            key
        }
    }
}

/// Application key mappings, checked before the focused dialog sees a key
#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: Vec<KeyBinding>,
}

impl Default for KeyMap {
    fn default() -> Self {
        let none = KeyModifiers::NONE;
        let ctrl = KeyModifiers::CONTROL;
        Self {
            bindings: vec![
                KeyBinding::new(KeyCode::F(2), none, Action::AddNote, "Add note"),
                KeyBinding::new(KeyCode::F(3), none, Action::ScheduleMeeting, "Schedule meeting"),
                KeyBinding::new(KeyCode::F(4), none, Action::AddTask, "Add task"),
                KeyBinding::new(KeyCode::F(5), none, Action::ComposeEmail, "Compose email"),
                KeyBinding::new(KeyCode::F(6), none, Action::ViewLatestNote, "View latest note"),
                KeyBinding::new(KeyCode::F(7), none, Action::EditLatestNote, "Edit latest note"),
                KeyBinding::new(KeyCode::F(8), none, Action::RescheduleMeeting, "Reschedule next meeting"),
                KeyBinding::new(KeyCode::F(9), none, Action::EditOpenTask, "Edit first open task"),
                KeyBinding::new(KeyCode::Char('w'), ctrl, Action::CloseDialog, "Close focused dialog"),
                KeyBinding::new(KeyCode::Char('n'), ctrl, Action::MinimizeDialog, "Minimize focused dialog"),
                KeyBinding::new(KeyCode::Char('r'), ctrl, Action::RestoreDialog, "Restore last minimized dialog"),
                KeyBinding::new(KeyCode::Char('t'), ctrl, Action::CycleFocus, "Cycle dialog focus"),
                KeyBinding::new(KeyCode::PageUp, none, Action::PreviousLead, "Previous lead"),
                KeyBinding::new(KeyCode::PageDown, none, Action::NextLead, "Next lead"),
                KeyBinding::new(KeyCode::Char('g'), ctrl, Action::ToggleHelp, "Show/hide help"),
                KeyBinding::new(KeyCode::Char('c'), ctrl, Action::Quit, "Quit application"),
            ],
        }
    }
}

impl KeyMap {
    /// The global action bound to `event`, if any
    pub fn action(&self, event: &KeyEvent) -> Option<Action> {
        self.bindings
            .iter()
            .find(|binding| binding.matches(event))
            .map(|binding| binding.action)
    }

    /// Check if the event should quit the application
    pub fn should_quit(&self, event: &KeyEvent) -> bool {
        self.action(event) == Some(Action::Quit)
    }

    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    /// Get help text for all key bindings
    pub fn help_text(&self) -> String {
        let mut lines: Vec<String> = self
            .bindings
            .iter()
            .map(|binding| format!("{:<8} {}", binding.label(), binding.description))
            .collect();
        lines.push(format!("{:<8} {}", "Tab", "Next field in a form"));
        lines.push(format!("{:<8} {}", "Ctrl-S", "Submit a form"));
        lines.push(format!("{:<8} {}", "Esc", "Close the focused dialog"));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_keys_map_to_dialog_actions() {
        let keys = KeyMap::default();
        let f2 = KeyEvent::new(KeyCode::F(2), KeyModifiers::NONE);
        let f9 = KeyEvent::new(KeyCode::F(9), KeyModifiers::NONE);
        assert_eq!(keys.action(&f2), Some(Action::AddNote));
        assert_eq!(keys.action(&f9), Some(Action::EditOpenTask));
    }

    #[test]
    fn test_modifiers_must_match_exactly() {
        let keys = KeyMap::default();
        let plain_w = KeyEvent::new(KeyCode::Char('w'), KeyModifiers::NONE);
        let ctrl_w = KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL);
        let tab = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);

        assert_eq!(keys.action(&plain_w), None);
        assert_eq!(keys.action(&ctrl_w), Some(Action::CloseDialog));
        assert_eq!(keys.action(&tab), None);
        assert!(keys.should_quit(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn test_help_text_lists_every_binding() {
        let keys = KeyMap::default();
        let help = keys.help_text();
        for binding in keys.bindings() {
            assert!(help.contains(&binding.description));
        }
        assert!(help.contains("Ctrl-R"));
        assert!(help.contains("F5"));
    }
}
