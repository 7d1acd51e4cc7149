//! Terminal user interface built on ratatui

mod app;
pub mod components;
mod events;
mod keys;
pub mod styles;

pub use app::App;
pub use events::{Event, EventHandler};
pub use keys::KeyMap;

use crate::config::Config;
use anyhow::Result;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use tracing::info;

pub type Backend = CrosstermBackend<io::Stdout>;
pub type Frame<'a> = ratatui::Frame<'a>;

/// Initialize the terminal for TUI mode
pub fn init_terminal(mouse: bool) -> Result<Terminal<Backend>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if mouse {
        execute!(stdout, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to normal mode
pub fn restore_terminal(terminal: &mut Terminal<Backend>, mouse: bool) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    if mouse {
        execute!(terminal.backend_mut(), DisableMouseCapture)?;
    }
    terminal.show_cursor()?;
    Ok(())
}

/// Main TUI entry point
pub async fn run(config: Config) -> Result<()> {
    let mouse = config.mouse_enabled;
    let mut app = App::new(config.clone()).await?;
    let mut event_handler = EventHandler::with_terminal(config.tick_rate());
    let mut terminal = init_terminal(mouse)?;
    info!(data_mode = %config.data_mode, "terminal ready");

    let result = run_app(&mut terminal, &mut app, &mut event_handler).await;

    restore_terminal(&mut terminal, mouse)?;
    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<Backend>,
    app: &mut App,
    event_handler: &mut EventHandler,
) -> Result<()> {
    loop {
        app.sync();
        terminal.draw(|frame| app.render(frame))?;

        match event_handler.next().await {
            Some(event) => {
                if app.handle_event(event).await? {
                    break; // Exit requested
                }
            }
            None => break,
        }
    }
    Ok(())
}
