//! Full-screen greeter UI.
//!
//! The screen starts covered (clock only). Any key or click shows the login
//! panel; Esc covers it again.

mod app;
mod events;
pub mod widgets;

pub use app::{App, AppPhase, AppResult, LoginView};
pub use events::{Event, EventHandler};

use std::io;
use std::panic;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

use crate::greeter::GreeterClient;

/// Tick rate of the event loop in milliseconds, drives the clock.
pub const TICK_RATE_MS: u64 = 250;

/// A type alias for the terminal type used in this application.
pub type Tui = Terminal<CrosstermBackend<io::Stdout>>;

/// Initialize the terminal for TUI mode.
pub fn init() -> io::Result<Tui> {
    execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
    enable_raw_mode()?;

    // Set up panic hook to restore terminal on panic
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));

    Terminal::new(CrosstermBackend::new(io::stdout()))
}

/// Restore the terminal to its original state.
pub fn restore() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
    Ok(())
}

/// Run the greeter until a session is launched.
///
/// `events` must be the handler whose sender was given to the greeter
/// client, so daemon notifications arrive in the same loop.
pub fn run<C: GreeterClient>(
    terminal: &mut Tui,
    app: &mut App<C>,
    events: &EventHandler,
) -> AppResult<()> {
    while app.is_running() {
        terminal.draw(|frame| app.render(frame))?;
        let event = events.next()?;
        app.handle_event(event)?;
    }

    Ok(())
}
