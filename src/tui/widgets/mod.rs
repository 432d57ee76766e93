//! TUI widgets for the greeter screen.

mod clock;
mod login_panel;

pub use clock::Clock;
pub use login_panel::LoginPanel;
