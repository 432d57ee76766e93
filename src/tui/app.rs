//! Application state management for the TUI.

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{prelude::*, widgets::Paragraph};
use tracing::{debug, error};

use super::events::Event;
use super::widgets::{Clock, LoginPanel};
use crate::auth::{AuthenticationController, UiBinding};
use crate::config::{Config, HotkeyConfig, ModKey, PowerConfig};
use crate::greeter::{GreeterClient, GreeterEvent};
use crate::power::{self, PowerAction};

/// Application result type.
pub type AppResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Coarse screen state, independent of the authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppPhase {
    /// Only the clock is shown
    #[default]
    Covered,
    /// The login panel is shown and takes input
    LoginVisible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hotkey {
    Power(PowerAction),
    NextSession,
    PreviousSession,
}

/// Screen state driven by the authentication controller.
#[derive(Debug)]
pub struct LoginView {
    input: String,
    input_enabled: bool,
    feedback: String,
    launched_session: Option<String>,
}

impl Default for LoginView {
    fn default() -> Self {
        Self {
            input: String::new(),
            input_enabled: true,
            feedback: String::new(),
            launched_session: None,
        }
    }
}

impl LoginView {
    /// Number of characters typed. The text itself is not exposed.
    pub fn input_len(&self) -> usize {
        self.input.chars().count()
    }

    pub fn is_input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    /// Key of the session the daemon agreed to start.
    pub fn launched_session(&self) -> Option<&str> {
        self.launched_session.as_deref()
    }
}

impl UiBinding for LoginView {
    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }

    fn clear_input(&mut self) {
        self.input.clear();
    }

    fn set_feedback_text(&mut self, text: &str) {
        self.feedback = text.to_string();
    }

    fn start_session_requested(&mut self, key: &str) {
        self.launched_session = Some(key.to_string());
    }
}

/// Application state.
pub struct App<C: GreeterClient> {
    /// Is the application running?
    running: bool,
    phase: AppPhase,
    controller: AuthenticationController<C>,
    view: LoginView,
    /// Name shown in the greeting
    display_name: String,
    password_char: char,
    hotkeys: HotkeyConfig,
    power: PowerConfig,
    hint: String,
    now: DateTime<Local>,
    /// Terminal width
    width: u16,
    /// Terminal height
    height: u16,
}

fn modifier_for(mod_key: ModKey) -> KeyModifiers {
    match mod_key {
        ModKey::Control => KeyModifiers::CONTROL,
        ModKey::Alt => KeyModifiers::ALT,
        ModKey::Super => KeyModifiers::SUPER,
    }
}

fn hotkey_hint(hotkeys: &HotkeyConfig) -> String {
    let modifier = match hotkeys.mod_key {
        ModKey::Control => "Ctrl",
        ModKey::Alt => "Alt",
        ModKey::Super => "Super",
    };
    format!(
        "{0}+{1} session · {0}+{2} shutdown · {0}+{3} restart",
        modifier,
        hotkeys.session.to_ascii_uppercase(),
        hotkeys.shutdown.to_ascii_uppercase(),
        hotkeys.restart.to_ascii_uppercase(),
    )
}

impl<C: GreeterClient> App<C> {
    /// Create a new application instance.
    pub fn new(
        controller: AuthenticationController<C>,
        config: &Config,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            running: true,
            phase: AppPhase::Covered,
            controller,
            view: LoginView::default(),
            display_name: display_name.into(),
            password_char: config.password_char,
            hotkeys: config.hotkeys.clone(),
            power: config.power.clone(),
            hint: hotkey_hint(&config.hotkeys),
            now: Local::now(),
            width: 0,
            height: 0,
        }
    }

    /// Returns true if the application is running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Set running status to false to quit the application.
    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn phase(&self) -> AppPhase {
        self.phase
    }

    pub fn view(&self) -> &LoginView {
        &self.view
    }

    pub fn controller(&self) -> &AuthenticationController<C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut AuthenticationController<C> {
        &mut self.controller
    }

    /// Dispatch one event from the loop.
    pub fn handle_event(&mut self, event: Event) -> AppResult<()> {
        match event {
            Event::Tick => self.tick(),
            Event::Key(key_event) => self.handle_key_event(key_event)?,
            Event::Resize(width, height) => self.handle_resize(width, height),
            Event::Click => self.uncover(),
            Event::Greeter(greeter_event) => self.handle_greeter_event(greeter_event),
        }
        Ok(())
    }

    /// Handle a tick event.
    pub fn tick(&mut self) {
        self.now = Local::now();
    }

    /// Handle terminal resize.
    pub fn handle_resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    /// Forward a login daemon notification to the controller.
    pub fn handle_greeter_event(&mut self, event: GreeterEvent) {
        self.controller.handle_event(event, &mut self.view);
        if let Some(key) = self.view.launched_session() {
            debug!("Session {} launched, exiting", key);
            self.quit();
        }
    }

    fn uncover(&mut self) {
        if self.phase == AppPhase::Covered {
            debug!("Showing login panel");
            self.phase = AppPhase::LoginVisible;
        }
    }

    fn hotkey(&self, key_event: &KeyEvent) -> Option<Hotkey> {
        let KeyCode::Char(c) = key_event.code else {
            return None;
        };
        if !key_event
            .modifiers
            .contains(modifier_for(self.hotkeys.mod_key))
        {
            return None;
        }

        let c = c.to_ascii_lowercase();
        if c == self.hotkeys.session {
            return Some(if key_event.modifiers.contains(KeyModifiers::SHIFT) {
                Hotkey::PreviousSession
            } else {
                Hotkey::NextSession
            });
        }

        [
            (self.hotkeys.shutdown, PowerAction::Shutdown),
            (self.hotkeys.restart, PowerAction::Restart),
            (self.hotkeys.suspend, PowerAction::Suspend),
            (self.hotkeys.hibernate, PowerAction::Hibernate),
        ]
        .into_iter()
        .find(|(letter, _)| *letter == c)
        .map(|(_, action)| Hotkey::Power(action))
    }

    fn run_hotkey(&mut self, hotkey: Hotkey) {
        match hotkey {
            Hotkey::NextSession => self.controller.cycle_session(&mut self.view),
            Hotkey::PreviousSession => self.controller.cycle_session_back(&mut self.view),
            Hotkey::Power(action) => {
                if let Err(e) = power::run(action, &self.power) {
                    error!("{}", e);
                    self.view.set_feedback_text(&e.to_string());
                }
            }
        }
    }

    /// Handle key events.
    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> AppResult<()> {
        // Hotkeys work on the covered screen too, and leave it covered
        if let Some(hotkey) = self.hotkey(&key_event) {
            self.run_hotkey(hotkey);
            return Ok(());
        }

        // The key that uncovers the screen is not typed
        if self.phase == AppPhase::Covered {
            self.uncover();
            return Ok(());
        }

        let modifiers = key_event.modifiers;
        match key_event.code {
            KeyCode::Esc => {
                debug!("Covering login panel");
                self.phase = AppPhase::Covered;
            }
            KeyCode::Enter => {
                let secret = std::mem::take(&mut self.view.input);
                self.controller.submit_password(&secret, &mut self.view);
            }
            KeyCode::Backspace if self.view.input_enabled => {
                self.view.input.pop();
            }
            KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => {
                if self.view.input_enabled {
                    self.view.input.clear();
                }
            }
            KeyCode::Char(c)
                if self.view.input_enabled
                    && !modifiers.intersects(
                        KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                    ) =>
            {
                self.view.input.push(c);
            }
            _ => {}
        }
        Ok(())
    }

    /// Render the application UI.
    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        match self.phase {
            AppPhase::Covered => {
                let [clock_area, hint_area] =
                    Layout::vertical([Constraint::Min(2), Constraint::Length(1)]).areas(area);
                frame.render_widget(Clock::new(self.now), clock_area);
                frame.render_widget(
                    Paragraph::new("Press any key to log in")
                        .alignment(Alignment::Center)
                        .style(Style::default().fg(Color::DarkGray)),
                    hint_area,
                );
            }
            AppPhase::LoginVisible => {
                let [clock_area, panel_area] =
                    Layout::vertical([Constraint::Length(4), Constraint::Min(0)]).areas(area);
                frame.render_widget(Clock::new(self.now), clock_area);

                let session = self
                    .controller
                    .sessions()
                    .current()
                    .map(|entry| entry.display());
                let panel = LoginPanel::new(&self.display_name)
                    .input(
                        self.view.input_len(),
                        self.password_char,
                        self.view.input_enabled,
                    )
                    .feedback(&self.view.feedback)
                    .session(session)
                    .hint(&self.hint);
                frame.render_widget(panel, panel_area);
            }
        }
    }
}
