//! Password authentication
//!
//! The [`AuthenticationController`] decides when a password may be
//! submitted, forwards it to the login daemon, and reacts to the daemon's
//! verdict. It talks to the screen only through [`UiBinding`].

mod controller;

pub use controller::AuthenticationController;

use crate::config::Config;
use thiserror::Error;

/// Errors raised while setting up authentication
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No default user configured (set `user` in the config file)")]
    NoDefaultUser,
}

/// Where the controller is in an authentication round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No round in flight, submissions are accepted
    #[default]
    Idle,
    /// A secret was sent and the daemon's verdict is pending
    AwaitingResponse,
    /// The verdict arrived and the submit handler is being re-installed
    ReArming,
}

/// Outcome of [`AuthenticationController::submit_password`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The secret was handed to the daemon (or the round failed to start
    /// and has already been reset)
    Accepted,
    /// A round is already in flight; the secret was dropped
    Busy,
    /// The daemon already reports an authenticated user
    AlreadyAuthenticated,
}

/// The screen as seen by the controller
pub trait UiBinding {
    fn set_input_enabled(&mut self, enabled: bool);
    fn clear_input(&mut self);
    fn set_feedback_text(&mut self, text: &str);
    /// The daemon accepted the request to start session `key`.
    fn start_session_requested(&mut self, key: &str);
}

/// Controller settings taken from the config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub default_user: Option<String>,
    pub invalid_password_text: String,
    pub session_failed_text: String,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_user: config.default_user().map(str::to_string),
            invalid_password_text: config.invalid_password_text.clone(),
            session_failed_text: config.session_failed_text.clone(),
        }
    }

    /// Settings for `user` with the stock feedback texts
    pub fn for_user(user: impl Into<String>) -> Self {
        let config = Config::default();
        Self {
            default_user: Some(user.into()),
            ..Self::from_config(&config)
        }
    }
}
