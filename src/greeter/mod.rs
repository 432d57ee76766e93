//! Login daemon capability
//!
//! The authentication controller talks to the login daemon only through the
//! [`GreeterClient`] trait. The production implementation is [`GreetdBridge`],
//! which drives greetd from a background worker; [`mock::MockGreeter`] is an
//! in-process stand-in for tests.

pub mod bridge;
pub mod client;
pub mod mock;
pub mod protocol;

pub use bridge::GreetdBridge;
pub use client::{ClientError, GreetdClient};

use crate::session::Session;
use thiserror::Error;

/// Errors reported by a [`GreeterClient`]
#[derive(Debug, Error)]
pub enum GreeterError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Login daemon refused the request: {0}")]
    Daemon(String),

    #[error("Login daemon worker is no longer running")]
    Disconnected,

    #[error("Timed out waiting for the login daemon")]
    Timeout,

    #[error("Failed to start login daemon worker: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Result type for greeter client operations
pub type GreeterResult<T> = Result<T, GreeterError>;

/// Asynchronous notifications from the login daemon.
///
/// These are delivered through the UI event loop, one at a time, after the
/// call that caused them has returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GreeterEvent {
    /// The answer to the last prompt was accepted or rejected.
    AuthenticationComplete { success: bool },
    /// The daemon needs another answer in the same conversation.
    Prompt { text: String },
    /// Informational or error text from the authentication stack.
    Message { text: String },
}

/// Capability interface to the login daemon.
///
/// Calls return as soon as the request is queued. Outcomes arrive later as
/// [`GreeterEvent`]s, except for [`GreeterClient::start_session`] which waits
/// for the daemon's verdict.
pub trait GreeterClient {
    /// Begin an authentication conversation for `username`.
    fn authenticate(&mut self, username: &str) -> GreeterResult<()>;

    /// Answer the pending prompt with the user's secret.
    fn respond(&mut self, secret: &str) -> GreeterResult<()>;

    /// Start `session` for the authenticated user.
    fn start_session(&mut self, session: &Session) -> GreeterResult<()>;

    /// Returns true once the daemon has accepted the user's credentials.
    fn is_authenticated(&self) -> bool;

    /// Returns true while an authentication conversation is open.
    fn is_in_authentication(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_is_transparent() {
        let err = GreeterError::from(ClientError::ConnectionClosed);
        assert_eq!(err.to_string(), "Connection closed by greetd");
    }

    #[test]
    fn test_daemon_error_display() {
        let err = GreeterError::Daemon("no such session".to_string());
        assert!(err.to_string().contains("no such session"));
    }
}
