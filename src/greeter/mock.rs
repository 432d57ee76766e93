//! Mock greeter client for testing.
//!
//! Provides a scriptable in-process implementation of `GreeterClient`. The
//! mock never talks to a daemon; instead it queues the events a real daemon
//! would produce, and the test delivers them to the controller when it
//! chooses, the way the UI event loop would.

use std::collections::VecDeque;

use super::{GreeterClient, GreeterError, GreeterEvent, GreeterResult};
use crate::session::Session;

/// Configuration for mock greeter behavior.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Password the mock accepts.
    /// Default: "correct"
    pub password: String,
    /// Follow-up prompts issued after the password is accepted.
    pub prompts: VecDeque<String>,
    /// If true, start_session() is refused.
    pub refuse_sessions: bool,
    /// If true, authenticate() and respond() fail before queueing anything.
    pub fail_requests: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            password: "correct".to_string(),
            prompts: VecDeque::new(),
            refuse_sessions: false,
            fail_requests: false,
        }
    }
}

impl MockConfig {
    /// Create a config that accepts the given password.
    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            ..Default::default()
        }
    }

    /// Create a config that asks the given follow-up questions.
    pub fn with_prompts<I, S>(prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prompts: prompts.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Create a config whose daemon refuses to start sessions.
    pub fn refusing_sessions() -> Self {
        Self {
            refuse_sessions: true,
            ..Default::default()
        }
    }

    /// Create a config whose requests cannot be delivered.
    pub fn failing() -> Self {
        Self {
            fail_requests: true,
            ..Default::default()
        }
    }
}

/// A call made against the mock. Secrets are never recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GreeterCall {
    Authenticate(String),
    Respond,
    StartSession(String),
}

/// Mock greeter client for testing.
#[derive(Debug, Default)]
pub struct MockGreeter {
    config: MockConfig,
    calls: Vec<GreeterCall>,
    events: VecDeque<GreeterEvent>,
    prompts: VecDeque<String>,
    authenticated: bool,
    in_authentication: bool,
    password_verified: bool,
}

impl MockGreeter {
    /// Create a new mock with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with custom configuration.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Drain the events the daemon would have delivered so far.
    pub fn take_events(&mut self) -> Vec<GreeterEvent> {
        self.events.drain(..).collect()
    }

    /// All calls made, in order.
    pub fn calls(&self) -> &[GreeterCall] {
        &self.calls
    }

    pub fn respond_count(&self) -> usize {
        self.count(|call| matches!(call, GreeterCall::Respond))
    }

    pub fn authenticate_count(&self) -> usize {
        self.count(|call| matches!(call, GreeterCall::Authenticate(_)))
    }

    /// Keys of every session start requested, refused or not.
    pub fn started_sessions(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                GreeterCall::StartSession(key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&GreeterCall) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    fn finish(&mut self, success: bool) {
        self.authenticated = success;
        self.in_authentication = false;
        self.events
            .push_back(GreeterEvent::AuthenticationComplete { success });
    }
}

impl GreeterClient for MockGreeter {
    fn authenticate(&mut self, username: &str) -> GreeterResult<()> {
        if self.config.fail_requests {
            return Err(GreeterError::Disconnected);
        }
        self.calls.push(GreeterCall::Authenticate(username.to_string()));
        self.authenticated = false;
        self.in_authentication = true;
        self.password_verified = false;
        self.prompts = self.config.prompts.clone();
        Ok(())
    }

    fn respond(&mut self, secret: &str) -> GreeterResult<()> {
        if self.config.fail_requests {
            return Err(GreeterError::Disconnected);
        }
        self.calls.push(GreeterCall::Respond);

        if !self.in_authentication {
            self.finish(false);
            return Ok(());
        }

        if !self.password_verified {
            if secret != self.config.password {
                self.finish(false);
                return Ok(());
            }
            self.password_verified = true;
        }

        match self.prompts.pop_front() {
            Some(text) => self.events.push_back(GreeterEvent::Prompt { text }),
            None => self.finish(true),
        }
        Ok(())
    }

    fn start_session(&mut self, session: &Session) -> GreeterResult<()> {
        self.calls.push(GreeterCall::StartSession(session.key.clone()));
        if self.config.refuse_sessions {
            return Err(GreeterError::Daemon(format!(
                "unable to execute {}",
                session.exec.join(" ")
            )));
        }
        if !self.authenticated {
            return Err(GreeterError::Daemon("user is not authenticated".to_string()));
        }
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn is_in_authentication(&self) -> bool {
        self.in_authentication
    }
}
