//! Authentication state machine.

use tracing::{debug, error, info, warn};

use super::{AuthError, AuthSettings, AuthState, Submission, UiBinding};
use crate::greeter::{GreeterClient, GreeterEvent, GreeterResult};
use crate::session::{FocusRing, Session};

/// Mediates every password submission.
///
/// At most one round is in flight: a submission moves the controller from
/// `Idle` to `AwaitingResponse`, and only the daemon's verdict (or a
/// follow-up prompt) moves it back. The submit handler is modeled by
/// `submit_armed`, which is true exactly when the state is `Idle`.
pub struct AuthenticationController<C: GreeterClient> {
    client: C,
    sessions: FocusRing<Session>,
    default_user: String,
    invalid_password_text: String,
    session_failed_text: String,
    state: AuthState,
    submit_armed: bool,
}

impl<C: GreeterClient> AuthenticationController<C> {
    /// Create a controller. Fails if no default user is configured.
    pub fn new(
        client: C,
        sessions: FocusRing<Session>,
        settings: AuthSettings,
    ) -> Result<Self, AuthError> {
        let default_user = settings
            .default_user
            .filter(|user| !user.is_empty())
            .ok_or(AuthError::NoDefaultUser)?;

        Ok(Self {
            client,
            sessions,
            default_user,
            invalid_password_text: settings.invalid_password_text,
            session_failed_text: settings.session_failed_text,
            state: AuthState::Idle,
            submit_armed: true,
        })
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Whether the submit handler is installed.
    pub fn is_submit_armed(&self) -> bool {
        self.submit_armed
    }

    pub fn default_user(&self) -> &str {
        &self.default_user
    }

    pub fn sessions(&self) -> &FocusRing<Session> {
        &self.sessions
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Ask the daemon to open a conversation for the default user.
    pub fn start_default_authentication(&mut self) -> GreeterResult<()> {
        debug!("Starting authentication for {}", self.default_user);
        self.client.authenticate(&self.default_user)
    }

    /// Submit a password.
    ///
    /// The secret is forwarded to the daemon and then dropped; it is never
    /// stored or logged.
    pub fn submit_password(&mut self, secret: &str, ui: &mut dyn UiBinding) -> Submission {
        if self.state != AuthState::Idle {
            info!("Password submission ignored while busy ({:?})", self.state);
            return Submission::Busy;
        }
        if self.client.is_authenticated() {
            warn!("Password submitted but the user is already authenticated");
            return Submission::AlreadyAuthenticated;
        }

        self.state = AuthState::AwaitingResponse;
        self.submit_armed = false;
        ui.set_input_enabled(false);

        let mut sent = Ok(());
        if !self.client.is_in_authentication() {
            sent = self.start_default_authentication();
        }
        let sent = sent.and_then(|()| self.client.respond(secret));

        if let Err(e) = sent {
            error!("Failed to submit password: {}", e);
            self.state = AuthState::ReArming;
            ui.set_feedback_text(&e.to_string());
            self.finish_round(ui);
        }
        Submission::Accepted
    }

    /// Handle the daemon's verdict on the submitted password.
    ///
    /// # Panics
    ///
    /// If no submission is awaiting a response.
    pub fn on_authentication_complete(&mut self, success: bool, ui: &mut dyn UiBinding) {
        assert_eq!(
            self.state,
            AuthState::AwaitingResponse,
            "authentication completion delivered with no round in flight"
        );
        self.state = AuthState::ReArming;

        if success {
            info!("Authentication succeeded for {}", self.default_user);
            self.start_current_session(ui);
        } else {
            info!("Authentication failed for {}", self.default_user);
            if !self.invalid_password_text.is_empty() {
                ui.set_feedback_text(&self.invalid_password_text);
            }
            self.restart_authentication(ui);
        }

        self.finish_round(ui);
    }

    /// The daemon asks a further question in the same conversation.
    pub fn on_prompt(&mut self, text: &str, ui: &mut dyn UiBinding) {
        ui.set_feedback_text(text);
        if self.state == AuthState::AwaitingResponse {
            debug!("Daemon asked a follow-up question");
            self.state = AuthState::ReArming;
            self.finish_round(ui);
        }
    }

    /// Informational or error text from the daemon.
    pub fn on_message(&mut self, text: &str, ui: &mut dyn UiBinding) {
        ui.set_feedback_text(text);
    }

    /// Dispatch a daemon event to its handler.
    pub fn handle_event(&mut self, event: GreeterEvent, ui: &mut dyn UiBinding) {
        match event {
            GreeterEvent::AuthenticationComplete { success } => {
                self.on_authentication_complete(success, ui)
            }
            GreeterEvent::Prompt { text } => self.on_prompt(&text, ui),
            GreeterEvent::Message { text } => self.on_message(&text, ui),
        }
    }

    /// Select the next session and show its name.
    pub fn cycle_session(&mut self, ui: &mut dyn UiBinding) {
        if let Some(entry) = self.sessions.next() {
            debug!("Session set to: {}", entry.key());
            ui.set_feedback_text(entry.display());
        }
    }

    /// Select the previous session and show its name.
    pub fn cycle_session_back(&mut self, ui: &mut dyn UiBinding) {
        if let Some(entry) = self.sessions.previous() {
            debug!("Session set to: {}", entry.key());
            ui.set_feedback_text(entry.display());
        }
    }

    fn start_current_session(&mut self, ui: &mut dyn UiBinding) {
        let outcome = self
            .sessions
            .current()
            .map(|entry| (entry.key().to_string(), self.client.start_session(entry.value())));

        match outcome {
            Some((key, Ok(()))) => {
                info!("Starting session {}", key);
                ui.start_session_requested(&key);
            }
            Some((key, Err(e))) => {
                error!("Failed to start session {}: {}", key, e);
                self.session_start_failed(ui);
            }
            None => {
                error!("No session available to start");
                self.session_start_failed(ui);
            }
        }
    }

    fn session_start_failed(&mut self, ui: &mut dyn UiBinding) {
        if !self.session_failed_text.is_empty() {
            ui.set_feedback_text(&self.session_failed_text);
        }
        self.restart_authentication(ui);
    }

    fn restart_authentication(&mut self, ui: &mut dyn UiBinding) {
        if let Err(e) = self.start_default_authentication() {
            error!("Failed to restart authentication: {}", e);
            ui.set_feedback_text(&e.to_string());
        }
    }

    /// Clear and re-enable the input, then re-arm.
    fn finish_round(&mut self, ui: &mut dyn UiBinding) {
        ui.clear_input();
        ui.set_input_enabled(true);
        self.rearm();
    }

    fn rearm(&mut self) {
        assert!(
            !self.submit_armed,
            "submit handler re-armed while already active"
        );
        debug_assert_eq!(self.state, AuthState::ReArming);
        self.submit_armed = true;
        self.state = AuthState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greeter::mock::{GreeterCall, MockConfig, MockGreeter};
    use crate::session::SessionKind;

    #[derive(Debug, Default)]
    struct RecordingUi {
        input_enabled: bool,
        clears: usize,
        feedback: Vec<String>,
        started: Vec<String>,
    }

    impl UiBinding for RecordingUi {
        fn set_input_enabled(&mut self, enabled: bool) {
            self.input_enabled = enabled;
        }

        fn clear_input(&mut self) {
            self.clears += 1;
        }

        fn set_feedback_text(&mut self, text: &str) {
            self.feedback.push(text.to_string());
        }

        fn start_session_requested(&mut self, key: &str) {
            self.started.push(key.to_string());
        }
    }

    fn ring(keys: &[&str]) -> FocusRing<Session> {
        let sessions: Vec<Session> = keys
            .iter()
            .map(|key| Session {
                key: key.to_string(),
                name: key.to_uppercase(),
                comment: None,
                exec: vec![key.to_string()],
                kind: SessionKind::Wayland,
                desktop_names: None,
            })
            .collect();
        FocusRing::build_labeled(sessions, |s| s.key.clone(), |s| s.name.clone())
    }

    fn controller(config: MockConfig) -> AuthenticationController<MockGreeter> {
        AuthenticationController::new(
            MockGreeter::with_config(config),
            ring(&["gnome", "i3"]),
            AuthSettings::for_user("alice"),
        )
        .unwrap()
    }

    fn deliver(ctl: &mut AuthenticationController<MockGreeter>, ui: &mut RecordingUi) {
        for event in ctl.client_mut().take_events() {
            ctl.handle_event(event, ui);
        }
    }

    #[test]
    fn test_missing_user_is_rejected() {
        let settings = AuthSettings {
            default_user: None,
            ..AuthSettings::for_user("x")
        };
        let result = AuthenticationController::new(MockGreeter::new(), ring(&[]), settings);
        assert!(matches!(result, Err(AuthError::NoDefaultUser)));

        let settings = AuthSettings::for_user("");
        let result = AuthenticationController::new(MockGreeter::new(), ring(&[]), settings);
        assert!(matches!(result, Err(AuthError::NoDefaultUser)));
    }

    #[test]
    fn test_submission_moves_to_awaiting() {
        let mut ctl = controller(MockConfig::default());
        let mut ui = RecordingUi::default();
        ctl.start_default_authentication().unwrap();

        assert_eq!(ctl.submit_password("correct", &mut ui), Submission::Accepted);
        assert_eq!(ctl.state(), AuthState::AwaitingResponse);
        assert!(!ctl.is_submit_armed());
        assert!(!ui.input_enabled);
        // Already in authentication, so no second authenticate
        assert_eq!(ctl.client().authenticate_count(), 1);
    }

    #[test]
    fn test_submission_starts_authentication_when_needed() {
        let mut ctl = controller(MockConfig::default());
        let mut ui = RecordingUi::default();

        ctl.submit_password("correct", &mut ui);
        assert_eq!(
            ctl.client().calls(),
            &[
                GreeterCall::Authenticate("alice".to_string()),
                GreeterCall::Respond
            ]
        );
    }

    #[test]
    fn test_failure_rearms_with_feedback() {
        let mut ctl = controller(MockConfig::default());
        let mut ui = RecordingUi::default();

        ctl.submit_password("wrong", &mut ui);
        deliver(&mut ctl, &mut ui);

        assert_eq!(ctl.state(), AuthState::Idle);
        assert!(ctl.is_submit_armed());
        assert!(ui.input_enabled);
        assert_eq!(ui.clears, 1);
        assert_eq!(ui.feedback.last().map(String::as_str), Some("Invalid Password"));
        // A fresh round was opened for the retry
        assert_eq!(ctl.client().authenticate_count(), 2);
        assert!(ctl.client().is_in_authentication());
    }

    #[test]
    fn test_empty_failure_text_shows_nothing() {
        let settings = AuthSettings {
            invalid_password_text: String::new(),
            ..AuthSettings::for_user("alice")
        };
        let mut ctl =
            AuthenticationController::new(MockGreeter::new(), ring(&["gnome"]), settings).unwrap();
        let mut ui = RecordingUi::default();

        ctl.submit_password("wrong", &mut ui);
        deliver(&mut ctl, &mut ui);
        assert!(ui.feedback.is_empty());
    }

    #[test]
    fn test_success_starts_current_session() {
        let mut ctl = controller(MockConfig::default());
        let mut ui = RecordingUi::default();

        ctl.submit_password("correct", &mut ui);
        deliver(&mut ctl, &mut ui);

        assert_eq!(ctl.client().started_sessions(), vec!["gnome"]);
        assert_eq!(ui.started, vec!["gnome"]);
        assert_eq!(ctl.state(), AuthState::Idle);
    }

    #[test]
    fn test_busy_submission_is_dropped() {
        let mut ctl = controller(MockConfig::default());
        let mut ui = RecordingUi::default();

        assert_eq!(ctl.submit_password("correct", &mut ui), Submission::Accepted);
        assert_eq!(ctl.submit_password("correct", &mut ui), Submission::Busy);
        assert_eq!(ctl.client().respond_count(), 1);
    }

    #[test]
    fn test_already_authenticated() {
        let mut ctl = controller(MockConfig::default());
        let mut ui = RecordingUi::default();
        ctl.client_mut().authenticate("alice").unwrap();
        ctl.client_mut().respond("correct").unwrap();
        ctl.client_mut().take_events();

        assert_eq!(
            ctl.submit_password("correct", &mut ui),
            Submission::AlreadyAuthenticated
        );
        assert_eq!(ctl.state(), AuthState::Idle);
    }

    #[test]
    fn test_client_failure_resets_round() {
        let mut ctl = controller(MockConfig::failing());
        let mut ui = RecordingUi::default();

        assert_eq!(ctl.submit_password("correct", &mut ui), Submission::Accepted);
        assert_eq!(ctl.state(), AuthState::Idle);
        assert!(ctl.is_submit_armed());
        assert!(ui.input_enabled);
        assert!(!ui.feedback.is_empty());
    }

    #[test]
    fn test_session_refusal_restarts_authentication() {
        let mut ctl = controller(MockConfig::refusing_sessions());
        let mut ui = RecordingUi::default();

        ctl.submit_password("correct", &mut ui);
        deliver(&mut ctl, &mut ui);

        assert_eq!(ctl.client().started_sessions(), vec!["gnome"]);
        assert!(ui.started.is_empty());
        assert_eq!(
            ui.feedback.last().map(String::as_str),
            Some("Unable to start session")
        );
        assert_eq!(ctl.client().authenticate_count(), 2);
        assert_eq!(ctl.state(), AuthState::Idle);
    }

    #[test]
    fn test_empty_ring_reports_failure() {
        let mut ctl = AuthenticationController::new(
            MockGreeter::new(),
            ring(&[]),
            AuthSettings::for_user("alice"),
        )
        .unwrap();
        let mut ui = RecordingUi::default();

        ctl.submit_password("correct", &mut ui);
        deliver(&mut ctl, &mut ui);

        assert!(ctl.client().started_sessions().is_empty());
        assert_eq!(
            ui.feedback.last().map(String::as_str),
            Some("Unable to start session")
        );
        assert!(ctl.is_submit_armed());
    }

    #[test]
    fn test_prompt_continues_conversation() {
        let mut ctl = controller(MockConfig::with_prompts(["Verification code:"]));
        let mut ui = RecordingUi::default();

        ctl.submit_password("correct", &mut ui);
        deliver(&mut ctl, &mut ui);
        assert_eq!(ctl.state(), AuthState::Idle);
        assert_eq!(
            ui.feedback.last().map(String::as_str),
            Some("Verification code:")
        );

        ctl.submit_password("123456", &mut ui);
        deliver(&mut ctl, &mut ui);
        assert_eq!(ctl.client().authenticate_count(), 1);
        assert_eq!(ctl.client().started_sessions(), vec!["gnome"]);
    }

    #[test]
    fn test_prompt_while_idle_only_shows_text() {
        let mut ctl = controller(MockConfig::default());
        let mut ui = RecordingUi::default();
        ctl.on_prompt("Hello", &mut ui);
        assert_eq!(ui.feedback, vec!["Hello"]);
        assert_eq!(ui.clears, 0);
        assert!(ctl.is_submit_armed());
    }

    #[test]
    fn test_message_changes_no_state() {
        let mut ctl = controller(MockConfig::default());
        let mut ui = RecordingUi::default();
        ctl.submit_password("correct", &mut ui);
        ctl.handle_event(
            GreeterEvent::Message {
                text: "Your password expires soon".to_string(),
            },
            &mut ui,
        );
        assert_eq!(ctl.state(), AuthState::AwaitingResponse);
        assert_eq!(ui.feedback, vec!["Your password expires soon"]);
    }

    #[test]
    fn test_cycle_session_shows_name() {
        let mut ctl = controller(MockConfig::default());
        let mut ui = RecordingUi::default();
        ctl.cycle_session(&mut ui);
        assert_eq!(ctl.sessions().current().unwrap().key(), "i3");
        assert_eq!(ui.feedback, vec!["I3"]);
        ctl.cycle_session_back(&mut ui);
        assert_eq!(ctl.sessions().current().unwrap().key(), "gnome");
        assert_eq!(ui.feedback.last().map(String::as_str), Some("GNOME"));
    }

    #[test]
    #[should_panic(expected = "no round in flight")]
    fn test_completion_while_idle_panics() {
        let mut ctl = controller(MockConfig::default());
        let mut ui = RecordingUi::default();
        ctl.on_authentication_complete(true, &mut ui);
    }
}
