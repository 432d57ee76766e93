//! End-to-end scenarios for the authentication controller against the mock
//! greeter, delivering daemon events the way the UI loop does.

use minigreet::auth::{AuthSettings, AuthState, AuthenticationController, Submission, UiBinding};
use minigreet::greeter::mock::{GreeterCall, MockConfig, MockGreeter};
use minigreet::greeter::{GreeterClient, GreeterEvent};
use minigreet::session::{build_session_ring, Session, SessionKind};

#[derive(Debug, Default)]
struct Screen {
    input: String,
    input_enabled: bool,
    feedback: String,
    started: Vec<String>,
}

impl UiBinding for Screen {
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
        self.started.push(key.to_string());
    }
}

fn sessions(keys: &[&str]) -> Vec<Session> {
    keys.iter()
        .map(|key| Session {
            key: key.to_string(),
            name: key.to_string(),
            comment: None,
            exec: vec![format!("start-{}", key)],
            kind: SessionKind::X11,
            desktop_names: None,
        })
        .collect()
}

fn controller(config: MockConfig, keys: &[&str]) -> AuthenticationController<MockGreeter> {
    let ring = build_session_ring(&sessions(keys));
    let mut controller = AuthenticationController::new(
        MockGreeter::with_config(config),
        ring,
        AuthSettings::for_user("alice"),
    )
    .unwrap();
    controller.start_default_authentication().unwrap();
    controller
}

/// Deliver every pending daemon event, one callback at a time.
fn pump(controller: &mut AuthenticationController<MockGreeter>, screen: &mut Screen) -> usize {
    let events = controller.client_mut().take_events();
    let delivered = events.len();
    for event in events {
        controller.handle_event(event, screen);
    }
    delivered
}

#[test]
fn test_wrong_password_rearms_for_retry() {
    let mut ctl = controller(MockConfig::default(), &["gnome"]);
    let mut screen = Screen {
        input: "wrong".to_string(),
        input_enabled: true,
        ..Default::default()
    };

    assert_eq!(ctl.submit_password("wrong", &mut screen), Submission::Accepted);
    assert!(!screen.input_enabled);
    assert_eq!(pump(&mut ctl, &mut screen), 1);

    assert_eq!(screen.feedback, "Invalid Password");
    assert_eq!(ctl.state(), AuthState::Idle);
    assert!(screen.input_enabled);
    assert!(screen.input.is_empty());
    assert!(ctl.is_submit_armed());
    assert!(ctl.client().is_in_authentication());

    // The retry goes straight to respond, no extra authenticate
    ctl.submit_password("correct", &mut screen);
    pump(&mut ctl, &mut screen);
    assert_eq!(ctl.client().authenticate_count(), 2);
    assert_eq!(screen.started, vec!["gnome"]);
}

#[test]
fn test_correct_password_starts_current_session_once() {
    let mut ctl = controller(MockConfig::default(), &["gnome", "i3"]);
    let mut screen = Screen::default();

    ctl.submit_password("correct", &mut screen);
    pump(&mut ctl, &mut screen);

    assert_eq!(ctl.client().started_sessions(), vec!["gnome"]);
    assert_eq!(screen.started, vec!["gnome"]);
    assert_eq!(ctl.state(), AuthState::Idle);
}

#[test]
fn test_cycled_session_is_started() {
    let mut ctl = controller(MockConfig::default(), &["gnome", "i3"]);
    let mut screen = Screen::default();

    ctl.cycle_session(&mut screen);
    assert_eq!(screen.feedback, "i3");

    ctl.submit_password("correct", &mut screen);
    pump(&mut ctl, &mut screen);
    assert_eq!(ctl.client().started_sessions(), vec!["i3"]);
}

#[test]
fn test_rapid_double_submit_responds_once() {
    let mut ctl = controller(MockConfig::default(), &["gnome"]);
    let mut screen = Screen::default();

    assert_eq!(ctl.submit_password("correct", &mut screen), Submission::Accepted);
    assert_eq!(ctl.submit_password("correct", &mut screen), Submission::Busy);
    assert_eq!(ctl.client().respond_count(), 1);

    assert_eq!(pump(&mut ctl, &mut screen), 1);
    assert_eq!(ctl.client().started_sessions(), vec!["gnome"]);
}

#[test]
fn test_at_most_one_respond_in_flight() {
    let mut ctl = controller(MockConfig::default(), &["gnome"]);
    let mut screen = Screen::default();

    for round in 0..5 {
        ctl.submit_password("wrong", &mut screen);
        for _ in 0..3 {
            assert_eq!(ctl.submit_password("wrong", &mut screen), Submission::Busy);
        }
        assert_eq!(ctl.client().respond_count(), round + 1);
        pump(&mut ctl, &mut screen);
    }

    let responds_between_authenticates = ctl
        .client()
        .calls()
        .split(|call| matches!(call, GreeterCall::Authenticate(_)))
        .all(|round| round.len() <= 1);
    assert!(responds_between_authenticates);
}

#[test]
fn test_session_refusal_is_recoverable() {
    let mut ctl = controller(MockConfig::refusing_sessions(), &["gnome"]);
    let mut screen = Screen::default();

    ctl.submit_password("correct", &mut screen);
    pump(&mut ctl, &mut screen);

    assert_eq!(screen.feedback, "Unable to start session");
    assert!(screen.started.is_empty());
    assert_eq!(ctl.state(), AuthState::Idle);
    assert!(screen.input_enabled);
    assert!(ctl.client().is_in_authentication());
}

#[test]
fn test_no_sessions_installed() {
    let mut ctl = controller(MockConfig::default(), &[]);
    let mut screen = Screen::default();

    ctl.cycle_session(&mut screen);
    assert!(screen.feedback.is_empty());

    ctl.submit_password("correct", &mut screen);
    pump(&mut ctl, &mut screen);
    assert!(ctl.client().started_sessions().is_empty());
    assert_eq!(screen.feedback, "Unable to start session");
}

#[test]
fn test_multi_step_conversation() {
    let mut ctl = controller(
        MockConfig::with_prompts(["One-time code:", "Backup PIN:"]),
        &["gnome"],
    );
    let mut screen = Screen::default();

    ctl.submit_password("correct", &mut screen);
    pump(&mut ctl, &mut screen);
    assert_eq!(screen.feedback, "One-time code:");
    assert_eq!(ctl.state(), AuthState::Idle);

    ctl.submit_password("000000", &mut screen);
    pump(&mut ctl, &mut screen);
    assert_eq!(screen.feedback, "Backup PIN:");

    ctl.submit_password("1234", &mut screen);
    pump(&mut ctl, &mut screen);
    assert_eq!(screen.started, vec!["gnome"]);
    assert_eq!(ctl.client().authenticate_count(), 1);
}

#[test]
fn test_daemon_message_is_shown_without_state_change() {
    let mut ctl = controller(MockConfig::default(), &["gnome"]);
    let mut screen = Screen::default();

    ctl.handle_event(
        GreeterEvent::Message {
            text: "Account expires in 3 days".to_string(),
        },
        &mut screen,
    );
    assert_eq!(screen.feedback, "Account expires in 3 days");
    assert_eq!(ctl.state(), AuthState::Idle);
    assert!(ctl.is_submit_armed());
}

#[test]
#[should_panic]
fn test_completion_without_submission_panics() {
    let mut ctl = controller(MockConfig::default(), &["gnome"]);
    let mut screen = Screen::default();
    ctl.handle_event(
        GreeterEvent::AuthenticationComplete { success: false },
        &mut screen,
    );
}
