//! Navigation properties of the session focus ring.

use minigreet::session::{build_session_ring, FocusRing, Session, SessionKind, SessionSource};

fn session(key: &str) -> Session {
    Session {
        key: key.to_string(),
        name: key.to_string(),
        comment: None,
        exec: vec![key.to_string()],
        kind: SessionKind::X11,
        desktop_names: None,
    }
}

struct Installed {
    keys: Vec<&'static str>,
    hint: Option<&'static str>,
}

impl SessionSource for Installed {
    fn sessions(&self) -> Vec<Session> {
        self.keys.iter().map(|key| session(key)).collect()
    }

    fn default_session_hint(&self) -> Option<String> {
        self.hint.map(str::to_string)
    }
}

#[test]
fn test_cursor_after_k_steps_is_k_mod_len() {
    for len in 1..=5usize {
        let items: Vec<usize> = (0..len).collect();
        let mut ring = FocusRing::build(items, |n| n.to_string());

        for k in 1..=(3 * len) {
            let entry = ring.next().unwrap();
            assert_eq!(*entry.value(), k % len);
            assert_eq!(ring.cursor(), k % len, "len {} after {} steps", len, k);
        }
    }
}

#[test]
fn test_empty_ring_is_inert() {
    let mut ring: FocusRing<Session> = FocusRing::build(Vec::new(), |s: &Session| s.key.clone());
    assert!(ring.is_empty());
    assert!(ring.current().is_none());
    assert!(ring.next().is_none());
    assert!(ring.previous().is_none());
    assert!(!ring.scroll_to("gnome"));
    assert!(!ring.scroll_to(""));
    assert_eq!(ring.cursor(), 0);
}

#[test]
fn test_scroll_to_current_is_idempotent() {
    let mut ring = FocusRing::build(vec!["a", "b", "c"], |s| s.to_string());
    ring.next();
    let before = ring.cursor();
    let key = ring.current().unwrap().key().to_string();

    assert!(ring.scroll_to(&key));
    assert_eq!(ring.cursor(), before);
    assert!(ring.scroll_to(&key));
    assert_eq!(ring.cursor(), before);
}

#[test]
fn test_scroll_to_unknown_leaves_cursor() {
    let mut ring = FocusRing::build(vec!["a", "b", "c"], |s| s.to_string());
    ring.scroll_to("c");
    assert!(!ring.scroll_to("z"));
    assert_eq!(ring.current().unwrap().key(), "c");
}

#[test]
fn test_resume_at_default_and_wrap() {
    let ring_source = Installed {
        keys: vec!["gnome", "i3", "xfce"],
        hint: Some("i3"),
    };
    let mut ring = build_session_ring(&ring_source);

    assert_eq!(ring.current().unwrap().key(), "i3");
    assert_eq!(ring.next().unwrap().key(), "xfce");
    assert_eq!(ring.next().unwrap().key(), "gnome");
}

#[test]
fn test_duplicate_keys_keep_first() {
    let mut first = session("sway");
    first.name = "Sway (system)".to_string();
    let mut second = session("sway");
    second.name = "Sway (local)".to_string();

    let ring = FocusRing::build_labeled(
        vec![first, session("i3"), second],
        |s| s.key.clone(),
        |s| s.name.clone(),
    );

    assert_eq!(ring.len(), 2);
    assert_eq!(ring.get("sway").unwrap().display(), "Sway (system)");
    let keys: Vec<&str> = ring.iter().map(|entry| entry.key()).collect();
    assert_eq!(keys, vec!["sway", "i3"]);
}
