//! Installed sessions and the focus ring used to choose between them.
//!
//! Sessions come from a [`SessionSource`] (in production, the freedesktop
//! session directories) and are loaded once at startup into a [`FocusRing`].

mod desktop;
mod ring;

pub use desktop::{
    parse_desktop_entry, split_exec, DesktopEntryError, DesktopSessionSource, WAYLAND_SESSIONS_DIR,
    X11_SESSIONS_DIR,
};
pub use ring::{FocusRing, RingEntry};

use tracing::{info, warn};

/// Display server a session runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Wayland,
    X11,
}

impl SessionKind {
    /// Value for `XDG_SESSION_TYPE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Wayland => "wayland",
            SessionKind::X11 => "x11",
        }
    }
}

/// A launchable desktop session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Desktop file stem, e.g. `sway` for `sway.desktop`.
    pub key: String,
    /// Name shown to the user.
    pub name: String,
    pub comment: Option<String>,
    /// Command line, already split into arguments.
    pub exec: Vec<String>,
    pub kind: SessionKind,
    /// Value of `DesktopNames`, used for `XDG_CURRENT_DESKTOP`.
    pub desktop_names: Option<String>,
}

/// Command and environment handed to the login daemon to start a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLaunch {
    pub cmd: Vec<String>,
    pub env: Vec<String>,
}

impl Session {
    /// Build the launch command for this session.
    ///
    /// X11 sessions need an X server, so their command is prefixed with
    /// `x11_wrapper` (typically `startx /usr/bin/env`).
    pub fn launch(&self, x11_wrapper: &[String]) -> SessionLaunch {
        let cmd = match self.kind {
            SessionKind::Wayland => self.exec.clone(),
            SessionKind::X11 => x11_wrapper
                .iter()
                .chain(self.exec.iter())
                .cloned()
                .collect(),
        };

        let mut env = vec![
            format!("XDG_SESSION_TYPE={}", self.kind.as_str()),
            format!("XDG_SESSION_DESKTOP={}", self.key),
        ];
        if let Some(ref names) = self.desktop_names {
            env.push(format!("XDG_CURRENT_DESKTOP={}", names.replace(';', ":")));
        }

        SessionLaunch { cmd, env }
    }
}

/// Provider of the installed sessions.
pub trait SessionSource {
    /// Enumerate available sessions in display order.
    fn sessions(&self) -> Vec<Session>;

    /// Key of the session to preselect, if any.
    fn default_session_hint(&self) -> Option<String> {
        None
    }
}

impl SessionSource for Vec<Session> {
    fn sessions(&self) -> Vec<Session> {
        self.clone()
    }
}

/// Build the session ring from a source and position it on the default hint.
pub fn build_session_ring(source: &dyn SessionSource) -> FocusRing<Session> {
    let mut ring = FocusRing::build_labeled(
        source.sessions(),
        |session| session.key.clone(),
        |session| session.name.clone(),
    );

    if let Some(hint) = source.default_session_hint() {
        if !ring.scroll_to(&hint) {
            warn!("Default session '{}' is not installed", hint);
        }
    }

    match ring.current() {
        Some(entry) => info!("Initial session set to: {}", entry.key()),
        None => warn!("No sessions installed"),
    }

    ring
}
