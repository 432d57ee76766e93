//! Session discovery from freedesktop `.desktop` files.
//!
//! Wayland sessions live in `/usr/share/wayland-sessions`, X11 sessions in
//! `/usr/share/xsessions`. Only the `[Desktop Entry]` group is read.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::{Session, SessionKind, SessionSource};

/// Default directory for Wayland session files.
pub const WAYLAND_SESSIONS_DIR: &str = "/usr/share/wayland-sessions";

/// Default directory for X11 session files.
pub const X11_SESSIONS_DIR: &str = "/usr/share/xsessions";

const DESKTOP_ENTRY_GROUP: &str = "[Desktop Entry]";

/// Errors that can occur while reading a session file.
#[derive(Debug, Error)]
pub enum DesktopEntryError {
    /// The file could not be read.
    #[error("failed to read session file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required key is absent from the `[Desktop Entry]` group.
    #[error("session file {path} is missing {field}")]
    MissingField { path: PathBuf, field: &'static str },

    /// The entry asks not to be shown.
    #[error("session file {path} is hidden")]
    Hidden { path: PathBuf },
}

impl DesktopEntryError {
    /// Create a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create a missing field error.
    pub fn missing_field(path: impl Into<PathBuf>, field: &'static str) -> Self {
        Self::MissingField {
            path: path.into(),
            field,
        }
    }
}

/// Parse the contents of a session `.desktop` file.
///
/// `path` supplies the session key (the file stem) and is used in errors.
pub fn parse_desktop_entry(
    path: &Path,
    contents: &str,
    kind: SessionKind,
) -> Result<Session, DesktopEntryError> {
    let key = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| DesktopEntryError::missing_field(path, "file name"))?
        .to_string();

    let mut in_entry_group = false;
    let mut name = None;
    let mut comment = None;
    let mut exec = None;
    let mut desktop_names = None;
    let mut hidden = false;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            in_entry_group = line == DESKTOP_ENTRY_GROUP;
            continue;
        }
        if !in_entry_group {
            continue;
        }

        // Localized keys such as `Name[de]` are ignored.
        let Some((field, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().to_string();
        match field.trim() {
            "Name" => name = Some(value),
            "Comment" => comment = Some(value),
            "Exec" => exec = Some(value),
            "DesktopNames" => desktop_names = Some(value.trim_end_matches(';').to_string()),
            "Hidden" | "NoDisplay" if value == "true" => hidden = true,
            _ => {}
        }
    }

    if hidden {
        return Err(DesktopEntryError::Hidden {
            path: path.to_path_buf(),
        });
    }

    let name = name.ok_or_else(|| DesktopEntryError::missing_field(path, "Name"))?;
    let exec = exec
        .map(|line| split_exec(&line))
        .filter(|args| !args.is_empty())
        .ok_or_else(|| DesktopEntryError::missing_field(path, "Exec"))?;

    Ok(Session {
        key,
        name,
        comment,
        exec,
        kind,
        desktop_names,
    })
}

/// Split an `Exec` line into arguments.
///
/// Honors double quotes and backslash escapes. Field codes like `%f` or `%U`
/// are dropped and `%%` becomes a literal percent sign.
pub fn split_exec(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut has_arg = false;
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_arg = true;
            }
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                    has_arg = true;
                }
            }
            '%' => match chars.next() {
                Some('%') => {
                    current.push('%');
                    has_arg = true;
                }
                Some(_) | None => {}
            },
            c if c.is_whitespace() && !in_quotes => {
                if has_arg {
                    args.push(std::mem::take(&mut current));
                    has_arg = false;
                }
            }
            c => {
                current.push(c);
                has_arg = true;
            }
        }
    }

    if has_arg {
        args.push(current);
    }
    args
}

/// Session source backed by the freedesktop session directories.
#[derive(Debug, Clone)]
pub struct DesktopSessionSource {
    directories: Vec<(PathBuf, SessionKind)>,
    default_session: Option<String>,
}

impl Default for DesktopSessionSource {
    fn default() -> Self {
        Self::new(
            vec![PathBuf::from(WAYLAND_SESSIONS_DIR)],
            vec![PathBuf::from(X11_SESSIONS_DIR)],
        )
    }
}

impl DesktopSessionSource {
    /// Create a source scanning the given Wayland and X11 directories.
    pub fn new(wayland_dirs: Vec<PathBuf>, x11_dirs: Vec<PathBuf>) -> Self {
        let directories = wayland_dirs
            .into_iter()
            .map(|dir| (dir, SessionKind::Wayland))
            .chain(x11_dirs.into_iter().map(|dir| (dir, SessionKind::X11)))
            .collect();

        Self {
            directories,
            default_session: None,
        }
    }

    /// Set the session key to preselect.
    pub fn with_default_session(mut self, key: Option<String>) -> Self {
        self.default_session = key;
        self
    }

    fn scan_directory(dir: &Path, kind: SessionKind) -> Vec<Session> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping session directory {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut sessions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("desktop") {
                continue;
            }

            let parsed = fs::read_to_string(&path)
                .map_err(|e| DesktopEntryError::file_read(&path, e))
                .and_then(|contents| parse_desktop_entry(&path, &contents, kind));

            match parsed {
                Ok(session) => sessions.push(session),
                Err(DesktopEntryError::Hidden { path }) => {
                    debug!("Skipping hidden session {}", path.display());
                }
                Err(e) => warn!("{}", e),
            }
        }
        sessions
    }
}

impl SessionSource for DesktopSessionSource {
    fn sessions(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .directories
            .iter()
            .flat_map(|(dir, kind)| Self::scan_directory(dir, *kind))
            .collect();

        sessions.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.key.cmp(&b.key)));
        sessions
    }

    fn default_session_hint(&self) -> Option<String> {
        self.default_session.clone()
    }
}
