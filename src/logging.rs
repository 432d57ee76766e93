//! Logging setup for minigreet.
//!
//! The greeter owns the terminal while it runs, so interactive mode logs to
//! a file only. The informational subcommands log to stderr. Passwords never
//! reach a log statement.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Log file used when debugging is requested without an explicit path.
pub const FALLBACK_LOG_FILE: &str = "/tmp/minigreet.log";

/// Log verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only
    #[default]
    Quiet,
    /// info level
    Normal,
    /// debug level
    Verbose,
    /// trace level
    Trace,
}

impl Verbosity {
    /// Map the number of `-v` flags to a verbosity.
    pub fn from_occurrences(count: u8) -> Self {
        match count {
            0 => Verbosity::Quiet,
            1 => Verbosity::Normal,
            2 => Verbosity::Verbose,
            _ => Verbosity::Trace,
        }
    }

    /// Get the tracing level filter for this verbosity.
    pub fn as_level_filter(&self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::ERROR,
            Verbosity::Normal => LevelFilter::INFO,
            Verbosity::Verbose => LevelFilter::DEBUG,
            Verbosity::Trace => LevelFilter::TRACE,
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Verbosity level for stderr output.
    pub verbosity: Verbosity,
    /// Optional path to log file.
    pub log_file: Option<PathBuf>,
}

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping it flushes pending file output.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

fn file_writer(path: &Path) -> (NonBlocking, WorkerGuard) {
    let parent_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let filename = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("minigreet.log");

    let file_appender = tracing_appender::rolling::never(parent_dir, filename);
    tracing_appender::non_blocking(file_appender)
}

/// Pick the log file for interactive mode.
///
/// An explicit path always wins. Otherwise asking for more output with
/// `RUST_LOG` or `-v` logs to [`FALLBACK_LOG_FILE`].
pub fn tui_log_file(
    explicit: Option<&Path>,
    verbosity: Verbosity,
    rust_log_set: bool,
) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None if rust_log_set || verbosity != Verbosity::Quiet => {
            Some(PathBuf::from(FALLBACK_LOG_FILE))
        }
        None => None,
    }
}

/// Initialize logging for the non-interactive subcommands.
///
/// Logs to stderr at the configured verbosity and, if a log file is set,
/// to that file at debug level.
pub fn init_logging(config: &LogConfig) -> LogGuard {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.verbosity.as_level_filter().into())
        .from_env_lossy();

    let (file_layer, file_guard) = match config.log_file {
        Some(ref path) => {
            let (writer, guard) = file_writer(path);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(writer)
                .with_filter(LevelFilter::DEBUG);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = (config.verbosity != Verbosity::Quiet).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(config.verbosity.as_level_filter())
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    LogGuard {
        _file_guard: file_guard,
    }
}

/// Initialize file-only logging for the greeter UI.
///
/// Without a log file (see [`tui_log_file`]) nothing is logged at all.
pub fn init_tui_logging(log_file: Option<&Path>, verbosity: Verbosity) -> LogGuard {
    let rust_log_set = std::env::var_os("RUST_LOG").is_some();
    let default_level = match verbosity {
        Verbosity::Quiet => LevelFilter::INFO,
        other => other.as_level_filter(),
    };

    let (file_layer, file_guard) = match tui_log_file(log_file, verbosity, rust_log_set) {
        Some(path) => {
            let (writer, guard) = file_writer(&path);
            let env_filter = EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy();
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_thread_names(true)
                .with_writer(writer)
                .with_filter(env_filter);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(file_layer).init();

    LogGuard {
        _file_guard: file_guard,
    }
}
