//! Power actions triggered by hotkeys.

use std::io;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::info;

use crate::config::PowerConfig;

/// Error types for power actions
#[derive(Debug, Error)]
pub enum PowerError {
    #[error("No command configured for {0}")]
    NotConfigured(PowerAction),

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{action} command exited with {status}")]
    Failed {
        action: PowerAction,
        status: ExitStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Shutdown,
    Restart,
    Suspend,
    Hibernate,
}

impl PowerAction {
    fn command<'a>(&self, config: &'a PowerConfig) -> &'a [String] {
        match self {
            PowerAction::Shutdown => &config.shutdown,
            PowerAction::Restart => &config.restart,
            PowerAction::Suspend => &config.suspend,
            PowerAction::Hibernate => &config.hibernate,
        }
    }
}

impl std::fmt::Display for PowerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PowerAction::Shutdown => "shutdown",
            PowerAction::Restart => "restart",
            PowerAction::Suspend => "suspend",
            PowerAction::Hibernate => "hibernate",
        };
        f.write_str(name)
    }
}

/// Run the configured command for `action` and wait for it.
pub fn run(action: PowerAction, config: &PowerConfig) -> Result<(), PowerError> {
    let (program, args) = action
        .command(config)
        .split_first()
        .ok_or(PowerError::NotConfigured(action))?;

    info!("Running {} command: {} {:?}", action, program, args);

    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|source| PowerError::Spawn {
            program: program.clone(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(PowerError::Failed { action, status })
    }
}
