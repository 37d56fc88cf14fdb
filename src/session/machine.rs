//! Lifecycle states of one connection attempt.

use std::fmt;

use crate::error::{Result, SshmanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Authenticating,
    AuthFailed,
    RunningStartupCommand,
    ShellActive,
    Closing,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Authenticating => "authenticating",
            SessionState::AuthFailed => "auth_failed",
            SessionState::RunningStartupCommand => "running_startup_command",
            SessionState::ShellActive => "shell_active",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Tracks the current state and rejects transitions the lifecycle does not
/// allow.
#[derive(Debug)]
pub struct SessionMachine {
    state: SessionState,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn allowed(from: SessionState, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (from, to),
            (Idle, Authenticating)
                | (Authenticating, AuthFailed)
                | (Authenticating, RunningStartupCommand)
                | (Authenticating, ShellActive)
                | (Authenticating, Closing)
                | (RunningStartupCommand, ShellActive)
                | (RunningStartupCommand, Closing)
                | (ShellActive, Closing)
                | (Closing, Closed)
        )
    }

    pub fn advance(&mut self, next: SessionState) -> Result<()> {
        if self.is_terminal() {
            return Err(SshmanError::Other(format!(
                "session already ended ({}), cannot move to {}",
                self.state, next
            )));
        }
        if !Self::allowed(self.state, next) {
            return Err(SshmanError::Other(format!(
                "invalid session transition {} -> {}",
                self.state, next
            )));
        }
        tracing::debug!(from = %self.state, to = %next, "session state change");
        self.state = next;
        Ok(())
    }

    /// True once the machine reached a state it cannot leave.
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, SessionState::AuthFailed | SessionState::Closed)
    }
}
