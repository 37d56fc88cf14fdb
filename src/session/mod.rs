//! Session connector: authenticate, run the optional startup command, hand
//! the terminal to a remote shell and tear everything down again.

mod duration;
mod machine;
pub mod shell;
pub mod transport;

use std::future::Future;
use std::time::{Duration, Instant};

pub use duration::format_duration;
pub use machine::{SessionMachine, SessionState};
pub use shell::{
    Cancellation, CrosstermTerminal, RawModeGuard, SessionOutcome, ShellIo, TerminalMode,
    interrupt_signal, run_shell_phase,
};
pub use transport::{CommandOutput, PtySize, ShellChannel, SshTransport, Transport};

use crate::db::Profile;
use crate::error::{Result, SshmanError};

/// Bound on the startup command. Commands that never return (attaching to a
/// multiplexer, say) are cut off here and the shell starts anyway.
pub const STARTUP_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_TERM: &str = "xterm-256color";

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub elapsed: Duration,
}

impl SessionReport {
    pub fn summary(&self) -> String {
        format!("Session closed. (total: {})", format_duration(self.elapsed))
    }
}

/// `$TERM`, or a common default when unset.
pub fn terminal_type() -> String {
    std::env::var("TERM")
        .ok()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TERM.to_string())
}

/// Run the startup command. Failures are logged and reported, never returned.
fn run_startup_command(transport: &mut dyn Transport, command: &str) -> Option<SshmanError> {
    tracing::info!(command, "running startup command");
    let failure = match transport.exec(command, STARTUP_COMMAND_TIMEOUT) {
        Ok(out) if out.exit_status == 0 => {
            tracing::debug!(bytes = out.stdout.len(), "startup command finished");
            return None;
        }
        Ok(out) => {
            let mut message = format!("'{}' exited with status {}", command, out.exit_status);
            if let Some(line) = out.stderr.lines().map(str::trim).find(|l| !l.is_empty()) {
                message.push_str(": ");
                message.push_str(line);
            }
            SshmanError::RemoteCommand(message)
        }
        Err(e) => SshmanError::RemoteCommand(format!("'{}': {}", command, e)),
    };
    tracing::warn!(error = %failure, "startup command failed, continuing");
    Some(failure)
}

/// Drive one interactive session for an unlocked profile.
///
/// Authentication failures are returned. Everything after that ends in a
/// [`SessionReport`], including remote failures.
pub async fn run_session<F>(
    transport: &mut dyn Transport,
    profile: &Profile,
    terminal: &mut dyn TerminalMode,
    io: ShellIo,
    interrupt: F,
) -> Result<SessionReport>
where
    F: Future<Output = ()>,
{
    let started = Instant::now();
    let mut machine = SessionMachine::new();

    machine.advance(SessionState::Authenticating)?;
    tracing::info!(user = %profile.user, host = %profile.host, "connecting");
    if let Err(e) = transport.authenticate(profile) {
        machine.advance(SessionState::AuthFailed)?;
        tracing::error!(error = %e, "authentication failed");
        return Err(e);
    }

    if !profile.startup_command.trim().is_empty() {
        machine.advance(SessionState::RunningStartupCommand)?;
        if let Some(failure) = run_startup_command(transport, profile.startup_command.trim()) {
            eprintln!("Warning: {}", failure);
        }
    }

    machine.advance(SessionState::ShellActive)?;
    let outcome = match transport.open_shell(&terminal_type(), terminal.size()) {
        Ok(channel) => {
            run_shell_phase(channel, terminal, io, interrupt, Cancellation::new()).await
        }
        Err(e) => {
            tracing::error!(error = %e, "could not open remote shell");
            Ok(SessionOutcome::RemoteError(e.to_string()))
        }
    };

    machine.advance(SessionState::Closing)?;
    transport.disconnect();
    machine.advance(SessionState::Closed)?;

    let report = SessionReport {
        outcome: outcome?,
        elapsed: started.elapsed(),
    };
    match &report.outcome {
        SessionOutcome::RemoteError(msg) => {
            tracing::warn!(error = %msg, "session ended with a remote error")
        }
        other => tracing::info!(
            outcome = ?other,
            elapsed = %format_duration(report.elapsed),
            "session closed"
        ),
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::shell::tests::{CountingTerminal, FakeShell, test_io};
    use super::*;
    use crate::db::Credential;
    use chrono::Utc;
    use std::io::{Read, Write};
    use std::path::Path;

    #[derive(Default)]
    struct FakeTransport {
        reject_auth: bool,
        reject_shell: bool,
        startup_status: Option<i32>,
        startup_stderr: String,
        shell_exit: i32,
        executed: Vec<String>,
        disconnected: usize,
    }

    impl Transport for FakeTransport {
        fn authenticate(&mut self, _profile: &Profile) -> Result<()> {
            if self.reject_auth {
                return Err(SshmanError::connection("authentication as root was rejected"));
            }
            Ok(())
        }

        fn exec(&mut self, command: &str, _timeout: Duration) -> Result<CommandOutput> {
            self.executed.push(command.to_string());
            match self.startup_status {
                Some(status) => Ok(CommandOutput {
                    exit_status: status,
                    stderr: self.startup_stderr.clone(),
                    ..Default::default()
                }),
                None => Err(SshmanError::connection("timed out")),
            }
        }

        fn open_shell(&mut self, _term: &str, _size: PtySize) -> Result<Box<dyn ShellChannel>> {
            if self.reject_shell {
                return Err(SshmanError::connection("pty request denied"));
            }
            Ok(Box::new(FakeShell::new(b"", self.shell_exit)))
        }

        fn upload(
            &mut self,
            _source: &mut dyn Read,
            _remote: &Path,
            _mode: i32,
            _size: u64,
        ) -> Result<u64> {
            Ok(0)
        }

        fn download(&mut self, _remote: &Path, _sink: &mut dyn Write) -> Result<u64> {
            Ok(0)
        }

        fn disconnect(&mut self) {
            self.disconnected += 1;
        }
    }

    fn profile(startup: &str) -> Profile {
        Profile {
            id: 1,
            alias: "web".into(),
            host: "10.0.0.1".into(),
            user: "root".into(),
            credential: Credential::Password("pw".into()),
            encrypted: false,
            startup_command: startup.into(),
            created_at: Utc::now(),
            modified_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_auth_failure_is_returned_without_touching_terminal() {
        let mut transport = FakeTransport {
            reject_auth: true,
            ..Default::default()
        };
        let mut term = CountingTerminal::default();
        let (io, _) = test_io(&[]);
        let err = run_session(&mut transport, &profile(""), &mut term, io, std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, SshmanError::Connection(_)));
        assert_eq!(term.enabled, 0);
    }

    #[tokio::test]
    async fn test_failed_startup_command_does_not_abort() {
        let mut transport = FakeTransport {
            startup_status: Some(1),
            ..Default::default()
        };
        let mut term = CountingTerminal::default();
        let (io, _) = test_io(&[]);
        let report = run_session(
            &mut transport,
            &profile("tmux attach"),
            &mut term,
            io,
            std::future::pending(),
        )
        .await
        .unwrap();
        assert_eq!(transport.executed, vec!["tmux attach".to_string()]);
        assert_eq!(report.outcome, SessionOutcome::Closed);
        assert_eq!(transport.disconnected, 1);
    }

    #[tokio::test]
    async fn test_timed_out_startup_command_does_not_abort() {
        let mut transport = FakeTransport::default();
        let mut term = CountingTerminal::default();
        let (io, _) = test_io(&[]);
        let report = run_session(
            &mut transport,
            &profile("tail -f /var/log/syslog"),
            &mut term,
            io,
            std::future::pending(),
        )
        .await
        .unwrap();
        assert_eq!(report.outcome, SessionOutcome::Closed);
    }

    #[tokio::test]
    async fn test_empty_startup_command_is_skipped() {
        let mut transport = FakeTransport::default();
        let mut term = CountingTerminal::default();
        let (io, _) = test_io(&[]);
        run_session(&mut transport, &profile("  "), &mut term, io, std::future::pending())
            .await
            .unwrap();
        assert!(transport.executed.is_empty());
    }

    #[tokio::test]
    async fn test_remote_error_is_reported_not_returned() {
        let mut transport = FakeTransport {
            startup_status: Some(0),
            shell_exit: 255,
            ..Default::default()
        };
        let mut term = CountingTerminal::default();
        let (io, _) = test_io(&[]);
        let report = run_session(&mut transport, &profile(""), &mut term, io, std::future::pending())
            .await
            .unwrap();
        assert!(matches!(report.outcome, SessionOutcome::RemoteError(_)));
        assert_eq!(term.disabled, 1);
        assert_eq!(transport.disconnected, 1);
        assert!(report.summary().starts_with("Session closed. (total: "));
    }

    #[tokio::test]
    async fn test_shell_open_failure_is_reported_not_returned() {
        let mut transport = FakeTransport {
            reject_shell: true,
            ..Default::default()
        };
        let mut term = CountingTerminal::default();
        let (io, _) = test_io(&[]);
        let report = run_session(&mut transport, &profile(""), &mut term, io, std::future::pending())
            .await
            .unwrap();
        match &report.outcome {
            SessionOutcome::RemoteError(msg) => assert!(msg.contains("pty request denied")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(transport.disconnected, 1);
        assert_eq!(term.enabled, 0);
    }

    #[test]
    fn test_startup_failure_names_first_stderr_line() {
        let mut transport = FakeTransport {
            startup_status: Some(127),
            startup_stderr: "\nbash: tmux: command not found\nmore\n".into(),
            ..Default::default()
        };
        let failure = run_startup_command(&mut transport, "tmux attach").unwrap();
        assert_eq!(
            failure.to_string(),
            "startup command failed: 'tmux attach' exited with status 127: bash: tmux: command not found"
        );

        transport.startup_status = Some(0);
        assert!(run_startup_command(&mut transport, "true").is_none());
    }
}
