//! SSH transport over libssh2.
//!
//! The host key is never checked against a known_hosts store; every server
//! is accepted.

use ssh2::{Channel, Session};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use crate::db::{Credential, Profile};
use crate::error::{Result, SshmanError};

pub const DEFAULT_PORT: u16 = 22;

/// TCP connection timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 15;

/// Upper bound for closing a channel, in milliseconds.
const CLOSE_TIMEOUT_MS: u32 = 5_000;

/// Pseudo-terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtySize {
    pub cols: u32,
    pub rows: u32,
}

impl Default for PtySize {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

/// Output of a non-interactive remote command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

/// An interactive remote shell in non-blocking mode.
pub trait ShellChannel: Send {
    /// Read available remote stdout. `Ok(0)` means nothing is pending.
    fn read_output(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Read available remote stderr. `Ok(0)` means nothing is pending.
    fn read_error(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Send all of `data` to the remote stdin.
    fn write_input(&mut self, data: &[u8]) -> io::Result<()>;

    /// True once the remote side has closed its output.
    fn is_eof(&self) -> bool;

    /// Close the channel and return the remote exit status.
    fn finish(&mut self) -> Result<i32>;
}

/// A connection to one remote host.
pub trait Transport {
    /// Connect and authenticate with the profile's plaintext secret.
    fn authenticate(&mut self, profile: &Profile) -> Result<()>;

    /// Run one command on its own channel, bounded by `timeout`.
    fn exec(&mut self, command: &str, timeout: Duration) -> Result<CommandOutput>;

    /// Request a PTY and start the login shell.
    fn open_shell(&mut self, term: &str, size: PtySize) -> Result<Box<dyn ShellChannel>>;

    /// Copy `size` bytes from `source` to `remote`, created with `mode`.
    fn upload(
        &mut self,
        source: &mut dyn Read,
        remote: &Path,
        mode: i32,
        size: u64,
    ) -> Result<u64>;

    /// Copy the remote file into `sink`. Returns the bytes written.
    fn download(&mut self, remote: &Path, sink: &mut dyn Write) -> Result<u64>;

    fn disconnect(&mut self);
}

/// Split a stored host into address and port.
///
/// Accepts an optional scheme, a `user@` prefix, a `:port` suffix, a trailing
/// path and bracketed IPv6 literals.
pub fn parse_target(host: &str) -> Result<(String, u16)> {
    let mut rest = host.trim();
    for scheme in ["ssh://", "https://", "http://"] {
        if let Some(r) = rest.strip_prefix(scheme) {
            rest = r;
            break;
        }
    }
    rest = rest.trim_start_matches('/');
    if let Some(end) = rest.find('/') {
        rest = &rest[..end];
    }
    if let Some((_, h)) = rest.rsplit_once('@') {
        rest = h;
    }

    let parse_port = |p: &str| {
        p.parse::<u16>()
            .map_err(|_| SshmanError::connection(format!("invalid port '{}' in '{}'", p, host)))
    };

    let (addr, port) = if let Some(inner) = rest.strip_prefix('[') {
        let (addr, tail) = inner
            .split_once(']')
            .ok_or_else(|| SshmanError::connection(format!("invalid address '{}'", host)))?;
        match tail.strip_prefix(':') {
            Some(p) => (addr, parse_port(p)?),
            None => (addr, DEFAULT_PORT),
        }
    } else if rest.matches(':').count() == 1 {
        let (addr, p) = rest.split_once(':').unwrap_or((rest, ""));
        (addr, parse_port(p)?)
    } else {
        (rest, DEFAULT_PORT)
    };

    if addr.is_empty() {
        return Err(SshmanError::connection(format!("no host in '{}'", host)));
    }
    Ok((addr.to_string(), port))
}

/// libssh2-backed transport.
#[derive(Default)]
pub struct SshTransport {
    session: Option<Session>,
}

impl SshTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| SshmanError::connection("not connected"))
    }

    fn connect(host: &str) -> Result<Session> {
        let (addr, port) = parse_target(host)?;
        let candidates = (addr.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| SshmanError::connection(format!("cannot resolve {}: {}", addr, e)))?;

        let mut last_err = None;
        let mut tcp = None;
        for candidate in candidates {
            match TcpStream::connect_timeout(
                &candidate,
                Duration::from_secs(CONNECT_TIMEOUT_SECS),
            ) {
                Ok(stream) => {
                    tcp = Some(stream);
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }
        let tcp = tcp.ok_or_else(|| {
            SshmanError::connection(format!(
                "cannot connect to {}:{}: {}",
                addr,
                port,
                last_err.map(|e| e.to_string()).unwrap_or_else(|| "no address".into())
            ))
        })?;

        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake()?;
        tracing::debug!(%addr, port, "ssh handshake complete");
        Ok(session)
    }
}

impl Transport for SshTransport {
    fn authenticate(&mut self, profile: &Profile) -> Result<()> {
        if profile.encrypted {
            return Err(SshmanError::Other(format!(
                "profile '{}' must be unlocked before connecting",
                profile.alias
            )));
        }

        let session = Self::connect(&profile.host)?;
        match &profile.credential {
            Credential::Password(password) => {
                session.userauth_password(&profile.user, password)?;
            }
            Credential::PrivateKey(key) => {
                let pem = std::str::from_utf8(key).map_err(|_| {
                    SshmanError::connection("private key is not valid UTF-8 text")
                })?;
                session.userauth_pubkey_memory(&profile.user, None, pem, None)?;
            }
        }

        if !session.authenticated() {
            return Err(SshmanError::connection(format!(
                "authentication as {} was rejected",
                profile.user
            )));
        }

        tracing::info!(user = %profile.user, host = %profile.host, auth = %profile.auth_type(), "authenticated");
        self.session = Some(session);
        Ok(())
    }

    fn exec(&mut self, command: &str, timeout: Duration) -> Result<CommandOutput> {
        let session = self.session()?;
        session.set_timeout(timeout.as_millis().min(u32::MAX as u128) as u32);

        let run = || -> Result<CommandOutput> {
            let mut channel = session.channel_session()?;
            channel.exec(command)?;

            let mut output = CommandOutput::default();
            channel.read_to_string(&mut output.stdout)?;
            channel.stderr().read_to_string(&mut output.stderr)?;
            channel.wait_close()?;
            output.exit_status = channel.exit_status()?;
            Ok(output)
        };
        let result = run();

        session.set_timeout(0);
        result
    }

    fn open_shell(&mut self, term: &str, size: PtySize) -> Result<Box<dyn ShellChannel>> {
        let session = self.session()?.clone();
        let mut channel = session.channel_session()?;
        channel.request_pty(term, None, Some((size.cols, size.rows, 0, 0)))?;
        channel.shell()?;
        session.set_blocking(false);
        tracing::debug!(term, cols = size.cols, rows = size.rows, "pty allocated");
        Ok(Box::new(SshShell { session, channel }))
    }

    fn upload(
        &mut self,
        source: &mut dyn Read,
        remote: &Path,
        mode: i32,
        size: u64,
    ) -> Result<u64> {
        let session = self.session()?;
        let mut channel = session.scp_send(remote, mode, size, None)?;
        let copied = io::copy(source, &mut channel)?;
        channel.send_eof()?;
        channel.wait_eof()?;
        channel.close()?;
        channel.wait_close()?;
        Ok(copied)
    }

    fn download(&mut self, remote: &Path, sink: &mut dyn Write) -> Result<u64> {
        let session = self.session()?;
        let (channel, stat) = session.scp_recv(remote)?;
        let mut limited = channel.take(stat.size());
        let copied = io::copy(&mut limited, sink)?;
        let mut channel = limited.into_inner();
        channel.send_eof()?;
        channel.wait_eof()?;
        channel.close()?;
        channel.wait_close()?;
        Ok(copied)
    }

    fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.set_blocking(true);
            if let Err(e) = session.disconnect(None, "session closed", None) {
                tracing::debug!(error = %e, "disconnect failed");
            }
        }
    }
}

struct SshShell {
    session: Session,
    channel: Channel,
}

fn pending(result: io::Result<usize>) -> io::Result<usize> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
        other => other,
    }
}

impl ShellChannel for SshShell {
    fn read_output(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        pending(self.channel.read(buf))
    }

    fn read_error(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        pending(self.channel.stderr().read(buf))
    }

    fn write_input(&mut self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            match self.channel.write(data) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => data = &data[n..],
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn is_eof(&self) -> bool {
        self.channel.eof()
    }

    fn finish(&mut self) -> Result<i32> {
        self.session.set_blocking(true);
        self.session.set_timeout(CLOSE_TIMEOUT_MS);
        let _ = self.channel.send_eof();
        let result = self
            .channel
            .close()
            .and_then(|_| self.channel.wait_close())
            .and_then(|_| self.channel.exit_status());
        self.session.set_timeout(0);
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_host_defaults_to_port_22() {
        assert_eq!(parse_target("10.0.0.1").unwrap(), ("10.0.0.1".into(), 22));
        assert_eq!(parse_target("example.com").unwrap(), ("example.com".into(), 22));
    }

    #[test]
    fn test_port_scheme_user_and_path_are_handled() {
        assert_eq!(
            parse_target("https://deploy@example.com:2222/some/path").unwrap(),
            ("example.com".into(), 2222)
        );
        assert_eq!(parse_target("//example.com").unwrap(), ("example.com".into(), 22));
    }

    #[test]
    fn test_ipv6_literals() {
        assert_eq!(parse_target("::1").unwrap(), ("::1".into(), 22));
        assert_eq!(parse_target("[fe80::1]:2200").unwrap(), ("fe80::1".into(), 2200));
    }

    #[test]
    fn test_bad_port_and_empty_host() {
        assert!(parse_target("example.com:http").is_err());
        assert!(parse_target("example.com:70000").is_err());
        assert!(parse_target("").is_err());
    }

    #[test]
    fn test_calls_before_authenticate_fail() {
        let mut t = SshTransport::new();
        assert!(t.exec("true", Duration::from_secs(1)).is_err());
        assert!(t.open_shell("xterm", PtySize::default()).is_err());
        t.disconnect();
    }
}
