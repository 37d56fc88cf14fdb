//! The interactive shell phase.
//!
//! Two units run while a shell is active: a blocking pump that moves bytes
//! between the local terminal and the remote channel, and the caller's
//! interrupt future (normally SIGINT/SIGTERM). Whichever finishes first sets
//! the shared [`Cancellation`]; the other then winds down. The local
//! terminal stays in raw mode only while the pump runs.

use std::future::Future;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use super::transport::{PtySize, ShellChannel};
use crate::error::{Result, SshmanError};

/// Exit status of a shell killed by Ctrl-C. Treated as a normal close.
pub const INTERRUPTED_EXIT_STATUS: i32 = 130;

/// Sleep between polls when neither side had data.
const PUMP_IDLE: Duration = Duration::from_millis(10);

/// Control over the local terminal.
pub trait TerminalMode {
    fn enable_raw(&mut self) -> io::Result<()>;
    fn disable_raw(&mut self) -> io::Result<()>;
    /// Current size, used for the remote PTY.
    fn size(&self) -> PtySize;
}

/// The process's controlling terminal, driven through crossterm.
pub struct CrosstermTerminal;

impl TerminalMode for CrosstermTerminal {
    fn enable_raw(&mut self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()
    }

    fn disable_raw(&mut self) -> io::Result<()> {
        crossterm::terminal::disable_raw_mode()
    }

    fn size(&self) -> PtySize {
        match crossterm::terminal::size() {
            Ok((cols, rows)) if cols > 0 && rows > 0 => PtySize {
                cols: u32::from(cols),
                rows: u32::from(rows),
            },
            _ => PtySize::default(),
        }
    }
}

/// Holds the terminal in raw mode. The prior mode is restored exactly once,
/// by [`RawModeGuard::release`] or on drop, whichever comes first.
pub struct RawModeGuard<'a> {
    terminal: &'a mut dyn TerminalMode,
    active: bool,
}

impl<'a> RawModeGuard<'a> {
    pub fn acquire(terminal: &'a mut dyn TerminalMode) -> io::Result<Self> {
        terminal.enable_raw()?;
        tracing::debug!("terminal switched to raw mode");
        Ok(Self {
            terminal,
            active: true,
        })
    }

    pub fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        match self.terminal.disable_raw() {
            Ok(()) => tracing::debug!("terminal restored"),
            Err(e) => tracing::warn!(error = %e, "could not restore terminal mode"),
        }
    }
}

impl Drop for RawModeGuard<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Shared one-way stop flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How an interactive session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The remote shell exited normally.
    Closed,
    /// The local process was asked to stop.
    Interrupted,
    /// The remote side failed. Reported to the operator, not fatal.
    RemoteError(String),
}

/// Local endpoints of the pump.
pub struct ShellIo {
    pub input: Receiver<Vec<u8>>,
    pub output: Box<dyn Write + Send>,
    pub errors: Box<dyn Write + Send>,
}

impl ShellIo {
    /// Bind to the process's stdin, stdout and stderr.
    pub fn terminal() -> Self {
        Self {
            input: spawn_stdin_reader(),
            output: Box::new(io::stdout()),
            errors: Box::new(io::stderr()),
        }
    }
}

/// Stdin reads block, so they happen on a dedicated thread that forwards
/// chunks over a channel. The thread ends at EOF or once the receiver is gone.
fn spawn_stdin_reader() -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            let mut stdin = io::stdin();
            let mut buf = [0u8; 1024];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "could not start stdin reader");
    }
    rx
}

/// Wait for SIGINT or SIGTERM.
pub async fn interrupt_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(mut interrupt), Ok(mut terminate)) => {
                tokio::select! {
                    _ = interrupt.recv() => tracing::info!("received SIGINT"),
                    _ = terminate.recv() => tracing::info!("received SIGTERM"),
                }
            }
            _ => {
                tracing::warn!("could not install signal handlers");
                std::future::pending::<()>().await
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await
        }
    }
}

enum PumpEnd {
    RemoteClosed,
    Cancelled,
}

fn pump(
    channel: &mut dyn ShellChannel,
    io: &mut ShellIo,
    cancel: &Cancellation,
) -> io::Result<PumpEnd> {
    let mut buf = [0u8; 8192];
    let mut stdin_open = true;

    loop {
        if cancel.is_cancelled() {
            return Ok(PumpEnd::Cancelled);
        }
        let mut busy = false;

        while stdin_open {
            match io.input.try_recv() {
                Ok(bytes) => {
                    channel.write_input(&bytes)?;
                    busy = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => stdin_open = false,
            }
        }

        let n = channel.read_output(&mut buf)?;
        if n > 0 {
            io.output.write_all(&buf[..n])?;
            io.output.flush()?;
            busy = true;
        }

        let n = channel.read_error(&mut buf)?;
        if n > 0 {
            io.errors.write_all(&buf[..n])?;
            io.errors.flush()?;
            busy = true;
        }

        if !busy {
            // Output is drained before EOF is honoured
            if channel.is_eof() {
                return Ok(PumpEnd::RemoteClosed);
            }
            thread::sleep(PUMP_IDLE);
        }
    }
}

fn settle(end: io::Result<PumpEnd>, channel: &mut dyn ShellChannel) -> SessionOutcome {
    match end {
        Err(e) => {
            let _ = channel.finish();
            SessionOutcome::RemoteError(format!("shell i/o failed: {}", e))
        }
        Ok(PumpEnd::Cancelled) => {
            let _ = channel.finish();
            SessionOutcome::Interrupted
        }
        Ok(PumpEnd::RemoteClosed) => match channel.finish() {
            Ok(0) | Ok(INTERRUPTED_EXIT_STATUS) => SessionOutcome::Closed,
            Ok(code) => {
                SessionOutcome::RemoteError(format!("remote shell exited with status {}", code))
            }
            Err(e) => SessionOutcome::RemoteError(e.to_string()),
        },
    }
}

/// Run the shell until the remote side ends or `interrupt` completes.
///
/// Raw mode is entered before the pump starts and left before this returns,
/// on every path.
pub async fn run_shell_phase<F>(
    mut channel: Box<dyn ShellChannel>,
    terminal: &mut dyn TerminalMode,
    mut io: ShellIo,
    interrupt: F,
    cancel: Cancellation,
) -> Result<SessionOutcome>
where
    F: Future<Output = ()>,
{
    let mut guard = RawModeGuard::acquire(terminal)?;

    let pump_cancel = cancel.clone();
    let mut task = tokio::task::spawn_blocking(move || {
        let end = pump(channel.as_mut(), &mut io, &pump_cancel);
        settle(end, channel.as_mut())
    });

    tokio::pin!(interrupt);
    let finished = tokio::select! {
        joined = &mut task => Some(joined),
        () = &mut interrupt => None,
    };
    let joined = match finished {
        Some(joined) => joined,
        None => {
            tracing::info!("interrupt received, closing session");
            cancel.cancel();
            task.await
        }
    };

    guard.release();
    joined.map_err(|e| SshmanError::Other(format!("shell task failed: {}", e)))
}
