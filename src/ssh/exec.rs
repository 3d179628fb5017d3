//! Command execution over a PTY-backed channel with timeout and
//! interruption semantics.

use std::io::Read;
use std::time::{Duration, Instant};

use ssh2::{Channel, Session};
use tracing::{debug, warn};

use crate::error::ExecuteError;
use crate::result::CommandOutput;

/// Idle poll interval while the remote command produces no data.
const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Grace period for the channel to acknowledge a forced close.
const CLOSE_GRACE_MS: u32 = 2_000;

#[derive(Debug, Clone, Copy)]
pub struct ExecPolicy {
    /// Capture stdout into the result. Stderr is always captured.
    pub capture_output: bool,
    pub timeout_ms: u64,
    /// Timeout without completion is tolerated rather than fatal.
    pub interrupt_on_timeout: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    Completed,
    TimedOut,
}

/// What to do once the wait is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitResolution {
    /// Completed in time: fetch and report the real exit status.
    FetchStatus,
    /// Tolerated interruption: no exit status is ever fetched.
    Interrupted,
    /// Timeout with interruption not tolerated.
    Fail,
}

fn resolve_exit(wait: WaitOutcome, interrupt_on_timeout: bool) -> ExitResolution {
    match wait {
        WaitOutcome::Completed => ExitResolution::FetchStatus,
        WaitOutcome::TimedOut if interrupt_on_timeout => ExitResolution::Interrupted,
        WaitOutcome::TimedOut => ExitResolution::Fail,
    }
}

/// Runs `command` on a fresh channel of `session`. The channel is allocated
/// with a PTY so that closing it delivers a hangup to the remote process;
/// this is what cleans up orphaned processes on timeout.
pub(crate) fn run_command(
    session: &Session,
    command: &str,
    policy: &ExecPolicy,
) -> Result<CommandOutput, ExecuteError> {
    session.set_timeout(policy.timeout_ms as u32);
    let mut channel = open_exec_channel(session, command)?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    session.set_blocking(false);
    let wait = drain_channel(&mut channel, policy, &mut stdout, &mut stderr);
    session.set_blocking(true);

    let wait = match wait {
        Ok(wait) => wait,
        Err(error) => {
            close_channel(session, &mut channel);
            return Err(error);
        }
    };

    match resolve_exit(wait, policy.interrupt_on_timeout) {
        ExitResolution::Fail => {
            close_channel(session, &mut channel);
            Err(ExecuteError::ExecutionTimeout {
                command: command.to_string(),
                timeout_ms: policy.timeout_ms,
            })
        }
        ExitResolution::Interrupted => {
            debug!(command = %command, "execution interrupted on timeout (tolerated)");
            close_channel(session, &mut channel);
            Ok(build_output(command, policy, stdout, stderr, None))
        }
        ExitResolution::FetchStatus => {
            channel
                .close()
                .and_then(|_| channel.wait_close())
                .map_err(|source| ExecuteError::Channel { source })?;
            let exit_status =
                channel
                    .exit_status()
                    .map_err(|source| ExecuteError::MissingExitStatus {
                        command: command.to_string(),
                        source,
                    })?;
            Ok(build_output(
                command,
                policy,
                stdout,
                stderr,
                Some(exit_status),
            ))
        }
    }
}

fn open_exec_channel(session: &Session, command: &str) -> Result<Channel, ExecuteError> {
    let channel_error = |source| ExecuteError::Channel { source };
    let mut channel = session.channel_session().map_err(channel_error)?;
    // PTY required: without it the remote process outlives a closed channel.
    channel
        .request_pty("xterm", None, None)
        .map_err(channel_error)?;
    channel.exec(command).map_err(channel_error)?;
    Ok(channel)
}

/// Non-blocking capture loop: reads stdout (kept or discarded per policy)
/// and stderr (always kept) until the channel reaches EOF or the execution
/// timeout expires.
fn drain_channel(
    channel: &mut Channel,
    policy: &ExecPolicy,
    stdout: &mut Vec<u8>,
    stderr: &mut Vec<u8>,
) -> Result<WaitOutcome, ExecuteError> {
    let deadline = Instant::now() + Duration::from_millis(policy.timeout_ms);
    let mut buf = [0u8; 8192];

    loop {
        let mut progressed = false;
        match channel.read(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                if policy.capture_output {
                    stdout.extend_from_slice(&buf[..n]);
                }
                progressed = true;
            }
            Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(source) => return Err(ExecuteError::Read { source }),
        }
        match channel.stderr().read(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                stderr.extend_from_slice(&buf[..n]);
                progressed = true;
            }
            Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(source) => return Err(ExecuteError::Read { source }),
        }

        if channel.eof() {
            return Ok(WaitOutcome::Completed);
        }
        if Instant::now() >= deadline {
            return Ok(WaitOutcome::TimedOut);
        }
        if !progressed {
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Force-closes the channel; through the PTY this hangs up the remote
/// process. Best effort with a short grace period.
fn close_channel(session: &Session, channel: &mut Channel) {
    session.set_timeout(CLOSE_GRACE_MS);
    if let Err(error) = channel.close().and_then(|_| channel.wait_close()) {
        warn!(%error, "channel did not close cleanly");
    }
}

fn build_output(
    command: &str,
    policy: &ExecPolicy,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_status: Option<i32>,
) -> CommandOutput {
    CommandOutput {
        command: command.to_string(),
        output: policy
            .capture_output
            .then(|| String::from_utf8_lossy(&stdout).into_owned()),
        error_output: String::from_utf8_lossy(&stderr).into_owned(),
        exit_status,
    }
}
