//! Process-based command execution through `sudo`.
//!
//! [`SudoCommandRunner`] implements the [`CommandRunner`] trait by spawning
//! `sudo su - <principal> -c <command>`, draining stdout and stderr on helper
//! threads so the child never blocks on a full pipe, and polling for exit
//! until the command's timeout elapses. On Unix each command leads its own
//! process group, so a command that outlives its budget is killed together
//! with the shell and engine processes it started, and is reported as
//! [`CommandError::Timeout`].

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::command::{CommandOutput, CommandSpec};
use crate::error::CommandError;
use crate::runner::CommandRunner;

/// Tracing target for command process operations.
const PROCESS_TARGET: &str = "guest_exec::process";

/// Interval between two exit checks of a running command.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs commands in a login shell of the requested principal via `sudo`.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use guest_exec::{CommandRunner, CommandSpec, SudoCommandRunner};
///
/// let runner = SudoCommandRunner::new();
/// let spec = CommandSpec::new("db2 list database directory", "db2inst1", Duration::from_secs(60));
/// let output = runner.run(&spec)?;
/// # Ok::<(), guest_exec::CommandError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SudoCommandRunner {
    sudo: String,
}

impl Default for SudoCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SudoCommandRunner {
    /// Builds a runner that invokes `sudo` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sudo("sudo")
    }

    /// Builds a runner that invokes the given `sudo` executable.
    #[must_use]
    pub fn with_sudo(sudo: impl Into<String>) -> Self {
        Self { sudo: sudo.into() }
    }
}

impl CommandRunner for SudoCommandRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let mut command = Command::new(&self.sudo);
        command
            .args(["su", "-", spec.principal(), "-c", spec.command()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        run_to_completion(spec, command)
    }
}

/// Spawns `command`, collects its output, and enforces the command's timeout.
fn run_to_completion(spec: &CommandSpec, mut command: Command) -> Result<CommandOutput, CommandError> {
    let shown = spec.display_command();
    debug!(
        target: PROCESS_TARGET,
        command = shown,
        principal = spec.principal(),
        timeout_secs = spec.timeout().as_secs(),
        "spawning command"
    );

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command.spawn().map_err(|err| CommandError::Spawn {
        command: shown.to_owned(),
        principal: spec.principal().to_owned(),
        source: Arc::new(err),
    })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let status = wait_for_exit(spec, &mut child)?;
    let stdout = collect(shown, stdout)?;
    let stderr = collect(shown, stderr)?;

    if status.success() {
        debug!(
            target: PROCESS_TARGET,
            command = shown,
            stdout_bytes = stdout.len(),
            "command completed"
        );
        return Ok(CommandOutput::new(stdout, stderr));
    }

    // Engine tools print their message codes on stdout.
    let diagnostics = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };
    let code = status.code().unwrap_or(-1);
    debug!(
        target: PROCESS_TARGET,
        command = shown,
        status = code,
        diagnostics,
        "command exited with failure"
    );
    Err(CommandError::NonZeroExit {
        command: shown.to_owned(),
        status: code,
        stderr: diagnostics.to_owned(),
    })
}

/// Reads a child pipe to completion on a helper thread.
fn drain<R>(pipe: Option<R>) -> Option<JoinHandle<io::Result<String>>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut reader| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            reader.read_to_end(&mut buffer)?;
            Ok(String::from_utf8_lossy(&buffer).into_owned())
        })
    })
}

/// Joins a drain thread and returns what it read.
fn collect(
    command: &str,
    handle: Option<JoinHandle<io::Result<String>>>,
) -> Result<String, CommandError> {
    let Some(handle) = handle else {
        return Ok(String::new());
    };
    let result = handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("output reader panicked")));
    result.map_err(|err| CommandError::Io {
        command: command.to_owned(),
        source: Arc::new(err),
    })
}

/// Waits for the child process to exit, enforcing the timeout.
fn wait_for_exit(spec: &CommandSpec, child: &mut Child) -> Result<ExitStatus, CommandError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if start.elapsed() > spec.timeout() {
                    warn!(
                        target: PROCESS_TARGET,
                        command = spec.display_command(),
                        timeout_secs = spec.timeout().as_secs(),
                        "command timed out, killing process"
                    );
                    kill_process_tree(child);
                    drop(child.wait());
                    return Err(CommandError::Timeout {
                        command: spec.display_command().to_owned(),
                        timeout_secs: spec.timeout().as_secs(),
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                return Err(CommandError::Io {
                    command: spec.display_command().to_owned(),
                    source: Arc::new(err),
                });
            }
        }
    }
}

/// Kills the child's process group, falling back to the child alone.
#[cfg(unix)]
fn kill_process_tree(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let killed = i32::try_from(child.id())
        .ok()
        .is_some_and(|pid| killpg(Pid::from_raw(pid), Signal::SIGKILL).is_ok());
    if !killed {
        drop(child.kill());
    }
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child) {
    drop(child.kill());
}
