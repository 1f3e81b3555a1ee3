//! Subprocess execution with a timeout.
//!
//! This is the only place the crate touches the process boundary. Every
//! failure (spawn error, wait error, timeout) is folded into a
//! [`CommandOutput`] carrying [`EXEC_FAILURE_CODE`], so callers decide on
//! data instead of handling errors.

use crate::constants::{EXEC_FAILURE_CODE, POLL_INTERVAL};
use crossbeam_channel::Receiver;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Captured result of one subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// A result describing a command that never produced an exit status.
    #[must_use]
    pub fn exec_failure(message: impl Into<String>) -> Self {
        Self {
            code: EXEC_FAILURE_CODE,
            stdout: String::new(),
            stderr: message.into(),
        }
    }
}

/// Runs external commands. Implementations must never panic on command failure.
pub trait CommandRunner: Send + Sync {
    fn run(&self, argv: &[&str], cwd: Option<&Path>, timeout: Duration) -> CommandOutput;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[&str], cwd: Option<&Path>, timeout: Duration) -> CommandOutput {
        let Some((program, args)) = argv.split_first() else {
            return CommandOutput::exec_failure("empty command line");
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("GIT_TERMINAL_PROMPT", "0");
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        // Keep children out of the terminal's process group so Ctrl-C only
        // reaches us; in-flight commands then finish or time out on their own.
        // The group is also what a timeout kills.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return CommandOutput::exec_failure(format!(
                    "Failed to spawn {}: {}",
                    argv.join(" "),
                    e
                ));
            }
        };

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let deadline = Instant::now() + timeout;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    kill_group(&mut child);
                    let _ = child.wait();
                    return CommandOutput::exec_failure(format!(
                        "{} timed out after {:?}",
                        argv.join(" "),
                        timeout
                    ));
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    kill_group(&mut child);
                    return CommandOutput::exec_failure(format!(
                        "Failed to wait for {}: {}",
                        argv.join(" "),
                        e
                    ));
                }
            }
        };

        // The child is gone, but a descendant may still hold the pipes open.
        // The same deadline bounds the reads.
        match (collect(stdout, deadline), collect(stderr, deadline)) {
            (Some(stdout), Some(stderr)) => CommandOutput {
                code: status.code().unwrap_or(EXEC_FAILURE_CODE),
                stdout,
                stderr,
            },
            _ => {
                kill_group(&mut child);
                CommandOutput::exec_failure(format!(
                    "{} timed out after {:?} waiting for its output to close",
                    argv.join(" "),
                    timeout
                ))
            }
        }
    }
}

/// Kills the child's whole process group, so descendants go with it.
#[cfg(unix)]
fn kill_group(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(pgid) = i32::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    if killpg(Pid::from_raw(pgid), Signal::SIGKILL).is_err() {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    let _ = child.kill();
}

/// Reads a pipe to its end on a helper thread. Readers that never finish
/// are abandoned.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

fn collect(pipe: Option<Receiver<Vec<u8>>>, deadline: Instant) -> Option<String> {
    let Some(rx) = pipe else {
        return Some(String::new());
    };
    rx.recv_deadline(deadline)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_failure_uses_distinguished_code() {
        let output = CommandOutput::exec_failure("boom");
        assert_eq!(output.code, EXEC_FAILURE_CODE);
        assert!(!output.success());
        assert_eq!(output.stderr, "boom");
    }

    #[test]
    fn test_empty_argv_is_exec_failure() {
        let output = SystemRunner.run(&[], None, Duration::from_secs(1));
        assert_eq!(output.code, EXEC_FAILURE_CODE);
    }

    #[test]
    fn test_scripted_runner_repeats_last_reply() {
        let runner = testing::ScriptedRunner::new()
            .ok("git status --porcelain", "?? stale")
            .ok("git status --porcelain", "")
            .then_ok("git status --porcelain", " M a.txt");
        let timeout = Duration::from_secs(1);

        assert_eq!(runner.run(&["git", "status", "--porcelain"], None, timeout).stdout, "");
        for _ in 0..2 {
            let output = runner.run(&["git", "status", "--porcelain"], None, timeout);
            assert_eq!(output.stdout, " M a.txt");
        }
        assert_eq!(runner.lines().len(), 3);
    }
}
