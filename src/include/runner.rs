//! Run-and-capture interface for shell commands
//!
//! Commands run synchronously through the platform shell, so arguments may
//! use pipes and redirections. The environment is cleared except for `PATH`
//! and any explicitly passed-through variables.

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// How often a command with a timeout is polled for completion
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Exit status reported when the process ended without a code (killed by a signal)
const SIGNALED_STATUS: i32 = -1;

/// Options for a single command invocation.
///
/// Built fresh for every directive; nothing is shared between invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    pub cwd: PathBuf,
    pub env: Vec<(String, OsString)>,
    pub timeout: Option<Duration>,
}

impl ExecOptions {
    /// Options running in `cwd` with the host `PATH`
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        let env = std::env::var_os("PATH")
            .map(|path| vec![("PATH".to_string(), path)])
            .unwrap_or_default();
        Self {
            cwd: cwd.into(),
            env,
            timeout: None,
        }
    }

    /// Passes the named host variables through, when set
    pub fn pass_env<'a>(mut self, names: impl IntoIterator<Item = &'a String>) -> Self {
        for name in names {
            if self.env.iter().any(|(existing, _)| existing == name) {
                continue;
            }
            if let Some(value) = std::env::var_os(name) {
                self.env.push((name.clone(), value));
            }
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Captured outcome of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{0}")]
    Spawn(#[from] io::Error),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Runs a command line and captures its output
pub trait CommandRunner {
    fn run(&self, command: &str, options: &ExecOptions) -> Result<ExecutionResult, RunError>;
}

/// Runs commands through `sh -c` (or `cmd /C` on Windows)
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl ShellRunner {
    fn command(command: &str) -> Command {
        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        }

        #[cfg(not(windows))]
        {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, options: &ExecOptions) -> Result<ExecutionResult, RunError> {
        let mut cmd = Self::command(command);
        cmd.current_dir(&options.cwd)
            .env_clear()
            .envs(options.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Background jobs of the shell join its group so a timeout kills them too
        #[cfg(unix)]
        if options.timeout.is_some() {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn()?;

        match options.timeout {
            None => {
                let output = child.wait_with_output()?;
                Ok(ExecutionResult {
                    exit_status: output.status.code().unwrap_or(SIGNALED_STATUS),
                    stdout: output.stdout,
                    stderr: output.stderr,
                })
            }
            Some(timeout) => wait_with_timeout(child, timeout),
        }
    }
}

/// Waits for the child and its output, killing it once `timeout` has elapsed.
///
/// Pipes are drained on separate threads so a chatty command cannot block
/// on a full pipe while we poll. The deadline also covers the pipes, which
/// stay open while a background job of the shell holds them.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<ExecutionResult, RunError> {
    let deadline = Instant::now() + timeout;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            kill(&mut child);
            return Err(RunError::TimedOut(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    };

    match (collect(stdout, deadline), collect(stderr, deadline)) {
        (Some(stdout), Some(stderr)) => Ok(ExecutionResult {
            exit_status: status.code().unwrap_or(SIGNALED_STATUS),
            stdout,
            stderr,
        }),
        _ => {
            kill(&mut child);
            Err(RunError::TimedOut(timeout))
        }
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// Output of a drained pipe, or `None` if it is still open at `deadline`
fn collect(pipe: Option<Receiver<Vec<u8>>>, deadline: Instant) -> Option<Vec<u8>> {
    let Some(pipe) = pipe else {
        return Some(Vec::new());
    };
    match pipe.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(buf) => Some(buf),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(Vec::new()),
    }
}

/// Kills the child's whole process group, then the child itself
fn kill(child: &mut Child) {
    #[cfg(unix)]
    {
        let _ = Command::new("kill")
            .arg("-9")
            .arg("--")
            .arg(format!("-{}", child.id()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
    let _ = child.kill();
    let _ = child.wait();
}
