//! External command execution.
//!
//! Validators never spawn processes directly; they go through a
//! [`CommandRunner`] so that tests can script command results.

use std::io::Read;
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, LazyLock, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, warn};

/// Default ceiling for a single external command. Infra deploys are slow,
/// but a hang must still end the run.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60 * 60);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long to keep reading output once the child is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// A fully specified external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[&str], cwd: &Path, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: cwd.to_path_buf(),
            timeout,
        }
    }

    /// Space-joined command line, used for logging and report messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// Process exited; `None` when it was terminated by a signal.
    Exited(Option<i32>),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub state: ExitState,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            state: ExitState::Exited(Some(0)),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            state: ExitState::Exited(Some(code)),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn timed_out() -> Self {
        Self {
            state: ExitState::TimedOut,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == ExitState::Exited(Some(0))
    }

    /// stdout followed by stderr, skipping empty streams.
    pub fn combined(&self) -> String {
        [self.stdout.trim_end(), self.stderr.trim_end()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs external commands on behalf of validators.
///
/// `Err` means the command could not be started at all.
pub trait CommandRunner: Send + Sync {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands as real child processes, killing them on timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!(command = %spec.display(), cwd = %spec.cwd.display(), "spawning");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a timeout can take down every descendant.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to start `{}`", spec.display()))?;

        // Drain both pipes on their own threads so a chatty child cannot
        // block on a full pipe while we poll for exit.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let started = Instant::now();
        let state = loop {
            match child.try_wait() {
                Ok(Some(status)) => break ExitState::Exited(status.code()),
                Ok(None) => {}
                Err(err) => {
                    terminate(&mut child);
                    return Err(err)
                        .with_context(|| format!("failed to poll `{}`", spec.display()));
                }
            }
            if started.elapsed() >= spec.timeout {
                warn!(
                    command = %spec.display(),
                    timeout_secs = spec.timeout.as_secs(),
                    "command timed out; killing"
                );
                terminate(&mut child);
                break ExitState::TimedOut;
            }
            thread::sleep(POLL_INTERVAL);
        };

        // Descendants that outlive the child may still hold the pipes open.
        let deadline = Instant::now() + DRAIN_GRACE;
        Ok(CommandOutput {
            state,
            stdout: collect(stdout, deadline),
            stderr: collect(stderr, deadline),
        })
    }
}

/// Kill the child together with its process group, then reap it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: plain syscall; the group was created at spawn.
            unsafe { libc::kill(-pgid, libc::SIGKILL) };
        }
    }
    child.kill().ok();
    child.wait().ok();
}

/// Output read so far by a drain thread.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: thread::JoinHandle<()>,
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Drain {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buf);
    let handle = thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => match sink.lock() {
                    Ok(mut out) => out.extend_from_slice(&chunk[..n]),
                    Err(_) => break,
                },
            }
        }
    });
    Drain { buf, handle }
}

/// Whatever a drain thread read by `deadline`. A thread still blocked on a
/// pipe inherited by a descendant is left detached.
fn collect(drain: Option<Drain>, deadline: Instant) -> String {
    let Some(drain) = drain else {
        return String::new();
    };
    while !drain.handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    match drain.buf.lock() {
        Ok(out) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => String::new(),
    }
}

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("Invalid regex")
});

/// Normalize captured process output before it is embedded in the report.
///
/// Strips ANSI escape sequences, drops backslashes and replaces `|` with `-`.
pub fn sanitize_output(raw: &str) -> String {
    ANSI_ESCAPE
        .replace_all(raw, "")
        .replace('\\', "")
        .replace('|', "-")
}
