//! Supervised execution of external programs
//!
//! A [`Supervisor`] launches one [`Invocation`], appends everything the child
//! writes to a [`LogSink`], and either waits for it or enforces a wall-clock
//! deadline. On expiry the whole process tree is torn down before the run is
//! reported as [`RunFailure::Timeout`]. Whatever the child leaves running in
//! its process group is killed after it exits, whether it succeeded or not.
//! Runs are never retried here.
//!
//! Callers depend on the [`Runner`] trait rather than the supervisor itself
//! so pipelines and sweeps can be driven by scripted runners in tests.

pub mod tree;

use crate::command::Invocation;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// How often a deadline-bound child is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Why a supervised run did not succeed
#[derive(Debug, Error)]
pub enum RunFailure {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}", describe_exit(.status))]
    ExitNonZero { status: ExitStatus },

    #[error("timed out after {}s (killed {} processes)", .after.as_secs(), .killed.len() + 1)]
    Timeout { after: Duration, killed: Vec<u32> },

    #[error("failed waiting for child: {0}")]
    Wait(#[source] io::Error),
}

fn describe_exit(status: &ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => format!("exited with status {}", code),
        (None, Some(sig)) => format!("terminated by signal {}", sig),
        _ => "exited abnormally".to_string(),
    }
}

impl RunFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RunFailure::Timeout { .. })
    }
}

/// Append-only log file shared by every run of one input
#[derive(Debug)]
pub struct LogSink {
    path: PathBuf,
    file: File,
}

impl LogSink {
    /// Open (creating if needed) a log file in append mode
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a line written by the controller itself
    pub fn note(&self, line: &str) -> io::Result<()> {
        let mut file = &self.file;
        writeln!(file, "{}", line)?;
        file.flush()
    }

    fn child_stdio(&self) -> io::Result<(Stdio, Stdio)> {
        Ok((
            Stdio::from(self.file.try_clone()?),
            Stdio::from(self.file.try_clone()?),
        ))
    }
}

/// Something that can run an invocation to completion
pub trait Runner {
    fn run(
        &mut self,
        invocation: &Invocation,
        log: &LogSink,
        timeout: Option<Duration>,
    ) -> Result<(), RunFailure>;
}

/// Runs real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct Supervisor;

impl Supervisor {
    pub fn new() -> Self {
        Supervisor
    }

    fn spawn(&self, invocation: &Invocation, log: &LogSink) -> Result<Child, RunFailure> {
        let spawn_err = |source| RunFailure::Spawn {
            program: invocation.program().to_path_buf(),
            source,
        };

        let (stdout, stderr) = log.child_stdio().map_err(spawn_err)?;
        let mut command = invocation.to_command();
        command
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            // own process group, so the whole tree can be signalled at once
            .process_group(0);

        command.spawn().map_err(spawn_err)
    }

    fn wait_with_deadline(&self, mut child: Child, timeout: Duration) -> Result<(), RunFailure> {
        let start = Instant::now();

        loop {
            match child.try_wait() {
                Ok(Some(status)) => return check_status(status),
                Ok(None) => {}
                Err(e) => {
                    kill_tree(&mut child);
                    return Err(RunFailure::Wait(e));
                }
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                let killed = kill_tree(&mut child);
                return Err(RunFailure::Timeout {
                    after: timeout,
                    killed,
                });
            }

            thread::sleep(remaining.min(POLL_INTERVAL));
        }
    }
}

impl Runner for Supervisor {
    fn run(
        &mut self,
        invocation: &Invocation,
        log: &LogSink,
        timeout: Option<Duration>,
    ) -> Result<(), RunFailure> {
        let mut child = self.spawn(invocation, log)?;
        let pgid = child.id();

        let result = match timeout {
            None => match child.wait() {
                Ok(status) => check_status(status),
                Err(e) => {
                    kill_tree(&mut child);
                    Err(RunFailure::Wait(e))
                }
            },
            Some(timeout) => self.wait_with_deadline(child, timeout),
        };

        // background jobs the child left behind in its group
        let leftover = tree::clear_group(pgid);
        if !leftover.is_empty() {
            let _ = log.note(&format!(
                "killed {} leftover processes of {}",
                leftover.len(),
                invocation.label()
            ));
        }

        result
    }
}

fn check_status(status: ExitStatus) -> Result<(), RunFailure> {
    if status.success() {
        Ok(())
    } else {
        Err(RunFailure::ExitNonZero { status })
    }
}

/// Kill `child` and all of its descendants, reaping the child.
/// Returns the descendant pids that were targeted.
fn kill_tree(child: &mut Child) -> Vec<u32> {
    let root = child.id();
    let members = tree::descendants(root);

    tree::terminate(root, &members, || {
        let _ = child.try_wait();
    });
    let _ = child.wait();

    members
}
