//! Strictly ordered stage execution
//!
//! Stages run one at a time through a [`Runner`] with no deadline. The first
//! failure aborts the pipeline: later stages never start, and whatever the
//! failing stage wrote is left on disk for diagnosis.
//!
//! Stages are handed to [`Pipeline::run_stage`] one by one rather than as a
//! fixed list, because later stages are only formed after measuring what the
//! earlier ones produced.

use crate::command::Invocation;
use crate::output::Console;
use crate::supervise::{LogSink, RunFailure, Runner};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// One step of a construction
#[derive(Debug, Clone)]
pub struct Stage {
    pub label: String,
    pub invocation: Invocation,
}

impl Stage {
    pub fn new(label: impl Into<String>, invocation: Invocation) -> Self {
        Self {
            label: label.into(),
            invocation,
        }
    }
}

/// A stage exited non-zero or could not be launched
#[derive(Debug, Error)]
#[error("stage {position} ({label}) failed: {source}\n\tcommand: {command}\n\tcheck log file: {}", .log.display())]
pub struct PipelineFailure {
    /// 1-based position of the failing stage
    pub position: usize,
    pub label: String,
    pub command: String,
    pub log: PathBuf,
    #[source]
    pub source: RunFailure,
}

/// Runs stages in order against a shared log
pub struct Pipeline<'a, R: Runner> {
    runner: &'a mut R,
    log: &'a LogSink,
    console: Console,
    completed: usize,
}

impl<'a, R: Runner> Pipeline<'a, R> {
    pub fn new(runner: &'a mut R, log: &'a LogSink, console: Console) -> Self {
        Self {
            runner,
            log,
            console,
            completed: 0,
        }
    }

    /// Number of stages that finished successfully so far
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Run the next stage, blocking until the child has fully exited
    pub fn run_stage(&mut self, stage: Stage) -> Result<(), PipelineFailure> {
        let position = self.completed + 1;
        let command = stage.invocation.command_line();

        self.console
            .header(&format!("{}. Command: {}", stage.label, command));
        let start = Instant::now();

        if let Err(source) = self.runner.run(&stage.invocation, self.log, None) {
            self.console.error("Error executing command line:");
            self.console.info(&format!("\t{}", command));
            self.console
                .info(&format!("Check log file: {}", self.log.path().display()));
            return Err(PipelineFailure {
                position,
                label: stage.label,
                command,
                log: self.log.path().to_path_buf(),
                source,
            });
        }

        self.console.elapsed("Elapsed time", start.elapsed());
        self.completed = position;
        Ok(())
    }

    /// Run a fixed list of stages, stopping at the first failure
    pub fn run_all(
        &mut self,
        stages: impl IntoIterator<Item = Stage>,
    ) -> Result<(), PipelineFailure> {
        for stage in stages {
            self.run_stage(stage)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted runner shared by pipeline, build and sweep tests

    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;
    use std::time::Duration;

    /// Records every invocation and fails those whose label matches
    #[derive(Default)]
    pub struct ScriptedRunner {
        pub calls: Vec<Invocation>,
        pub fail_labels: Vec<String>,
        pub timeout_labels: Vec<String>,
        pub fail_at: Option<usize>,
        pub on_run: Option<Box<dyn FnMut(&Invocation)>>,
    }

    impl ScriptedRunner {
        pub fn labels(&self) -> Vec<String> {
            self.calls.iter().map(|c| c.label().to_string()).collect()
        }
    }

    impl Runner for ScriptedRunner {
        fn run(
            &mut self,
            invocation: &Invocation,
            _log: &LogSink,
            timeout: Option<Duration>,
        ) -> Result<(), RunFailure> {
            self.calls.push(invocation.clone());
            if let Some(hook) = self.on_run.as_mut() {
                hook(invocation);
            }

            if self.timeout_labels.iter().any(|l| l == invocation.label()) {
                return Err(RunFailure::Timeout {
                    after: timeout.unwrap_or_default(),
                    killed: Vec::new(),
                });
            }

            let position = self.calls.len();
            if self.fail_at == Some(position)
                || self.fail_labels.iter().any(|l| l == invocation.label())
            {
                return Err(RunFailure::ExitNonZero {
                    status: ExitStatus::from_raw(1 << 8),
                });
            }
            Ok(())
        }
    }
}
