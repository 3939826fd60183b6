//! Benchmark sweep over datasets, pattern lengths and pattern counts
//!
//! Every grid cell gets one generated pattern file. Each enabled
//! implementation then runs against it under the resource reporter with a
//! long deadline, and one CSV row is appended per run. A run that fails or
//! times out drops its implementation from the rest of the sweep; the
//! remaining implementations carry on.
//!
//! ```text
//! for dataset
//!   for pattern length
//!     for pattern count
//!       genpattern -> pattern file
//!       for implementation still running
//!         evict cache, time -v -o <res> <target>, append CSV row
//! ```

pub mod cache;
pub mod dataset;
pub mod grid;
pub mod report;
pub mod usage;

pub use dataset::DatasetStats;
pub use grid::{BenchConfig, DatasetSpec, Implementation, ToolPaths};
pub use report::{CsvReport, RunRecord, RunStatus};
pub use usage::{MeasurementFailure, Usage};

use crate::command::{Invocation, Params, StageSpec};
use crate::index::mode;
use crate::index::variant::{Toolchain, Width};
use crate::output::{Console, format_secs};
use crate::supervise::{LogSink, Runner};
use crate::utils::progress::{ProgressBar, ProgressStyle};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Where one sweep writes and how long each run may take
#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub timeout: Option<Duration>,
    pub time_program: PathBuf,
    pub log_dir: PathBuf,
    pub csv_path: PathBuf,
}

impl SweepSettings {
    /// `<out>/logs/<YYYYMMDD>/` and `<out>/csvs/<YYYYMMDD>.csv`
    pub fn dated(
        output_dir: &Path,
        timeout: Option<Duration>,
        time_program: impl Into<PathBuf>,
        date: NaiveDate,
    ) -> Self {
        let stamp = date.format("%Y%m%d").to_string();
        Self {
            timeout,
            time_program: time_program.into(),
            log_dir: output_dir.join("logs").join(&stamp),
            csv_path: output_dir.join("csvs").join(format!("{}.csv", stamp)),
        }
    }
}

/// Which implementations are still part of the sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningSet {
    state: BTreeMap<Implementation, bool>,
}

impl RunningSet {
    pub fn new(implementations: &[Implementation]) -> Self {
        Self {
            state: implementations.iter().map(|&imp| (imp, true)).collect(),
        }
    }

    pub fn is_running(&self, implementation: Implementation) -> bool {
        self.state.get(&implementation).copied().unwrap_or(false)
    }

    /// Same set with `implementation` switched off
    pub fn stop(mut self, implementation: Implementation) -> Self {
        if let Some(flag) = self.state.get_mut(&implementation) {
            *flag = false;
        }
        self
    }

    pub fn any_running(&self) -> bool {
        self.state.values().any(|&running| running)
    }

    pub fn stopped(&self) -> Vec<Implementation> {
        self.state
            .iter()
            .filter(|(_, running)| !**running)
            .map(|(&imp, _)| imp)
            .collect()
    }
}

/// Totals reported once the sweep ends
#[derive(Debug, Clone, Default)]
pub struct SweepSummary {
    pub rows: usize,
    pub failures: usize,
    pub timeouts: usize,
    pub unmeasured: usize,
    pub skipped_cells: usize,
    pub stopped: Vec<Implementation>,
    pub csv_path: PathBuf,
}

/// One (dataset, pattern length, pattern count) combination
struct Cell<'c> {
    dataset: &'c DatasetSpec,
    stats: DatasetStats,
    pattern_length: u64,
    pattern_count: u64,
}

impl Cell<'_> {
    fn pattern_path(&self) -> PathBuf {
        let mut name = OsString::from(self.dataset.path.as_os_str());
        name.push(format!("_{}_{}.pat", self.pattern_length, self.pattern_count));
        PathBuf::from(name)
    }
}

/// Timing of one run together with its outcome
#[derive(Debug, Clone, Copy)]
struct Outcome {
    status: RunStatus,
    elapsed: Duration,
    usage: Usage,
}

pub struct Harness<'a, R: Runner> {
    runner: &'a mut R,
    config: &'a BenchConfig,
    settings: SweepSettings,
    console: Console,
    progress: ProgressBar,
}

impl<'a, R: Runner> Harness<'a, R> {
    pub fn new(
        runner: &'a mut R,
        config: &'a BenchConfig,
        settings: SweepSettings,
        console: Console,
    ) -> Self {
        Self {
            runner,
            config,
            settings,
            console,
            progress: ProgressBar::hidden(),
        }
    }

    /// Run the whole grid, writing the CSV as rows complete
    pub fn sweep(&mut self) -> Result<SweepSummary> {
        fs::create_dir_all(&self.settings.log_dir).with_context(|| {
            format!(
                "Failed to create log directory {}",
                self.settings.log_dir.display()
            )
        })?;
        let mut report = CsvReport::create(&self.settings.csv_path).with_context(|| {
            format!(
                "Failed to create result file {}",
                self.settings.csv_path.display()
            )
        })?;

        self.console
            .info(&format!("Writing results to {}", report.path().display()));

        self.progress = ProgressBar::new(self.config.cell_count() as u64);
        self.progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map(|style| style.progress_chars("█▓▒░  "))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut summary = SweepSummary {
            csv_path: report.path().to_path_buf(),
            ..Default::default()
        };
        let config = self.config;
        let mut running = RunningSet::new(&config.implementations);
        let cells_per_dataset =
            (config.pattern_lengths.len() * config.pattern_counts.len()) as u64;

        for dataset in &config.datasets {
            self.progress.set_message(dataset.base_name());

            let stats = match DatasetStats::from_path(&dataset.path) {
                Ok(stats) => stats,
                Err(e) => {
                    self.warn(&format!(
                        "Skipping dataset {}: {}",
                        dataset.path.display(),
                        e
                    ));
                    summary.skipped_cells += cells_per_dataset as usize;
                    self.progress.inc(cells_per_dataset);
                    continue;
                }
            };
            self.detail(&format!(
                "{}: {} sequences, {} residues",
                dataset.base_name(),
                stats.sequences,
                stats.total_length
            ));

            let log_path = self
                .settings
                .log_dir
                .join(format!("{}.log", dataset.base_name()));
            let log = LogSink::open(&log_path)
                .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

            for &pattern_length in &config.pattern_lengths {
                for &pattern_count in &config.pattern_counts {
                    let cell = Cell {
                        dataset,
                        stats,
                        pattern_length,
                        pattern_count,
                    };
                    running = self.run_cell(&cell, running, &log, &mut report, &mut summary)?;
                    self.progress.inc(1);
                }
            }
        }

        self.progress.finish_and_clear();
        summary.stopped = running.stopped();
        Ok(summary)
    }

    fn run_cell(
        &mut self,
        cell: &Cell<'_>,
        running: RunningSet,
        log: &LogSink,
        report: &mut CsvReport,
        summary: &mut SweepSummary,
    ) -> Result<RunningSet> {
        if !running.any_running() {
            summary.skipped_cells += 1;
            return Ok(running);
        }

        let patterns = cell.pattern_path();
        let generate = Invocation::new(&self.config.tools.genpattern)
            .with_label("genpattern")
            .arg(&cell.dataset.path)
            .arg(cell.pattern_length.to_string())
            .arg(cell.pattern_count.to_string())
            .arg(&patterns)
            .args(["1", "0"]);
        self.detail(&generate.command_line());

        if let Err(e) = self.runner.run(&generate, log, self.settings.timeout) {
            self.warn(&format!(
                "Pattern generation failed for {} (length {}, count {}): {}; skipping",
                cell.dataset.base_name(),
                cell.pattern_length,
                cell.pattern_count,
                e
            ));
            summary.skipped_cells += 1;
            return Ok(running);
        }

        let config = self.config;
        let mut running = running;
        for &implementation in &config.implementations {
            if !running.is_running(implementation) {
                continue;
            }

            let outcome = match self.target(implementation, cell.dataset, &patterns) {
                Ok(target) => self.timed_run(&cell.dataset.path, target, log),
                Err(e) => {
                    self.warn(&format!("{}: {:#}", implementation, e));
                    Outcome {
                        status: RunStatus::Failed,
                        elapsed: Duration::ZERO,
                        usage: Usage::default(),
                    }
                }
            };

            let record = RunRecord {
                structure: implementation.structure().to_string(),
                sequences: cell.stats.sequences,
                average_length: cell.stats.average_length(),
                dataset: cell.dataset.base_name(),
                total_length: cell.stats.total_length,
                query: implementation.query().name().to_string(),
                pattern_length: cell.pattern_length,
                pattern_count: cell.pattern_count,
                elapsed_secs: outcome.elapsed.as_secs_f64(),
                max_rss_kb: outcome.usage.max_rss_kb,
                user_cpu_secs: outcome.usage.user_cpu_secs,
                status: outcome.status,
            };
            report.append(&record).with_context(|| {
                format!("Failed to append to {}", report.path().display())
            })?;
            summary.rows += 1;

            match outcome.status {
                RunStatus::Ok => {}
                RunStatus::Unmeasured => summary.unmeasured += 1,
                RunStatus::Failed | RunStatus::TimedOut => {
                    if outcome.status == RunStatus::TimedOut {
                        summary.timeouts += 1;
                    } else {
                        summary.failures += 1;
                    }
                    self.warn(&format!(
                        "{} {} on {}; no further runs of it",
                        implementation,
                        outcome.status,
                        cell.dataset.base_name()
                    ));
                    running = running.stop(implementation);
                }
            }
        }

        Ok(running)
    }

    /// Program and arguments timed for `implementation`
    fn target(
        &self,
        implementation: Implementation,
        dataset: &DatasetSpec,
        patterns: &Path,
    ) -> Result<Invocation> {
        let tools = &self.config.tools;

        if implementation.is_r_index() {
            let program = match implementation {
                Implementation::RIndexCount => tools.r_index_count.as_ref(),
                _ => tools.r_index_locate.as_ref(),
            }
            .with_context(|| format!("no binary configured for {}", implementation))?;

            return Ok(Invocation::new(program)
                .with_label(implementation.name())
                .arg(dataset.r_index_path())
                .arg(patterns));
        }

        let width = er_index_width(dataset)?;
        let spec = StageSpec::new(
            implementation.name(),
            Toolchain::new(&tools.er_index_dir).index(width),
        )
        .positional("input")
        .option("-q", "query")
        .option("-b", "block")
        .switch("-f", "first")
        .fixed("-v")
        .option("-p", "patterns");

        let params = Params::new()
            .path("input", &dataset.path)
            .int("query", implementation.query().code())
            .int("block", u64::from(self.config.block))
            .switch("first", self.config.first_rotation)
            .path("patterns", patterns);

        Ok(spec.format(&params)?)
    }

    /// Cold-cache run under the resource reporter
    fn timed_run(&mut self, dataset: &Path, target: Invocation, log: &LogSink) -> Outcome {
        let mut res_name = dataset.file_name().map(OsString::from).unwrap_or_default();
        res_name.push(format!(".{}.res", target.label()));
        let res_path = self.settings.log_dir.join(res_name);

        if let Err(e) = fs::remove_file(&res_path) {
            if e.kind() != io::ErrorKind::NotFound {
                self.warn(&format!("Cannot remove {}: {}", res_path.display(), e));
            }
        }
        if let Err(e) = cache::evict(dataset) {
            self.warn(&format!(
                "Page-cache eviction failed for {}: {}",
                dataset.display(),
                e
            ));
        }

        let wrapped = target.wrapped_by(
            Invocation::new(&self.settings.time_program)
                .arg("-v")
                .arg("-o")
                .arg(&res_path),
        );
        self.detail(&wrapped.command_line());
        self.note(log, &format!("Running: {}", wrapped.command_line()));

        let start = Instant::now();
        let result = self.runner.run(&wrapped, log, self.settings.timeout);
        let elapsed = start.elapsed();
        self.note(log, &format!("Total time: {}", format_secs(elapsed)));

        let (status, usage) = match result {
            Ok(()) => match usage::read_report(&res_path) {
                Ok(usage) => (RunStatus::Ok, usage),
                Err(e) => {
                    self.warn(&format!("{}: {}", wrapped.label(), e));
                    (RunStatus::Unmeasured, Usage::default())
                }
            },
            Err(failure) if failure.is_timeout() => {
                self.warn(&format!("{}: {}", wrapped.label(), failure));
                (RunStatus::TimedOut, Usage::default())
            }
            Err(failure) => {
                self.warn(&format!(
                    "{}: {} (see {})",
                    wrapped.label(),
                    failure,
                    log.path().display()
                ));
                (
                    RunStatus::Failed,
                    usage::read_report(&res_path).unwrap_or_default(),
                )
            }
        };

        Outcome {
            status,
            elapsed,
            usage,
        }
    }

    fn note(&self, log: &LogSink, line: &str) {
        if let Err(e) = log.note(line) {
            self.warn(&format!("Cannot write to {}: {}", log.path().display(), e));
        }
    }

    fn warn(&self, msg: &str) {
        self.progress.suspend(|| self.console.warn(msg));
    }

    fn detail(&self, msg: &str) {
        self.progress.suspend(|| self.console.detail(msg));
    }
}

/// Width of the er-index build being queried: configured, else recorded.
/// A dataset with neither was never built and cannot be queried.
fn er_index_width(dataset: &DatasetSpec) -> Result<Width> {
    match dataset.width()? {
        Some(width) => Ok(width),
        None => Ok(mode::read_mode(&dataset.path)?),
    }
}
