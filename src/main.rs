use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use erx::bench::{BenchConfig, Harness, SweepSettings};
use erx::index::artifacts::{default_pattern_path, log_path};
use erx::index::query::run_foreground;
use erx::index::status::show_status;
use erx::index::{BuildParams, QueryKind, Toolchain, construct, query_invocation};
use erx::output::Console;
use erx::supervise::{LogSink, Supervisor};
use erx::utils::{AppConfig, get_config_path};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "erx")]
#[command(about = "Build, query and benchmark extended r-indexes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Construct an index and/or run count and locate queries against it
    Index {
        /// Input collection (FASTA)
        input: PathBuf,

        /// Construct the extended r-index
        #[arg(long)]
        construct: bool,

        /// Count occurrences of each pattern
        #[arg(long)]
        count: bool,

        /// Locate occurrences of each pattern
        #[arg(long)]
        locate: bool,

        /// Sliding window size for the parser
        #[arg(short, long, default_value_t = 10)]
        window: u32,

        /// Hash modulus for the parser
        #[arg(short = 'p', long, default_value_t = 100)]
        modulus: u32,

        /// Bitvector block size for predecessor queries
        #[arg(short, long, default_value_t = 2)]
        block: u32,

        /// Sample only the first rotation of each sequence
        #[arg(short, long)]
        first: bool,

        /// Pattern file (defaults to <input>.pat)
        #[arg(long)]
        pfile: Option<PathBuf>,

        /// Also print the query command lines (stage command lines are always shown)
        #[arg(short, long)]
        verbose: bool,

        /// Directory holding the stage executables
        #[arg(long)]
        bin_dir: Option<PathBuf>,
    },
    /// Show the stored mode and artifacts of an input
    Status {
        /// Input collection
        input: PathBuf,
    },
    /// Run a benchmark sweep described by a JSON grid
    Bench {
        /// Grid configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Also print dataset statistics and per-run command lines
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show the application configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Index {
            input,
            construct: build,
            count,
            locate,
            window,
            modulus,
            block,
            first,
            pfile,
            verbose,
            bin_dir,
        } => {
            let params = BuildParams {
                window,
                modulus,
                block,
                first_rotation: first,
            };
            let mut queries = Vec::new();
            if count {
                queries.push(QueryKind::Count);
            }
            if locate {
                queries.push(QueryKind::Locate);
            }
            run_index(
                input,
                build,
                &queries,
                params,
                pfile,
                bin_dir,
                Console::new(verbose),
            )?;
        }
        Commands::Status { input } => {
            show_status(&input)?;
        }
        Commands::Bench { config, verbose } => {
            run_bench(config, Console::new(verbose))?;
        }
        Commands::Config { write } => {
            let config = AppConfig::load()?;
            let path = get_config_path()?;
            if write {
                config.save()?;
                println!("Wrote {}", path.display());
            } else {
                println!("Config file: {}", path.display());
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("Effective bin dir: {}", config.effective_bin_dir()?.display());
        }
    }

    Ok(())
}

fn run_index(
    input: PathBuf,
    build: bool,
    queries: &[QueryKind],
    params: BuildParams,
    pfile: Option<PathBuf>,
    bin_dir: Option<PathBuf>,
    console: Console,
) -> Result<()> {
    if !build && queries.is_empty() {
        console.warn("Nothing to do: pass --construct, --count and/or --locate");
        return Ok(());
    }

    let bin_dir = match bin_dir {
        Some(dir) => dir,
        None => AppConfig::load()?.effective_bin_dir()?,
    };
    let toolchain = Toolchain::new(bin_dir);
    if !toolchain.bin_dir().is_dir() {
        bail!(
            "Executable directory {} does not exist; pass --bin-dir or set bin_dir in the config",
            toolchain.bin_dir().display()
        );
    }

    if build {
        let log_file = log_path(&input);
        console.info(&format!(
            "Sending logging messages to file: {}",
            log_file.display()
        ));
        let log = LogSink::open(&log_file)
            .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

        construct(
            &mut Supervisor::new(),
            &toolchain,
            &input,
            &params,
            &log,
            console,
        )
        .with_context(|| format!("Construction of {} failed", input.display()))?;
    }

    let patterns = pfile.unwrap_or_else(|| default_pattern_path(&input));
    for &kind in queries {
        console.header(&format!("Computing {} queries", kind));
        let invocation = query_invocation(
            &toolchain,
            &input,
            kind,
            &patterns,
            params.first_rotation,
        )?;
        console.detail(&invocation.command_line());

        let start = Instant::now();
        run_foreground(&invocation, kind)?;
        console.elapsed(&format!("{} queries", kind), start.elapsed());
    }

    Ok(())
}

fn run_bench(config_path: PathBuf, console: Console) -> Result<()> {
    let config = BenchConfig::load(&config_path)?;
    let app = AppConfig::load()?;

    let timeout = config
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| app.bench_timeout());
    let time_program = config
        .time_program
        .clone()
        .unwrap_or_else(|| app.time_program.clone());
    if !time_program.is_file() {
        bail!(
            "Resource reporter {} not found; set time_program",
            time_program.display()
        );
    }

    let settings = SweepSettings::dated(
        &config.output_dir,
        Some(timeout),
        time_program,
        chrono::Local::now().date_naive(),
    );

    console.header(&format!(
        "Benchmarking {} cells x {} implementations",
        config.cell_count(),
        config.implementations.len()
    ));

    let mut supervisor = Supervisor::new();
    let summary = Harness::new(&mut supervisor, &config, settings, console).sweep()?;

    console.info(&format!(
        "{} rows written to {}",
        summary.rows,
        summary.csv_path.display()
    ));
    if summary.failures + summary.timeouts + summary.unmeasured + summary.skipped_cells > 0 {
        console.warn(&format!(
            "{} failed, {} timed out, {} unmeasured, {} cells skipped",
            summary.failures, summary.timeouts, summary.unmeasured, summary.skipped_cells
        ));
    }
    for implementation in &summary.stopped {
        console.warn(&format!("{} stopped early", implementation));
    }

    Ok(())
}
