//! Incremental CSV result file

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const HEADER: [&str; 12] = [
    "Datastructure",
    "Nseq",
    "SeqLen",
    "Dataset",
    "TotLength",
    "Query",
    "PattLen",
    "NoPatt",
    "Time",
    "MemPeak",
    "CPU",
    "Status",
];

/// Outcome marker for one timed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    Failed,
    TimedOut,
    /// Run succeeded but its usage report was missing or malformed
    Unmeasured,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Ok => "ok",
            RunStatus::Failed => "failed",
            RunStatus::TimedOut => "timeout",
            RunStatus::Unmeasured => "unmeasured",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the result file
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub structure: String,
    pub sequences: u64,
    pub average_length: f64,
    pub dataset: String,
    pub total_length: u64,
    pub query: String,
    pub pattern_length: u64,
    pub pattern_count: u64,
    pub elapsed_secs: f64,
    pub max_rss_kb: u64,
    pub user_cpu_secs: f64,
    pub status: RunStatus,
}

impl RunRecord {
    pub fn fields(&self) -> [String; 12] {
        [
            self.structure.clone(),
            self.sequences.to_string(),
            format!("{:.2}", self.average_length),
            self.dataset.clone(),
            self.total_length.to_string(),
            self.query.clone(),
            self.pattern_length.to_string(),
            self.pattern_count.to_string(),
            format!("{:.4}", self.elapsed_secs),
            self.max_rss_kb.to_string(),
            format!("{:.2}", self.user_cpu_secs),
            self.status.as_str().to_string(),
        ]
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_row<W: Write, S: AsRef<str>>(out: &mut W, fields: &[S]) -> io::Result<()> {
    let line = fields
        .iter()
        .map(|f| escape(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(out, "{}", line)
}

/// Result file written one row at a time
pub struct CsvReport {
    path: PathBuf,
    writer: BufWriter<File>,
    rows: usize,
}

impl CsvReport {
    /// Create (or truncate) the file and write the header
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(&path)?);
        write_row(&mut writer, &HEADER)?;
        writer.flush()?;

        Ok(Self {
            path,
            writer,
            rows: 0,
        })
    }

    /// Append a row and flush it to disk
    pub fn append(&mut self, record: &RunRecord) -> io::Result<()> {
        write_row(&mut self.writer, &record.fields())?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}
