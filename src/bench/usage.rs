//! Parsing of `time -v` resource-usage reports

use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

pub const MAX_RSS_LABEL: &str = "Maximum resident set size (kbytes)";
pub const USER_TIME_LABEL: &str = "User time (seconds)";

static MAX_RSS: LazyLock<Regex> = LazyLock::new(|| field_regex(MAX_RSS_LABEL));
static USER_TIME: LazyLock<Regex> = LazyLock::new(|| field_regex(USER_TIME_LABEL));

#[allow(clippy::expect_used)]
fn field_regex(label: &str) -> Regex {
    Regex::new(&format!(r"(?m)^\s*{}:[ \t]*(\S*)", regex::escape(label)))
        .expect("label pattern is a valid regex")
}

/// Peak memory and CPU time of one run
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Usage {
    pub max_rss_kb: u64,
    pub user_cpu_secs: f64,
}

#[derive(Debug, Error)]
pub enum MeasurementFailure {
    #[error("cannot read usage report {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("usage report has no '{field}' line")]
    MissingField { field: &'static str },

    #[error("usage report field '{field}' holds '{value}'")]
    Malformed { field: &'static str, value: String },
}

pub fn parse_report(text: &str) -> Result<Usage, MeasurementFailure> {
    let max_rss_kb = field(&MAX_RSS, MAX_RSS_LABEL, text)?;
    let user_cpu_secs = field(&USER_TIME, USER_TIME_LABEL, text)?;
    Ok(Usage {
        max_rss_kb,
        user_cpu_secs,
    })
}

pub fn read_report(path: &Path) -> Result<Usage, MeasurementFailure> {
    let text = fs::read_to_string(path).map_err(|source| MeasurementFailure::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_report(&text)
}

fn field<T: std::str::FromStr>(
    re: &Regex,
    label: &'static str,
    text: &str,
) -> Result<T, MeasurementFailure> {
    let value = re
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or(MeasurementFailure::MissingField { field: label })?;

    value.parse().map_err(|_| MeasurementFailure::Malformed {
        field: label,
        value: value.to_string(),
    })
}
