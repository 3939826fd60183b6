//! On-disk artifact naming and intermediate-file cleanup
//!
//! Every file belonging to an input lives next to it, named by appending a
//! fixed suffix to the full input path (`reads.fa` -> `reads.fa.eri`).

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Intermediate files produced by parsing and eBWT construction.
/// None of them is read after construction completes.
pub const INTERMEDIATE_SUFFIXES: &[&str] = &[
    "eparse_old",
    "offset_old",
    "eparse",
    "edict",
    "offset",
    "eocc",
    "fchar",
    "start",
    "sdsl",
];

pub const PARSE_SUFFIX: &str = "eparse";
pub const DICT_SUFFIX: &str = "edict";
pub const INDEX_SUFFIX: &str = "eri";
pub const MODE_SUFFIX: &str = "mode";
pub const LOG_SUFFIX: &str = "log";
pub const PATTERN_SUFFIX: &str = "pat";

/// `<input>.<suffix>`
pub fn artifact_path(input: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

pub fn index_path(input: &Path) -> PathBuf {
    artifact_path(input, INDEX_SUFFIX)
}

pub fn log_path(input: &Path) -> PathBuf {
    artifact_path(input, LOG_SUFFIX)
}

pub fn default_pattern_path(input: &Path) -> PathBuf {
    artifact_path(input, PATTERN_SUFFIX)
}

/// Intermediate files of `input` that currently exist
pub fn leftover_intermediates(input: &Path) -> Vec<PathBuf> {
    INTERMEDIATE_SUFFIXES
        .iter()
        .map(|suffix| artifact_path(input, suffix))
        .filter(|path| path.exists())
        .collect()
}

/// Outcome of a cleanup pass
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    /// Files that could not be removed, with the reason
    pub skipped: Vec<(PathBuf, io::Error)>,
}

/// Delete the intermediate artifact set of `input`.
///
/// Best effort: a missing file is not an error and other failures are only
/// reported back, never raised.
pub fn remove_intermediates(input: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();

    for suffix in INTERMEDIATE_SUFFIXES {
        let path = artifact_path(input, suffix);
        match fs::remove_file(&path) {
            Ok(()) => report.removed.push(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => report.skipped.push((path, e)),
        }
    }

    report
}

/// Size of a file in bytes
pub fn file_size(path: &Path) -> io::Result<u64> {
    Ok(fs::metadata(path)?.len())
}
