//! Count and locate queries against a constructed index
//!
//! The binary variant is taken from the persisted mode record, never
//! inferred. Queries run in the foreground with the terminal attached.

use crate::command::{FormatError, Invocation, Params, StageSpec};
use crate::index::mode::{self, ModeError};
use crate::index::variant::{Toolchain, Width};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

/// Query selector understood by the index binary (`-q`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKind {
    Count,
    Locate,
}

impl QueryKind {
    pub fn code(self) -> u64 {
        match self {
            QueryKind::Count => 0,
            QueryKind::Locate => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            QueryKind::Count => "count",
            QueryKind::Locate => "locate",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Mode(#[from] ModeError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("failed to launch {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{kind} query failed ({status}): {command}")]
    Failed {
        kind: QueryKind,
        status: ExitStatus,
        command: String,
    },
}

pub fn query_spec(toolchain: &Toolchain, width: Width, kind: QueryKind) -> StageSpec {
    StageSpec::new(format!("Computing {} queries", kind), toolchain.index(width))
        .positional("input")
        .option("-q", "query")
        .option("-p", "patterns")
        .switch("-f", "first")
}

/// Form the query invocation for `input`, reading its mode record first
pub fn query_invocation(
    toolchain: &Toolchain,
    input: &Path,
    kind: QueryKind,
    patterns: &Path,
    first_rotation: bool,
) -> Result<Invocation, QueryError> {
    let width = mode::read_mode(input)?;

    let params = Params::new()
        .path("input", input)
        .int("query", kind.code())
        .path("patterns", patterns)
        .switch("first", first_rotation);

    Ok(query_spec(toolchain, width, kind).format(&params)?)
}

/// Run a query invocation attached to the terminal
pub fn run_foreground(invocation: &Invocation, kind: QueryKind) -> Result<(), QueryError> {
    let status = invocation
        .to_command()
        .status()
        .map_err(|source| QueryError::Spawn {
            program: invocation.program().to_path_buf(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(QueryError::Failed {
            kind,
            status,
            command: invocation.command_line(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::tempdir;

    #[test]
    fn test_query_uses_recorded_width() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reads.fa");
        let patterns = dir.path().join("reads.fa.pat");
        let tc = Toolchain::new("/opt/build");

        mode::write_mode(&input, Width::W64).unwrap();
        let inv = query_invocation(&tc, &input, QueryKind::Count, &patterns, false).unwrap();
        assert_eq!(inv.program(), Path::new("/opt/build/er-index64"));

        mode::write_mode(&input, Width::W32).unwrap();
        let inv = query_invocation(&tc, &input, QueryKind::Locate, &patterns, true).unwrap();
        assert_eq!(inv.program(), Path::new("/opt/build/er-index"));
        assert_eq!(
            inv.arguments(),
            &[
                input.clone().into_os_string(),
                OsString::from("-q"),
                OsString::from("2"),
                OsString::from("-p"),
                patterns.into_os_string(),
                OsString::from("-f"),
            ]
        );
    }

    #[test]
    fn test_query_without_mode_fails() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reads.fa");

        let err = query_invocation(
            &Toolchain::new("/opt/build"),
            &input,
            QueryKind::Count,
            &dir.path().join("p.pat"),
            false,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            QueryError::Mode(ModeError::MissingMode { .. })
        ));
    }

    #[test]
    fn test_query_codes() {
        assert_eq!(QueryKind::Count.code(), 0);
        assert_eq!(QueryKind::Locate.code(), 2);
    }

    #[test]
    fn test_run_foreground_reports_exit() {
        let ok = Invocation::new("/bin/sh").args(["-c", "exit 0"]);
        run_foreground(&ok, QueryKind::Count).unwrap();

        let bad = Invocation::new("/bin/sh").args(["-c", "exit 4"]);
        assert!(matches!(
            run_foreground(&bad, QueryKind::Locate),
            Err(QueryError::Failed { kind: QueryKind::Locate, .. })
        ));
    }
}
